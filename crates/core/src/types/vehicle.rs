//! Vehicle record and identity

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Marker prefix carried by every temporary identifier
pub const TEMPORARY_ID_PREFIX: &str = "TEMP_";

/// Identity of a vehicle record
///
/// Two identity spaces share one key type: ids assigned by the remote store,
/// and placeholders issued locally for records created while offline. On the
/// wire both are plain strings; a temporary id is the marker prefix followed
/// by a counter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleId {
    /// Authoritative id assigned by the remote store
    Server(String),
    /// Local placeholder, superseded once the remote store assigns an id
    Temporary(u64),
}

impl VehicleId {
    /// Creates a server-assigned id
    pub fn server(id: impl Into<String>) -> Self {
        Self::Server(id.into())
    }

    /// Creates a temporary id for the given counter value
    pub fn temporary(counter: u64) -> Self {
        Self::Temporary(counter)
    }

    /// Parses a wire id, recognising the temporary marker
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix(TEMPORARY_ID_PREFIX)
            .and_then(|counter| counter.parse::<u64>().ok())
            .map(Self::Temporary)
            .unwrap_or_else(|| Self::Server(raw.to_string()))
    }

    /// Returns true for locally issued placeholders
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns the server id, if this is one
    pub fn as_server(&self) -> Option<&str> {
        match self {
            Self::Server(id) => Some(id),
            Self::Temporary(_) => None,
        }
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "{}", id),
            Self::Temporary(counter) => write!(f, "{}{}", TEMPORARY_ID_PREFIX, counter),
        }
    }
}

impl Serialize for VehicleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VehicleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A vehicle listing
///
/// A record is unsynced while its id is absent or temporary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<VehicleId>,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Base64 encoded photo
    #[serde(rename = "photoBase64", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl Vehicle {
    /// Creates a vehicle without id, photo or location
    pub fn new(brand: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            id: None,
            brand: brand.into(),
            model: model.into(),
            year,
            photo: None,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Sets the id
    pub fn with_id(mut self, id: VehicleId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the location
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Encodes and attaches a photo
    pub fn with_photo(mut self, bytes: &[u8]) -> Self {
        self.photo = Some(STANDARD.encode(bytes));
        self
    }

    /// Decodes the attached photo
    pub fn photo_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.photo.as_deref().map(|encoded| STANDARD.decode(encoded))
    }

    /// Returns true if the record has not been confirmed by the remote store
    pub fn is_unsynced(&self) -> bool {
        self.id.as_ref().map_or(true, VehicleId::is_temporary)
    }

    /// Returns true if the record carries a temporary id
    pub fn has_temporary_id(&self) -> bool {
        self.id.as_ref().is_some_and(VehicleId::is_temporary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_id_display() {
        assert_eq!(VehicleId::temporary(0).to_string(), "TEMP_0");
        assert_eq!(VehicleId::temporary(12).to_string(), "TEMP_12");
    }

    #[test]
    fn test_parse_recognises_marker() {
        assert_eq!(VehicleId::parse("TEMP_3"), VehicleId::Temporary(3));
        assert_eq!(VehicleId::parse("abc123"), VehicleId::server("abc123"));
        // Marker without a counter is an ordinary server id
        assert_eq!(VehicleId::parse("TEMP_x"), VehicleId::server("TEMP_x"));
    }

    #[test]
    fn test_unsynced_classification() {
        let vehicle = Vehicle::new("BMW", "E90", 2006);
        assert!(vehicle.is_unsynced());
        assert!(!vehicle.has_temporary_id());

        let vehicle = vehicle.with_id(VehicleId::temporary(0));
        assert!(vehicle.is_unsynced());
        assert!(vehicle.has_temporary_id());

        let vehicle = vehicle.with_id(VehicleId::server("abc123"));
        assert!(!vehicle.is_unsynced());
        assert_eq!(vehicle.id.as_ref().and_then(VehicleId::as_server), Some("abc123"));
    }

    #[test]
    fn test_wire_format() {
        let vehicle = Vehicle::new("BMW", "E90", 2006)
            .with_id(VehicleId::server("abc123"))
            .with_location(46.77, 23.59);
        let json = serde_json::to_value(&vehicle).unwrap();

        assert_eq!(json["_id"], "abc123");
        assert_eq!(json["brand"], "BMW");
        assert_eq!(json["year"], 2006);
        assert!(json.get("photoBase64").is_none());
    }

    #[test]
    fn test_missing_id_is_not_serialized() {
        let json = serde_json::to_value(Vehicle::new("Audi", "A5", 2010)).unwrap();
        assert!(json.get("_id").is_none());
    }

    #[test]
    fn test_decode_ignores_server_fields() {
        let vehicle: Vehicle = serde_json::from_str(
            r#"{"_id":"x1","brand":"Audi","model":"A5","year":2006,
                "latitude":1.5,"longitude":2.5,"userId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(vehicle.id, Some(VehicleId::server("x1")));
        assert_eq!(vehicle.latitude, 1.5);
    }

    #[test]
    fn test_photo_helpers() {
        let vehicle = Vehicle::new("BMW", "E90", 2006).with_photo(&[1, 2, 3]);
        assert_eq!(vehicle.photo.as_deref(), Some("AQID"));
        assert_eq!(vehicle.photo_bytes().unwrap().unwrap(), vec![1, 2, 3]);
        assert!(Vehicle::new("BMW", "E90", 2006).photo_bytes().is_none());
    }
}
