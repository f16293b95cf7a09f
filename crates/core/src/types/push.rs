//! Push channel message contract

use crate::types::vehicle::{Vehicle, VehicleId};
use serde::{Deserialize, Serialize};

/// A message delivered over the push channel
///
/// Wire form is `{"type": "created" | "updated" | "deleted", "payload": ...}`.
/// `deleted` is decoded so it can be recognised, but the sync engine does not
/// merge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PushMessage {
    Created(Vehicle),
    Updated(Vehicle),
    Deleted {
        #[serde(rename = "_id")]
        id: VehicleId,
    },
}

impl PushMessage {
    /// Decodes a text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Encodes as a text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the wire name of the message kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }
}
