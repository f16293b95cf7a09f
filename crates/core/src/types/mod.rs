//! Domain types for carlot
//!
//! - `vehicle`: the vehicle record and its identity
//! - `push`: messages delivered over the push channel

mod push;
mod vehicle;

pub use push::PushMessage;
pub use vehicle::{Vehicle, VehicleId, TEMPORARY_ID_PREFIX};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _id: VehicleId = VehicleId::temporary(0);
        let _vehicle: Vehicle = Vehicle::new("BMW", "E90", 2006);
        let _message = PushMessage::Created(Vehicle::new("Audi", "A5", 2006));
    }
}
