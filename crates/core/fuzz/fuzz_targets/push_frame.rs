//! Push frames arrive from the network; decoding must never panic.
//! Run with: cargo fuzz run push_frame

#![no_main]
use carlot_core::{PushMessage, VehicleId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(message) = PushMessage::from_json(text) {
            let _ = message.to_json();
        }
        let _ = VehicleId::parse(text);
    }
});
