// crates/sync-engine/examples/sync_demo.rs
//! Walks through an offline edit session against an in-memory remote store

use carlot_core::Vehicle;
use carlot_sync_engine::{MemoryRemote, SyncConfig, SyncCoordinator};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("Carlot Sync Engine Demo");
    println!("=======================\n");

    let remote = MemoryRemote::new();
    remote.authorize("demo-token", "demo");
    remote.seed("demo", vec![Vehicle::new("Audi", "A4", 2008)]);

    let mut coordinator =
        SyncCoordinator::new(Arc::new(remote.clone()), SyncConfig::new("demo-token"));

    println!("1. Offline edits");
    for (brand, model, year) in [("BMW", "E90", 2006), ("Opel", "Astra", 2010)] {
        match coordinator.save(Vehicle::new(brand, model, year)).await {
            Ok(saved) => println!("  queued {} {} as {}", saved.brand, saved.model, display_id(&saved)),
            Err(err) => println!("  save failed: {}", err),
        }
    }
    println!("  pending: {}\n", coordinator.status().pending);

    println!("2. Reconnect");
    if let Some(report) = coordinator.on_connectivity_changed(true).await {
        for vehicle in &report.synced {
            println!("  synced {} {} as {}", vehicle.brand, vehicle.model, display_id(vehicle));
        }
        println!("  failed: {}", report.failed.len());
    }

    println!("\n3. Initial load");
    match coordinator.refresh().await {
        Ok(count) => println!("  loaded {} vehicles", count),
        Err(err) => println!("  load failed: {}", err),
    }
    for vehicle in coordinator.store().vehicles() {
        println!("  - {} {} ({})", vehicle.brand, vehicle.model, display_id(vehicle));
    }
}

fn display_id(vehicle: &Vehicle) -> String {
    vehicle
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}
