// FILE: crates/cli/src/commands.rs

use anyhow::{anyhow, bail, Context, Result};
use carlot_config::{Config, ConfigManager};
use carlot_core::Vehicle;
use carlot_network::{ClientConfig, ConnectivityMonitor, HttpGateway, PushChannel};
use carlot_sync_engine::{session, SyncConfig, SyncCoordinator, SyncStatus};
use clap::ArgMatches;
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Write a default config file
pub fn init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write config file")?;

    if created {
        println!(
            "{} Config written to {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!("Config already exists at {}", manager.config_path().display());
    }
    Ok(())
}

/// List vehicles stored on the server
pub async fn list_vehicles(config: &Config, all: bool) -> Result<()> {
    let mut coordinator = connected_coordinator(config)?;

    coordinator
        .refresh()
        .await
        .context("Failed to load vehicles")?;
    if all {
        while !coordinator.cursor().is_exhausted() {
            coordinator
                .load_more()
                .await
                .context("Failed to load more vehicles")?;
        }
    }

    let vehicles = coordinator.store().vehicles();
    if vehicles.is_empty() {
        println!("No vehicles yet. Use 'add' to create one.");
        return Ok(());
    }

    println!("\n{} Vehicles", style(vehicles.len()).bold().cyan());
    println!("{}", "=".repeat(60));
    for vehicle in vehicles {
        println!("{}", format_vehicle(vehicle));
    }
    if !coordinator.cursor().is_exhausted() {
        println!("{}", style("(more available, use --all)").dim());
    }
    Ok(())
}

/// Add a vehicle on the server
pub async fn add_vehicle(config: &Config, matches: &ArgMatches) -> Result<()> {
    let vehicle = vehicle_from_args(matches)?;
    let mut coordinator = connected_coordinator(config)?;

    let saved = coordinator
        .save(vehicle)
        .await
        .context("Failed to save vehicle")?;

    println!("{} Vehicle added", style("✓").green().bold());
    println!("{}", format_vehicle(&saved));
    Ok(())
}

/// Follow the collection until Ctrl-C
///
/// Lines typed on stdin as `BRAND MODEL YEAR` are saved; while the server is
/// unreachable they are queued and replayed once it comes back.
pub async fn watch(config: &Config) -> Result<()> {
    let token = session_token(config)?;
    let gateway = http_gateway(config)?;

    let monitor = ConnectivityMonitor::new(
        config.server.connectivity_probe_url.as_str(),
        config.server.connectivity_interval(),
    )
    .context("Invalid connectivity probe URL")?;
    let connectivity = monitor.start().await;

    let (push_tx, push_rx) = mpsc::unbounded_channel();
    let push_task = tokio::spawn(forward_push(
        config.server.push_url.clone(),
        token.clone(),
        ReconnectBackoff::new(config.server.connectivity_interval()),
        push_tx,
    ));

    let coordinator = SyncCoordinator::new(gateway, SyncConfig::new(token));
    let handle = session::start(coordinator, connectivity.subscribe(), push_rx);
    let mut vehicles = handle.subscribe_vehicles();
    let mut status = handle.subscribe_status();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    println!("Watching {} (Ctrl-C to stop)", config.server.api_url);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = vehicles.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = vehicles.borrow_and_update().clone();
                println!("\n{} Vehicles", style(snapshot.len()).bold().cyan());
                for vehicle in snapshot.iter() {
                    println!("{}", format_vehicle(vehicle));
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("{}", style(format_status(&current)).dim());
            }
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_vehicle_line(&line) {
                    Ok(vehicle) => match handle.save(vehicle).await {
                        Ok(saved) => println!("{} saved {}", style("✓").green(), format_vehicle(&saved)),
                        Err(e) => eprintln!("{} {}", style("✗").red(), e),
                    },
                    Err(e) => eprintln!("{} {}", style("✗").red(), e),
                },
                Ok(None) | Err(_) => input_open = false,
            },
        }
    }

    let pending = handle.status().pending;
    if pending > 0 {
        eprintln!("Discarding {} unsynced vehicle(s)", pending);
    }
    handle.end().await;
    connectivity.stop();
    push_task.abort();
    Ok(())
}

/// Delay before the next push reconnection attempt
///
/// Doubles after each failed attempt up to `max_delay` and starts over once
/// a connection succeeds.
#[derive(Debug, Clone)]
struct ReconnectBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(60).max(initial_delay),
            attempt: 0,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Keeps a push channel open, reconnecting with backoff when it drops
async fn forward_push(
    url: String,
    token: String,
    mut backoff: ReconnectBackoff,
    sink: mpsc::UnboundedSender<carlot_core::PushMessage>,
) {
    while !sink.is_closed() {
        match PushChannel::connect(&url, &token).await {
            Ok((channel, mut messages)) => {
                backoff.reset();
                while let Some(message) = messages.recv().await {
                    if sink.send(message).is_err() {
                        break;
                    }
                }
                if let Err(e) = channel.close().await {
                    log::debug!("Push channel close failed: {}", e);
                }
            }
            Err(e) => log::debug!("Push channel unavailable: {}", e),
        }
        let delay = backoff.next_delay();
        log::debug!("Reconnecting push channel in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

fn session_token(config: &Config) -> Result<String> {
    std::env::var(&config.app.token_env)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "No session token: set {} to the token issued by the server",
                config.app.token_env
            )
        })
}

fn http_gateway(config: &Config) -> Result<Arc<HttpGateway>> {
    let client_config =
        ClientConfig::new(config.server.api_url.as_str()).with_timeout(config.server.request_timeout());
    let gateway = HttpGateway::new(client_config).context("Failed to create HTTP client")?;
    Ok(Arc::new(gateway))
}

fn connected_coordinator(config: &Config) -> Result<SyncCoordinator> {
    let token = session_token(config)?;
    let gateway = http_gateway(config)?;
    Ok(SyncCoordinator::new(
        gateway,
        SyncConfig::new(token).connected(true),
    ))
}

fn vehicle_from_args(matches: &ArgMatches) -> Result<Vehicle> {
    let brand = matches
        .get_one::<String>("brand")
        .ok_or_else(|| anyhow!("Brand is required"))?;
    let model = matches
        .get_one::<String>("model")
        .ok_or_else(|| anyhow!("Model is required"))?;
    let year = *matches
        .get_one::<i32>("year")
        .ok_or_else(|| anyhow!("Year is required"))?;

    let mut vehicle = Vehicle::new(brand.as_str(), model.as_str(), year);
    if let (Some(latitude), Some(longitude)) = (
        matches.get_one::<f64>("latitude"),
        matches.get_one::<f64>("longitude"),
    ) {
        vehicle = vehicle.with_location(*latitude, *longitude);
    }
    if let Some(path) = matches.get_one::<String>("photo") {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read photo {}", path))?;
        vehicle = vehicle.with_photo(&bytes);
    }
    Ok(vehicle)
}

fn parse_vehicle_line(line: &str) -> Result<Vehicle> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [brand, model, year] = parts.as_slice() else {
        bail!("Expected: BRAND MODEL YEAR");
    };
    let year = year
        .parse::<i32>()
        .with_context(|| format!("Invalid year '{}'", year))?;
    Ok(Vehicle::new(*brand, *model, year))
}

fn format_vehicle(vehicle: &Vehicle) -> String {
    let id = vehicle
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let marker = if vehicle.is_unsynced() { "*" } else { " " };
    format!(
        "{} {:<8} {:<12} {:<12} {:>4}  {}",
        marker,
        truncate(&id, 8),
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        if vehicle.photo.is_some() { "[photo]" } else { "" }
    )
    .trim_end()
    .to_string()
}

fn format_status(status: &SyncStatus) -> String {
    let mut parts = vec![if status.connected { "online" } else { "offline" }.to_string()];
    if status.pending > 0 {
        parts.push(format!("{} pending", status.pending));
    }
    if status.fetching {
        parts.push("loading".to_string());
    }
    if status.saving {
        parts.push("saving".to_string());
    }
    if let Some(error) = status.fetching_error.as_ref().or(status.saving_error.as_ref()) {
        parts.push(format!("error: {}", error));
    }
    format!("[{}]", parts.join(", "))
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
