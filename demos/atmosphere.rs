//! Command-line demo of text control and per-light variation.
//!
//! Runs against a simulated bridge, so no hardware is needed.
//!
//! Run with: cargo run --example atmosphere -- --help

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hue_lights_rs::resource::{Light, Room, Scene};
use hue_lights_rs::{
    BridgeConfig, BridgeRegistry, Config, DeviceState, DeviceTransport, Error, MemoryTransport,
    Resource, ResourceKind, VariationEngine, parser,
};

#[derive(Parser)]
#[command(name = "atmosphere")]
#[command(about = "Set the mood of a simulated room from a phrase", long_about = None)]
struct Cli {
    /// Number of lights in the simulated room
    #[arg(short, long, default_value = "4", global = true)]
    lights: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the state a phrase parses to
    Parse {
        /// Phrase such as "dim warm white slowly"
        text: String,
    },

    /// Apply a phrase to every light of the room with natural variation
    Vary {
        /// Phrase such as "stormy dusk at 40%"
        text: String,

        /// Seed for repeatable variation
        #[arg(short, long)]
        seed: Option<u64>,

        /// Per-light timeout in milliseconds
        #[arg(short, long, default_value = "2000")]
        timeout: u64,
    },

    /// Apply a phrase to a single light
    Set {
        /// Light id, e.g. light-1
        light: String,
        /// Phrase to apply
        text: String,
    },

    /// Recall the simulated "Relax" scene
    Scene {
        /// Brightness override (0-100)
        #[arg(short, long)]
        brightness: Option<f64>,
    },

    /// List bridges, rooms and lights
    Status,
}

fn simulated_bridge(count: usize) -> MemoryTransport {
    let ids: Vec<String> = (1..=count).map(|n| format!("light-{n}")).collect();
    let lights = ids.iter().enumerate().map(|(n, id)| {
        Resource::Light(Light {
            id: id.clone(),
            name: format!("Lamp {}", n + 1),
            state: DeviceState::power(false),
            room: Some("living".into()),
        })
    });

    MemoryTransport::new()
        .named("demo-bridge")
        .with_credential("demo-key")
        .with_latency(Duration::from_millis(20))
        .with_resources(lights)
        .with_resources([
            Resource::Room(Room {
                id: "living".into(),
                name: "Living Room".into(),
                lights: ids,
                grouped_light: None,
            }),
            Resource::Scene(Scene {
                id: "relax".into(),
                name: "Relax".into(),
                group: Some("living".into()),
            }),
        ])
}

fn describe(state: &DeviceState) -> String {
    serde_json::to_string(state).unwrap_or_else(|e| format!("<{e}>"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Parse { text } = &cli.command {
        let state = parser::parse(text);
        if state.is_empty() {
            println!("Nothing recognized in {text:?}");
        } else {
            println!("{}", describe(&state));
        }
        return Ok(());
    }

    let transport: Arc<dyn DeviceTransport> = Arc::new(simulated_bridge(cli.lights));
    let mut config = Config::default();
    config.sync.enabled = false;
    config.add_bridge(BridgeConfig::new("demo", "Demo", "127.0.0.1", "demo-key"))?;

    let connector = move |_: &BridgeConfig| -> Result<Arc<dyn DeviceTransport>, Error> {
        Ok(transport.clone())
    };
    let registry = BridgeRegistry::initialize(config, connector).await?;

    match cli.command {
        Commands::Parse { .. } => {}
        Commands::Vary {
            text,
            seed,
            timeout,
        } => {
            let base = parser::parse(&text);
            if base.is_empty() {
                eprintln!("Nothing recognized in {text:?}");
            } else {
                let engine = seed.map_or_else(VariationEngine::new, VariationEngine::with_seed);
                println!("Base state: {}", describe(&base));
                let report = engine
                    .apply_to_room(
                        &registry,
                        None,
                        "living",
                        &base,
                        Duration::from_millis(timeout),
                    )
                    .await?;
                for result in report.iter() {
                    match &result.error {
                        None => println!(
                            "  {:10} {}",
                            result.device_id,
                            describe(&result.applied_state)
                        ),
                        Some(e) => println!("  {:10} FAILED: {e}", result.device_id),
                    }
                }
            }
        }
        Commands::Set { light, text } => {
            match registry
                .apply_text(None, ResourceKind::Light, &light, &text)
                .await
            {
                Ok(state) => println!("{light}: {}", describe(&state)),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Scene { brightness } => {
            match registry.activate_scene(None, "relax", brightness, None).await {
                Ok(()) => println!("Scene activated"),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Status => {
            for status in registry.statuses() {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            let inventory = registry.inventory().await;
            for room in &inventory.rooms.items {
                println!("Room {} ({}) on {}", room.item.name, room.item.id, room.bridge_id);
            }
            for light in &inventory.lights.items {
                println!("  {:10} {}", light.item.id, describe(&light.item.state));
            }
        }
    }

    registry.shutdown().await?;
    Ok(())
}
