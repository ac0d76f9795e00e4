use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use virtualpad::bridge::{BridgeCommand, ChannelBridge, Envelope};
use virtualpad::host::{LoggingHost, NoHardware};
use virtualpad::mapping::{KeyPhase, SuppressionScope};
use virtualpad::persistence::{default_config_path, PersistenceWorker};
use virtualpad::{Command, Launcher, Reply, VirtualPad};

const BRIDGE_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let cancel = CancellationToken::new();
    let config_path = std::env::var_os("VIRTUALPAD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    info!("Using configuration file {}", config_path.display());

    let (store, persistence_handle) = PersistenceWorker::spawn(config_path, cancel.clone());
    let flush_store = store.clone();
    let (bridge, mut bridge_rx) = ChannelBridge::new(BRIDGE_CAPACITY);

    let mut pad = Launcher::create(
        Box::new(LoggingHost::default()),
        Box::new(store),
        Arc::new(NoHardware),
        Some(Box::new(bridge)),
    )
    .load()
    .launch();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }

            envelope = bridge_rx.recv() => {
                match envelope {
                    Some(envelope) => emit(&envelope),
                    None => break,
                }
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&mut pad, line.trim()),
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(e) => return Err(eyre!("Failed to read input: {}", e)),
                }
            }
        }
    }

    while let Ok(envelope) = bridge_rx.try_recv() {
        emit(&envelope);
    }
    if let Err(e) = flush_store.flush().await {
        warn!("Failed to flush configuration: {}", e);
    }
    cancel.cancel();
    persistence_handle
        .await
        .map_err(|e| eyre!("Persistence worker panicked: {}", e))?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Bridge output goes to stdout, one JSON object per line
fn emit(envelope: &Envelope) {
    match envelope.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to encode {}: {}", envelope.notification.name(), e),
    }
}

// Zeilenprotokoll: "down 87", "up 87", JSON-Bridge-Kommandos oder Textkommandos
fn handle_line(pad: &mut VirtualPad, line: &str) {
    if line.is_empty() {
        return;
    }

    if line.starts_with('{') {
        match BridgeCommand::decode(line) {
            Ok(command) => {
                let result = pad.handle_bridge_command(command);
                debug!("Bridge command result: {:?}", result);
            }
            Err(e) => warn!("{}", e),
        }
        return;
    }

    let mut parts = line.splitn(2, ' ');
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    let phase = match verb {
        "down" => Some(KeyPhase::Down),
        "up" => Some(KeyPhase::Up),
        _ => None,
    };
    if let Some(phase) = phase {
        match rest.parse() {
            Ok(key) => {
                let disposition = pad.handle_key(phase, key);
                println!("{:?}", disposition);
            }
            Err(_) => warn!("Invalid key code: {}", rest),
        }
        return;
    }

    match parse_command(verb, rest) {
        Some(command) => print_reply(pad.execute(command)),
        None => warn!("Unknown command: {}", line),
    }
}

fn parse_command(verb: &str, rest: &str) -> Option<Command> {
    let args: Vec<&str> = rest.split_whitespace().collect();
    let command = match (verb, args.as_slice()) {
        ("connect", []) => Command::Connect,
        ("disconnect", []) => Command::Disconnect,
        ("enable", []) => Command::Enable,
        ("disable", []) => Command::Disable,
        ("status", []) => Command::Status,
        ("map", [key, button]) => Command::SetKeyMapping {
            key: key.parse().ok()?,
            button: button.to_string(),
        },
        ("map", [key]) => Command::KeyMapping {
            key: key.parse().ok()?,
        },
        ("unmap", [key]) => Command::RemoveKeyMapping {
            key: key.parse().ok()?,
        },
        ("mappings", []) => Command::KeyMappings,
        ("keys", []) => Command::MappedKeys,
        ("mapped", [key]) => Command::IsKeyMapped {
            key: key.parse().ok()?,
        },
        ("reset-mappings", []) => Command::ResetKeyMappings,
        ("profile", [name]) => Command::SetControllerProfile {
            profile: name.to_string(),
        },
        ("profile", []) => Command::ControllerProfile,
        ("profiles", []) => Command::ControllerProfiles,
        ("buttons", []) => Command::AvailableButtons,
        ("press", [index]) => Command::PressButton {
            index: index.parse().ok()?,
        },
        ("release", [index]) => Command::ReleaseButton {
            index: index.parse().ok()?,
        },
        ("stick", [stick, x, y]) => Command::SetAnalogStick {
            stick: stick.to_string(),
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        },
        ("sensitivity", [value]) => Command::SetSensitivity {
            value: value.parse().ok()?,
        },
        ("sensitivity", []) => Command::Sensitivity,
        ("block", ["on"]) => Command::SetBlockingPolicy { on: true },
        ("block", ["off"]) => Command::SetBlockingPolicy { on: false },
        ("block", []) => Command::IsBlocking,
        ("scope", ["always"]) => Command::SetSuppressionScope {
            scope: SuppressionScope::Always,
        },
        ("scope", ["while-active"]) => Command::SetSuppressionScope {
            scope: SuppressionScope::WhileActive,
        },
        ("export", []) => Command::ExportConfig,
        ("import", _) if !rest.is_empty() => Command::ImportConfig {
            json: rest.to_string(),
        },
        ("gamepads", []) => Command::GetGamepads,
        ("reset", []) => Command::ResetInputs,
        _ => return None,
    };
    Some(command)
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Done(result) if result.success => println!("{}", result.message),
        Reply::Done(result) => println!("error: {}", result.message),
        Reply::Exported(json) => println!("{}", json),
        Reply::Status(status) => match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to encode status: {}", e),
        },
        other => println!("{:?}", other),
    }
}
