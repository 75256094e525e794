use std::io::BufRead;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use dashboard_layout::config::default_config_path;
use dashboard_layout::config_persistence::load_or_create_config_file;
use dashboard_layout::layout::{default_layout_document, LayoutDocument, LayoutItem};
use dashboard_layout::layout_manager::LayoutManager;
use dashboard_layout::protocol::{LayoutMessage, Message, NotificationLevel};
use dashboard_layout::settings_db::SettingsDb;

const BUS_CAPACITY: usize = 1024;

/// Parses one line of console input into layout commands.
fn parse_command(line: &str, current_layout: &[LayoutItem]) -> Option<Vec<LayoutMessage>> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let args: Vec<&str> = parts.collect();
    let number = |index: usize| args.get(index).and_then(|value| value.parse::<i32>().ok());

    let message = match (command, args.len()) {
        ("customize", 0) => Some(LayoutMessage::BeginCustomizing),
        ("toggle", 1) => Some(LayoutMessage::ToggleWidgetVisibility {
            id: args[0].to_string(),
        }),
        ("move", 2) => {
            return Some(vec![
                LayoutMessage::DragStart {
                    id: args[0].to_string(),
                },
                LayoutMessage::DragEnd {
                    over_id: Some(args[1].to_string()),
                },
            ]);
        }
        ("drop", 1) => Some(LayoutMessage::DragEnd {
            over_id: Some(args[0].to_string()),
        }),
        ("drop-at", 2) => {
            let x_px = args[0].parse::<f32>().ok()?;
            let y_px = args[1].parse::<f32>().ok()?;
            Some(LayoutMessage::DragEndAtPoint { x_px, y_px })
        }
        ("drag", 1) => Some(LayoutMessage::DragStart {
            id: args[0].to_string(),
        }),
        ("drag-cancel", 0) => Some(LayoutMessage::DragCancel),
        ("resize", 3) => Some(LayoutMessage::ResizeWidget {
            id: args[0].to_string(),
            w: number(1)?,
            h: number(2)?,
        }),
        ("width", 1) => Some(LayoutMessage::ViewportResized {
            width_px: args[0].parse::<u32>().ok()?,
        }),
        ("nudge", 3) => {
            let (dx, dy) = (number(1)?, number(2)?);
            let mut layout = current_layout.to_vec();
            let item = layout.iter_mut().find(|item| item.id == args[0])?;
            item.x = item.x.saturating_add(dx).max(0);
            item.y = item.y.saturating_add(dy).max(0);
            Some(LayoutMessage::UpdateLayout(layout))
        }
        ("save", 0) => Some(LayoutMessage::Save),
        ("reset", 0) => Some(LayoutMessage::Reset),
        ("undo", 0) => Some(LayoutMessage::UndoReset),
        ("cancel", 0) => Some(LayoutMessage::CancelCustomization),
        ("quit", 0) | ("exit", 0) => Some(LayoutMessage::Shutdown),
        _ => None,
    };
    message.map(|message| vec![message])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_file = default_config_path().ok_or("could not resolve a config directory")?;
    let config = load_or_create_config_file(&config_file);
    info!(
        "Loaded config. path={} account={}",
        config_file.display(),
        config.account_id
    );

    let database_path = config.database_path();
    let settings_db = SettingsDb::open(&database_path)?;
    debug!("Opened settings database at {}", database_path.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (bus_sender, _) = broadcast::channel::<Message>(BUS_CAPACITY);
    let mut output_receiver = bus_sender.subscribe();

    let manager = LayoutManager::new(
        &config,
        default_layout_document(),
        Box::new(settings_db),
        bus_sender.subscribe(),
        bus_sender.clone(),
    );
    let latest_layout = Arc::new(Mutex::new(manager.store().layout().to_vec()));

    let manager_handle = runtime.spawn(manager.run());

    let output_layout = latest_layout.clone();
    runtime.spawn(async move {
        loop {
            match output_receiver.recv().await {
                Ok(Message::Layout(LayoutMessage::StateChanged(state))) => {
                    let document = LayoutDocument {
                        widgets: state.widgets,
                        layout: state.layout,
                    };
                    match serde_json::to_string(&document) {
                        Ok(json) => println!("{}", json),
                        Err(err) => error!("Failed to render layout: {}", err),
                    }
                    if let Ok(mut layout) = output_layout.lock() {
                        *layout = document.layout;
                    }
                    debug!(
                        "mode={:?} has_changes={} is_saving={} can_undo_reset={}",
                        state.mode, state.has_changes, state.is_saving, state.can_undo_reset
                    );
                }
                Ok(Message::Layout(LayoutMessage::CommandRejected { reason })) => {
                    warn!("Command rejected: {}", reason);
                }
                Ok(Message::Notification(notification)) => match notification.level {
                    NotificationLevel::Info => info!("{}", notification.text),
                    NotificationLevel::Warning => warn!("{}", notification.text),
                    NotificationLevel::Error => error!("{}", notification.text),
                },
                Ok(Message::Layout(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Console output lagged, skipped {} message(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let input_sender = bus_sender.clone();
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        error!("Failed to read console input: {}", err);
                        break;
                    }
                };
                let current_layout = match latest_layout.lock() {
                    Ok(layout) => layout.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                let Some(commands) = parse_command(&line, &current_layout) else {
                    if !line.trim().is_empty() {
                        warn!("Unrecognized command: {}", line.trim());
                    }
                    continue;
                };
                for command in commands {
                    let shutting_down = matches!(command, LayoutMessage::Shutdown);
                    let _ = input_sender.send(Message::Layout(command));
                    if shutting_down {
                        return;
                    }
                }
            }
            let _ = input_sender.send(Message::Layout(LayoutMessage::Shutdown));
        })?;

    runtime.block_on(manager_handle)?;
    info!("Dashboard layout engine stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_command;
    use dashboard_layout::layout::default_layout_document;
    use dashboard_layout::protocol::LayoutMessage;

    #[test]
    fn test_parse_known_commands() {
        let layout = default_layout_document().layout;
        let single = |line: &str| {
            let mut commands = parse_command(line, &layout).expect("command should parse");
            assert_eq!(commands.len(), 1);
            commands.remove(0)
        };
        assert!(matches!(
            single("customize"),
            LayoutMessage::BeginCustomizing
        ));
        assert!(matches!(
            single("toggle stats"),
            LayoutMessage::ToggleWidgetVisibility { id } if id == "stats"
        ));
        assert!(matches!(
            single("resize topMovers 4 3"),
            LayoutMessage::ResizeWidget { w: 4, h: 3, .. }
        ));
        assert!(matches!(single("quit"), LayoutMessage::Shutdown));
    }

    #[test]
    fn test_move_expands_to_a_drag_gesture() {
        let layout = default_layout_document().layout;
        let commands = parse_command("move topMovers totalBalance", &layout).expect("parse");
        assert!(matches!(
            commands.as_slice(),
            [
                LayoutMessage::DragStart { id },
                LayoutMessage::DragEnd { over_id: Some(over_id) },
            ] if id == "topMovers" && over_id == "totalBalance"
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        let layout = default_layout_document().layout;
        assert!(parse_command("", &layout).is_none());
        assert!(parse_command("resize topMovers wide 3", &layout).is_none());
        assert!(parse_command("toggle", &layout).is_none());
        assert!(parse_command("nudge retired 1 0", &layout).is_none());
    }

    #[test]
    fn test_nudge_builds_full_layout_update() {
        let layout = default_layout_document().layout;
        let mut commands = parse_command("nudge stats 0 1", &layout).expect("parse");
        let Some(LayoutMessage::UpdateLayout(updated)) = commands.pop() else {
            panic!("expected UpdateLayout");
        };
        assert_eq!(updated.len(), layout.len());
        let stats = updated.iter().find(|item| item.id == "stats").expect("stats");
        assert_eq!((stats.x, stats.y), (4, 1));
    }
}
