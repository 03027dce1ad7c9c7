//! Page-facing command surface for StealthPad
//!
//! The content collaborator behind each note window drives the controller
//! with a small set of JSON commands carried by `WM_COPYDATA`; the sender's
//! window handle rides in `wparam`, so every command is resolved against
//! the specific window that issued it. Replies and the two controller-side
//! notifications (`note-id`, `display-changed`) travel the same way in the
//! opposite direction. Commands against a window that is gone resolve to
//! a documented default instead of an error.

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::display::{self, DisplayInfo};
use crate::window::manager;
use crate::window::state::NoteRegistry;

/// `COPYDATASTRUCT.dwData` tags for the message contract
pub const COPYDATA_COMMAND: usize = 1;
pub const COPYDATA_REPLY: usize = 2;
pub const COPYDATA_NOTIFY: usize = 3;

/// Default reply when `set-opacity` cannot resolve its window
const DEFAULT_OPACITY_REPLY: i64 = 30;

/// A command issued by page content against its own window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "kebab-case")]
pub enum Command {
    CreateNote,
    CloseWindow,
    MinimizeWindow,
    FocusWindow,
    SetOpacity(i64),
    ToggleAlwaysOnTop,
    SetStealthMode(bool),
    GetScreenInfo,
}

/// Reply payload; serialized as the bare result value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandReply {
    None,
    Number(i64),
    Bool(bool),
    Displays(Vec<DisplayInfo>),
}

/// Controller-to-content notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "kebab-case")]
pub enum Notification {
    NoteId(String),
    DisplayChanged,
}

/// Execute a command against the issuing window
pub fn execute(registry: &Arc<RwLock<NoteRegistry>>, issuer: isize, command: Command) -> CommandReply {
    debug!("Executing {:?} for window {:#x}", command, issuer);

    let issuer_live = registry.read().get(issuer).is_some();

    match command {
        Command::CreateNote => {
            if let Err(e) = manager::create_note_window(registry, None, None) {
                warn!("create-note failed: {}", e);
            }
            CommandReply::None
        }

        Command::CloseWindow => {
            if issuer_live {
                manager::close_note(issuer);
            }
            CommandReply::None
        }

        Command::MinimizeWindow => {
            if issuer_live {
                manager::minimize_note(issuer);
            }
            CommandReply::None
        }

        Command::FocusWindow => {
            if issuer_live {
                manager::focus_note(registry, issuer);
            }
            CommandReply::None
        }

        Command::SetOpacity(value) => {
            if !issuer_live {
                return CommandReply::Number(DEFAULT_OPACITY_REPLY);
            }
            let value = value.clamp(0, 100);
            manager::apply_opacity(registry, issuer, value as f64 / 100.0);
            CommandReply::Number(value)
        }

        Command::ToggleAlwaysOnTop => {
            if !issuer_live {
                return CommandReply::Bool(false);
            }
            let on_top = {
                let reg = registry.read();
                reg.get(issuer).map(|w| w.always_on_top).unwrap_or(false)
            };
            manager::apply_always_on_top(registry, issuer, !on_top);
            CommandReply::Bool(!on_top)
        }

        Command::SetStealthMode(enabled) => {
            if !issuer_live {
                return CommandReply::Bool(false);
            }
            let (stealth_opacity, dimmed_opacity) = {
                let reg = registry.read();
                let cfg = reg.config();
                (
                    cfg.appearance.stealth_opacity,
                    cfg.appearance.dimmed_opacity,
                )
            };
            if enabled {
                manager::apply_opacity(registry, issuer, stealth_opacity);
                manager::set_skip_taskbar(issuer, true);
                manager::apply_always_on_top(registry, issuer, true);
            } else {
                manager::apply_opacity(registry, issuer, dimmed_opacity);
                manager::set_skip_taskbar(issuer, false);
            }
            if let Some(w) = registry.write().get_mut(issuer) {
                w.stealth = enabled;
            }
            CommandReply::Bool(enabled)
        }

        Command::GetScreenInfo => CommandReply::Displays(display::enumerate_displays()),
    }
}

/// Handle one inbound `WM_COPYDATA` payload for a note window: attach the
/// content collaborator, run the command, and return the serialized reply.
/// The one-shot `note-id` notification fires on first contact.
pub fn handle_command_payload(
    registry: &Arc<RwLock<NoteRegistry>>,
    issuer: isize,
    sender: isize,
    payload: &[u8],
) -> Option<Vec<u8>> {
    let first_contact_id = registry.write().attach_content(issuer, sender);
    if let Some(note_id) = first_contact_id {
        send_notification(sender, &Notification::NoteId(note_id));
    }

    let command: Command = match serde_json::from_slice(payload) {
        Ok(command) => command,
        Err(e) => {
            warn!("Ignoring malformed command payload: {}", e);
            return None;
        }
    };

    let reply = execute(registry, issuer, command);
    match serde_json::to_vec(&reply) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Failed to serialize command reply: {}", e);
            None
        }
    }
}

/// Send a JSON notification to a content window over `WM_COPYDATA`
pub fn send_notification(target: isize, notification: &Notification) {
    let payload = match serde_json::to_vec(notification) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to serialize notification: {}", e);
            return;
        }
    };
    send_copydata(target, COPYDATA_NOTIFY, &payload);
}

/// Send a serialized reply back to the issuing content window
pub fn send_reply(target: isize, payload: &[u8]) {
    send_copydata(target, COPYDATA_REPLY, payload);
}

fn send_copydata(target: isize, tag: usize, payload: &[u8]) {
    use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
    use windows::Win32::System::DataExchange::COPYDATASTRUCT;
    use windows::Win32::UI::WindowsAndMessaging::{SendMessageW, WM_COPYDATA};

    if !manager::is_live(target) {
        return;
    }

    let cds = COPYDATASTRUCT {
        dwData: tag,
        cbData: payload.len() as u32,
        lpData: payload.as_ptr() as *mut std::ffi::c_void,
    };
    unsafe {
        SendMessageW(
            HWND(target as *mut std::ffi::c_void),
            WM_COPYDATA,
            WPARAM(0),
            LPARAM(&cds as *const COPYDATASTRUCT as isize),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{Bounds, BoundsStore};

    fn test_registry() -> (tempfile::TempDir, Arc<RwLock<NoteRegistry>>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BoundsStore::open(dir.path().join("store.json"));
        let registry = Arc::new(RwLock::new(NoteRegistry::new(
            store,
            Arc::new(Config::default()),
        )));
        (dir, registry)
    }

    #[test]
    fn command_wire_shape_parses() {
        let cmd: Command = serde_json::from_str(r#"{"command":"set-opacity","value":55}"#).unwrap();
        assert_eq!(cmd, Command::SetOpacity(55));

        let cmd: Command = serde_json::from_str(r#"{"command":"close-window"}"#).unwrap();
        assert_eq!(cmd, Command::CloseWindow);

        let cmd: Command =
            serde_json::from_str(r#"{"command":"set-stealth-mode","value":true}"#).unwrap();
        assert_eq!(cmd, Command::SetStealthMode(true));
    }

    #[test]
    fn replies_serialize_as_bare_values() {
        assert_eq!(serde_json::to_string(&CommandReply::Number(55)).unwrap(), "55");
        assert_eq!(serde_json::to_string(&CommandReply::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&CommandReply::None).unwrap(), "null");
    }

    #[test]
    fn set_opacity_echoes_and_stores_fraction() {
        let (_dir, registry) = test_registry();
        registry
            .write()
            .insert("a".to_string(), 0, Bounds::new(0, 0, 400, 300));

        let reply = execute(&registry, 0, Command::SetOpacity(55));
        assert_eq!(reply, CommandReply::Number(55));
        assert_eq!(registry.read().get(0).unwrap().opacity, 0.55);
    }

    #[test]
    fn set_opacity_against_destroyed_window_returns_default() {
        let (_dir, registry) = test_registry();
        let reply = execute(&registry, 0xdead, Command::SetOpacity(55));
        assert_eq!(reply, CommandReply::Number(30));
    }

    #[test]
    fn toggle_always_on_top_flips_and_reports() {
        let (_dir, registry) = test_registry();
        registry
            .write()
            .insert("a".to_string(), 0, Bounds::new(0, 0, 400, 300));

        assert_eq!(execute(&registry, 0, Command::ToggleAlwaysOnTop), CommandReply::Bool(false));
        assert_eq!(execute(&registry, 0, Command::ToggleAlwaysOnTop), CommandReply::Bool(true));
        assert_eq!(
            execute(&registry, 0xdead, Command::ToggleAlwaysOnTop),
            CommandReply::Bool(false)
        );
    }

    #[test]
    fn stealth_mode_echoes_and_drives_opacity_preset() {
        let (_dir, registry) = test_registry();
        registry
            .write()
            .insert("a".to_string(), 0, Bounds::new(0, 0, 400, 300));

        assert_eq!(
            execute(&registry, 0, Command::SetStealthMode(true)),
            CommandReply::Bool(true)
        );
        {
            let reg = registry.read();
            let w = reg.get(0).unwrap();
            assert!(w.stealth);
            assert_eq!(w.opacity, reg.config().appearance.stealth_opacity);
        }

        assert_eq!(
            execute(&registry, 0, Command::SetStealthMode(false)),
            CommandReply::Bool(false)
        );
        let reg = registry.read();
        let w = reg.get(0).unwrap();
        assert!(!w.stealth);
        assert_eq!(w.opacity, reg.config().appearance.dimmed_opacity);
    }
}
