//! Global keyboard shortcuts for StealthPad
//!
//! Handles process-wide hotkey registration and dispatch. The shortcuts are
//! bound once at startup against the hidden controller window and
//! unregistered as a group when the manager drops.

use log::{debug, info, warn};
use std::collections::HashMap;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_SHIFT, MOD_WIN,
};

use crate::config::HotkeyConfig;
use crate::error::{PadError, PadResult};

/// Hotkey action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Toggle show/hide of the current note window
    ToggleNote,
    /// Drive the current note to near-zero opacity
    ForceHide,
    /// Restore moderate opacity and focus the current note
    Restore,
}

/// Parsed hotkey
#[derive(Debug, Clone)]
pub struct Hotkey {
    pub modifiers: u32,
    pub key: u32,
    pub action: HotkeyAction,
}

impl Hotkey {
    /// Parse a hotkey string like "Ctrl+Shift+N"
    pub fn parse(s: &str, action: HotkeyAction) -> Option<Self> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).collect();
        if parts.is_empty() {
            return None;
        }

        let mut modifiers = 0u32;
        let mut key = 0u32;

        for (i, part) in parts.iter().enumerate() {
            let part_upper = part.to_uppercase();

            if i == parts.len() - 1 {
                key = Self::parse_key(&part_upper)?;
            } else {
                match part_upper.as_str() {
                    "ALT" => modifiers |= MOD_ALT.0,
                    "CTRL" | "CONTROL" => modifiers |= MOD_CONTROL.0,
                    "SHIFT" => modifiers |= MOD_SHIFT.0,
                    "WIN" | "WINDOWS" | "SUPER" => modifiers |= MOD_WIN.0,
                    _ => return None,
                }
            }
        }

        Some(Self {
            modifiers,
            key,
            action,
        })
    }

    /// Parse a key name to virtual key code
    fn parse_key(s: &str) -> Option<u32> {
        if s.len() == 1 {
            let c = s.chars().next()?;
            if c.is_ascii_alphanumeric() {
                return Some(c.to_ascii_uppercase() as u32);
            }
        }

        match s {
            "SPACE" => Some(0x20),
            "ENTER" | "RETURN" => Some(0x0D),
            "TAB" => Some(0x09),
            "ESCAPE" | "ESC" => Some(0x1B),
            "HOME" => Some(0x24),
            "END" => Some(0x23),
            "UP" => Some(0x26),
            "DOWN" => Some(0x28),
            "LEFT" => Some(0x25),
            "RIGHT" => Some(0x27),
            _ => None,
        }
    }
}

/// Hotkey manager
pub struct HotkeyManager {
    hwnd: HWND,
    hotkeys: HashMap<i32, Hotkey>,
    next_id: i32,
}

impl HotkeyManager {
    /// Create a new hotkey manager bound to `hwnd`
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            hotkeys: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a hotkey
    pub fn register(&mut self, hotkey: Hotkey) -> PadResult<i32> {
        let id = self.next_id;
        self.next_id += 1;

        unsafe {
            let result = RegisterHotKey(
                self.hwnd,
                id,
                HOT_KEY_MODIFIERS(hotkey.modifiers),
                hotkey.key,
            );

            if result.is_ok() {
                info!("Registered hotkey {} for {:?}", id, hotkey.action);
                self.hotkeys.insert(id, hotkey);
                Ok(id)
            } else {
                warn!("Failed to register hotkey for {:?}", hotkey.action);
                Err(PadError::Hotkey(format!(
                    "registration failed for {:?}",
                    hotkey.action
                )))
            }
        }
    }

    /// Register a hotkey from string
    pub fn register_from_string(&mut self, s: &str, action: HotkeyAction) -> PadResult<i32> {
        let hotkey = Hotkey::parse(s, action)
            .ok_or_else(|| PadError::Config(format!("invalid hotkey string: {}", s)))?;
        self.register(hotkey)
    }

    /// Unregister a hotkey by ID
    pub fn unregister(&mut self, id: i32) {
        unsafe {
            if UnregisterHotKey(self.hwnd, id).is_ok() {
                self.hotkeys.remove(&id);
                debug!("Unregistered hotkey {}", id);
            }
        }
    }

    /// Unregister all hotkeys
    pub fn unregister_all(&mut self) {
        let ids: Vec<i32> = self.hotkeys.keys().copied().collect();
        for id in ids {
            self.unregister(id);
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

// Global hotkey mapping (id -> action) so the WM_HOTKEY handler can dispatch
use once_cell::sync::OnceCell;
use parking_lot::Mutex as PLMutex;

static GLOBAL_HOTKEY_MAP: OnceCell<PLMutex<HashMap<i32, HotkeyAction>>> = OnceCell::new();

/// Set the global mapping of hotkey ids to actions (only first set wins)
pub fn set_global_hotkey_map(map: HashMap<i32, HotkeyAction>) {
    let _ = GLOBAL_HOTKEY_MAP.set(PLMutex::new(map));
}

/// Get the global hotkey map (if set)
pub fn global_hotkey_map() -> Option<&'static PLMutex<HashMap<i32, HotkeyAction>>> {
    GLOBAL_HOTKEY_MAP.get()
}

/// Register the configured note shortcuts, returning the id -> action map
pub fn register_default_hotkeys(
    manager: &mut HotkeyManager,
    config: &HotkeyConfig,
) -> HashMap<i32, HotkeyAction> {
    let mut map = HashMap::new();

    let mut register = |key: &Option<String>, action: HotkeyAction| {
        if let Some(s) = key {
            match manager.register_from_string(s, action) {
                Ok(id) => {
                    map.insert(id, action);
                }
                Err(e) => warn!("Failed to register {:?} hotkey: {}", action, e),
            }
        }
    };

    register(&config.toggle_note, HotkeyAction::ToggleNote);
    register(&config.force_hide, HotkeyAction::ForceHide);
    register(&config.restore, HotkeyAction::Restore);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modifier_combination() {
        let hk = Hotkey::parse("Ctrl+Shift+N", HotkeyAction::ToggleNote).expect("parse");
        assert_eq!(hk.modifiers, MOD_CONTROL.0 | MOD_SHIFT.0);
        assert_eq!(hk.key, 'N' as u32);
        assert_eq!(hk.action, HotkeyAction::ToggleNote);
    }

    #[test]
    fn parse_rejects_unknown_modifier() {
        assert!(Hotkey::parse("Hyper+N", HotkeyAction::Restore).is_none());
    }

    #[test]
    fn parse_rejects_unknown_key() {
        assert!(Hotkey::parse("Ctrl+Banana", HotkeyAction::ForceHide).is_none());
    }
}
