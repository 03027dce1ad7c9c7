//! System tray control surface for StealthPad
//!
//! The tray icon is the always-available recovery path for notes that have
//! been dimmed or hidden. Its context menu is derived from the current
//! Window Set and rebuilt after every creation and closure; primary and
//! secondary clicks open the same menu.

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use windows::core::PCWSTR;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyIcon, LoadImageW, HICON, IDI_APPLICATION, IMAGE_ICON, LR_DEFAULTSIZE, LR_SHARED,
};

use crate::error::{PadError, PadResult};
use crate::utils::to_wide_string;
use crate::window::manager;
use crate::window::proc::WM_PAD_TRAY;
use crate::window::state::{self, NoteRegistry};

/// Tray icon identifier
const TRAY_ICON_ID: u32 = 1;

// Menu item IDs
const MENU_SHOW_ALL: u32 = 1001;
const MENU_HIDE_ALL: u32 = 1002;
const MENU_NEW_NOTE: u32 = 1003;
const MENU_QUIT: u32 = 1999;
/// Per-note items are MENU_NOTE_BASE + position in the Window Set
const MENU_NOTE_BASE: u32 = 1100;

/// System tray manager
pub struct TrayIcon {
    hwnd: HWND,
    icon: HICON,
    is_added: bool,
}

impl TrayIcon {
    /// Create and add the tray icon, bound to the controller window
    pub fn new(hwnd: HWND) -> PadResult<Self> {
        let icon = Self::load_default_icon()?;

        let mut tray = Self {
            hwnd,
            icon,
            is_added: false,
        };

        tray.add()?;

        Ok(tray)
    }

    /// Load the stock application icon
    fn load_default_icon() -> PadResult<HICON> {
        unsafe {
            let icon = LoadImageW(
                None,
                IDI_APPLICATION,
                IMAGE_ICON,
                0,
                0,
                LR_DEFAULTSIZE | LR_SHARED,
            )?;
            Ok(HICON(icon.0))
        }
    }

    /// Add the tray icon
    fn add(&mut self) -> PadResult<()> {
        let tooltip = to_wide_string("StealthPad - sticky notes");

        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd,
            uID: TRAY_ICON_ID,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_PAD_TRAY,
            hIcon: self.icon,
            ..Default::default()
        };

        let tooltip_len = tooltip.len().min(128);
        nid.szTip[..tooltip_len].copy_from_slice(&tooltip[..tooltip_len]);

        unsafe {
            if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
                return Err(PadError::Tray("failed to add tray icon".to_string()));
            }
        }

        self.is_added = true;
        info!("Tray icon added");

        Ok(())
    }

    /// Remove the tray icon
    fn remove(&mut self) -> PadResult<()> {
        if !self.is_added {
            return Ok(());
        }

        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd,
            uID: TRAY_ICON_ID,
            ..Default::default()
        };

        unsafe {
            if !Shell_NotifyIconW(NIM_DELETE, &nid).as_bool() {
                return Err(PadError::Tray("failed to remove tray icon".to_string()));
            }
        }

        self.is_added = false;
        info!("Tray icon removed");

        Ok(())
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        let _ = self.remove();
        unsafe {
            if !self.icon.is_invalid() {
                let _ = DestroyIcon(self.icon);
            }
        }
    }
}

/// Tray menu item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenuItem {
    pub id: u32,
    pub label: String,
    pub is_separator: bool,
}

impl TrayMenuItem {
    fn item(id: u32, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            is_separator: false,
        }
    }

    fn separator() -> Self {
        Self {
            id: 0,
            label: String::new(),
            is_separator: true,
        }
    }
}

/// Derive the tray menu from the current Window Set labels
pub fn derive_menu(labels: &[String]) -> Vec<TrayMenuItem> {
    let mut items = vec![
        TrayMenuItem::item(MENU_SHOW_ALL, "Show All Notes"),
        TrayMenuItem::item(MENU_HIDE_ALL, "Hide All Notes"),
        TrayMenuItem::item(MENU_NEW_NOTE, "New Note"),
        TrayMenuItem::separator(),
    ];
    for (idx, label) in labels.iter().enumerate() {
        items.push(TrayMenuItem::item(MENU_NOTE_BASE + idx as u32, label));
    }
    items.push(TrayMenuItem::separator());
    items.push(TrayMenuItem::item(MENU_QUIT, "Quit"));
    items
}

// Current menu model, replaced wholesale by rebuild()
static TRAY_MENU: OnceCell<Mutex<Vec<TrayMenuItem>>> = OnceCell::new();

/// Recompute the tray menu from the registry; called after every Window
/// Set mutation. Idempotent, no side effect beyond menu replacement.
pub fn rebuild(registry: &Arc<RwLock<NoteRegistry>>) {
    let labels = registry.read().labels();
    let items = derive_menu(&labels);
    let menu = TRAY_MENU.get_or_init(|| Mutex::new(Vec::new()));
    *menu.lock() = items;
    debug!("Tray menu rebuilt with {} note entries", labels.len());
}

/// Pop up the current tray menu at the cursor and run the chosen command
pub fn show_menu(hwnd: HWND) {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::WindowsAndMessaging::{
        AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, SetForegroundWindow,
        TrackPopupMenu, MF_SEPARATOR, MF_STRING, TPM_LEFTALIGN, TPM_RETURNCMD, TPM_RIGHTBUTTON,
    };

    let items = match TRAY_MENU.get() {
        Some(menu) => menu.lock().clone(),
        None => return,
    };

    unsafe {
        let menu = match CreatePopupMenu() {
            Ok(menu) => menu,
            Err(e) => {
                warn!("Failed to create tray menu: {}", e);
                return;
            }
        };

        for item in &items {
            if item.is_separator {
                AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null()).ok();
            } else {
                let label = to_wide_string(&item.label);
                AppendMenuW(menu, MF_STRING, item.id as usize, PCWSTR::from_raw(label.as_ptr()))
                    .ok();
            }
        }

        let mut pt = POINT::default();
        if GetCursorPos(&mut pt).is_err() {
            let _ = DestroyMenu(menu);
            return;
        }

        // Menu needs foreground status to dismiss correctly
        let _ = SetForegroundWindow(hwnd);

        let cmd = TrackPopupMenu(
            menu,
            TPM_RIGHTBUTTON | TPM_LEFTALIGN | TPM_RETURNCMD,
            pt.x,
            pt.y,
            0,
            hwnd,
            None,
        );

        DestroyMenu(menu).ok();

        if cmd.as_bool() {
            handle_command(cmd.0 as u32);
        }
    }
}

/// Run a tray menu command
pub fn handle_command(cmd_id: u32) {
    let Some(registry) = state::get_registry() else {
        return;
    };

    match cmd_id {
        MENU_SHOW_ALL => {
            let targets: Vec<isize> = registry.read().windows().iter().map(|w| w.hwnd).collect();
            let dimmed = registry.read().config().appearance.dimmed_opacity;
            for hwnd in targets {
                manager::show_note(hwnd);
                manager::apply_opacity(&registry, hwnd, dimmed);
            }
        }

        MENU_HIDE_ALL => {
            let targets: Vec<isize> = registry.read().windows().iter().map(|w| w.hwnd).collect();
            for hwnd in targets {
                manager::hide_note(hwnd);
            }
        }

        MENU_NEW_NOTE => {
            if let Err(e) = manager::create_note_window(&registry, None, None) {
                warn!("Failed to create note from tray: {}", e);
            }
        }

        MENU_QUIT => {
            info!("Quit requested from tray");
            state::set_quitting();
            unsafe {
                windows::Win32::UI::WindowsAndMessaging::PostQuitMessage(0);
            }
        }

        id if id >= MENU_NOTE_BASE => {
            let idx = (id - MENU_NOTE_BASE) as usize;
            let target = registry.read().windows().get(idx).map(|w| w.hwnd);
            if let Some(hwnd) = target {
                manager::focus_note(&registry, hwnd);
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_shape_for_two_notes() {
        let labels = vec!["Note 1".to_string(), "Note 2".to_string()];
        let items = derive_menu(&labels);

        let labels_seen: Vec<&str> = items
            .iter()
            .map(|i| {
                if i.is_separator {
                    "---"
                } else {
                    i.label.as_str()
                }
            })
            .collect();
        assert_eq!(
            labels_seen,
            vec![
                "Show All Notes",
                "Hide All Notes",
                "New Note",
                "---",
                "Note 1",
                "Note 2",
                "---",
                "Quit"
            ]
        );
        assert_eq!(items[4].id, MENU_NOTE_BASE);
        assert_eq!(items[5].id, MENU_NOTE_BASE + 1);
    }

    #[test]
    fn menu_with_no_notes_still_offers_global_actions() {
        let items = derive_menu(&[]);
        assert!(items.iter().any(|i| i.id == MENU_NEW_NOTE));
        assert!(items.iter().any(|i| i.id == MENU_QUIT));
        assert!(!items.iter().any(|i| i.id >= MENU_NOTE_BASE && i.id < MENU_QUIT));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = crate::store::BoundsStore::open(dir.path().join("store.json"));
        let registry = Arc::new(RwLock::new(NoteRegistry::new(
            store,
            Arc::new(crate::config::Config::default()),
        )));
        registry
            .write()
            .insert("a".to_string(), 0, crate::store::Bounds::new(0, 0, 400, 300));

        rebuild(&registry);
        let first = TRAY_MENU.get().unwrap().lock().clone();
        rebuild(&registry);
        let second = TRAY_MENU.get().unwrap().lock().clone();
        assert_eq!(first, second);
    }
}
