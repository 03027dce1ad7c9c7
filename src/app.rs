//! Main application logic for StealthPad

use anyhow::Result;
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, KillTimer, SetTimer, TranslateMessage, MSG,
};

use crate::config::Config;
use crate::hotkey::{self, HotkeyManager};
use crate::store::BoundsStore;
use crate::tray::{self, TrayIcon};
use crate::utils::get_primary_work_area;
use crate::window::manager;
use crate::window::proc::FULLSCREEN_TIMER;
use crate::window::state::{set_registry, NoteRegistry};

/// Main application state
pub struct Application {
    config: Arc<Config>,
    registry: Arc<RwLock<NoteRegistry>>,
    controller: isize,
    tray_icon: Option<TrayIcon>,
    hotkeys: HotkeyManager,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: Arc<Config>) -> Result<Self> {
        info!("Initializing StealthPad application");

        unsafe {
            let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
        }

        let store = BoundsStore::open(BoundsStore::default_path());
        let registry = Arc::new(RwLock::new(NoteRegistry::new(store, config.clone())));
        set_registry(registry.clone());

        manager::register_window_classes()?;
        let controller = manager::create_controller_window()?;
        let controller_hwnd = HWND(controller as *mut std::ffi::c_void);

        // Tray icon is the recovery surface; still run without it
        let tray_icon = match TrayIcon::new(controller_hwnd) {
            Ok(tray) => {
                info!("Tray icon created successfully");
                Some(tray)
            }
            Err(e) => {
                warn!("Failed to create tray icon: {}", e);
                None
            }
        };

        let mut hotkeys = HotkeyManager::new(controller_hwnd);
        let hotkey_map = hotkey::register_default_hotkeys(&mut hotkeys, &config.hotkeys);
        hotkey::set_global_hotkey_map(hotkey_map);

        unsafe {
            SetTimer(
                controller_hwnd,
                FULLSCREEN_TIMER,
                config.behavior.fullscreen_poll_ms,
                None,
            );
        }

        Ok(Self {
            config,
            registry,
            controller,
            tray_icon,
            hotkeys,
        })
    }

    /// Run the application
    pub fn run(&mut self) -> Result<()> {
        self.open_persisted_notes()?;
        tray::rebuild(&self.registry);

        info!("Entering StealthPad message loop");
        unsafe {
            let mut msg = MSG::default();
            while GetMessageW(&mut msg, None, 0, 0).into() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        info!("StealthPad message loop ended");

        Ok(())
    }

    /// Recreate one window per persisted note, or a single fresh note on
    /// first launch. Stored bounds are clamped into the work area; notes
    /// without a bounds record get cascade placement.
    fn open_persisted_notes(&self) -> Result<()> {
        let plan = {
            let reg = self.registry.read();
            let ids = reg.store().note_ids();
            if ids.is_empty() {
                Vec::new()
            } else {
                let work_area = get_primary_work_area().unwrap_or(crate::store::Bounds {
                    x: 0,
                    y: 0,
                    width: 1280,
                    height: 800,
                });
                manager::plan_startup_bounds(&ids, reg.store(), work_area, &self.config)
            }
        };

        if plan.is_empty() {
            manager::create_note_window(&self.registry, None, None)?;
            return Ok(());
        }

        info!("Restoring {} persisted note(s)", plan.len());
        for (note_id, bounds) in plan {
            if let Err(e) =
                manager::create_note_window(&self.registry, Some(note_id.clone()), Some(bounds))
            {
                warn!("Failed to restore note {}: {}", note_id, e);
            }
        }
        Ok(())
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        info!("Cleaning up StealthPad application");
        self.hotkeys.unregister_all();
        // Dropping the tray icon removes it from the shell
        self.tray_icon.take();
        unsafe {
            let _ = KillTimer(
                HWND(self.controller as *mut std::ffi::c_void),
                FULLSCREEN_TIMER,
            );
        }
    }
}
