//! Window procedures for StealthPad
//!
//! `note_window_proc` drives the per-note lifecycle (geometry persistence,
//! focus/blur opacity, close-time cleanup, command intake), while
//! `controller_window_proc` serves the hidden window behind the tray icon,
//! the global hotkeys, the fullscreen-presentation poll and the
//! display-change broadcast.

use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::commands;
use crate::hotkey::{global_hotkey_map, HotkeyAction};
use crate::store::Bounds;
use crate::tray;
use crate::window::manager;

use super::state::{get_registry, is_quitting};

/// Tray callback message
pub const WM_PAD_TRAY: u32 = WM_USER + 1;

/// Timer id for the fullscreen-presentation poll
pub const FULLSCREEN_TIMER: usize = 1;

// Whether another surface is currently in a fullscreen/presentation state
static FULLSCREEN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Window procedure for note windows
pub unsafe extern "system" fn note_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_CREATE => {
            debug!("Note window created");
            LRESULT(0)
        }

        WM_MOVE | WM_SIZE => {
            persist_current_bounds(hwnd);
            LRESULT(0)
        }

        WM_ACTIVATE => {
            let activation = (wparam.0 & 0xFFFF) as u32;
            if activation == WA_INACTIVE {
                on_note_blur(hwnd);
            } else {
                on_note_focus(hwnd);
            }
            LRESULT(0)
        }

        WM_COPYDATA => {
            let handled = handle_copydata(hwnd, wparam, lparam);
            LRESULT(if handled { 1 } else { 0 })
        }

        WM_CLOSE => {
            DestroyWindow(hwnd).ok();
            LRESULT(0)
        }

        WM_DESTROY => {
            on_note_destroyed(hwnd);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Window procedure for the hidden controller window
pub unsafe extern "system" fn controller_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAD_TRAY => {
            let event = (lparam.0 & 0xFFFF) as u32;
            // Primary and secondary clicks open the same menu
            if event == WM_LBUTTONUP || event == WM_RBUTTONUP {
                tray::show_menu(hwnd);
            }
            LRESULT(0)
        }

        WM_HOTKEY => {
            if let Some(map) = global_hotkey_map() {
                let action = map.lock().get(&(wparam.0 as i32)).copied();
                if let Some(action) = action {
                    handle_hotkey_action(action);
                }
            }
            LRESULT(0)
        }

        WM_TIMER => {
            if wparam.0 == FULLSCREEN_TIMER {
                poll_fullscreen_state();
            }
            LRESULT(0)
        }

        WM_DISPLAYCHANGE => {
            broadcast_display_change();
            LRESULT(0)
        }

        WM_DESTROY => {
            info!("Controller window destroyed, quitting");
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Persist a note's on-screen rectangle after a move or resize
fn persist_current_bounds(hwnd: HWND) {
    if is_quitting() {
        return;
    }
    unsafe {
        // Minimized windows report an off-screen placeholder rectangle
        if IsIconic(hwnd).as_bool() {
            return;
        }
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_err() {
            return;
        }
        if let Some(registry) = get_registry() {
            registry.write().update_bounds(
                hwnd.0 as isize,
                Bounds {
                    x: rect.left,
                    y: rect.top,
                    width: rect.right - rect.left,
                    height: rect.bottom - rect.top,
                },
            );
        }
    }
}

/// Gaining focus: raise above the other topmost notes, become slightly
/// more visible (never fully opaque)
fn on_note_focus(hwnd: HWND) {
    let Some(registry) = get_registry() else {
        return;
    };
    let raw = hwnd.0 as isize;
    let focused = registry.read().config().appearance.focused_opacity;
    manager::bring_to_front(&registry, raw);
    if !FULLSCREEN_ACTIVE.load(Ordering::SeqCst) {
        manager::apply_opacity(&registry, raw, focused);
    }
}

/// Losing focus: dim but stay present
fn on_note_blur(hwnd: HWND) {
    let Some(registry) = get_registry() else {
        return;
    };
    let raw = hwnd.0 as isize;
    registry.write().blur(raw);
    let dimmed = registry.read().config().appearance.dimmed_opacity;
    if !FULLSCREEN_ACTIVE.load(Ordering::SeqCst) {
        manager::apply_opacity(&registry, raw, dimmed);
    }
}

/// A note window is gone: drop it from the Window Set and the store, and
/// refresh the tray. Skipped wholesale during shutdown so every persisted
/// note returns on next launch.
fn on_note_destroyed(hwnd: HWND) {
    if is_quitting() {
        return;
    }
    let Some(registry) = get_registry() else {
        return;
    };

    let removed = registry.write().remove_by_hwnd(hwnd.0 as isize);
    if let Some(removed) = removed {
        info!("Note window {} closed", removed.note_id);
        tray::rebuild(&registry);

        // Last note closed by the user ends the session
        if registry.read().is_empty() {
            unsafe { PostQuitMessage(0) };
        }
    }
}

/// Inbound command from the content collaborator behind this note window
fn handle_copydata(hwnd: HWND, wparam: WPARAM, lparam: LPARAM) -> bool {
    let Some(registry) = get_registry() else {
        return false;
    };
    if lparam.0 == 0 {
        return false;
    }

    let (tag, payload) = unsafe {
        let cds = &*(lparam.0 as *const COPYDATASTRUCT);
        let bytes = if cds.lpData.is_null() || cds.cbData == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(cds.lpData as *const u8, cds.cbData as usize).to_vec()
        };
        (cds.dwData, bytes)
    };

    if tag != commands::COPYDATA_COMMAND {
        return false;
    }

    let sender = wparam.0 as isize;
    if let Some(reply) =
        commands::handle_command_payload(&registry, hwnd.0 as isize, sender, &payload)
    {
        commands::send_reply(sender, &reply);
    }
    true
}

/// Global shortcut dispatch; the target is the foreground note window,
/// falling back to the most recently focused live note
fn handle_hotkey_action(action: HotkeyAction) {
    let Some(registry) = get_registry() else {
        return;
    };

    let target = {
        let reg = registry.read();
        let foreground = unsafe { GetForegroundWindow().0 as isize };
        if reg.get(foreground).is_some() {
            Some(foreground)
        } else {
            reg.top_window().map(|w| w.hwnd)
        }
    };
    let Some(target) = target else {
        return;
    };

    let (dimmed, hidden) = {
        let reg = registry.read();
        let cfg = reg.config();
        (
            cfg.appearance.dimmed_opacity,
            cfg.appearance.hidden_opacity,
        )
    };

    match action {
        HotkeyAction::ToggleNote => {
            if manager::is_note_visible(target) {
                manager::hide_note(target);
            } else {
                manager::focus_note(&registry, target);
            }
        }
        HotkeyAction::ForceHide => {
            manager::apply_opacity(&registry, target, hidden);
        }
        HotkeyAction::Restore => {
            manager::apply_opacity(&registry, target, dimmed);
            manager::focus_note(&registry, target);
        }
    }
}

/// Poll for an exclusive fullscreen/presentation surface elsewhere and
/// drive all notes to near-zero visibility while one is active
fn poll_fullscreen_state() {
    use windows::Win32::UI::Shell::{
        SHQueryUserNotificationState, QUNS_BUSY, QUNS_PRESENTATION_MODE,
        QUNS_RUNNING_D3D_FULL_SCREEN,
    };

    let state = match unsafe { SHQueryUserNotificationState() } {
        Ok(state) => state,
        // Capability absent: leave visibility alone
        Err(_) => return,
    };
    let fullscreen = state == QUNS_BUSY
        || state == QUNS_RUNNING_D3D_FULL_SCREEN
        || state == QUNS_PRESENTATION_MODE;

    let was_fullscreen = FULLSCREEN_ACTIVE.swap(fullscreen, Ordering::SeqCst);
    if was_fullscreen == fullscreen {
        return;
    }

    let Some(registry) = get_registry() else {
        return;
    };
    let (targets, dimmed, stealth_opacity, hidden) = {
        let reg = registry.read();
        let cfg = reg.config();
        (
            reg.windows()
                .iter()
                .map(|w| (w.hwnd, w.stealth))
                .collect::<Vec<_>>(),
            cfg.appearance.dimmed_opacity,
            cfg.appearance.stealth_opacity,
            cfg.appearance.hidden_opacity,
        )
    };

    if fullscreen {
        debug!("Fullscreen surface detected, cloaking notes");
        for (hwnd, _) in targets {
            manager::apply_opacity(&registry, hwnd, hidden);
        }
    } else {
        debug!("Fullscreen surface gone, restoring dimmed visibility");
        for (hwnd, stealth) in targets {
            let opacity = if stealth { stealth_opacity } else { dimmed };
            manager::apply_opacity(&registry, hwnd, opacity);
        }
    }
}

/// Display topology changed: tell every attached content window
fn broadcast_display_change() {
    let Some(registry) = get_registry() else {
        return;
    };
    let targets = registry.read().content_windows();
    for target in targets {
        commands::send_notification(target, &commands::Notification::DisplayChanged);
    }
}
