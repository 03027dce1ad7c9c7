//! Window creation and per-window operations for StealthPad
//!
//! Handles class registration, note window creation with cascade/clamped
//! placement, and the guarded Win32 mutations (opacity, topmost ordering,
//! show/hide/minimize/focus/close). Every mutation checks the target is
//! still live first; operating on a torn-down window is a silent no-op.

use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, WPARAM};
use windows::Win32::Graphics::Gdi::COLOR_WINDOW;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::config::Config;
use crate::error::{PadError, PadResult};
use crate::store::{Bounds, BoundsStore};
use crate::utils::{get_primary_work_area, to_pcwstr, to_wide_string};

use super::state::NoteRegistry;

/// Window class names
const NOTE_CLASS: &str = "StealthPadNoteClass";
const CONTROLLER_CLASS: &str = "StealthPadControllerClass";
const NOTE_TITLE: &str = "Sticky Note";

/// Fallback work area when the system query fails
const FALLBACK_WORK_AREA: Bounds = Bounds {
    x: 0,
    y: 0,
    width: 1280,
    height: 800,
};

fn hwnd_of(raw: isize) -> HWND {
    HWND(raw as *mut std::ffi::c_void)
}

/// Whether a raw handle still refers to a live window
pub fn is_live(raw: isize) -> bool {
    raw != 0 && unsafe { IsWindow(hwnd_of(raw)).as_bool() }
}

/// Register the note and controller window classes
pub fn register_window_classes() -> PadResult<()> {
    unsafe {
        let hinstance = GetModuleHandleW(None)?;

        let note_class = to_wide_string(NOTE_CLASS);
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(super::proc::note_window_proc),
            hInstance: hinstance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: to_pcwstr(&note_class),
            hbrBackground: windows::Win32::Graphics::Gdi::HBRUSH(
                (COLOR_WINDOW.0 + 1) as usize as *mut std::ffi::c_void,
            ),
            ..Default::default()
        };
        if RegisterClassExW(&wc) == 0 {
            return Err(PadError::WindowCreation(
                "failed to register note window class".to_string(),
            ));
        }

        let controller_class = to_wide_string(CONTROLLER_CLASS);
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(super::proc::controller_window_proc),
            hInstance: hinstance.into(),
            lpszClassName: to_pcwstr(&controller_class),
            ..Default::default()
        };
        if RegisterClassExW(&wc) == 0 {
            return Err(PadError::WindowCreation(
                "failed to register controller window class".to_string(),
            ));
        }
    }
    Ok(())
}

/// Cascade placement: center the default size in the work area, offset by
/// `step` per already-open window, and fall back to the plain centered
/// position when the offset rectangle would cross the work area's right
/// or bottom edge (re-center, not clamp-to-edge).
pub fn cascade_bounds(
    work_area: Bounds,
    width: i32,
    height: i32,
    open_count: usize,
    step: i32,
) -> Bounds {
    let centered_x = work_area.x + (work_area.width - width) / 2;
    let centered_y = work_area.y + (work_area.height - height) / 2;

    let offset = step * open_count as i32;
    let candidate = Bounds::new(centered_x + offset, centered_y + offset, width, height);

    if candidate.right() > work_area.right() || candidate.bottom() > work_area.bottom() {
        Bounds::new(centered_x, centered_y, width, height)
    } else {
        candidate
    }
}

/// Clamp restored bounds into the visible work area
pub fn clamp_to_work_area(bounds: Bounds, work_area: Bounds) -> Bounds {
    let width = bounds.width.min(work_area.width);
    let height = bounds.height.min(work_area.height);
    let x = bounds.x.clamp(work_area.x, work_area.right() - width);
    let y = bounds.y.clamp(work_area.y, work_area.bottom() - height);
    Bounds::new(x, y, width, height)
}

/// Placement for every persisted note at startup: stored bounds are
/// clamped, notes without a bounds record fall back to cascade placement
pub fn plan_startup_bounds(
    ids: &[String],
    store: &BoundsStore,
    work_area: Bounds,
    config: &Config,
) -> Vec<(String, Bounds)> {
    ids.iter()
        .enumerate()
        .map(|(open_count, id)| {
            let bounds = match store.bounds(id) {
                Some(stored) => clamp_to_work_area(stored, work_area),
                None => cascade_bounds(
                    work_area,
                    config.appearance.note_width,
                    config.appearance.note_height,
                    open_count,
                    config.behavior.cascade_step,
                ),
            };
            (id.clone(), bounds)
        })
        .collect()
}

/// Create one note window, track it, and raise it to the front.
/// A missing `note_id` gets a fresh timestamp id; missing `bounds` get
/// cascade placement.
pub fn create_note_window(
    registry: &Arc<RwLock<NoteRegistry>>,
    note_id: Option<String>,
    bounds: Option<Bounds>,
) -> PadResult<isize> {
    let (note_id, bounds, dimmed, exclude_from_capture) = {
        let reg = registry.read();
        let cfg = reg.config().clone();
        let note_id = note_id.unwrap_or_else(|| reg.fresh_note_id());
        let bounds = bounds.unwrap_or_else(|| {
            let work_area = get_primary_work_area().unwrap_or(FALLBACK_WORK_AREA);
            cascade_bounds(
                work_area,
                cfg.appearance.note_width,
                cfg.appearance.note_height,
                reg.len(),
                cfg.behavior.cascade_step,
            )
        });
        (
            note_id,
            bounds,
            cfg.appearance.dimmed_opacity,
            cfg.behavior.exclude_from_capture,
        )
    };

    let hwnd = unsafe {
        let hinstance = GetModuleHandleW(None)?;
        let class = to_wide_string(NOTE_CLASS);
        let title = to_wide_string(NOTE_TITLE);

        // Topmost layered tool window: stays above normal windows, stays
        // out of the taskbar and Alt-Tab
        let ex_style = WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_LAYERED;
        let style = WS_OVERLAPPEDWINDOW;

        let hwnd = CreateWindowExW(
            ex_style,
            to_pcwstr(&class),
            to_pcwstr(&title),
            style,
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            None,
            None,
            hinstance,
            None,
        )?;

        if hwnd.0.is_null() {
            return Err(PadError::WindowCreation(
                "CreateWindowExW returned a null handle".to_string(),
            ));
        }
        hwnd
    };
    let raw = hwnd.0 as isize;

    registry.write().insert(note_id.clone(), raw, bounds);

    unsafe {
        SetLayeredWindowAttributes(hwnd, COLORREF(0), opacity_to_alpha(dimmed), LWA_ALPHA)?;

        // Hide note content from screen capture; absent on older systems
        if exclude_from_capture {
            if let Err(e) = SetWindowDisplayAffinity(hwnd, WDA_EXCLUDEFROMCAPTURE) {
                warn!("Capture exclusion not available: {}", e);
            }
        }

        let _ = ShowWindow(hwnd, SW_SHOW);
    }

    registry.write().mark_shown(raw);
    bring_to_front(registry, raw);
    crate::tray::rebuild(registry);

    info!("Created note window {} at {:?}", note_id, bounds);
    Ok(raw)
}

/// Create the hidden controller window that owns the tray icon, the
/// global hotkeys, and the fullscreen poll timer
pub fn create_controller_window() -> PadResult<isize> {
    unsafe {
        let hinstance = GetModuleHandleW(None)?;
        let class = to_wide_string(CONTROLLER_CLASS);
        let title = to_wide_string("StealthPad");

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            to_pcwstr(&class),
            to_pcwstr(&title),
            WS_POPUP,
            0,
            0,
            0,
            0,
            None,
            None,
            hinstance,
            None,
        )?;

        if hwnd.0.is_null() {
            return Err(PadError::WindowCreation(
                "failed to create controller window".to_string(),
            ));
        }
        Ok(hwnd.0 as isize)
    }
}

fn opacity_to_alpha(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0) as u8
}

/// Set a window's visible opacity, tracking it in the registry
pub fn apply_opacity(registry: &Arc<RwLock<NoteRegistry>>, raw: isize, opacity: f64) {
    {
        let mut reg = registry.write();
        if let Some(w) = reg.get_mut(raw) {
            debug!("Window {} opacity {} -> {}", w.note_id, w.opacity, opacity);
            w.opacity = opacity;
        }
    }
    if is_live(raw) {
        unsafe {
            if let Err(e) = SetLayeredWindowAttributes(
                hwnd_of(raw),
                COLORREF(0),
                opacity_to_alpha(opacity),
                LWA_ALPHA,
            ) {
                warn!("Failed to set window opacity: {}", e);
            }
        }
    }
}

/// Set or clear a window's always-on-top flag, tracking it in the registry
pub fn apply_always_on_top(registry: &Arc<RwLock<NoteRegistry>>, raw: isize, on_top: bool) {
    {
        let mut reg = registry.write();
        if let Some(w) = reg.get_mut(raw) {
            w.always_on_top = on_top;
        }
    }
    if is_live(raw) {
        let insert_after = if on_top { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            let _ = SetWindowPos(
                hwnd_of(raw),
                insert_after,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            );
        }
    }
}

/// Stamp a window as most recently focused and re-assert topmost ordering,
/// so it wins visually among the always-on-top notes. Windows whose
/// topmost flag was toggled off keep their stamp but are not re-elevated.
pub fn bring_to_front(registry: &Arc<RwLock<NoteRegistry>>, raw: isize) {
    let on_top = {
        let mut reg = registry.write();
        reg.focus(raw);
        reg.get(raw).map(|w| w.always_on_top).unwrap_or(false)
    };
    if on_top && is_live(raw) {
        unsafe {
            let _ = SetWindowPos(
                hwnd_of(raw),
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            );
        }
    }
}

/// Toggle task-switcher presence via the tool-window extended style
pub fn set_skip_taskbar(raw: isize, skip: bool) {
    if !is_live(raw) {
        return;
    }
    unsafe {
        let hwnd = hwnd_of(raw);
        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
        let new_style = if skip {
            ex_style | WS_EX_TOOLWINDOW.0 as isize
        } else {
            ex_style & !(WS_EX_TOOLWINDOW.0 as isize)
        };
        if new_style != ex_style {
            SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);
        }
    }
}

pub fn show_note(raw: isize) {
    if is_live(raw) {
        unsafe {
            let _ = ShowWindow(hwnd_of(raw), SW_SHOW);
        }
    }
}

pub fn hide_note(raw: isize) {
    if is_live(raw) {
        unsafe {
            let _ = ShowWindow(hwnd_of(raw), SW_HIDE);
        }
    }
}

pub fn is_note_visible(raw: isize) -> bool {
    is_live(raw) && unsafe { IsWindowVisible(hwnd_of(raw)).as_bool() }
}

pub fn minimize_note(raw: isize) {
    if is_live(raw) {
        unsafe {
            let _ = ShowWindow(hwnd_of(raw), SW_MINIMIZE);
        }
    }
}

/// Raise and focus a note window
pub fn focus_note(registry: &Arc<RwLock<NoteRegistry>>, raw: isize) {
    if !is_live(raw) {
        return;
    }
    unsafe {
        let _ = ShowWindow(hwnd_of(raw), SW_SHOW);
        let _ = SetForegroundWindow(hwnd_of(raw));
    }
    bring_to_front(registry, raw);
}

/// Ask a note window to close; its `closed` lifecycle runs via the proc
pub fn close_note(raw: isize) {
    if is_live(raw) {
        unsafe {
            let _ = PostMessageW(hwnd_of(raw), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORK_AREA: Bounds = Bounds {
        x: 0,
        y: 0,
        width: 1280,
        height: 800,
    };

    #[test]
    fn first_window_centers_in_work_area() {
        let b = cascade_bounds(WORK_AREA, 400, 300, 0, 30);
        assert_eq!(b, Bounds::new(440, 250, 400, 300));
    }

    #[test]
    fn second_window_offsets_by_step() {
        let b = cascade_bounds(WORK_AREA, 400, 300, 1, 30);
        assert_eq!(b, Bounds::new(470, 280, 400, 300));
    }

    #[test]
    fn overflowing_cascade_recenters_instead_of_clamping() {
        // Offset 9 * 30 = 270 pushes the bottom edge to 820 > 800
        let b = cascade_bounds(WORK_AREA, 400, 300, 9, 30);
        assert_eq!(b, Bounds::new(440, 250, 400, 300));
    }

    #[test]
    fn clamp_pulls_offscreen_bounds_back_into_work_area() {
        let b = clamp_to_work_area(Bounds::new(-50, 780, 400, 300), WORK_AREA);
        assert_eq!(b, Bounds::new(0, 500, 400, 300));
    }

    #[test]
    fn clamp_shrinks_oversized_bounds() {
        let b = clamp_to_work_area(Bounds::new(0, 0, 2000, 900), WORK_AREA);
        assert_eq!(b, Bounds::new(0, 0, 1280, 800));
    }

    #[test]
    fn startup_plan_mixes_stored_and_cascade_placement() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = BoundsStore::open(dir.path().join("store.json"));
        let ids = vec!["a".to_string(), "b".to_string()];
        store.set_note_ids(&ids).unwrap();
        store.set_bounds("a", Bounds::new(10, 20, 400, 300)).unwrap();

        let plan = plan_startup_bounds(&ids, &store, WORK_AREA, &Config::default());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0], ("a".to_string(), Bounds::new(10, 20, 400, 300)));
        // "b" has no stored record: cascade with one window already placed
        assert_eq!(plan[1], ("b".to_string(), Bounds::new(470, 280, 400, 300)));
    }
}
