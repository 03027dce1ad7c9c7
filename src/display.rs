//! Display topology queries for StealthPad
//!
//! Backs the `get-screen-info` command and the `display-changed`
//! notification with monitor enumeration via the GDI monitor APIs.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::Bounds;

/// One attached display, in the shape the content collaborator expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub id: i64,
    pub bounds: Bounds,
    pub work_area: Bounds,
    pub scale_factor: f64,
    pub primary: bool,
}

/// Enumerate all attached displays
pub fn enumerate_displays() -> Vec<DisplayInfo> {
    use std::mem;
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO,
    };
    use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};

    const MONITORINFOF_PRIMARY: u32 = 1;

    extern "system" fn monitor_enum_proc(
        monitor: HMONITOR,
        _hdc: HDC,
        _rc_clip: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let displays = unsafe { &mut *(data.0 as *mut Vec<DisplayInfo>) };

        let mut info = MONITORINFO {
            cbSize: mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            let mut dpi_x = 96u32;
            let mut dpi_y = 96u32;
            if unsafe { GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) }
                .is_err()
            {
                warn!("DPI query unavailable for monitor {:?}", monitor);
                dpi_x = 96;
            }

            displays.push(DisplayInfo {
                id: monitor.0 as isize as i64,
                bounds: rect_to_bounds(info.rcMonitor),
                work_area: rect_to_bounds(info.rcWork),
                scale_factor: dpi_x as f64 / 96.0,
                primary: info.dwFlags & MONITORINFOF_PRIMARY != 0,
            });
        }
        BOOL(1)
    }

    fn rect_to_bounds(rc: RECT) -> Bounds {
        Bounds {
            x: rc.left,
            y: rc.top,
            width: rc.right - rc.left,
            height: rc.bottom - rc.top,
        }
    }

    let mut displays = Vec::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(monitor_enum_proc),
            LPARAM(&mut displays as *mut Vec<DisplayInfo> as isize),
        );
    }
    displays
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_info_serializes_to_page_shape() {
        let info = DisplayInfo {
            id: 7,
            bounds: Bounds::new(0, 0, 1920, 1080),
            work_area: Bounds::new(0, 0, 1920, 1040),
            scale_factor: 1.25,
            primary: true,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["workArea"]["height"], 1040);
        assert_eq!(json["scaleFactor"], 1.25);
        assert_eq!(json["primary"], true);
    }
}
