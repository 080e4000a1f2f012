//! Win32 layered-window adapter.

use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::monitor::Monitor;
use crate::crosshair::render::{DirtyRect, FrameBuffer};
use crate::crosshair::surface::{DesktopPlatform, OverlaySurface};
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use std::mem;
use std::ptr;
use std::sync::Once;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, COLORREF, HWND, LPARAM, LRESULT, POINT, RECT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, EnumDisplayMonitors, GetDC,
    GetMonitorInfoW, ReleaseDC, SelectObject, AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO,
    BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, HMONITOR,
    MONITORINFOEXW,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::{
    GetDpiForMonitor, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    MDT_EFFECTIVE_DPI,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetCursorPos,
    GetWindowLongPtrW, PeekMessageW, RegisterClassW, SetWindowLongPtrW, SetWindowPos, ShowWindow,
    TranslateMessage, UpdateLayeredWindow, GWL_EXSTYLE, HWND_TOPMOST, MSG, PM_REMOVE,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_HIDE, SW_SHOWNOACTIVATE, ULW_ALPHA,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_ACTIVATE, WM_SHOWWINDOW, WM_WINDOWPOSCHANGED, WNDCLASSW,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

const MONITORINFOF_PRIMARY: u32 = 1;
const BASE_DPI: f64 = 96.0;

static CLASS_NAME: Lazy<Vec<u16>> = Lazy::new(|| widestring("MouseCrossOverlay"));

pub fn compose_overlay_window_ex_style() -> WINDOW_EX_STYLE {
    WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE
}

fn widestring(value: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        static DPI_AWARENESS: Once = Once::new();
        DPI_AWARENESS.call_once(|| {
            let applied = unsafe {
                SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2)
            };
            if let Err(err) = applied {
                tracing::debug!(%err, "per-monitor DPI awareness not applied");
            }
        });
        Self
    }
}

impl DesktopPlatform for Win32Platform {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn cursor_position(&self) -> Option<Point> {
        let mut point = POINT::default();
        unsafe {
            if GetCursorPos(&mut point).is_ok() {
                Some((point.x, point.y))
            } else {
                None
            }
        }
    }

    fn monitors(&self) -> Vec<Monitor> {
        unsafe extern "system" fn enum_proc(
            monitor: HMONITOR,
            _hdc: HDC,
            _rect: *mut RECT,
            data: LPARAM,
        ) -> BOOL {
            let monitors = unsafe { &mut *(data.0 as *mut Vec<Monitor>) };
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
            if unsafe { GetMonitorInfoW(monitor, &mut info.monitorInfo as *mut _ as *mut _) }
                .as_bool()
            {
                let rc = info.monitorInfo.rcMonitor;
                let mut dpi_x = 0u32;
                let mut dpi_y = 0u32;
                let dpi = unsafe {
                    GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y)
                };
                let scale_factor = match dpi {
                    Ok(()) if dpi_x > 0 => dpi_x as f64 / BASE_DPI,
                    _ => 1.0,
                };
                monitors.push(Monitor {
                    rect: ScreenRect::new(
                        rc.left,
                        rc.top,
                        rc.right - rc.left,
                        rc.bottom - rc.top,
                    ),
                    scale_factor,
                    primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                });
            }
            BOOL(1)
        }

        let mut monitors = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(enum_proc),
                LPARAM(&mut monitors as *mut Vec<Monitor> as isize),
            );
        }
        monitors
    }

    fn create_surface(&mut self, bounds: ScreenRect) -> Result<Box<dyn OverlaySurface>> {
        Ok(Box::new(LayeredWindow::create(bounds)?))
    }
}

unsafe extern "system" fn overlay_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if matches!(msg, WM_SHOWWINDOW | WM_ACTIVATE | WM_WINDOWPOSCHANGED) {
        let _ = unsafe {
            SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        };
    }
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// Top-level layered popup presented with `UpdateLayeredWindow`, so the
/// BGRA bitmap's alpha channel is honored per pixel.
struct LayeredWindow {
    hwnd: HWND,
    mem_dc: HDC,
    dib: HBITMAP,
    old_bitmap: HGDIOBJ,
    bits: *mut u8,
    bounds: ScreenRect,
    alpha: u8,
    visible: bool,
}

impl LayeredWindow {
    fn create(bounds: ScreenRect) -> Result<Self> {
        static REGISTER_CLASS: Once = Once::new();
        let hinstance =
            unsafe { GetModuleHandleW(PCWSTR::null()) }.context("resolve module handle")?;

        REGISTER_CLASS.call_once(|| unsafe {
            let wc = WNDCLASSW {
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(CLASS_NAME.as_ptr()),
                lpfnWndProc: Some(overlay_wndproc),
                ..Default::default()
            };
            if RegisterClassW(&wc) == 0 {
                tracing::warn!("overlay window class registration failed");
            }
        });

        let hwnd = unsafe {
            CreateWindowExW(
                compose_overlay_window_ex_style(),
                PCWSTR(CLASS_NAME.as_ptr()),
                PCWSTR::null(),
                WINDOW_STYLE(WS_POPUP.0),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                None,
                None,
                hinstance,
                None,
            )
        }
        .context("create layered overlay window")?;

        let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
        if mem_dc.0.is_null() {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(anyhow!("create memory device context"));
        }

        let mut window = Self {
            hwnd,
            mem_dc,
            dib: HBITMAP::default(),
            old_bitmap: HGDIOBJ::default(),
            bits: ptr::null_mut(),
            bounds,
            alpha: 255,
            visible: false,
        };
        window.allocate_bitmap(bounds)?;
        Ok(window)
    }

    fn allocate_bitmap(&mut self, bounds: ScreenRect) -> Result<()> {
        self.release_bitmap();

        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: bounds.width,
            biHeight: -bounds.height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };

        let mut bits: *mut core::ffi::c_void = ptr::null_mut();
        let dib = unsafe {
            CreateDIBSection(
                self.mem_dc,
                &bmi,
                DIB_RGB_COLORS,
                &mut bits,
                windows::Win32::Foundation::HANDLE::default(),
                0,
            )
        }
        .with_context(|| format!("create {}x{} DIB section", bounds.width, bounds.height))?;
        if bits.is_null() {
            unsafe {
                let _ = DeleteObject(dib);
            }
            return Err(anyhow!("DIB section has no pixel memory"));
        }

        self.old_bitmap = unsafe { SelectObject(self.mem_dc, dib) };
        self.dib = dib;
        self.bits = bits as *mut u8;
        self.bounds = bounds;
        Ok(())
    }

    fn release_bitmap(&mut self) {
        unsafe {
            if !self.dib.0.is_null() {
                if !self.mem_dc.0.is_null() {
                    let _ = SelectObject(self.mem_dc, self.old_bitmap);
                }
                let _ = DeleteObject(self.dib);
                self.dib = HBITMAP::default();
            }
        }
        self.bits = ptr::null_mut();
    }

    fn bitmap_len(&self) -> usize {
        let (width, height) = self.bounds.size();
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    }

    fn add_ex_style(&mut self, style: WINDOW_EX_STYLE) -> Result<()> {
        if self.hwnd.0.is_null() {
            return Err(anyhow!("overlay window already destroyed"));
        }
        unsafe {
            let current = GetWindowLongPtrW(self.hwnd, GWL_EXSTYLE);
            let _ = SetWindowLongPtrW(self.hwnd, GWL_EXSTYLE, current | style.0 as isize);
        }
        Ok(())
    }

    fn update_layered(&self) -> Result<()> {
        let screen_dc = unsafe { GetDC(HWND::default()) };
        let destination = POINT {
            x: self.bounds.x,
            y: self.bounds.y,
        };
        let size = SIZE {
            cx: self.bounds.width,
            cy: self.bounds.height,
        };
        let source = POINT::default();
        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            BlendFlags: 0,
            SourceConstantAlpha: self.alpha,
            AlphaFormat: AC_SRC_ALPHA as u8,
        };
        let result = unsafe {
            UpdateLayeredWindow(
                self.hwnd,
                screen_dc,
                Some(&destination as *const POINT),
                Some(&size as *const SIZE),
                self.mem_dc,
                Some(&source as *const POINT),
                COLORREF(0),
                Some(&blend as *const BLENDFUNCTION),
                ULW_ALPHA,
            )
        };
        unsafe {
            ReleaseDC(HWND::default(), screen_dc);
        }
        result.context("UpdateLayeredWindow")
    }
}

impl OverlaySurface for LayeredWindow {
    fn set_always_on_top(&mut self) -> Result<()> {
        self.add_ex_style(WS_EX_TOPMOST)?;
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .context("raise overlay window to topmost")
    }

    fn set_input_transparent(&mut self) -> Result<()> {
        self.add_ex_style(WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE)
    }

    fn set_translucent(&mut self) -> Result<()> {
        self.add_ex_style(WS_EX_LAYERED)
    }

    fn set_bounds(&mut self, bounds: ScreenRect) -> Result<()> {
        if bounds.is_empty() {
            return Err(anyhow!("overlay bounds are empty: {bounds:?}"));
        }
        self.allocate_bitmap(bounds)?;
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOACTIVATE,
            )
        }
        .context("move overlay window")
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    }

    fn show(&mut self) {
        if self.hwnd.0.is_null() {
            return;
        }
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
        self.visible = true;
    }

    fn hide(&mut self) {
        if !self.hwnd.0.is_null() {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_HIDE);
            }
        }
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn present(&mut self, frame: &FrameBuffer, dirty: &[DirtyRect]) -> Result<()> {
        let len = self.bitmap_len();
        let source = frame.bgra_pixels();
        if self.bits.is_null() || source.len() != len {
            return Err(anyhow!(
                "frame size {:?} does not match overlay {:?}",
                frame.size(),
                self.bounds
            ));
        }

        let pixels = unsafe { std::slice::from_raw_parts_mut(self.bits, len) };
        let (width, height) = self.bounds.size();
        for rect in dirty.iter().filter_map(|rect| rect.clamp(width, height)) {
            for y in rect.y..(rect.y + rect.height) {
                let start = ((y as u32 * width + rect.x as u32) * 4) as usize;
                let end = start + rect.width as usize * 4;
                pixels[start..end].copy_from_slice(&source[start..end]);
            }
        }
        self.update_layered()
    }

    fn pump_events(&mut self) {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            }
        }
    }

    fn destroy(&mut self) {
        self.release_bitmap();
        unsafe {
            if !self.mem_dc.0.is_null() {
                let _ = DeleteDC(self.mem_dc);
                self.mem_dc = HDC::default();
            }
            if !self.hwnd.0.is_null() {
                let _ = DestroyWindow(self.hwnd);
                self.hwnd = HWND::default();
            }
        }
        self.visible = false;
    }
}

impl Drop for LayeredWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}
