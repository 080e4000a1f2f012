//! X11 override-redirect overlay. Needs a compositing manager for the
//! 32-bit ARGB visual to actually blend with the desktop.

use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::monitor::Monitor;
use crate::crosshair::render::{DirtyRect, FrameBuffer};
use crate::crosshair::surface::{DesktopPlatform, OverlaySurface};
use anyhow::{anyhow, Context, Result};
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::rc::Rc;
use x11_dl::xfixes;
use x11_dl::xlib::{self, Xlib};
use x11_dl::xrandr::Xrandr;

#[allow(non_upper_case_globals)]
const ShapeInput: c_int = 2;
const BASE_DPI: f64 = 96.0;
const MM_PER_INCH: f64 = 25.4;

/// Device pixel ratio from a monitor's physical width, in quarter steps and
/// never below 1.0. Monitors that report no size count as 1.0.
pub fn scale_from_physical_width(width_px: i32, width_mm: i32) -> f64 {
    if width_px <= 0 || width_mm <= 0 {
        return 1.0;
    }
    let dpi = width_px as f64 * MM_PER_INCH / width_mm as f64;
    ((dpi / BASE_DPI * 4.0).round() / 4.0).clamp(1.0, 4.0)
}

struct Connection {
    xlib: Xlib,
    display: *mut xlib::Display,
    screen: c_int,
    root: xlib::Window,
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}

pub struct X11Platform {
    conn: Rc<Connection>,
    xrandr: Option<Xrandr>,
}

impl X11Platform {
    pub fn open() -> Result<Self> {
        let xlib = Xlib::open().context("load libX11")?;
        let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            return Err(anyhow!("cannot connect to the X server"));
        }
        let screen = unsafe { (xlib.XDefaultScreen)(display) };
        let root = unsafe { (xlib.XDefaultRootWindow)(display) };
        let xrandr = match Xrandr::open() {
            Ok(xrandr) => Some(xrandr),
            Err(err) => {
                tracing::debug!(%err, "libXrandr missing; using the root window as one monitor");
                None
            }
        };
        Ok(Self {
            conn: Rc::new(Connection {
                xlib,
                display,
                screen,
                root,
            }),
            xrandr,
        })
    }

    fn randr_monitors(&self) -> Vec<Monitor> {
        let Some(xrandr) = &self.xrandr else {
            return Vec::new();
        };
        let conn = &self.conn;
        let mut count: c_int = 0;
        let infos =
            unsafe { (xrandr.XRRGetMonitors)(conn.display, conn.root, xlib::True, &mut count) };
        if infos.is_null() {
            return Vec::new();
        }
        let monitors = unsafe { std::slice::from_raw_parts(infos, count.max(0) as usize) }
            .iter()
            .map(|info| Monitor {
                rect: ScreenRect::new(info.x, info.y, info.width, info.height),
                scale_factor: scale_from_physical_width(info.width, info.mwidth),
                primary: info.primary != 0,
            })
            .collect();
        unsafe { (xrandr.XRRFreeMonitors)(infos) };
        monitors
    }

    fn root_monitor(&self) -> Option<Monitor> {
        let conn = &self.conn;
        let mut attributes: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };
        let status =
            unsafe { (conn.xlib.XGetWindowAttributes)(conn.display, conn.root, &mut attributes) };
        if status == 0 {
            return None;
        }
        let width_mm = unsafe { (conn.xlib.XDisplayWidthMM)(conn.display, conn.screen) };
        Some(Monitor {
            rect: ScreenRect::new(attributes.x, attributes.y, attributes.width, attributes.height),
            scale_factor: scale_from_physical_width(attributes.width, width_mm),
            primary: true,
        })
    }
}

impl DesktopPlatform for X11Platform {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn cursor_position(&self) -> Option<Point> {
        let conn = &self.conn;
        let mut root_return: xlib::Window = 0;
        let mut child_return: xlib::Window = 0;
        let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) =
            (0, 0, 0, 0);
        let mut mask: c_uint = 0;
        let on_screen = unsafe {
            (conn.xlib.XQueryPointer)(
                conn.display,
                conn.root,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };
        (on_screen != 0).then_some((root_x, root_y))
    }

    fn monitors(&self) -> Vec<Monitor> {
        let monitors = self.randr_monitors();
        if !monitors.is_empty() {
            return monitors;
        }
        self.root_monitor().into_iter().collect()
    }

    fn create_surface(&mut self, bounds: ScreenRect) -> Result<Box<dyn OverlaySurface>> {
        Ok(Box::new(X11Surface::create(Rc::clone(&self.conn), bounds)?))
    }
}

struct X11Surface {
    conn: Rc<Connection>,
    window: xlib::Window,
    colormap: xlib::Colormap,
    gc: xlib::GC,
    visual: *mut xlib::Visual,
    bounds: ScreenRect,
    opacity: f32,
    /// Premultiplied BGRA scaled by `opacity`; X has no whole-window alpha
    /// without a compositor hint.
    staging: Vec<u8>,
    visible: bool,
    destroyed: bool,
}

impl X11Surface {
    fn create(conn: Rc<Connection>, bounds: ScreenRect) -> Result<Self> {
        let xl = &conn.xlib;
        let mut visual_info: xlib::XVisualInfo = unsafe { std::mem::zeroed() };
        let found = unsafe {
            (xl.XMatchVisualInfo)(conn.display, conn.screen, 32, xlib::TrueColor, &mut visual_info)
        };
        if found == 0 {
            return Err(anyhow!("no 32-bit TrueColor visual"));
        }

        let colormap = unsafe {
            (xl.XCreateColormap)(conn.display, conn.root, visual_info.visual, xlib::AllocNone)
        };
        let mut attributes: xlib::XSetWindowAttributes = unsafe { std::mem::zeroed() };
        attributes.colormap = colormap;
        attributes.border_pixel = 0;
        attributes.background_pixel = 0;
        attributes.override_redirect = xlib::True;
        // Obscured notifications drive re-raising above newly stacked windows.
        attributes.event_mask = xlib::VisibilityChangeMask;
        let mask = xlib::CWColormap
            | xlib::CWBorderPixel
            | xlib::CWBackPixel
            | xlib::CWOverrideRedirect
            | xlib::CWEventMask;
        let (width, height) = bounds.size();
        let window = unsafe {
            (xl.XCreateWindow)(
                conn.display,
                conn.root,
                bounds.x,
                bounds.y,
                width.max(1),
                height.max(1),
                0,
                visual_info.depth,
                xlib::InputOutput as c_uint,
                visual_info.visual,
                mask,
                &mut attributes,
            )
        };
        if window == 0 {
            unsafe { (xl.XFreeColormap)(conn.display, colormap) };
            return Err(anyhow!("create overlay window"));
        }
        let gc = unsafe { (xl.XCreateGC)(conn.display, window, 0, ptr::null_mut()) };

        Ok(Self {
            visual: visual_info.visual,
            conn,
            window,
            colormap,
            gc,
            bounds,
            opacity: 1.0,
            staging: Vec::new(),
            visible: false,
            destroyed: false,
        })
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(anyhow!("overlay window already destroyed"));
        }
        Ok(())
    }

    fn stage(&mut self, frame: &FrameBuffer, dirty: &[DirtyRect]) {
        let (width, height) = frame.size();
        let source = frame.bgra_pixels();
        if self.staging.len() != source.len() {
            self.staging = vec![0; source.len()];
        }
        let scale = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u32;
        for rect in dirty.iter().filter_map(|rect| rect.clamp(width, height)) {
            for y in rect.y..rect.y + rect.height {
                let start = ((y as usize) * (width as usize) + rect.x as usize) * 4;
                let end = start + rect.width as usize * 4;
                for (dst, src) in self.staging[start..end]
                    .iter_mut()
                    .zip(&source[start..end])
                {
                    *dst = ((*src as u32 * scale + 127) / 255) as u8;
                }
            }
        }
    }
}

impl OverlaySurface for X11Surface {
    fn set_always_on_top(&mut self) -> Result<()> {
        self.ensure_alive()?;
        unsafe { (self.conn.xlib.XRaiseWindow)(self.conn.display, self.window) };
        Ok(())
    }

    fn set_input_transparent(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let fixes = xfixes::Xlib::open().context("load libXfixes")?;
        unsafe {
            let region = (fixes.XFixesCreateRegion)(self.conn.display, ptr::null_mut(), 0);
            (fixes.XFixesSetWindowShapeRegion)(self.conn.display, self.window, ShapeInput, 0, 0, region);
            (fixes.XFixesDestroyRegion)(self.conn.display, region);
        }
        Ok(())
    }

    fn set_translucent(&mut self) -> Result<()> {
        // The ARGB visual chosen at creation already carries per-pixel alpha.
        self.ensure_alive()
    }

    fn set_bounds(&mut self, bounds: ScreenRect) -> Result<()> {
        self.ensure_alive()?;
        let (width, height) = bounds.size();
        unsafe {
            (self.conn.xlib.XMoveResizeWindow)(
                self.conn.display,
                self.window,
                bounds.x,
                bounds.y,
                width.max(1),
                height.max(1),
            );
        }
        self.bounds = bounds;
        self.staging.clear();
        Ok(())
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn show(&mut self) {
        if self.destroyed || self.visible {
            return;
        }
        unsafe {
            (self.conn.xlib.XMapRaised)(self.conn.display, self.window);
            (self.conn.xlib.XFlush)(self.conn.display);
        }
        self.visible = true;
    }

    fn hide(&mut self) {
        if self.destroyed || !self.visible {
            return;
        }
        unsafe {
            (self.conn.xlib.XUnmapWindow)(self.conn.display, self.window);
            (self.conn.xlib.XFlush)(self.conn.display);
        }
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn present(&mut self, frame: &FrameBuffer, dirty: &[DirtyRect]) -> Result<()> {
        self.ensure_alive()?;
        let (width, height) = frame.size();
        if width == 0 || height == 0 || dirty.is_empty() {
            return Ok(());
        }
        self.stage(frame, dirty);

        let xl = &self.conn.xlib;
        let image = unsafe {
            (xl.XCreateImage)(
                self.conn.display,
                self.visual,
                32,
                xlib::ZPixmap,
                0,
                self.staging.as_mut_ptr() as *mut c_char,
                width,
                height,
                32,
                (width * 4) as c_int,
            )
        };
        if image.is_null() {
            return Err(anyhow!("create {width}x{height} image"));
        }
        for rect in dirty.iter().filter_map(|rect| rect.clamp(width, height)) {
            unsafe {
                (xl.XPutImage)(
                    self.conn.display,
                    self.window,
                    self.gc,
                    image,
                    rect.x,
                    rect.y,
                    rect.x,
                    rect.y,
                    rect.width as c_uint,
                    rect.height as c_uint,
                );
            }
        }
        unsafe {
            // The pixels belong to `staging`; only the header is X's.
            (*image).data = ptr::null_mut();
            (xl.XFree)(image as *mut c_void);
            (xl.XFlush)(self.conn.display);
        }
        Ok(())
    }

    fn pump_events(&mut self) {
        if self.destroyed {
            return;
        }
        let xl = &self.conn.xlib;
        let mut event: xlib::XEvent = unsafe { std::mem::zeroed() };
        let mut obscured = false;
        while unsafe { (xl.XPending)(self.conn.display) } > 0 {
            unsafe { (xl.XNextEvent)(self.conn.display, &mut event) };
            if event.get_type() == xlib::VisibilityNotify {
                let state = unsafe { event.visibility.state };
                obscured = state != xlib::VisibilityUnobscured;
            }
        }
        if obscured && self.visible {
            unsafe {
                (xl.XRaiseWindow)(self.conn.display, self.window);
                (xl.XFlush)(self.conn.display);
            }
            tracing::trace!("overlay re-raised above obscuring window");
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let xl = &self.conn.xlib;
        unsafe {
            (xl.XFreeGC)(self.conn.display, self.gc);
            (xl.XDestroyWindow)(self.conn.display, self.window);
            (xl.XFreeColormap)(self.conn.display, self.colormap);
            (xl.XFlush)(self.conn.display);
        }
        self.visible = false;
        self.destroyed = true;
        tracing::debug!(bounds = ?self.bounds, "x11 overlay window destroyed");
    }
}

impl Drop for X11Surface {
    fn drop(&mut self) {
        self.destroy();
    }
}
