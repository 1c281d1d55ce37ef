// Windowing collaborator
//
// The core never talks to a window system directly. A `WindowSystem` hands
// over its native handles as a `SurfaceSource`, which knows the instance
// extensions, the platform entry points and the create call for its platform.

use ash::vk;
use raw_window_handle::{
    HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use std::ffi::{c_ulong, c_void, CStr};
use std::ptr;
use thiserror::Error;

use super::loader::SymbolTable;
use super::symbols::{
    SymbolDecl, PLATFORM_ANDROID, PLATFORM_HEADLESS, PLATFORM_WAYLAND, PLATFORM_WIN32,
    PLATFORM_XCB, PLATFORM_XLIB,
};

pub const SURFACE_EXTENSION: &CStr = c"VK_KHR_surface";

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("native window handle unavailable: {0}")]
    Handle(#[from] HandleError),

    #[error("unsupported window system: {0}")]
    Unsupported(&'static str),
}

/// Native handles of one window, tagged by platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSource {
    Win32 {
        hinstance: *const c_void,
        hwnd: *const c_void,
    },
    Xlib {
        display: *mut c_void,
        window: c_ulong,
    },
    Xcb {
        connection: *mut c_void,
        window: u32,
    },
    Wayland {
        display: *mut c_void,
        surface: *mut c_void,
    },
    Android {
        window: *mut c_void,
    },
    /// Offscreen target through `VK_EXT_headless_surface`.
    Headless,
}

impl SurfaceSource {
    pub fn from_raw(
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self, WindowError> {
        match (display, window) {
            (_, RawWindowHandle::Win32(handle)) => Ok(Self::Win32 {
                hinstance: handle.hinstance.map_or(0, |h| h.get()) as *const c_void,
                hwnd: handle.hwnd.get() as *const c_void,
            }),
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(handle)) => {
                let display = display
                    .display
                    .ok_or(WindowError::Unsupported("Xlib window without a display connection"))?;
                Ok(Self::Xlib {
                    display: display.as_ptr(),
                    window: handle.window,
                })
            }
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(handle)) => {
                let connection = display
                    .connection
                    .ok_or(WindowError::Unsupported("XCB window without a connection"))?;
                Ok(Self::Xcb {
                    connection: connection.as_ptr(),
                    window: handle.window.get(),
                })
            }
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(handle)) => {
                Ok(Self::Wayland {
                    display: display.display.as_ptr(),
                    surface: handle.surface.as_ptr(),
                })
            }
            (_, RawWindowHandle::AndroidNdk(handle)) => Ok(Self::Android {
                window: handle.a_native_window.as_ptr(),
            }),
            _ => Err(WindowError::Unsupported("no Vulkan surface for this window system")),
        }
    }

    /// Instance extensions needed to present to this source.
    pub fn required_extensions(&self) -> Vec<&'static CStr> {
        let platform = match self {
            Self::Win32 { .. } => c"VK_KHR_win32_surface",
            Self::Xlib { .. } => c"VK_KHR_xlib_surface",
            Self::Xcb { .. } => c"VK_KHR_xcb_surface",
            Self::Wayland { .. } => c"VK_KHR_wayland_surface",
            Self::Android { .. } => c"VK_KHR_android_surface",
            Self::Headless => c"VK_EXT_headless_surface",
        };
        vec![SURFACE_EXTENSION, platform]
    }

    /// Platform tier resolved together with the instance tiers.
    pub fn platform_symbols(&self) -> &'static [SymbolDecl] {
        match self {
            Self::Win32 { .. } => PLATFORM_WIN32,
            Self::Xlib { .. } => PLATFORM_XLIB,
            Self::Xcb { .. } => PLATFORM_XCB,
            Self::Wayland { .. } => PLATFORM_WAYLAND,
            Self::Android { .. } => PLATFORM_ANDROID,
            Self::Headless => PLATFORM_HEADLESS,
        }
    }
}

/// Create the platform surface through the resolved platform tier.
///
/// # Safety
/// `instance` must be live with the platform tier for `source` resolved into
/// `symbols`, and the native handles in `source` must still be valid.
pub unsafe fn create_platform_surface(
    source: &SurfaceSource,
    instance: vk::Instance,
    symbols: &SymbolTable,
) -> Result<vk::SurfaceKHR, vk::Result> {
    let mut surface = vk::SurfaceKHR::null();
    let missing = vk::Result::ERROR_EXTENSION_NOT_PRESENT;

    let result = match *source {
        SurfaceSource::Win32 { hinstance, hwnd } => {
            let create = symbols
                .typed::<vk::PFN_vkCreateWin32SurfaceKHR>(c"vkCreateWin32SurfaceKHR")
                .ok_or(missing)?;
            let info = vk::Win32SurfaceCreateInfoKHR {
                hinstance,
                hwnd,
                ..Default::default()
            };
            create(instance, &info, ptr::null(), &mut surface)
        }
        SurfaceSource::Xlib { display, window } => {
            let create = symbols
                .typed::<vk::PFN_vkCreateXlibSurfaceKHR>(c"vkCreateXlibSurfaceKHR")
                .ok_or(missing)?;
            let info = vk::XlibSurfaceCreateInfoKHR {
                dpy: display.cast(),
                window,
                ..Default::default()
            };
            create(instance, &info, ptr::null(), &mut surface)
        }
        SurfaceSource::Xcb { connection, window } => {
            let create = symbols
                .typed::<vk::PFN_vkCreateXcbSurfaceKHR>(c"vkCreateXcbSurfaceKHR")
                .ok_or(missing)?;
            let info = vk::XcbSurfaceCreateInfoKHR {
                connection: connection.cast(),
                window,
                ..Default::default()
            };
            create(instance, &info, ptr::null(), &mut surface)
        }
        SurfaceSource::Wayland { display, surface: wl_surface } => {
            let create = symbols
                .typed::<vk::PFN_vkCreateWaylandSurfaceKHR>(c"vkCreateWaylandSurfaceKHR")
                .ok_or(missing)?;
            let info = vk::WaylandSurfaceCreateInfoKHR {
                display: display.cast(),
                surface: wl_surface.cast(),
                ..Default::default()
            };
            create(instance, &info, ptr::null(), &mut surface)
        }
        SurfaceSource::Android { window } => {
            let create = symbols
                .typed::<vk::PFN_vkCreateAndroidSurfaceKHR>(c"vkCreateAndroidSurfaceKHR")
                .ok_or(missing)?;
            let info = vk::AndroidSurfaceCreateInfoKHR {
                window: window.cast(),
                ..Default::default()
            };
            create(instance, &info, ptr::null(), &mut surface)
        }
        SurfaceSource::Headless => {
            let create = symbols
                .typed::<vk::PFN_vkCreateHeadlessSurfaceEXT>(c"vkCreateHeadlessSurfaceEXT")
                .ok_or(missing)?;
            let info = vk::HeadlessSurfaceCreateInfoEXT::default();
            create(instance, &info, ptr::null(), &mut surface)
        }
    };

    match result {
        vk::Result::SUCCESS if surface != vk::SurfaceKHR::null() => Ok(surface),
        vk::Result::SUCCESS => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        err => Err(err),
    }
}

/// What the core needs from the window it presents to.
pub trait WindowSystem {
    fn surface_source(&self) -> Result<SurfaceSource, WindowError>;

    /// Drawable size in pixels; zero while minimised.
    fn framebuffer_extent(&self) -> vk::Extent2D;
}

impl WindowSystem for winit::window::Window {
    fn surface_source(&self) -> Result<SurfaceSource, WindowError> {
        let display = self.display_handle()?.as_raw();
        let window = self.window_handle()?.as_raw();
        SurfaceSource::from_raw(display, window)
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        let size = self.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }
}

/// Window-less presentation target.
#[derive(Debug, Clone, Copy)]
pub struct Headless {
    extent: vk::Extent2D,
}

impl Headless {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self { extent }
    }

    pub fn resize(&mut self, extent: vk::Extent2D) {
        self.extent = extent;
    }
}

impl WindowSystem for Headless {
    fn surface_source(&self) -> Result<SurfaceSource, WindowError> {
        Ok(SurfaceSource::Headless)
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.extent
    }
}
