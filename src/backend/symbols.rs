// Driver entry point declarations
//
// Every entry point the core needs is listed here once, tagged with the tier
// it belongs to. The loader walks these tables; nothing else names symbols by
// string.

use std::ffi::CStr;
use std::fmt;

/// Group of entry points resolved together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolTier {
    /// Exported by the library itself, needed to create an instance.
    Base,
    /// Exported by the library, nice to have.
    OptionalBase,
    /// Resolved through the instance once it exists.
    Instance,
    /// `VK_KHR_surface` commands, needed for presentation.
    SurfaceInstance,
    /// Instance commands the core can live without.
    OptionalInstance,
    /// Surface creation for the window system in use.
    PlatformInstance,
}

/// Where a tier's symbols are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Library,
    Instance,
}

impl SymbolTier {
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::OptionalBase | Self::OptionalInstance)
    }

    pub const fn scope(self) -> SymbolScope {
        match self {
            Self::Base | Self::OptionalBase => SymbolScope::Library,
            Self::Instance
            | Self::SurfaceInstance
            | Self::OptionalInstance
            | Self::PlatformInstance => SymbolScope::Instance,
        }
    }
}

impl fmt::Display for SymbolTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "base",
            Self::OptionalBase => "optional base",
            Self::Instance => "instance",
            Self::SurfaceInstance => "surface instance",
            Self::OptionalInstance => "optional instance",
            Self::PlatformInstance => "platform instance",
        };
        f.write_str(name)
    }
}

/// One declared entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolDecl {
    pub tier: SymbolTier,
    pub name: &'static CStr,
}

impl SymbolDecl {
    pub const fn new(tier: SymbolTier, name: &'static CStr) -> Self {
        Self { tier, name }
    }

    pub const fn is_optional(&self) -> bool {
        self.tier.is_optional()
    }
}

macro_rules! tier {
    ($tier:ident: $($name:expr),* $(,)?) => {
        &[$(SymbolDecl::new(SymbolTier::$tier, $name)),*]
    };
}

pub const GET_INSTANCE_PROC_ADDR: &CStr = c"vkGetInstanceProcAddr";
pub const DESTROY_INSTANCE: &CStr = c"vkDestroyInstance";

pub const BASE: &[SymbolDecl] = tier!(Base:
    c"vkGetInstanceProcAddr",
    c"vkCreateInstance",
    c"vkEnumerateInstanceExtensionProperties",
    c"vkEnumerateInstanceLayerProperties",
);

pub const OPTIONAL_BASE: &[SymbolDecl] = tier!(OptionalBase:
    c"vkEnumerateInstanceVersion",
);

pub const INSTANCE: &[SymbolDecl] = tier!(Instance:
    c"vkDestroyInstance",
    c"vkEnumeratePhysicalDevices",
    c"vkGetPhysicalDeviceProperties",
    c"vkGetPhysicalDeviceQueueFamilyProperties",
    c"vkCreateDevice",
    c"vkDestroyDevice",
    c"vkGetDeviceProcAddr",
    c"vkGetDeviceQueue",
    c"vkDeviceWaitIdle",
    c"vkCreateSwapchainKHR",
    c"vkDestroySwapchainKHR",
    c"vkGetSwapchainImagesKHR",
    c"vkAcquireNextImageKHR",
    c"vkQueuePresentKHR",
    c"vkCreateImageView",
    c"vkDestroyImageView",
    c"vkCreateSemaphore",
    c"vkDestroySemaphore",
    c"vkCreateFence",
    c"vkDestroyFence",
    c"vkWaitForFences",
    c"vkResetFences",
    c"vkCreateCommandPool",
    c"vkDestroyCommandPool",
    c"vkAllocateCommandBuffers",
    c"vkBeginCommandBuffer",
    c"vkEndCommandBuffer",
    c"vkCmdPipelineBarrier",
    c"vkCmdClearColorImage",
    c"vkQueueSubmit",
);

pub const SURFACE_INSTANCE: &[SymbolDecl] = tier!(SurfaceInstance:
    c"vkDestroySurfaceKHR",
    c"vkGetPhysicalDeviceSurfaceSupportKHR",
    c"vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
    c"vkGetPhysicalDeviceSurfaceFormatsKHR",
    c"vkGetPhysicalDeviceSurfacePresentModesKHR",
);

pub const OPTIONAL_INSTANCE: &[SymbolDecl] = tier!(OptionalInstance:
    c"vkCreateDebugUtilsMessengerEXT",
    c"vkDestroyDebugUtilsMessengerEXT",
);

pub const PLATFORM_WIN32: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateWin32SurfaceKHR",
    c"vkGetPhysicalDeviceWin32PresentationSupportKHR",
);

pub const PLATFORM_XLIB: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateXlibSurfaceKHR",
    c"vkGetPhysicalDeviceXlibPresentationSupportKHR",
);

pub const PLATFORM_XCB: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateXcbSurfaceKHR",
    c"vkGetPhysicalDeviceXcbPresentationSupportKHR",
);

pub const PLATFORM_WAYLAND: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateWaylandSurfaceKHR",
    c"vkGetPhysicalDeviceWaylandPresentationSupportKHR",
);

pub const PLATFORM_ANDROID: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateAndroidSurfaceKHR",
);

pub const PLATFORM_HEADLESS: &[SymbolDecl] = tier!(PlatformInstance:
    c"vkCreateHeadlessSurfaceEXT",
);

/// Library-scope tiers in resolution order.
pub const LIBRARY_TIERS: &[&[SymbolDecl]] = &[BASE, OPTIONAL_BASE];

/// Instance-scope tiers shared by every platform, in resolution order.
pub const INSTANCE_TIERS: &[&[SymbolDecl]] = &[INSTANCE, SURFACE_INSTANCE, OPTIONAL_INSTANCE];

/// Well-known file name of the Vulkan loader on this target.
#[cfg(target_os = "windows")]
pub const DRIVER_LIBRARY_NAME: &str = "vulkan-1.dll";
#[cfg(target_os = "macos")]
pub const DRIVER_LIBRARY_NAME: &str = "libvulkan.1.dylib";
#[cfg(target_os = "android")]
pub const DRIVER_LIBRARY_NAME: &str = "libvulkan.so";
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "android")))]
pub const DRIVER_LIBRARY_NAME: &str = "libvulkan.so.1";
