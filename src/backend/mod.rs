// Backend module - Vulkan bootstrap layer
//
// Design: declarative entry point tables, one component per stage of the
// handle chain (library -> instance -> device -> surface -> swapchain), and
// a single orchestrator that owns the chain and tears it down in reverse.

pub mod commands;
pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod loader;
pub mod platform;
pub mod selector;
pub mod surface;
pub mod swapchain;
pub mod symbols;
pub mod sync;

#[cfg(test)]
mod testing;

pub use context::GraphicsContext;
pub use device::LogicalDevice;
pub use error::{BootstrapError, LoadError};
pub use instance::BuildFlavor;
pub use loader::{SymbolLoader, SymbolTable};
pub use platform::{Headless, SurfaceSource, WindowError, WindowSystem};
pub use selector::{DeviceCategory, DeviceSelector, PhysicalDeviceInfo, QueueFamilySelection};
pub use surface::{Acquire, PresentStatus, PresentationSurface};
pub use swapchain::{AcquiredImage, Swapchain};
pub use sync::FrameSlot;
pub use symbols::{SymbolDecl, SymbolTier};
