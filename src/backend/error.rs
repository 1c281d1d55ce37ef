// Error taxonomy for the bootstrap core
//
// Every public operation reports one of these instead of aborting. Native
// result codes are kept as sources so the log shows what the driver said.

use ash::vk;
use thiserror::Error;

use super::platform::WindowError;
use super::symbols::SymbolTier;

/// Failures while opening the driver library or resolving its entry points.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load driver library `{name}`: {reason}")]
    LibraryLoadFailure { name: String, reason: String },

    #[error("missing {tier} entry point `{name}`")]
    EntryPointMissing { tier: SymbolTier, name: String },

    #[error("driver library is not loaded")]
    NotLoaded,

    #[error("instance-scope symbols need a live instance handle")]
    InstanceRequired,
}

/// Everything that can stop `GraphicsContext::initialize` (and the present path).
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("window system could not supply presentation extensions: {0}")]
    ExtensionQueryFailure(#[from] WindowError),

    #[error("failed to create Vulkan instance: {0}")]
    InstanceCreateFailure(#[source] vk::Result),

    #[error("no suitable physical device")]
    NoSuitablePhysicalDevice,

    #[error("selected physical device has no graphics queue family")]
    NoGraphicsQueueFamily,

    #[error("failed to create logical device: {0}")]
    LogicalDeviceCreateFailure(#[source] vk::Result),

    #[error("failed to create presentation surface: {0}")]
    SurfaceCreateFailure(#[source] vk::Result),

    #[error("failed to create swapchain: {0}")]
    SwapchainCreateFailure(String),

    #[error("failed to present swapchain image: {0}")]
    PresentFailure(#[source] vk::Result),
}

