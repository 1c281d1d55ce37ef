//! Vulkan bootstrap: turns a native window into a device, a graphics queue
//! and a presentable swapchain, and tears all of it down again in order.

pub mod backend;
pub mod config;

pub use backend::{BootstrapError, GraphicsContext, PresentStatus, WindowSystem};
