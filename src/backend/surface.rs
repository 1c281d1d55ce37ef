// Presentation surface and its swapchain
//
// The surface is bound to the instance and the native window; the swapchain
// additionally to the logical device. Both go before the device and the
// instance do, swapchain first.

use ash::vk;

use super::device::LogicalDevice;
use super::error::BootstrapError;
use super::loader::SymbolTable;
use super::platform::{create_platform_surface, SurfaceSource};
use super::swapchain::{choose_extent, AcquiredImage, Swapchain, SwapchainSupport};

/// Result of one presentation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    /// Presented, but the swapchain no longer matches the surface exactly.
    Suboptimal,
    /// Nothing presented; the swapchain must be recreated.
    OutOfDate,
    /// No swapchain (minimised window or not initialized).
    Skipped,
}

/// Result of asking for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Ready(AcquiredImage),
    OutOfDate,
    Skipped,
}

pub struct PresentationSurface {
    surface: vk::SurfaceKHR,
    loader: ash::extensions::khr::Surface,
    swapchain: Option<Swapchain>,
}

impl PresentationSurface {
    pub fn create(
        entry: &ash::Entry,
        instance: &ash::Instance,
        symbols: &SymbolTable,
        source: &SurfaceSource,
    ) -> Result<Self, BootstrapError> {
        let surface = unsafe { create_platform_surface(source, instance.handle(), symbols) }
            .map_err(BootstrapError::SurfaceCreateFailure)?;
        log::info!("Created presentation surface");

        Ok(Self {
            surface,
            loader: ash::extensions::khr::Surface::new(entry, instance),
            swapchain: None,
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    /// Build (or rebuild) the swapchain for a window of `window_extent`.
    ///
    /// A zero-sized window, or a surface reporting a zero extent, drops the
    /// swapchain instead. The previous swapchain is passed to the driver as
    /// `old_swapchain` and destroyed once its replacement exists.
    pub fn create_swapchain(
        &mut self,
        instance: &ash::Instance,
        device: &LogicalDevice,
        window_extent: vk::Extent2D,
    ) -> Result<(), BootstrapError> {
        if window_extent.width == 0 || window_extent.height == 0 {
            log::info!("Window has no area; presentation paused");
            self.destroy_swapchain(device);
            return Ok(());
        }

        let supported = unsafe {
            self.loader.get_physical_device_surface_support(
                device.physical_device(),
                device.queue_family(),
                self.surface,
            )
        }
        .map_err(|e| BootstrapError::SwapchainCreateFailure(format!("surface support query failed: {e}")))?;
        if !supported {
            return Err(BootstrapError::SwapchainCreateFailure(format!(
                "queue family {} cannot present to this surface",
                device.queue_family()
            )));
        }

        let support = SwapchainSupport::query(&self.loader, device.physical_device(), self.surface)?;
        let extent = choose_extent(&support.capabilities, window_extent);
        if extent.width == 0 || extent.height == 0 {
            log::info!("Surface has no area; presentation paused");
            self.destroy_swapchain(device);
            return Ok(());
        }

        let old = self
            .swapchain
            .as_ref()
            .map_or(vk::SwapchainKHR::null(), Swapchain::handle);
        let swapchain = Swapchain::new(instance, device, self.surface, &support, extent, old)?;

        if let Some(old) = self.swapchain.replace(swapchain) {
            unsafe { old.destroy(device.handle()) };
        }
        Ok(())
    }

    pub fn destroy_swapchain(&mut self, device: &LogicalDevice) {
        if let Some(swapchain) = self.swapchain.take() {
            unsafe { swapchain.destroy(device.handle()) };
        }
    }

    pub fn acquire_image(&mut self, device: &LogicalDevice) -> Result<Acquire, BootstrapError> {
        let Some(swapchain) = self.swapchain.as_mut() else {
            return Ok(Acquire::Skipped);
        };

        match swapchain.acquire_next_image(device.handle()) {
            Ok(image) => Ok(Acquire::Ready(image)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquire::OutOfDate),
            Err(e) => Err(BootstrapError::PresentFailure(e)),
        }
    }

    pub fn present_image(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentStatus, BootstrapError> {
        let Some(swapchain) = self.swapchain.as_ref() else {
            return Ok(PresentStatus::Skipped);
        };

        match swapchain.present(queue, image_index, wait) {
            Ok(false) => Ok(PresentStatus::Presented),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(e) => Err(BootstrapError::PresentFailure(e)),
        }
    }

    /// Acquire the next image, clear it and present it.
    pub fn present(&mut self, device: &LogicalDevice) -> Result<PresentStatus, BootstrapError> {
        let image = match self.acquire_image(device)? {
            Acquire::Ready(image) => image,
            Acquire::OutOfDate => return Ok(PresentStatus::OutOfDate),
            Acquire::Skipped => return Ok(PresentStatus::Skipped),
        };

        let queue = device.graphics_queue();
        let ready = match self.swapchain.as_mut() {
            Some(swapchain) => swapchain
                .submit_clear(device.handle(), queue, &image)
                .map_err(BootstrapError::PresentFailure)?,
            None => return Ok(PresentStatus::Skipped),
        };

        let status = self.present_image(queue, image.index, ready)?;
        if image.suboptimal && status == PresentStatus::Presented {
            return Ok(PresentStatus::Suboptimal);
        }
        Ok(status)
    }

    /// Destroy the swapchain (through `device`) and then the surface.
    ///
    /// # Safety
    /// The device must be idle, and the owning instance still alive.
    pub unsafe fn destroy(mut self, device: Option<&LogicalDevice>) {
        match (self.swapchain.take(), device) {
            (Some(swapchain), Some(device)) => swapchain.destroy(device.handle()),
            (Some(_), None) => log::error!("Swapchain outlived its device; leaking it"),
            (None, _) => {}
        }
        self.loader.destroy_surface(self.surface, None);
        log::info!("Destroyed presentation surface");
    }
}
