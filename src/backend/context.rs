// Graphics context - bootstrap orchestration
//
// initialize():
//   load symbols -> instance -> instance symbols -> (debug messenger)
//   -> device selection -> logical device -> surface -> swapchain
//
// Any failure tears down what was built, in reverse, before the error is
// returned. shutdown() is the one teardown routine for every path.

use ash::vk;

use super::device::LogicalDevice;
use super::error::BootstrapError;
use super::instance::{
    available_instance_extensions, create_instance, destroy_instance, has_instance_extension,
    BuildFlavor, DebugMessenger, InstanceRequest, DEBUG_UTILS_EXTENSION,
};
use super::loader::SymbolLoader;
use super::platform::WindowSystem;
use super::selector::{DeviceSelector, PhysicalDeviceInfo, QueueFamilySelection};
use super::surface::{Acquire, PresentStatus, PresentationSurface};

/// Owns every handle of the bootstrap chain.
///
/// Not `Sync`: initialize, present and shutdown belong to the thread that
/// owns the window.
pub struct GraphicsContext {
    flavor: BuildFlavor,
    loader: SymbolLoader,
    entry: Option<ash::Entry>,
    instance: Option<ash::Instance>,
    debug_messenger: Option<DebugMessenger>,
    physical_device: Option<PhysicalDeviceInfo>,
    queue_family: Option<QueueFamilySelection>,
    device: Option<LogicalDevice>,
    surface: Option<PresentationSurface>,
}

impl GraphicsContext {
    /// Context over the system Vulkan loader, flavored by this build.
    pub fn new() -> Self {
        Self::with_loader(SymbolLoader::system(), BuildFlavor::current())
    }

    pub fn with_loader(loader: SymbolLoader, flavor: BuildFlavor) -> Self {
        Self {
            flavor,
            loader,
            entry: None,
            instance: None,
            debug_messenger: None,
            physical_device: None,
            queue_family: None,
            device: None,
            surface: None,
        }
    }

    /// Bootstrap everything needed to present to `window`.
    ///
    /// An already initialized context is shut down first.
    pub fn initialize(&mut self, window: &dyn WindowSystem) -> Result<(), BootstrapError> {
        if self.loader.is_loaded() {
            log::info!("Re-initializing graphics context");
            self.shutdown();
        }

        let result = self.bootstrap(window);
        if let Err(e) = &result {
            log::error!("Graphics bootstrap failed: {}", e);
            self.shutdown();
        }
        result
    }

    fn bootstrap(&mut self, window: &dyn WindowSystem) -> Result<(), BootstrapError> {
        // Step 1: driver library and base entry points
        self.loader.load()?;

        // Step 2: presentation extensions for this window
        let source = window.surface_source()?;

        // Step 3: extension/layer list
        let mut request = InstanceRequest::new(source.required_extensions(), self.flavor);
        if self.flavor.validation_enabled() {
            let available = available_instance_extensions(self.loader.table());
            if has_instance_extension(&available, DEBUG_UTILS_EXTENSION) {
                request.enable_extension(DEBUG_UTILS_EXTENSION);
            } else {
                log::warn!("VK_EXT_debug_utils not available; validation output stays with the layer");
            }
        }

        // Step 4: instance
        let entry = self.loader.entry()?;
        let entry = self.entry.insert(entry);
        let instance: &ash::Instance = self.instance.insert(create_instance(entry, &request)?);
        log::info!("Created Vulkan instance");

        // Step 5: instance-scope entry points
        self.loader
            .resolve_instance_symbols(instance.handle(), source.platform_symbols())?;

        if request.has_extension(DEBUG_UTILS_EXTENSION) {
            if DebugMessenger::supported(self.loader.table()) {
                match DebugMessenger::new(entry, instance) {
                    Ok(messenger) => self.debug_messenger = Some(messenger),
                    Err(e) => log::warn!("Failed to create debug messenger: {:?}", e),
                }
            } else {
                log::warn!("Debug messenger entry points missing; continuing without it");
            }
        }

        // Step 6: physical device and queue family
        let (physical, family) = DeviceSelector::select(instance)?;
        self.physical_device = Some(physical);
        self.queue_family = Some(family);

        // Step 7: logical device
        let device: &LogicalDevice =
            self.device.insert(LogicalDevice::create(instance, &physical, &family)?);

        // Step 8: surface
        let surface = self.surface.insert(PresentationSurface::create(
            entry,
            instance,
            self.loader.table(),
            &source,
        )?);

        // Step 9: swapchain sized to the window
        surface.create_swapchain(instance, device, window.framebuffer_extent())?;

        log::info!("Graphics context ready");
        Ok(())
    }

    /// Tear down in reverse construction order. Safe to call at any point
    /// and any number of times.
    pub fn shutdown(&mut self) {
        let was_loaded = self.loader.is_loaded();

        if let Some(device) = &self.device {
            if let Err(e) = device.wait_idle() {
                log::warn!("Device wait before shutdown failed: {:?}", e);
            }
        }

        unsafe {
            if let Some(surface) = self.surface.take() {
                surface.destroy(self.device.as_ref());
            }
            if let Some(device) = self.device.take() {
                device.destroy();
            }
            self.queue_family = None;
            self.physical_device = None;

            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            if let Some(instance) = self.instance.take() {
                match &self.entry {
                    Some(entry) => destroy_instance(entry, &instance),
                    None => log::error!("No entry to destroy instance {:?}", instance.handle()),
                }
            }
        }

        self.entry = None;
        self.loader.release();

        if was_loaded {
            log::info!("Graphics context shut down");
        }
    }

    /// Present the next swapchain image, cleared to black.
    pub fn present(&mut self) -> Result<PresentStatus, BootstrapError> {
        match (self.surface.as_mut(), self.device.as_ref()) {
            (Some(surface), Some(device)) => surface.present(device),
            _ => Ok(PresentStatus::Skipped),
        }
    }

    /// Acquire the next image for a frame renderer.
    pub fn acquire_image(&mut self) -> Result<Acquire, BootstrapError> {
        match (self.surface.as_mut(), self.device.as_ref()) {
            (Some(surface), Some(device)) => surface.acquire_image(device),
            _ => Ok(Acquire::Skipped),
        }
    }

    /// Present an image obtained from `acquire_image`, after `wait`.
    ///
    /// The caller's work signalled by `wait` must leave the image in
    /// `PRESENT_SRC_KHR`.
    pub fn present_image(
        &mut self,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentStatus, BootstrapError> {
        match (self.surface.as_ref(), self.device.as_ref()) {
            (Some(surface), Some(device)) => {
                surface.present_image(device.graphics_queue(), image_index, wait)
            }
            _ => Ok(PresentStatus::Skipped),
        }
    }

    /// Rebuild the swapchain for a new window size.
    pub fn resize(&mut self, extent: vk::Extent2D) -> Result<(), BootstrapError> {
        let (Some(instance), Some(device), Some(surface)) =
            (self.instance.as_ref(), self.device.as_ref(), self.surface.as_mut())
        else {
            return Ok(());
        };

        if let Err(e) = device.wait_idle() {
            log::warn!("Device wait before resize failed: {:?}", e);
        }
        surface.create_swapchain(instance, device, extent)
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some()
    }

    pub fn flavor(&self) -> BuildFlavor {
        self.flavor
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.device.as_ref().map(LogicalDevice::graphics_queue)
    }

    pub fn physical_device(&self) -> Option<&PhysicalDeviceInfo> {
        self.physical_device.as_ref()
    }

    pub fn queue_family(&self) -> Option<QueueFamilySelection> {
        self.queue_family
    }

    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    pub fn swapchain_extent(&self) -> Option<vk::Extent2D> {
        self.surface
            .as_ref()
            .and_then(PresentationSurface::swapchain)
            .map(|swapchain| swapchain.extent())
    }

    pub fn loader(&self) -> &SymbolLoader {
        &self.loader
    }
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
