// Swapchain - Window presentation
//
// Manages the chain of images presented to the surface. The choice of
// format, present mode, extent and image count is split into pure functions;
// `Swapchain::new` only applies them.

use ash::vk;

use super::commands::PresentCommands;
use super::device::LogicalDevice;
use super::error::BootstrapError;
use super::sync::{FrameSlot, PresentSync};

/// What the surface offers the selected physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn query(
        surface_loader: &ash::extensions::khr::Surface,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, BootstrapError> {
        let query_failed =
            |e: vk::Result| BootstrapError::SwapchainCreateFailure(format!("surface query failed: {e}"));

        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(query_failed)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(query_failed)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(query_failed)?,
            })
        }
    }
}

/// B8G8R8A8_SRGB with the sRGB colour space, else whatever comes first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when offered; FIFO is always available.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's own extent, or the window's clamped to the surface limits
/// when the surface leaves it to us.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: window
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: window
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum (0 means no maximum).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && image_count > caps.max_image_count {
        caps.max_image_count
    } else {
        image_count
    }
}

/// An acquired image and the semaphore signalled when it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    pub wait: vk::Semaphore,
    pub suboptimal: bool,
    pub slot: FrameSlot,
}

pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    loader: ash::extensions::khr::Swapchain,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    commands: PresentCommands,
    sync: PresentSync,
}

impl Swapchain {
    /// Build a swapchain of `extent` on `surface`. `old` is handed to the
    /// driver for reuse and stays owned by the caller.
    pub fn new(
        instance: &ash::Instance,
        device: &LogicalDevice,
        surface: vk::SurfaceKHR,
        support: &SwapchainSupport,
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    ) -> Result<Self, BootstrapError> {
        let surface_format = choose_surface_format(&support.formats).ok_or_else(|| {
            BootstrapError::SwapchainCreateFailure("surface offers no formats".into())
        })?;
        let present_mode = choose_present_mode(&support.present_modes);
        let image_count = choose_image_count(&support.capabilities);

        log::info!(
            "Creating swapchain: {}x{}, {:?}, {:?}, {} images",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            image_count
        );

        let loader = ash::extensions::khr::Swapchain::new(instance, device.handle());

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old);

        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| BootstrapError::SwapchainCreateFailure(format!("vkCreateSwapchainKHR: {e}")))?;

        let mut this = Self {
            swapchain,
            loader,
            images: Vec::new(),
            image_views: Vec::new(),
            format: surface_format.format,
            extent,
            present_mode,
            commands: PresentCommands::default(),
            sync: PresentSync::default(),
        };

        // Anything built so far goes through `destroy` on the way out.
        if let Err(e) = this.create_images(device) {
            unsafe { this.destroy(device.handle()) };
            return Err(e);
        }

        log::info!("Created swapchain with {} images", this.images.len());
        Ok(this)
    }

    fn create_images(&mut self, device: &LogicalDevice) -> Result<(), BootstrapError> {
        self.images = unsafe { self.loader.get_swapchain_images(self.swapchain) }.map_err(|e| {
            BootstrapError::SwapchainCreateFailure(format!("vkGetSwapchainImagesKHR: {e}"))
        })?;
        if self.images.is_empty() {
            return Err(BootstrapError::SwapchainCreateFailure(
                "swapchain has no images".into(),
            ));
        }

        let queue_family = device.queue_family();
        let device = device.handle();

        for &image in &self.images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { device.create_image_view(&create_info, None) }.map_err(|e| {
                BootstrapError::SwapchainCreateFailure(format!("vkCreateImageView: {e}"))
            })?;
            self.image_views.push(view);
        }

        self.commands = PresentCommands::new(device, queue_family, &self.images).map_err(|e| {
            BootstrapError::SwapchainCreateFailure(format!("present commands: {e}"))
        })?;

        self.sync = PresentSync::new(device, self.images.len()).map_err(|e| {
            BootstrapError::SwapchainCreateFailure(format!("present sync objects: {e}"))
        })?;
        Ok(())
    }

    /// Acquire next image, signalling the returned semaphore when ready.
    pub fn acquire_next_image(&mut self, device: &ash::Device) -> Result<AcquiredImage, vk::Result> {
        let slot = self.sync.next_slot(device)?;
        let (index, suboptimal) = unsafe {
            self.loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                slot.image_available,
                vk::Fence::null(),
            )
        }?;

        Ok(AcquiredImage {
            index,
            wait: slot.image_available,
            suboptimal,
            slot,
        })
    }

    /// Submit the pre-recorded clear for `image`, which leaves it ready for
    /// presentation. Returns the semaphore the present must wait on.
    pub fn submit_clear(
        &mut self,
        device: &ash::Device,
        queue: vk::Queue,
        image: &AcquiredImage,
    ) -> Result<vk::Semaphore, vk::Result> {
        let cmd = self
            .commands
            .buffer(image.index)
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        let ready = self.sync.claim_image(device, image.index, &image.slot)?;

        let wait_semaphores = [image.wait];
        let wait_stages = [vk::PipelineStageFlags::TRANSFER];
        let command_buffers = [cmd];
        let signal_semaphores = [ready];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { device.queue_submit(queue, &[submit_info.build()], image.slot.in_flight) }?;
        Ok(ready)
    }

    /// Queue `image_index` for presentation. `Ok(true)` means suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let wait_semaphores = [wait];
        let wait_semaphores: &[vk::Semaphore] = if wait == vk::Semaphore::null() {
            &[]
        } else {
            &wait_semaphores
        };
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.loader.queue_present(queue, &present_info) }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Destroy sync objects, commands, views, then the swapchain itself.
    ///
    /// # Safety
    /// The device must be idle with respect to this swapchain.
    pub unsafe fn destroy(mut self, device: &ash::Device) {
        self.sync.destroy(device);
        self.commands.destroy(device);
        for view in self.image_views.drain(..) {
            device.destroy_image_view(view, None);
        }
        self.loader.destroy_swapchain(self.swapchain, None);
    }
}
