// Logical device - the configured connection to the selected GPU
//
// Responsibilities:
// - One queue from the selected graphics family, priority 1.0
// - VK_KHR_swapchain as the only device extension
// - No optional features until a renderer asks for them

use ash::vk;

use super::error::BootstrapError;
use super::selector::{PhysicalDeviceInfo, QueueFamilySelection};

/// Logical device plus its graphics queue.
///
/// The queue is a view into the device and dies with it.
pub struct LogicalDevice {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    graphics_queue: vk::Queue,
}

impl LogicalDevice {
    pub fn create(
        instance: &ash::Instance,
        physical: &PhysicalDeviceInfo,
        family: &QueueFamilySelection,
    ) -> Result<Self, BootstrapError> {
        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(family.family_index)
            .queue_priorities(&queue_priorities)
            .build();

        let extensions = [ash::extensions::khr::Swapchain::name().as_ptr()];

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extensions);

        let device = unsafe { instance.create_device(physical.handle, &create_info, None) }
            .map_err(BootstrapError::LogicalDeviceCreateFailure)?;

        let graphics_queue = unsafe { device.get_device_queue(family.family_index, 0) };
        log::info!("Created logical device on queue family {}", family.family_index);

        Ok(Self {
            device,
            physical_device: physical.handle,
            queue_family: family.family_index,
            graphics_queue,
        })
    }

    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<(), vk::Result> {
        unsafe { self.device.device_wait_idle() }
    }

    /// # Safety
    /// Every object created from this device must already be destroyed.
    pub unsafe fn destroy(self) {
        log::info!("Destroying logical device...");
        self.device.destroy_device(None);
    }
}
