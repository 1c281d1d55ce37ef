// Physical device selection
//
// Policy: a discrete GPU if there is one, else an integrated one, else the
// first device enumerated. One representative is kept per category and a
// later device of the same category replaces an earlier one.

use ash::vk;
use std::collections::HashMap;
use std::ffi::CStr;

use super::error::BootstrapError;

/// Device-type buckets the selection policy works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

impl From<vk::PhysicalDeviceType> for DeviceCategory {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => Self::Virtual,
            vk::PhysicalDeviceType::CPU => Self::Cpu,
            _ => Self::Other,
        }
    }
}

/// Snapshot of one enumerated device. The driver owns the handle.
#[derive(Debug, Clone, Copy)]
pub struct PhysicalDeviceInfo {
    pub handle: vk::PhysicalDevice,
    pub device_type: vk::PhysicalDeviceType,
    pub properties: vk::PhysicalDeviceProperties,
}

impl PhysicalDeviceInfo {
    pub fn category(&self) -> DeviceCategory {
        self.device_type.into()
    }

    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilySelection {
    pub family_index: u32,
    pub supports_graphics: bool,
}

/// Index of the device to use, given each device's category in enumeration
/// order. `None` only for an empty list.
pub fn choose_device(categories: &[DeviceCategory]) -> Option<usize> {
    let mut by_category = HashMap::new();
    for (index, category) in categories.iter().enumerate() {
        by_category.insert(*category, index);
    }

    by_category
        .get(&DeviceCategory::Discrete)
        .or_else(|| by_category.get(&DeviceCategory::Integrated))
        .copied()
        .or_else(|| (!categories.is_empty()).then_some(0))
}

/// Lowest-indexed family with graphics capability.
pub fn choose_graphics_family(
    families: &[vk::QueueFamilyProperties],
) -> Option<QueueFamilySelection> {
    families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|index| QueueFamilySelection {
            family_index: index as u32,
            supports_graphics: true,
        })
}

pub struct DeviceSelector;

impl DeviceSelector {
    /// Every physical device the instance exposes.
    pub fn enumerate(instance: &ash::Instance) -> Result<Vec<PhysicalDeviceInfo>, BootstrapError> {
        let handles = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
            log::error!("Physical device enumeration failed: {:?}", e);
            BootstrapError::NoSuitablePhysicalDevice
        })?;

        Ok(handles
            .into_iter()
            .map(|handle| {
                let properties = unsafe { instance.get_physical_device_properties(handle) };
                PhysicalDeviceInfo {
                    handle,
                    device_type: properties.device_type,
                    properties,
                }
            })
            .collect())
    }

    pub fn select(
        instance: &ash::Instance,
    ) -> Result<(PhysicalDeviceInfo, QueueFamilySelection), BootstrapError> {
        let devices = Self::enumerate(instance)?;
        for device in &devices {
            log::debug!("Found GPU: {} ({:?})", device.name(), device.device_type);
        }

        let categories: Vec<DeviceCategory> = devices.iter().map(PhysicalDeviceInfo::category).collect();
        let chosen = choose_device(&categories)
            .map(|index| devices[index])
            .ok_or(BootstrapError::NoSuitablePhysicalDevice)?;

        let families =
            unsafe { instance.get_physical_device_queue_family_properties(chosen.handle) };
        let family = choose_graphics_family(&families).ok_or_else(|| {
            log::error!("{} exposes no graphics queue family", chosen.name());
            BootstrapError::NoGraphicsQueueFamily
        })?;

        log::info!(
            "Selected GPU: {} ({:?}), graphics family {}",
            chosen.name(),
            chosen.category(),
            family.family_index
        );
        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(chosen.properties.api_version),
            vk::api_version_minor(chosen.properties.api_version),
            vk::api_version_patch(chosen.properties.api_version)
        );

        Ok((chosen, family))
    }
}
