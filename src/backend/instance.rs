// Vulkan instance
//
// Responsibilities:
// - Extension/layer list (validation layer in debug builds only)
// - Instance creation with the fixed application identity
// - Debug messenger forwarding validation output to `log`
// - Instance destruction through the resolved entry point

use ash::vk;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use super::error::BootstrapError;
use super::loader::SymbolTable;
use super::symbols::DESTROY_INSTANCE;

pub const APPLICATION_NAME: &CStr = c"gfx-bootstrap";
pub const ENGINE_NAME: &CStr = c"gfx-bootstrap";
pub const APPLICATION_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);
pub const TARGET_API_VERSION: u32 = vk::API_VERSION_1_3;

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";
pub const DEBUG_UTILS_EXTENSION: &CStr = c"VK_EXT_debug_utils";

const ENUMERATE_INSTANCE_EXTENSIONS: &CStr = c"vkEnumerateInstanceExtensionProperties";
const CREATE_DEBUG_MESSENGER: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_DEBUG_MESSENGER: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

/// Compile-time build configuration; gates the validation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFlavor {
    Debug,
    Release,
}

impl BuildFlavor {
    /// Flavor of the binary this crate was compiled into.
    pub const fn current() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    pub const fn validation_enabled(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Extension and layer names the instance will be created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub extensions: Vec<&'static CStr>,
    pub layers: Vec<&'static CStr>,
}

impl InstanceRequest {
    pub fn new(required_extensions: Vec<&'static CStr>, flavor: BuildFlavor) -> Self {
        let layers = if flavor.validation_enabled() {
            vec![VALIDATION_LAYER]
        } else {
            Vec::new()
        };

        Self {
            extensions: required_extensions,
            layers,
        }
    }

    pub fn enable_extension(&mut self, name: &'static CStr) {
        if !self.extensions.contains(&name) {
            self.extensions.push(name);
        }
    }

    pub fn has_extension(&self, name: &CStr) -> bool {
        self.extensions.iter().any(|ext| *ext == name)
    }
}

/// Instance extensions the driver advertises, read through the base tier.
pub fn available_instance_extensions(symbols: &SymbolTable) -> Vec<vk::ExtensionProperties> {
    let Some(enumerate) = (unsafe {
        symbols.typed::<vk::PFN_vkEnumerateInstanceExtensionProperties>(ENUMERATE_INSTANCE_EXTENSIONS)
    }) else {
        return Vec::new();
    };

    let mut count = 0u32;
    let result = unsafe { enumerate(ptr::null(), &mut count, ptr::null_mut()) };
    if result != vk::Result::SUCCESS {
        log::warn!("Could not count instance extensions: {:?}", result);
        return Vec::new();
    }

    let mut properties = vec![vk::ExtensionProperties::default(); count as usize];
    let result = unsafe { enumerate(ptr::null(), &mut count, properties.as_mut_ptr()) };
    if result != vk::Result::SUCCESS && result != vk::Result::INCOMPLETE {
        log::warn!("Could not enumerate instance extensions: {:?}", result);
        return Vec::new();
    }
    properties.truncate(count as usize);
    properties
}

pub fn has_instance_extension(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available
        .iter()
        .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == name)
}

/// Create the instance described by `request`.
pub fn create_instance(
    entry: &ash::Entry,
    request: &InstanceRequest,
) -> Result<ash::Instance, BootstrapError> {
    let app_info = vk::ApplicationInfo::builder()
        .application_name(APPLICATION_NAME)
        .application_version(APPLICATION_VERSION)
        .engine_name(ENGINE_NAME)
        .engine_version(APPLICATION_VERSION)
        .api_version(TARGET_API_VERSION);

    let extensions: Vec<*const c_char> = request.extensions.iter().map(|e| e.as_ptr()).collect();
    let layers: Vec<*const c_char> = request.layers.iter().map(|l| l.as_ptr()).collect();

    log::info!("Instance extensions: {:?}", request.extensions);
    if !request.layers.is_empty() {
        log::info!("Instance layers: {:?}", request.layers);
    }

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layers);

    unsafe { entry.create_instance(&create_info, None) }
        .map_err(BootstrapError::InstanceCreateFailure)
}

/// Destroy `instance` through a freshly resolved `vkDestroyInstance`.
///
/// The instance tier may have failed to resolve, so ash's own table is not
/// trusted here. Without the entry point the instance is leaked and logged.
///
/// # Safety
/// Every object created from `instance` must already be destroyed.
pub unsafe fn destroy_instance(entry: &ash::Entry, instance: &ash::Instance) {
    let handle = instance.handle();
    match entry.get_instance_proc_addr(handle, DESTROY_INSTANCE.as_ptr()) {
        Some(proc) => {
            let destroy: vk::PFN_vkDestroyInstance = std::mem::transmute(proc);
            destroy(handle, ptr::null());
        }
        None => log::error!("vkDestroyInstance unavailable; leaking instance {:?}", handle),
    }
}

/// Debug messenger forwarding validation messages to `log`.
pub struct DebugMessenger {
    loader: ash::extensions::ext::DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Whether the optional entry points the messenger needs were resolved.
    pub fn supported(symbols: &SymbolTable) -> bool {
        symbols.contains(CREATE_DEBUG_MESSENGER) && symbols.contains(DESTROY_DEBUG_MESSENGER)
    }

    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self, vk::Result> {
        let loader = ash::extensions::ext::DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }?;
        Ok(Self { loader, messenger })
    }

    /// # Safety
    /// Must run before the owning instance is destroyed.
    pub unsafe fn destroy(self) {
        self.loader.destroy_debug_utils_messenger(self.messenger, None);
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
