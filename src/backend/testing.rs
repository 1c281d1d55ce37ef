// Fake Vulkan driver for tests
//
// Plain `extern "system"` entry points over thread-local state. Each test
// thread gets its own driver, so tests stay independent under the parallel
// test runner. Handles are counters; the driver tracks how many of each kind
// are alive and records the create-info it was handed.

use ash::vk;
use ash::vk::Handle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, CStr};
use std::ptr;

use super::context::GraphicsContext;
use super::instance::BuildFlavor;
use super::loader::{DriverLibrary, LibraryOpener, RawProc, SymbolLoader};
use super::platform::{Headless, SurfaceSource, WindowError, WindowSystem};

const PHYSICAL_DEVICE_BASE: u64 = 0x10_0000;
const QUEUE_BASE: u64 = 0x20_0000;
const IMAGE_BASE: u64 = 0x30_0000;

/// Where the fake driver should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    OpenLibrary,
    CreateInstance,
    EnumerateDevices,
    CreateDevice,
    CreateSurface,
    CreateSwapchain,
    /// The first image view succeeds, later ones fail.
    CreateImageView,
    /// Surface capability query fails.
    SurfaceQuery,
    GetSwapchainImages,
    /// The first semaphore succeeds, later ones fail.
    CreateSemaphore,
}

/// Handle counts per kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Live {
    pub libraries: i32,
    pub instances: i32,
    pub devices: i32,
    pub surfaces: i32,
    pub swapchains: i32,
    pub image_views: i32,
    pub semaphores: i32,
    pub fences: i32,
    pub command_pools: i32,
    pub messengers: i32,
}

impl Live {
    pub fn is_empty(&self) -> bool {
        *self == Live::default()
    }
}

#[derive(Debug, Clone)]
pub struct FakeGpu {
    pub name: &'static str,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<vk::QueueFlags>,
}

impl FakeGpu {
    pub fn new(name: &'static str, device_type: vk::PhysicalDeviceType) -> Self {
        Self {
            name,
            device_type,
            queue_families: vec![vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER],
        }
    }

    pub fn with_families(mut self, families: Vec<vk::QueueFlags>) -> Self {
        self.queue_families = families;
        self
    }
}

/// What `vkCreateDevice` was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    pub physical_device: vk::PhysicalDevice,
    pub queues: Vec<(u32, Vec<f32>)>,
    pub extensions: Vec<String>,
    pub features_requested: bool,
}

/// What `vkCreateSwapchainKHR` was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub present_mode: vk::PresentModeKHR,
    pub min_image_count: u32,
    pub old_swapchain: vk::SwapchainKHR,
}

pub struct FakeDriver {
    pub gpus: Vec<FakeGpu>,
    pub instance_extensions: Vec<&'static CStr>,
    pub hidden: Vec<&'static CStr>,
    pub fault: Option<Fault>,
    pub present_support: bool,
    pub current_extent: vk::Extent2D,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub acquire_result: vk::Result,

    pub enabled_layers: Vec<String>,
    pub enabled_extensions: Vec<String>,
    pub api_version: Option<u32>,
    pub device_request: Option<DeviceRequest>,
    pub queue_fetched: Option<(u32, u32)>,
    pub swapchain_requests: Vec<SwapchainRequest>,
    pub presents: u32,
    pub present_waits: Vec<vk::Semaphore>,
    /// Layout of each image at the moment it was presented.
    pub presented_layouts: Vec<vk::ImageLayout>,
    pub submits: u32,
    pub submit_waits: Vec<vk::Semaphore>,
    pub submit_signals: Vec<vk::Semaphore>,
    pub recorded: HashMap<vk::CommandBuffer, Vec<(vk::Image, vk::ImageLayout)>>,
    pub image_layouts: HashMap<vk::Image, vk::ImageLayout>,

    pub live: Live,
    pub created: Live,
    pub swapchain_images: u32,
    pub acquired: u32,
    pub next_handle: u64,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            gpus: vec![FakeGpu::new("Fake Discrete", vk::PhysicalDeviceType::DISCRETE_GPU)],
            instance_extensions: Vec::new(),
            hidden: Vec::new(),
            fault: None,
            present_support: true,
            current_extent: vk::Extent2D { width: 800, height: 600 },
            surface_formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            acquire_result: vk::Result::SUCCESS,
            enabled_layers: Vec::new(),
            enabled_extensions: Vec::new(),
            api_version: None,
            device_request: None,
            queue_fetched: None,
            swapchain_requests: Vec::new(),
            presents: 0,
            present_waits: Vec::new(),
            presented_layouts: Vec::new(),
            submits: 0,
            submit_waits: Vec::new(),
            submit_signals: Vec::new(),
            recorded: HashMap::new(),
            image_layouts: HashMap::new(),
            live: Live::default(),
            created: Live::default(),
            swapchain_images: 0,
            acquired: 0,
            next_handle: 0x1000,
        }
    }
}

impl FakeDriver {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

thread_local! {
    static DRIVER: RefCell<FakeDriver> = RefCell::new(FakeDriver::default());
}

/// Replace this thread's driver state.
pub fn install(driver: FakeDriver) {
    DRIVER.with(|d| *d.borrow_mut() = driver);
}

pub fn with<R>(f: impl FnOnce(&mut FakeDriver) -> R) -> R {
    DRIVER.with(|d| f(&mut d.borrow_mut()))
}

pub fn live() -> Live {
    with(|d| d.live)
}

pub fn created() -> Live {
    with(|d| d.created)
}

pub fn loader() -> SymbolLoader {
    SymbolLoader::new(Box::new(FakeOpener), "libvulkan-fake.so")
}

pub fn context(flavor: BuildFlavor) -> GraphicsContext {
    GraphicsContext::with_loader(loader(), flavor)
}

pub fn window(width: u32, height: u32) -> Headless {
    Headless::new(vk::Extent2D { width, height })
}

/// Window whose handles cannot be turned into a surface source.
pub struct BrokenWindow;

impl WindowSystem for BrokenWindow {
    fn surface_source(&self) -> Result<SurfaceSource, WindowError> {
        Err(WindowError::Unsupported("broken test window"))
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        vk::Extent2D { width: 640, height: 480 }
    }
}

struct FakeOpener;

struct FakeLibrary;

impl LibraryOpener for FakeOpener {
    fn open(&self, name: &str) -> Result<Box<dyn DriverLibrary>, String> {
        with(|d| {
            if d.fault == Some(Fault::OpenLibrary) {
                return Err(format!("{name}: cannot open shared object file"));
            }
            d.live.libraries += 1;
            d.created.libraries += 1;
            Ok(Box::new(FakeLibrary) as Box<dyn DriverLibrary>)
        })
    }
}

impl DriverLibrary for FakeLibrary {
    fn symbol(&self, name: &CStr) -> Option<RawProc> {
        lookup(name)
    }
}

impl Drop for FakeLibrary {
    fn drop(&mut self) {
        let _ = DRIVER.try_with(|d| d.borrow_mut().live.libraries -= 1);
    }
}

fn lookup(name: &CStr) -> Option<RawProc> {
    if with(|d| d.hidden.iter().any(|hidden| *hidden == name)) {
        return None;
    }

    let proc: *const () = match name.to_bytes() {
        b"vkGetInstanceProcAddr" => get_instance_proc_addr as *const (),
        b"vkGetDeviceProcAddr" => get_device_proc_addr as *const (),
        b"vkCreateInstance" => create_instance as *const (),
        b"vkDestroyInstance" => destroy_instance as *const (),
        b"vkEnumerateInstanceExtensionProperties" => enumerate_instance_extension_properties as *const (),
        b"vkEnumerateInstanceLayerProperties" => enumerate_instance_layer_properties as *const (),
        b"vkEnumerateInstanceVersion" => enumerate_instance_version as *const (),
        b"vkEnumeratePhysicalDevices" => enumerate_physical_devices as *const (),
        b"vkGetPhysicalDeviceProperties" => get_physical_device_properties as *const (),
        b"vkGetPhysicalDeviceQueueFamilyProperties" => get_physical_device_queue_family_properties as *const (),
        b"vkCreateDevice" => create_device as *const (),
        b"vkDestroyDevice" => destroy_device as *const (),
        b"vkGetDeviceQueue" => get_device_queue as *const (),
        b"vkDeviceWaitIdle" => device_wait_idle as *const (),
        b"vkDestroySurfaceKHR" => destroy_surface as *const (),
        b"vkGetPhysicalDeviceSurfaceSupportKHR" => get_surface_support as *const (),
        b"vkGetPhysicalDeviceSurfaceCapabilitiesKHR" => get_surface_capabilities as *const (),
        b"vkGetPhysicalDeviceSurfaceFormatsKHR" => get_surface_formats as *const (),
        b"vkGetPhysicalDeviceSurfacePresentModesKHR" => get_surface_present_modes as *const (),
        b"vkCreateHeadlessSurfaceEXT" => create_headless_surface as *const (),
        b"vkCreateSwapchainKHR" => create_swapchain as *const (),
        b"vkDestroySwapchainKHR" => destroy_swapchain as *const (),
        b"vkGetSwapchainImagesKHR" => get_swapchain_images as *const (),
        b"vkAcquireNextImageKHR" => acquire_next_image as *const (),
        b"vkQueuePresentKHR" => queue_present as *const (),
        b"vkCreateImageView" => create_image_view as *const (),
        b"vkDestroyImageView" => destroy_image_view as *const (),
        b"vkCreateSemaphore" => create_semaphore as *const (),
        b"vkDestroySemaphore" => destroy_semaphore as *const (),
        b"vkCreateFence" => create_fence as *const (),
        b"vkDestroyFence" => destroy_fence as *const (),
        b"vkWaitForFences" => wait_for_fences as *const (),
        b"vkResetFences" => reset_fences as *const (),
        b"vkCreateCommandPool" => create_command_pool as *const (),
        b"vkDestroyCommandPool" => destroy_command_pool as *const (),
        b"vkAllocateCommandBuffers" => allocate_command_buffers as *const (),
        b"vkBeginCommandBuffer" => begin_command_buffer as *const (),
        b"vkEndCommandBuffer" => end_command_buffer as *const (),
        b"vkCmdPipelineBarrier" => cmd_pipeline_barrier as *const (),
        b"vkCmdClearColorImage" => cmd_clear_color_image as *const (),
        b"vkQueueSubmit" => queue_submit as *const (),
        b"vkCreateDebugUtilsMessengerEXT" => create_debug_messenger as *const (),
        b"vkDestroyDebugUtilsMessengerEXT" => destroy_debug_messenger as *const (),
        _ => return None,
    };

    Some(unsafe { std::mem::transmute::<*const (), RawProc>(proc) })
}

unsafe fn fill<T: Copy>(items: &[T], count: *mut u32, out: *mut T) -> vk::Result {
    if out.is_null() {
        *count = items.len() as u32;
        return vk::Result::SUCCESS;
    }
    let written = (*count as usize).min(items.len());
    ptr::copy_nonoverlapping(items.as_ptr(), out, written);
    *count = written as u32;
    if written < items.len() {
        vk::Result::INCOMPLETE
    } else {
        vk::Result::SUCCESS
    }
}

unsafe fn names(list: *const *const c_char, count: u32) -> Vec<String> {
    (0..count as usize)
        .map(|i| CStr::from_ptr(*list.add(i)).to_string_lossy().into_owned())
        .collect()
}

fn copy_name(dst: &mut [c_char], src: &[u8]) {
    let n = dst.len() - 1;
    for (d, s) in dst.iter_mut().zip(src.iter().take(n)) {
        *d = *s as c_char;
    }
}

fn physical_device(index: usize) -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index as u64)
}

fn gpu_index(physical_device: vk::PhysicalDevice) -> usize {
    (physical_device.as_raw() - PHYSICAL_DEVICE_BASE) as usize
}

unsafe extern "system" fn get_instance_proc_addr(
    _instance: vk::Instance,
    name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    lookup(CStr::from_ptr(name))
}

unsafe extern "system" fn get_device_proc_addr(
    _device: vk::Device,
    name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    lookup(CStr::from_ptr(name))
}

unsafe extern "system" fn create_instance(
    info: *const vk::InstanceCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::Instance,
) -> vk::Result {
    let info = &*info;
    let layers = names(info.pp_enabled_layer_names, info.enabled_layer_count);
    let extensions = names(info.pp_enabled_extension_names, info.enabled_extension_count);
    let api_version = info.p_application_info.as_ref().map(|app| app.api_version);

    with(|d| {
        d.enabled_layers = layers;
        d.enabled_extensions = extensions;
        d.api_version = api_version;
        if d.fault == Some(Fault::CreateInstance) {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
        d.live.instances += 1;
        d.created.instances += 1;
        *out = vk::Instance::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    _allocator: *const vk::AllocationCallbacks,
) {
    if instance != vk::Instance::null() {
        with(|d| d.live.instances -= 1);
    }
}

unsafe extern "system" fn enumerate_instance_extension_properties(
    _layer: *const c_char,
    count: *mut u32,
    out: *mut vk::ExtensionProperties,
) -> vk::Result {
    let properties: Vec<vk::ExtensionProperties> = with(|d| {
        d.instance_extensions
            .iter()
            .map(|name| {
                let mut property = vk::ExtensionProperties::default();
                copy_name(&mut property.extension_name, name.to_bytes());
                property
            })
            .collect()
    });
    fill(&properties, count, out)
}

unsafe extern "system" fn enumerate_instance_layer_properties(
    count: *mut u32,
    out: *mut vk::LayerProperties,
) -> vk::Result {
    fill::<vk::LayerProperties>(&[], count, out)
}

unsafe extern "system" fn enumerate_instance_version(out: *mut u32) -> vk::Result {
    *out = vk::API_VERSION_1_3;
    vk::Result::SUCCESS
}

unsafe extern "system" fn enumerate_physical_devices(
    _instance: vk::Instance,
    count: *mut u32,
    out: *mut vk::PhysicalDevice,
) -> vk::Result {
    let (fault, gpus) = with(|d| (d.fault, d.gpus.len()));
    if fault == Some(Fault::EnumerateDevices) {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let handles: Vec<_> = (0..gpus).map(physical_device).collect();
    fill(&handles, count, out)
}

unsafe extern "system" fn get_physical_device_properties(
    physical_device: vk::PhysicalDevice,
    out: *mut vk::PhysicalDeviceProperties,
) {
    let gpu = with(|d| d.gpus[gpu_index(physical_device)].clone());
    let mut properties = vk::PhysicalDeviceProperties {
        api_version: vk::API_VERSION_1_3,
        device_type: gpu.device_type,
        ..Default::default()
    };
    copy_name(&mut properties.device_name, gpu.name.as_bytes());
    *out = properties;
}

unsafe extern "system" fn get_physical_device_queue_family_properties(
    physical_device: vk::PhysicalDevice,
    count: *mut u32,
    out: *mut vk::QueueFamilyProperties,
) {
    let families: Vec<_> = with(|d| {
        d.gpus[gpu_index(physical_device)]
            .queue_families
            .iter()
            .map(|&queue_flags| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    });
    let _ = fill(&families, count, out);
}

unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    info: *const vk::DeviceCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::Device,
) -> vk::Result {
    let info = &*info;
    let queue_infos = std::slice::from_raw_parts(
        info.p_queue_create_infos,
        info.queue_create_info_count as usize,
    );
    let request = DeviceRequest {
        physical_device,
        queues: queue_infos
            .iter()
            .map(|queue| {
                let priorities =
                    std::slice::from_raw_parts(queue.p_queue_priorities, queue.queue_count as usize);
                (queue.queue_family_index, priorities.to_vec())
            })
            .collect(),
        extensions: names(info.pp_enabled_extension_names, info.enabled_extension_count),
        features_requested: !info.p_enabled_features.is_null(),
    };

    with(|d| {
        d.device_request = Some(request);
        if d.fault == Some(Fault::CreateDevice) {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
        d.live.devices += 1;
        d.created.devices += 1;
        *out = vk::Device::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_device(
    device: vk::Device,
    _allocator: *const vk::AllocationCallbacks,
) {
    if device != vk::Device::null() {
        with(|d| d.live.devices -= 1);
    }
}

unsafe extern "system" fn get_device_queue(
    _device: vk::Device,
    family: u32,
    index: u32,
    out: *mut vk::Queue,
) {
    with(|d| d.queue_fetched = Some((family, index)));
    *out = vk::Queue::from_raw(QUEUE_BASE + u64::from(family) * 16 + u64::from(index));
}

unsafe extern "system" fn device_wait_idle(_device: vk::Device) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_surface(
    _instance: vk::Instance,
    surface: vk::SurfaceKHR,
    _allocator: *const vk::AllocationCallbacks,
) {
    if surface != vk::SurfaceKHR::null() {
        with(|d| d.live.surfaces -= 1);
    }
}

unsafe extern "system" fn get_surface_support(
    _physical_device: vk::PhysicalDevice,
    _family: u32,
    _surface: vk::SurfaceKHR,
    out: *mut vk::Bool32,
) -> vk::Result {
    *out = if with(|d| d.present_support) { vk::TRUE } else { vk::FALSE };
    vk::Result::SUCCESS
}

unsafe extern "system" fn get_surface_capabilities(
    _physical_device: vk::PhysicalDevice,
    _surface: vk::SurfaceKHR,
    out: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result {
    let (fault, current_extent) = with(|d| (d.fault, d.current_extent));
    if fault == Some(Fault::SurfaceQuery) {
        return vk::Result::ERROR_SURFACE_LOST_KHR;
    }
    *out = vk::SurfaceCapabilitiesKHR {
        min_image_count: 2,
        max_image_count: 3,
        current_extent,
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        max_image_array_layers: 1,
        supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
    };
    vk::Result::SUCCESS
}

unsafe extern "system" fn get_surface_formats(
    _physical_device: vk::PhysicalDevice,
    _surface: vk::SurfaceKHR,
    count: *mut u32,
    out: *mut vk::SurfaceFormatKHR,
) -> vk::Result {
    let formats = with(|d| d.surface_formats.clone());
    fill(&formats, count, out)
}

unsafe extern "system" fn get_surface_present_modes(
    _physical_device: vk::PhysicalDevice,
    _surface: vk::SurfaceKHR,
    count: *mut u32,
    out: *mut vk::PresentModeKHR,
) -> vk::Result {
    let modes = with(|d| d.present_modes.clone());
    fill(&modes, count, out)
}

unsafe extern "system" fn create_headless_surface(
    _instance: vk::Instance,
    _info: *const vk::HeadlessSurfaceCreateInfoEXT,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::SurfaceKHR,
) -> vk::Result {
    with(|d| {
        if d.fault == Some(Fault::CreateSurface) {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
        d.live.surfaces += 1;
        d.created.surfaces += 1;
        *out = vk::SurfaceKHR::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn create_swapchain(
    _device: vk::Device,
    info: *const vk::SwapchainCreateInfoKHR,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::SwapchainKHR,
) -> vk::Result {
    let info = &*info;
    let request = SwapchainRequest {
        extent: info.image_extent,
        format: info.image_format,
        present_mode: info.present_mode,
        min_image_count: info.min_image_count,
        old_swapchain: info.old_swapchain,
    };

    with(|d| {
        d.swapchain_requests.push(request);
        if d.fault == Some(Fault::CreateSwapchain) {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
        d.live.swapchains += 1;
        d.created.swapchains += 1;
        d.swapchain_images = request.min_image_count;
        d.image_layouts.clear();
        *out = vk::SwapchainKHR::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_swapchain(
    _device: vk::Device,
    swapchain: vk::SwapchainKHR,
    _allocator: *const vk::AllocationCallbacks,
) {
    if swapchain != vk::SwapchainKHR::null() {
        with(|d| d.live.swapchains -= 1);
    }
}

unsafe extern "system" fn get_swapchain_images(
    _device: vk::Device,
    _swapchain: vk::SwapchainKHR,
    count: *mut u32,
    out: *mut vk::Image,
) -> vk::Result {
    if with(|d| d.fault) == Some(Fault::GetSwapchainImages) {
        return vk::Result::ERROR_OUT_OF_HOST_MEMORY;
    }
    let images: Vec<_> = (0..with(|d| d.swapchain_images))
        .map(|i| vk::Image::from_raw(IMAGE_BASE + u64::from(i)))
        .collect();
    fill(&images, count, out)
}

unsafe extern "system" fn acquire_next_image(
    _device: vk::Device,
    _swapchain: vk::SwapchainKHR,
    _timeout: u64,
    _semaphore: vk::Semaphore,
    _fence: vk::Fence,
    out: *mut u32,
) -> vk::Result {
    with(|d| {
        if d.acquire_result != vk::Result::SUCCESS {
            return d.acquire_result;
        }
        *out = d.acquired % d.swapchain_images.max(1);
        d.acquired += 1;
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn queue_present(
    _queue: vk::Queue,
    info: *const vk::PresentInfoKHR,
) -> vk::Result {
    let info = &*info;
    let waits = if info.wait_semaphore_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(info.p_wait_semaphores, info.wait_semaphore_count as usize).to_vec()
    };
    let indices = std::slice::from_raw_parts(info.p_image_indices, info.swapchain_count as usize);
    with(|d| {
        for &index in indices {
            let image = vk::Image::from_raw(IMAGE_BASE + u64::from(index));
            let layout = d.image_layouts.get(&image).copied().unwrap_or(vk::ImageLayout::UNDEFINED);
            d.presented_layouts.push(layout);
        }
        d.presents += 1;
        d.present_waits = waits;
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn create_image_view(
    _device: vk::Device,
    _info: *const vk::ImageViewCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::ImageView,
) -> vk::Result {
    with(|d| {
        if d.fault == Some(Fault::CreateImageView) && d.live.image_views >= 1 {
            return vk::Result::ERROR_OUT_OF_DEVICE_MEMORY;
        }
        d.live.image_views += 1;
        d.created.image_views += 1;
        *out = vk::ImageView::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_image_view(
    _device: vk::Device,
    view: vk::ImageView,
    _allocator: *const vk::AllocationCallbacks,
) {
    if view != vk::ImageView::null() {
        with(|d| d.live.image_views -= 1);
    }
}

unsafe extern "system" fn create_semaphore(
    _device: vk::Device,
    _info: *const vk::SemaphoreCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::Semaphore,
) -> vk::Result {
    with(|d| {
        if d.fault == Some(Fault::CreateSemaphore) && d.live.semaphores >= 1 {
            return vk::Result::ERROR_OUT_OF_DEVICE_MEMORY;
        }
        d.live.semaphores += 1;
        d.created.semaphores += 1;
        *out = vk::Semaphore::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_semaphore(
    _device: vk::Device,
    semaphore: vk::Semaphore,
    _allocator: *const vk::AllocationCallbacks,
) {
    if semaphore != vk::Semaphore::null() {
        with(|d| d.live.semaphores -= 1);
    }
}

unsafe extern "system" fn create_fence(
    _device: vk::Device,
    _info: *const vk::FenceCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::Fence,
) -> vk::Result {
    with(|d| {
        d.live.fences += 1;
        d.created.fences += 1;
        *out = vk::Fence::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_fence(
    _device: vk::Device,
    fence: vk::Fence,
    _allocator: *const vk::AllocationCallbacks,
) {
    if fence != vk::Fence::null() {
        with(|d| d.live.fences -= 1);
    }
}

// Submissions complete immediately, so fences are always signaled by the
// time anyone waits on them.
unsafe extern "system" fn wait_for_fences(
    _device: vk::Device,
    _count: u32,
    _fences: *const vk::Fence,
    _wait_all: vk::Bool32,
    _timeout: u64,
) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn reset_fences(
    _device: vk::Device,
    _count: u32,
    _fences: *const vk::Fence,
) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn create_command_pool(
    _device: vk::Device,
    _info: *const vk::CommandPoolCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::CommandPool,
) -> vk::Result {
    with(|d| {
        d.live.command_pools += 1;
        d.created.command_pools += 1;
        *out = vk::CommandPool::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_command_pool(
    _device: vk::Device,
    pool: vk::CommandPool,
    _allocator: *const vk::AllocationCallbacks,
) {
    if pool != vk::CommandPool::null() {
        with(|d| d.live.command_pools -= 1);
    }
}

unsafe extern "system" fn allocate_command_buffers(
    _device: vk::Device,
    info: *const vk::CommandBufferAllocateInfo,
    out: *mut vk::CommandBuffer,
) -> vk::Result {
    let count = (*info).command_buffer_count as usize;
    with(|d| {
        for i in 0..count {
            *out.add(i) = vk::CommandBuffer::from_raw(d.handle());
        }
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn begin_command_buffer(
    cmd: vk::CommandBuffer,
    _info: *const vk::CommandBufferBeginInfo,
) -> vk::Result {
    with(|d| {
        d.recorded.insert(cmd, Vec::new());
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn end_command_buffer(_cmd: vk::CommandBuffer) -> vk::Result {
    vk::Result::SUCCESS
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn cmd_pipeline_barrier(
    cmd: vk::CommandBuffer,
    _src_stage: vk::PipelineStageFlags,
    _dst_stage: vk::PipelineStageFlags,
    _dependency_flags: vk::DependencyFlags,
    _memory_barrier_count: u32,
    _memory_barriers: *const vk::MemoryBarrier,
    _buffer_barrier_count: u32,
    _buffer_barriers: *const vk::BufferMemoryBarrier,
    image_barrier_count: u32,
    image_barriers: *const vk::ImageMemoryBarrier,
) {
    let barriers: &[vk::ImageMemoryBarrier] = if image_barrier_count == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(image_barriers, image_barrier_count as usize)
    };
    with(|d| {
        let recorded = d.recorded.entry(cmd).or_default();
        recorded.extend(barriers.iter().map(|b| (b.image, b.new_layout)));
    });
}

unsafe extern "system" fn cmd_clear_color_image(
    _cmd: vk::CommandBuffer,
    _image: vk::Image,
    _layout: vk::ImageLayout,
    _color: *const vk::ClearColorValue,
    _range_count: u32,
    _ranges: *const vk::ImageSubresourceRange,
) {
}

unsafe extern "system" fn queue_submit(
    _queue: vk::Queue,
    submit_count: u32,
    submits: *const vk::SubmitInfo,
    _fence: vk::Fence,
) -> vk::Result {
    let submits = std::slice::from_raw_parts(submits, submit_count as usize);
    with(|d| {
        for submit in submits {
            let commands =
                std::slice::from_raw_parts(submit.p_command_buffers, submit.command_buffer_count as usize);
            for cmd in commands {
                let transitions = d.recorded.get(cmd).cloned().unwrap_or_default();
                for (image, layout) in transitions {
                    d.image_layouts.insert(image, layout);
                }
            }
            d.submit_waits = std::slice::from_raw_parts(
                submit.p_wait_semaphores,
                submit.wait_semaphore_count as usize,
            )
            .to_vec();
            d.submit_signals = std::slice::from_raw_parts(
                submit.p_signal_semaphores,
                submit.signal_semaphore_count as usize,
            )
            .to_vec();
            d.submits += 1;
        }
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn create_debug_messenger(
    _instance: vk::Instance,
    _info: *const vk::DebugUtilsMessengerCreateInfoEXT,
    _allocator: *const vk::AllocationCallbacks,
    out: *mut vk::DebugUtilsMessengerEXT,
) -> vk::Result {
    with(|d| {
        d.live.messengers += 1;
        d.created.messengers += 1;
        *out = vk::DebugUtilsMessengerEXT::from_raw(d.handle());
        vk::Result::SUCCESS
    })
}

unsafe extern "system" fn destroy_debug_messenger(
    _instance: vk::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    _allocator: *const vk::AllocationCallbacks,
) {
    if messenger != vk::DebugUtilsMessengerEXT::null() {
        with(|d| d.live.messengers -= 1);
    }
}
