// Present commands
//
// One pre-recorded command buffer per swapchain image. Each clears its image
// and leaves it in PRESENT_SRC_KHR, so a freshly acquired image can be handed
// to the presentation engine without a renderer in between.

use ash::vk;

/// Opaque black.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

#[derive(Default)]
pub struct PresentCommands {
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl PresentCommands {
    /// Record the clear-and-transition commands for every image. On failure
    /// the pool is destroyed before returning.
    pub fn new(device: &ash::Device, queue_family: u32, images: &[vk::Image]) -> Result<Self, vk::Result> {
        let pool_info = vk::CommandPoolCreateInfo::builder().queue_family_index(queue_family);
        let pool = unsafe { device.create_command_pool(&pool_info, None) }?;

        let mut commands = Self {
            pool,
            buffers: Vec::new(),
        };
        if let Err(e) = commands.record(device, images) {
            unsafe { commands.destroy(device) };
            return Err(e);
        }
        Ok(commands)
    }

    fn record(&mut self, device: &ash::Device, images: &[vk::Image]) -> Result<(), vk::Result> {
        if images.is_empty() {
            return Ok(());
        }

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(images.len() as u32);
        self.buffers = unsafe { device.allocate_command_buffers(&alloc_info) }?;

        for (&cmd, &image) in self.buffers.iter().zip(images) {
            unsafe { record_clear(device, cmd, image) }?;
        }
        Ok(())
    }

    pub fn buffer(&self, image_index: u32) -> Option<vk::CommandBuffer> {
        self.buffers.get(image_index as usize).copied()
    }

    /// Destroying the pool frees its buffers.
    ///
    /// # Safety
    /// None of the buffers may still be pending on the GPU.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        if self.pool != vk::CommandPool::null() {
            device.destroy_command_pool(self.pool, None);
        }
        self.pool = vk::CommandPool::null();
        self.buffers.clear();
    }
}

/// UNDEFINED -> TRANSFER_DST, clear, TRANSFER_DST -> PRESENT_SRC.
unsafe fn record_clear(device: &ash::Device, cmd: vk::CommandBuffer, image: vk::Image) -> Result<(), vk::Result> {
    let begin_info = vk::CommandBufferBeginInfo::builder();
    device.begin_command_buffer(cmd, &begin_info)?;

    let to_transfer = vk::ImageMemoryBarrier::builder()
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(COLOR_RANGE)
        .build();

    // Waits on the acquire semaphore at TRANSFER, so start there
    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[to_transfer],
    );

    device.cmd_clear_color_image(
        cmd,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &vk::ClearColorValue { float32: CLEAR_COLOR },
        &[COLOR_RANGE],
    );

    let to_present = vk::ImageMemoryBarrier::builder()
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::empty())
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(COLOR_RANGE)
        .build();

    device.cmd_pipeline_barrier(
        cmd,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[to_present],
    );

    device.end_command_buffer(cmd)
}
