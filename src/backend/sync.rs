// Synchronization primitives
//
// Per swapchain: one slot (acquire semaphore + in-flight fence) per image,
// handed out round-robin because the image index is only known once the
// acquire has been issued, and one ready semaphore per image for the
// present to wait on.

use ash::vk;

/// One round-robin slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub index: usize,
    pub image_available: vk::Semaphore,
    pub in_flight: vk::Fence,
}

#[derive(Default)]
pub struct PresentSync {
    image_available: Vec<vk::Semaphore>,
    in_flight: Vec<vk::Fence>,
    ready: Vec<vk::Semaphore>,
    // Fence of the last submission that touched each image.
    images_in_flight: Vec<vk::Fence>,
    next: usize,
}

impl PresentSync {
    /// Create the objects for `count` images. On failure the ones already
    /// created are destroyed before returning.
    pub fn new(device: &ash::Device, count: usize) -> Result<Self, vk::Result> {
        let mut sync = Self::default();
        if let Err(e) = sync.create(device, count) {
            unsafe { sync.destroy(device) };
            return Err(e);
        }
        Ok(sync)
    }

    fn create(&mut self, device: &ash::Device, count: usize) -> Result<(), vk::Result> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        // Signaled, so the first wait on each slot returns at once
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        for _ in 0..count {
            unsafe {
                self.image_available
                    .push(device.create_semaphore(&semaphore_info, None)?);
                self.ready.push(device.create_semaphore(&semaphore_info, None)?);
                self.in_flight.push(device.create_fence(&fence_info, None)?);
            }
        }
        self.images_in_flight = vec![vk::Fence::null(); count];
        Ok(())
    }

    /// Next slot, once the GPU has finished the work last submitted from it.
    pub fn next_slot(&mut self, device: &ash::Device) -> Result<FrameSlot, vk::Result> {
        let index = self.next;
        let (Some(&image_available), Some(&in_flight)) =
            (self.image_available.get(index), self.in_flight.get(index))
        else {
            return Ok(FrameSlot {
                index,
                image_available: vk::Semaphore::null(),
                in_flight: vk::Fence::null(),
            });
        };

        unsafe { device.wait_for_fences(&[in_flight], true, u64::MAX) }?;
        self.next = (self.next + 1) % self.image_available.len();

        Ok(FrameSlot {
            index,
            image_available,
            in_flight,
        })
    }

    /// Claim `image` for a submission from `slot`: waits for the previous
    /// submission on that image, then resets the slot fence for reuse.
    pub fn claim_image(
        &mut self,
        device: &ash::Device,
        image: u32,
        slot: &FrameSlot,
    ) -> Result<vk::Semaphore, vk::Result> {
        let image = image as usize;
        let Some(&ready) = self.ready.get(image) else {
            return Err(vk::Result::ERROR_UNKNOWN);
        };

        let previous = self.images_in_flight[image];
        if previous != vk::Fence::null() && previous != slot.in_flight {
            unsafe { device.wait_for_fences(&[previous], true, u64::MAX) }?;
        }
        self.images_in_flight[image] = slot.in_flight;

        unsafe { device.reset_fences(&[slot.in_flight]) }?;
        Ok(ready)
    }

    /// # Safety
    /// No pending GPU work may still use these objects.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for semaphore in self.image_available.drain(..).chain(self.ready.drain(..)) {
            device.destroy_semaphore(semaphore, None);
        }
        for fence in self.in_flight.drain(..) {
            device.destroy_fence(fence, None);
        }
        self.images_in_flight.clear();
        self.next = 0;
    }
}
