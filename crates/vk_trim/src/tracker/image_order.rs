//! Global ordered record of image creation and destruction

use ash::vk;

use crate::objects::desc::ImageDesc;

/// One image lifetime event, in the order the application issued it
#[derive(Debug, Clone)]
pub enum ImageCall {
    /// `vkCreateImage`
    Create {
        /// Owning device
        device: vk::Device,
        /// Created image
        image: vk::Image,
        /// Creation info
        desc: ImageDesc,
    },
    /// `vkDestroyImage`
    Destroy {
        /// Owning device
        device: vk::Device,
        /// Destroyed image
        image: vk::Image,
    },
}

impl ImageCall {
    /// Device the call was issued on
    pub const fn device(&self) -> vk::Device {
        match self {
            Self::Create { device, .. } | Self::Destroy { device, .. } => *device,
        }
    }

    /// Image the call concerns
    pub const fn image(&self) -> vk::Image {
        match self {
            Self::Create { image, .. } | Self::Destroy { image, .. } => *image,
        }
    }
}

/// Ordered image call list, only filled when ordered image mode is on
#[derive(Debug, Default)]
pub(crate) struct ImageOrder {
    calls: Vec<ImageCall>,
}

impl ImageOrder {
    pub fn push(&mut self, call: ImageCall) {
        self.calls.push(call);
    }

    /// Forget every call issued on `device`
    pub fn remove_device(&mut self, device: vk::Device) {
        self.calls.retain(|call| call.device() != device);
    }

    pub fn calls(&self) -> &[ImageCall] {
        &self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_device_removal_keeps_other_devices() {
        let mut order = ImageOrder::default();
        let first = vk::Device::from_raw(1);
        let second = vk::Device::from_raw(2);
        order.push(ImageCall::Create {
            device: first,
            image: vk::Image::from_raw(10),
            desc: ImageDesc::default(),
        });
        order.push(ImageCall::Create {
            device: second,
            image: vk::Image::from_raw(20),
            desc: ImageDesc::default(),
        });
        order.push(ImageCall::Destroy {
            device: first,
            image: vk::Image::from_raw(10),
        });

        order.remove_device(first);
        assert_eq!(order.calls().len(), 1);
        assert_eq!(order.calls()[0].image().as_raw(), 20);
    }
}
