//! Trim demo
//!
//! Scripts a small rendering session against the state tracker, the way an
//! interception layer would feed it, and prints the trimmed call stream.
//!
//! ```text
//! trim_demo [config.toml|config.ron]
//! ```
//!
//! Without a configured trigger the demo records frames 3 to 5. With a
//! hot-key trigger a scripted keyboard presses the key on frames 3 and 6.

use std::ffi::CString;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk::{self, Handle};
use thiserror::Error;
use vk_trim::foundation::logging;
use vk_trim::objects::desc::{
    BufferDesc, ComputePipelineDesc, ImageDesc, PipelineDesc, ShaderModuleDesc, ShaderStageDesc,
};
use vk_trim::prelude::*;

const FRAMES: u64 = 8;
const HOTKEY_FRAMES: [u64; 2] = [3, 6];

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Trim(#[from] TrimError),
}

/// Handles of the scripted application
struct Session {
    device: vk::Device,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
    texture: vk::Image,
    pipeline: vk::Pipeline,
    frame_done: vk::Semaphore,
    next_handle: u64,
}

impl Session {
    fn handle<H: Handle>(&mut self) -> H {
        self.next_handle += 1;
        H::from_raw(self.next_handle)
    }

    /// Instance to pipeline: everything a frame needs
    fn create(tracker: &StateTracker) -> Self {
        let mut session = Self {
            device: vk::Device::null(),
            queue: vk::Queue::null(),
            command_buffer: vk::CommandBuffer::null(),
            texture: vk::Image::null(),
            pipeline: vk::Pipeline::null(),
            frame_done: vk::Semaphore::null(),
            next_handle: 0x1000,
        };

        let instance: vk::Instance = session.handle();
        let physical_device: vk::PhysicalDevice = session.handle();
        session.device = session.handle();
        session.queue = session.handle();
        tracker.track_create_instance(instance, TracePacket::new(1, vec![0u8; 16]));
        tracker.track_enumerate_physical_devices(
            instance,
            &[physical_device],
            TracePacket::new(2, vec![0u8; 8]),
        );
        let surface: vk::SurfaceKHR = session.handle();
        tracker.track_create_surface(
            instance,
            surface,
            WindowConnection::Headless,
            TracePacket::new(5, vec![0u8; 24]),
        );
        tracker.track_create_device(physical_device, session.device, TracePacket::new(3, vec![0u8; 32]));
        tracker.track_get_device_queue(session.device, 0, 0, session.queue);

        let pool: vk::CommandPool = session.handle();
        session.command_buffer = session.handle();
        tracker.track_create_command_pool(
            session.device,
            pool,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            0,
        );
        tracker.track_allocate_command_buffers(
            session.device,
            pool,
            vk::CommandBufferLevel::PRIMARY,
            &[session.command_buffer],
        );

        let memory: vk::DeviceMemory = session.handle();
        tracker.track_allocate_memory(session.device, memory, 1 << 20, 0);
        tracker.track_map_memory(memory, 0, vk::WHOLE_SIZE, TracePacket::new(4, vec![0u8; 8]));

        let vertices: vk::Buffer = session.handle();
        tracker.track_create_buffer(
            session.device,
            vertices,
            BufferDesc {
                size: 4096,
                usage: vk::BufferUsageFlags::VERTEX_BUFFER,
                ..BufferDesc::default()
            },
        );
        tracker.track_bind_buffer_memory(vertices, memory, 0);

        session.texture = session.handle();
        tracker.track_create_image(
            session.device,
            session.texture,
            ImageDesc {
                image_type: vk::ImageType::TYPE_2D,
                format: vk::Format::R8G8B8A8_UNORM,
                extent: vk::Extent3D {
                    width: 256,
                    height: 256,
                    depth: 1,
                },
                mip_levels: 1,
                array_layers: 1,
                usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
                ..ImageDesc::default()
            },
        );
        tracker.track_bind_image_memory(session.texture, memory, 65536);

        let module: vk::ShaderModule = session.handle();
        tracker.track_create_shader_module(
            session.device,
            module,
            ShaderModuleDesc::from_words(vec![0x0723_0203u32, 0x0001_0000, 0, 1, 0]),
        );
        session.pipeline = session.handle();
        tracker.track_create_pipeline(
            session.device,
            vk::PipelineCache::null(),
            session.pipeline,
            PipelineDesc::Compute(ComputePipelineDesc {
                stage: ShaderStageDesc {
                    stage: vk::ShaderStageFlags::COMPUTE,
                    module,
                    entry_point: CString::new("main").unwrap_or_default(),
                    ..ShaderStageDesc::default()
                },
                ..ComputePipelineDesc::default()
            }),
        );
        // Modules are commonly dropped right after pipeline creation
        tracker.track_destroy(module.into());

        session.frame_done = session.handle();
        tracker.track_create_semaphore(session.device, session.frame_done);
        session
    }

    /// Record and submit one frame
    fn frame<W: TraceWriter>(&mut self, tracker: &StateTracker, controller: &TrimController<W>, frame: u64) {
        let command_buffer = self.command_buffer;
        tracker.track_begin_command_buffer(command_buffer);
        tracker.add_command_buffer_call(command_buffer, TracePacket::new(100, vec![0u8; 4]));

        if frame == 1 {
            let barrier = vk::ImageMemoryBarrier::builder()
                .image(self.texture)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .dst_access_mask(vk::AccessFlags::SHADER_READ)
                .build();
            tracker.track_pipeline_barrier(command_buffer, &[barrier], &[]);
            tracker.add_command_buffer_call(command_buffer, TracePacket::new(101, vec![0u8; 72]));
        }

        tracker.add_command_buffer_call(command_buffer, TracePacket::new(102, frame.to_le_bytes().to_vec()));
        controller.note_object_use(self.pipeline);
        controller.note_object_use(self.texture);

        // Staging buffer; odd frames leave theirs alive
        let staging: vk::Buffer = self.handle();
        tracker.track_create_buffer(
            self.device,
            staging,
            BufferDesc {
                size: 256,
                usage: vk::BufferUsageFlags::TRANSFER_SRC,
                ..BufferDesc::default()
            },
        );
        if frame % 2 == 0 {
            tracker.track_destroy(staging.into());
        }

        tracker.track_queue_submit(
            self.queue,
            &[command_buffer],
            &[],
            &[self.frame_done],
            vk::Fence::null(),
        );
    }
}

/// Keyboard that holds every key down on [`HOTKEY_FRAMES`]
fn scripted_keyboard(frame: Arc<AtomicU64>) -> impl KeyboardConnector + Send + Sync {
    move |connection: WindowConnection| -> Option<Box<dyn KeyboardSource + Send>> {
        log::info!("Scripted keyboard attached to {connection:?}");
        let frame = Arc::clone(&frame);
        Some(Box::new(move |_: HotKey| {
            HOTKEY_FRAMES.contains(&frame.load(Ordering::Relaxed))
        }))
    }
}

fn load_config() -> Result<TrimConfig, ConfigError> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => TrimConfig::load_from_file(path)?,
        None => TrimConfig::default(),
    };
    config.apply_env_overrides()?;
    if !config.enabled {
        config = TrimConfig {
            log_level: config.log_level,
            ordered_images: config.ordered_images,
            max_batched_commands: config.max_batched_commands,
            ..TrimConfig::with_frames(3, 5)
        };
    }
    Ok(config)
}

fn main() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);

    let tracker = Arc::new(StateTracker::new(TrackerSettings::from(&config)));
    let current_frame = Arc::new(AtomicU64::new(0));
    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options()?,
        TextTraceWriter::new(io::stdout()),
    )
    .with_keyboard_connector(scripted_keyboard(Arc::clone(&current_frame)));

    let mut session = Session::create(&tracker);
    for frame in 1..=FRAMES {
        session.frame(&tracker, &controller, frame);
        current_frame.store(frame, Ordering::Relaxed);
        controller.advance_frame();
    }

    if controller.state() == TrimState::InTrim {
        controller.stop()?;
    }

    let stats = controller.stats();
    log::info!(
        "Frames {:?}..{:?}: {} snapshot objects, {} calls, {} packets, {} destroys",
        stats.start_frame,
        stats.end_frame,
        stats.snapshot_objects,
        stats.synthesis.calls,
        stats.synthesis.packets,
        stats.destroy_calls
    );
    Ok(())
}
