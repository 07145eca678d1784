//! End-to-end trim sessions driven the way a capture layer drives them

use std::cell::Cell;
use std::sync::Arc;

use ash::vk::{self, Handle};
use vk_trim::objects::desc::{BufferDesc, ImageDesc};
use vk_trim::prelude::*;

fn device() -> vk::Device {
    vk::Device::from_raw(0x10)
}

fn tracker(settings: TrackerSettings) -> Arc<StateTracker> {
    let tracker = StateTracker::new(settings);
    tracker.track_create_instance(vk::Instance::from_raw(1), TracePacket::new(1, vec![1u8]));
    tracker.track_create_device(vk::PhysicalDevice::from_raw(2), device(), TracePacket::new(2, vec![2u8]));
    tracker.track_get_device_queue(device(), 0, 0, vk::Queue::from_raw(0x11));
    Arc::new(tracker)
}

fn destroys(calls: &[ReplayCall]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, ReplayCall::Destroy { .. } | ReplayCall::DestroyInstance { .. }))
        .count()
}

#[test]
fn frame_range_three_to_five() {
    let config = TrimConfig::with_frames(3, 5);
    let tracker = tracker(TrackerSettings::from(&config));
    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        MemoryTraceWriter::new(),
    );

    let mut states = vec![controller.state()];
    let mut written = vec![controller.writer().len()];
    for _ in 0..10 {
        controller.advance_frame();
        states.push(controller.state());
        written.push(controller.writer().len());
    }

    use TrimState::{Finished, InTrim, PreTrim};
    assert_eq!(
        states,
        vec![PreTrim, PreTrim, PreTrim, InTrim, InTrim, InTrim, Finished, Finished, Finished, Finished, Finished]
    );
    assert_eq!(controller.stats().start_frame, Some(3));
    assert_eq!(controller.stats().end_frame, Some(6));

    // Snapshot on frame 3, destroy pass on frame 6, silence afterwards
    assert_eq!(written[2], 0);
    assert!(written[3] > 0);
    assert_eq!(written[3], written[5]);
    assert!(written[6] > written[5]);
    assert!(written[6..].iter().all(|len| *len == written[6]));

    let calls = controller.into_writer().into_calls();
    assert!(destroys(&calls) > 0);
    assert!(matches!(calls.last(), Some(ReplayCall::DestroyInstance { .. })));
}

#[test]
fn disabled_config_never_snapshots() {
    let config = TrimConfig::default();
    let tracker = tracker(TrackerSettings::from(&config));
    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        MemoryTraceWriter::new(),
    );

    for _ in 0..20 {
        controller.advance_frame();
    }
    assert_eq!(controller.state(), TrimState::Disabled);
    assert!(controller.snapshot().is_none());
    assert!(!controller.start().unwrap());
    assert!(controller.writer().is_empty());
}

#[test]
fn hotkey_window() {
    let config = TrimConfig::with_hotkey("F10");
    let tracker = tracker(TrackerSettings::from(&config));
    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        MemoryTraceWriter::new(),
    );
    let held = Cell::new(false);
    let keyboard = |key: HotKey| key == HotKey::F10 && held.get();

    let press = |controller: &mut TrimController<MemoryTraceWriter>| {
        held.set(true);
        controller.advance_frame();
        controller.poll_hotkey(&keyboard).unwrap();
        held.set(false);
        controller.advance_frame();
        controller.poll_hotkey(&keyboard).unwrap();
    };

    controller.advance_frame();
    assert_eq!(controller.state(), TrimState::PreTrim);

    press(&mut controller);
    assert_eq!(controller.state(), TrimState::InTrim);
    tracker.track_create_buffer(device(), vk::Buffer::from_raw(0x50), BufferDesc::default());

    press(&mut controller);
    assert_eq!(controller.state(), TrimState::Finished);

    let after = controller.writer().len();
    press(&mut controller);
    assert_eq!(controller.writer().len(), after);
    assert!(controller.writer().calls().iter().any(|call| matches!(
        call,
        ReplayCall::Destroy { object: ObjectHandle::Buffer(buffer), .. } if buffer.as_raw() == 0x50
    )));
}

#[test]
fn ordered_images_replay_in_application_order() {
    let config = TrimConfig::with_frames(1, 1).with_ordered_images(true);
    let tracker = tracker(TrackerSettings::from(&config));
    let image = |raw| vk::Image::from_raw(raw);

    tracker.track_create_image(device(), image(0x21), ImageDesc::default());
    tracker.track_create_image(device(), image(0x22), ImageDesc::default());
    tracker.track_destroy_image(image(0x21));
    tracker.track_create_image(device(), image(0x23), ImageDesc::default());

    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        MemoryTraceWriter::new(),
    );
    controller.advance_frame();
    assert_eq!(controller.state(), TrimState::InTrim);

    let sequence: Vec<(&str, u64)> = controller
        .writer()
        .calls()
        .iter()
        .filter_map(|call| match call {
            ReplayCall::CreateImage { image, .. } => Some(("create", image.as_raw())),
            ReplayCall::DestroyImage { image, .. } => Some(("destroy", image.as_raw())),
            _ => None,
        })
        .collect();
    assert_eq!(
        sequence,
        vec![("create", 0x21), ("create", 0x22), ("destroy", 0x21), ("create", 0x23)]
    );
}

#[test]
fn unordered_images_follow_creation_order_of_live_images() {
    let config = TrimConfig::with_frames(1, 1);
    let tracker = tracker(TrackerSettings::from(&config));
    for raw in [0x31, 0x32, 0x33] {
        tracker.track_create_image(device(), vk::Image::from_raw(raw), ImageDesc::default());
    }
    tracker.track_destroy_image(vk::Image::from_raw(0x31));

    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        MemoryTraceWriter::new(),
    );
    controller.advance_frame();

    let created: Vec<u64> = controller
        .writer()
        .calls()
        .iter()
        .filter_map(|call| match call {
            ReplayCall::CreateImage { image, .. } => Some(image.as_raw()),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec![0x32, 0x33]);
}

#[test]
fn text_writer_session() {
    let config = TrimConfig::with_frames(0, 0);
    let tracker = tracker(TrackerSettings::from(&config));
    let mut controller = TrimController::new(
        Arc::clone(&tracker),
        config.trigger_options().unwrap(),
        TextTraceWriter::new(Vec::new()),
    );
    assert_eq!(controller.state(), TrimState::InTrim);
    controller.advance_frame();
    assert_eq!(controller.state(), TrimState::Finished);

    let text = String::from_utf8(controller.into_writer().into_inner()).unwrap();
    assert!(text.lines().next().unwrap().contains("packet id=1"));
    assert!(text.contains("vkGetDeviceQueue"));
    assert!(text.lines().last().unwrap().contains("vkDestroyInstance"));
}
