//! Snapshots taken while other threads create and destroy objects see each
//! tracking call either completely or not at all

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ash::vk::{self, Handle};
use vk_trim::{StateTracker, TracePacket, TrackerSettings, TrackerSnapshot};

const WORKERS: u64 = 4;
const ROUNDS: u64 = 300;
const BUFFERS_PER_POOL: usize = 3;

fn device() -> vk::Device {
    vk::Device::from_raw(0x10)
}

// Allocates a pool's command buffers in one call, records into each, then
// frees them all by destroying the pool.
fn churn(tracker: &StateTracker, worker: u64) {
    let base = (worker + 1) << 24;
    for round in 0..ROUNDS {
        let pool = vk::CommandPool::from_raw(base + round * 8);
        let command_buffers: Vec<vk::CommandBuffer> = (1..=BUFFERS_PER_POOL as u64)
            .map(|i| vk::CommandBuffer::from_raw(base + round * 8 + i))
            .collect();

        tracker.track_create_command_pool(device(), pool, vk::CommandPoolCreateFlags::empty(), 0);
        tracker.track_allocate_command_buffers(
            device(),
            pool,
            vk::CommandBufferLevel::PRIMARY,
            &command_buffers,
        );
        for command_buffer in &command_buffers {
            tracker.add_command_buffer_call(*command_buffer, TracePacket::new(7, vec![0u8; 16]));
        }
        tracker.track_destroy_command_pool(pool);
    }
}

fn assert_consistent(snapshot: &TrackerSnapshot) {
    let objects = &snapshot.objects;
    let mut per_pool: HashMap<vk::CommandPool, usize> = HashMap::new();
    for (command_buffer, entry) in objects.command_buffers.iter() {
        assert!(
            objects.command_pools.contains(entry.info.pool),
            "{command_buffer:?} outlived its pool in the snapshot"
        );
        *per_pool.entry(entry.info.pool).or_default() += 1;
    }
    for (pool, count) in per_pool {
        assert_eq!(count, BUFFERS_PER_POOL, "{pool:?} has a partial allocation");
    }
    for command_buffer in snapshot.command_calls.keys() {
        assert!(
            objects.command_buffers.contains(*command_buffer),
            "recorded calls of freed {command_buffer:?}"
        );
    }
}

#[test]
fn snapshots_never_see_half_applied_calls() {
    let tracker = StateTracker::new(TrackerSettings::default());
    tracker.track_create_device(vk::PhysicalDevice::from_raw(2), device(), TracePacket::new(1, vec![1u8]));
    let finished = AtomicUsize::new(0);

    let snapshots = std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let tracker = &tracker;
            let finished = &finished;
            scope.spawn(move || {
                churn(tracker, worker);
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut taken = 0usize;
        while taken < 20 || finished.load(Ordering::SeqCst) < WORKERS as usize {
            assert_consistent(&tracker.snapshot());
            taken += 1;
        }
        taken
    });

    assert!(snapshots >= 20);
    let objects = tracker.objects();
    assert!(objects.command_pools.is_empty());
    assert!(objects.command_buffers.is_empty());
    assert!(objects.devices.contains(device()));
}

#[test]
fn snapshot_is_independent_of_later_destroys() {
    let tracker = StateTracker::new(TrackerSettings::default());
    tracker.track_create_device(vk::PhysicalDevice::from_raw(2), device(), TracePacket::new(1, vec![1u8]));
    let pool = vk::CommandPool::from_raw(0x20);
    let command_buffer = vk::CommandBuffer::from_raw(0x21);
    tracker.track_create_command_pool(device(), pool, vk::CommandPoolCreateFlags::empty(), 0);
    tracker.track_allocate_command_buffers(device(), pool, vk::CommandBufferLevel::PRIMARY, &[command_buffer]);
    tracker.add_command_buffer_call(command_buffer, TracePacket::new(7, vec![7u8]));

    let snapshot = tracker.snapshot();
    std::thread::scope(|scope| {
        scope.spawn(|| tracker.track_destroy_command_pool(pool));
    });

    assert!(tracker.objects().command_buffers.is_empty());
    assert!(snapshot.objects.command_buffers.contains(command_buffer));
    assert_eq!(snapshot.command_buffer_calls(command_buffer).len(), 1);
}
