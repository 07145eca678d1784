//! Trim session state machine

use std::sync::Arc;

use ash::vk;

use super::destroy;
use super::hotkey::{HotkeyDetector, KeyboardConnector, KeyboardSource};
use super::synthesis::{self, SynthesisStats};
use super::trigger::{process_trigger_options, TriggerOptions};
use super::writer::TraceWriter;
use super::{
    GpuIdleWaiter, SyntheticHandles, TrimError, TrimResult, TrimState, TrimStats,
    WindowConnection,
};
use crate::objects::{ObjectHandle, ObjectRegistry};
use crate::tracker::{StateTracker, TrackerSnapshot};

/// Drives one trim session over a shared [`StateTracker`]
///
/// Call [`advance_frame`](Self::advance_frame) once per present. With a
/// frame-range trigger the window opens when the frame counter enters the
/// range and closes on the first frame after it; with a hot-key trigger,
/// [`poll_hotkey`](Self::poll_hotkey) toggles it. Given a
/// [`KeyboardConnector`], `advance_frame` also polls the keyboard of the
/// window the application created its first surface on. A controller
/// records at most one window.
pub struct TrimController<W: TraceWriter> {
    tracker: Arc<StateTracker>,
    options: TriggerOptions,
    writer: W,
    state: TrimState,
    frame: u64,
    hotkey: Option<HotkeyDetector>,
    idle_waiter: Box<dyn GpuIdleWaiter + Send + Sync>,
    snapshot: Option<TrackerSnapshot>,
    handles: SyntheticHandles,
    stats: TrimStats,
    keyboard_connector: Option<Box<dyn KeyboardConnector + Send + Sync>>,
    keyboard: Keyboard,
}

enum Keyboard {
    Unconnected,
    Connected(Box<dyn KeyboardSource + Send>),
    Unavailable,
}

impl<W: TraceWriter> TrimController<W> {
    /// Create a controller at frame 0
    ///
    /// Without a trigger the controller stays [`TrimState::Disabled`]. A
    /// frame range starting at 0 opens the window immediately.
    pub fn new(tracker: Arc<StateTracker>, options: TriggerOptions, writer: W) -> Self {
        let state = if options.trigger.is_some() {
            TrimState::PreTrim
        } else {
            TrimState::Disabled
        };
        log::info!("Trim controller created: {state:?}, trigger {:?}", options.trigger);

        let mut controller = Self {
            tracker,
            hotkey: options.hot_key().map(HotkeyDetector::new),
            options,
            writer,
            state,
            frame: 0,
            idle_waiter: Box::new(|_: vk::Device| -> Result<(), vk::Result> { Ok(()) }),
            snapshot: None,
            handles: SyntheticHandles::new(),
            stats: TrimStats::default(),
            keyboard_connector: None,
            keyboard: Keyboard::Unconnected,
        };
        controller.evaluate_logged();
        controller
    }

    /// Create a controller from the process-wide trigger configuration
    pub fn from_process_config(tracker: Arc<StateTracker>, writer: W) -> Self {
        Self::new(tracker, process_trigger_options().clone(), writer)
    }

    /// Use `waiter` to wait for devices before the destroy pass
    #[must_use]
    pub fn with_idle_waiter(mut self, waiter: impl GpuIdleWaiter + Send + Sync + 'static) -> Self {
        self.idle_waiter = Box::new(waiter);
        self
    }

    /// Open the hot-key keyboard through `connector` once a surface exists
    #[must_use]
    pub fn with_keyboard_connector(
        mut self,
        connector: impl KeyboardConnector + Send + Sync + 'static,
    ) -> Self {
        self.keyboard_connector = Some(Box::new(connector));
        self
    }

    /// Current state
    pub const fn state(&self) -> TrimState {
        self.state
    }

    /// Current frame number
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Trigger options in use
    pub const fn options(&self) -> &TriggerOptions {
        &self.options
    }

    /// Snapshot taken when the window opened
    pub const fn snapshot(&self) -> Option<&TrackerSnapshot> {
        self.snapshot.as_ref()
    }

    /// Session totals so far
    pub const fn stats(&self) -> &TrimStats {
        &self.stats
    }

    /// Window-system connection captured from the first surface
    pub fn window_connection(&self) -> Option<WindowConnection> {
        self.tracker.window_connection()
    }

    /// Output sink
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Output sink, mutably
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the controller and return its sink
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Move to the next frame, evaluate the frame trigger and poll the
    /// window's hot key
    ///
    /// Errors are logged, never returned: this runs on the application's
    /// present path.
    pub fn advance_frame(&mut self) {
        self.frame += 1;
        self.evaluate_logged();
        if let Err(e) = self.poll_window_hotkey() {
            log::error!("Trim failed at frame {}: {e}", self.frame);
        }
    }

    fn evaluate_logged(&mut self) {
        if let Err(e) = self.evaluate_frame_trigger() {
            log::error!("Trim failed at frame {}: {e}", self.frame);
        }
    }

    /// Open or close the window if the frame counter crossed a range bound
    ///
    /// # Errors
    /// Propagates writer failures from [`start`](Self::start) and
    /// [`stop`](Self::stop).
    pub fn evaluate_frame_trigger(&mut self) -> TrimResult<()> {
        let Some(range) = self.options.frame_range() else {
            return Ok(());
        };
        match self.state {
            TrimState::PreTrim if range.contains(self.frame) => {
                self.start()?;
            }
            TrimState::InTrim if !range.contains(self.frame) => {
                self.stop()?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether the hot key went down since the last poll
    ///
    /// Always false without a hot-key trigger.
    pub fn is_hotkey_trim_triggered(&mut self, source: &dyn KeyboardSource) -> bool {
        self.hotkey
            .as_mut()
            .is_some_and(|detector| detector.poll(source))
    }

    /// Poll the hot key and toggle the window on a press
    ///
    /// Returns whether the state changed.
    ///
    /// # Errors
    /// Propagates writer failures from [`start`](Self::start) and
    /// [`stop`](Self::stop).
    pub fn poll_hotkey(&mut self, source: &dyn KeyboardSource) -> TrimResult<bool> {
        let pressed = self.is_hotkey_trim_triggered(source);
        self.toggle_on_press(pressed)
    }

    /// Poll the hot key on the keyboard of the captured window connection
    ///
    /// The keyboard is opened on the first poll after the application
    /// created a surface. Without a connector, or when it finds no keyboard,
    /// the hot key stays unpolled for the rest of the session. Returns
    /// whether the state changed.
    ///
    /// # Errors
    /// Propagates writer failures from [`start`](Self::start) and
    /// [`stop`](Self::stop).
    pub fn poll_window_hotkey(&mut self) -> TrimResult<bool> {
        if self.hotkey.is_none() {
            return Ok(false);
        }
        if matches!(self.keyboard, Keyboard::Unconnected) {
            let Some(connection) = self.tracker.window_connection() else {
                return Ok(false);
            };
            let source = self
                .keyboard_connector
                .as_ref()
                .and_then(|connector| connector.connect(connection));
            self.keyboard = match source {
                Some(source) => {
                    log::info!("Polling the hot key on {connection:?}");
                    Keyboard::Connected(source)
                }
                None => {
                    log::warn!("No keyboard on {connection:?}; the hot key is ignored");
                    Keyboard::Unavailable
                }
            };
        }
        let pressed = match (&mut self.hotkey, &self.keyboard) {
            (Some(detector), Keyboard::Connected(source)) => detector.poll(&**source),
            _ => false,
        };
        self.toggle_on_press(pressed)
    }

    fn toggle_on_press(&mut self, pressed: bool) -> TrimResult<bool> {
        if !pressed {
            return Ok(false);
        }
        match self.state {
            TrimState::PreTrim => self.start(),
            TrimState::InTrim => self.stop(),
            _ => Ok(false),
        }
    }

    /// `PreTrim → InTrim`: snapshot the tracker and write creation calls
    ///
    /// Returns false when not in [`TrimState::PreTrim`].
    ///
    /// # Errors
    /// Fails when the writer rejects a call; the state is `InTrim` already.
    pub fn start(&mut self) -> TrimResult<bool> {
        if self.state != TrimState::PreTrim {
            return Ok(false);
        }
        log::info!("Trim window opens at frame {}", self.frame);
        self.snapshot_state_tracker();
        self.state = TrimState::InTrim;
        self.stats.start_frame = Some(self.frame);
        self.write_all_referenced_object_calls()?;
        Ok(true)
    }

    /// `InTrim → PostTrim → Finished`: wait for the GPU, then write destroy
    /// calls for every live object
    ///
    /// Returns false when not in [`TrimState::InTrim`].
    ///
    /// # Errors
    /// Fails when the writer rejects a call; the state stays `PostTrim`.
    pub fn stop(&mut self) -> TrimResult<bool> {
        if self.state != TrimState::InTrim {
            return Ok(false);
        }
        log::info!("Trim window closes at frame {}", self.frame);
        self.state = TrimState::PostTrim;
        self.stats.end_frame = Some(self.frame);

        let devices = self.tracker.objects().devices.handles();
        for device in devices {
            if let Err(e) = self.idle_waiter.wait_idle(device) {
                log::warn!("Waiting for device {device:?} failed: {e}");
            }
        }

        self.write_destroy_packets()?;
        self.writer.flush()?;
        self.state = TrimState::Finished;
        log::info!("Trim finished: {:?}", self.stats);
        Ok(true)
    }

    /// Freeze a deep copy of the tracker and clear its referenced flags
    pub fn snapshot_state_tracker(&mut self) -> &TrackerSnapshot {
        let snapshot = self.tracker.snapshot();
        self.tracker.objects().clear_referenced();
        log::info!("Tracker snapshot: {}", snapshot.summary());
        self.stats.snapshot_objects = snapshot.objects.len();
        self.snapshot.insert(snapshot)
    }

    /// Write creation calls for everything in the snapshot
    ///
    /// # Errors
    /// [`TrimError::NoSnapshot`] before
    /// [`snapshot_state_tracker`](Self::snapshot_state_tracker); otherwise
    /// writer failures.
    pub fn write_all_referenced_object_calls(&mut self) -> TrimResult<SynthesisStats> {
        let snapshot = self.snapshot.as_ref().ok_or(TrimError::NoSnapshot)?;
        let stats = synthesis::synthesize(
            snapshot,
            &mut self.writer,
            &mut self.handles,
            self.options.max_batched_commands,
        )?;
        self.stats.synthesis = stats;
        Ok(stats)
    }

    /// Write destroy calls for every object the tracker still holds
    ///
    /// Works on a copy of the registry; application threads keep tracking
    /// while the writer runs.
    ///
    /// # Errors
    /// Writer failures.
    pub fn write_destroy_packets(&mut self) -> TrimResult<usize> {
        let objects = ObjectRegistry::clone(&self.tracker.objects());
        let count = destroy::write_destroy_packets(&objects, &mut self.writer)?;
        self.stats.destroy_calls = count;
        Ok(count)
    }

    /// Record that `handle` was used while recording
    ///
    /// Outside the window this does nothing.
    pub fn note_object_use(&self, handle: impl Into<ObjectHandle>) {
        if self.state.is_recording() {
            self.tracker.mark_referenced(handle.into());
        }
    }
}

impl<W: TraceWriter + std::fmt::Debug> std::fmt::Debug for TrimController<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrimController")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
