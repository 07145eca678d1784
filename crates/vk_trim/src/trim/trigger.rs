//! Trim triggers
//!
//! A trigger is either a frame range or a hot key. Controllers take explicit
//! [`TriggerOptions`]; capture layers that configure themselves from the
//! process environment use the free functions below, which resolve the
//! options once and keep them for the life of the process.

use std::sync::OnceLock;

use super::hotkey::HotKey;
use crate::config::TrimConfig;

/// Kind of trim trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Frame range
    Frames,
    /// Hot key toggle
    HotKey,
}

/// Recording window in frames: `[start, start + count * interval)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// First recorded frame
    pub start: u64,
    /// Number of counted frames
    pub count: u64,
    /// Frames per counted frame
    pub interval: u64,
}

impl FrameRange {
    /// First frame after the window
    pub const fn end(&self) -> u64 {
        self.start
            .saturating_add(self.count.saturating_mul(self.interval))
    }

    /// Whether `frame` lies inside the window
    pub const fn contains(&self, frame: u64) -> bool {
        frame >= self.start && frame < self.end()
    }
}

/// A configured trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Record a fixed frame range
    Frames(FrameRange),
    /// Toggle recording with a key
    HotKey(HotKey),
}

impl Trigger {
    /// Kind of this trigger
    pub const fn kind(&self) -> TriggerKind {
        match self {
            Self::Frames(_) => TriggerKind::Frames,
            Self::HotKey(_) => TriggerKind::HotKey,
        }
    }
}

/// Resolved trigger parameters for a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOptions {
    /// Active trigger; `None` disables trimming
    pub trigger: Option<Trigger>,
    /// Maximum barriers recorded into one synthesized command buffer
    pub max_batched_commands: u32,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            trigger: None,
            max_batched_commands: 1024,
        }
    }
}

impl TriggerOptions {
    /// Options for a frame-range trigger
    pub fn frames(start: u64, count: u64) -> Self {
        Self {
            trigger: Some(Trigger::Frames(FrameRange {
                start,
                count,
                interval: 1,
            })),
            ..Self::default()
        }
    }

    /// Options for a hot-key trigger
    pub fn hotkey(key: HotKey) -> Self {
        Self {
            trigger: Some(Trigger::HotKey(key)),
            ..Self::default()
        }
    }

    /// Whether the trigger of `kind` is the one configured
    pub fn is_trim_trigger_enabled(&self, kind: TriggerKind) -> bool {
        self.trigger.is_some_and(|trigger| trigger.kind() == kind)
    }

    /// Configured frame range, if any
    pub fn frame_range(&self) -> Option<FrameRange> {
        match self.trigger {
            Some(Trigger::Frames(range)) => Some(range),
            _ => None,
        }
    }

    /// Configured hot key, if any
    pub fn hot_key(&self) -> Option<HotKey> {
        match self.trigger {
            Some(Trigger::HotKey(key)) => Some(key),
            _ => None,
        }
    }

    /// The trigger of `kind` in its textual form, as accepted by
    /// [`TrimConfig::parse_trigger`]
    pub fn trigger_option_string(&self, kind: TriggerKind) -> Option<String> {
        match (self.trigger?, kind) {
            (Trigger::Frames(range), TriggerKind::Frames) if range.interval == 1 => {
                Some(format!("frames-{}-{}", range.start, range.count))
            }
            (Trigger::Frames(range), TriggerKind::Frames) => Some(format!(
                "frames-{}-{}-{}",
                range.start, range.count, range.interval
            )),
            (Trigger::HotKey(key), TriggerKind::HotKey) => Some(format!("hotkey-{key}")),
            _ => None,
        }
    }
}

static PROCESS_OPTIONS: OnceLock<TriggerOptions> = OnceLock::new();

/// Trigger options of this process, read from the environment on first use
///
/// An invalid environment disables trimming; the error is logged once.
pub fn process_trigger_options() -> &'static TriggerOptions {
    PROCESS_OPTIONS.get_or_init(|| {
        let resolved = TrimConfig::from_env().and_then(|config| config.trigger_options());
        match resolved {
            Ok(options) => {
                log::info!("Trim trigger: {:?}", options.trigger);
                options
            }
            Err(e) => {
                log::warn!("Trim configuration ignored: {e}");
                TriggerOptions::default()
            }
        }
    })
}

/// Whether this process is configured with a trigger of `kind`
pub fn is_trim_trigger_enabled(kind: TriggerKind) -> bool {
    process_trigger_options().is_trim_trigger_enabled(kind)
}

/// This process's trigger of `kind` in textual form
pub fn trace_trigger_option_string(kind: TriggerKind) -> Option<String> {
    process_trigger_options().trigger_option_string(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range_bounds() {
        let range = FrameRange {
            start: 3,
            count: 3,
            interval: 1,
        };
        assert_eq!(range.end(), 6);
        assert!(!range.contains(2));
        assert!(range.contains(3));
        assert!(range.contains(5));
        assert!(!range.contains(6));
    }

    #[test]
    fn test_frame_range_with_interval() {
        let range = FrameRange {
            start: 10,
            count: 2,
            interval: 5,
        };
        assert_eq!(range.end(), 20);
        assert!(range.contains(19));
    }

    #[test]
    fn test_option_strings() {
        let frames = TriggerOptions::frames(7, 2);
        assert_eq!(frames.trigger_option_string(TriggerKind::Frames).as_deref(), Some("frames-7-2"));
        assert_eq!(frames.trigger_option_string(TriggerKind::HotKey), None);

        let mut stretched = frames;
        stretched.trigger = Some(Trigger::Frames(FrameRange {
            start: 7,
            count: 2,
            interval: 3,
        }));
        assert_eq!(
            stretched.trigger_option_string(TriggerKind::Frames).as_deref(),
            Some("frames-7-2-3")
        );

        let hotkey = TriggerOptions::hotkey(HotKey::F10);
        assert!(hotkey.is_trim_trigger_enabled(TriggerKind::HotKey));
        assert_eq!(hotkey.hot_key(), Some(HotKey::F10));
        assert_eq!(hotkey.frame_range(), None);
    }

    #[test]
    fn test_option_string_parses_back() {
        let options = TriggerOptions::frames(4, 6);
        let text = options.trigger_option_string(TriggerKind::Frames).unwrap();

        let mut config = TrimConfig::default();
        config.parse_trigger(&text).unwrap();
        assert_eq!(config.trigger_options().unwrap(), options);
    }

    #[test]
    fn test_disabled_options() {
        let options = TriggerOptions::default();
        assert!(!options.is_trim_trigger_enabled(TriggerKind::Frames));
        assert!(!options.is_trim_trigger_enabled(TriggerKind::HotKey));
    }
}
