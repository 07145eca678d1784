//! # Trim Configuration
//!
//! Settings that select *when* trimming happens and how synthesis batches its
//! work. They come from a TOML/RON file, from the environment of the traced
//! process, or both (environment wins).
//!
//! ## Environment
//!
//! - `VKTRIM_TRIGGER`: `frames-<start>-<count>[-<interval>]` or `hotkey-<key>`
//! - `VKTRIM_MAX_COMMAND_BATCHED_SIZE`: barriers per synthesized command buffer
//! - `VKTRIM_ORDERED_IMAGES`: `1`/`true` replays image creation in original order

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::trim::{FrameRange, HotKey, Trigger, TriggerOptions};

/// Environment variable holding the trigger string
pub const ENV_TRIGGER: &str = "VKTRIM_TRIGGER";
/// Environment variable holding the synthesis batch size
pub const ENV_MAX_COMMAND_BATCHED_SIZE: &str = "VKTRIM_MAX_COMMAND_BATCHED_SIZE";
/// Environment variable enabling ordered image creation
pub const ENV_ORDERED_IMAGES: &str = "VKTRIM_ORDERED_IMAGES";

const FRAMES_PREFIX: &str = "frames-";
const HOTKEY_PREFIX: &str = "hotkey-";

/// # Trim Configuration
///
/// Either a frame range (`start_frame..=end_frame`) or a hot key selects the
/// recording window. With `enabled == false` the controller stays disabled
/// and never snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Master switch for trimming
    pub enabled: bool,
    /// First recorded frame
    pub start_frame: Option<u64>,
    /// Last counted frame (inclusive)
    ///
    /// `end_frame - start_frame + 1` frames are counted, each spanning
    /// `frame_interval` application frames, so the window closes on frame
    /// `start_frame + count * frame_interval`. With an interval of 1 this is
    /// the last recorded frame.
    pub end_frame: Option<u64>,
    /// Frames advanced per counted frame of the window
    pub frame_interval: u64,
    /// Hot key that toggles recording, e.g. `"F12"`
    pub hotkey: Option<String>,
    /// Maximum barriers recorded into one synthesized command buffer
    pub max_batched_commands: u32,
    /// Replay image creation/destruction in original temporal order
    pub ordered_images: bool,
    /// Default log level for tools that initialize logging from this config
    pub log_level: String,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_frame: None,
            end_frame: None,
            frame_interval: 1,
            hotkey: None,
            max_batched_commands: 1024,
            ordered_images: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config for TrimConfig {}

impl TrimConfig {
    /// Configuration with a frame-range trigger covering `start..=end`
    pub fn with_frames(start: u64, end: u64) -> Self {
        Self {
            enabled: true,
            start_frame: Some(start),
            end_frame: Some(end),
            ..Self::default()
        }
    }

    /// Configuration with a hot-key trigger
    pub fn with_hotkey(key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            hotkey: Some(key.into()),
            ..Self::default()
        }
    }

    /// Set ordered image mode
    pub fn with_ordered_images(mut self, ordered: bool) -> Self {
        self.ordered_images = ordered;
        self
    }

    /// Set the synthesis batch size
    pub fn with_max_batched_commands(mut self, count: u32) -> Self {
        self.max_batched_commands = count;
        self
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Overlay settings found in the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(trigger) = lookup(ENV_TRIGGER) {
            self.parse_trigger(&trigger)?;
        }

        if let Some(size) = lookup(ENV_MAX_COMMAND_BATCHED_SIZE) {
            self.max_batched_commands =
                size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_MAX_COMMAND_BATCHED_SIZE,
                    reason: format!("'{size}' is not an unsigned integer"),
                })?;
        }

        if let Some(ordered) = lookup(ENV_ORDERED_IMAGES) {
            self.ordered_images = parse_flag(ENV_ORDERED_IMAGES, &ordered)?;
        }

        Ok(())
    }

    /// Apply a trigger string of the form `frames-<start>-<count>[-<interval>]`
    /// or `hotkey-<key>`
    pub fn parse_trigger(&mut self, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidTrigger {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = value.strip_prefix(FRAMES_PREFIX) {
            let numbers = rest
                .split('-')
                .map(str::parse::<u64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid("frame bounds must be unsigned integers"))?;

            let (start, count, interval) = match numbers.as_slice() {
                [start, count] => (*start, *count, 1),
                [start, count, interval] => (*start, *count, *interval),
                _ => return Err(invalid("expected frames-<start>-<count>[-<interval>]")),
            };
            if count == 0 {
                return Err(invalid("frame count must be at least 1"));
            }
            if interval == 0 {
                return Err(invalid("frame interval must be at least 1"));
            }

            let end = start
                .checked_add(count - 1)
                .ok_or_else(|| invalid("frame range runs past the last representable frame"))?;

            self.enabled = true;
            self.start_frame = Some(start);
            self.end_frame = Some(end);
            self.frame_interval = interval;
            self.hotkey = None;
            Ok(())
        } else if let Some(key) = value.strip_prefix(HOTKEY_PREFIX) {
            key.parse::<HotKey>()
                .map_err(|_| invalid("unknown hot key name"))?;

            self.enabled = true;
            self.hotkey = Some(key.to_string());
            self.start_frame = None;
            self.end_frame = None;
            Ok(())
        } else {
            Err(invalid("expected a 'frames-' or 'hotkey-' prefix"))
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batched_commands == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_batched_commands",
                reason: "must be at least 1".to_string(),
            });
        }

        if !self.enabled {
            return Ok(());
        }

        if self.frame_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "frame_interval",
                reason: "must be at least 1".to_string(),
            });
        }

        match (self.start_frame, self.end_frame, &self.hotkey) {
            (Some(_), _, Some(_)) => Err(ConfigError::InvalidValue {
                key: "hotkey",
                reason: "a frame range and a hot key cannot both be configured".to_string(),
            }),
            (Some(start), Some(end), None) if end < start => Err(ConfigError::InvalidValue {
                key: "end_frame",
                reason: format!("end frame {end} precedes start frame {start}"),
            }),
            (Some(_), None, None) => Err(ConfigError::InvalidValue {
                key: "end_frame",
                reason: "a start frame needs an end frame".to_string(),
            }),
            (None, _, Some(key)) => key.parse::<HotKey>().map(|_| ()).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "hotkey",
                    reason: format!("unknown hot key '{key}'"),
                }
            }),
            (None, _, None) => Err(ConfigError::InvalidValue {
                key: "enabled",
                reason: "trimming is enabled but no trigger is configured".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Resolve the trigger parameters the controller consumes
    pub fn trigger_options(&self) -> Result<TriggerOptions, ConfigError> {
        self.validate()?;

        let trigger = if !self.enabled {
            None
        } else if let Some(key) = &self.hotkey {
            let key = key.parse::<HotKey>().map_err(|_| ConfigError::InvalidValue {
                key: "hotkey",
                reason: format!("unknown hot key '{key}'"),
            })?;
            Some(Trigger::HotKey(key))
        } else {
            match (self.start_frame, self.end_frame) {
                (Some(start), Some(end)) => {
                    let count = end
                        .checked_sub(start)
                        .and_then(|span| span.checked_add(1))
                        .ok_or_else(|| ConfigError::InvalidValue {
                            key: "end_frame",
                            reason: format!("frames {start} to {end} do not form a countable range"),
                        })?;
                    Some(Trigger::Frames(FrameRange {
                        start,
                        count,
                        interval: self.frame_interval,
                    }))
                }
                _ => None,
            }
        };

        Ok(TriggerOptions {
            trigger,
            max_batched_commands: self.max_batched_commands,
        })
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}
