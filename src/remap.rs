//! Controller input to scene property remapping.

use crate::error::ConfigurationError;
use crate::property::{self, PropertyPath};
use crate::scene::{Keyframe, Scene};
use crate::types::ControllerState;
use serde::{Deserialize, Serialize};

/// Linear map of `input` from `from` onto `to`.
///
/// Fails on an empty input range rather than producing NaN or infinity.
pub fn remap(input: f64, from: (f64, f64), to: (f64, f64)) -> Result<f64, ConfigurationError> {
    let span = from.1 - from.0;
    if span == 0.0 {
        return Err(ConfigurationError::DegenerateRange(from.0));
    }
    Ok((input - from.0) * (to.1 - to.0) / span + to.0)
}

/// Controller input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Trigger,
    TrackpadX,
    TrackpadY,
    Grip,
    Menu,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Trigger,
        Channel::TrackpadX,
        Channel::TrackpadY,
        Channel::Grip,
        Channel::Menu,
    ];

    /// Range the runtime reports this channel in.
    pub fn input_range(self) -> (f64, f64) {
        match self {
            Channel::TrackpadX | Channel::TrackpadY => (-1.0, 1.0),
            Channel::Trigger | Channel::Grip | Channel::Menu => (0.0, 1.0),
        }
    }

    pub fn read(self, state: &ControllerState) -> f64 {
        match self {
            Channel::Trigger => state.trigger,
            Channel::TrackpadX => state.trackpad[0],
            Channel::TrackpadY => state.trackpad[1],
            Channel::Grip => state.grip(),
            Channel::Menu => state.menu(),
        }
    }
}

/// Where one channel writes, and the output range it is mapped onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    /// Property path; empty means the channel is unused.
    #[serde(default)]
    pub property: String,
    pub min: f64,
    pub max: f64,
}

impl ChannelMapping {
    fn with_range(min: f64, max: f64) -> Self {
        Self {
            property: String::new(),
            min,
            max,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.property.trim().is_empty()
    }
}

/// Per-controller input mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerMapping {
    pub trigger: ChannelMapping,
    pub trackpad_x: ChannelMapping,
    pub trackpad_y: ChannelMapping,
    pub grip: ChannelMapping,
    pub menu: ChannelMapping,
}

impl Default for ControllerMapping {
    fn default() -> Self {
        Self {
            trigger: ChannelMapping::with_range(0.0, 1.0),
            trackpad_x: ChannelMapping::with_range(-1.0, 1.0),
            trackpad_y: ChannelMapping::with_range(-1.0, 1.0),
            grip: ChannelMapping::with_range(0.0, 1.0),
            menu: ChannelMapping::with_range(0.0, 1.0),
        }
    }
}

impl ControllerMapping {
    pub fn channel(&self, channel: Channel) -> &ChannelMapping {
        match channel {
            Channel::Trigger => &self.trigger,
            Channel::TrackpadX => &self.trackpad_x,
            Channel::TrackpadY => &self.trackpad_y,
            Channel::Grip => &self.grip,
            Channel::Menu => &self.menu,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelMapping {
        match channel {
            Channel::Trigger => &mut self.trigger,
            Channel::TrackpadX => &mut self.trackpad_x,
            Channel::TrackpadY => &mut self.trackpad_y,
            Channel::Grip => &mut self.grip,
            Channel::Menu => &mut self.menu,
        }
    }
}

/// Remap `input` and write it to the scene property at `path`.
///
/// Keys the owning attribute when the host has auto-keyframing on.
/// Returns the written value.
pub fn write_property<S: Scene + ?Sized>(
    scene: &mut S,
    path: &str,
    input: f64,
    from: (f64, f64),
    to: (f64, f64),
) -> Result<f64, ConfigurationError> {
    let path = PropertyPath::parse(path)?;
    let value = remap(input, from, to)?;
    property::resolve(scene.properties_mut(), &path)?.set(value);

    if scene.auto_keyframe() {
        scene.insert_keyframe(&Keyframe::Property(path.keyframe_key()));
    }
    Ok(value)
}

/// Push every configured channel of `state` into the scene.
///
/// Inert channels are skipped; each remaining channel succeeds or fails on its own.
pub fn apply_controller<S: Scene + ?Sized>(
    scene: &mut S,
    mapping: &ControllerMapping,
    state: &ControllerState,
) -> Vec<(Channel, Result<f64, ConfigurationError>)> {
    Channel::ALL
        .into_iter()
        .filter(|&channel| !mapping.channel(channel).is_inert())
        .map(|channel| {
            let target = mapping.channel(channel);
            let result = write_property(
                scene,
                &target.property,
                channel.read(state),
                channel.input_range(),
                (target.min, target.max),
            );
            (channel, result)
        })
        .collect()
}
