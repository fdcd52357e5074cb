// src/receiver.rs

//! # Receiver Channel Decoder
//!
//! Interrupt handlers feed pulse edges (or already measured pulse widths)
//! into [`ReceiverInputs`]. Once per tick the controller takes a snapshot of
//! the latest readings and hands it to [`ChannelDecoder`], which rejects
//! implausible pulses, clamps the rest to the channel range, holds the last
//! good value of every channel and flags channels that stopped updating.
//!
//! No physical mapping happens here; see [`crate::setpoint`].

use core::fmt;

use crate::config::{ChannelRange, ReceiverConfig};
use crate::snapshot::{age_us, elapsed_us, SnapshotCell, Stamped};

/// Number of receiver channels.
pub const CHANNEL_COUNT: usize = 5;

/// One receiver channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Collective throttle.
    Throttle,
    /// Roll stick.
    Roll,
    /// Pitch stick.
    Pitch,
    /// Yaw stick.
    Yaw,
    /// Auxiliary switch, used for arming.
    Aux1,
}

impl Channel {
    /// Every channel in storage order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Throttle,
        Channel::Roll,
        Channel::Pitch,
        Channel::Yaw,
        Channel::Aux1,
    ];

    /// Storage index of the channel.
    pub fn index(self) -> usize {
        match self {
            Channel::Throttle => 0,
            Channel::Roll => 1,
            Channel::Pitch => 2,
            Channel::Yaw => 3,
            Channel::Aux1 => 4,
        }
    }

    /// Whether the channel is a centered stick that honors the dead-zone.
    pub fn is_stick(self) -> bool {
        matches!(self, Channel::Roll | Channel::Pitch | Channel::Yaw)
    }

    /// Short lowercase name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Throttle => "throttle",
            Channel::Roll => "roll",
            Channel::Pitch => "pitch",
            Channel::Yaw => "yaw",
            Channel::Aux1 => "aux1",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signal edge seen by a pulse-capture interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Start of a pulse.
    Rising,
    /// End of a pulse.
    Falling,
}

/// Latest pulse of one channel: width in microseconds and capture time.
pub type PulseReading = Stamped<u16>;

/// Snapshot of every channel's latest pulse, `None` until the first one.
pub type PulseSnapshot = [Option<PulseReading>; CHANNEL_COUNT];

/// Shared receiver state written by interrupt handlers.
///
/// Meant to live in a `static`; every method takes `&self`.
pub struct ReceiverInputs {
    rising: [SnapshotCell<Option<u32>>; CHANNEL_COUNT],
    pulses: [SnapshotCell<Option<PulseReading>>; CHANNEL_COUNT],
}

impl ReceiverInputs {
    /// Creates empty receiver state.
    pub const fn new() -> Self {
        ReceiverInputs {
            rising: [
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
            ],
            pulses: [
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
                SnapshotCell::new(None),
            ],
        }
    }

    /// Records an edge of `channel` captured at `at_us`. A falling edge that
    /// follows a rising edge publishes the pulse width.
    pub fn on_edge(&self, channel: Channel, edge: Edge, at_us: u32) {
        let index = channel.index();
        match edge {
            Edge::Rising => self.rising[index].publish(Some(at_us)),
            Edge::Falling => {
                let started = self.rising[index].update(|start| start.take());
                if let Some(started) = started {
                    let width = elapsed_us(at_us, started).min(u32::from(u16::MAX)) as u16;
                    self.publish_pulse(channel, width, at_us);
                }
            }
        }
    }

    /// Publishes a pulse width measured by hardware capture.
    pub fn publish_pulse(&self, channel: Channel, width_us: u16, at_us: u32) {
        self.pulses[channel.index()].publish(Some(Stamped {
            value: width_us,
            at_us,
        }));
    }

    /// Copies the latest pulse of every channel.
    pub fn snapshot(&self) -> PulseSnapshot {
        let mut readings = [None; CHANNEL_COUNT];
        for (reading, cell) in readings.iter_mut().zip(self.pulses.iter()) {
            *reading = cell.snapshot();
        }
        readings
    }
}

impl Default for ReceiverInputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded channel values for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedChannels {
    /// Last good pulse width per channel, clamped to its range.
    pub pulses_us: [u16; CHANNEL_COUNT],
    /// Channels that have not been updated for more than a frame period.
    pub stale: [bool; CHANNEL_COUNT],
}

impl DecodedChannels {
    /// Pulse width of one channel.
    pub fn pulse(&self, channel: Channel) -> u16 {
        self.pulses_us[channel.index()]
    }

    /// Whether one channel is stale.
    pub fn is_stale(&self, channel: Channel) -> bool {
        self.stale[channel.index()]
    }

    /// Whether any channel is stale.
    pub fn any_stale(&self) -> bool {
        self.stale.iter().any(|s| *s)
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelTrack {
    r_min: u16,
    r_max: u16,
    last_good: u16,
    last_accepted_at: Option<u32>,
    last_seen_at: Option<u32>,
    stale: bool,
}

/// Turns raw pulse snapshots into clamped, staleness-flagged channel values.
pub struct ChannelDecoder {
    tracks: [ChannelTrack; CHANNEL_COUNT],
    frame_period_us: u32,
    glitch_min_us: u16,
    glitch_max_us: u16,
}

impl ChannelDecoder {
    /// Creates a decoder for the given channel ranges.
    ///
    /// Until a channel receives its first pulse it reports its failsafe
    /// value (the neutral stick, or the low stop for throttle and aux) and
    /// is stale.
    pub fn new<T>(ranges: &[ChannelRange<T>; CHANNEL_COUNT], receiver: &ReceiverConfig) -> Self {
        let mut tracks = [ChannelTrack {
            r_min: 0,
            r_max: 0,
            last_good: 0,
            last_accepted_at: None,
            last_seen_at: None,
            stale: true,
        }; CHANNEL_COUNT];
        for (channel, track) in Channel::ALL.iter().zip(tracks.iter_mut()) {
            let range = &ranges[channel.index()];
            track.r_min = range.r_min;
            track.r_max = range.r_max;
            track.last_good = range.failsafe_pulse(channel.is_stick());
        }

        ChannelDecoder {
            tracks,
            frame_period_us: receiver.frame_period_us,
            glitch_min_us: receiver.glitch_min_us,
            glitch_max_us: receiver.glitch_max_us,
        }
    }

    /// Decodes one snapshot taken at `now_us`.
    pub fn decode(&mut self, readings: &PulseSnapshot, now_us: u32) -> DecodedChannels {
        let mut decoded = DecodedChannels {
            pulses_us: [0; CHANNEL_COUNT],
            stale: [true; CHANNEL_COUNT],
        };

        for channel in Channel::ALL {
            let index = channel.index();
            let track = &mut self.tracks[index];

            if let Some(reading) = readings[index] {
                if track.last_seen_at != Some(reading.at_us) {
                    track.last_seen_at = Some(reading.at_us);
                    if (self.glitch_min_us..=self.glitch_max_us).contains(&reading.value) {
                        track.last_good = reading.value.clamp(track.r_min, track.r_max);
                        track.last_accepted_at = Some(reading.at_us);
                    } else {
                        log::debug!("rejected {} pulse of {} us", channel, reading.value);
                    }
                }
            }

            let stale = match track.last_accepted_at {
                Some(at) => age_us(now_us, at) > self.frame_period_us,
                None => true,
            };
            if stale && !track.stale && track.last_accepted_at.is_some() {
                log::warn!("{} channel stale, holding {} us", channel, track.last_good);
            }
            track.stale = stale;

            decoded.pulses_us[index] = track.last_good;
            decoded.stale[index] = stale;
        }

        decoded
    }
}
