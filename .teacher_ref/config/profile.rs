// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;

use serde::Deserialize;

use super::audio::Audio;
use super::midi::Midi;

/// An audio hardware profile. Each entry in `audio_profiles` represents one
/// possible audio device configuration with its associated track mappings.
/// Profiles are tried in list order; the first one whose device is available wins.
#[derive(Deserialize, Clone)]
pub struct AudioProfile {
    /// Optional hostname restriction. If set, this profile only applies on
    /// hosts whose hostname matches this value. If omitted, matches any host.
    hostname: Option<String>,

    /// The audio configuration (device name, sample rate, etc.).
    /// Flattened so that device, sample_rate, etc. appear at the profile level in YAML.
    #[serde(flatten)]
    audio: Audio,

    /// The track mappings specific to this audio profile.
    track_mappings: HashMap<String, Vec<u16>>,
}

impl AudioProfile {
    /// Creates a new AudioProfile.
    pub fn new(
        hostname: Option<String>,
        audio: Audio,
        track_mappings: HashMap<String, Vec<u16>>,
    ) -> Self {
        AudioProfile {
            hostname,
            audio,
            track_mappings,
        }
    }

    /// Returns the optional hostname constraint.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the track mappings for this profile.
    pub fn track_mappings(&self) -> &HashMap<String, Vec<u16>> {
        &self.track_mappings
    }
}

/// A MIDI hardware profile. Each entry in `midi_profiles` represents one
/// possible MIDI device with its configuration. Profiles are tried in list order.
#[derive(Deserialize, Clone)]
pub struct MidiProfile {
    /// Optional hostname restriction.
    hostname: Option<String>,

    /// The MIDI configuration (device name, playback_delay, midi_to_dmx).
    /// Flattened so that device, playback_delay, etc. appear at the profile level in YAML.
    #[serde(flatten)]
    midi: Midi,
}

impl MidiProfile {
    /// Creates a new MidiProfile.
    pub fn new(hostname: Option<String>, midi: Midi) -> Self {
        MidiProfile { hostname, midi }
    }

    /// Returns the optional hostname constraint.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Returns the MIDI configuration.
    pub fn midi(&self) -> &Midi {
        &self.midi
    }
}

/// Filters profiles by hostname. Returns profiles that either have no hostname
/// constraint or whose hostname matches the given value.
pub fn filter_by_hostname<'a, P, F>(
    profiles: &'a [P],
    hostname: &str,
    get_hostname: F,
) -> Vec<&'a P>
where
    F: Fn(&'a P) -> Option<&'a str>,
{
    profiles
        .iter()
        .filter(|p| match get_hostname(p) {
            Some(h) => h == hostname,
            None => true,
        })
        .collect()
}
