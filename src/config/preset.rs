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
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::PresetError;

/// Default attack time in seconds.
pub const DEFAULT_ATTACK_SECS: f32 = 0.005;

/// Default decay time in seconds.
pub const DEFAULT_DECAY_SECS: f32 = 0.1;

/// Default sustain level (samplers typically sustain at full level).
pub const DEFAULT_SUSTAIN_LEVEL: f32 = 1.0;

/// Default release time in seconds.
pub const DEFAULT_RELEASE_SECS: f32 = 0.1;

/// Sentinel for envelope override fields meaning "inherit the preset default".
pub const ENVELOPE_INHERIT: f32 = -1.0;

/// A JSON representation of a sampler preset: an ordered list of groups,
/// each holding key/velocity-mapped regions.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct PresetConfig {
    /// Display name of the preset.
    #[serde(default)]
    name: String,

    /// Instrument-wide envelope defaults, used by any region whose group
    /// does not override them.
    #[serde(default)]
    envelope: EnvelopeConfig,

    /// The groups of this preset, in articulation order.
    #[serde(default)]
    groups: Vec<GroupConfig>,
}

impl PresetConfig {
    /// Parses a preset from JSON bytes and validates it.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PresetError> {
        let preset: PresetConfig = serde_json::from_slice(bytes)?;
        preset.validate()?;
        Ok(preset)
    }

    /// Reads and parses a preset file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PresetError> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Gets the preset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the instrument-wide envelope defaults.
    pub fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    /// Gets the groups of this preset.
    pub fn groups(&self) -> &[GroupConfig] {
        &self.groups
    }

    /// Checks the structural invariants of every region.
    fn validate(&self) -> Result<(), PresetError> {
        for (group_index, group) in self.groups.iter().enumerate() {
            for (region_index, region) in group.regions.iter().enumerate() {
                region.validate().map_err(|reason| PresetError::InvalidRegion {
                    group: group_index,
                    region: region_index,
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

/// Instrument-wide ADSR defaults carried by a preset.
#[derive(Deserialize, Clone, Copy, Serialize, Debug)]
pub struct EnvelopeConfig {
    /// Attack time in seconds.
    #[serde(default = "default_attack")]
    attack: f32,

    /// Decay time in seconds.
    #[serde(default = "default_decay")]
    decay: f32,

    /// Sustain level (0.0 to 1.0).
    #[serde(default = "default_sustain")]
    sustain: f32,

    /// Release time in seconds.
    #[serde(default = "default_release")]
    release: f32,
}

fn default_attack() -> f32 {
    DEFAULT_ATTACK_SECS
}

fn default_decay() -> f32 {
    DEFAULT_DECAY_SECS
}

fn default_sustain() -> f32 {
    DEFAULT_SUSTAIN_LEVEL
}

fn default_release() -> f32 {
    DEFAULT_RELEASE_SECS
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: DEFAULT_ATTACK_SECS,
            decay: DEFAULT_DECAY_SECS,
            sustain: DEFAULT_SUSTAIN_LEVEL,
            release: DEFAULT_RELEASE_SECS,
        }
    }
}

impl EnvelopeConfig {
    /// Gets the attack time in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Gets the decay time in seconds.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Gets the sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Gets the release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }
}

/// A per-group ADSR override. A negative value means "inherit the preset
/// default" for that stage.
#[derive(Deserialize, Clone, Copy, Serialize, Debug)]
pub struct EnvelopeOverrideConfig {
    /// Attack time in seconds, or negative to inherit.
    #[serde(default = "default_inherit")]
    attack: f32,

    /// Decay time in seconds, or negative to inherit.
    #[serde(default = "default_inherit")]
    decay: f32,

    /// Sustain level, or negative to inherit.
    #[serde(default = "default_inherit")]
    sustain: f32,

    /// Release time in seconds, or negative to inherit.
    #[serde(default = "default_inherit")]
    release: f32,
}

fn default_inherit() -> f32 {
    ENVELOPE_INHERIT
}

impl Default for EnvelopeOverrideConfig {
    fn default() -> Self {
        Self {
            attack: ENVELOPE_INHERIT,
            decay: ENVELOPE_INHERIT,
            sustain: ENVELOPE_INHERIT,
            release: ENVELOPE_INHERIT,
        }
    }
}

impl EnvelopeOverrideConfig {
    /// Gets the attack override.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Gets the decay override.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Gets the sustain override.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Gets the release override.
    pub fn release(&self) -> f32 {
        self.release
    }
}

/// A JSON representation of one group (articulation) in a preset.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct GroupConfig {
    /// Display name of the group.
    #[serde(default)]
    name: String,

    /// A note reserved for switching to this group. A keyswitch note never
    /// sounds; playing it makes this group the active articulation.
    keyswitch: Option<u8>,

    /// Volume offset in dB applied to every region in the group.
    #[serde(default)]
    volume_db: f32,

    /// Per-group ADSR override. Negative fields inherit the preset default.
    #[serde(default)]
    envelope: EnvelopeOverrideConfig,

    /// The regions of this group.
    #[serde(default)]
    regions: Vec<RegionConfig>,
}

impl GroupConfig {
    /// Creates a new group with the given name and no regions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the keyswitch note for this group.
    pub fn with_keyswitch(mut self, note: u8) -> Self {
        self.keyswitch = Some(note);
        self
    }

    /// Sets the group volume offset in dB.
    pub fn with_volume_db(mut self, volume_db: f32) -> Self {
        self.volume_db = volume_db;
        self
    }

    /// Sets the group envelope override.
    pub fn with_envelope(mut self, envelope: EnvelopeOverrideConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Appends a region to this group.
    pub fn with_region(mut self, region: RegionConfig) -> Self {
        self.regions.push(region);
        self
    }

    /// Gets the group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the keyswitch note, if any.
    pub fn keyswitch(&self) -> Option<u8> {
        self.keyswitch
    }

    /// Gets the group volume offset in dB.
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Gets the group envelope override.
    pub fn envelope(&self) -> &EnvelopeOverrideConfig {
        &self.envelope
    }

    /// Gets the regions of this group.
    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }
}

/// A JSON representation of one mapped sample region.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct RegionConfig {
    /// The audio file for this region, absolute or relative to the preset.
    file: String,

    /// The note the sample was recorded at.
    root_note: u8,

    /// Lowest note this region responds to.
    #[serde(default)]
    lo_note: u8,

    /// Highest note this region responds to.
    #[serde(default = "default_127")]
    hi_note: u8,

    /// Lowest velocity (0-127) this region responds to.
    #[serde(default)]
    lo_vel: u8,

    /// Highest velocity (0-127) this region responds to.
    #[serde(default = "default_127")]
    hi_vel: u8,

    /// Region volume in dB.
    #[serde(default)]
    volume_db: f32,

    /// Stereo pan, -1.0 (left) to 1.0 (right).
    #[serde(default)]
    pan: f32,

    /// Tuning offset in cents.
    #[serde(default)]
    tune_cents: i32,

    /// Whether playback loops between the loop points.
    #[serde(default)]
    loop_enabled: bool,

    /// Loop start in source frames.
    #[serde(default)]
    loop_start: u64,

    /// Loop end in source frames. Zero means the full decoded length.
    #[serde(default)]
    loop_end: u64,

    /// Loop crossfade in seconds. Parsed for compatibility with authored
    /// presets but not applied during playback.
    #[serde(default)]
    loop_crossfade: f32,
}

fn default_127() -> u8 {
    127
}

impl RegionConfig {
    /// Creates a new region for the given file, mapped to the full key and
    /// velocity range with the given root note.
    pub fn new(file: impl Into<String>, root_note: u8) -> Self {
        Self {
            file: file.into(),
            root_note,
            lo_note: 0,
            hi_note: 127,
            lo_vel: 0,
            hi_vel: 127,
            volume_db: 0.0,
            pan: 0.0,
            tune_cents: 0,
            loop_enabled: false,
            loop_start: 0,
            loop_end: 0,
            loop_crossfade: 0.0,
        }
    }

    /// Sets the note range this region responds to.
    pub fn with_note_range(mut self, lo_note: u8, hi_note: u8) -> Self {
        self.lo_note = lo_note;
        self.hi_note = hi_note;
        self
    }

    /// Sets the velocity range this region responds to.
    pub fn with_velocity_range(mut self, lo_vel: u8, hi_vel: u8) -> Self {
        self.lo_vel = lo_vel;
        self.hi_vel = hi_vel;
        self
    }

    /// Sets the region volume in dB.
    pub fn with_volume_db(mut self, volume_db: f32) -> Self {
        self.volume_db = volume_db;
        self
    }

    /// Sets the stereo pan.
    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    /// Sets the tuning offset in cents.
    pub fn with_tune_cents(mut self, tune_cents: i32) -> Self {
        self.tune_cents = tune_cents;
        self
    }

    /// Enables looping between the given source-frame points.
    pub fn with_loop(mut self, loop_start: u64, loop_end: u64) -> Self {
        self.loop_enabled = true;
        self.loop_start = loop_start;
        self.loop_end = loop_end;
        self
    }

    /// Gets the audio file path.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the root note.
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    /// Gets the lowest note this region responds to.
    pub fn lo_note(&self) -> u8 {
        self.lo_note
    }

    /// Gets the highest note this region responds to.
    pub fn hi_note(&self) -> u8 {
        self.hi_note
    }

    /// Gets the lowest velocity this region responds to.
    pub fn lo_vel(&self) -> u8 {
        self.lo_vel
    }

    /// Gets the highest velocity this region responds to.
    pub fn hi_vel(&self) -> u8 {
        self.hi_vel
    }

    /// Gets the region volume in dB.
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Gets the stereo pan.
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Gets the tuning offset in cents.
    pub fn tune_cents(&self) -> i32 {
        self.tune_cents
    }

    /// Gets whether looping is enabled.
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Gets the loop start in source frames.
    pub fn loop_start(&self) -> u64 {
        self.loop_start
    }

    /// Gets the loop end in source frames (zero means full length).
    pub fn loop_end(&self) -> u64 {
        self.loop_end
    }

    /// Gets the loop crossfade in seconds.
    /// Note: crossfading is not applied during playback; this field is
    /// carried for preset round-tripping only.
    #[allow(dead_code)]
    pub fn loop_crossfade(&self) -> f32 {
        self.loop_crossfade
    }

    /// Checks this region's structural invariants.
    fn validate(&self) -> Result<(), String> {
        if self.root_note > 127 {
            return Err(format!("root_note {} out of range", self.root_note));
        }
        if self.lo_note > self.hi_note {
            return Err(format!(
                "note range {}..{} is inverted",
                self.lo_note, self.hi_note
            ));
        }
        if self.hi_note > 127 {
            return Err(format!("hi_note {} out of range", self.hi_note));
        }
        if self.lo_vel > self.hi_vel {
            return Err(format!(
                "velocity range {}..{} is inverted",
                self.lo_vel, self.hi_vel
            ));
        }
        if !(-1.0..=1.0).contains(&self.pan) {
            return Err(format!("pan {} out of range", self.pan));
        }
        if self.loop_enabled && self.loop_end != 0 && self.loop_start >= self.loop_end {
            return Err(format!(
                "loop range {}..{} is empty",
                self.loop_start, self.loop_end
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_preset_defaults() {
        let json = br#"{
            "name": "piano",
            "groups": [
                {
                    "regions": [
                        {"file": "c4.wav", "root_note": 60}
                    ]
                }
            ]
        }"#;

        let preset = PresetConfig::from_json(json).unwrap();
        assert_eq!(preset.name(), "piano");
        assert_eq!(preset.groups().len(), 1);

        let region = &preset.groups()[0].regions()[0];
        assert_eq!(region.root_note(), 60);
        assert_eq!(region.lo_note(), 0);
        assert_eq!(region.hi_note(), 127);
        assert_eq!(region.lo_vel(), 0);
        assert_eq!(region.hi_vel(), 127);
        assert!(!region.loop_enabled());
        assert_eq!(region.loop_end(), 0);

        // Envelope falls back to the instrument defaults.
        let envelope = preset.envelope();
        assert!((envelope.attack() - DEFAULT_ATTACK_SECS).abs() < 1e-6);
        assert!((envelope.sustain() - DEFAULT_SUSTAIN_LEVEL).abs() < 1e-6);
    }

    #[test]
    fn test_keyswitch_and_overrides() {
        let json = br#"{
            "groups": [
                {
                    "name": "sustain",
                    "keyswitch": 36,
                    "volume_db": -3.0,
                    "envelope": {"release": 0.5},
                    "regions": [
                        {"file": "a.wav", "root_note": 60, "lo_note": 48, "hi_note": 72,
                         "lo_vel": 0, "hi_vel": 90}
                    ]
                }
            ]
        }"#;

        let preset = PresetConfig::from_json(json).unwrap();
        let group = &preset.groups()[0];
        assert_eq!(group.keyswitch(), Some(36));
        assert!((group.volume_db() + 3.0).abs() < 1e-6);

        // Only release is overridden; the rest stay at the inherit sentinel.
        assert!((group.envelope().release() - 0.5).abs() < 1e-6);
        assert!(group.envelope().attack() < 0.0);
        assert!(group.envelope().decay() < 0.0);
        assert!(group.envelope().sustain() < 0.0);
    }

    #[test]
    fn test_inverted_note_range_rejected() {
        let json = br#"{
            "groups": [
                {"regions": [{"file": "a.wav", "root_note": 60, "lo_note": 72, "hi_note": 48}]}
            ]
        }"#;

        let err = PresetConfig::from_json(json).unwrap_err();
        match err {
            PresetError::InvalidRegion { group, region, .. } => {
                assert_eq!(group, 0);
                assert_eq!(region, 0);
            }
            other => panic!("expected InvalidRegion, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_loop_range_rejected() {
        let json = br#"{
            "groups": [
                {"regions": [{"file": "a.wav", "root_note": 60,
                              "loop_enabled": true, "loop_start": 500, "loop_end": 100}]}
            ]
        }"#;

        assert!(PresetConfig::from_json(json).is_err());
    }

    #[test]
    fn test_unparsable_document_rejected() {
        assert!(matches!(
            PresetConfig::from_json(b"{not json"),
            Err(PresetError::Parse(_))
        ));
    }

    #[test]
    fn test_builder_construction() {
        let group = GroupConfig::new("staccato")
            .with_keyswitch(37)
            .with_region(
                RegionConfig::new("stacc_c4.wav", 60)
                    .with_note_range(55, 65)
                    .with_velocity_range(0, 100)
                    .with_tune_cents(-5),
            );

        assert_eq!(group.name(), "staccato");
        assert_eq!(group.regions().len(), 1);
        assert_eq!(group.regions()[0].tune_cents(), -5);
    }
}
