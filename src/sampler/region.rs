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

//! The region table: the playable shape of a loaded preset.
//!
//! Regions live in an arena with stable indices so that voices can refer to
//! them without holding pointers into a collection that a preset reload may
//! replace. The table carries an epoch that is bumped on every wholesale
//! replacement; a voice holding a stale epoch renders nothing.

use tracing::debug;

use crate::config::{EnvelopeOverrideConfig, GroupConfig, RegionConfig};
use crate::sample::LoadedSample;

/// Converts a decibel value to a linear gain factor.
pub(crate) fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// One mapped sample zone: a decoded sample with the key/velocity range it
/// responds to, its tuning, and its loop metadata in engine-rate frames.
pub struct SampleRegion {
    /// The decoded sample, or None if loading failed. A region without a
    /// sample is unplayable and never matches a note.
    sample: Option<LoadedSample>,
    /// The note the sample was recorded at.
    root_note: u8,
    /// Lowest note this region responds to.
    lo_note: u8,
    /// Highest note this region responds to.
    hi_note: u8,
    /// Lowest velocity (0-127) this region responds to.
    lo_vel: u8,
    /// Highest velocity (0-127) this region responds to.
    hi_vel: u8,
    /// Region volume in dB.
    volume_db: f32,
    /// Stereo pan, -1.0 (left) to 1.0 (right).
    pan: f32,
    /// Tuning offset in cents.
    tune_cents: i32,
    /// Whether playback loops between the loop points.
    loop_enabled: bool,
    /// Loop start in engine-rate frames.
    loop_start: usize,
    /// Loop end in engine-rate frames (exclusive).
    loop_end: usize,
}

impl SampleRegion {
    /// Builds a region from its config and an already-decoded sample.
    ///
    /// Loop points authored against the source file are rescaled into
    /// engine-rate frames; a zero loop end means the full decoded length.
    /// A loop that ends up empty after rescaling is disabled. Passing no
    /// sample produces an unplayable region.
    pub fn new(config: &RegionConfig, sample: Option<LoadedSample>) -> Self {
        let frames = sample.as_ref().map_or(0, LoadedSample::frames);

        let (loop_start, loop_end) = match &sample {
            Some(sample) => {
                let start = sample.scale_source_frame(config.loop_start()) as usize;
                let end = if config.loop_end() == 0 {
                    frames
                } else {
                    (sample.scale_source_frame(config.loop_end()) as usize).min(frames)
                };
                (start, end)
            }
            None => (0, 0),
        };

        Self {
            sample,
            root_note: config.root_note(),
            lo_note: config.lo_note(),
            hi_note: config.hi_note(),
            lo_vel: config.lo_vel(),
            hi_vel: config.hi_vel(),
            volume_db: config.volume_db(),
            pan: config.pan().clamp(-1.0, 1.0),
            tune_cents: config.tune_cents(),
            loop_enabled: config.loop_enabled() && loop_start < loop_end,
            loop_start,
            loop_end,
        }
    }

    /// Returns true if this region can sound: its sample decoded successfully
    /// and holds at least one frame.
    pub fn playable(&self) -> bool {
        self.sample.as_ref().is_some_and(|s| s.frames() > 0)
    }

    /// Returns whether the given note and scaled velocity fall within this
    /// region's ranges. Unplayable regions never match.
    fn matches(&self, note: u8, velocity: u8) -> bool {
        self.playable()
            && (self.lo_note..=self.hi_note).contains(&note)
            && (self.lo_vel..=self.hi_vel).contains(&velocity)
    }

    /// Like [`Self::matches`] but ignoring velocity, for fallback matching.
    fn matches_note(&self, note: u8) -> bool {
        self.playable() && (self.lo_note..=self.hi_note).contains(&note)
    }

    /// Returns the decoded sample, if it loaded.
    pub fn sample(&self) -> Option<&LoadedSample> {
        self.sample.as_ref()
    }

    /// Returns the note the sample was recorded at.
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    /// Returns the region volume in dB.
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Returns the stereo pan.
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Returns the tuning offset in cents.
    pub fn tune_cents(&self) -> i32 {
        self.tune_cents
    }

    /// Returns whether playback loops between the loop points.
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Returns the loop start in engine-rate frames.
    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    /// Returns the loop end in engine-rate frames (exclusive).
    pub fn loop_end(&self) -> usize {
        self.loop_end
    }
}

/// A named articulation: an ordered set of regions, an optional keyswitch
/// note that activates the group instead of sounding, and per-group volume
/// and envelope overrides.
#[derive(Default)]
pub struct SampleGroup {
    /// Display name of the group.
    name: String,
    /// Note reserved for switching to this group, if any.
    keyswitch: Option<u8>,
    /// Volume offset in dB applied to every region in the group.
    volume_db: f32,
    /// Per-group ADSR override. Negative fields inherit the preset default.
    envelope: EnvelopeOverrideConfig,
    /// Arena indices of this group's regions, in authored order.
    regions: Vec<usize>,
}

impl SampleGroup {
    /// Builds a group from its config, without regions. Regions are pushed
    /// into the owning table separately so they land in the arena.
    pub fn from_config(config: &GroupConfig) -> Self {
        Self {
            name: config.name().to_string(),
            keyswitch: config.keyswitch(),
            volume_db: config.volume_db(),
            envelope: *config.envelope(),
            regions: Vec::new(),
        }
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

    /// Gets the arena indices of this group's regions.
    pub fn regions(&self) -> &[usize] {
        &self.regions
    }
}

/// The result of resolving a note/velocity pair against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The note was a keyswitch: the active group changed and nothing sounds.
    Keyswitch(usize),
    /// A region matched; the value is its stable arena index.
    Region(usize),
    /// No region matched.
    NoMatch,
}

/// The parsed instrument: groups of key/velocity-mapped regions plus the
/// active articulation and the per-note round-robin counters.
///
/// The table is replaced wholesale on preset load, never mutated
/// incrementally during playback. Each replacement bumps the epoch so that
/// voices started against the old table invalidate themselves.
pub struct RegionTable {
    /// Region arena. Indices into this vector are stable for the lifetime of
    /// one table epoch.
    regions: Vec<SampleRegion>,
    /// The groups of the instrument, in articulation order.
    groups: Vec<SampleGroup>,
    /// Index of the active group.
    active_group: usize,
    /// Bumped whenever the live table is replaced or cleared.
    epoch: u64,
    /// Per-note round-robin counters, indexed directly by MIDI note so the
    /// trigger path never touches a hash map.
    round_robin: [u8; 128],
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            groups: Vec::new(),
            active_group: 0,
            epoch: 0,
            round_robin: [0; 128],
        }
    }

    /// Appends a group and returns its index.
    pub fn push_group(&mut self, group: SampleGroup) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Appends a region to the arena and to the given group, returning the
    /// region's stable arena index. An out-of-range group is ignored.
    pub fn push_region(&mut self, group_index: usize, region: SampleRegion) -> usize {
        let region_index = self.regions.len();
        self.regions.push(region);
        if let Some(group) = self.groups.get_mut(group_index) {
            group.regions.push(region_index);
        }
        region_index
    }

    /// Gets a region by its arena index.
    pub fn region(&self, index: usize) -> Option<&SampleRegion> {
        self.regions.get(index)
    }

    /// Gets a group by index.
    pub fn group(&self, index: usize) -> Option<&SampleGroup> {
        self.groups.get(index)
    }

    /// Returns the number of regions across all groups.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Returns the number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the index of the active group.
    pub fn active_group(&self) -> usize {
        self.active_group
    }

    /// Sets the active group. An out-of-range index is ignored.
    pub fn set_active_group(&mut self, index: usize) {
        if index < self.groups.len() {
            self.active_group = index;
        }
    }

    /// Activates the group whose keyswitch is the given note, returning its
    /// index if one exists.
    pub fn activate_keyswitch(&mut self, note: u8) -> Option<usize> {
        let index = self
            .groups
            .iter()
            .position(|group| group.keyswitch == Some(note))?;
        if index != self.active_group {
            debug!(group = index, name = self.groups[index].name(), "Keyswitch activated group");
        }
        self.active_group = index;
        Some(index)
    }

    /// Returns the table epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Stamps the epoch of this table. Used when swapping a freshly built
    /// table in over the live one.
    pub(crate) fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }

    /// Empties the table and bumps the epoch so voices referring to the old
    /// contents go silent.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.groups.clear();
        self.active_group = 0;
        self.round_robin = [0; 128];
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Resolves a note and velocity (0.0 to 1.0) to a region.
    ///
    /// Keyswitches are checked first across all groups and never sound.
    /// Within the active group, regions matching both the note and the
    /// velocity are cycled through with the per-note round-robin counter.
    /// If no region matches exactly, the note falls back to note-range-only
    /// matching and the region whose root note is closest wins, so sparse
    /// velocity layering degrades to the nearest layer instead of silence.
    pub fn resolve(&mut self, note: u8, velocity: f32) -> Resolution {
        if note > 127 {
            return Resolution::NoMatch;
        }
        if let Some(group_index) = self.activate_keyswitch(note) {
            return Resolution::Keyswitch(group_index);
        }

        let Some(group) = self.groups.get(self.active_group) else {
            return Resolution::NoMatch;
        };
        let scaled_vel = (velocity.clamp(0.0, 1.0) * 127.0).round() as u8;

        // Count the exact matches first, then walk to the round-robin pick.
        // Two passes over the group keep the trigger path allocation-free.
        let match_count = group
            .regions
            .iter()
            .filter(|&&index| self.regions[index].matches(note, scaled_vel))
            .count();
        if match_count > 0 {
            let counter = self.round_robin[note as usize] as usize;
            let pick = counter % match_count;
            self.round_robin[note as usize] = ((counter + 1) % match_count) as u8;

            let mut seen = 0;
            for &index in &group.regions {
                if self.regions[index].matches(note, scaled_vel) {
                    if seen == pick {
                        return Resolution::Region(index);
                    }
                    seen += 1;
                }
            }
        }

        // Fallback: ignore velocity and take the closest root note, first
        // encountered winning ties.
        let mut best: Option<(usize, u8)> = None;
        for &index in &group.regions {
            let region = &self.regions[index];
            if !region.matches_note(note) {
                continue;
            }
            let distance = region.root_note.abs_diff(note);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        match best {
            Some((index, _)) => Resolution::Region(index),
            None => Resolution::NoMatch,
        }
    }
}

impl std::fmt::Debug for RegionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionTable")
            .field("groups", &self.groups.len())
            .field("regions", &self.regions.len())
            .field("active_group", &self.active_group)
            .field("epoch", &self.epoch)
            .finish()
    }
}
