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

//! The host-facing engine: note events in, interleaved stereo blocks out.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::allocator::VoiceAllocator;
use super::envelope::AdsrParams;
use super::region::{db_to_gain, RegionTable, Resolution, SampleGroup, SampleRegion};
use crate::config::{EnvelopeConfig, GroupConfig, PresetConfig, RegionConfig};
use crate::sample::{LoadedSample, SampleLoader};

/// Default polyphony limit.
pub const DEFAULT_MAX_VOICES: usize = 32;

/// Default engine sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Upper bound on the block size a single `generate_block` call renders.
/// The accumulation buffers are sized to this once, so the render path never
/// allocates; larger requests are clamped.
const MAX_BLOCK_FRAMES: usize = 8192;

/// Construction-time engine parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Output sample rate in Hz. Samples are resampled to this on load.
    pub sample_rate: u32,
    /// Polyphony limit, which is also the voice pool capacity.
    pub max_voices: usize,
    /// Master volume applied to the mixed output.
    pub master_volume: f32,
    /// Instrument-wide envelope defaults, used until a preset supplies its
    /// own and by any group without an override.
    pub envelope: AdsrParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_voices: DEFAULT_MAX_VOICES,
            master_volume: 1.0,
            envelope: AdsrParams::from(&EnvelopeConfig::default()),
        }
    }
}

/// The sampler engine.
///
/// A host drives the engine synchronously: `note_on`/`note_off` from its
/// event handling and `generate_block` from its audio callback, on the same
/// thread. Preset loading is a control-plane operation and must not overlap
/// a `generate_block` call; everything it decodes is resident in memory
/// before the first note can trigger, so the trigger and render paths never
/// touch the filesystem and never allocate.
pub struct SamplerEngine {
    /// Output sample rate in Hz.
    sample_rate: u32,
    /// Master volume applied to the mixed output.
    master_volume: f32,
    /// Envelope defaults for groups without an override.
    default_envelope: AdsrParams,
    /// Sample loader and cache, shared across preset reloads.
    loader: SampleLoader,
    /// The live region table.
    table: RegionTable,
    /// The voice pool.
    pool: VoiceAllocator,
    /// Trigger ordinal handed to the next voice.
    next_note_id: u64,
    /// Per-channel accumulation buffers, sized once at construction.
    accum_left: Vec<f32>,
    accum_right: Vec<f32>,
    /// Interleaved output buffer handed back to the host.
    output: Vec<f32>,
}

impl SamplerEngine {
    /// Creates an engine with an empty region table.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            master_volume: config.master_volume,
            default_envelope: config.envelope,
            loader: SampleLoader::new(config.sample_rate),
            table: RegionTable::new(),
            pool: VoiceAllocator::new(config.max_voices),
            next_note_id: 1,
            accum_left: vec![0.0; MAX_BLOCK_FRAMES],
            accum_right: vec![0.0; MAX_BLOCK_FRAMES],
            output: vec![0.0; MAX_BLOCK_FRAMES * 2],
        }
    }

    /// Triggers a note with a velocity from 0.0 to 1.0, returning the voice
    /// slot that took it.
    ///
    /// Returns None when the note is a keyswitch (the articulation changes
    /// and nothing sounds), when no region matches, or when the polyphony
    /// limit is zero. Notes above 127 are ignored; velocity is clamped.
    pub fn note_on(&mut self, note: u8, velocity: f32) -> Option<usize> {
        if note > 127 {
            return None;
        }
        let velocity = velocity.clamp(0.0, 1.0);

        let region_index = match self.table.resolve(note, velocity) {
            Resolution::Keyswitch(_) => return None,
            Resolution::NoMatch => return None,
            Resolution::Region(region_index) => region_index,
        };
        let group = self.table.group(self.table.active_group())?;
        let region = self.table.region(region_index)?;

        let slot = self.pool.acquire()?;
        let adsr = self.default_envelope.with_override(group.envelope());
        let volume_scale = db_to_gain(region.volume_db() + group.volume_db());
        let note_id = self.next_note_id;
        self.next_note_id += 1;

        let epoch = self.table.epoch();
        let sample_rate = self.sample_rate as f32;
        let voice = self.pool.voice_mut(slot)?;
        voice.start(
            region_index,
            epoch,
            region,
            note,
            velocity,
            volume_scale,
            adsr,
            note_id,
            sample_rate,
        );

        debug!(note, velocity, slot, region = region_index, "Note on");
        Some(slot)
    }

    /// Releases the first active, non-releasing voice playing the given
    /// note. Does nothing if there is none.
    pub fn note_off(&mut self, note: u8) {
        self.pool.release_note(note);
    }

    /// Gracefully releases every active voice.
    pub fn all_notes_off(&mut self) {
        debug!(voices = self.pool.active_count(), "All notes off");
        self.pool.release_all();
    }

    /// Emergency stop: hard-resets every voice to idle with zero output,
    /// bypassing envelopes.
    pub fn panic(&mut self) {
        info!(voices = self.pool.active_count(), "Panic, resetting all voices");
        self.pool.reset_all();
    }

    /// Renders one block of audio and returns it as interleaved stereo
    /// samples (`frames * 2` values).
    ///
    /// Voices are rendered in pool-slot order into pre-sized accumulators,
    /// then scaled by the master volume and a `1/sqrt(max_voices)` polyphony
    /// normalization that bounds clipping growth as the voice count rises.
    /// Requests beyond the internal maximum block size are clamped.
    pub fn generate_block(&mut self, frames: usize) -> &[f32] {
        let frames = frames.min(MAX_BLOCK_FRAMES);
        self.accum_left[..frames].fill(0.0);
        self.accum_right[..frames].fill(0.0);

        for voice in self.pool.voices_mut() {
            voice.render(
                &self.table,
                &mut self.accum_left[..frames],
                &mut self.accum_right[..frames],
            );
        }

        let scale = self.master_volume / (self.pool.max_voices().max(1) as f32).sqrt();
        for frame in 0..frames {
            self.output[frame * 2] = self.accum_left[frame] * scale;
            self.output[frame * 2 + 1] = self.accum_right[frame] * scale;
        }
        &self.output[..frames * 2]
    }

    /// Loads a preset from a JSON file. Region sample paths are resolved
    /// relative to the preset file.
    ///
    /// Returns false and leaves the engine's current preset fully intact if
    /// the document cannot be read or parsed, or contains no regions. A
    /// region whose sample file fails to decode stays in the new table but
    /// is unplayable; triggering it behaves like no match.
    pub fn load_preset_file<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        let preset = match PresetConfig::from_file(path) {
            Ok(preset) => preset,
            Err(err) => {
                warn!(path = ?path, error = %err, "Failed to load preset");
                return false;
            }
        };
        self.install_preset(&preset, path.parent())
    }

    /// Loads a preset from JSON bytes. Relative region sample paths are
    /// resolved against the process working directory.
    pub fn load_preset_json(&mut self, bytes: &[u8]) -> bool {
        let preset = match PresetConfig::from_json(bytes) {
            Ok(preset) => preset,
            Err(err) => {
                warn!(error = %err, "Failed to parse preset");
                return false;
            }
        };
        self.install_preset(&preset, None)
    }

    /// Builds a new region table from a parsed preset and swaps it in. The
    /// old table stays live until the new one is complete; its epoch carries
    /// forward plus one so voices started against it silence themselves.
    fn install_preset(&mut self, preset: &PresetConfig, base: Option<&Path>) -> bool {
        let region_total: usize = preset.groups().iter().map(|g| g.regions().len()).sum();
        if region_total == 0 {
            warn!(preset = preset.name(), "Preset contains no regions");
            return false;
        }

        let mut table = RegionTable::new();
        let mut unplayable = 0;
        for group_config in preset.groups() {
            let group_index = table.push_group(SampleGroup::from_config(group_config));
            for region_config in group_config.regions() {
                let sample = self.load_region_sample(region_config.file(), base);
                if sample.is_none() {
                    unplayable += 1;
                }
                table.push_region(group_index, SampleRegion::new(region_config, sample));
            }
        }

        table.set_epoch(self.table.epoch().wrapping_add(1));
        self.default_envelope = AdsrParams::from(preset.envelope());
        self.table = table;

        info!(
            preset = preset.name(),
            groups = self.table.group_count(),
            regions = self.table.region_count(),
            unplayable,
            memory_kb = self.loader.total_memory_usage() / 1024,
            "Preset installed"
        );
        true
    }

    /// Decodes one region's sample, resolving a relative path against the
    /// preset location. A failed load disables just that region.
    fn load_region_sample(&mut self, file: &str, base: Option<&Path>) -> Option<LoadedSample> {
        let path = if Path::new(file).is_absolute() {
            PathBuf::from(file)
        } else {
            match base {
                Some(base) => base.join(file),
                None => PathBuf::from(file),
            }
        };
        match self.loader.load(&path) {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!(file, error = %err, "Failed to load region sample, region disabled");
                None
            }
        }
    }

    /// Appends a group to the live table, loading any regions it carries,
    /// and returns the group index.
    pub fn add_group(&mut self, config: GroupConfig) -> usize {
        let group_index = self.table.push_group(SampleGroup::from_config(&config));
        for region_config in config.regions() {
            let sample = self.load_region_sample(region_config.file(), None);
            self.table
                .push_region(group_index, SampleRegion::new(region_config, sample));
        }
        group_index
    }

    /// Appends a region to the active group, creating a default group if the
    /// table has none. Returns true if the region's sample loaded and the
    /// region is playable.
    pub fn add_region(&mut self, config: RegionConfig) -> bool {
        if self.table.group_count() == 0 {
            self.table.push_group(SampleGroup::default());
        }
        let sample = self.load_region_sample(config.file(), None);
        let group_index = self.table.active_group();
        let region_index = self
            .table
            .push_region(group_index, SampleRegion::new(&config, sample));
        self.table
            .region(region_index)
            .is_some_and(SampleRegion::playable)
    }

    /// Empties the region table. Voices referring to the old contents go
    /// silent on the next block.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Manually switches the active articulation. An out-of-range index is
    /// ignored.
    pub fn set_active_group(&mut self, index: usize) {
        self.table.set_active_group(index);
    }

    /// Manually switches articulation by keyswitch note, as if the note had
    /// been played. Does nothing if no group has that keyswitch.
    pub fn set_keyswitch(&mut self, note: u8) {
        self.table.activate_keyswitch(note);
    }

    /// Returns the index of the active group.
    pub fn active_group(&self) -> usize {
        self.table.active_group()
    }

    /// Returns the number of currently sounding voices.
    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Returns the number of regions across all groups.
    pub fn region_count(&self) -> usize {
        self.table.region_count()
    }

    /// Returns the number of groups.
    pub fn group_count(&self) -> usize {
        self.table.group_count()
    }

    /// Returns the total memory used by loaded samples.
    pub fn memory_usage(&self) -> usize {
        self.loader.total_memory_usage()
    }

    /// Returns the engine sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the master volume.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Sets the master volume. Negative values are clamped to zero.
    pub fn set_master_volume(&mut self, master_volume: f32) {
        self.master_volume = master_volume.max(0.0);
    }

    /// Returns the polyphony limit.
    pub fn max_voices(&self) -> usize {
        self.pool.max_voices()
    }

    /// Sets the polyphony limit, clamped to the pool capacity. Voices in
    /// slots beyond the new limit are hard-stopped.
    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.pool.set_max_voices(max_voices);
    }

    #[cfg(test)]
    pub(crate) fn voice(&self, slot: usize) -> &super::voice::Voice {
        self.pool.voice(slot).expect("slot in range")
    }
}

impl std::fmt::Debug for SamplerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerEngine")
            .field("sample_rate", &self.sample_rate)
            .field("groups", &self.table.group_count())
            .field("regions", &self.table.region_count())
            .field("active_voices", &self.active_voice_count())
            .field("max_voices", &self.pool.max_voices())
            .field("memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
