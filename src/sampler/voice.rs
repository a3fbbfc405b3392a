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

//! One slot of the voice pool: pitch-shifted, envelope-shaped sample playback.

use super::envelope::{AdsrParams, Envelope, EnvelopeStage};
use super::region::{RegionTable, SampleRegion};

/// Computes the playback-rate multiplier for a note played against a region's
/// root note, with equal-temperament scaling plus a cent offset.
fn pitch_ratio(note: u8, root_note: u8, tune_cents: i32) -> f64 {
    let semitones = note as f64 - root_note as f64;
    2.0f64.powf(semitones / 12.0 + tune_cents as f64 / 1200.0)
}

/// A single playback voice.
///
/// A voice refers to its region by stable arena index plus the table epoch
/// the index was taken from; if the table has been replaced since the voice
/// started, the voice silences itself instead of reading a stale region.
/// A voice is active iff its envelope stage is not idle.
#[derive(Clone, Default)]
pub struct Voice {
    /// Arena index of the region being played.
    region_index: usize,
    /// Table epoch the region index is valid for.
    epoch: u64,
    /// The MIDI note that triggered this voice, for note-off matching.
    note: u8,
    /// Monotonically increasing trigger ordinal, used for oldest-first
    /// stealing.
    note_id: u64,
    /// Fractional read position in engine-rate frames.
    position: f64,
    /// Playback-rate multiplier added to the position every output sample.
    pitch: f64,
    /// Gain from the note-on velocity.
    velocity_gain: f32,
    /// Linear gain from the region and group volumes.
    volume_scale: f32,
    /// Left/right gains from the linear pan law.
    pan_left: f32,
    pan_right: f32,
    /// Amplitude envelope.
    envelope: Envelope,
}

impl Voice {
    /// Starts this voice playing a region from position zero.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        region_index: usize,
        epoch: u64,
        region: &SampleRegion,
        note: u8,
        velocity: f32,
        volume_scale: f32,
        adsr: AdsrParams,
        note_id: u64,
        sample_rate: f32,
    ) {
        let pan = region.pan();
        self.region_index = region_index;
        self.epoch = epoch;
        self.note = note;
        self.note_id = note_id;
        self.position = 0.0;
        self.pitch = pitch_ratio(note, region.root_note(), region.tune_cents());
        self.velocity_gain = velocity.clamp(0.0, 1.0);
        self.volume_scale = volume_scale;
        self.pan_left = 1.0 - pan.max(0.0);
        self.pan_right = 1.0 + pan.min(0.0);
        self.envelope.trigger(adsr, sample_rate);
    }

    /// Returns true if this voice is sounding (in any non-idle envelope
    /// stage, including release).
    pub fn is_active(&self) -> bool {
        !self.envelope.is_idle()
    }

    /// Returns true if this voice is in its release tail.
    pub fn is_releasing(&self) -> bool {
        self.envelope.stage() == EnvelopeStage::Release
    }

    /// Returns the MIDI note that triggered this voice.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Returns this voice's trigger ordinal.
    pub fn note_id(&self) -> u64 {
        self.note_id
    }

    /// Returns the envelope stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    /// Returns the arena index of the region being played.
    pub fn region_index(&self) -> usize {
        self.region_index
    }

    /// Returns the playback-rate multiplier.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Returns the fractional read position in engine-rate frames.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Gracefully stops this voice by putting its envelope into release.
    pub fn release(&mut self) {
        self.envelope.release();
    }

    /// Hard-stops this voice, returning the slot to the free pool with zero
    /// output.
    pub fn reset(&mut self) {
        self.envelope.reset();
    }

    /// Renders into the stereo accumulators, advancing the envelope and the
    /// read position in lock-step, one sample at a time.
    ///
    /// Looping wraps the position back into the loop with its fractional
    /// offset preserved. A non-looping voice that reaches the end of its
    /// sample holds the final frame and goes into release, so one-shots end
    /// with the envelope tail rather than a hard cut. A voice whose region
    /// index no longer matches the live table silences itself.
    pub fn render(&mut self, table: &RegionTable, left: &mut [f32], right: &mut [f32]) {
        if self.envelope.is_idle() {
            return;
        }
        let region = match table.region(self.region_index) {
            Some(region) if self.epoch == table.epoch() => region,
            _ => {
                self.envelope.reset();
                return;
            }
        };
        let Some(sample) = region.sample().filter(|sample| sample.frames() > 0) else {
            self.envelope.reset();
            return;
        };
        let data = sample.data();
        let frames = sample.frames();
        let loop_enabled = region.loop_enabled();
        let loop_start = region.loop_start() as f64;
        let loop_end = region.loop_end() as f64;
        let end = frames as f64;

        for (out_left, out_right) in left.iter_mut().zip(right.iter_mut()) {
            if loop_enabled {
                if self.position >= loop_end {
                    self.position = loop_start + (self.position - loop_start) % (loop_end - loop_start);
                }
            } else if self.position >= end {
                self.position = end;
                self.envelope.release();
            }

            let value = self.envelope.next();
            if self.envelope.is_idle() {
                break;
            }

            let frame = self.position as usize;
            let frame0 = frame.min(frames - 1);
            let frame1 = (frame0 + 1).min(frames - 1);
            let frac = (self.position - frame as f64) as f32;

            let left_sample = data[frame0 * 2] + (data[frame1 * 2] - data[frame0 * 2]) * frac;
            let right_sample =
                data[frame0 * 2 + 1] + (data[frame1 * 2 + 1] - data[frame0 * 2 + 1]) * frac;

            let amplitude = value * self.velocity_gain * self.volume_scale;
            *out_left += left_sample * amplitude * self.pan_left;
            *out_right += right_sample * amplitude * self.pan_right;

            self.position += self.pitch;
        }
    }
}
