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

//! Per-voice ADSR amplitude envelope.

use crate::config::{EnvelopeConfig, EnvelopeOverrideConfig};

/// Minimum stage duration in seconds. Stages shorter than this are clamped
/// to avoid division by zero and audible clicks.
const MIN_STAGE_SECS: f32 = 0.001;

/// The stage of an ADSR envelope. A voice is active iff its envelope stage
/// is not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    /// Not sounding; the owning voice slot is free.
    #[default]
    Idle,
    /// Linear ramp from 0 to 1 over the attack time.
    Attack,
    /// Linear ramp from 1 down to the sustain level over the decay time.
    Decay,
    /// Held at the sustain level until released.
    Sustain,
    /// Linear ramp from the captured release-start value down to 0.
    Release,
}

/// Resolved ADSR parameters, fixed for the lifetime of one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level (0.0 to 1.0).
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
}

impl From<&EnvelopeConfig> for AdsrParams {
    fn from(envelope: &EnvelopeConfig) -> Self {
        Self {
            attack: envelope.attack(),
            decay: envelope.decay(),
            sustain: envelope.sustain(),
            release: envelope.release(),
        }
    }
}

impl AdsrParams {
    /// Applies a group override on top of these defaults. Negative override
    /// fields inherit the default value for that stage.
    pub fn with_override(&self, envelope_override: &EnvelopeOverrideConfig) -> AdsrParams {
        fn pick(value: f32, fallback: f32) -> f32 {
            if value >= 0.0 {
                value
            } else {
                fallback
            }
        }
        AdsrParams {
            attack: pick(envelope_override.attack(), self.attack),
            decay: pick(envelope_override.decay(), self.decay),
            sustain: pick(envelope_override.sustain(), self.sustain),
            release: pick(envelope_override.release(), self.release),
        }
    }
}

/// A linear ADSR state machine advanced one sample at a time.
///
/// Parameters are resolved once at trigger time; `Release` is reachable from
/// any non-idle stage and captures the current output value so an early
/// note-off mid-attack releases from where the ramp actually is.
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    value: f32,
    progress: f32,
    release_start: f32,
    params: AdsrParams,
    /// Elapsed time per sample (1 / sample rate).
    dt: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            stage: EnvelopeStage::Idle,
            value: 0.0,
            progress: 0.0,
            release_start: 0.0,
            params: AdsrParams {
                attack: 0.0,
                decay: 0.0,
                sustain: 0.0,
                release: 0.0,
            },
            dt: 0.0,
        }
    }
}

impl Envelope {
    /// Starts the envelope in Attack with the given resolved parameters.
    pub fn trigger(&mut self, params: AdsrParams, sample_rate: f32) {
        self.stage = EnvelopeStage::Attack;
        self.value = 0.0;
        self.progress = 0.0;
        self.release_start = 0.0;
        self.params = params;
        self.dt = 1.0 / sample_rate;
    }

    /// Forces the envelope into Release from any non-idle stage, capturing
    /// the current output value as the release starting point.
    pub fn release(&mut self) {
        match self.stage {
            EnvelopeStage::Idle | EnvelopeStage::Release => {}
            _ => {
                self.release_start = self.value;
                self.progress = 0.0;
                self.stage = EnvelopeStage::Release;
            }
        }
    }

    /// Immediately silences the envelope, returning the slot to Idle.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.value = 0.0;
        self.progress = 0.0;
        self.release_start = 0.0;
    }

    /// Advances the envelope by one sample and returns the new output value.
    pub fn next(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.value = 0.0;
            }
            EnvelopeStage::Attack => {
                self.progress += self.dt / self.params.attack.max(MIN_STAGE_SECS);
                if self.progress >= 1.0 {
                    self.progress = 0.0;
                    self.stage = EnvelopeStage::Decay;
                    self.value = 1.0;
                } else {
                    self.value = self.progress;
                }
            }
            EnvelopeStage::Decay => {
                self.progress += self.dt / self.params.decay.max(MIN_STAGE_SECS);
                if self.progress >= 1.0 {
                    self.progress = 0.0;
                    self.stage = EnvelopeStage::Sustain;
                    self.value = self.params.sustain;
                } else {
                    self.value = 1.0 - self.progress * (1.0 - self.params.sustain);
                }
            }
            EnvelopeStage::Sustain => {
                self.value = self.params.sustain;
            }
            EnvelopeStage::Release => {
                self.progress += self.dt / self.params.release.max(MIN_STAGE_SECS);
                if self.progress >= 1.0 {
                    self.progress = 0.0;
                    self.stage = EnvelopeStage::Idle;
                    self.value = 0.0;
                } else {
                    self.value = self.release_start * (1.0 - self.progress);
                }
            }
        }
        self.value
    }

    /// Returns the current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Returns the current output value without advancing.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Returns true if the envelope is idle (the voice slot is free).
    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }
}
