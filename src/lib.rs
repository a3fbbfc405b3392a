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

//! A sample-based polyphonic sampler voice engine.
//!
//! The engine turns note on/off events into mixed, interleaved stereo audio.
//! A host drives it synchronously, one fixed-size block at a time:
//!
//! - Presets (groups of key/velocity-mapped sample regions) are loaded from
//!   JSON or built programmatically. All sample files are decoded into memory
//!   up front so that triggering a note never touches the filesystem.
//! - `note_on` resolves a region through the active group (honoring
//!   keyswitches, velocity layers, and round-robin cycling) and claims a slot
//!   in a fixed-capacity voice pool, stealing the oldest voice if necessary.
//! - `generate_block` renders every active voice with pitch-shifted,
//!   linear-interpolated playback shaped by a per-voice ADSR envelope, then
//!   sums, normalizes, and interleaves the result.
//!
//! The render path performs no allocation, no locking, and no I/O.

pub mod config;
pub mod sample;
pub mod sampler;

pub use config::{GroupConfig, PresetConfig, RegionConfig};
pub use sampler::{EngineConfig, SamplerEngine};
