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
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::error::SampleError;
use super::wav::decode_wav;

/// A decoded sample normalized to stereo interleaved f32 at the engine rate.
/// The sample data is stored in an Arc for efficient sharing between voices.
#[derive(Clone)]
pub struct LoadedSample {
    /// Stereo interleaved samples (frame * 2 + channel indexing).
    data: Arc<Vec<f32>>,
    /// Number of frames.
    frames: usize,
    /// Engine sample rate the data was resampled to.
    sample_rate: u32,
    /// Native sample rate of the source file, kept for rescaling frame
    /// positions (e.g. loop points) authored against the source.
    source_rate: u32,
}

impl LoadedSample {
    pub(crate) fn new(data: Vec<f32>, sample_rate: u32, source_rate: u32) -> Self {
        let frames = data.len() / 2;
        Self {
            data: Arc::new(data),
            frames,
            sample_rate,
            source_rate,
        }
    }

    /// Returns the stereo interleaved sample data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns the engine sample rate of the data.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Rescales a frame position authored against the source file into this
    /// sample's engine-rate frame units.
    pub fn scale_source_frame(&self, frame: u64) -> u64 {
        if self.source_rate == self.sample_rate {
            return frame;
        }
        let ratio = self.sample_rate as f64 / self.source_rate as f64;
        (frame as f64 * ratio).round() as u64
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Manages loading and caching of sample data.
///
/// Loading happens on the control plane (preset installation), never on the
/// note trigger path: by the time a region is playable its sample is already
/// resident in memory.
pub struct SampleLoader {
    /// Cache of loaded samples by file path.
    cache: HashMap<PathBuf, LoadedSample>,
    /// Target sample rate for resampling (matches the engine output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Returns the engine sample rate samples are normalized to.
    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<LoadedSample, SampleError> {
        if let Some(sample) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        info!(path = ?path, "Loading sample into memory");

        let decoded = decode_wav(path)?;
        let source_rate = decoded.sample_rate;
        let stereo = to_stereo(&decoded.samples, decoded.channels);

        let final_samples = if source_rate != self.target_sample_rate {
            info!(
                source_rate,
                target_rate = self.target_sample_rate,
                "Resampling sample"
            );
            resample_stereo(&stereo, source_rate, self.target_sample_rate)
        } else {
            stereo
        };

        let loaded = LoadedSample::new(final_samples, self.target_sample_rate, source_rate);

        info!(
            path = ?path,
            frames = loaded.frames(),
            sample_rate = loaded.sample_rate(),
            memory_kb = loaded.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Folds interleaved samples of any channel count down to stereo.
/// Mono sources are duplicated to both channels; sources with more than two
/// channels keep their first two.
fn to_stereo(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels as usize;
    match channels {
        0 => Vec::new(),
        1 => {
            let mut stereo = Vec::with_capacity(samples.len() * 2);
            for &sample in samples {
                stereo.push(sample);
                stereo.push(sample);
            }
            stereo
        }
        2 => samples.to_vec(),
        _ => {
            let frames = samples.len() / channels;
            let mut stereo = Vec::with_capacity(frames * 2);
            for frame in 0..frames {
                stereo.push(samples[frame * channels]);
                stereo.push(samples[frame * channels + 1]);
            }
            stereo
        }
    }
}

/// Resamples stereo interleaved audio with linear interpolation.
/// Linear interpolation is simpler than a windowed-sinc resampler and
/// sufficient for one-shot and looped instrument samples.
fn resample_stereo(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / 2;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * 2);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..2 {
            let idx0 = source_frame * 2 + channel;
            let idx1 = (source_frame + 1) * 2 + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_rate_match_is_lossless_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same_rate.wav");
        let samples: Vec<i16> = (0..200).map(|i| (i * 50) as i16).collect();
        write_wav(&path, 2, 44100, &samples);

        let mut loader = SampleLoader::new(44100);
        let loaded = loader.load(&path).unwrap();

        // 200 interleaved stereo samples = 100 frames, preserved exactly.
        assert_eq!(loaded.frames(), 100);
        assert!((loaded.data()[3] - 150.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_mono_duplicated_to_both_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 44100, &[0, 1000, 2000, 3000]);

        let mut loader = SampleLoader::new(44100);
        let loaded = loader.load(&path).unwrap();

        assert_eq!(loaded.frames(), 4);
        assert!((loaded.data()[2] - loaded.data()[3]).abs() < 1e-9);
        assert!((loaded.data()[2] - 1000.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_changes_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate.wav");
        let samples: Vec<i16> = (0..441).flat_map(|i| [i as i16, i as i16]).collect();
        write_wav(&path, 2, 44100, &samples);

        let mut loader = SampleLoader::new(48000);
        let loaded = loader.load(&path).unwrap();

        let expected = (441.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(loaded.frames(), expected);
        assert_eq!(loaded.sample_rate(), 48000);
    }

    #[test]
    fn test_loop_points_rescale_with_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loops.wav");
        let samples: Vec<i16> = vec![0; 2000];
        write_wav(&path, 2, 22050, &samples);

        let mut loader = SampleLoader::new(44100);
        let loaded = loader.load(&path).unwrap();

        // 22050 -> 44100 doubles frame positions.
        assert_eq!(loaded.scale_source_frame(100), 200);
        assert_eq!(loaded.scale_source_frame(0), 0);
    }

    #[test]
    fn test_cache_shares_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.wav");
        write_wav(&path, 2, 44100, &[1, 2, 3, 4]);

        let mut loader = SampleLoader::new(44100);
        let first = loader.load(&path).unwrap();
        let second = loader.load(&path).unwrap();

        assert!(Arc::ptr_eq(&first.data, &second.data));
        assert_eq!(loader.total_memory_usage(), first.memory_size());
    }

    #[test]
    fn test_multichannel_folds_to_first_two() {
        let interleaved = vec![
            1.0, 2.0, 3.0, 4.0, // frame 0 of a 4-channel source
            5.0, 6.0, 7.0, 8.0, // frame 1
        ];
        let stereo = to_stereo(&interleaved, 4);
        assert_eq!(stereo, vec![1.0, 2.0, 5.0, 6.0]);
    }
}
