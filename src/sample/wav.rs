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

use hound::WavReader;

use super::error::SampleError;

/// Raw decoded audio: interleaved f32 samples at the file's native channel
/// count and sample rate.
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Number of channels.
    pub channels: u16,
    /// Native sample rate of the file.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Decodes a RIFF/WAVE file into interleaved f32 samples.
///
/// Supported encodings are 16-bit PCM, 24-bit PCM (sign-extended), and
/// 32-bit IEEE float. Any other bit depth or codec fails with
/// [`SampleError::UnsupportedFormat`] so the caller can skip just that file.
pub fn decode_wav<P: AsRef<Path>>(path: P) -> Result<DecodedAudio, SampleError> {
    let mut reader = WavReader::open(&path)?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(SampleError::NoChannels(
            path.as_ref().display().to_string(),
        ));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()?,
        (hound::SampleFormat::Int, 16) | (hound::SampleFormat::Int, 24) => {
            // hound sign-extends 24-bit samples into i32 for us.
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 * scale))
                .collect::<Result<Vec<f32>, hound::Error>>()?
        }
        (format, bits) => {
            return Err(SampleError::UnsupportedFormat {
                bits,
                format: match format {
                    hound::SampleFormat::Float => "float",
                    hound::SampleFormat::Int => "int",
                },
            })
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
