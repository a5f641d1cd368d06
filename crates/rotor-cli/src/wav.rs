//! Multichannel WAV reading and writing.
//!
//! Audio is kept channel-major (`Vec<Vec<f32>>`, one `Vec` per channel) so it
//! can be handed to the rotator block by block without reshuffling.

use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// Errors from reading or writing WAV files.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    /// Error from the WAV codec
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Integer bit depth the converter does not handle
    #[error("unsupported bit depth: {0} (expected 16, 24 or 32)")]
    UnsupportedBitDepth(u16),

    /// Channels passed to the writer have different lengths
    #[error("channel {channel} has {len} frames, expected {expected}")]
    RaggedChannels {
        /// Index of the offending channel
        channel: usize,
        /// Its frame count
        len: usize,
        /// Frame count of channel 0
        expected: usize,
    },
}

/// Result type for WAV operations.
pub type Result<T> = std::result::Result<T, WavError>;

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample; 32 is written as IEEE float.
    pub bits_per_sample: u16,
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file into one sample vector per channel.
///
/// Integer samples are scaled to `-1.0..1.0`.
pub fn read_wav_channels<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let hound_spec = reader.spec();
    let spec = WavSpec::from(hound_spec);
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match hound_spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = int_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((deinterleave(&interleaved, channels), spec))
}

/// Write channel-major samples to a WAV file.
///
/// `spec.channels` is taken from `channels.len()`.
pub fn write_wav_channels<P: AsRef<Path>>(
    path: P,
    channels: &[Vec<f32>],
    spec: WavSpec,
) -> Result<()> {
    let frames = channels.first().map_or(0, Vec::len);
    if let Some((channel, samples)) = channels
        .iter()
        .enumerate()
        .find(|(_, samples)| samples.len() != frames)
    {
        return Err(WavError::RaggedChannels {
            channel,
            len: samples.len(),
            expected: frames,
        });
    }

    let spec = WavSpec {
        channels: channels.len() as u16,
        ..spec
    };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for frame in 0..frames {
            for channel in channels {
                writer.write_sample(channel[frame])?;
            }
        }
    } else {
        let max_val = int_scale(spec.bits_per_sample)?;
        for frame in 0..frames {
            for channel in channels {
                let int_sample = (channel[frame] * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Split interleaved samples into `channels` vectors. A trailing partial
/// frame is dropped.
pub fn deinterleave(interleaved: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    out
}

fn int_scale(bits_per_sample: u16) -> Result<f32> {
    match bits_per_sample {
        8 | 16 | 24 => Ok((1i32 << (bits_per_sample - 1)) as f32),
        other => Err(WavError::UnsupportedBitDepth(other)),
    }
}
