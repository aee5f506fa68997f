use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

/// A decoded sample, always stereo and already at the engine's output rate.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
}

impl SampleBuffer {
    pub fn from_frames(data: Vec<StereoFrame>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Load a WAV file from disk into the sample buffer
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        let spec = reader.spec();
        let file_channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, scale into -1..1
                let max = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames = interleaved_to_stereo(&samples, file_channels);
        let frames = resample_linear(&frames, spec.sample_rate, target_rate);
        log::debug!(
            "decoded '{}': {} ch, {} Hz, {} frames",
            path.display(),
            file_channels,
            spec.sample_rate,
            frames.len()
        );
        Ok(Self { data: frames })
    }
}

// mono is duplicated, anything wider than stereo keeps its first two channels
fn interleaved_to_stereo(samples: &[f32], channels: usize) -> Vec<StereoFrame> {
    match channels {
        1 => samples.iter().map(|&x| StereoFrame::mono(x)).collect(),
        n => samples
            .chunks_exact(n)
            .map(|c| StereoFrame { left: c[0], right: c[1] })
            .collect(),
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= frames.len().saturating_sub(1) {
            out.push(frames.last().copied().unwrap_or_default());
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("drumtoys-buf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn mono_wav_is_duplicated_to_stereo() {
        let path = temp_path("mono.wav");
        write_wav(&path, 1, 44100, &[16384, -16384, 0]);
        let buf = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buf.len(), 3);
        assert!((buf.data[0].left - 0.5).abs() < 1e-4);
        assert_eq!(buf.data[0].left, buf.data[0].right);
        assert!((buf.data[1].right + 0.5).abs() < 1e-4);
    }

    #[test]
    fn stereo_wav_keeps_channels() {
        let path = temp_path("stereo.wav");
        write_wav(&path, 2, 44100, &[16384, 0, 0, -16384]);
        let buf = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buf.len(), 2);
        assert!(buf.data[0].right.abs() < 1e-6);
        assert!((buf.data[1].right + 0.5).abs() < 1e-4);
    }

    #[test]
    fn resampling_scales_length() {
        let frames = vec![StereoFrame::mono(1.0); 100];
        assert_eq!(resample_linear(&frames, 22050, 44100).len(), 200);
        assert_eq!(resample_linear(&frames, 48000, 48000).len(), 100);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SampleBuffer::load_wav(Path::new("/nonexistent/kick.wav"), 44100).is_err());
    }
}
