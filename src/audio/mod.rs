use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::AudioCommand;

mod effect;
mod engine;
mod frame;
mod sample_buffer;
mod sample_id;
mod voice;

use engine::Engine;
use frame::StereoFrame;

pub use effect::EffectSpec;
pub use sample_buffer::SampleBuffer;
pub use sample_id::{next_sample_id, SampleId};

const COMMAND_CAPACITY: usize = 1024;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        match self.tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::warn!("audio command queue full, dropping command"),
            Err(TrySendError::Disconnected(_)) => log::error!("audio engine is gone"),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far; the time base for scheduled triggers.
    pub fn clock_seconds(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_CAPACITY);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = config.sample_rate();
    let channels = config.channels() as usize;
    let clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(sample_rate, Arc::clone(&clock));
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, engine, channels)?;
            output_stream.play().context("failed to play output stream")?;
            log::info!("audio output running: {} Hz, {} channels", sample_rate, channels);

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut frames: Vec<StereoFrame> = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            if frames.len() < n_frames {
                frames.resize(n_frames, StereoFrame::zero());
            }
            let block = &mut frames[..n_frames];
            engine.render_block(block);
            write_interleaved(block, data, channels);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// stereo frames out to whatever layout the device wants
fn write_interleaved(frames: &[StereoFrame], data: &mut [f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            for (out, f) in data.iter_mut().zip(frames) {
                *out = 0.5 * (f.left + f.right);
            }
        }
        n => {
            for (out, f) in data.chunks_exact_mut(n).zip(frames) {
                out[0] = f.left;
                out[1] = f.right;
                out[2..].fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_for_wide_layouts() {
        let frames = [StereoFrame { left: 0.1, right: 0.2 }, StereoFrame { left: 0.3, right: 0.4 }];
        let mut data = [9.0f32; 8];
        write_interleaved(&frames, &mut data, 4);
        assert_eq!(data, [0.1, 0.2, 0.0, 0.0, 0.3, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn folds_to_mono() {
        let frames = [StereoFrame { left: 1.0, right: 0.0 }];
        let mut data = [0.0f32; 1];
        write_interleaved(&frames, &mut data, 1);
        assert_eq!(data, [0.5]);
    }
}
