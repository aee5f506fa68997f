use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::{AudioCommand, TriggerParams};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleId;
use super::voice::{Voice, VoiceParams};

const MAX_VOICES: usize = 32; // hard cap so the pool never grows in the callback
const MAX_PENDING: usize = 256;
const SCRATCH_FRAMES: usize = 1024;

struct Pending {
    start_frame: u64,
    params: TriggerParams,
}

pub struct Engine {
    sample_rate: f32,
    samples: HashMap<SampleId, SampleBuffer>,
    voices: Vec<Voice>,
    pending: Vec<Pending>,
    scratch: Vec<StereoFrame>,
    master_gain: f32,
    frames_rendered: u64,
    clock: Arc<AtomicU64>,
    next_age: u64,
}

impl Engine {
    pub fn new(sample_rate: u32, clock: Arc<AtomicU64>) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            samples: HashMap::new(),
            voices: Vec::with_capacity(MAX_VOICES),
            pending: Vec::with_capacity(MAX_PENDING),
            scratch: vec![StereoFrame::zero(); SCRATCH_FRAMES],
            master_gain: 1.0,
            frames_rendered: 0,
            clock,
            next_age: 0,
        }
    }

    #[cfg(test)]
    fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::UnregisterSample(id) => {
                self.samples.remove(&id);
                self.voices.retain(|v| v.sample_id != id);
                self.pending.retain(|p| p.params.sample_id != id);
            }
            AudioCommand::Trigger(t) => self.schedule(t),
            AudioCommand::StopAll => {
                self.voices.clear();
                self.pending.clear();
            }
            AudioCommand::SetMasterGain(gain) => self.master_gain = gain.clamp(0.0, 2.0),
        }
    }

    fn schedule(&mut self, t: TriggerParams) {
        if !self.samples.contains_key(&t.sample_id) {
            return; // failed or never loaded: silently inert
        }
        let start_frame = t
            .start_time
            .map(|secs| (secs.max(0.0) * self.sample_rate as f64).round() as u64)
            .unwrap_or(self.frames_rendered);
        // late triggers start now; with the queue full a future one is dropped
        if start_frame <= self.frames_rendered {
            self.start_voice(t, 0);
        } else if self.pending.len() < MAX_PENDING {
            self.pending.push(Pending { start_frame, params: t });
        }
    }

    fn start_voice(&mut self, t: TriggerParams, delay: usize) {
        let effects = t
            .effect_chain
            .iter()
            .map(|spec| spec.to_effect(self.sample_rate))
            .collect();
        let voice = Voice::new(
            t.sample_id,
            self.next_age,
            VoiceParams {
                trim_start: t.trim_start,
                length: t.length,
                pitch: t.pitch,
                gain: t.gain,
                pan: t.pan,
                delay,
            },
            effects,
        );
        self.next_age += 1;

        self.voices.retain(|v| v.active);
        if self.voices.len() >= MAX_VOICES {
            // steal the oldest
            if let Some(oldest) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age)
                .map(|(i, _)| i)
            {
                self.voices.swap_remove(oldest);
            }
        }
        self.voices.push(voice);
    }

    // promote triggers falling inside the next `frames` frames to voices,
    // carrying the intra-block offset as a start delay
    fn promote_pending(&mut self, frames: usize) {
        let block_end = self.frames_rendered + frames as u64;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].start_frame < block_end {
                let p = self.pending.swap_remove(i);
                let delay = p.start_frame.saturating_sub(self.frames_rendered) as usize;
                self.start_voice(p.params, delay);
            } else {
                i += 1;
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        for chunk in out.chunks_mut(SCRATCH_FRAMES) {
            self.promote_pending(chunk.len());
            let scratch = &mut self.scratch[..chunk.len()];
            for voice in self.voices.iter_mut() {
                if let Some(buffer) = self.samples.get(&voice.sample_id) {
                    voice.render_into(buffer, scratch, chunk);
                } else {
                    voice.active = false;
                }
            }
            if self.master_gain != 1.0 {
                for f in chunk.iter_mut() {
                    *f = f.scaled(self.master_gain);
                }
            }
            self.frames_rendered += chunk.len() as u64;
        }
        self.clock.store(self.frames_rendered, Ordering::Release);
    }
}
