pub use crate::audio::{EffectSpec, SampleBuffer, SampleId};

#[derive(Clone, Debug, PartialEq)]
pub struct TriggerParams {
    pub sample_id: SampleId,
    pub trim_start: usize,
    pub length: usize, // 0 plays to the end of the buffer
    pub gain: f32,
    pub pitch: f32,
    pub pan: f32,
    // Audio-clock time in seconds (see `AudioHandle::clock_seconds`). None
    // starts the voice with the next rendered block.
    pub start_time: Option<f64>,
    pub effect_chain: Vec<EffectSpec>,
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (it runs inside the audio callback), so a
    // decoded buffer is registered first (see loader/sample_loader.rs) ...
    RegisterSample { id: SampleId, buffer: SampleBuffer },
    UnregisterSample(SampleId),

    // ... and then triggered by id. Unknown ids are ignored.
    Trigger(TriggerParams),

    StopAll,
    SetMasterGain(f32),
}
