use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::{next_sample_id, SampleBuffer, SampleId};
use crate::audio_api::AudioCommand;
use crate::pipeline::project::SoundSlot;

/// Every `.wav` directly inside `dir`, sorted by path.
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read '{}'", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_wav(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<(SampleId, SampleBuffer)> {
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    let id = next_sample_id();
    Ok((id, buffer))
}

/// (Re)load the slot's sample. Returns the commands that drop the buffer it
/// held before and register the new one. On failure the slot is left empty,
/// so its steps stay silent.
pub fn load_slot(slot: &mut SoundSlot, target_rate: u32) -> Vec<AudioCommand> {
    let mut cmds: Vec<AudioCommand> =
        slot.sample_id.take().map(AudioCommand::UnregisterSample).into_iter().collect();
    if slot.sample_path.is_empty() {
        return cmds;
    }
    match load(Path::new(&slot.sample_path), target_rate) {
        Ok((_, buffer)) if buffer.is_empty() => {
            log::warn!("track '{}' left empty: no audio frames", slot.name);
        }
        Ok((id, buffer)) => {
            log::info!("loaded '{}' as {id} ({} frames)", slot.name, buffer.len());
            slot.sample_id = Some(id);
            cmds.push(AudioCommand::RegisterSample { id, buffer });
        }
        Err(e) => log::warn!("track '{}' left empty: {e:#}", slot.name),
    }
    cmds
}

pub fn load_kit(slots: &mut [SoundSlot], target_rate: u32) -> Vec<AudioCommand> {
    slots.iter_mut().flat_map(|slot| load_slot(slot, target_rate)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("drumtoys-loader-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_click(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            w.write_sample(if i == 0 { i16::MAX } else { 0 }).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn index_finds_wavs_sorted_case_insensitive() {
        let dir = temp_dir("index");
        write_click(&dir.join("b_snare.WAV"), 4);
        write_click(&dir.join("a_kick.wav"), 4);
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(dir.join("sub.wav")).unwrap();

        let found = index_wav_in_dir(&dir).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_kick.wav", "b_snare.WAV"]);
    }

    #[test]
    fn index_of_missing_dir_is_an_error() {
        assert!(index_wav_in_dir(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn kit_loads_good_slots_and_skips_bad_ones() {
        let dir = temp_dir("kit");
        let good = dir.join("kick.wav");
        write_click(&good, 80);
        let bad = dir.join("broken.wav");
        std::fs::write(&bad, b"RIFF nope").unwrap();

        let mut slots = vec![
            SoundSlot::from_path(&good),
            SoundSlot::from_path(&bad),
            SoundSlot::from_path(&dir.join("gone.wav")),
        ];
        let cmds = load_kit(&mut slots, 16000);

        assert_eq!(cmds.len(), 1);
        assert!(slots[0].is_loaded());
        assert!(!slots[1].is_loaded());
        assert!(!slots[2].is_loaded());
        match &cmds[0] {
            AudioCommand::RegisterSample { id, buffer } => {
                assert_eq!(Some(*id), slots[0].sample_id);
                assert_eq!(buffer.len(), 160);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn reloading_mints_a_fresh_id_and_drops_the_old_one() {
        let dir = temp_dir("reload");
        let path = dir.join("hat.wav");
        write_click(&path, 8);
        let mut slot = SoundSlot::from_path(&path);
        assert_eq!(load_slot(&mut slot, 8000).len(), 1);
        let first = slot.sample_id.unwrap();

        let cmds = load_slot(&mut slot, 8000);
        assert_ne!(slot.sample_id, Some(first));
        assert_eq!(cmds.len(), 2);
        assert!(matches!(cmds[0], AudioCommand::UnregisterSample(id) if id == first));
        assert!(matches!(cmds[1], AudioCommand::RegisterSample { .. }));

        std::fs::remove_file(&path).unwrap();
        let cmds = load_slot(&mut slot, 8000);
        assert!(!slot.is_loaded());
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], AudioCommand::UnregisterSample(_)));
    }

    #[test]
    fn wav_without_frames_leaves_the_slot_empty() {
        let dir = temp_dir("silent");
        let path = dir.join("empty.wav");
        write_click(&path, 0);
        let mut slot = SoundSlot::from_path(&path);
        assert!(load_slot(&mut slot, 8000).is_empty());
        assert!(!slot.is_loaded());
    }
}
