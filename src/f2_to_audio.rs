/*! F2 frames to audio.

Pairs the corrected F2 frame stream with the section (Q channel)
stream and writes raw 44.1 kHz signed 16 bit stereo PCM: one section is
98 F2 frames of 24 bytes, 588 stereo samples, 2352 bytes.

Audio bytes are copied through verbatim while the encoder is running.
A lead-in section, or a subdivision of zero (encoding paused), writes
silence instead. Per-section Q metadata is accumulated and flushed to
a JSON sidecar when the streams end.
*/
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info};
use serde::Serialize;

use crate::block::{Block, BlockRet};
use crate::f2frame::F2Frame;
use crate::section::{FRAMES_PER_SECTION, Section};
use crate::stream::Streamp;

/// Samples per F2 frame (24 bytes, 16 bit stereo).
const SAMPLES_PER_F2: u64 = 6;

/// Counters kept by the audio converter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioStatistics {
    pub valid_samples: u64,
    pub invalid_samples: u64,
    pub sections_processed: u64,
    pub encoder_running: u64,
    pub encoder_stopped: u64,
    pub q_mode_1: u64,
    pub q_mode_4: u64,
    pub q_mode_invalid: u64,
}

/// One record of the metadata sidecar.
#[derive(Serialize)]
struct SidecarRecord {
    #[serde(rename = "seqNo")]
    seq_no: usize,
    #[serde(rename = "qControl")]
    q_control: SidecarControl,
    #[serde(rename = "qData")]
    q_data: SidecarData,
}

#[derive(Serialize)]
struct SidecarControl {
    #[serde(rename = "isAudio")]
    is_audio: bool,
    #[serde(rename = "isStereo")]
    is_stereo: bool,
    #[serde(rename = "isNoPreemp")]
    is_no_preemp: bool,
    #[serde(rename = "isCopyProtected")]
    is_copy_protected: bool,
}

#[derive(Serialize)]
struct SidecarData {
    #[serde(rename = "qMode")]
    q_mode: i32,
    #[serde(rename = "isLeadIn")]
    is_lead_in: bool,
    #[serde(rename = "isLeadOut")]
    is_lead_out: bool,
    #[serde(rename = "trackNumber")]
    track_number: i32,
    point: i32,
    x: i32,
    #[serde(rename = "trackTime")]
    track_time: String,
    #[serde(rename = "discTime")]
    disc_time: String,
}

#[derive(Serialize)]
struct Sidecar {
    sections: Vec<SidecarRecord>,
}

/// The section assembler: F2 frames plus sections in, PCM out.
pub struct F2FramesToAudio {
    src_f2: Streamp<F2Frame>,
    src_sections: Streamp<Section>,

    f2_queue: std::collections::VecDeque<F2Frame>,
    section_queue: std::collections::VecDeque<Section>,

    audio: Box<dyn Write>,
    metadata_path: Option<PathBuf>,
    records: Vec<SidecarRecord>,
    statistics: AudioStatistics,
}

impl F2FramesToAudio {
    /// Create a converter writing PCM to a file, with an optional
    /// metadata sidecar written on close.
    pub fn new(
        src_f2: Streamp<F2Frame>,
        src_sections: Streamp<Section>,
        audio_path: &Path,
        metadata_path: Option<&Path>,
    ) -> Result<Self> {
        debug!("Opening audio sink {}", audio_path.display());
        Ok(Self::to_writer(
            src_f2,
            src_sections,
            Box::new(std::fs::File::create(audio_path)?),
            metadata_path,
        ))
    }

    /// Create a converter writing PCM to any writer.
    pub fn to_writer(
        src_f2: Streamp<F2Frame>,
        src_sections: Streamp<Section>,
        audio: Box<dyn Write>,
        metadata_path: Option<&Path>,
    ) -> Self {
        Self {
            src_f2,
            src_sections,
            f2_queue: std::collections::VecDeque::new(),
            section_queue: std::collections::VecDeque::new(),
            audio,
            metadata_path: metadata_path.map(|p| p.to_path_buf()),
            records: Vec::new(),
            statistics: AudioStatistics::default(),
        }
    }

    /// Counters so far.
    pub fn statistics(&self) -> AudioStatistics {
        self.statistics
    }

    /// Interpret a section's Q metadata, updating the statistics and
    /// the sidecar records. Returns whether the encoder is running.
    fn section_to_meta(&mut self, section: &Section) -> bool {
        let d = &section.q_data;
        let encoder_running = match section.q_mode {
            1 | 4 => {
                if section.q_mode == 1 {
                    self.statistics.q_mode_1 += 1;
                } else {
                    self.statistics.q_mode_4 += 1;
                }
                if d.is_lead_in {
                    false
                } else {
                    // Paused when the subdivision is zero, for both
                    // lead-out and program sections.
                    d.x != 0
                }
            }
            _ => {
                self.statistics.q_mode_invalid += 1;
                // Unknown Q mode: assume the encoder is running.
                // Perhaps this should default to false?
                true
            }
        };

        if encoder_running {
            self.statistics.encoder_running += 1;
        } else {
            self.statistics.encoder_stopped += 1;
        }

        self.records.push(SidecarRecord {
            seq_no: self.records.len(),
            q_control: SidecarControl {
                is_audio: section.q_control.is_audio,
                is_stereo: section.q_control.is_stereo,
                is_no_preemp: section.q_control.is_no_preemp,
                is_copy_protected: section.q_control.is_copy_protected,
            },
            q_data: SidecarData {
                q_mode: section.q_mode,
                is_lead_in: d.is_lead_in,
                is_lead_out: d.is_lead_out,
                track_number: d.track_number,
                point: d.point,
                x: d.x,
                track_time: d.track_time.to_string(),
                disc_time: d.disc_time.to_string(),
            },
        });

        encoder_running
    }

    /// Emit the audio for one section: 98 F2 frames.
    fn process_section(&mut self) -> crate::Result<()> {
        let section = self.section_queue.pop_front().unwrap();
        let encoder_running = self.section_to_meta(&section);

        for _ in 0..FRAMES_PER_SECTION {
            let f2 = self.f2_queue.pop_front().unwrap();
            if encoder_running {
                if f2.is_data_valid() {
                    self.statistics.valid_samples += SAMPLES_PER_F2;
                } else {
                    self.statistics.invalid_samples += SAMPLES_PER_F2;
                }
                self.audio.write_all(f2.data_symbols())?;
            } else {
                self.audio.write_all(&[0u8; 24])?;
            }
        }
        self.statistics.sections_processed += 1;
        Ok(())
    }

    /// Write the metadata sidecar document.
    fn flush_metadata(&mut self) -> crate::Result<()> {
        let Some(path) = &self.metadata_path else {
            return Ok(());
        };
        debug!("writing metadata sidecar {}", path.display());
        let doc = Sidecar {
            sections: std::mem::take(&mut self.records),
        };
        let f = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(f, &doc)
            .map_err(|e| crate::Error::new(&format!("writing metadata: {}", e)))?;
        Ok(())
    }
}

impl Block for F2FramesToAudio {
    fn block_name(&self) -> &'static str {
        "F2FramesToAudio"
    }

    fn work(&mut self) -> crate::Result<BlockRet> {
        let fbind = self.src_f2.clone();
        let sbind = self.src_sections.clone();
        let (f2_eof, sec_eof) = {
            let mut f2 = fbind.lock().unwrap();
            while let Some(f) = f2.pop() {
                self.f2_queue.push_back(f);
            }
            let mut sections = sbind.lock().unwrap();
            while let Some(s) = sections.pop() {
                self.section_queue.push_back(s);
            }
            (f2.eof(), sections.eof())
        };

        let mut progress = false;
        while self.f2_queue.len() >= FRAMES_PER_SECTION && !self.section_queue.is_empty() {
            self.process_section()?;
            progress = true;
        }

        if f2_eof && sec_eof {
            self.audio.flush()?;
            self.flush_metadata()?;
            let s = self.statistics;
            info!(
                "audio: {} sections, {} valid samples, {} invalid samples",
                s.sections_processed, s.valid_samples, s.invalid_samples
            );
            info!(
                "audio: {} running, {} stopped; Q modes: {} CD, {} LD, {} invalid",
                s.encoder_running, s.encoder_stopped, s.q_mode_1, s.q_mode_4, s.q_mode_invalid
            );
            return Ok(BlockRet::EOF);
        }
        if progress {
            Ok(BlockRet::Ok)
        } else {
            Ok(BlockRet::Noop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::f2frame::F2_SYMBOLS;
    use crate::section::{QControl, QData};
    use crate::stream::new_streamp;

    fn section(q_mode: i32, lead_in: bool, x: i32) -> Section {
        Section {
            q_mode,
            q_control: QControl {
                is_audio: true,
                is_stereo: true,
                is_no_preemp: true,
                is_copy_protected: true,
            },
            q_data: QData {
                is_lead_in: lead_in,
                is_lead_out: false,
                track_number: 1,
                point: x,
                x,
                ..Default::default()
            },
        }
    }

    fn run_one_section(sec: Section, frame: F2Frame) -> Result<(Vec<u8>, AudioStatistics)> {
        let tmpd = tempfile::tempdir()?;
        let audio_path = tmpd.path().join("audio.pcm");
        let src_f2 = new_streamp();
        let src_sections = new_streamp();
        let mut conv = F2FramesToAudio::new(src_f2.clone(), src_sections.clone(), &audio_path, None)?;
        {
            let mut s = src_f2.lock().unwrap();
            for _ in 0..FRAMES_PER_SECTION {
                s.push(frame.clone());
            }
            s.set_eof();
            let mut q = src_sections.lock().unwrap();
            q.push(sec);
            q.set_eof();
        }
        while !matches!(conv.work()?, BlockRet::EOF) {}
        let stats = conv.statistics();
        drop(conv);
        Ok((std::fs::read(&audio_path)?, stats))
    }

    #[test]
    fn running_section_copies_audio() -> Result<()> {
        let frame = F2Frame::new([0x5a; F2_SYMBOLS], [0; F2_SYMBOLS]);
        let (audio, stats) = run_one_section(section(1, false, 1), frame)?;
        assert_eq!(audio.len(), 2352);
        assert!(audio.iter().all(|&b| b == 0x5a));
        assert_eq!(stats.valid_samples, 588);
        assert_eq!(stats.invalid_samples, 0);
        assert_eq!(stats.encoder_running, 1);
        Ok(())
    }

    #[test]
    fn stopped_section_writes_silence() -> Result<()> {
        let frame = F2Frame::new([0x5a; F2_SYMBOLS], [0; F2_SYMBOLS]);
        let (audio, stats) = run_one_section(section(1, true, 1), frame)?;
        assert_eq!(audio.len(), 2352);
        assert!(audio.iter().all(|&b| b == 0));
        assert_eq!(stats.valid_samples, 0);
        assert_eq!(stats.encoder_stopped, 1);
        Ok(())
    }

    #[test]
    fn paused_section_writes_silence() -> Result<()> {
        let frame = F2Frame::new([0x11; F2_SYMBOLS], [0; F2_SYMBOLS]);
        let (audio, _) = run_one_section(section(4, false, 0), frame)?;
        assert!(audio.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn invalid_mode_keeps_encoder_running() -> Result<()> {
        let frame = F2Frame::new([0x77; F2_SYMBOLS], [0; F2_SYMBOLS]);
        let (audio, stats) = run_one_section(section(-1, false, 0), frame)?;
        assert!(audio.iter().all(|&b| b == 0x77));
        assert_eq!(stats.q_mode_invalid, 1);
        assert_eq!(stats.encoder_running, 1);
        Ok(())
    }

    #[test]
    fn invalid_frames_counted() -> Result<()> {
        let mut errors = [0u8; F2_SYMBOLS];
        errors[0] = 1;
        let frame = F2Frame::new([0x5a; F2_SYMBOLS], errors);
        let (_, stats) = run_one_section(section(1, false, 1), frame)?;
        assert_eq!(stats.invalid_samples, 588);
        assert_eq!(stats.valid_samples, 0);
        Ok(())
    }

    #[test]
    fn metadata_sidecar_written() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let audio_path = tmpd.path().join("audio.pcm");
        let meta_path = tmpd.path().join("audio.json");
        let src_f2 = new_streamp();
        let src_sections = new_streamp();
        let mut conv = F2FramesToAudio::new(
            src_f2.clone(),
            src_sections.clone(),
            &audio_path,
            Some(&meta_path),
        )?;
        {
            let mut s = src_f2.lock().unwrap();
            for _ in 0..2 * FRAMES_PER_SECTION {
                s.push(F2Frame::default());
            }
            s.set_eof();
            let mut q = src_sections.lock().unwrap();
            q.push(section(1, false, 1));
            q.push(section(4, false, 2));
            q.set_eof();
        }
        while !matches!(conv.work()?, BlockRet::EOF) {}
        drop(conv);

        let doc: serde_json::Value = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
        let sections = doc["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0]["seqNo"], 0);
        assert_eq!(sections[0]["qData"]["qMode"], 1);
        assert_eq!(sections[1]["seqNo"], 1);
        assert_eq!(sections[1]["qData"]["qMode"], 4);
        assert_eq!(sections[0]["qData"]["trackTime"], "00:00:00");
        assert_eq!(sections[0]["qControl"]["isAudio"], true);
        Ok(())
    }
}
