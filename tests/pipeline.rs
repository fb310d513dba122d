//! End to end pipeline tests: files in, files out.
use std::io::Write;
use std::path::Path;

use anyhow::Result;

use lddecode::c1_circ::C1Circ;
use lddecode::c1_to_f2::C1ToF2;
use lddecode::comb::{CombConfig, CombDecoder};
use lddecode::f2_to_audio::F2FramesToAudio;
use lddecode::f3_source::F3FrameSource;
use lddecode::frame_source::RawFrameSource;
use lddecode::graph::Graph;
use lddecode::rgb_sink::RgbSink;
use lddecode::section::SectionDecoder;
use lddecode::tee::Tee;

fn write_gray_frames(path: &Path, count: usize, level: u16) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    let line: Vec<u8> = std::iter::repeat(level.to_le_bytes())
        .take(844)
        .flatten()
        .collect();
    for _ in 0..count * 505 {
        f.write_all(&line)?;
    }
    Ok(())
}

#[test]
fn comb_gray_frames_to_rgb_file() -> Result<()> {
    let tmpd = tempfile::tempdir()?;
    let input = tmpd.path().join("gray.tbc");
    let output = tmpd.path().join("gray.rgb");
    write_gray_frames(&input, 3, 32768)?;

    let src = RawFrameSource::from_file(&input)?;
    let comb = CombDecoder::new(
        src.out(),
        CombConfig {
            dim: 3,
            linesout: 505,
            ..Default::default()
        },
    );
    let sink = RgbSink::to_file(comb.out(), &output)?;

    let mut g = Graph::new();
    g.add(Box::new(src));
    g.add(Box::new(comb));
    g.add(Box::new(sink));
    g.run()?;

    // Three inputs, three frames of 3D warm-up: exactly one output.
    let data = std::fs::read(&output)?;
    assert_eq!(data.len(), 744 * 505 * 3 * 2);

    // Mid-frame pixels are flat mid-gray with no chroma.
    let px = |line: usize, col: usize| {
        let o = (line * 744 + col) * 3 * 2;
        (
            u16::from_le_bytes([data[o], data[o + 1]]),
            u16::from_le_bytes([data[o + 2], data[o + 3]]),
            u16::from_le_bytes([data[o + 4], data[o + 5]]),
        )
    };
    for line in [100, 250, 400] {
        let (r, g, b) = px(line, 372);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 21587);
    }
    Ok(())
}

/// CRC-16 with polynomial 0x1021 and zero init, bitwise.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// 98 subcode symbols carrying a valid Q packet in bit 6.
fn subcode_symbols(mode: u8, tno: u8, x: u8) -> Vec<u8> {
    let mut q = [0u8; 12];
    q[0] = mode; // control 0, audio mode nibble
    q[1] = tno;
    q[2] = x;
    q[5] = 0x08; // track frame
    q[8] = 0x02; // disc sec
    let crc = !crc16(&q[..10]);
    q[10] = (crc >> 8) as u8;
    q[11] = (crc & 0xff) as u8;

    let mut syms = vec![0u8; 98];
    for n in 0..96 {
        if q[n / 8] & (0x80 >> (n % 8)) != 0 {
            syms[n + 2] |= 0x40;
        }
    }
    syms
}

#[test]
fn efm_f3_records_to_pcm_and_sidecar() -> Result<()> {
    let tmpd = tempfile::tempdir()?;
    let input = tmpd.path().join("capture.f3");
    let audio = tmpd.path().join("audio.pcm");
    let meta = tmpd.path().join("audio.json");

    // The all-zero codeword as it appears on disc: the Qm and Pm
    // parity symbols are stored inverted.
    let mut disc = [0u8; 32];
    for n in 12..16 {
        disc[n] = 0xff;
    }
    for n in 28..32 {
        disc[n] = 0xff;
    }

    {
        let mut f = std::fs::File::create(&input)?;
        let syms = subcode_symbols(4, 0x01, 0x01);
        for _ in 0..2 {
            for &sym in &syms {
                f.write_all(&[sym])?;
                f.write_all(&disc)?;
                f.write_all(&[0u8; 32])?;
            }
        }
    }

    let src = F3FrameSource::from_file(&input)?;
    let tee = Tee::new(src.out());
    let (to_c1, to_sections) = tee.out();
    let c1 = C1Circ::new(to_c1);
    let f2 = C1ToF2::new(c1.out());
    let sections = SectionDecoder::new(to_sections);
    let sink = F2FramesToAudio::new(f2.out(), sections.out(), &audio, Some(&meta))?;

    let mut g = Graph::new();
    g.add(Box::new(src));
    g.add(Box::new(tee));
    g.add(Box::new(c1));
    g.add(Box::new(f2));
    g.add(Box::new(sections));
    g.add(Box::new(sink));
    g.run()?;

    // 196 F3 frames give 195 F2 frames after the C1 delay: enough for
    // one full section of audio.
    let pcm = std::fs::read(&audio)?;
    assert_eq!(pcm.len(), 2352);
    assert!(pcm.iter().all(|&b| b == 0));

    let doc: serde_json::Value = serde_json::from_reader(std::fs::File::open(&meta)?)?;
    let sections = doc["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["seqNo"], 0);
    assert_eq!(sections[0]["qData"]["qMode"], 4);
    assert_eq!(sections[0]["qData"]["trackNumber"], 1);
    assert_eq!(sections[0]["qData"]["x"], 1);
    assert_eq!(sections[0]["qData"]["trackTime"], "00:00:08");
    assert_eq!(sections[0]["qData"]["discTime"], "00:02:00");
    Ok(())
}
