/*! CD sections and the subcode Q channel.

A section is 98 consecutive frames: the first two subcode symbols are
the S0/S1 sync patterns, and bit 6 of the remaining 96 forms the Q
channel, a 12 byte packet carrying control flags, the Q mode, track and
time information and a CRC-16.

Only audio Q modes (1 = CD audio, 4 = LaserDisc audio) are decoded;
anything else, and any packet with a bad CRC, is recorded as mode -1.
The stream is assumed to be section aligned at its start; realigning
after lost frames is the upstream demodulator's job.
*/
use crc::{Algorithm, Crc};
use log::debug;

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::f3frame::F3Frame;
use crate::stream::{Streamp, new_streamp};

/// Frames per section.
pub const FRAMES_PER_SECTION: usize = 98;

/// The subcode Q CRC: CRC-16 with polynomial 0x1021, zero init, and
/// the remainder stored inverted.
const CRC_Q: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x0,
    refin: false,
    refout: false,
    xorout: 0x0,
    check: 0x31c3,
    residue: 0x0,
};

const Q_CRC: Crc<u16> = Crc::<u16>::new(&CRC_Q);

/// Minute/second/frame timecode, as carried in the Q channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeCode {
    pub min: u8,
    pub sec: u8,
    pub frame: u8,
}

impl std::fmt::Display for TimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.min, self.sec, self.frame)
    }
}

/// Q channel control flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QControl {
    pub is_audio: bool,
    pub is_stereo: bool,
    pub is_no_preemp: bool,
    pub is_copy_protected: bool,
}

/// Decoded Q data for the audio modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QData {
    pub is_lead_in: bool,
    pub is_lead_out: bool,
    /// Track number, decoded from BCD.
    pub track_number: i32,
    /// Lead-in point entry (same raw byte as `x`).
    pub point: i32,
    /// Subdivision within the track; 0 means encoding is paused.
    pub x: i32,
    pub track_time: TimeCode,
    pub disc_time: TimeCode,
}

/// One section's Q metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct Section {
    /// Q mode: 1 or 4, or -1 for anything unusable.
    pub q_mode: i32,
    pub q_control: QControl,
    pub q_data: QData,
}

fn bcd(b: u8) -> i32 {
    ((b >> 4) as i32) * 10 + (b & 0xf) as i32
}

/// Parse one 12 byte Q packet.
pub fn parse_q(q: &[u8; 12]) -> Section {
    let control = q[0] >> 4;
    let mode = (q[0] & 0xf) as i32;

    let q_control = QControl {
        is_audio: control & 0x4 == 0,
        is_stereo: control & 0x8 == 0,
        is_no_preemp: control & 0x1 == 0,
        is_copy_protected: control & 0x2 == 0,
    };

    let crc_ok = Q_CRC.checksum(&q[..10]) == !u16::from_be_bytes([q[10], q[11]]);
    if !crc_ok || (mode != 1 && mode != 4) {
        if !crc_ok {
            debug!("section: Q CRC mismatch");
        }
        return Section {
            q_mode: -1,
            q_control,
            q_data: QData::default(),
        };
    }

    Section {
        q_mode: mode,
        q_control,
        q_data: QData {
            is_lead_in: q[1] == 0x00,
            is_lead_out: q[1] == 0xaa,
            track_number: bcd(q[1]),
            point: bcd(q[2]),
            x: bcd(q[2]),
            track_time: TimeCode {
                min: bcd(q[3]) as u8,
                sec: bcd(q[4]) as u8,
                frame: bcd(q[5]) as u8,
            },
            disc_time: TimeCode {
                min: bcd(q[7]) as u8,
                sec: bcd(q[8]) as u8,
                frame: bcd(q[9]) as u8,
            },
        },
    }
}

/// Block grouping 98 F3 subcode symbols into one Section.
pub struct SectionDecoder {
    src: Streamp<F3Frame>,
    dst: Streamp<Section>,
    subcodes: Vec<u8>,
}

impl SectionDecoder {
    /// Create a new section decoder.
    pub fn new(src: Streamp<F3Frame>) -> Self {
        Self {
            src,
            dst: new_streamp(),
            subcodes: Vec::with_capacity(FRAMES_PER_SECTION),
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<Section> {
        self.dst.clone()
    }

    /// Extract the Q packet from a full set of subcode symbols.
    fn q_packet(subcodes: &[u8]) -> [u8; 12] {
        let mut q = [0u8; 12];
        // Symbols 0 and 1 are the S0/S1 sync patterns; Q is bit 6 of
        // the rest, most significant bit first.
        for (n, sym) in subcodes[2..FRAMES_PER_SECTION].iter().enumerate() {
            if sym & 0x40 != 0 {
                q[n / 8] |= 0x80 >> (n % 8);
            }
        }
        q
    }
}

impl Block for SectionDecoder {
    fn block_name(&self) -> &'static str {
        "SectionDecoder"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut i = self.src.lock().unwrap();
        if i.is_empty() && !i.eof() {
            return Ok(BlockRet::Noop);
        }
        let mut o = self.dst.lock().unwrap();
        while let Some(frame) = i.pop() {
            self.subcodes.push(frame.subcode_symbol());
            if self.subcodes.len() == FRAMES_PER_SECTION {
                let q = Self::q_packet(&self.subcodes);
                o.push(parse_q(&q));
                self.subcodes.clear();
            }
        }
        if i.eof() {
            // A trailing partial section is dropped.
            o.set_eof();
            return Ok(BlockRet::EOF);
        }
        Ok(BlockRet::Ok)
    }
}
