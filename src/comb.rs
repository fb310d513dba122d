/*! Adaptive NTSC comb filter.

Separates luminance from chrominance in digitized composite video,
demodulates the color subcarrier to a baseband chroma pair, applies
non-linear noise reduction and converts to RGB.

Three candidate comb estimates are available per pixel: 1D (samples two
dots away on the same line), 2D (the lines two above and below in the
same frame) and 3D (the same pixel one frame earlier and later). Each
candidate gets a confidence weight from how well its neighborhood
actually cancels; the weighted average of the candidates is taken as
the chroma at that pixel. The 2D and 3D confidences come from low
passed luma deltas, so a low passed copy of every frame is kept
alongside the raw ring.

In 3D mode the decoder holds three frames of history and decodes the
middle one, so nothing is emitted until the third input frame.

The chroma pair is carried in fields named `i` and `q`, but the output
matrix is the U/V one; the naming follows the original convention.
*/
use log::{debug, warn};

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::filter::{Fir, LPF10H, high_pass, low_pass};
use crate::frame::{
    DOT_CLOCK, FRAME_HEIGHT, FRAME_WIDTH, LINE_LEN, OUT_WIDTH, PHASE_SENTINEL, RawFrame, RgbFrame,
};
use crate::level::{DEFAULT_BLACK_IRE, IREBASE, IRESCALE, clamp};
use crate::stream::{Streamp, new_streamp};
use crate::vbi;

const FRAME_CELLS: usize = FRAME_WIDTH * FRAME_HEIGHT;
const OUT_CELLS: usize = OUT_WIDTH * FRAME_HEIGHT * 3;

/// Chroma low pass cutoffs at the 4x subcarrier rate.
const CHROMA_LP_CUTOFF: f64 = 600_000.0;
const CHROMA_WLP_CUTOFF: f64 = 1_300_000.0;

/// Noise reduction high pass cutoff.
const NR_HP_CUTOFF: f64 = 1_800_000.0;

#[derive(Clone, Copy, Default)]
struct Yiq {
    y: f64,
    i: f64,
    q: f64,
}

/// Comb decoder settings.
#[derive(Clone, Debug)]
pub struct CombConfig {
    /// Comb dimensions: 1, 2 or 3.
    pub dim: u8,
    /// Output lines per frame: 480 or 505.
    pub linesout: usize,
    /// Output brightness, percent of nominal.
    pub brightness: f64,
    /// Black level in IRE.
    pub black_ire: f64,
    /// Decode luma only.
    pub mono: bool,
    /// Use the wide chroma low pass.
    pub wide_chroma: bool,
    /// Luma noise reduction threshold in IRE. Negative disables.
    pub nr_y: f64,
    /// Chroma noise reduction threshold in IRE. Negative disables.
    pub nr_c: f64,
    /// Merge 3:2 pulldown frames using the white flag / frame code.
    pub pulldown: bool,
}

impl Default for CombConfig {
    fn default() -> Self {
        Self {
            dim: 2,
            linesout: 480,
            brightness: 240.0,
            black_ire: DEFAULT_BLACK_IRE,
            mono: false,
            wide_chroma: false,
            nr_y: 4.0,
            nr_c: 0.0,
            pulldown: false,
        }
    }
}

/// The comb decoder block: raw composite frames in, RGB frames out.
pub struct CombDecoder {
    src: Streamp<RawFrame>,
    dst: Streamp<RgbFrame>,
    cfg: CombConfig,

    // Noise reduction thresholds on the sample scale.
    nr_y: f64,
    nr_c: f64,

    // Triple frame history: index 0 newest, 1 current, 2 oldest.
    rawbuf: [Vec<u16>; 3],
    lpraw: [Vec<f64>; 3],

    // 3D temporal confidence per pixel, in [0, 1].
    kmap: Vec<f64>,

    // Decoded chroma lines for the frame being emitted.
    cbuf: Vec<Yiq>,

    // RGB assembly buffer and the pulldown merge buffer. The merge
    // buffer keeps the opposite parity lines of the previous frame.
    output: Vec<u16>,
    obuf: Vec<u16>,

    f_lpf10: Fir,
    f_ci: Fir,
    f_cq: Fir,
    chroma_delay: usize,
    f_hpy: Fir,
    f_hpi: Fir,
    f_hpq: Fir,

    framecount: u64,
    framecode: u32,
    odd_frame: bool,
    frames_out: u64,
}

impl CombDecoder {
    /// Create a new comb decoder.
    pub fn new(src: Streamp<RawFrame>, cfg: CombConfig) -> Self {
        assert!((1..=3).contains(&cfg.dim), "dim must be 1, 2 or 3");
        assert!(
            cfg.linesout == 480 || cfg.linesout == 505,
            "linesout must be 480 or 505"
        );
        let (ctaps, chroma_delay) = if cfg.wide_chroma {
            (low_pass(DOT_CLOCK, CHROMA_WLP_CUTOFF, 11), 5)
        } else {
            (low_pass(DOT_CLOCK, CHROMA_LP_CUTOFF, 17), 8)
        };
        let nrtaps = high_pass(DOT_CLOCK, NR_HP_CUTOFF, 17);
        Self {
            src,
            dst: new_streamp(),
            nr_y: cfg.nr_y * IRESCALE,
            nr_c: cfg.nr_c * IRESCALE,
            rawbuf: std::array::from_fn(|_| vec![0; FRAME_CELLS]),
            lpraw: std::array::from_fn(|_| vec![0.0; FRAME_CELLS]),
            kmap: vec![0.0; FRAME_CELLS],
            cbuf: vec![Yiq::default(); LINE_LEN * FRAME_HEIGHT],
            output: vec![0; OUT_CELLS],
            obuf: vec![0; OUT_CELLS],
            f_lpf10: Fir::new(&LPF10H),
            f_ci: Fir::new(&ctaps),
            f_cq: Fir::new(&ctaps),
            chroma_delay,
            f_hpy: Fir::new(&nrtaps),
            f_hpi: Fir::new(&nrtaps),
            f_hpq: Fir::new(&nrtaps),
            framecount: 0,
            framecode: 0,
            odd_frame: false,
            frames_out: 0,
            cfg,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<RgbFrame> {
        self.dst.clone()
    }

    /// Total frames pushed downstream so far.
    pub fn frames_out(&self) -> u64 {
        self.frames_out
    }

    /// First frame line that reaches the output.
    fn firstline(&self) -> usize {
        if self.cfg.linesout == 505 { 1 } else { 26 }
    }

    /// Decode one frame. May emit zero, one or two output frames.
    fn process(&mut self, frame: &RawFrame, out: &mut crate::stream::Stream<RgbFrame>) {
        let dim = self.cfg.dim;
        // Index of the frame being decoded: the middle of the ring for
        // 3D, the newest otherwise.
        let f = if dim == 3 { 1 } else { 0 };

        self.rawbuf.rotate_right(1);
        self.rawbuf[0].copy_from_slice(frame.samples());
        self.lpraw.rotate_right(1);
        self.lp_frame();

        if dim == 3 && self.framecount < 2 {
            debug!("comb: warming up, frame {}", self.framecount);
            self.framecount += 1;
            return;
        }

        self.split(f);
        self.chroma_nr();
        self.restore_luma(f);
        self.luma_nr();
        self.to_rgb();
        self.post_process(f, out);
        self.framecount += 1;
    }

    /// Low pass the newest raw frame into the low passed ring.
    fn lp_frame(&mut self) {
        for l in 24..FRAME_HEIGHT {
            for h in 32..FRAME_WIDTH {
                let adr = l * FRAME_WIDTH + h;
                self.lpraw[0][adr - 16] = self.f_lpf10.feed(self.rawbuf[0][adr] as f64);
            }
        }
    }

    /// Adaptive Y/C separation and subcarrier demodulation.
    fn split(&mut self, f: usize) {
        let dim = self.cfg.dim;

        // The top lines never carry color; copy luma through.
        for l in 0..24 {
            for h in 4..840 {
                self.cbuf[l * LINE_LEN + h] = Yiq {
                    y: self.rawbuf[f][l * FRAME_WIDTH + h] as f64,
                    i: 0.0,
                    q: 0.0,
                };
            }
        }

        for l in 24..FRAME_HEIGHT {
            let base = l * FRAME_WIDTH;
            let invertphase = self.rawbuf[f][base] == PHASE_SENTINEL;

            // Sample-and-hold demodulation state: each subcarrier
            // phase rewrites only one of the two components.
            let mut si = 0.0;
            let mut sq = 0.0;

            for h in 4..840 {
                let adr = base + h;
                let x = self.rawbuf[f][adr] as i32;

                // Candidate chroma estimates and their cancellation
                // errors, kept in integer math like the sample data.
                let mut c = [0.0f64; 3];
                let mut v = [0.0f64; 3];

                if dim >= 3 {
                    let p = self.rawbuf[0][adr] as i32;
                    let n = self.rawbuf[2][adr] as i32;
                    c[2] = ((p + n) / 2 - x) as f64;
                    let k = ((self.lpraw[1][adr] - self.lpraw[0][adr]).abs()
                        + (self.lpraw[1][adr] - self.lpraw[2][adr]).abs())
                        / IRESCALE;
                    v[2] = clamp(1.0 - k / 8.0, 0.0, 1.0);
                }
                self.kmap[adr] = v[2];

                // 2D can't reach past the frame edges.
                if dim >= 2 && (2..=502).contains(&l) {
                    let p = self.rawbuf[f][adr - 2 * FRAME_WIDTH] as i32;
                    let n = self.rawbuf[f][adr + 2 * FRAME_WIDTH] as i32;
                    c[1] = ((p + n) / 2 - x) as f64;
                    let k = ((self.lpraw[1][adr] - self.lpraw[1][adr - FRAME_WIDTH]).abs()
                        + (self.lpraw[1][adr] - self.lpraw[1][adr + FRAME_WIDTH]).abs())
                        / IRESCALE;
                    v[1] = clamp(1.0 - k / 10.0, 0.0, 1.0);
                }

                {
                    let p = self.rawbuf[f][adr - 2] as i32;
                    let n = self.rawbuf[f][adr + 2] as i32;
                    c[0] = ((p + n) / 2 - x) as f64;
                    let d = ((p - x) - (n - x)).abs() as f64;
                    v[0] = if c[0] != 0.0 {
                        1.0 - clamp(d / c[0].abs(), 0.0, 1.0)
                    } else {
                        0.0
                    };
                }

                // Prefer the 2D/3D estimates when they are usable.
                if v[1] + v[2] >= 0.5 {
                    v[0] = 0.0;
                }
                // Reduce the three weights to a convex combination.
                if v[0] + v[1] > 0.0 {
                    let v12 = (1.0 - v[2]) / (v[0] + v[1]);
                    v[0] *= v12;
                    v[1] *= v12;
                }
                let mut vtot = v[0] + v[1] + v[2];
                if vtot <= 0.01 {
                    v[1] = 1.0;
                    v[2] = 1.0;
                    vtot = 2.0;
                }
                v[0] /= vtot;
                v[1] /= vtot;
                v[2] /= vtot;

                let mut cavg = (c[0] * v[0] + c[1] * v[1] + c[2] * v[2]) / 2.0;
                if !invertphase {
                    cavg = -cavg;
                }

                match h % 4 {
                    0 => si = cavg,
                    1 => sq = -cavg,
                    2 => si = -cavg,
                    3 => sq = cavg,
                    _ => unreachable!(),
                }

                self.cbuf[l * LINE_LEN + h] = Yiq {
                    y: x as f64,
                    i: si,
                    q: sq,
                };
            }

            // Low pass the demodulated chroma in place, compensating
            // the filter group delay with the write-back offset.
            for h in 4..840 {
                let idx = l * LINE_LEN + h;
                let (iv, qv) = (self.cbuf[idx].i, self.cbuf[idx].q);
                let (fi, fq) = if self.cfg.mono {
                    (0.0, 0.0)
                } else {
                    (self.f_ci.feed(iv), self.f_cq.feed(qv))
                };
                let widx = l * LINE_LEN + h - self.chroma_delay;
                self.cbuf[widx].i = fi;
                self.cbuf[widx].q = fq;
            }
        }
    }

    /// Non-linear chroma noise reduction.
    ///
    /// High pass each component, then subtract the small high
    /// frequency residue, scaled down as it approaches the threshold.
    fn chroma_nr(&mut self) {
        if self.cfg.nr_c < 0.0 {
            return;
        }
        let nr_c = self.nr_c;
        let mut hp = [(0.0f64, 0.0f64); FRAME_WIDTH];
        for l in 24..FRAME_HEIGHT {
            let base = l * LINE_LEN;
            for h in 70..752 + 70 {
                let p = self.cbuf[base + h];
                hp[h] = (self.f_hpi.feed(p.i), self.f_hpq.feed(p.q));
            }
            for h in 70..744 + 70 {
                // The high pass stream runs eight samples late.
                let (ai, aq) = hp[h + 8];
                if ai.abs() < nr_c {
                    let hpm = ai / nr_c;
                    self.cbuf[base + h].i -= ai * (1.0 - (hpm * hpm * hpm).abs());
                }
                if aq.abs() < nr_c {
                    let hpm = aq / nr_c;
                    self.cbuf[base + h].q -= aq * (1.0 - (hpm * hpm * hpm).abs());
                }
            }
        }
    }

    /// Non-linear luma noise reduction; same shape as the chroma pass.
    fn luma_nr(&mut self) {
        if self.cfg.nr_y < 0.0 {
            return;
        }
        let nr_y = self.nr_y;
        let firstline = if self.cfg.linesout == 505 { 0 } else { 24 };
        let mut hp = [0.0f64; FRAME_WIDTH];
        for l in firstline..FRAME_HEIGHT {
            let base = l * LINE_LEN;
            for h in 70..752 + 70 {
                hp[h] = self.f_hpy.feed(self.cbuf[base + h].y);
            }
            for h in 70..744 + 70 {
                let a = hp[h + 8];
                if a.abs() < nr_y {
                    let hpm = a / nr_y;
                    self.cbuf[base + h].y -= a * (1.0 - (hpm * hpm * hpm).abs());
                }
            }
        }
    }

    /// Add the demodulated carrier back into luma so the baseband luma
    /// equals the composite sample again, with the residual
    /// interleaved chroma cancelled.
    fn restore_luma(&mut self, f: usize) {
        let firstline = self.firstline();
        for l in firstline..FRAME_HEIGHT {
            let invertphase = self.rawbuf[f][l * FRAME_WIDTH] == PHASE_SENTINEL;
            for h in 0..760 {
                let p = &mut self.cbuf[l * LINE_LEN + h + 70];
                let mut comp = match h % 4 {
                    0 => p.i,
                    1 => -p.q,
                    2 => -p.i,
                    3 => p.q,
                    _ => unreachable!(),
                };
                if invertphase {
                    comp = -comp;
                }
                p.y += comp;
            }
        }
    }

    /// Convert the decoded lines to RGB in the assembly buffer.
    fn to_rgb(&mut self) {
        let firstline = self.firstline();
        let black = self.cfg.black_ire;
        let m = self.cfg.brightness * 256.0 / 100.0;
        for l in firstline..FRAME_HEIGHT {
            let row = l - firstline;
            for h in 0..OUT_WIDTH {
                let p = self.cbuf[l * LINE_LEN + h + 74];

                let ire = (p.y - IREBASE) / IRESCALE - 60.0;
                let y = (ire - black) * (100.0 / (100.0 - black));
                let i = p.i / IRESCALE;
                let q = p.q / IRESCALE;

                let r = y + 1.13983 * q;
                let g = y - 0.58060 * q - 0.39465 * i;
                let b = y + 2.032 * i;

                let o = (row * OUT_WIDTH + h) * 3;
                self.output[o] = clamp(r * m, 0.0, 65535.0) as u16;
                self.output[o + 1] = clamp(g * m, 0.0, 65535.0) as u16;
                self.output[o + 2] = clamp(b * m, 0.0, 65535.0) as u16;
            }
        }
    }

    fn emit(&mut self, merged: bool, out: &mut crate::stream::Stream<RgbFrame>) {
        let n = OUT_WIDTH * self.cfg.linesout * 3;
        let buf = if merged { &self.obuf } else { &self.output };
        out.push(RgbFrame::from_samples(
            &buf[..n],
            self.cfg.linesout,
            self.framecode,
        ));
        self.frames_out += 1;
    }

    /// Read the VBI, decide field parity, and emit frames, merging
    /// 3:2 pulldown pairs when enabled.
    fn post_process(&mut self, f: usize, out: &mut crate::stream::Stream<RgbFrame>) {
        let linesout = self.cfg.linesout;
        let mut fstart: i32 = if self.cfg.pulldown { -1 } else { 0 };

        if self.cfg.pulldown && self.odd_frame {
            // The previous frame deposited its odd lines in the merge
            // buffer; fill in our even lines and emit the pair.
            for i in (0..linesout).step_by(2) {
                let o = OUT_WIDTH * 3 * i;
                self.obuf[o..o + OUT_WIDTH * 3].copy_from_slice(&self.output[o..o + OUT_WIDTH * 3]);
            }
            self.emit(true, out);
            self.odd_frame = false;
        }

        for line in 4..=5 {
            let base = line * FRAME_WIDTH;
            if vbi::white_flag(&self.rawbuf[f][base..base + FRAME_WIDTH]) {
                debug!("comb: white flag on line {}", line);
                fstart = (line % 2) as i32;
            }
        }

        for line in 16..20 {
            let base = line * FRAME_WIDTH;
            let code = vbi::read_philips_code(&self.rawbuf[f][base..base + FRAME_WIDTH]);
            if let Some(fc) = vbi::decode_framecode(code) {
                let ofstart = fstart;
                self.framecode = fc;
                debug!("comb: frame {}", fc);
                fstart = (line % 2) as i32;
                if ofstart >= 0 && fstart != ofstart {
                    warn!(
                        "comb: white flag and frame code disagree on field start ({} vs {})",
                        ofstart, fstart
                    );
                }
            }
        }

        if !self.cfg.pulldown || fstart == 0 {
            self.emit(false, out);
        } else if fstart == 1 {
            for i in (1..linesout).step_by(2) {
                let o = OUT_WIDTH * 3 * i;
                self.obuf[o..o + OUT_WIDTH * 3].copy_from_slice(&self.output[o..o + OUT_WIDTH * 3]);
            }
            self.odd_frame = true;
        }
    }
}

impl Block for CombDecoder {
    fn block_name(&self) -> &'static str {
        "CombDecoder"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let ibind = self.src.clone();
        let obind = self.dst.clone();
        let mut input = ibind.lock().unwrap();
        if input.is_empty() {
            if input.eof() {
                obind.lock().unwrap().set_eof();
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        let mut output = obind.lock().unwrap();
        while let Some(frame) = input.pop() {
            self.process(&frame, &mut output);
        }
        Ok(BlockRet::Ok)
    }
}
