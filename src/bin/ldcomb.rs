/*! NTSC comb filter driver.

Reads raw composite frames (844x505 little endian u16 samples) from a
file or stdin and writes decoded RGB16 frames.

```no_run
$ ldcomb -i capture.tbc -o out.rgb -d 3
$ ldcomb -i capture.tbc -o frames/cap -f -p
```
*/
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use lddecode::comb::{CombConfig, CombDecoder};
use lddecode::frame_source::RawFrameSource;
use lddecode::graph::Graph;
use lddecode::level::DEFAULT_BLACK_IRE;
use lddecode::rgb_sink::RgbSink;

#[derive(StructOpt, Debug)]
#[structopt(name = "ldcomb", about = "NTSC composite comb filter")]
struct Opt {
    /// Input file (default: stdin).
    #[structopt(short = "i", parse(from_os_str))]
    input: Option<PathBuf>,

    /// Output file, or filename base with -f (default: stdout).
    #[structopt(short = "o")]
    output: Option<String>,

    /// Write a separate <base><framecode>.rgb file for each frame.
    #[structopt(short = "f")]
    image_mode: bool,

    /// Use the white flag / frame code for 3:2 pulldown merging.
    #[structopt(short = "p")]
    pulldown: bool,

    /// Comb dimensions: 1, 2 or 3.
    #[structopt(short = "d", default_value = "2")]
    dim: u8,

    /// Output all 505 lines instead of 480.
    #[structopt(short = "v")]
    full_height: bool,

    /// Monochrome decode.
    #[structopt(short = "B")]
    mono: bool,

    /// Use the wide chroma low pass filter.
    #[structopt(short = "w")]
    wide_chroma: bool,

    /// Brightness, percent of nominal.
    #[structopt(short = "b", default_value = "240")]
    brightness: f64,

    /// Black level in IRE. [default: 7.5]
    #[structopt(short = "I")]
    black_ire: Option<f64>,

    /// Luma noise reduction threshold in IRE; negative disables.
    #[structopt(short = "n", default_value = "4")]
    nr_y: f64,

    /// Chroma noise reduction threshold in IRE; negative disables.
    #[structopt(short = "N", default_value = "0")]
    nr_c: f64,

    /// Stop after writing one frame.
    #[structopt(short = "O")]
    one_frame: bool,

    /// Log verbosity.
    #[structopt(long = "verbose", default_value = "0")]
    verbose: usize,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    stderrlog::new()
        .module(module_path!())
        .module("lddecode")
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    if !(1..=3).contains(&opt.dim) {
        anyhow::bail!("-d must be 1, 2 or 3");
    }

    let cfg = CombConfig {
        dim: opt.dim,
        linesout: if opt.full_height { 505 } else { 480 },
        brightness: opt.brightness,
        black_ire: opt.black_ire.unwrap_or(DEFAULT_BLACK_IRE),
        mono: opt.mono,
        wide_chroma: opt.wide_chroma,
        nr_y: opt.nr_y,
        nr_c: opt.nr_c,
        pulldown: opt.pulldown,
    };

    let mut g = Graph::new();

    let src = match &opt.input {
        Some(path) => RawFrameSource::from_file(path)?,
        None => RawFrameSource::from_stdin(),
    };
    let comb = CombDecoder::new(src.out(), cfg);
    let mut sink = match (&opt.output, opt.image_mode) {
        (Some(base), true) => RgbSink::per_frame(comb.out(), base),
        (None, true) => RgbSink::per_frame(comb.out(), "FRAME"),
        (Some(path), false) => RgbSink::to_file(comb.out(), std::path::Path::new(path))?,
        (None, false) => RgbSink::to_stdout(comb.out()),
    };
    if opt.one_frame {
        sink.stop_after_first(g.cancel_token());
    }

    g.add(Box::new(src));
    g.add(Box::new(comb));
    g.add(Box::new(sink));
    g.run()?;
    Ok(())
}
