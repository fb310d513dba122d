/*! EFM audio decoder driver.

Reads F3 frame records (subcode symbol, 32 data symbols, 32 error
flags) from a file or stdin, runs the CIRC C1 error correction stage,
and writes raw 44.1 kHz signed 16 bit stereo PCM plus a JSON metadata
sidecar built from the subcode Q channel.

```no_run
$ ldefm -i capture.f3 -o audio.pcm -m audio.json
```
*/
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use lddecode::c1_circ::C1Circ;
use lddecode::c1_to_f2::C1ToF2;
use lddecode::f2_to_audio::F2FramesToAudio;
use lddecode::f3_source::F3FrameSource;
use lddecode::graph::Graph;
use lddecode::section::SectionDecoder;
use lddecode::tee::Tee;

#[derive(StructOpt, Debug)]
#[structopt(name = "ldefm", about = "EFM audio decoder (C1 + section assembly)")]
struct Opt {
    /// Input F3 frame file (default: stdin).
    #[structopt(short = "i", parse(from_os_str))]
    input: Option<PathBuf>,

    /// Output PCM audio file.
    #[structopt(short = "o", parse(from_os_str))]
    output: PathBuf,

    /// Metadata sidecar JSON file.
    #[structopt(short = "m", parse(from_os_str))]
    metadata: Option<PathBuf>,

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

    let src = match &opt.input {
        Some(path) => F3FrameSource::from_file(path)?,
        None => F3FrameSource::from_stdin(),
    };
    let tee = Tee::new(src.out());
    let (to_c1, to_sections) = tee.out();
    let c1 = C1Circ::new(to_c1);
    let f2 = C1ToF2::new(c1.out());
    let sections = SectionDecoder::new(to_sections);
    let audio = F2FramesToAudio::new(
        f2.out(),
        sections.out(),
        &opt.output,
        opt.metadata.as_deref(),
    )?;

    let mut g = Graph::new();
    g.add(Box::new(src));
    g.add(Box::new(tee));
    g.add(Box::new(c1));
    g.add(Box::new(f2));
    g.add(Box::new(sections));
    g.add(Box::new(audio));
    g.run()?;
    Ok(())
}
