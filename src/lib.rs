/*! Decode tools for LaserDisc RF captures.

This crate turns the two digital streams recovered from a LaserDisc RF
capture into usable media:

* A composite NTSC sample stream is comb-filtered into RGB frames, with
  adaptive 1D/2D/3D luma/chroma separation, non-linear noise reduction
  and 3:2 pulldown handling driven by the VBI white flag and the 24-bit
  Philips frame code.
* An EFM F3 frame stream is error-corrected through the first (C1)
  Reed-Solomon stage of the CIRC chain and assembled into 44.1 kHz
  stereo PCM sections, with CD subcode (Q channel) metadata written to a
  JSON sidecar.

# Architecture overview

Processing is organized as blocks connected by unidirectional streams,
driven by a cooperative single-threaded graph. A block does something
to its input(s) and passes the result to its output(s); data flows
strictly forward from sources to sinks.

The video pipeline:

```text
 [ RawFrameSource ]
         ↓
  [ CombDecoder ]
         ↓
    [ RgbSink ]
```

The audio pipeline:

```text
 [ F3FrameSource ]
         ↓
      [ Tee ]
      ↓      ↓
 [ C1Circ ] [ SectionDecoder ]
      ↓      ↓
 [ C1ToF2 ]  |
      ↓      ↓
 [ F2FramesToAudio ]
```

Decode failures are data, not errors: they travel downstream as error
flags (EFM) or are simply ignored (bad VBI codes). Only configuration
problems and output I/O failures terminate a run.
 */

// Blocks.
pub mod c1_circ;
pub mod c1_to_f2;
pub mod comb;
pub mod f2_to_audio;
pub mod f3_source;
pub mod frame_source;
pub mod rgb_sink;
pub mod section;
pub mod tee;
pub mod vector_sink;
pub mod vector_source;

// Types and primitives.
pub mod f2frame;
pub mod f3frame;
pub mod filter;
pub mod frame;
pub mod level;
pub mod vbi;

pub mod block;
pub mod graph;
pub mod stream;

/// lddecode error.
#[derive(Debug, Clone)]
pub struct Error {
    msg: String,
}

impl Error {
    /// Create new error with message.
    pub fn new(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "lddecode error: {}", self.msg)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Error {
        Error::new(&format!("{}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(&format!("IO error: {}", e))
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
