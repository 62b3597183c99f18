//! WAV Codec
//!
//! Header probing plus frame-granular decode and encode, on top of `hound`.

mod info;
mod reader;
mod writer;

pub use info::{probe, AudioFileInfo};
pub use reader::WavFileReader;
pub use writer::WavFileWriter;
