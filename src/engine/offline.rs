//! File-to-file rendering
//!
//! Runs the data callback synchronously on the caller's thread, one chunk of
//! `frame_count` frames at a time, until the input file is exhausted.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};

use crate::audio::{FrameBuffer, Frames, FramesMut};
use crate::codec::{WavFileReader, WavFileWriter};
use crate::engine::config::SessionConfig;
use crate::engine::state::SessionStatus;
use crate::error::{Result, TinyaudioError};

/// Open files of an offline render
pub(crate) struct OfflineRender {
    reader: WavFileReader,
    writer: WavFileWriter,
}

impl OfflineRender {
    /// Open the input for reading and create the output.
    ///
    /// Nothing has been delivered yet when this fails.
    pub(crate) fn open(config: &SessionConfig) -> Result<Self> {
        let (input_path, output_path) = match (&config.input_file_path, &config.output_file_path) {
            (Some(input), Some(output)) => (input, output),
            _ => {
                return Err(TinyaudioError::invalid_config(
                    "offline sessions need both an input and an output file",
                ))
            }
        };

        let reader = WavFileReader::open_as(input_path, config.format)?;
        reader.check_layout(config.channels, config.sample_rate)?;
        let writer = WavFileWriter::create(
            output_path,
            config.format,
            config.channels,
            config.sample_rate,
        )?;

        Ok(OfflineRender { reader, writer })
    }

    /// Render the whole input file.
    ///
    /// The stop callback runs after `started` has been cleared, whether the
    /// render completed or failed midway. A panicking data callback ends the
    /// render with `CallbackPanicked`.
    pub(crate) fn run<D, S>(
        mut self,
        config: &SessionConfig,
        status: &SessionStatus,
        mut data_callback: D,
        stop_callback: S,
    ) -> Result<()>
    where
        D: FnMut(&Frames<'_>, &mut FramesMut<'_>),
        S: FnOnce(),
    {
        info!(
            "Rendering {} -> {} ({} frames, {} x{} @ {} Hz)",
            self.reader.path().display(),
            self.writer.path().display(),
            self.reader.total_frame_count(),
            config.format,
            config.channels,
            config.sample_rate
        );

        status.set_started(true);
        let rendered = render_chunks(
            config,
            status,
            &mut self.reader,
            &mut self.writer,
            &mut data_callback,
        );
        status.set_started(false);

        let finalized = self.writer.finalize();
        let output_path = self.writer.path().to_path_buf();
        self.reader.close();
        stop_callback();

        match (rendered, finalized) {
            (Ok(frames), Ok(())) => {
                info!("Rendered {} frames to {}", frames, output_path.display());
                Ok(())
            }
            (Err(e), _) | (Ok(_), Err(e)) => {
                warn!("Offline render to {} failed: {}", output_path.display(), e);
                Err(e)
            }
        }
    }
}

fn render_chunks<D>(
    config: &SessionConfig,
    status: &SessionStatus,
    reader: &mut WavFileReader,
    writer: &mut WavFileWriter,
    data_callback: &mut D,
) -> Result<u64>
where
    D: FnMut(&Frames<'_>, &mut FramesMut<'_>),
{
    let mut input = FrameBuffer::new(config.format, config.channels, config.frame_count);
    let mut output = FrameBuffer::new(config.format, config.channels, config.frame_count);
    let mut total = 0u64;

    loop {
        let read = reader.read(&mut input.as_frames_mut())?;
        if read == 0 {
            break;
        }
        if read < config.frame_count {
            debug!("Final chunk holds {} of {} frames", read, config.frame_count);
        }

        output.fill_silence();
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
            data_callback(&input.as_frames(), &mut output.as_frames_mut())
        }));
        delivered.map_err(|payload| TinyaudioError::callback_panicked(payload.as_ref()))?;
        status.record_callback();

        writer.write(&output.as_frames().prefix(read))?;
        total += read as u64;
    }

    Ok(total)
}
