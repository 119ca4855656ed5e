//! File renderer handle: caller-driven offline rendering to disk.

use crate::{
    error::Result,
    ffi::{self, FLUID_OK, RawFileRenderer},
    handle::{Foreign, Handle},
    synth::Synth,
};
use std::sync::Arc;

impl Foreign for RawFileRenderer {
    const KIND: &'static str = "file renderer";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_file_renderer(raw) }
    }
}

/// Writes a synth's output to the file named by `audio.file.name`, one
/// `audio.period-size` block per [`FileRenderer::process_block`] call.
/// The file is finalised on close.
///
/// ```no_run
/// # use oxifluid::{FileRenderer, Player, PlayerStatus, Settings, Synth};
/// # fn main() -> oxifluid::Result<()> {
/// let settings = Settings::new()?;
/// settings.set_str("audio.file.name", "song.wav")?;
/// let synth = Synth::new(&settings)?;
/// synth.load_soundfont("font.sf2", true)?;
/// let player = Player::new(&synth)?;
/// player.add_file("song.mid")?;
/// let renderer = FileRenderer::new(&synth)?;
/// player.play()?;
/// while player.status()? == PlayerStatus::Playing {
///     if !renderer.process_block()? {
///         break;
///     }
/// }
/// renderer.close()?;
/// player.close()?;
/// synth.close()?;
/// settings.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileRenderer {
    handle: Handle<RawFileRenderer>,
    synth: Arc<Synth>,
}

impl FileRenderer {
    pub fn new(synth: &Arc<Synth>) -> Result<Self> {
        let raw_synth = synth.acquire()?;
        match Handle::new(unsafe { ffi::new_file_renderer(raw_synth) }) {
            Ok(handle) => Ok(Self {
                handle,
                synth: Arc::clone(synth),
            }),
            Err(e) => {
                synth.release();
                Err(e)
            }
        }
    }

    /// Renders and writes one block. `Ok(false)` means the engine could not
    /// write it and no further block will succeed.
    pub fn process_block(&self) -> Result<bool> {
        let status = self
            .handle
            .with_mut(|raw| unsafe { ffi::file_renderer_process_block(raw) })?;
        Ok(status == FLUID_OK)
    }

    /// Finalises the file and releases the synth. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.handle.close()? {
            self.synth.release();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl Drop for FileRenderer {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.synth.release();
        }
    }
}
