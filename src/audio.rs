//! Audio driver handle: plays a synth through the output device chosen by
//! `audio.driver`.

use crate::{
    error::Result,
    ffi::{self, RawAudioDriver},
    handle::{Foreign, Handle},
    settings::Settings,
    synth::Synth,
};
use std::sync::Arc;

impl Foreign for RawAudioDriver {
    const KIND: &'static str = "audio driver";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_audio_driver(raw) }
    }
}

/// A running output stream. Registers on both its settings and its synth,
/// so neither can be closed while the stream is open.
#[derive(Debug)]
pub struct AudioDriver {
    handle: Handle<RawAudioDriver>,
    settings: Arc<Settings>,
    synth: Arc<Synth>,
}

impl AudioDriver {
    /// Opens the device and starts rendering. Fails with
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if either
    /// dependency is closed and [`Error::CreationFailed`](crate::Error::CreationFailed)
    /// if no stream could be started.
    pub fn new(settings: &Arc<Settings>, synth: &Arc<Synth>) -> Result<Self> {
        let raw_settings = settings.acquire()?;
        let raw_synth = match synth.acquire() {
            Ok(raw) => raw,
            Err(e) => {
                settings.release();
                return Err(e);
            }
        };
        match Handle::new(unsafe { ffi::new_audio_driver(raw_settings, raw_synth) }) {
            Ok(handle) => Ok(Self {
                handle,
                settings: Arc::clone(settings),
                synth: Arc::clone(synth),
            }),
            Err(e) => {
                synth.release();
                settings.release();
                Err(e)
            }
        }
    }

    fn release_dependencies(&self) {
        self.synth.release();
        self.settings.release();
    }

    /// Stops the stream. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.handle.close()? {
            self.release_dependencies();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl Drop for AudioDriver {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.release_dependencies();
        }
    }
}
