//! MIDI driver handle: routes hardware MIDI input into a synth.

use crate::{
    error::Result,
    ffi::{self, RawMidiDriver},
    handle::{Foreign, Handle},
    settings::Settings,
    synth::Synth,
};
use std::sync::Arc;

impl Foreign for RawMidiDriver {
    const KIND: &'static str = "midi driver";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_midi_driver(raw) }
    }
}

/// Open MIDI input connections. The port is picked by `midi.portname`
/// (substring match, empty takes the first port); `midi.autoconnect = 1`
/// connects every input instead.
#[derive(Debug)]
pub struct MidiDriver {
    handle: Handle<RawMidiDriver>,
    settings: Arc<Settings>,
    synth: Arc<Synth>,
}

impl MidiDriver {
    pub fn new(settings: &Arc<Settings>, synth: &Arc<Synth>) -> Result<Self> {
        let raw_settings = settings.acquire()?;
        let raw_synth = match synth.acquire() {
            Ok(raw) => raw,
            Err(e) => {
                settings.release();
                return Err(e);
            }
        };
        match Handle::new(unsafe { ffi::new_midi_driver(raw_settings, raw_synth) }) {
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

impl Drop for MidiDriver {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.release_dependencies();
        }
    }
}
