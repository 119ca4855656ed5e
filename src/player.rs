//! MIDI file player handle.

use crate::{
    error::{Error, Operation, Result},
    ffi::{self, FLUID_FAILED, RawPlayer},
    handle::{Foreign, Handle},
    synth::Synth,
};
use std::{
    ffi::{CString, c_int},
    path::Path,
    sync::Arc,
};

impl Foreign for RawPlayer {
    const KIND: &'static str = "player";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_player(raw) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Ready,
    Playing,
    Stopping,
    Done,
}

impl TryFrom<i32> for PlayerStatus {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            ffi::FLUID_PLAYER_READY => Ok(PlayerStatus::Ready),
            ffi::FLUID_PLAYER_PLAYING => Ok(PlayerStatus::Playing),
            ffi::FLUID_PLAYER_STOPPING => Ok(PlayerStatus::Stopping),
            ffi::FLUID_PLAYER_DONE => Ok(PlayerStatus::Done),
            other => Err(Error::UnknownStatus(other)),
        }
    }
}

/// How [`Player::set_tempo`] interprets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoMode {
    /// Multiplier applied to the file's own tempo, 0.001 to 1000.
    Internal,
    /// Fixed beats per minute, 1 to 60000.
    ExternalBpm,
    /// Fixed microseconds per quarter note, 1 to 60000000.
    ExternalMidi,
}

impl TempoMode {
    fn raw(self) -> c_int {
        match self {
            TempoMode::Internal => ffi::FLUID_PLAYER_TEMPO_INTERNAL,
            TempoMode::ExternalBpm => ffi::FLUID_PLAYER_TEMPO_EXTERNAL_BPM,
            TempoMode::ExternalMidi => ffi::FLUID_PLAYER_TEMPO_EXTERNAL_MIDI,
        }
    }
}

impl TryFrom<i32> for TempoMode {
    type Error = Error;

    fn try_from(mode: i32) -> Result<Self> {
        match mode {
            ffi::FLUID_PLAYER_TEMPO_INTERNAL => Ok(TempoMode::Internal),
            ffi::FLUID_PLAYER_TEMPO_EXTERNAL_BPM => Ok(TempoMode::ExternalBpm),
            ffi::FLUID_PLAYER_TEMPO_EXTERNAL_MIDI => Ok(TempoMode::ExternalMidi),
            other => Err(Error::InvalidArgument(format!("unknown tempo mode {other}"))),
        }
    }
}

/// Plays Standard MIDI Files through a [`Synth`].
///
/// Playback runs on the engine's clock; with the default `sample` timing
/// source it only advances while audio is pulled from the synth (a driver,
/// a renderer or the `write_*` calls).
#[derive(Debug)]
pub struct Player {
    handle: Handle<RawPlayer>,
    synth: Arc<Synth>,
}

impl Player {
    /// Fails with [`Error::InvalidArgument`] if the synth is closed.
    pub fn new(synth: &Arc<Synth>) -> Result<Self> {
        let raw_synth = synth.acquire()?;
        match Handle::new(unsafe { ffi::new_player(raw_synth) }) {
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

    fn check(&self, op: Operation, f: impl FnOnce(*mut RawPlayer) -> c_int) -> Result<()> {
        if self.handle.with(f)? == FLUID_FAILED {
            return Err(Error::OperationFailed(op));
        }
        Ok(())
    }

    /// Queues a MIDI file.
    pub fn add_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("unusable path {}", path.display())))?;
        self.check(
            Operation::AddFile {
                path: path.to_owned(),
            },
            |raw| unsafe { ffi::player_add(raw, c_path.as_ptr()) },
        )
    }

    /// Queues a MIDI file held in memory; the bytes are copied.
    pub fn add_memory(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyData);
        }
        self.check(Operation::AddMemory { len: data.len() }, |raw| unsafe {
            ffi::player_add_mem(raw, data.as_ptr().cast(), data.len())
        })
    }

    /// Starts playback and returns at once.
    pub fn play(&self) -> Result<()> {
        self.check(Operation::Play, |raw| unsafe { ffi::player_play(raw) })
    }

    pub fn stop(&self) -> Result<()> {
        self.check(Operation::Stop, |raw| unsafe { ffi::player_stop(raw) })
    }

    /// Blocks until playback is done. Returns at once if nothing is playing.
    /// [`Player::stop`] or [`Player::close`] from another thread ends the
    /// wait.
    pub fn join(&self) -> Result<()> {
        self.check(Operation::Join, |raw| unsafe { ffi::player_join(raw) })
    }

    pub fn seek(&self, ticks: u32) -> Result<()> {
        let raw_ticks = c_int::try_from(ticks)
            .map_err(|_| Error::InvalidArgument(format!("tick {ticks} is out of range")))?;
        self.check(Operation::Seek { ticks }, |raw| unsafe {
            ffi::player_seek(raw, raw_ticks)
        })
    }

    /// Plays the playlist `count` times; `-1` repeats forever.
    pub fn set_loop(&self, count: i32) -> Result<()> {
        self.check(Operation::SetLoop { count }, |raw| unsafe {
            ffi::player_set_loop(raw, count)
        })
    }

    pub fn set_tempo(&self, mode: TempoMode, value: f64) -> Result<()> {
        let mode = mode.raw();
        self.check(Operation::SetTempo { mode, value }, |raw| unsafe {
            ffi::player_set_tempo(raw, mode, value)
        })
    }

    pub fn status(&self) -> Result<PlayerStatus> {
        let code = self
            .handle
            .with(|raw| unsafe { ffi::player_get_status(raw) })?;
        PlayerStatus::try_from(code)
    }

    /// Effective tempo in beats per minute.
    pub fn bpm(&self) -> Result<i32> {
        self.handle.with(|raw| unsafe { ffi::player_get_bpm(raw) })
    }

    /// Effective tempo in microseconds per quarter note.
    pub fn midi_tempo(&self) -> Result<i32> {
        self.handle
            .with(|raw| unsafe { ffi::player_get_midi_tempo(raw) })
    }

    pub fn current_tick(&self) -> Result<u32> {
        let tick = self
            .handle
            .with(|raw| unsafe { ffi::player_get_current_tick(raw) })?;
        Ok(u32::try_from(tick).unwrap_or(0))
    }

    /// Length of the current song in ticks.
    pub fn total_ticks(&self) -> Result<u32> {
        let ticks = self
            .handle
            .with(|raw| unsafe { ffi::player_get_total_ticks(raw) })?;
        Ok(u32::try_from(ticks).unwrap_or(0))
    }

    /// Stops playback, frees the engine object and releases the synth.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        // Wakes any `join` holding the read side before we ask for the write side.
        match self.handle.with(|raw| unsafe { ffi::player_stop(raw) }) {
            Ok(_) | Err(Error::InvalidState(_)) => {}
            Err(e) => return Err(e),
        }
        if self.handle.close()? {
            self.synth.release();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn synth(&self) -> &Arc<Synth> {
        &self.synth
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.synth.release();
        }
    }
}
