//! C-shaped surface of the synthesis engine.
//!
//! Every engine object lives on the heap behind a raw pointer returned by a
//! `new_*` call and is released by the matching `delete_*` call. Calls report
//! through an integer status, [`FLUID_OK`] or [`FLUID_FAILED`]; a few return a
//! domain value instead (font ids, player status, tick counts).
//!
//! Nothing here tracks who still points at what. Keeping a synth alive while a
//! player, driver or renderer uses it is the caller's job.

use anyhow::{Result, anyhow};
use std::{
    ffi::{CStr, CString, c_char, c_int},
    ptr::NonNull,
    sync::mpsc,
    thread::{self, JoinHandle},
};

mod audio;
mod midi;
mod player;
mod renderer;
mod settings;
mod synth;

pub use audio::{RawAudioDriver, delete_audio_driver, new_audio_driver};
pub use midi::{RawMidiDriver, delete_midi_driver, new_midi_driver};
pub use player::{
    FLUID_PLAYER_DONE, FLUID_PLAYER_PLAYING, FLUID_PLAYER_READY, FLUID_PLAYER_STOPPING,
    FLUID_PLAYER_TEMPO_EXTERNAL_BPM, FLUID_PLAYER_TEMPO_EXTERNAL_MIDI,
    FLUID_PLAYER_TEMPO_INTERNAL, RawPlayer, delete_player, new_player, player_add,
    player_add_mem, player_get_bpm, player_get_current_tick, player_get_midi_tempo,
    player_get_status, player_get_total_ticks, player_join, player_play, player_seek,
    player_set_loop, player_set_tempo, player_stop,
};
pub use renderer::{
    RawFileRenderer, delete_file_renderer, file_renderer_process_block, new_file_renderer,
};
pub use settings::{
    RawSettings, delete_settings, new_settings, settings_dupstr, settings_getint,
    settings_getnum, settings_getstr_default, settings_option_concat, settings_setint,
    settings_setnum, settings_setstr,
};
pub use synth::{
    FLUID_CHORUS_DEPTH, FLUID_CHORUS_LEVEL, FLUID_CHORUS_NR, FLUID_CHORUS_SPEED,
    FLUID_CHORUS_TYPE, FLUID_REVERB_DAMP, FLUID_REVERB_LEVEL, FLUID_REVERB_ROOMSIZE,
    FLUID_REVERB_WIDTH, RawSynth, delete_synth, new_synth, synth_activate_key_tuning,
    synth_activate_tuning, synth_all_notes_off, synth_all_sounds_off, synth_bank_select,
    synth_cc, synth_channel_pressure, synth_chorus_on, synth_deactivate_tuning,
    synth_get_chorus_group, synth_get_gain, synth_get_reverb_group, synth_key_pressure,
    synth_noteoff, synth_noteon, synth_pitch_bend, synth_program_change, synth_reverb_on,
    synth_set_chorus_group, synth_set_gain, synth_set_reverb_group, synth_sfcount,
    synth_sfload, synth_sfreload, synth_sfunload, synth_system_reset, synth_write_float,
    synth_write_s16,
};

pub const FLUID_OK: c_int = 0;
pub const FLUID_FAILED: c_int = -1;

fn status(ok: bool) -> c_int {
    if ok { FLUID_OK } else { FLUID_FAILED }
}

/// Borrows a NUL-terminated UTF-8 string handed in by the caller.
///
/// # Safety
/// `ptr` is null or points to a NUL-terminated string that outlives `'a`.
unsafe fn text<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Hands ownership of `s` to the caller, who frees it with [`free_string`].
fn into_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Frees a string allocated by the engine (`settings_dupstr`,
/// `settings_option_concat`).
///
/// # Safety
/// `ptr` is null or came from one of those calls and was not freed yet.
pub unsafe fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Engine pointer that crosses threads (audio callback, MIDI callback,
/// player timer).
pub(crate) struct Shared<T>(NonNull<T>);

// SAFETY: engine objects are internally synchronised. Whoever creates a
// `Shared` guarantees the pointee outlives every copy.
unsafe impl<T: Sync> Send for Shared<T> {}
unsafe impl<T: Sync> Sync for Shared<T> {}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

impl<T> Shared<T> {
    fn new(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// # Safety
    /// The pointee must still be allocated.
    unsafe fn get<'a>(self) -> &'a T {
        unsafe { self.0.as_ref() }
    }
}

/// Thread owning a device resource (output stream, MIDI connections) for its
/// whole life. Those objects are not `Send` on every platform, so they are
/// opened, run and dropped on this one thread.
pub(crate) struct DeviceThread {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceThread {
    fn spawn<R, F>(name: &str, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<R> + Send + 'static,
        R: 'static,
    {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || match open() {
                Ok(resource) => {
                    ready_tx.send(Ok(())).ok();
                    // Returns once the sender is dropped.
                    let _ = stop_rx.recv();
                    drop(resource);
                }
                Err(e) => {
                    ready_tx.send(Err(e)).ok();
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop: Some(stop_tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                handle.join().ok();
                Err(e)
            }
            Err(_) => {
                handle.join().ok();
                Err(anyhow!("{name} thread exited during start-up"))
            }
        }
    }
}

impl Drop for DeviceThread {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("device thread panicked");
            }
        }
    }
}
