//! Synthesizer object: OxiSynth behind a mutex, SoundFont bookkeeping,
//! effect parameters and the block timer that drives sample-timed players.

use super::{FLUID_FAILED, FLUID_OK, RawSettings, Shared, status, text};
use anyhow::{Context, Result, anyhow};
use oxisynth::{
    ChorusParams, MidiEvent, ReverbParams, SoundFont, SoundFontId, Synth, SynthDescriptor, Tuning,
};
use oxisynth_chorus::ChorusMode;
use std::{
    collections::BTreeMap,
    ffi::{c_char, c_double, c_float, c_int, c_void},
    fs::File,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub const FLUID_REVERB_ROOMSIZE: c_int = 0;
pub const FLUID_REVERB_DAMP: c_int = 1;
pub const FLUID_REVERB_WIDTH: c_int = 2;
pub const FLUID_REVERB_LEVEL: c_int = 3;

pub const FLUID_CHORUS_NR: c_int = 0;
pub const FLUID_CHORUS_LEVEL: c_int = 1;
pub const FLUID_CHORUS_SPEED: c_int = 2;
pub const FLUID_CHORUS_DEPTH: c_int = 3;
pub const FLUID_CHORUS_TYPE: c_int = 4;

/// Frames rendered between two timer callbacks.
const BLOCK_FRAMES: usize = 64;

const REVERB_DEFAULTS: [f64; 4] = [0.2, 0.0, 0.5, 0.9];
const REVERB_RANGES: [(f64, f64); 4] = [(0.0, 1.0), (0.0, 1.0), (0.0, 100.0), (0.0, 1.0)];
const CHORUS_DEFAULTS: [f64; 5] = [3.0, 2.0, 0.3, 8.0, 0.0];
const CHORUS_RANGES: [(f64, f64); 5] = [
    (0.0, 99.0),
    (0.0, 10.0),
    (0.1, 5.0),
    (0.0, 256.0),
    (0.0, 1.0),
];

/// Something advanced by rendered audio rather than by the wall clock.
pub(crate) trait SampleTimer: Send + Sync {
    /// Runs once per block, before the block is rendered. `msec` is the
    /// amount of audio rendered so far.
    fn on_block(&self, synth: &mut Synth, msec: u64);
}

struct LoadedFont {
    id: SoundFontId,
    path: PathBuf,
}

pub(crate) struct SynthState {
    pub(super) synth: Synth,
    settings: Shared<RawSettings>,
    midi_channels: u8,
    sample_rate: f32,
    gain: f32,
    fonts: BTreeMap<c_int, LoadedFont>,
    next_font: c_int,
    /// Stored key tunings by (bank, program).
    tunings: BTreeMap<(u8, u8), Tuning>,
    /// Tuning each retuned channel uses.
    channel_tunings: BTreeMap<u8, (u8, u8)>,
    reverb: [f64; 4],
    chorus: [f64; 5],
    reverb_on: bool,
    chorus_on: bool,
    timers: Vec<Arc<dyn SampleTimer>>,
    samples: u64,
    block_pos: usize,
}

pub struct RawSynth {
    state: Mutex<SynthState>,
}

impl RawSynth {
    pub(super) fn lock(&self) -> MutexGuard<'_, SynthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SynthState {
    /// Settings the synth was created from.
    pub(super) fn settings(&self) -> &RawSettings {
        // SAFETY: settings outlive every synth created from them.
        unsafe { self.settings.get() }
    }

    pub(super) fn midi_channels(&self) -> u8 {
        self.midi_channels
    }

    pub(super) fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub(super) fn set_sample_rate(&mut self, rate: f32) {
        if rate != self.sample_rate {
            // Rebuilds the chorus unit with default parameters.
            self.synth.set_sample_rate(rate);
            self.sample_rate = rate;
            self.apply_chorus();
        }
    }

    pub(super) fn add_timer(&mut self, timer: Arc<dyn SampleTimer>) {
        self.timers.push(timer);
    }

    pub(super) fn remove_timer(&mut self, timer: &Arc<dyn SampleTimer>) {
        self.timers
            .retain(|t| !std::ptr::addr_eq(Arc::as_ptr(t), Arc::as_ptr(timer)));
    }

    /// Renders `frames` stereo frames, handing each one to `out`.
    pub(super) fn render(&mut self, frames: usize, mut out: impl FnMut(usize, f32, f32)) {
        for i in 0..frames {
            if self.block_pos == 0 && !self.timers.is_empty() {
                let msec = (self.samples as f64 * 1000.0 / self.sample_rate as f64) as u64;
                for timer in &self.timers {
                    timer.on_block(&mut self.synth, msec);
                }
            }
            let (l, r) = self.synth.read_next();
            out(i, l, r);
            self.block_pos = (self.block_pos + 1) % BLOCK_FRAMES;
            self.samples += 1;
        }
    }

    /// Sends `event` to every MIDI channel.
    pub(super) fn broadcast(&mut self, event: impl Fn(u8) -> MidiEvent) {
        for channel in 0..self.midi_channels {
            self.synth.send_event(event(channel)).ok();
        }
    }

    fn channel(&self, chan: c_int) -> Option<u8> {
        u8::try_from(chan).ok().filter(|c| *c < self.midi_channels)
    }

    fn send(&mut self, event: MidiEvent) -> c_int {
        status(self.synth.send_event(event).is_ok())
    }

    fn add_font(&mut self, font: SoundFont, path: &Path, reset_presets: bool) -> c_int {
        let id = self.synth.add_font(font, reset_presets);

        let key = self.next_font;
        self.next_font += 1;
        self.fonts.insert(
            key,
            LoadedFont {
                id,
                path: path.to_owned(),
            },
        );
        log::debug!("loaded sound-font {} as {key}", path.display());
        key
    }

    /// Pushes the stored reverb parameters to the engine. A switched-off
    /// unit runs at level zero; the stored level comes back when it is
    /// switched on again.
    fn apply_reverb(&mut self) {
        let [roomsize, damp, width, level] = self.reverb;
        self.synth.set_reverb_params(&ReverbParams {
            roomsize: roomsize as f32,
            damp: damp as f32,
            width: width as f32,
            level: if self.reverb_on { level as f32 } else { 0.0 },
        });
    }

    fn apply_chorus(&mut self) {
        let [nr, level, speed, depth, kind] = self.chorus;
        let mode = if kind as i32 == 1 {
            ChorusMode::Triangle
        } else {
            ChorusMode::Sine
        };
        self.synth.set_chorus_params(&ChorusParams {
            nr: nr as u32,
            level: if self.chorus_on { level as f32 } else { 0.0 },
            speed: speed as f32,
            depth: depth as f32,
            mode,
        });
    }

    /// Stores a key tuning and refreshes every channel already using it.
    fn store_tuning(&mut self, key: (u8, u8), tuning: Tuning) -> c_int {
        self.tunings.insert(key, tuning);
        let users: Vec<u8> = self
            .channel_tunings
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(chan, _)| *chan)
            .collect();
        let mut ok = true;
        for channel in users {
            ok &= self.synth.set_tuning(channel, Some(tuning)).is_ok();
        }
        status(ok)
    }
}

/// Reads and parses a SoundFont. Runs without the synth lock held so audio
/// keeps flowing while a large font loads.
fn open_font(path: &Path) -> Result<SoundFont> {
    let mut file =
        File::open(path).with_context(|| format!("open sound-font {}", path.display()))?;
    SoundFont::load(&mut file).map_err(|_| anyhow!("load sound-font {}", path.display()))
}

fn seven_bit(v: c_int) -> Option<u8> {
    u8::try_from(v).ok().filter(|v| *v < 128)
}

fn fourteen_bit(v: c_int) -> Option<u16> {
    u16::try_from(v).ok().filter(|v| *v < 16384)
}

/// The engine has one effects unit; `-1` addresses all groups.
fn fx_group(group: c_int) -> bool {
    group == -1 || group == 0
}

/// Locks the synth behind `synth` and runs `f`, or fails on a null pointer.
///
/// # Safety
/// `synth` is null or a live synth.
unsafe fn with_state(synth: *mut RawSynth, f: impl FnOnce(&mut SynthState) -> c_int) -> c_int {
    match unsafe { synth.as_ref() } {
        Some(synth) => f(&mut synth.lock()),
        None => FLUID_FAILED,
    }
}

/// # Safety
/// `settings` is null or a live settings object, and stays alive until the
/// returned synth is deleted.
pub unsafe fn new_synth(settings: *mut RawSettings) -> *mut RawSynth {
    let Some(shared) = Shared::new(settings) else {
        return std::ptr::null_mut();
    };
    // SAFETY: checked non-null above; liveness is the caller's contract.
    let s = unsafe { shared.get() };

    let sample_rate = s.num("synth.sample-rate").unwrap_or(44100.0) as f32;
    let gain = s.num("synth.gain").unwrap_or(0.2) as f32;
    let midi_channels = s
        .int("synth.midi-channels")
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(16);

    let desc = SynthDescriptor {
        sample_rate,
        gain,
        polyphony: s
            .int("synth.polyphony")
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(256),
        midi_channels,
        // Switched through the stored levels, see `apply_reverb`.
        reverb_active: true,
        chorus_active: true,
        ..Default::default()
    };
    let synth = match Synth::new(desc) {
        Ok(synth) => synth,
        Err(e) => {
            log::error!("synth init: {e:?}");
            return std::ptr::null_mut();
        }
    };

    let mut state = SynthState {
        synth,
        settings: shared,
        midi_channels,
        sample_rate,
        gain,
        fonts: BTreeMap::new(),
        next_font: 1,
        tunings: BTreeMap::new(),
        channel_tunings: BTreeMap::new(),
        reverb: REVERB_DEFAULTS,
        chorus: CHORUS_DEFAULTS,
        reverb_on: s.int("synth.reverb.active") != Some(0),
        chorus_on: s.int("synth.chorus.active") != Some(0),
        timers: Vec::new(),
        samples: 0,
        block_pos: 0,
    };
    state.apply_reverb();
    state.apply_chorus();
    Box::into_raw(Box::new(RawSynth {
        state: Mutex::new(state),
    }))
}

/// # Safety
/// `synth` is null or came from [`new_synth`]; nothing uses it afterwards.
pub unsafe fn delete_synth(synth: *mut RawSynth) {
    if !synth.is_null() {
        drop(unsafe { Box::from_raw(synth) });
    }
}

/// Loads a SoundFont and returns its id (`>= 1`), or [`FLUID_FAILED`].
///
/// # Safety
/// `synth` is null or live; `filename` is a NUL-terminated string.
pub unsafe fn synth_sfload(synth: *mut RawSynth, filename: *const c_char, reset: c_int) -> c_int {
    let (Some(synth), Some(path)) = (unsafe { synth.as_ref() }, unsafe { text(filename) }) else {
        return FLUID_FAILED;
    };
    let path = Path::new(path);
    match open_font(path) {
        Ok(font) => synth.lock().add_font(font, path, reset != 0),
        Err(e) => {
            log::error!("{e:#}");
            FLUID_FAILED
        }
    }
}

/// Reloads a SoundFont from its original path and returns the new id. The
/// old font stays loaded under its id if the file can no longer be read.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_sfreload(synth: *mut RawSynth, id: c_int) -> c_int {
    let Some(synth) = (unsafe { synth.as_ref() }) else {
        return FLUID_FAILED;
    };
    let Some(path) = synth.lock().fonts.get(&id).map(|f| f.path.clone()) else {
        return FLUID_FAILED;
    };
    let font = match open_font(&path) {
        Ok(font) => font,
        Err(e) => {
            log::error!("{e:#}");
            return FLUID_FAILED;
        }
    };

    let mut state = synth.lock();
    // Unloaded by another thread while the file was read.
    let Some(old) = state.fonts.remove(&id) else {
        return FLUID_FAILED;
    };
    let new = state.add_font(font, &path, false);
    let stale = state.synth.remove_font(old.id, false);
    drop(state);
    if stale.is_none() {
        log::warn!("sound-font {id} was already gone from the synth");
    }
    new
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_sfunload(synth: *mut RawSynth, id: c_int, reset: c_int) -> c_int {
    let Some(synth) = (unsafe { synth.as_ref() }) else {
        return FLUID_FAILED;
    };
    let removed = {
        let mut state = synth.lock();
        match state.fonts.remove(&id) {
            Some(font) => state.synth.remove_font(font.id, reset != 0),
            None => None,
        }
    };
    // The font itself is dropped here, outside the lock.
    status(removed.is_some())
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_sfcount(synth: *mut RawSynth) -> c_int {
    unsafe { with_state(synth, |s| s.fonts.len() as c_int) }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_noteon(synth: *mut RawSynth, chan: c_int, key: c_int, vel: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(key), seven_bit(vel)) {
            (Some(channel), Some(key), Some(0)) => s.send(MidiEvent::NoteOff { channel, key }),
            (Some(channel), Some(key), Some(vel)) => {
                s.send(MidiEvent::NoteOn { channel, key, vel })
            }
            _ => FLUID_FAILED,
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_noteoff(synth: *mut RawSynth, chan: c_int, key: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(key)) {
            (Some(channel), Some(key)) => s.send(MidiEvent::NoteOff { channel, key }),
            _ => FLUID_FAILED,
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_program_change(synth: *mut RawSynth, chan: c_int, program: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(program)) {
            (Some(channel), Some(program_id)) => s.send(MidiEvent::ProgramChange {
                channel,
                program_id,
            }),
            _ => FLUID_FAILED,
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_cc(synth: *mut RawSynth, chan: c_int, ctrl: c_int, val: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(ctrl), seven_bit(val)) {
            (Some(channel), Some(ctrl), Some(value)) => s.send(MidiEvent::ControlChange {
                channel,
                ctrl,
                value,
            }),
            _ => FLUID_FAILED,
        })
    }
}

/// `val` is the 14-bit wheel position, 8192 is centre.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_pitch_bend(synth: *mut RawSynth, chan: c_int, val: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), fourteen_bit(val)) {
            (Some(channel), Some(value)) => s.send(MidiEvent::PitchBend { channel, value }),
            _ => FLUID_FAILED,
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_channel_pressure(synth: *mut RawSynth, chan: c_int, val: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(val)) {
            (Some(channel), Some(value)) => s.send(MidiEvent::ChannelPressure { channel, value }),
            _ => FLUID_FAILED,
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_key_pressure(
    synth: *mut RawSynth,
    chan: c_int,
    key: c_int,
    val: c_int,
) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), seven_bit(key), seven_bit(val)) {
            (Some(channel), Some(key), Some(value)) => {
                s.send(MidiEvent::PolyphonicKeyPressure {
                    channel,
                    key,
                    value,
                })
            }
            _ => FLUID_FAILED,
        })
    }
}

/// `chan == -1` releases notes on every channel.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_all_notes_off(synth: *mut RawSynth, chan: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| {
            if chan == -1 {
                s.broadcast(|channel| MidiEvent::AllNotesOff { channel });
                return FLUID_OK;
            }
            match s.channel(chan) {
                Some(channel) => s.send(MidiEvent::AllNotesOff { channel }),
                None => FLUID_FAILED,
            }
        })
    }
}

/// `chan == -1` silences every channel.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_all_sounds_off(synth: *mut RawSynth, chan: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| {
            if chan == -1 {
                s.broadcast(|channel| MidiEvent::AllSoundOff { channel });
                return FLUID_OK;
            }
            match s.channel(chan) {
                Some(channel) => s.send(MidiEvent::AllSoundOff { channel }),
                None => FLUID_FAILED,
            }
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_system_reset(synth: *mut RawSynth) -> c_int {
    unsafe { with_state(synth, |s| s.send(MidiEvent::SystemReset)) }
}

/// Selects a 14-bit bank through controllers 0 (MSB) and 32 (LSB).
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_bank_select(synth: *mut RawSynth, chan: c_int, bank: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| match (s.channel(chan), fourteen_bit(bank)) {
            (Some(channel), Some(bank)) => {
                let msb = s.send(MidiEvent::ControlChange {
                    channel,
                    ctrl: 0,
                    value: (bank >> 7) as u8,
                });
                let lsb = s.send(MidiEvent::ControlChange {
                    channel,
                    ctrl: 32,
                    value: (bank & 0x7f) as u8,
                });
                status(msb == FLUID_OK && lsb == FLUID_OK)
            }
            _ => FLUID_FAILED,
        })
    }
}

/// Creates or replaces the tuning `bank`/`prog` from 128 key pitches in
/// cents. Channels already using that tuning pick up the new pitches.
///
/// # Safety
/// `synth` is null or live; `name` is a NUL-terminated string; `pitch` is
/// null or points to 128 readable doubles.
pub unsafe fn synth_activate_key_tuning(
    synth: *mut RawSynth,
    bank: c_int,
    prog: c_int,
    name: *const c_char,
    pitch: *const c_double,
    _apply: c_int,
) -> c_int {
    let (Some(name), false) = (unsafe { text(name) }, pitch.is_null()) else {
        return FLUID_FAILED;
    };
    let (Some(bank), Some(prog)) = (seven_bit(bank), seven_bit(prog)) else {
        return FLUID_FAILED;
    };
    // SAFETY: non-null and sized by the caller's contract.
    let pitch = unsafe { *pitch.cast::<[f64; 128]>() };
    unsafe {
        with_state(synth, |s| {
            log::debug!("tuning {name:?} stored as {bank}/{prog}");
            s.store_tuning((bank, prog), Tuning::new_key_tuning(pitch))
        })
    }
}

/// Retunes `chan` with a stored tuning. Fails if no tuning was stored under
/// `bank`/`prog`.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_activate_tuning(
    synth: *mut RawSynth,
    chan: c_int,
    bank: c_int,
    prog: c_int,
    _apply: c_int,
) -> c_int {
    unsafe {
        with_state(synth, |s| {
            let (Some(channel), Some(bank), Some(prog)) =
                (s.channel(chan), seven_bit(bank), seven_bit(prog))
            else {
                return FLUID_FAILED;
            };
            let Some(tuning) = s.tunings.get(&(bank, prog)).copied() else {
                return FLUID_FAILED;
            };
            if s.synth.set_tuning(channel, Some(tuning)).is_err() {
                return FLUID_FAILED;
            }
            s.channel_tunings.insert(channel, (bank, prog));
            FLUID_OK
        })
    }
}

/// Returns `chan` to equal temperament.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_deactivate_tuning(synth: *mut RawSynth, chan: c_int, _apply: c_int) -> c_int {
    unsafe {
        with_state(synth, |s| {
            let Some(channel) = s.channel(chan) else {
                return FLUID_FAILED;
            };
            if s.synth.set_tuning(channel, None).is_err() {
                return FLUID_FAILED;
            }
            s.channel_tunings.remove(&channel);
            FLUID_OK
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_set_gain(synth: *mut RawSynth, gain: c_float) {
    unsafe {
        with_state(synth, |s| {
            let gain = gain.clamp(0.0, 10.0);
            s.synth.set_gain(gain);
            s.gain = gain;
            FLUID_OK
        });
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_get_gain(synth: *mut RawSynth) -> c_float {
    match unsafe { synth.as_ref() } {
        Some(synth) => synth.lock().gain,
        None => 0.0,
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_reverb_on(synth: *mut RawSynth, fx: c_int, on: c_int) -> c_int {
    if !fx_group(fx) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            s.reverb_on = on != 0;
            s.apply_reverb();
            FLUID_OK
        })
    }
}

/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_chorus_on(synth: *mut RawSynth, fx: c_int, on: c_int) -> c_int {
    if !fx_group(fx) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            s.chorus_on = on != 0;
            s.apply_chorus();
            FLUID_OK
        })
    }
}

/// Sets one reverb parameter (`FLUID_REVERB_*`) of effects group `fx`.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_set_reverb_group(
    synth: *mut RawSynth,
    fx: c_int,
    param: c_int,
    value: c_double,
) -> c_int {
    let Some(idx) = usize::try_from(param).ok().filter(|i| *i < REVERB_RANGES.len()) else {
        return FLUID_FAILED;
    };
    let (min, max) = REVERB_RANGES[idx];
    if !fx_group(fx) || !(min..=max).contains(&value) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            s.reverb[idx] = value;
            s.apply_reverb();
            FLUID_OK
        })
    }
}

/// # Safety
/// `synth` is null or live; `value` is valid for writes.
pub unsafe fn synth_get_reverb_group(
    synth: *mut RawSynth,
    fx: c_int,
    param: c_int,
    value: *mut c_double,
) -> c_int {
    let Some(idx) = usize::try_from(param).ok().filter(|i| *i < REVERB_RANGES.len()) else {
        return FLUID_FAILED;
    };
    let Some(out) = (unsafe { value.as_mut() }) else {
        return FLUID_FAILED;
    };
    if !fx_group(fx) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            *out = s.reverb[idx];
            FLUID_OK
        })
    }
}

/// Sets one chorus parameter (`FLUID_CHORUS_*`) of effects group `fx`.
///
/// # Safety
/// `synth` is null or live.
pub unsafe fn synth_set_chorus_group(
    synth: *mut RawSynth,
    fx: c_int,
    param: c_int,
    value: c_double,
) -> c_int {
    let Some(idx) = usize::try_from(param).ok().filter(|i| *i < CHORUS_RANGES.len()) else {
        return FLUID_FAILED;
    };
    let (min, max) = CHORUS_RANGES[idx];
    if !fx_group(fx) || !(min..=max).contains(&value) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            s.chorus[idx] = value;
            s.apply_chorus();
            FLUID_OK
        })
    }
}

/// # Safety
/// `synth` is null or live; `value` is valid for writes.
pub unsafe fn synth_get_chorus_group(
    synth: *mut RawSynth,
    fx: c_int,
    param: c_int,
    value: *mut c_double,
) -> c_int {
    let Some(idx) = usize::try_from(param).ok().filter(|i| *i < CHORUS_RANGES.len()) else {
        return FLUID_FAILED;
    };
    let Some(out) = (unsafe { value.as_mut() }) else {
        return FLUID_FAILED;
    };
    if !fx_group(fx) {
        return FLUID_FAILED;
    }
    unsafe {
        with_state(synth, |s| {
            *out = s.chorus[idx];
            FLUID_OK
        })
    }
}

/// Offsets and increments of a strided write, checked non-negative.
struct Layout {
    frames: usize,
    loff: usize,
    lincr: usize,
    roff: usize,
    rincr: usize,
}

impl Layout {
    fn new(len: c_int, loff: c_int, lincr: c_int, roff: c_int, rincr: c_int) -> Option<Self> {
        let positive = |v: c_int| usize::try_from(v).ok().filter(|v| *v > 0);
        let offset = |v: c_int| usize::try_from(v).ok();
        Some(Self {
            frames: positive(len)?,
            loff: offset(loff)?,
            lincr: positive(lincr)?,
            roff: offset(roff)?,
            rincr: positive(rincr)?,
        })
    }
}

/// Writes `len` frames through raw strided pointers. Left and right may
/// share a buffer (interleaved output).
///
/// # Safety
/// Both pointers are valid for writes at `off + i * incr` for every frame.
#[allow(clippy::too_many_arguments)]
unsafe fn write_strided<T>(
    synth: *mut RawSynth,
    len: c_int,
    lout: *mut c_void,
    loff: c_int,
    lincr: c_int,
    rout: *mut c_void,
    roff: c_int,
    rincr: c_int,
    convert: impl Fn(f32) -> T,
) -> c_int {
    let Some(l) = Layout::new(len, loff, lincr, roff, rincr) else {
        return FLUID_FAILED;
    };
    if lout.is_null() || rout.is_null() {
        return FLUID_FAILED;
    }
    let Some(synth) = (unsafe { synth.as_ref() }) else {
        return FLUID_FAILED;
    };
    let (lout, rout) = (lout.cast::<T>(), rout.cast::<T>());
    synth.lock().render(l.frames, |i, left, right| {
        // SAFETY: bounds are the caller's contract.
        unsafe {
            lout.add(l.loff + i * l.lincr).write(convert(left));
            rout.add(l.roff + i * l.rincr).write(convert(right));
        }
    });
    FLUID_OK
}

pub(super) fn to_s16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// # Safety
/// See [`write_strided`]; the buffers hold `i16`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn synth_write_s16(
    synth: *mut RawSynth,
    len: c_int,
    lout: *mut c_void,
    loff: c_int,
    lincr: c_int,
    rout: *mut c_void,
    roff: c_int,
    rincr: c_int,
) -> c_int {
    unsafe { write_strided(synth, len, lout, loff, lincr, rout, roff, rincr, to_s16) }
}

/// # Safety
/// See [`write_strided`]; the buffers hold `f32`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn synth_write_float(
    synth: *mut RawSynth,
    len: c_int,
    lout: *mut c_void,
    loff: c_int,
    lincr: c_int,
    rout: *mut c_void,
    roff: c_int,
    rincr: c_int,
) -> c_int {
    unsafe { write_strided(synth, len, lout, loff, lincr, rout, roff, rincr, |v| v) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{delete_settings, new_settings, settings_setint};

    #[test]
    fn s16_conversion_saturates() {
        assert_eq!(to_s16(0.0), 0);
        assert_eq!(to_s16(2.0), i16::MAX);
        assert_eq!(to_s16(-2.0), i16::MIN);
    }

    #[test]
    fn layout_rejects_negative_and_zero_strides() {
        assert!(Layout::new(4, 0, 2, 1, 2).is_some());
        assert!(Layout::new(0, 0, 2, 1, 2).is_none());
        assert!(Layout::new(4, -1, 2, 1, 2).is_none());
        assert!(Layout::new(4, 0, 0, 1, 2).is_none());
    }

    #[test]
    fn out_of_range_events_fail() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            assert!(!synth.is_null());

            assert_eq!(synth_noteon(synth, 16, 60, 100), FLUID_FAILED);
            assert_eq!(synth_noteon(synth, 0, 128, 100), FLUID_FAILED);
            assert_eq!(synth_pitch_bend(synth, 0, 16384), FLUID_FAILED);
            assert_eq!(synth_cc(synth, 0, 7, 100), FLUID_OK);

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn switching_effects_off_keeps_their_levels() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            let level = |raw: *mut RawSynth| {
                let state = (*raw).lock();
                (
                    state.synth.reverb_params().level,
                    state.synth.chorus_params().level,
                )
            };
            let (reverb, chorus) = level(synth);
            approx::assert_abs_diff_eq!(reverb, 0.9, epsilon = 1e-4);
            approx::assert_abs_diff_eq!(chorus, 2.0, epsilon = 1e-4);

            assert_eq!(synth_reverb_on(synth, -1, 0), FLUID_OK);
            assert_eq!(synth_chorus_on(synth, 0, 0), FLUID_OK);
            assert_eq!(level(synth), (0.0, 0.0));
            // Stored level changes while off are kept for later.
            assert_eq!(
                synth_set_reverb_group(synth, -1, FLUID_REVERB_LEVEL, 0.5),
                FLUID_OK
            );
            assert_eq!(level(synth).0, 0.0);

            assert_eq!(synth_reverb_on(synth, -1, 1), FLUID_OK);
            assert_eq!(synth_chorus_on(synth, -1, 1), FLUID_OK);
            let (reverb, chorus) = level(synth);
            approx::assert_abs_diff_eq!(reverb, 0.5, epsilon = 1e-4);
            approx::assert_abs_diff_eq!(chorus, 2.0, epsilon = 1e-4);
            assert_eq!(synth_reverb_on(synth, 1, 1), FLUID_FAILED);

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn inactive_reverb_setting_starts_silent() {
        unsafe {
            let settings = new_settings();
            assert_eq!(
                settings_setint(settings, c"synth.reverb.active".as_ptr(), 0),
                FLUID_OK
            );
            let synth = new_synth(settings);
            assert_eq!((*synth).lock().synth.reverb_params().level, 0.0);
            assert_eq!(synth_reverb_on(synth, -1, 1), FLUID_OK);
            assert!((*synth).lock().synth.reverb_params().level > 0.0);

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn tunings_are_stored_then_selected_per_channel() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            let pitch: [f64; 128] = std::array::from_fn(|k| k as f64 * 100.0 + 50.0);

            // Nothing stored under 0/3 yet.
            assert_eq!(synth_activate_tuning(synth, 0, 0, 3, 1), FLUID_FAILED);
            assert_eq!(
                synth_activate_key_tuning(synth, 0, 3, c"quarter".as_ptr(), pitch.as_ptr(), 1),
                FLUID_OK
            );
            assert_eq!(synth_activate_tuning(synth, 0, 0, 3, 1), FLUID_OK);
            assert_eq!(synth_activate_tuning(synth, 16, 0, 3, 1), FLUID_FAILED);
            assert_eq!((*synth).lock().channel_tunings.get(&0), Some(&(0, 3)));

            // Replacing a tuning in use keeps the channel on it.
            assert_eq!(
                synth_activate_key_tuning(synth, 0, 3, c"again".as_ptr(), pitch.as_ptr(), 1),
                FLUID_OK
            );
            assert_eq!((*synth).lock().channel_tunings.get(&0), Some(&(0, 3)));

            assert_eq!(synth_deactivate_tuning(synth, 0, 1), FLUID_OK);
            assert!((*synth).lock().channel_tunings.is_empty());
            assert_eq!(synth_deactivate_tuning(synth, 16, 1), FLUID_FAILED);
            assert_eq!(
                synth_activate_key_tuning(synth, 0, 3, c"null".as_ptr(), std::ptr::null(), 1),
                FLUID_FAILED
            );

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn sample_rate_change_keeps_chorus_settings() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            assert_eq!(
                synth_set_chorus_group(synth, -1, FLUID_CHORUS_LEVEL, 1.5),
                FLUID_OK
            );
            let mut state = (*synth).lock();
            state.set_sample_rate(48000.0);
            approx::assert_abs_diff_eq!(state.synth.chorus_params().level, 1.5, epsilon = 1e-4);
            drop(state);

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn unknown_font_ids_fail() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            assert_eq!(synth_sfunload(synth, 1, 1), FLUID_FAILED);
            assert_eq!(synth_sfreload(synth, 1), FLUID_FAILED);
            assert_eq!(synth_sfcount(synth), 0);
            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn font_files_are_read_without_the_synth_lock() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);
            let guard = (*synth).lock();

            let addr = synth as usize;
            let (tx, rx) = std::sync::mpsc::channel();
            let loader = std::thread::spawn(move || {
                let raw = addr as *mut RawSynth;
                let id = synth_sfload(raw, c"/nonexistent/font.sf2".as_ptr(), 1);
                tx.send(id).ok();
            });
            let id = rx.recv_timeout(std::time::Duration::from_secs(5));
            drop(guard);
            loader.join().unwrap();
            assert_eq!(id, Ok(FLUID_FAILED));

            delete_synth(synth);
            delete_settings(settings);
        }
    }

    #[test]
    fn effect_parameters_round_trip_within_range() {
        unsafe {
            let settings = new_settings();
            let synth = new_synth(settings);

            assert_eq!(
                synth_set_reverb_group(synth, -1, FLUID_REVERB_ROOMSIZE, 0.7),
                FLUID_OK
            );
            let mut value = 0.0;
            assert_eq!(
                synth_get_reverb_group(synth, 0, FLUID_REVERB_ROOMSIZE, &mut value),
                FLUID_OK
            );
            assert_eq!(value, 0.7);
            assert_eq!(
                synth_set_reverb_group(synth, 0, FLUID_REVERB_LEVEL, 1.5),
                FLUID_FAILED
            );
            assert_eq!(
                synth_set_chorus_group(synth, 1, FLUID_CHORUS_NR, 4.0),
                FLUID_FAILED
            );

            delete_synth(synth);
            delete_settings(settings);
        }
    }
}
