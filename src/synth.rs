//! Synthesizer handle: SoundFonts, MIDI events, tuning, effects and sample
//! output.

use crate::{
    error::{Error, Operation, Result},
    ffi::{self, FLUID_FAILED, FLUID_OK, RawSynth},
    handle::{Foreign, Handle},
    settings::Settings,
};
use std::{
    ffi::{CString, c_int, c_void},
    path::Path,
    sync::Arc,
};

impl Foreign for RawSynth {
    const KIND: &'static str = "synth";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_synth(raw) }
    }
}

/// Id of a loaded SoundFont.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(i32);

impl FontId {
    pub fn as_raw(self) -> i32 {
        self.0
    }
}

/// A tuning slot, addressed like a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TuningId {
    pub bank: u8,
    pub program: u8,
}

/// Effects unit a reverb or chorus call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxGroup {
    All,
    Index(u32),
}

impl FxGroup {
    fn raw(self) -> c_int {
        match self {
            FxGroup::All => -1,
            FxGroup::Index(i) => c_int::try_from(i).unwrap_or(c_int::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverbParam {
    /// 0.0 to 1.0.
    RoomSize,
    /// 0.0 to 1.0.
    Damp,
    /// 0.0 to 100.0.
    Width,
    /// 0.0 to 1.0.
    Level,
}

impl ReverbParam {
    fn raw(self) -> c_int {
        match self {
            ReverbParam::RoomSize => ffi::FLUID_REVERB_ROOMSIZE,
            ReverbParam::Damp => ffi::FLUID_REVERB_DAMP,
            ReverbParam::Width => ffi::FLUID_REVERB_WIDTH,
            ReverbParam::Level => ffi::FLUID_REVERB_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChorusParam {
    /// Number of voices, 0 to 99.
    Voices,
    /// 0.0 to 10.0.
    Level,
    /// Modulation speed in Hz, 0.1 to 5.0.
    Speed,
    /// Modulation depth in ms, 0.0 to 256.0.
    Depth,
    /// Waveform, see [`ChorusMode`].
    Mode,
}

impl ChorusParam {
    fn raw(self) -> c_int {
        match self {
            ChorusParam::Voices => ffi::FLUID_CHORUS_NR,
            ChorusParam::Level => ffi::FLUID_CHORUS_LEVEL,
            ChorusParam::Speed => ffi::FLUID_CHORUS_SPEED,
            ChorusParam::Depth => ffi::FLUID_CHORUS_DEPTH,
            ChorusParam::Mode => ffi::FLUID_CHORUS_TYPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChorusMode {
    Sine = 0,
    Triangle = 1,
}

type WriteFn =
    unsafe fn(*mut RawSynth, c_int, *mut c_void, c_int, c_int, *mut c_void, c_int, c_int) -> c_int;

fn to_c_int(v: usize, what: &str) -> Result<c_int> {
    c_int::try_from(v).map_err(|_| Error::InvalidArgument(format!("{what} {v} is too large")))
}

/// A synthesizer created from [`Settings`].
///
/// Players, drivers and renderers created from it count as dependents;
/// [`Synth::close`] refuses while any of them is open.
#[derive(Debug)]
pub struct Synth {
    handle: Handle<RawSynth>,
    settings: Arc<Settings>,
}

impl Synth {
    /// Creates a synthesizer configured by `settings` and registers on them.
    /// Fails with [`Error::InvalidArgument`] if the settings are closed.
    pub fn new(settings: &Arc<Settings>) -> Result<Arc<Self>> {
        let raw_settings = settings.acquire()?;
        match Handle::new(unsafe { ffi::new_synth(raw_settings) }) {
            Ok(handle) => Ok(Arc::new(Self {
                handle,
                settings: Arc::clone(settings),
            })),
            Err(e) => {
                settings.release();
                Err(e)
            }
        }
    }

    /// Forwards an engine call and maps a failure status to `op`.
    fn check(&self, op: Operation, f: impl FnOnce(*mut RawSynth) -> c_int) -> Result<()> {
        if self.handle.with(f)? == FLUID_FAILED {
            return Err(Error::OperationFailed(op));
        }
        Ok(())
    }

    // ─────────────────────────── SoundFonts ─────────────────────────── //

    pub fn load_soundfont(&self, path: impl AsRef<Path>, reset_presets: bool) -> Result<FontId> {
        let path = path.as_ref();
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("unusable path {}", path.display())))?;
        let id = self.handle.with(|raw| unsafe {
            ffi::synth_sfload(raw, c_path.as_ptr(), reset_presets as c_int)
        })?;
        if id == FLUID_FAILED {
            return Err(Error::LoadFailed(path.to_owned()));
        }
        Ok(FontId(id))
    }

    /// Loads the font again from its file. The font gets a new id.
    pub fn reload_soundfont(&self, id: FontId) -> Result<FontId> {
        let new = self
            .handle
            .with(|raw| unsafe { ffi::synth_sfreload(raw, id.0) })?;
        if new == FLUID_FAILED {
            return Err(Error::OperationFailed(Operation::ReloadSoundfont { id: id.0 }));
        }
        Ok(FontId(new))
    }

    pub fn unload_soundfont(&self, id: FontId, reset_presets: bool) -> Result<()> {
        self.check(Operation::UnloadSoundfont { id: id.0 }, |raw| unsafe {
            ffi::synth_sfunload(raw, id.0, reset_presets as c_int)
        })
    }

    pub fn soundfont_count(&self) -> Result<usize> {
        let n = self.handle.with(|raw| unsafe { ffi::synth_sfcount(raw) })?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    // ─────────────────────────── MIDI events ─────────────────────────── //

    pub fn note_on(&self, channel: u8, key: u8, velocity: u8) -> Result<()> {
        let op = Operation::NoteOn {
            channel,
            key,
            velocity,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_noteon(raw, channel.into(), key.into(), velocity.into())
        })
    }

    pub fn note_off(&self, channel: u8, key: u8) -> Result<()> {
        self.check(Operation::NoteOff { channel, key }, |raw| unsafe {
            ffi::synth_noteoff(raw, channel.into(), key.into())
        })
    }

    pub fn program_change(&self, channel: u8, program: u8) -> Result<()> {
        self.check(Operation::ProgramChange { channel, program }, |raw| unsafe {
            ffi::synth_program_change(raw, channel.into(), program.into())
        })
    }

    pub fn control_change(&self, channel: u8, controller: u8, value: u8) -> Result<()> {
        let op = Operation::ControlChange {
            channel,
            controller,
            value,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_cc(raw, channel.into(), controller.into(), value.into())
        })
    }

    /// `value` is the 14-bit wheel position; 8192 is centre.
    pub fn pitch_bend(&self, channel: u8, value: u16) -> Result<()> {
        self.check(Operation::PitchBend { channel, value }, |raw| unsafe {
            ffi::synth_pitch_bend(raw, channel.into(), value.into())
        })
    }

    pub fn channel_pressure(&self, channel: u8, value: u8) -> Result<()> {
        self.check(Operation::ChannelPressure { channel, value }, |raw| unsafe {
            ffi::synth_channel_pressure(raw, channel.into(), value.into())
        })
    }

    pub fn key_pressure(&self, channel: u8, key: u8, value: u8) -> Result<()> {
        let op = Operation::KeyPressure {
            channel,
            key,
            value,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_key_pressure(raw, channel.into(), key.into(), value.into())
        })
    }

    /// Releases held notes on `channel`, or on every channel for `None`.
    pub fn all_notes_off(&self, channel: Option<u8>) -> Result<()> {
        let chan = channel.map_or(-1, c_int::from);
        self.check(Operation::AllNotesOff { channel }, |raw| unsafe {
            ffi::synth_all_notes_off(raw, chan)
        })
    }

    /// Cuts every voice on `channel`, or on every channel for `None`.
    pub fn all_sounds_off(&self, channel: Option<u8>) -> Result<()> {
        let chan = channel.map_or(-1, c_int::from);
        self.check(Operation::AllSoundsOff { channel }, |raw| unsafe {
            ffi::synth_all_sounds_off(raw, chan)
        })
    }

    pub fn system_reset(&self) -> Result<()> {
        self.check(Operation::SystemReset, |raw| unsafe {
            ffi::synth_system_reset(raw)
        })
    }

    pub fn bank_select(&self, channel: u8, bank: u16) -> Result<()> {
        self.check(Operation::BankSelect { channel, bank }, |raw| unsafe {
            ffi::synth_bank_select(raw, channel.into(), bank.into())
        })
    }

    // ─────────────────────────── tuning ─────────────────────────── //

    /// Stores a tuning under `id` from 128 per-key pitches in cents.
    pub fn activate_key_tuning(
        &self,
        id: TuningId,
        name: &str,
        pitch: &[f64; 128],
        apply: bool,
    ) -> Result<()> {
        let c_name = CString::new(name)
            .map_err(|_| Error::InvalidArgument(format!("tuning name {name:?} contains NUL")))?;
        let op = Operation::KeyTuning {
            bank: id.bank,
            program: id.program,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_activate_key_tuning(
                raw,
                id.bank.into(),
                id.program.into(),
                c_name.as_ptr(),
                pitch.as_ptr(),
                apply as c_int,
            )
        })
    }

    pub fn activate_tuning(&self, channel: u8, id: TuningId, apply: bool) -> Result<()> {
        let op = Operation::ActivateTuning {
            channel,
            bank: id.bank,
            program: id.program,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_activate_tuning(
                raw,
                channel.into(),
                id.bank.into(),
                id.program.into(),
                apply as c_int,
            )
        })
    }

    pub fn deactivate_tuning(&self, channel: u8, apply: bool) -> Result<()> {
        self.check(Operation::DeactivateTuning { channel }, |raw| unsafe {
            ffi::synth_deactivate_tuning(raw, channel.into(), apply as c_int)
        })
    }

    // ─────────────────────────── gain & effects ─────────────────────────── //

    /// Master gain, clamped by the engine to 0.0..=10.0.
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        self.handle
            .with(|raw| unsafe { ffi::synth_set_gain(raw, gain) })
    }

    pub fn gain(&self) -> Result<f32> {
        self.handle.with(|raw| unsafe { ffi::synth_get_gain(raw) })
    }

    pub fn set_reverb_on(&self, group: FxGroup, on: bool) -> Result<()> {
        let fx = group.raw();
        self.check(Operation::ReverbOn { group: fx, on }, |raw| unsafe {
            ffi::synth_reverb_on(raw, fx, on as c_int)
        })
    }

    pub fn set_chorus_on(&self, group: FxGroup, on: bool) -> Result<()> {
        let fx = group.raw();
        self.check(Operation::ChorusOn { group: fx, on }, |raw| unsafe {
            ffi::synth_chorus_on(raw, fx, on as c_int)
        })
    }

    pub fn set_reverb(&self, group: FxGroup, param: ReverbParam, value: f64) -> Result<()> {
        let (fx, param) = (group.raw(), param.raw());
        let op = Operation::SetReverb {
            group: fx,
            param,
            value,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_set_reverb_group(raw, fx, param, value)
        })
    }

    pub fn reverb(&self, group: FxGroup, param: ReverbParam) -> Result<f64> {
        let (fx, param) = (group.raw(), param.raw());
        let mut value = 0.0;
        self.check(Operation::GetReverb { group: fx, param }, |raw| unsafe {
            ffi::synth_get_reverb_group(raw, fx, param, &mut value)
        })?;
        Ok(value)
    }

    pub fn set_chorus(&self, group: FxGroup, param: ChorusParam, value: f64) -> Result<()> {
        let (fx, param) = (group.raw(), param.raw());
        let op = Operation::SetChorus {
            group: fx,
            param,
            value,
        };
        self.check(op, |raw| unsafe {
            ffi::synth_set_chorus_group(raw, fx, param, value)
        })
    }

    pub fn chorus(&self, group: FxGroup, param: ChorusParam) -> Result<f64> {
        let (fx, param) = (group.raw(), param.raw());
        let mut value = 0.0;
        self.check(Operation::GetChorus { group: fx, param }, |raw| unsafe {
            ffi::synth_get_chorus_group(raw, fx, param, &mut value)
        })?;
        Ok(value)
    }

    pub fn set_chorus_mode(&self, group: FxGroup, mode: ChorusMode) -> Result<()> {
        self.set_chorus(group, ChorusParam::Mode, mode as i32 as f64)
    }

    // ─────────────────────────── sample output ─────────────────────────── //

    fn write<T>(
        &self,
        left: &mut [T],
        right: &mut [T],
        left_stride: usize,
        right_stride: usize,
        engine: WriteFn,
    ) -> Result<usize> {
        if left.is_empty() || right.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if left_stride == 0 || right_stride == 0 {
            return Err(Error::InvalidArgument("stride must be positive".to_owned()));
        }
        let frames = left
            .len()
            .div_ceil(left_stride)
            .min(right.len().div_ceil(right_stride));
        if frames == 0 {
            return Err(Error::NoFrames);
        }
        let len = to_c_int(frames, "frame count")?;
        let lincr = to_c_int(left_stride, "stride")?;
        let rincr = to_c_int(right_stride, "stride")?;

        let lout: *mut c_void = left.as_mut_ptr().cast();
        let rout: *mut c_void = right.as_mut_ptr().cast();
        let status = self.handle.try_with(|raw| unsafe {
            engine(raw, len, lout, 0, lincr, rout, 0, rincr)
        })?;
        if status != FLUID_OK {
            return Err(Error::OperationFailed(Operation::WriteSamples { frames }));
        }
        Ok(frames)
    }

    fn write_interleaved<T>(&self, buf: &mut [T], engine: WriteFn) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        let frames = buf.len() / 2;
        if frames == 0 {
            return Err(Error::NoFrames);
        }
        let len = to_c_int(frames, "frame count")?;
        let out: *mut c_void = buf.as_mut_ptr().cast();
        let status = self
            .handle
            .try_with(|raw| unsafe { engine(raw, len, out, 0, 2, out, 1, 2) })?;
        if status != FLUID_OK {
            return Err(Error::OperationFailed(Operation::WriteSamples { frames }));
        }
        Ok(frames)
    }

    /// Renders straight into `left` and `right`, writing sample `i` of each
    /// channel at `i * stride`. Renders `min(ceil(len / stride))` frames and
    /// returns that count.
    ///
    /// Never blocks on the handle lock, so it can run inside an audio
    /// callback; a close in progress makes it fail with
    /// [`Error::InvalidState`].
    pub fn write_s16(
        &self,
        left: &mut [i16],
        right: &mut [i16],
        left_stride: usize,
        right_stride: usize,
    ) -> Result<usize> {
        self.write(left, right, left_stride, right_stride, ffi::synth_write_s16)
    }

    /// See [`Synth::write_s16`].
    pub fn write_float(
        &self,
        left: &mut [f32],
        right: &mut [f32],
        left_stride: usize,
        right_stride: usize,
    ) -> Result<usize> {
        self.write(left, right, left_stride, right_stride, ffi::synth_write_float)
    }

    /// Renders `buf.len() / 2` interleaved stereo frames.
    pub fn write_s16_interleaved(&self, buf: &mut [i16]) -> Result<usize> {
        self.write_interleaved(buf, ffi::synth_write_s16)
    }

    pub fn write_float_interleaved(&self, buf: &mut [f32]) -> Result<usize> {
        self.write_interleaved(buf, ffi::synth_write_float)
    }

    // ─────────────────────────── lifecycle ─────────────────────────── //

    /// Frees the engine object and releases the settings. Fails while a
    /// player, driver or renderer is open; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.handle.close()? {
            self.settings.release();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Number of open players, drivers and renderers using this synth.
    pub fn dependents(&self) -> usize {
        self.handle.dependents()
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub(crate) fn acquire(&self) -> Result<*mut RawSynth> {
        self.handle
            .register()
            .ok_or_else(|| Error::InvalidArgument("synth is closed".to_owned()))
    }

    pub(crate) fn release(&self) {
        self.handle.release();
    }
}

impl Drop for Synth {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.settings.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NameInterner;

    fn synth() -> (Arc<Settings>, Arc<Synth>) {
        let settings = Settings::with_interner(Arc::new(NameInterner::new())).unwrap();
        let synth = Synth::new(&settings).unwrap();
        (settings, synth)
    }

    fn teardown(settings: Arc<Settings>, synth: Arc<Synth>) {
        synth.close().unwrap();
        settings.close().unwrap();
    }

    #[test]
    fn stride_two_fills_four_frames() {
        let (settings, synth) = synth();
        let mut left = [1i16; 8];
        let mut right = [1i16; 8];
        assert_eq!(synth.write_s16(&mut left, &mut right, 2, 2).unwrap(), 4);
        // Silence lands on the strided slots, the gaps are untouched.
        assert_eq!(left, [0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(right, [0, 1, 0, 1, 0, 1, 0, 1]);
        teardown(settings, synth);
    }

    #[test]
    fn frame_count_is_the_shorter_side() {
        let (settings, synth) = synth();
        let mut left = [0f32; 7];
        let mut right = [0f32; 3];
        assert_eq!(synth.write_float(&mut left, &mut right, 2, 1).unwrap(), 3);
        teardown(settings, synth);
    }

    #[test]
    fn empty_buffers_and_bad_strides() {
        let (settings, synth) = synth();
        let mut left = [5i16; 8];
        let mut empty: [i16; 0] = [];
        assert!(matches!(
            synth.write_s16(&mut left, &mut empty, 2, 2),
            Err(Error::EmptyBuffer)
        ));
        assert_eq!(left, [5; 8]);

        let mut right = [0i16; 8];
        assert!(matches!(
            synth.write_s16(&mut left, &mut right, 0, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            synth.write_s16_interleaved(&mut [0i16; 1]),
            Err(Error::NoFrames)
        ));
        assert_eq!(synth.write_float_interleaved(&mut [0f32; 9]).unwrap(), 4);
        teardown(settings, synth);
    }

    #[test]
    fn engine_rejections_carry_parameters() {
        let (settings, synth) = synth();
        synth.note_on(0, 60, 100).unwrap();
        synth.note_off(0, 60).unwrap();
        let err = synth.note_on(16, 60, 100).unwrap_err();
        assert!(matches!(
            err,
            Error::OperationFailed(Operation::NoteOn {
                channel: 16,
                key: 60,
                velocity: 100
            })
        ));
        assert!(matches!(
            synth.note_on(0, 200, 1),
            Err(Error::OperationFailed(_))
        ));
        synth.all_notes_off(None).unwrap();
        teardown(settings, synth);
    }

    #[test]
    fn effects_and_gain() {
        let (settings, synth) = synth();
        synth
            .set_reverb(FxGroup::All, ReverbParam::RoomSize, 0.6)
            .unwrap();
        assert_eq!(
            synth.reverb(FxGroup::Index(0), ReverbParam::RoomSize).unwrap(),
            0.6
        );
        synth.set_chorus_mode(FxGroup::All, ChorusMode::Triangle).unwrap();
        assert_eq!(
            synth.chorus(FxGroup::All, ChorusParam::Mode).unwrap(),
            1.0
        );
        assert!(synth
            .set_reverb(FxGroup::Index(3), ReverbParam::Damp, 0.1)
            .is_err());

        synth.set_gain(0.8).unwrap();
        approx::assert_relative_eq!(synth.gain().unwrap(), 0.8);
        teardown(settings, synth);
    }

    #[test]
    fn key_tuning_activates_and_deactivates() {
        let (settings, synth) = synth();
        let id = TuningId { bank: 0, program: 1 };
        let pitch: [f64; 128] = std::array::from_fn(|k| k as f64 * 100.0 - 14.0);

        assert!(matches!(
            synth.activate_tuning(0, id, true),
            Err(Error::OperationFailed(Operation::ActivateTuning { .. }))
        ));
        synth.activate_key_tuning(id, "flat", &pitch, true).unwrap();
        synth.activate_tuning(0, id, true).unwrap();
        assert!(matches!(
            synth.activate_tuning(16, id, true),
            Err(Error::OperationFailed(Operation::ActivateTuning {
                channel: 16,
                bank: 0,
                program: 1
            }))
        ));
        synth.note_on(0, 60, 90).unwrap();
        synth.deactivate_tuning(0, true).unwrap();
        assert!(matches!(
            synth.deactivate_tuning(16, true),
            Err(Error::OperationFailed(Operation::DeactivateTuning { channel: 16 }))
        ));
        assert!(matches!(
            synth.activate_key_tuning(TuningId { bank: 128, program: 0 }, "x", &pitch, true),
            Err(Error::OperationFailed(Operation::KeyTuning { bank: 128, .. }))
        ));
        teardown(settings, synth);
    }

    #[test]
    fn effects_switch_off_and_on() {
        let (settings, synth) = synth();
        synth.set_reverb_on(FxGroup::All, false).unwrap();
        synth.set_chorus_on(FxGroup::Index(0), false).unwrap();
        // Parameters stay settable and readable while the unit is off.
        synth
            .set_reverb(FxGroup::All, ReverbParam::Level, 0.4)
            .unwrap();
        approx::assert_relative_eq!(
            synth.reverb(FxGroup::All, ReverbParam::Level).unwrap(),
            0.4
        );
        synth.set_reverb_on(FxGroup::All, true).unwrap();
        synth.set_chorus_on(FxGroup::All, true).unwrap();
        approx::assert_relative_eq!(
            synth.chorus(FxGroup::All, ChorusParam::Level).unwrap(),
            2.0
        );
        assert!(matches!(
            synth.set_chorus_on(FxGroup::Index(1), true),
            Err(Error::OperationFailed(Operation::ChorusOn { group: 1, on: true }))
        ));
        teardown(settings, synth);
    }

    #[test]
    fn unloading_an_unknown_font_fails() {
        let (settings, synth) = synth();
        assert!(matches!(
            synth.unload_soundfont(FontId(7), true),
            Err(Error::OperationFailed(Operation::UnloadSoundfont { id: 7 }))
        ));
        assert!(matches!(
            synth.reload_soundfont(FontId(7)),
            Err(Error::OperationFailed(Operation::ReloadSoundfont { id: 7 }))
        ));
        teardown(settings, synth);
    }

    #[test]
    fn missing_soundfont_is_load_failure() {
        let (settings, synth) = synth();
        let err = synth
            .load_soundfont("/nonexistent/font.sf2", true)
            .unwrap_err();
        assert!(matches!(err, Error::LoadFailed(p) if p == Path::new("/nonexistent/font.sf2")));
        assert_eq!(synth.soundfont_count().unwrap(), 0);
        teardown(settings, synth);
    }

    #[test]
    fn closed_synth_is_invalid_state() {
        let (settings, synth) = synth();
        assert_eq!(settings.dependents(), 1);
        synth.close().unwrap();
        assert_eq!(settings.dependents(), 0);
        assert!(matches!(
            synth.note_on(0, 60, 1),
            Err(Error::InvalidState("synth"))
        ));
        assert!(matches!(
            synth.write_float_interleaved(&mut [0.0; 4]),
            Err(Error::InvalidState("synth"))
        ));
        settings.close().unwrap();
    }
}
