//! Standard MIDI File player: playlist, tempo map and the two clocks that can
//! drive it.
//!
//! With the `sample` timing source the player advances from the synth's
//! render loop, so time only passes while somebody pulls audio. With `system`
//! a clock thread advances it from wall time.

use super::{FLUID_FAILED, FLUID_OK, RawSynth, Shared, midi::decode_midi, synth::SampleTimer, text};
use anyhow::{Context, Result, bail};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind, num::u4};
use oxisynth::{MidiEvent, Synth};
use std::{
    ffi::{c_char, c_double, c_int, c_void},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub const FLUID_PLAYER_READY: c_int = 0;
pub const FLUID_PLAYER_PLAYING: c_int = 1;
pub const FLUID_PLAYER_STOPPING: c_int = 2;
pub const FLUID_PLAYER_DONE: c_int = 3;

pub const FLUID_PLAYER_TEMPO_INTERNAL: c_int = 0;
pub const FLUID_PLAYER_TEMPO_EXTERNAL_BPM: c_int = 1;
pub const FLUID_PLAYER_TEMPO_EXTERNAL_MIDI: c_int = 2;

/// 120 BPM, the SMF default until a tempo event says otherwise.
const DEFAULT_TEMPO: u32 = 500_000;
const CLOCK_PERIOD: Duration = Duration::from_millis(4);

#[derive(Clone, Copy)]
enum EventKind {
    Midi([u8; 3]),
    Tempo(u32),
}

#[derive(Clone, Copy)]
struct Event {
    tick: u32,
    kind: EventKind,
}

struct Song {
    division: u16,
    events: Vec<Event>,
    total_ticks: u32,
}

fn encode(channel: u4, message: MidiMessage) -> [u8; 3] {
    let ch = channel.as_int();
    match message {
        MidiMessage::NoteOff { key, vel } => [0x80 | ch, key.as_int(), vel.as_int()],
        MidiMessage::NoteOn { key, vel } => [0x90 | ch, key.as_int(), vel.as_int()],
        MidiMessage::Aftertouch { key, vel } => [0xA0 | ch, key.as_int(), vel.as_int()],
        MidiMessage::Controller { controller, value } => {
            [0xB0 | ch, controller.as_int(), value.as_int()]
        }
        MidiMessage::ProgramChange { program } => [0xC0 | ch, program.as_int(), 0],
        MidiMessage::ChannelAftertouch { vel } => [0xD0 | ch, vel.as_int(), 0],
        MidiMessage::PitchBend { bend } => {
            let v = bend.0.as_int();
            [0xE0 | ch, (v & 0x7f) as u8, (v >> 7) as u8]
        }
    }
}

impl Song {
    /// Merges every track into one tick-ordered event list.
    fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).context("parse MIDI file")?;
        let division = match smf.header.timing {
            Timing::Metrical(tpb) if tpb.as_int() > 0 => tpb.as_int(),
            Timing::Metrical(_) => bail!("MIDI file has zero ticks per beat"),
            Timing::Timecode(..) => bail!("SMPTE timecode MIDI files are not supported"),
        };

        let mut events = Vec::new();
        let mut total_ticks = 0;
        for track in &smf.tracks {
            let mut tick = 0u32;
            for ev in track {
                tick = tick.saturating_add(ev.delta.as_int());
                match ev.kind {
                    TrackEventKind::Midi { channel, message } => events.push(Event {
                        tick,
                        kind: EventKind::Midi(encode(channel, message)),
                    }),
                    TrackEventKind::Meta(MetaMessage::Tempo(usec)) => events.push(Event {
                        tick,
                        kind: EventKind::Tempo(usec.as_int().max(1)),
                    }),
                    _ => {}
                }
            }
            total_ticks = total_ticks.max(tick);
        }
        // Stable, so same-tick events keep their track order.
        events.sort_by_key(|e| e.tick);

        Ok(Self {
            division,
            events,
            total_ticks,
        })
    }
}

fn is_note(bytes: &[u8; 3]) -> bool {
    matches!(bytes[0] & 0xF0, 0x80 | 0x90 | 0xA0)
}

fn dispatch(synth: &mut Synth, bytes: &[u8; 3]) {
    if let Some(ev) = decode_midi(bytes) {
        synth.send_event(ev).ok();
    }
}

/// Every MIDI channel the synth was built with.
fn channels(synth: &Synth) -> std::ops::Range<u8> {
    0..u8::try_from(synth.channel_count()).unwrap_or(u8::MAX)
}

fn all_notes_off(synth: &mut Synth) {
    for channel in channels(synth) {
        synth.send_event(MidiEvent::AllNotesOff { channel }).ok();
    }
}

struct PlayerCore {
    status: c_int,
    playlist: Vec<Song>,
    current: usize,
    next_event: usize,
    tick: u32,
    loop_count: i32,
    loops_left: i32,
    file_tempo: u32,
    tempo_mode: c_int,
    tempo_value: f64,
    /// Wall/sample time in msec paired with the tick it corresponds to.
    anchor: Option<(f64, f64)>,
    seek_to: Option<u32>,
    /// Set when a song starts; cleared once the synth was reset for it.
    fresh: bool,
    reset_synth: bool,
    clock_running: bool,
}

impl PlayerCore {
    fn new(reset_synth: bool) -> Self {
        Self {
            status: FLUID_PLAYER_READY,
            playlist: Vec::new(),
            current: 0,
            next_event: 0,
            tick: 0,
            loop_count: 1,
            loops_left: 1,
            file_tempo: DEFAULT_TEMPO,
            tempo_mode: FLUID_PLAYER_TEMPO_INTERNAL,
            tempo_value: 1.0,
            anchor: None,
            seek_to: None,
            fresh: true,
            reset_synth,
            clock_running: false,
        }
    }

    /// Microseconds per quarter note after applying the tempo mode.
    fn usec_per_quarter(&self) -> f64 {
        match self.tempo_mode {
            FLUID_PLAYER_TEMPO_EXTERNAL_BPM => 60_000_000.0 / self.tempo_value,
            FLUID_PLAYER_TEMPO_EXTERNAL_MIDI => self.tempo_value,
            _ => self.file_tempo as f64 / self.tempo_value,
        }
    }

    fn msec_per_tick(&self, division: u16) -> f64 {
        self.usec_per_quarter() / 1000.0 / division as f64
    }

    fn total_ticks(&self) -> u32 {
        self.playlist.get(self.current).map_or(0, |s| s.total_ticks)
    }

    fn rewind(&mut self) {
        self.current = 0;
        self.next_event = 0;
        self.tick = 0;
        self.file_tempo = DEFAULT_TEMPO;
        self.loops_left = self.loop_count;
        self.anchor = None;
        self.seek_to = None;
        self.fresh = true;
    }

    /// Moves to the next song, wrapping around while loops remain. Returns
    /// false once the playlist is exhausted.
    fn next_song(&mut self) -> bool {
        if self.current + 1 < self.playlist.len() {
            self.current += 1;
        } else {
            if self.loops_left > 0 {
                self.loops_left -= 1;
            }
            if self.loops_left == 0 {
                return false;
            }
            self.current = 0;
        }
        self.next_event = 0;
        self.tick = 0;
        self.file_tempo = DEFAULT_TEMPO;
        self.fresh = true;
        true
    }

    fn start_song(&mut self, synth: &mut Synth) {
        if self.fresh {
            if self.reset_synth {
                synth.send_event(MidiEvent::SystemReset).ok();
            }
            self.fresh = false;
        }
    }

    /// Silences the synth and replays every non-note event before `target`
    /// so controllers and programs match the new position.
    fn apply_seek(&mut self, synth: &mut Synth, target: u32) {
        all_notes_off(synth);
        self.file_tempo = DEFAULT_TEMPO;
        self.next_event = 0;
        let Some(song) = self.playlist.get(self.current) else {
            return;
        };
        for ev in song.events.iter().take_while(|e| e.tick < target) {
            match ev.kind {
                EventKind::Midi(bytes) if !is_note(&bytes) => dispatch(synth, &bytes),
                EventKind::Midi(_) => {}
                EventKind::Tempo(usec) => self.file_tempo = usec,
            }
            self.next_event += 1;
        }
        self.tick = target;
        self.anchor = None;
    }

    /// Plays every event due by `msec`. Returns true when playback reached
    /// the end of the playlist during this call.
    fn advance(&mut self, synth: &mut Synth, msec: u64) -> bool {
        if self.status != FLUID_PLAYER_PLAYING || self.playlist.is_empty() {
            return false;
        }
        let now = msec as f64;
        // Reset before replaying seek state, not after.
        self.start_song(synth);
        if let Some(target) = self.seek_to.take() {
            self.apply_seek(synth, target);
        }
        let (mut anchor_msec, mut anchor_tick) = self.anchor.unwrap_or((now, self.tick as f64));
        let mut restarts = 0;

        loop {
            self.start_song(synth);
            let (division, total, next) = {
                let song = &self.playlist[self.current];
                (
                    song.division,
                    song.total_ticks,
                    song.events.get(self.next_event).copied(),
                )
            };
            let mpt = self.msec_per_tick(division);

            let Some(ev) = next else {
                let end = anchor_msec + (total as f64 - anchor_tick) * mpt;
                if end > now {
                    break;
                }
                if !self.next_song() {
                    self.status = FLUID_PLAYER_DONE;
                    self.tick = total;
                    self.anchor = None;
                    log::debug!("player reached end of playlist");
                    return true;
                }
                if self.current == 0 {
                    restarts += 1;
                    if restarts > 1 {
                        // Zero-length playlist: pick up again next call.
                        self.anchor = None;
                        return false;
                    }
                }
                anchor_msec = end;
                anchor_tick = 0.0;
                continue;
            };

            let due = anchor_msec + (ev.tick as f64 - anchor_tick) * mpt;
            if due > now {
                break;
            }
            self.next_event += 1;
            match ev.kind {
                EventKind::Midi(bytes) => dispatch(synth, &bytes),
                EventKind::Tempo(usec) => {
                    self.file_tempo = usec;
                    anchor_msec = due;
                    anchor_tick = ev.tick as f64;
                }
            }
        }

        let song = &self.playlist[self.current];
        let pos = anchor_tick + (now - anchor_msec) / self.msec_per_tick(song.division);
        self.tick = (pos.max(0.0) as u32).min(song.total_ticks);
        self.anchor = Some((anchor_msec, anchor_tick));
        false
    }
}

struct PlayerShared {
    core: Mutex<PlayerCore>,
    changed: Condvar,
}

impl PlayerShared {
    fn core(&self) -> MutexGuard<'_, PlayerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, synth: &mut Synth, msec: u64) -> MutexGuard<'_, PlayerCore> {
        let mut core = self.core();
        if core.advance(synth, msec) {
            self.changed.notify_all();
        }
        core
    }
}

impl SampleTimer for PlayerShared {
    fn on_block(&self, synth: &mut Synth, msec: u64) {
        drop(self.tick(synth, msec));
    }
}

enum Clock {
    Sample(Arc<dyn SampleTimer>),
    System,
}

pub struct RawPlayer {
    shared: Arc<PlayerShared>,
    synth: Shared<RawSynth>,
    clock: Clock,
    thread: Mutex<Option<JoinHandle<()>>>,
}

fn run_clock(shared: Arc<PlayerShared>, synth: Shared<RawSynth>) {
    let start = Instant::now();
    loop {
        {
            // SAFETY: the player joins this thread before its synth goes away.
            let mut state = unsafe { synth.get() }.lock();
            let msec = start.elapsed().as_millis() as u64;
            let mut core = shared.tick(&mut state.synth, msec);
            if core.status != FLUID_PLAYER_PLAYING {
                core.clock_running = false;
                break;
            }
        }
        thread::sleep(CLOCK_PERIOD);
    }
}

impl RawPlayer {
    fn add_song(&self, bytes: &[u8]) -> c_int {
        match Song::parse(bytes) {
            Ok(song) => {
                self.shared.core().playlist.push(song);
                FLUID_OK
            }
            Err(e) => {
                log::error!("player: {e:#}");
                FLUID_FAILED
            }
        }
    }

    fn play(&self) -> c_int {
        let mut core = self.shared.core();
        if core.playlist.is_empty() {
            return FLUID_FAILED;
        }
        match core.status {
            FLUID_PLAYER_PLAYING => return FLUID_OK,
            FLUID_PLAYER_READY => core.anchor = None,
            _ => core.rewind(),
        }
        core.status = FLUID_PLAYER_PLAYING;

        if matches!(self.clock, Clock::System) && !core.clock_running {
            core.clock_running = true;
            drop(core);

            let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(old) = slot.take() {
                old.join().ok();
            }
            let shared = Arc::clone(&self.shared);
            let synth = self.synth;
            match thread::Builder::new()
                .name("player-clock".into())
                .spawn(move || run_clock(shared, synth))
            {
                Ok(handle) => *slot = Some(handle),
                Err(e) => {
                    log::error!("player clock: {e}");
                    let mut core = self.shared.core();
                    core.clock_running = false;
                    core.status = FLUID_PLAYER_READY;
                    return FLUID_FAILED;
                }
            }
        }
        FLUID_OK
    }

    fn stop(&self) {
        {
            let mut core = self.shared.core();
            if core.status != FLUID_PLAYER_PLAYING {
                return;
            }
            core.status = FLUID_PLAYER_STOPPING;
        }
        // SAFETY: the synth outlives the player.
        let synth = unsafe { self.synth.get() };
        synth
            .lock()
            .broadcast(|channel| MidiEvent::AllNotesOff { channel });

        let mut core = self.shared.core();
        if core.status == FLUID_PLAYER_STOPPING {
            core.status = FLUID_PLAYER_DONE;
        }
        drop(core);
        self.shared.changed.notify_all();
    }

    fn join(&self) {
        let mut core = self.shared.core();
        while matches!(core.status, FLUID_PLAYER_PLAYING | FLUID_PLAYER_STOPPING) {
            core = self
                .shared
                .changed
                .wait(core)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Creates a player bound to `synth`. Timing source and synth reset policy
/// come from the synth's settings.
///
/// # Safety
/// `synth` is null or live, and stays alive until the player is deleted.
pub unsafe fn new_player(synth: *mut RawSynth) -> *mut RawPlayer {
    let Some(shared_synth) = Shared::new(synth) else {
        return std::ptr::null_mut();
    };
    let mut state = unsafe { shared_synth.get() }.lock();
    let settings = state.settings();
    let system = settings.string("player.timing-source").as_deref() == Some("system");
    let reset_synth = settings.int("player.reset-synth") != Some(0);

    let shared = Arc::new(PlayerShared {
        core: Mutex::new(PlayerCore::new(reset_synth)),
        changed: Condvar::new(),
    });
    let clock = if system {
        Clock::System
    } else {
        let timer: Arc<dyn SampleTimer> = shared.clone();
        state.add_timer(Arc::clone(&timer));
        Clock::Sample(timer)
    };
    drop(state);

    Box::into_raw(Box::new(RawPlayer {
        shared,
        synth: shared_synth,
        clock,
        thread: Mutex::new(None),
    }))
}

/// Stops playback, detaches from the synth and frees the player.
///
/// # Safety
/// `player` is null or came from [`new_player`]; its synth is still live.
pub unsafe fn delete_player(player: *mut RawPlayer) {
    if player.is_null() {
        return;
    }
    let player = unsafe { Box::from_raw(player) };
    player.stop();
    if let Clock::Sample(timer) = &player.clock {
        unsafe { player.synth.get() }.lock().remove_timer(timer);
    }
    let handle = player
        .thread
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(handle) = handle {
        handle.join().ok();
    }
}

/// # Safety
/// `player` is null or live; `filename` is a NUL-terminated string.
pub unsafe fn player_add(player: *mut RawPlayer, filename: *const c_char) -> c_int {
    let (Some(p), Some(path)) = (unsafe { player.as_ref() }, unsafe { text(filename) }) else {
        return FLUID_FAILED;
    };
    match std::fs::read(path) {
        Ok(bytes) => p.add_song(&bytes),
        Err(e) => {
            log::error!("player: read {path}: {e}");
            FLUID_FAILED
        }
    }
}

/// Queues a MIDI file held in memory. The bytes are copied.
///
/// # Safety
/// `player` is null or live; `buffer` points to `len` readable bytes.
pub unsafe fn player_add_mem(player: *mut RawPlayer, buffer: *const c_void, len: usize) -> c_int {
    let Some(p) = (unsafe { player.as_ref() }) else {
        return FLUID_FAILED;
    };
    if buffer.is_null() || len == 0 {
        return FLUID_FAILED;
    }
    let bytes = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), len) };
    p.add_song(bytes)
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_play(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => p.play(),
        None => FLUID_FAILED,
    }
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_stop(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => {
            p.stop();
            FLUID_OK
        }
        None => FLUID_FAILED,
    }
}

/// Blocks until playback is done. Returns at once when nothing is playing.
///
/// # Safety
/// `player` is null or live.
pub unsafe fn player_join(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => {
            p.join();
            FLUID_OK
        }
        None => FLUID_FAILED,
    }
}

/// Moves to `ticks` in the current song. Takes effect on the next clock
/// step.
///
/// # Safety
/// `player` is null or live.
pub unsafe fn player_seek(player: *mut RawPlayer, ticks: c_int) -> c_int {
    let Some(p) = (unsafe { player.as_ref() }) else {
        return FLUID_FAILED;
    };
    let mut core = p.shared.core();
    let Ok(target) = u32::try_from(ticks) else {
        return FLUID_FAILED;
    };
    if matches!(core.status, FLUID_PLAYER_STOPPING | FLUID_PLAYER_DONE)
        || target > core.total_ticks()
    {
        return FLUID_FAILED;
    }
    core.seek_to = Some(target);
    core.tick = target;
    FLUID_OK
}

/// Plays the playlist `count` times; `-1` loops forever.
///
/// # Safety
/// `player` is null or live.
pub unsafe fn player_set_loop(player: *mut RawPlayer, count: c_int) -> c_int {
    let Some(p) = (unsafe { player.as_ref() }) else {
        return FLUID_FAILED;
    };
    if count < -1 || count == 0 {
        return FLUID_FAILED;
    }
    let mut core = p.shared.core();
    core.loop_count = count;
    core.loops_left = count;
    FLUID_OK
}

/// Internal mode takes a multiplier on the file tempo, external BPM a beat
/// rate and external MIDI microseconds per quarter note.
///
/// # Safety
/// `player` is null or live.
pub unsafe fn player_set_tempo(player: *mut RawPlayer, mode: c_int, value: c_double) -> c_int {
    let Some(p) = (unsafe { player.as_ref() }) else {
        return FLUID_FAILED;
    };
    let valid = match mode {
        FLUID_PLAYER_TEMPO_INTERNAL => (0.001..=1000.0).contains(&value),
        FLUID_PLAYER_TEMPO_EXTERNAL_BPM => (1.0..=60_000.0).contains(&value),
        FLUID_PLAYER_TEMPO_EXTERNAL_MIDI => (1.0..=60_000_000.0).contains(&value),
        _ => false,
    };
    if !valid {
        return FLUID_FAILED;
    }
    let mut core = p.shared.core();
    core.tempo_mode = mode;
    core.tempo_value = value;
    core.anchor = None;
    FLUID_OK
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_get_status(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => p.shared.core().status,
        None => FLUID_FAILED,
    }
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_get_current_tick(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => p.shared.core().tick as c_int,
        None => FLUID_FAILED,
    }
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_get_total_ticks(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => p.shared.core().total_ticks() as c_int,
        None => FLUID_FAILED,
    }
}

/// # Safety
/// `player` is null or live.
pub unsafe fn player_get_bpm(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => (60_000_000.0 / p.shared.core().usec_per_quarter()).round() as c_int,
        None => FLUID_FAILED,
    }
}

/// Effective tempo in microseconds per quarter note.
///
/// # Safety
/// `player` is null or live.
pub unsafe fn player_get_midi_tempo(player: *mut RawPlayer) -> c_int {
    match unsafe { player.as_ref() } {
        Some(p) => p.shared.core().usec_per_quarter().round() as c_int,
        None => FLUID_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One track, 96 ticks per beat: tempo, note on at 0, note off at 96.
    fn song_bytes() -> Vec<u8> {
        let track: &[u8] = &[
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
            0x00, 0x90, 0x3C, 0x64, // note on
            0x60, 0x80, 0x3C, 0x40, // note off after 96 ticks
            0x00, 0xFF, 0x2F, 0x00, // end of track
        ];
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0, 96]);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(track);
        bytes
    }

    #[test]
    fn parse_collects_events_and_length() {
        let song = Song::parse(&song_bytes()).unwrap();
        assert_eq!(song.division, 96);
        assert_eq!(song.total_ticks, 96);
        assert_eq!(song.events.len(), 3);
        assert!(matches!(song.events[0].kind, EventKind::Tempo(500_000)));
        assert!(matches!(
            song.events[2].kind,
            EventKind::Midi([0x80, 0x3C, 0x40])
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Song::parse(b"not a midi file").is_err());
    }

    #[test]
    fn tempo_modes_change_effective_tempo() {
        let mut core = PlayerCore::new(false);
        assert_eq!(core.usec_per_quarter(), 500_000.0);
        core.tempo_value = 2.0;
        assert_eq!(core.usec_per_quarter(), 250_000.0);
        core.tempo_mode = FLUID_PLAYER_TEMPO_EXTERNAL_BPM;
        core.tempo_value = 60.0;
        assert_eq!(core.usec_per_quarter(), 1_000_000.0);
        core.tempo_mode = FLUID_PLAYER_TEMPO_EXTERNAL_MIDI;
        core.tempo_value = 400_000.0;
        assert_eq!(core.usec_per_quarter(), 400_000.0);
        // 96 ticks per quarter at 400 ms per quarter.
        assert!((core.msec_per_tick(96) - 400.0 / 96.0).abs() < 1e-9);
    }

    #[test]
    fn seek_silences_every_configured_channel() {
        let mut synth = Synth::new(oxisynth::SynthDescriptor {
            midi_channels: 32,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(channels(&synth), 0..32);

        let mut core = PlayerCore::new(false);
        core.playlist.push(Song::parse(&song_bytes()).unwrap());
        core.apply_seek(&mut synth, 96);
        assert_eq!(core.next_event, 2);
        assert_eq!(core.tick, 96);
    }

    #[test]
    fn loops_wrap_then_finish() {
        let mut core = PlayerCore::new(false);
        core.playlist.push(Song::parse(&song_bytes()).unwrap());
        core.loop_count = 2;
        core.rewind();
        assert!(core.next_song());
        assert_eq!(core.current, 0);
        assert!(!core.next_song());
    }
}
