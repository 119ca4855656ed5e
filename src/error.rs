//! Error type shared by every handle.

use std::{fmt, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A constructor was handed a closed dependency, or a value the binding
    /// rejects before calling the engine.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The handle was already closed.
    #[error("{0} is closed")]
    InvalidState(&'static str),

    #[error("engine could not create {0}")]
    CreationFailed(&'static str),

    #[error("{kind} is still referenced by {count} dependent handle(s)")]
    StillReferenced { kind: &'static str, count: usize },

    #[error("setting {0:?} could not be set")]
    SetFailed(String),

    #[error("setting {0:?} could not be read")]
    GetFailed(String),

    #[error("setting {0:?} has no option list")]
    QueryFailed(String),

    #[error("failed to load sound-font {}", .0.display())]
    LoadFailed(PathBuf),

    #[error("engine rejected {0}")]
    OperationFailed(Operation),

    #[error("sample buffer is empty")]
    EmptyBuffer,

    #[error("buffers and strides leave no frame to render")]
    NoFrames,

    #[error("MIDI data is empty")]
    EmptyData,

    #[error("engine returned unknown status {0}")]
    UnknownStatus(i32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// An engine call that reported failure, with the arguments it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReloadSoundfont { id: i32 },
    UnloadSoundfont { id: i32 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    ProgramChange { channel: u8, program: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: u16 },
    ChannelPressure { channel: u8, value: u8 },
    KeyPressure { channel: u8, key: u8, value: u8 },
    AllNotesOff { channel: Option<u8> },
    AllSoundsOff { channel: Option<u8> },
    SystemReset,
    BankSelect { channel: u8, bank: u16 },
    KeyTuning { bank: u8, program: u8 },
    ActivateTuning { channel: u8, bank: u8, program: u8 },
    DeactivateTuning { channel: u8 },
    SetReverb { group: i32, param: i32, value: f64 },
    GetReverb { group: i32, param: i32 },
    SetChorus { group: i32, param: i32, value: f64 },
    GetChorus { group: i32, param: i32 },
    ReverbOn { group: i32, on: bool },
    ChorusOn { group: i32, on: bool },
    WriteSamples { frames: usize },
    AddFile { path: PathBuf },
    AddMemory { len: usize },
    Play,
    Stop,
    Join,
    Seek { ticks: u32 },
    SetLoop { count: i32 },
    SetTempo { mode: i32, value: f64 },
}

fn channel_name(channel: &Option<u8>) -> String {
    match channel {
        Some(c) => format!("channel {c}"),
        None => "all channels".to_owned(),
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operation::*;
        match self {
            ReloadSoundfont { id } => write!(f, "sound-font reload (id {id})"),
            UnloadSoundfont { id } => write!(f, "sound-font unload (id {id})"),
            NoteOn {
                channel,
                key,
                velocity,
            } => write!(
                f,
                "note on (channel {channel}, key {key}, velocity {velocity})"
            ),
            NoteOff { channel, key } => write!(f, "note off (channel {channel}, key {key})"),
            ProgramChange { channel, program } => {
                write!(f, "program change (channel {channel}, program {program})")
            }
            ControlChange {
                channel,
                controller,
                value,
            } => write!(
                f,
                "control change (channel {channel}, controller {controller}, value {value})"
            ),
            PitchBend { channel, value } => {
                write!(f, "pitch bend (channel {channel}, value {value})")
            }
            ChannelPressure { channel, value } => {
                write!(f, "channel pressure (channel {channel}, value {value})")
            }
            KeyPressure {
                channel,
                key,
                value,
            } => write!(
                f,
                "key pressure (channel {channel}, key {key}, value {value})"
            ),
            AllNotesOff { channel } => write!(f, "all notes off ({})", channel_name(channel)),
            AllSoundsOff { channel } => write!(f, "all sounds off ({})", channel_name(channel)),
            SystemReset => f.write_str("system reset"),
            BankSelect { channel, bank } => {
                write!(f, "bank select (channel {channel}, bank {bank})")
            }
            KeyTuning { bank, program } => {
                write!(f, "key tuning (bank {bank}, program {program})")
            }
            ActivateTuning {
                channel,
                bank,
                program,
            } => write!(
                f,
                "tuning activation (channel {channel}, bank {bank}, program {program})"
            ),
            DeactivateTuning { channel } => {
                write!(f, "tuning deactivation (channel {channel})")
            }
            SetReverb {
                group,
                param,
                value,
            } => write!(
                f,
                "reverb set (group {group}, param {param}, value {value})"
            ),
            GetReverb { group, param } => write!(f, "reverb get (group {group}, param {param})"),
            SetChorus {
                group,
                param,
                value,
            } => write!(
                f,
                "chorus set (group {group}, param {param}, value {value})"
            ),
            GetChorus { group, param } => write!(f, "chorus get (group {group}, param {param})"),
            ReverbOn { group, on } => write!(f, "reverb switch (group {group}, on {on})"),
            ChorusOn { group, on } => write!(f, "chorus switch (group {group}, on {on})"),
            WriteSamples { frames } => write!(f, "sample write ({frames} frames)"),
            AddFile { path } => write!(f, "playlist add ({})", path.display()),
            AddMemory { len } => write!(f, "playlist add ({len} bytes)"),
            Play => f.write_str("play"),
            Stop => f.write_str("stop"),
            Join => f.write_str("join"),
            Seek { ticks } => write!(f, "seek (tick {ticks})"),
            SetLoop { count } => write!(f, "loop (count {count})"),
            SetTempo { mode, value } => write!(f, "tempo (mode {mode}, value {value})"),
        }
    }
}
