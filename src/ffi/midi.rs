//! MIDI driver: hardware input ports feeding a synth, and the byte decoder
//! shared with the file player.

use super::{DeviceThread, RawSettings, RawSynth, Shared};
use anyhow::{Result, anyhow, bail};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use oxisynth::MidiEvent;

const CLIENT: &str = "oxifluid";

pub struct RawMidiDriver {
    _thread: DeviceThread,
}

/// Connects the input port matching `midi.portname` (every port when
/// `midi.autoconnect` is set) and routes its events into `synth`.
///
/// # Safety
/// Both pointers are null or live, and stay alive until the driver is
/// deleted.
pub unsafe fn new_midi_driver(settings: *mut RawSettings, synth: *mut RawSynth) -> *mut RawMidiDriver {
    let (Some(settings), Some(synth)) = (Shared::new(settings), Shared::new(synth)) else {
        return std::ptr::null_mut();
    };
    match DeviceThread::spawn("midi-driver", move || open(settings, synth)) {
        Ok(thread) => Box::into_raw(Box::new(RawMidiDriver { _thread: thread })),
        Err(e) => {
            log::error!("midi driver: {e:#}");
            std::ptr::null_mut()
        }
    }
}

/// Closes every connection. No callback runs after this returns.
///
/// # Safety
/// `driver` is null or came from [`new_midi_driver`].
pub unsafe fn delete_midi_driver(driver: *mut RawMidiDriver) {
    if !driver.is_null() {
        drop(unsafe { Box::from_raw(driver) });
    }
}

fn open(
    settings: Shared<RawSettings>,
    synth: Shared<RawSynth>,
) -> Result<Vec<MidiInputConnection<()>>> {
    // SAFETY: settings outlive the driver.
    let settings = unsafe { settings.get() };
    let wanted = settings.string("midi.portname").unwrap_or_default();
    let all = settings.int("midi.autoconnect") == Some(1);

    let probe = MidiInput::new(CLIENT)?;
    let ports: Vec<MidiInputPort> = if all {
        probe.ports()
    } else {
        probe
            .ports()
            .into_iter()
            .find(|p| probe.port_name(p).is_ok_and(|n| n.contains(&wanted)))
            .into_iter()
            .collect()
    };
    if ports.is_empty() {
        bail!("no MIDI input port matching {wanted:?}");
    }

    let mut connections = Vec::with_capacity(ports.len());
    for port in &ports {
        let mut midi_in = MidiInput::new(CLIENT)?;
        midi_in.ignore(Ignore::None);

        let name = midi_in.port_name(port)?;
        let conn = midi_in
            .connect(
                port,
                "oxifluid-in",
                move |_stamp, msg, _| {
                    if let Some(ev) = decode_midi(msg) {
                        // SAFETY: connections close before the synth is deleted.
                        let synth = unsafe { synth.get() };
                        synth.lock().synth.send_event(ev).ok();
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("connect {name}: {e}"))?;

        log::info!("connected MIDI input {name}");
        connections.push(conn);
    }
    Ok(connections)
}

/// Decodes one channel voice message. System messages other than reset are
/// ignored.
pub(super) fn decode_midi(msg: &[u8]) -> Option<MidiEvent> {
    let &status = msg.first()?;
    if status == 0xFF {
        return Some(MidiEvent::SystemReset);
    }
    let channel = status & 0x0F;

    match status & 0xF0 {
        0x80 if msg.len() >= 3 => Some(MidiEvent::NoteOff {
            channel,
            key: msg[1],
        }),
        0x90 if msg.len() >= 3 && msg[2] == 0 => Some(MidiEvent::NoteOff {
            channel,
            key: msg[1],
        }),
        0x90 if msg.len() >= 3 => Some(MidiEvent::NoteOn {
            channel,
            key: msg[1],
            vel: msg[2],
        }),
        0xA0 if msg.len() >= 3 => Some(MidiEvent::PolyphonicKeyPressure {
            channel,
            key: msg[1],
            value: msg[2],
        }),
        0xB0 if msg.len() >= 3 => Some(MidiEvent::ControlChange {
            channel,
            ctrl: msg[1],
            value: msg[2],
        }),
        0xC0 if msg.len() >= 2 => Some(MidiEvent::ProgramChange {
            channel,
            program_id: msg[1],
        }),
        0xD0 if msg.len() >= 2 => Some(MidiEvent::ChannelPressure {
            channel,
            value: msg[1],
        }),
        0xE0 if msg.len() >= 3 => {
            let value = ((msg[2] as u16) << 7) | msg[1] as u16; // 14-bit
            Some(MidiEvent::PitchBend { channel, value })
        }
        _ => None,
    }
}
