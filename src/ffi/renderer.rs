//! Offline renderer: pulls blocks from a synth and writes them to a WAV or
//! raw PCM file.

use super::{FLUID_FAILED, FLUID_OK, RawSynth, Shared, synth::to_s16};
use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};
use std::{
    ffi::c_int,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Clone, Copy, Debug)]
enum Format {
    S16,
    Float,
}

enum Sink {
    Wav(WavWriter<BufWriter<File>>),
    Raw(BufWriter<File>),
}

pub struct RawFileRenderer {
    synth: Shared<RawSynth>,
    sink: Sink,
    format: Format,
    period: usize,
    buf: Vec<f32>,
}

impl RawFileRenderer {
    fn open(synth: Shared<RawSynth>) -> Result<Self> {
        // SAFETY: the caller keeps the synth alive for the renderer's life.
        let state = unsafe { synth.get() }.lock();
        let settings = state.settings();

        let name = settings
            .string("audio.file.name")
            .unwrap_or_else(|| "fluidsynth.wav".to_owned());
        let kind = settings
            .string("audio.file.type")
            .unwrap_or_else(|| "auto".to_owned());
        let format = match settings.string("audio.file.format").as_deref() {
            Some("float") => Format::Float,
            _ => Format::S16,
        };
        let period = settings.int("audio.period-size").unwrap_or(64).max(1) as usize;

        let wav = match kind.as_str() {
            "wav" => true,
            "raw" => false,
            _ => Path::new(&name)
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("wav")),
        };
        let sink = if wav {
            let spec = WavSpec {
                channels: 2,
                sample_rate: state.sample_rate() as u32,
                bits_per_sample: match format {
                    Format::S16 => 16,
                    Format::Float => 32,
                },
                sample_format: match format {
                    Format::S16 => hound::SampleFormat::Int,
                    Format::Float => hound::SampleFormat::Float,
                },
            };
            Sink::Wav(WavWriter::create(&name, spec).with_context(|| format!("create {name}"))?)
        } else {
            Sink::Raw(BufWriter::new(
                File::create(&name).with_context(|| format!("create {name}"))?,
            ))
        };
        log::debug!("rendering to {name} ({format:?}, {period} frames per block)");
        drop(state);

        Ok(Self {
            synth,
            sink,
            format,
            period,
            buf: vec![0.0; period * 2],
        })
    }

    fn process_block(&mut self) -> Result<()> {
        // SAFETY: see `open`.
        let synth = unsafe { self.synth.get() };
        let buf = &mut self.buf;
        synth.lock().render(self.period, |i, l, r| {
            buf[2 * i] = l;
            buf[2 * i + 1] = r;
        });

        match (&mut self.sink, self.format) {
            (Sink::Wav(w), Format::S16) => {
                for &v in buf.iter() {
                    w.write_sample(to_s16(v))?;
                }
            }
            (Sink::Wav(w), Format::Float) => {
                for &v in buf.iter() {
                    w.write_sample(v)?;
                }
            }
            (Sink::Raw(f), Format::S16) => {
                for &v in buf.iter() {
                    f.write_all(&to_s16(v).to_le_bytes())?;
                }
            }
            (Sink::Raw(f), Format::Float) => {
                for &v in buf.iter() {
                    f.write_all(&v.to_le_bytes())?;
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self.sink {
            Sink::Wav(w) => w.finalize()?,
            Sink::Raw(mut f) => f.flush()?,
        }
        Ok(())
    }
}

/// Opens the file named by `audio.file.name`. Returns null on failure.
///
/// # Safety
/// `synth` is null or live, and stays alive until the renderer is deleted.
pub unsafe fn new_file_renderer(synth: *mut RawSynth) -> *mut RawFileRenderer {
    let Some(synth) = Shared::new(synth) else {
        return std::ptr::null_mut();
    };
    match RawFileRenderer::open(synth) {
        Ok(renderer) => Box::into_raw(Box::new(renderer)),
        Err(e) => {
            log::error!("file renderer: {e:#}");
            std::ptr::null_mut()
        }
    }
}

/// Finalises the output file and frees the renderer.
///
/// # Safety
/// `renderer` is null or came from [`new_file_renderer`].
pub unsafe fn delete_file_renderer(renderer: *mut RawFileRenderer) {
    if renderer.is_null() {
        return;
    }
    let renderer = unsafe { Box::from_raw(renderer) };
    if let Err(e) = renderer.finish() {
        log::error!("file renderer: {e:#}");
    }
}

/// Renders one `audio.period-size` block into the file.
///
/// # Safety
/// `renderer` is null or live.
pub unsafe fn file_renderer_process_block(renderer: *mut RawFileRenderer) -> c_int {
    let Some(renderer) = (unsafe { renderer.as_mut() }) else {
        return FLUID_FAILED;
    };
    match renderer.process_block() {
        Ok(()) => FLUID_OK,
        Err(e) => {
            log::warn!("file renderer: {e:#}");
            FLUID_FAILED
        }
    }
}
