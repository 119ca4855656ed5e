//! Audio driver: a CPAL output stream pulling frames from a synth.
//! The stream asks for `audio.period-size` frames per callback but copes with
//! whatever buffer length the host hands over.

use super::{DeviceThread, RawSettings, RawSynth, Shared};
use anyhow::{Context, Result, anyhow, bail};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig, host_from_id,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

pub struct RawAudioDriver {
    _thread: DeviceThread,
}

/// Opens the output device named by `audio.driver` and starts rendering
/// `synth` into it. Returns null if no stream could be started.
///
/// # Safety
/// Both pointers are null or live, and stay alive until the driver is
/// deleted.
pub unsafe fn new_audio_driver(settings: *mut RawSettings, synth: *mut RawSynth) -> *mut RawAudioDriver {
    let (Some(settings), Some(synth)) = (Shared::new(settings), Shared::new(synth)) else {
        return std::ptr::null_mut();
    };
    match DeviceThread::spawn("audio-driver", move || open(settings, synth)) {
        Ok(thread) => Box::into_raw(Box::new(RawAudioDriver { _thread: thread })),
        Err(e) => {
            log::error!("audio driver: {e:#}");
            std::ptr::null_mut()
        }
    }
}

/// Stops the stream. Returns once the callback can no longer run.
///
/// # Safety
/// `driver` is null or came from [`new_audio_driver`].
pub unsafe fn delete_audio_driver(driver: *mut RawAudioDriver) {
    if !driver.is_null() {
        drop(unsafe { Box::from_raw(driver) });
    }
}

fn open(settings: Shared<RawSettings>, synth: Shared<RawSynth>) -> Result<Stream> {
    // SAFETY: both outlive the driver, which owns this stream.
    let (settings, raw_synth) = unsafe { (settings.get(), synth.get()) };
    let wanted = settings.string("audio.driver").unwrap_or_default();
    let period = settings.int("audio.period-size").unwrap_or(64) as u32;

    let host_id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(&wanted))
        .ok_or_else(|| anyhow!("unknown audio driver {wanted:?}"))?;
    let host = host_from_id(host_id)?;
    let device = host
        .default_output_device()
        .context("no default output device")?;

    let def_cfg = device.default_output_config()?;
    let sample_format = def_cfg.sample_format();
    let mut stream_cfg: StreamConfig = def_cfg.into();
    stream_cfg.buffer_size = BufferSize::Fixed(period);

    raw_synth
        .lock()
        .set_sample_rate(stream_cfg.sample_rate.0 as f32);

    let stream = match sample_format {
        SampleFormat::F32 => build::<f32>(&device, &stream_cfg, synth)?,
        SampleFormat::I16 => build::<i16>(&device, &stream_cfg, synth)?,
        SampleFormat::U16 => build::<u16>(&device, &stream_cfg, synth)?,
        other => bail!("unsupported sample format {other:?}"),
    };
    stream.play()?;

    log::info!(
        "audio output on {} ({} Hz, {} frames)",
        device.name().unwrap_or_else(|_| wanted.clone()),
        stream_cfg.sample_rate.0,
        period
    );
    Ok(stream)
}

fn build<T>(device: &cpal::Device, cfg: &StreamConfig, synth: Shared<RawSynth>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = cfg.channels as usize;
    let err_fn = |e| log::error!("audio stream error: {e}");
    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            // SAFETY: the stream is dropped before the synth is deleted.
            let synth = unsafe { synth.get() };
            let frames = output.len() / channels;
            synth.lock().render(frames, |i, l, r| {
                let frame = &mut output[i * channels..(i + 1) * channels];
                frame[0] = T::from_sample(l);
                if channels > 1 {
                    frame[1] = T::from_sample(r);
                }
            });
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
