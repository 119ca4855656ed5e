use oxifluid::{Error, NameInterner, Player, PlayerStatus, Settings, Synth, TempoMode};
use std::{sync::Arc, thread, time::Duration};

/// Format 0, 96 ticks per beat, 120 BPM: a program change, then one note
/// held for `beats` beats.
fn song(beats: u8) -> Vec<u8> {
    let length = 96u32 * beats as u32;
    let mut track = vec![
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
        0x00, 0xC0, 0x05, // program change
        0x00, 0x90, 0x3C, 0x64, // note on
    ];
    // Variable-length delta for the note off.
    if length < 0x80 {
        track.push(length as u8);
    } else {
        track.push(0x80 | (length >> 7) as u8);
        track.push((length & 0x7F) as u8);
    }
    track.extend_from_slice(&[0x80, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00]);

    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0, 96]);
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&track);
    bytes
}

fn setup(timing: &str) -> (Arc<Settings>, Arc<Synth>, Player) {
    let _ = env_logger::builder().is_test(true).try_init();
    let settings = Settings::with_interner(Arc::new(NameInterner::new())).unwrap();
    settings.set_str("player.timing-source", timing).unwrap();
    let synth = Synth::new(&settings).unwrap();
    let player = Player::new(&synth).unwrap();
    (settings, synth, player)
}

fn teardown(settings: Arc<Settings>, synth: Arc<Synth>, player: Player) {
    player.close().unwrap();
    synth.close().unwrap();
    settings.close().unwrap();
}

/// Renders `seconds` of audio at the default 44.1 kHz.
fn render(synth: &Synth, seconds: f64) {
    let mut buf = vec![0f32; 2 * 441];
    for _ in 0..(seconds * 100.0).round() as usize {
        synth.write_float_interleaved(&mut buf).unwrap();
    }
}

#[test]
fn sample_timing_advances_with_rendered_audio() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(2)).unwrap();
    assert_eq!(player.status().unwrap(), PlayerStatus::Ready);
    assert_eq!(player.total_ticks().unwrap(), 192);

    player.play().unwrap();
    assert_eq!(player.status().unwrap(), PlayerStatus::Playing);
    assert_eq!(player.current_tick().unwrap(), 0);

    // Half a second at 120 BPM is one beat.
    render(&synth, 0.5);
    let tick = player.current_tick().unwrap();
    assert!((80..=100).contains(&tick), "tick {tick}");
    assert_eq!(player.status().unwrap(), PlayerStatus::Playing);

    render(&synth, 0.6);
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);
    assert_eq!(player.current_tick().unwrap(), 192);
    // Done already: returns at once.
    player.join().unwrap();

    teardown(settings, synth, player);
}

#[test]
fn tempo_modes_report_bpm() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(1)).unwrap();
    assert_eq!(player.bpm().unwrap(), 120);
    assert_eq!(player.midi_tempo().unwrap(), 500_000);

    player.set_tempo(TempoMode::Internal, 2.0).unwrap();
    assert_eq!(player.bpm().unwrap(), 240);
    player.set_tempo(TempoMode::ExternalMidi, 1_000_000.0).unwrap();
    assert_eq!(player.bpm().unwrap(), 60);
    assert!(matches!(
        player.set_tempo(TempoMode::ExternalBpm, 0.0),
        Err(Error::OperationFailed(_))
    ));

    teardown(settings, synth, player);
}

#[test]
fn faster_tempo_finishes_sooner() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(4)).unwrap();
    player.set_tempo(TempoMode::Internal, 4.0).unwrap();
    player.play().unwrap();
    // Four beats at 480 BPM take half a second.
    render(&synth, 0.6);
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);
    teardown(settings, synth, player);
}

#[test]
fn loop_plays_the_playlist_again() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(1)).unwrap();
    player.set_loop(2).unwrap();
    player.play().unwrap();

    render(&synth, 0.7);
    assert_eq!(player.status().unwrap(), PlayerStatus::Playing);
    render(&synth, 0.5);
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);

    assert!(matches!(
        player.set_loop(0),
        Err(Error::OperationFailed(_))
    ));
    teardown(settings, synth, player);
}

#[test]
fn seek_moves_within_the_song() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(4)).unwrap();
    player.play().unwrap();
    player.seek(288).unwrap();
    assert_eq!(player.current_tick().unwrap(), 288);

    // One beat left after the seek.
    render(&synth, 0.6);
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);
    assert!(player.seek(10).is_err());
    teardown(settings, synth, player);
}

#[test]
fn seek_past_the_end_fails() {
    let (settings, synth, player) = setup("sample");
    player.add_memory(&song(1)).unwrap();
    assert!(matches!(
        player.seek(97),
        Err(Error::OperationFailed(_))
    ));
    teardown(settings, synth, player);
}

#[test]
fn bad_input_is_rejected() {
    let (settings, synth, player) = setup("sample");
    assert!(matches!(player.add_memory(&[]), Err(Error::EmptyData)));
    assert!(matches!(
        player.add_memory(b"RIFF....WAVE"),
        Err(Error::OperationFailed(_))
    ));
    assert!(player.add_file("/nonexistent/song.mid").is_err());
    // Empty playlist.
    assert!(player.play().is_err());
    teardown(settings, synth, player);
}

#[test]
fn play_from_disk() {
    let (settings, synth, player) = setup("sample");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.mid");
    std::fs::write(&path, song(1)).unwrap();
    player.add_file(&path).unwrap();
    assert_eq!(player.total_ticks().unwrap(), 96);
    teardown(settings, synth, player);
}

#[test]
fn system_timing_runs_without_rendering() {
    let (settings, synth, player) = setup("system");
    player.add_memory(&song(1)).unwrap();
    player.set_tempo(TempoMode::Internal, 4.0).unwrap();
    player.play().unwrap();
    // One beat at 480 BPM: 125 ms of wall time.
    player.join().unwrap();
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);

    // Playing again rewinds.
    player.play().unwrap();
    player.join().unwrap();
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);
    teardown(settings, synth, player);
}

#[test]
fn stop_from_another_thread_ends_join() {
    let (settings, synth, player) = setup("system");
    player.add_memory(&song(8)).unwrap();
    player.set_loop(-1).unwrap();
    player.play().unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(50));
            player.stop().unwrap();
        });
        player.join().unwrap();
    });
    assert_eq!(player.status().unwrap(), PlayerStatus::Done);
    teardown(settings, synth, player);
}

#[test]
fn close_while_playing_is_clean() {
    let (settings, synth, player) = setup("system");
    player.add_memory(&song(8)).unwrap();
    player.play().unwrap();
    player.close().unwrap();
    assert!(matches!(
        player.status(),
        Err(Error::InvalidState("player"))
    ));
    assert_eq!(synth.dependents(), 0);
    synth.close().unwrap();
    settings.close().unwrap();
}
