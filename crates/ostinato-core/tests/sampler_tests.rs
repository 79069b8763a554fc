use ostinato_core::Sampler;
use ostinato_ports::sampler::SampleDescriptor;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const SAMPLE_RATE: f32 = 44_100.0;
const BLOCK: usize = 64;

fn sine_descriptor(root_note: u8, frames: u32) -> SampleDescriptor {
    let data = (0..frames)
        .map(|i| (TAU * 220.0 * i as f32 / SAMPLE_RATE).sin())
        .collect();
    SampleDescriptor::new(data, 1, frames, SAMPLE_RATE as f64, root_note)
}

fn sampler_with_sample(frames: u32) -> Sampler {
    let sampler = Sampler::new(SAMPLE_RATE);
    sampler.load_sample(sine_descriptor(60, frames)).unwrap();
    sampler.build_key_map();
    sampler
}

fn render_once(sampler: &Sampler) -> f32 {
    let mut left = [0.0_f32; BLOCK];
    let mut right = [0.0_f32; BLOCK];
    sampler.render(BLOCK, &mut left, &mut right);
    left.iter().chain(right.iter()).map(|s| s * s).sum()
}

#[test]
fn play_render_release_lifecycle() {
    let sampler = sampler_with_sample(8_000);
    sampler.set_amp_release_seconds(0.01);

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), 60);

    let energy = render_once(&sampler) + render_once(&sampler);
    assert!(energy > 0.0);

    sampler.stop_note(60, false);
    assert_eq!(sampler.voice_note(0), 60); // releasing, not yet idle

    for _ in 0..20 {
        render_once(&sampler);
    }
    assert_eq!(sampler.voice_note(0), -1);
    assert_eq!(sampler.active_voice_count(), 0);
}

#[test]
fn notes_are_dropped_until_key_map_is_built() {
    let sampler = Sampler::new(SAMPLE_RATE);
    sampler.load_sample(sine_descriptor(60, 1_000)).unwrap();
    assert!(!sampler.is_key_map_valid());

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), -1);
    assert_eq!(sampler.last_played_note_number(), -1);
}

#[test]
fn loading_a_sample_invalidates_the_key_map() {
    let sampler = sampler_with_sample(1_000);
    assert!(sampler.is_key_map_valid());

    sampler.load_sample(sine_descriptor(72, 1_000)).unwrap();
    assert!(!sampler.is_key_map_valid());

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), -1);
}

#[test]
fn polyphonic_same_key_retriggers_in_place() {
    let sampler = sampler_with_sample(8_000);

    sampler.play_note(60, 100);
    sampler.play_note(60, 80);

    assert_eq!(sampler.voice_note(0), 60);
    assert_eq!(sampler.voice_note(1), -1);
    assert_eq!(sampler.active_voice_count(), 1);
}

#[test]
fn sustain_pedal_defers_note_off() {
    let sampler = sampler_with_sample(8_000);

    sampler.sustain_pedal(true);
    sampler.play_note(60, 100);
    sampler.stop_note(60, false);

    // Pedal holds the note: still sounding, flagged as sustaining.
    assert_eq!(sampler.voice_note(0), 60);
    assert!(sampler.is_note_sustaining(60));

    sampler.sustain_pedal(false);
    assert!(!sampler.is_note_sustaining(60));
    render_once(&sampler); // release (default 0 s) finishes on this pass
    assert_eq!(sampler.voice_note(0), -1);
}

#[test]
fn repeated_pedal_presses_behave_as_one() {
    let sampler = sampler_with_sample(8_000);

    sampler.sustain_pedal(true);
    sampler.sustain_pedal(true);
    sampler.play_note(60, 100);
    sampler.stop_note(60, false);
    assert!(sampler.is_note_sustaining(60));

    sampler.sustain_pedal(false);
    sampler.sustain_pedal(false); // second lift: nothing left to release
    render_once(&sampler);
    assert_eq!(sampler.voice_note(0), -1);
}

#[test]
fn monophonic_second_note_replaces_the_first() {
    let sampler = sampler_with_sample(8_000);
    sampler.params().set_monophonic(true);

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), 60);

    sampler.play_note(64, 100);
    assert_eq!(sampler.voice_note(0), 64);
    assert_eq!(sampler.voice_note(1), -1);
    assert_eq!(sampler.active_voice_count(), 1);
}

#[test]
fn monophonic_legato_retargets_on_press_and_release() {
    let sampler = sampler_with_sample(8_000);
    sampler.params().set_monophonic(true);
    sampler.params().set_legato(true);

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), 60);

    // Second key while the first is held: pitch retarget, no restart.
    sampler.play_note(64, 100);
    assert_eq!(sampler.voice_note(0), 64);
    assert_eq!(sampler.active_voice_count(), 1);

    // Releasing the second key falls back to the still-held first key.
    sampler.stop_note(64, false);
    assert_eq!(sampler.voice_note(0), 60);
    assert_eq!(sampler.active_voice_count(), 1);
}

#[test]
fn pool_exhaustion_drops_the_extra_note() {
    let sampler = sampler_with_sample(8_000);

    for key in 0..64 {
        sampler.play_note(key, 100);
    }
    assert_eq!(sampler.active_voice_count(), 64);
    assert_eq!(sampler.last_played_note_number(), 63);

    sampler.play_note(64, 100);
    assert_eq!(sampler.active_voice_count(), 64);
    assert_eq!(sampler.last_played_note_number(), 63);
}

#[test]
fn non_looping_sample_runs_out_and_frees_the_voice() {
    let sampler = sampler_with_sample(100);

    sampler.play_note(60, 100);
    render_once(&sampler);
    render_once(&sampler);

    assert_eq!(sampler.voice_note(0), -1);
    assert_eq!(sampler.active_voice_count(), 0);
}

#[test]
fn looping_sample_keeps_sounding() {
    let sampler = Sampler::new(SAMPLE_RATE);
    let mut sdd = sine_descriptor(60, 100);
    sdd.is_looping = true;
    sampler.load_sample(sdd).unwrap();
    sampler.build_key_map();

    sampler.play_note(60, 100);
    for _ in 0..10 {
        assert!(render_once(&sampler) > 0.0);
    }
    assert_eq!(sampler.voice_note(0), 60);
}

#[test]
fn stop_all_voices_waits_for_the_render_thread() {
    let sampler = Arc::new(sampler_with_sample(8_000));
    for key in [60, 64, 67] {
        sampler.play_note(key, 100);
    }
    assert_eq!(sampler.active_voice_count(), 3);

    let done = Arc::new(AtomicBool::new(false));
    let pump = {
        let sampler = Arc::clone(&sampler);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut left = [0.0_f32; BLOCK];
            let mut right = [0.0_f32; BLOCK];
            while !done.load(Ordering::Relaxed) {
                left.fill(0.0);
                right.fill(0.0);
                sampler.render(BLOCK, &mut left, &mut right);
            }
        })
    };

    sampler.stop_all_voices();
    assert_eq!(sampler.active_voice_count(), 0);
    for index in 0..3 {
        assert_eq!(sampler.voice_note(index), -1);
    }

    done.store(true, Ordering::Relaxed);
    pump.join().unwrap();

    // New notes stay locked out until restart.
    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), -1);

    sampler.restart_voices();
    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), 60);
}

#[test]
fn retuned_key_still_plays() {
    let sampler = sampler_with_sample(8_000);
    sampler.set_note_frequency(60, 415.3); // baroque-ish A flat
    assert_eq!(sampler.note_frequency(60), 415.3);

    sampler.play_note(60, 100);
    assert_eq!(sampler.voice_note(0), 60);
    assert!(render_once(&sampler) > 0.0);
}
