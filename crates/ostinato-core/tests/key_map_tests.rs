use ostinato_core::{note_to_hz, KeyMap, SampleBuffer, TuningTable};
use ostinato_ports::sampler::SampleDescriptor;
use std::sync::Arc;

fn buffer(root_note: u8) -> Arc<SampleBuffer> {
    let sdd = SampleDescriptor::new(vec![0.1; 64], 1, 64, 44_100.0, root_note);
    Arc::new(SampleBuffer::from_descriptor(sdd).unwrap())
}

fn ranged_buffer(root_note: u8, min_velocity: i16, max_velocity: i16) -> Arc<SampleBuffer> {
    let mut sdd = SampleDescriptor::new(vec![0.1; 64], 1, 64, 44_100.0, root_note);
    sdd.min_velocity = min_velocity;
    sdd.max_velocity = max_velocity;
    Arc::new(SampleBuffer::from_descriptor(sdd).unwrap())
}

fn key_buffer(root_note: u8, min_key: u8, max_key: u8) -> Arc<SampleBuffer> {
    let mut sdd = SampleDescriptor::new(vec![0.1; 64], 1, 64, 44_100.0, root_note);
    sdd.min_key = min_key;
    sdd.max_key = max_key;
    Arc::new(SampleBuffer::from_descriptor(sdd).unwrap())
}

#[test]
fn simple_map_picks_pitch_closest_root() {
    let bank = vec![buffer(60), buffer(72)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    // 261.63 Hz (C4) is closer to f(66) = 370 Hz than 523.25 Hz (C5) is.
    assert!((note_to_hz(60) - note_to_hz(66)).abs() < (note_to_hz(72) - note_to_hz(66)).abs());
    let bucket = map.bucket(66);
    assert_eq!(bucket.len(), 1);
    assert!(Arc::ptr_eq(&bucket[0], &bank[0]));

    // High keys map to the higher root.
    let bucket = map.bucket(80);
    assert_eq!(bucket.len(), 1);
    assert!(Arc::ptr_eq(&bucket[0], &bank[1]));

    assert!(map.is_valid());
}

#[test]
fn simple_map_exact_tie_keeps_all_in_insertion_order() {
    let bank = vec![buffer(60), buffer(60)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    let bucket = map.bucket(60);
    assert_eq!(bucket.len(), 2);
    assert!(Arc::ptr_eq(&bucket[0], &bank[0]));
    assert!(Arc::ptr_eq(&bucket[1], &bank[1]));

    // Lookup resolves the tie to the first-inserted buffer.
    let chosen = map.lookup(60, 100).unwrap();
    assert!(Arc::ptr_eq(&chosen, &bank[0]));
}

#[test]
fn range_map_respects_key_bounds() {
    let bank = vec![key_buffer(66, 60, 72)];
    let mut map = KeyMap::default();
    map.build_range(&bank, &TuningTable::default());

    assert!(map.bucket(59).is_empty());
    assert_eq!(map.bucket(60).len(), 1);
    assert_eq!(map.bucket(72).len(), 1);
    assert!(map.bucket(73).is_empty());
}

#[test]
fn velocity_agnostic_buffer_wins_on_encounter() {
    // Agnostic first: it wins for every velocity even though the ranged
    // buffer would also match.
    let bank = vec![ranged_buffer(60, -1, -1), ranged_buffer(60, 0, 127)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    for velocity in [1, 64, 127] {
        let chosen = map.lookup(60, velocity).unwrap();
        assert!(Arc::ptr_eq(&chosen, &bank[0]));
    }
}

#[test]
fn ranged_buffer_before_agnostic_takes_matching_velocities() {
    let bank = vec![ranged_buffer(60, 0, 60), ranged_buffer(60, -1, -1)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    let soft = map.lookup(60, 30).unwrap();
    assert!(Arc::ptr_eq(&soft, &bank[0]));

    let hard = map.lookup(60, 100).unwrap();
    assert!(Arc::ptr_eq(&hard, &bank[1]));
}

#[test]
fn lookup_misses_when_no_velocity_range_matches() {
    let bank = vec![ranged_buffer(60, 0, 40), ranged_buffer(60, 50, 60)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    assert!(map.lookup(60, 45).is_none());
    assert!(map.lookup(60, 55).is_some());
}

#[test]
fn single_entry_bucket_skips_velocity_check() {
    // One mapped buffer is returned even when its range excludes the
    // velocity: the single-entry shortcut runs before any range test.
    let bank = vec![ranged_buffer(60, 0, 40)];
    let mut map = KeyMap::default();
    map.build_simple(&bank, &TuningTable::default());

    assert!(map.lookup(60, 100).is_some());
}

#[test]
fn rebuild_clears_previous_buckets() {
    let bank = vec![key_buffer(60, 0, 127)];
    let mut map = KeyMap::default();
    map.build_range(&bank, &TuningTable::default());
    assert_eq!(map.bucket(64).len(), 1);

    let narrow = vec![key_buffer(60, 60, 61)];
    map.build_range(&narrow, &TuningTable::default());
    assert!(map.bucket(64).is_empty());
    assert_eq!(map.bucket(60).len(), 1);
}

#[test]
fn simple_map_ignores_tuning_overrides_on_buffer_side() {
    // Retune key 60 far away: the bucket for 60 follows the tuning table on
    // the key side, but buffer roots stay 12-TET.
    let bank = vec![buffer(60), buffer(72)];
    let mut tuning = TuningTable::default();
    tuning.set_frequency(60, note_to_hz(72));

    let mut map = KeyMap::default();
    map.build_simple(&bank, &tuning);

    let bucket = map.bucket(60);
    assert_eq!(bucket.len(), 1);
    assert!(Arc::ptr_eq(&bucket[0], &bank[1]));
}
