use ostinato_core::SustainPedalLogic;

#[test]
fn key_up_without_pedal_stops_the_note() {
    let mut pedal = SustainPedalLogic::default();
    pedal.key_down(60);
    assert!(pedal.is_any_key_down());

    assert!(pedal.key_up(60));
    assert!(!pedal.is_any_key_down());
    assert!(!pedal.is_note_sustaining(60));
}

#[test]
fn key_up_with_pedal_sustains_the_note() {
    let mut pedal = SustainPedalLogic::default();
    pedal.pedal_down();
    pedal.key_down(60);

    assert!(!pedal.key_up(60));
    assert!(pedal.is_note_sustaining(60));
    assert!(!pedal.is_any_key_down());
}

#[test]
fn a_key_is_never_both_down_and_sustaining() {
    let mut pedal = SustainPedalLogic::default();
    pedal.pedal_down();
    pedal.key_down(60);
    pedal.key_up(60);
    assert!(pedal.is_note_sustaining(60));

    // Re-pressing the key while it sustains flips it back to down-only.
    pedal.key_down(60);
    assert!(!pedal.is_note_sustaining(60));
    assert!(pedal.is_any_key_down());
}

#[test]
fn pedal_up_clears_all_sustaining_keys() {
    let mut pedal = SustainPedalLogic::default();
    pedal.pedal_down();
    for key in [60, 64, 67] {
        pedal.key_down(key);
        pedal.key_up(key);
        assert!(pedal.is_note_sustaining(key));
    }

    pedal.pedal_up();
    assert!(!pedal.is_pedal_down());
    for key in [60, 64, 67] {
        assert!(!pedal.is_note_sustaining(key));
    }
}

#[test]
fn pedal_down_is_idempotent() {
    let mut pedal = SustainPedalLogic::default();
    pedal.pedal_down();
    pedal.pedal_down();
    pedal.key_down(60);
    assert!(!pedal.key_up(60));
    assert!(pedal.is_note_sustaining(60));
}

#[test]
fn pedal_up_without_pedal_down_is_a_no_op() {
    let mut pedal = SustainPedalLogic::default();
    pedal.key_down(60);

    pedal.pedal_up();
    assert!(pedal.is_any_key_down());
    assert_eq!(pedal.first_key_down(), Some(60));
}

#[test]
fn first_key_down_returns_lowest_held_key() {
    let mut pedal = SustainPedalLogic::default();
    assert_eq!(pedal.first_key_down(), None);

    pedal.key_down(64);
    pedal.key_down(60);
    assert_eq!(pedal.first_key_down(), Some(60));

    pedal.key_up(60);
    assert_eq!(pedal.first_key_down(), Some(64));
}
