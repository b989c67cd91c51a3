//! Encode/decode round trips through the public API.

mod common;

use common::{song, TrackBuilder};
use piano_roll::{
    DurationUnit, PartSelection, PianoRoll, Pipeline, Pitch, RollGeometry, ScoreEvent,
};
use pretty_assertions::assert_eq;

fn note(pitch_class: u8, octave: i8, offset: f64, duration: f64) -> ScoreEvent {
    ScoreEvent::Note {
        pitch: Pitch::new(pitch_class, octave),
        offset,
        duration,
    }
}

/// Decoded notes back to score events, re-sorted by offset for encoding.
fn reencode(pipeline: &Pipeline, roll: &PianoRoll) -> PianoRoll {
    let mut events: Vec<ScoreEvent> = pipeline
        .decoder()
        .decode(roll)
        .into_iter()
        .map(|n| ScoreEvent::Note {
            pitch: n.pitch,
            offset: n.offset,
            duration: n.duration.quarter_length,
        })
        .collect();
    events.sort_by(|a, b| a.offset().total_cmp(&b.offset()));
    pipeline.encoder().encode(&events).0
}

#[test]
fn quarter_note_end_to_end() {
    let pipeline = Pipeline::default();
    let (roll, report) = pipeline.encoder().encode(&[note(4, 4, 0.0, 1.0)]);

    assert!(report.is_lossless());
    assert_eq!(roll.active_cells(), 4);
    for t in 0..4 {
        assert!(roll.get(24, t));
    }
    assert!(!roll.get(24, 4));

    let notes = pipeline.decoder().decode(&roll);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].offset, 0.0);
    assert_eq!(notes[0].duration.quarter_length, 1.0);
    assert_eq!(notes[0].pitch, Pitch::new(4, 4));
}

#[test]
fn grid_aligned_melody_is_stable() {
    let pipeline = Pipeline::default();
    let events = vec![
        note(4, 2, 0.0, 0.25),
        note(7, 3, 0.25, 4.0),
        ScoreEvent::Chord {
            pitches: vec![Pitch::new(0, 4), Pitch::new(4, 4), Pitch::new(7, 4)],
            offset: 4.5,
            duration: 2.5,
        },
        note(3, 8, 8.0, 1.75),
        note(11, 6, 100.0, 33.0),
        note(4, 4, 1749.0, 1.0),
    ];

    let (roll, report) = pipeline.encoder().encode(&events);
    assert!(report.is_lossless());
    assert_eq!(reencode(&pipeline, &roll), roll);
}

#[test]
fn long_run_decomposes_into_tied_units() {
    let pipeline = Pipeline::default();
    // 33 quarters = 132 ticks = maxima + quarter
    let (roll, _) = pipeline.encoder().encode(&[note(11, 6, 100.0, 33.0)]);
    let notes = pipeline.decoder().decode(&roll);

    assert_eq!(notes.len(), 1);
    assert_eq!(
        notes[0].duration.components,
        vec![DurationUnit::Maxima, DurationUnit::Quarter]
    );
    assert_eq!(notes[0].duration.quarter_length, 33.0);
}

#[test]
fn boundary_events() {
    let pipeline = Pipeline::default();
    let (roll, report) = pipeline
        .encoder()
        .encode(&[note(4, 4, 1749.75, 2.0), note(4, 4, 1750.0, 1.0)]);

    assert_eq!(roll.active_cells(), 1);
    assert!(roll.get(24, 6999));
    assert_eq!(report.truncated_at_event, Some(1));
}

#[test]
fn midi_file_round_trip() {
    // 480 ppq: quarter = 480 ticks, sixteenth = 120
    let bytes = song(
        480,
        vec![
            TrackBuilder::new().time_signature(4, 2),
            TrackBuilder::new()
                .program(0, 25)
                .note(0, 52, 0, 480)
                .note(0, 55, 480, 120)
                .note(0, 59, 600, 1800)
                .note(0, 64, 600, 1800),
        ],
    );

    let pipeline = Pipeline::default();
    let (roll, report) = pipeline.midi_to_roll(&bytes, PartSelection::FirstPart).unwrap();
    assert!(report.is_lossless());
    assert_eq!(roll.active_cells(), 4 + 1 + 15 + 15);

    let written = pipeline.roll_to_midi(&roll);
    let (again, _) = pipeline.midi_to_roll(&written, PartSelection::FirstPart).unwrap();
    assert_eq!(again, roll);
}

#[test]
fn json_round_trip_keeps_geometry() {
    let mut roll = PianoRoll::zeros(&RollGeometry::default());
    roll.set(71, 6999);
    roll.set(0, 0);

    let json = roll.to_json().unwrap();
    let back = PianoRoll::from_json(&json).unwrap();
    assert_eq!(back.shape(), (72, 7000));
    assert_eq!(back, roll);
}
