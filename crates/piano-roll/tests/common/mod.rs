//! Standard MIDI File builder for integration tests.

#![allow(dead_code)]

/// One track's events, as (absolute tick, message bytes).
#[derive(Default)]
pub struct TrackBuilder {
    events: Vec<(u32, Vec<u8>)>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_signature(mut self, numerator: u8, denom_pow: u8) -> Self {
        self.events
            .push((0, vec![0xFF, 0x58, 0x04, numerator, denom_pow, 0x18, 0x08]));
        self
    }

    pub fn program(mut self, channel: u8, program: u8) -> Self {
        self.events.push((0, vec![0xC0 | channel, program]));
        self
    }

    pub fn note(mut self, channel: u8, key: u8, start: u32, length: u32) -> Self {
        self.events.push((start, vec![0x90 | channel, key, 100]));
        self.events.push((start + length, vec![0x80 | channel, key, 0]));
        self
    }

    /// `count` consecutive notes of `length` ticks cycling up from `key`.
    pub fn scale(mut self, channel: u8, key: u8, count: u32, length: u32) -> Self {
        for i in 0..count {
            self = self.note(channel, key + (i % 12) as u8, i * length, length);
        }
        self
    }

    fn bytes(mut self) -> Vec<u8> {
        self.events.sort_by_key(|(tick, _)| *tick);
        let mut data = Vec::new();
        let mut last = 0;
        for (tick, message) in self.events {
            write_vlq(&mut data, tick - last);
            data.extend_from_slice(&message);
            last = tick;
        }
        data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        data
    }
}

/// Format 1 file with the given ticks per beat.
pub fn song(ppq: u16, tracks: Vec<TrackBuilder>) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track in tracks {
        let data = track.bytes();
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&data);
    }
    buf
}

fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
