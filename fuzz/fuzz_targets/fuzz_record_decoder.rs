//! Fuzz target: `LineDecoder::feed` + `decode_record`
//!
//! Drives arbitrary byte sequences through the receiving side exactly as
//! the reference receiver does, and asserts that no line ever exceeds the
//! record limit or contains a newline, and that any decoded snapshot
//! re-encodes to a record that decodes back to itself.
//!
//! cargo fuzz run fuzz_record_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensor_uplink::codec::{LineDecoder, MAX_RECORD_LEN, decode_record, encode_record};

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();
    let mut check = |line: &[u8]| {
        assert!(line.len() <= MAX_RECORD_LEN, "line exceeds MAX_RECORD_LEN");
        assert!(!line.contains(&b'\n'), "line still holds a newline");

        if let Ok(snapshot) = decode_record(line) {
            let mut out = Vec::new();
            assert!(encode_record(&snapshot, &mut out), "decoded snapshot is empty");
            assert_eq!(decode_record(&out).ok(), Some(snapshot));
        }
    };

    // Split the input in two so partial records cross a feed boundary.
    let mid = data.len() / 2;
    decoder.feed(&data[..mid], &mut check);
    decoder.feed(&data[mid..], &mut check);
    decoder.finish(&mut check);
    assert_eq!(decoder.pending(), 0);
});
