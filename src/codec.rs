//! Newline-delimited JSON record codec.
//!
//! Wire format, one record per send:
//! ```text
//! {"Location":[37.422,-122.084],"Accelerometer":[0.12,9.81,0.03],"Light":412.5}\n
//! ```
//!
//! Keys are channel names in [`Channel`] order.  Single-value channels
//! carry a bare number, the rest an array.  Channels missing from the
//! snapshot are omitted, never emitted as `null`.  No length prefix, no
//! checksum, no acknowledgement.
//!
//! The receiving side uses [`LineDecoder`] to cut a TCP byte stream back
//! into records.  A single read may hold part of a record, one record, or
//! several records glued together.

use core::fmt;

use log::warn;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::sample::{Channel, Sample};
use crate::store::Snapshot;

/// Longest record the decoder will buffer.
pub const MAX_RECORD_LEN: usize = 4096;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct WireSample<'a>(&'a Sample);

impl Serialize for WireSample<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.0.values();
        if self.0.channel().is_scalar() {
            serializer.serialize_f64(values[0])
        } else {
            values.serialize(serializer)
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for sample in self.iter() {
            map.serialize_entry(sample.channel().name(), &WireSample(sample))?;
        }
        map.end()
    }
}

/// Encode `snapshot` as one newline-terminated record into `out`.
///
/// `out` is cleared first so the dispatcher can reuse one buffer.
/// Returns `false` (and leaves `out` empty) for an empty snapshot.
pub fn encode_record(snapshot: &Snapshot, out: &mut Vec<u8>) -> bool {
    out.clear();
    if snapshot.is_empty() {
        return false;
    }
    // Samples only hold finite f64s, so the writer cannot fail.
    if let Err(e) = serde_json::to_writer(&mut *out, snapshot) {
        warn!("record encode failed: {}", e);
        out.clear();
        return false;
    }
    out.push(b'\n');
    true
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Receiving-side decode failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Not valid JSON.
    Malformed(String),
    /// Valid JSON, but not an object.
    NotAnObject,
    /// No known channel with a valid shape.
    NoChannels,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed record: {msg}"),
            Self::NotAnObject => write!(f, "record is not a JSON object"),
            Self::NoChannels => write!(f, "record carries no usable channel"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Parse one record (with or without its trailing newline).
///
/// Channels whose value has the wrong shape are skipped, as are unknown
/// keys.  A record left with no channel at all is [`CodecError::NoChannels`].
pub fn decode_record(line: &[u8]) -> Result<Snapshot, CodecError> {
    let value: Value =
        serde_json::from_slice(line).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(CodecError::NotAnObject);
    };

    let mut snapshot = Snapshot::default();
    for channel in Channel::ALL {
        if let Some(sample) = decode_channel(&fields, channel) {
            snapshot.insert(sample);
        }
    }

    if snapshot.is_empty() {
        return Err(CodecError::NoChannels);
    }
    Ok(snapshot)
}

fn decode_channel(fields: &Map<String, Value>, channel: Channel) -> Option<Sample> {
    let raw = fields.get(channel.name())?;
    if channel.is_scalar() {
        let v = raw.as_f64()?;
        return Sample::new(channel, &[v]).ok();
    }

    let items = raw.as_array()?;
    if items.len() != channel.arity() {
        return None;
    }
    let mut values = [0.0; crate::sample::MAX_COMPONENTS];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = item.as_f64()?;
    }
    Sample::new(channel, &values[..items.len()]).ok()
}

// ---------------------------------------------------------------------------
// Stream splitting
// ---------------------------------------------------------------------------

/// Streaming newline splitter.
pub struct LineDecoder {
    buf: heapless::Vec<u8, MAX_RECORD_LEN>,
    /// Set when the current line outgrew the buffer; bytes are discarded
    /// until the next newline.
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Feed bytes and hand every completed, non-blank line to `on_line`
    /// (without its `\n` or `\r\n`).
    pub fn feed(&mut self, data: &[u8], mut on_line: impl FnMut(&[u8])) {
        for &byte in data {
            if byte == b'\n' {
                if self.overflowed {
                    warn!("record exceeded {} bytes, discarded", MAX_RECORD_LEN);
                    self.overflowed = false;
                } else {
                    emit(&self.buf, &mut on_line);
                }
                self.buf.clear();
                continue;
            }
            if self.overflowed {
                continue;
            }
            if self.buf.push(byte).is_err() {
                self.overflowed = true;
                self.buf.clear();
            }
        }
    }

    /// Flush a trailing unterminated line (peer closed mid-record).
    pub fn finish(&mut self, mut on_line: impl FnMut(&[u8])) {
        if !self.overflowed {
            emit(&self.buf, &mut on_line);
        }
        self.reset();
    }

    /// Bytes held for the current, incomplete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Reset decoder state (e.g. after a reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(line: &[u8], on_line: &mut impl FnMut(&[u8])) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().any(|b| !b.is_ascii_whitespace()) {
        on_line(line);
    }
}
