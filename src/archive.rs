//! Per-peer CSV archive for the reference receiver.
//!
//! Every decoded record becomes one row of
//! `{dir}/{peer_ip}_sensor_data.csv`: a local timestamp followed by fixed
//! columns for each channel.  Channels missing from a record leave their
//! cells empty.  The header row is written once, when the file is new or
//! empty; later connections from the same peer append to it.
//!
//! ```text
//!  decode_record ──▶ Snapshot ──▶ csv_row ──▶ 10.0.0.7_sensor_data.csv
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::sample::Channel;
use crate::store::Snapshot;

pub const CSV_HEADERS: [&str; 10] = [
    "Timestamp",
    "Latitude",
    "Longitude",
    "Accelerometer_x",
    "Accelerometer_y",
    "Accelerometer_z",
    "Orientation_azimuth",
    "Orientation_pitch",
    "Orientation_roll",
    "Light",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One CSV row for `snapshot`, in [`CSV_HEADERS`] order.
pub fn csv_row(timestamp: &str, snapshot: &Snapshot) -> Vec<String> {
    let mut row = Vec::with_capacity(CSV_HEADERS.len());
    row.push(timestamp.to_owned());
    for channel in Channel::ALL {
        match snapshot.get(channel) {
            Some(sample) => row.extend(sample.values().iter().map(f64::to_string)),
            None => row.extend(std::iter::repeat_n(String::new(), channel.arity())),
        }
    }
    row
}

// ---------------------------------------------------------------------------
// CsvArchive
// ---------------------------------------------------------------------------

/// Output directory shared by every client of one receiver.
#[derive(Debug, Clone)]
pub struct CsvArchive {
    dir: PathBuf,
}

impl CsvArchive {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, peer: IpAddr) -> PathBuf {
        self.dir.join(format!("{peer}_sensor_data.csv"))
    }

    /// Open (or create) the append-only file for `peer`.
    pub fn open(&self, peer: IpAddr) -> csv::Result<PeerArchive> {
        let path = self.path_for(peer);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if fresh {
            writer.write_record(CSV_HEADERS)?;
            writer.flush()?;
        }
        info!("archiving {} to {}", peer, path.display());
        Ok(PeerArchive {
            writer,
            path,
            rows: 0,
        })
    }
}

/// Append handle for one client connection.
pub struct PeerArchive {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl PeerArchive {
    /// Append `snapshot` stamped with the current local time.
    pub fn append(&mut self, snapshot: &Snapshot) -> csv::Result<()> {
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.append_at(&now, snapshot)
    }

    /// Rows are flushed one at a time so a dropped client loses nothing.
    pub fn append_at(&mut self, timestamp: &str, snapshot: &Snapshot) -> csv::Result<()> {
        self.writer.write_record(csv_row(timestamp, snapshot))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}
