//! Reference receiving endpoint.
//!
//! Accepts any number of uplink clients, one thread each, splits their
//! byte streams into records, logs every decoded record tagged with the
//! peer address, and appends it to that peer's CSV file.
//!
//! Usage: `uplink-receiver [port] [--data-dir data] [--no-archive]`

use std::fmt::Write as _;
use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use sensor_uplink::archive::CsvArchive;
use sensor_uplink::codec::{LineDecoder, decode_record};
use sensor_uplink::store::Snapshot;

const READ_BUF_SIZE: usize = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(default_value_t = 8888)]
    port: u16,

    /// Directory for per-client CSV files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Log records without writing CSV files
    #[arg(long)]
    no_archive: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let archive = if args.no_archive {
        None
    } else {
        let archive = CsvArchive::new(&args.data_dir)
            .with_context(|| format!("cannot create {}", args.data_dir.display()))?;
        info!("archiving records under {}", archive.dir().display());
        Some(archive)
    };

    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .with_context(|| format!("cannot listen on port {}", args.port))?;
    info!("receiver listening on {}", listener.local_addr()?);

    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(stream) => stream,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                warn!("client vanished before setup: {}", e);
                continue;
            }
        };
        let archive = archive.clone();
        let spawned = thread::Builder::new()
            .name(format!("client-{peer}"))
            .spawn(move || serve_client(stream, peer, archive.as_ref()));
        if let Err(e) = spawned {
            warn!("cannot serve {}: {}", peer, e);
        }
    }
    Ok(())
}

fn serve_client(mut stream: TcpStream, peer: SocketAddr, archive: Option<&CsvArchive>) {
    info!("client {} connected", peer);
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut records = 0u64;

    let mut sink = archive.and_then(|a| match a.open(peer.ip()) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("[{}] archive unavailable: {}", peer, e);
            None
        }
    });

    let mut on_line = |line: &[u8]| match decode_record(line) {
        Ok(snapshot) => {
            records += 1;
            info!("[{}] {}", peer, describe(&snapshot));
            if let Some(file) = sink.as_mut() {
                if let Err(e) = file.append(&snapshot) {
                    warn!("[{}] cannot append to {}: {}", peer, file.path().display(), e);
                }
            }
        }
        Err(e) => warn!("[{}] bad record: {}", peer, e),
    };

    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => decoder.feed(&buf[..n], &mut on_line),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!("[{}] read error: {}", peer, e);
                break;
            }
        }
    }
    decoder.finish(&mut on_line);
    info!("client {} disconnected after {} records", peer, records);
}

/// One-line rendering of a record.
fn describe(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for sample in snapshot.iter() {
        if !out.is_empty() {
            out.push_str(" | ");
        }
        let channel = sample.channel();
        if let Some(fault) = sample.location_fault() {
            let _ = write!(out, "{channel}: unavailable ({fault:?})");
        } else if channel.is_scalar() {
            let _ = write!(out, "{channel}: {}", sample.values()[0]);
        } else {
            let _ = write!(out, "{channel}: {:?}", sample.values());
        }
    }
    out
}
