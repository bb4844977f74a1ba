use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::journal::Journal;
use crate::limits::MAX_RECORD_LEN;
use crate::model::Event;

/// Bytes around each payload: a u32 length before it and a u32 crc32 after it.
const FRAME_OVERHEAD: usize = 8;

/// Frame one event as `[len][bincode payload][crc32]`, little-endian.
fn encode_record(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_RECORD_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "journal record too large"));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())
}

/// Decode the record at the front of `buf`, returning it with its framed size.
///
/// `None` for a short frame, a length over `MAX_RECORD_LEN` or past the end of
/// `buf`, a crc mismatch, or a payload that does not decode.
fn decode_record(buf: &[u8]) -> Option<(Event, usize)> {
    let (len, rest) = buf.split_first_chunk::<4>()?;
    let len = u32::from_le_bytes(*len) as usize;
    if len > MAX_RECORD_LEN || rest.len() < len + 4 {
        return None;
    }
    let (payload, rest) = rest.split_at(len);
    let (crc, _) = rest.split_first_chunk::<4>()?;
    if u32::from_le_bytes(*crc) != crc32fast::hash(payload) {
        return None;
    }
    let event = bincode::deserialize(payload).ok()?;
    Some((event, len + FRAME_OVERHEAD))
}

/// Append-only journal file.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is safely discarded via length-prefix + CRC check.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Flush the BufWriter and fsync the underlying file.
    fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Write compacted events to a temp file and fsync.
    fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for event in events {
            encode_record(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Atomic swap: rename temp file over the journal and reopen.
    fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Read every valid event from `path`. Decoding stops at the first bad
    /// record and the rest of the file is ignored.
    pub fn read_all(path: &Path) -> io::Result<Vec<Event>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut events = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let Some((event, size)) = decode_record(&bytes[offset..]) else {
                tracing::warn!(
                    "journal {}: bad record at byte {offset}, ignoring {} trailing bytes",
                    path.display(),
                    bytes.len() - offset
                );
                break;
            };
            events.push(event);
            offset += size;
        }
        Ok(events)
    }
}

impl Journal for Wal {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        encode_record(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        self.flush_sync()
    }

    fn replay(&self) -> io::Result<Vec<Event>> {
        Wal::read_all(&self.path)
    }

    fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        self.flush_sync()?;
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }
}
