// Level/consumption history: a 24-entry in-memory ring of hourly samples
// plus an append-only daily log persisted per year and per month, with a
// cached byte offset bounding the most recent 30 days of the year file.

use crate::ring_buffer::RingBuffer;
use crate::storage::{ReadSeek, Storage};
use anyhow::{bail, Result};
use log::{error, info};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

pub const RING_CAPACITY: usize = 24;

/// Trailing window of the year file served as "recent history".
const WINDOW_LINES: u64 = 30;

const SCAN_CHUNK: usize = 4096;

/// One committed sample. Serialized field names are the wire protocol the
/// serving layer exposes as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySample {
    #[serde(rename = "LVL")]
    pub level: u16,
    #[serde(rename = "TS")]
    pub timestamp: u64,
    #[serde(rename = "CONS")]
    pub consumption: u32,
}

/// Cached pointer to the start of the 30-day window inside the year file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindowIndex {
    pub file: String,
    pub offset: u64,
}

pub fn year_file_path(year: i32) -> String {
    format!("/{year:04}.json")
}

pub fn month_file_path(year: i32, month: u32) -> String {
    format!("/{year:04}-{month:02}.json")
}

pub struct HistoryStore {
    ring: RingBuffer<HistorySample, RING_CAPACITY>,
    index: Option<DayWindowIndex>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            index: None,
        }
    }

    pub fn record_hour(&mut self, sample: HistorySample) {
        self.ring.push(sample);
    }

    pub fn oldest_hour(&self) -> Option<&HistorySample> {
        self.ring.oldest()
    }

    /// Ordered snapshot of the ring, oldest first.
    pub fn last_24h(&self) -> Vec<HistorySample> {
        self.ring.iter().copied().collect()
    }

    /// Append one record to the year and the month file. Records are
    /// ",\n"-separated fragments so the serving layer can stream
    /// "[" + file tail + "]" as a JSON array. A failed append is logged and
    /// skipped; the next daily boundary retries naturally.
    pub fn record_day(
        &mut self,
        storage: &dyn Storage,
        year: i32,
        month: u32,
        sample: &HistorySample,
    ) {
        for path in [year_file_path(year), month_file_path(year, month)] {
            if let Err(err) = append_record(storage, &path, sample) {
                error!("Failed to append to {path}: {err:#}");
            }
        }
    }

    /// Rescan the year file and cache the offset of the first line within
    /// the trailing 30-line window. O(n) in the file, twice - the file
    /// gains one line per day, so a rescan stays cheap and the bookkeeping
    /// of an incremental index is not worth carrying.
    pub fn recompute_30day_index(&mut self, storage: &dyn Storage, year: i32) {
        info!("Updating last 30 days");
        let path = year_file_path(year);
        if !storage.exists(&path) {
            return;
        }
        match window_offset(storage, &path) {
            Ok(offset) => self.index = Some(DayWindowIndex { file: path, offset }),
            Err(err) => error!("Could not scan year file: {err:#}"),
        }
        info!("Done");
    }

    /// File identifier and byte offset for streaming the last 30 days;
    /// `None` until the first recompute succeeds.
    pub fn last_30_days(&self) -> Option<&DayWindowIndex> {
        self.index.as_ref()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn append_record(storage: &dyn Storage, path: &str, sample: &HistorySample) -> Result<()> {
    let mut record = serde_json::to_string(sample)?;
    let existing = if storage.exists(path) {
        storage.size(path)?
    } else {
        0
    };
    if existing > 0 {
        record.insert_str(0, ",\n");
    }
    storage.append(path, record.as_bytes())
}

fn window_offset(storage: &dyn Storage, path: &str) -> Result<u64> {
    let mut file = storage.open(path)?;
    let total = count_lines(file.as_mut())?;
    let start_line = total.saturating_sub(WINDOW_LINES);
    if start_line == 0 {
        return Ok(0);
    }
    file.seek(SeekFrom::Start(0))?;
    offset_after_line(file.as_mut(), start_line)
}

fn count_lines(reader: &mut dyn ReadSeek) -> Result<u64> {
    let mut buf = [0u8; SCAN_CHUNK];
    let mut lines = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(lines);
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
}

/// Byte offset just past the `line`-th newline, i.e. the start of the line
/// after it.
fn offset_after_line(reader: &mut dyn ReadSeek, line: u64) -> Result<u64> {
    let mut buf = [0u8; SCAN_CHUNK];
    let mut seen = 0;
    let mut offset: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            bail!("file ended before line {line}");
        }
        for &byte in &buf[..n] {
            offset += 1;
            if byte == b'\n' {
                seen += 1;
                if seen == line {
                    return Ok(offset);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;

    fn sample(level: u16, timestamp: u64, consumption: u32) -> HistorySample {
        HistorySample {
            level,
            timestamp,
            consumption,
        }
    }

    #[test]
    fn ring_keeps_newest_24_of_25() {
        let mut store = HistoryStore::new();
        for i in 0..25u64 {
            store.record_hour(sample(i as u16, i, 0));
        }
        let samples = store.last_24h();
        assert_eq!(samples.len(), 24);
        assert_eq!(samples[0].timestamp, 1); // the very first got evicted
        assert_eq!(samples[23].timestamp, 24);
        assert_eq!(store.oldest_hour().unwrap().timestamp, 1);
    }

    #[test]
    fn daily_records_are_comma_newline_separated() {
        let storage = MemStorage::new();
        let mut store = HistoryStore::new();
        store.record_day(&storage, 2026, 8, &sample(700, 100, 5));
        store.record_day(&storage, 2026, 8, &sample(690, 200, 15));

        let year = String::from_utf8(storage.contents("/2026.json").unwrap()).unwrap();
        assert_eq!(
            year,
            "{\"LVL\":700,\"TS\":100,\"CONS\":5},\n{\"LVL\":690,\"TS\":200,\"CONS\":15}"
        );
        // The month file gets the same records
        let month = String::from_utf8(storage.contents("/2026-08.json").unwrap()).unwrap();
        assert_eq!(month, year);
    }

    #[test]
    fn index_offset_lands_after_line_15_of_45() {
        let storage = MemStorage::new();
        let mut contents = String::new();
        for i in 0..45 {
            contents.push_str(&format!("record-{i:02}\n"));
        }
        storage.insert("/2026.json", contents.clone());

        let mut store = HistoryStore::new();
        store.recompute_30day_index(&storage, 2026);
        let index = store.last_30_days().expect("index computed");
        assert_eq!(index.file, "/2026.json");
        // 15 lines of "record-NN\n" precede the window
        assert_eq!(index.offset, 15 * 10);
        assert_eq!(&contents[index.offset as usize..index.offset as usize + 9], "record-15");
    }

    #[test]
    fn index_offset_is_zero_for_short_files() {
        let storage = MemStorage::new();
        storage.insert("/2026.json", "a\n".repeat(10));
        let mut store = HistoryStore::new();
        store.recompute_30day_index(&storage, 2026);
        assert_eq!(store.last_30_days().unwrap().offset, 0);
    }

    #[test]
    fn missing_year_file_leaves_index_unset() {
        let storage = MemStorage::new();
        let mut store = HistoryStore::new();
        store.recompute_30day_index(&storage, 2026);
        assert!(store.last_30_days().is_none());
    }

    #[test]
    fn wire_field_names_are_stable() {
        let json = serde_json::to_string(&sample(512, 1_772_405_110, 42)).unwrap();
        assert_eq!(json, "{\"LVL\":512,\"TS\":1772405110,\"CONS\":42}");
    }
}
