//! `TTableWriter`: the single-pass producer of one shard's `index.<p>` /
//! `entry.<p>` files.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use align_core::{AlignError, InvariantViolation, StorageError, TTableEntry, WordId};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::address::{parse_address, Address};
use crate::shard::ENTRY_RECORD_SIZE;

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Writes one shard of the distributed t-table.
///
/// Callers must present entries in ascending source-word order (the
/// shuffle substrate's grouping guarantee). `write_index` must be called
/// once, after the last `write`, before `close`.
pub struct TTableWriter {
    entry_path: PathBuf,
    index_path: PathBuf,
    entry_file: File,
    index_file: File,
    /// `(src, offset in entry records, count)`, appended in write order.
    index: Vec<(WordId, u64, u64)>,
    entry_offset_records: u64,
    last_src: Option<WordId>,
    closed: bool,
}

impl TTableWriter {
    /// Create a writer for shard `part` under local directory `dir`,
    /// truncating any existing `index.<part>` / `entry.<part>` files.
    pub fn create(dir: &Path, part: i64) -> Result<Self, StorageError> {
        let index_path = dir.join(format!("index.{part}"));
        let entry_path = dir.join(format!("entry.{part}"));
        let index_file = File::create(&index_path).map_err(|e| io_err(&index_path, e))?;
        let entry_file = File::create(&entry_path).map_err(|e| io_err(&entry_path, e))?;
        Ok(Self {
            entry_path,
            index_path,
            entry_file,
            index_file,
            index: Vec::new(),
            entry_offset_records: 0,
            last_src: None,
            closed: false,
        })
    }

    /// Create a writer from a protocol-qualified address string
    /// (`file:<dir>`) for shard `part`.
    pub fn create_at_address(address: &str, part: i64) -> Result<Self, StorageError> {
        match parse_address(address)? {
            Address::File(dir) => Self::create(&dir, part),
        }
    }

    /// Append one source word's translation row.
    ///
    /// Entries must arrive in strictly ascending `src` order; violating
    /// this, or calling after [`Self::close`], is fatal.
    pub fn write(&mut self, src: WordId, entry: &TTableEntry) -> Result<(), AlignError> {
        if self.closed {
            return Err(InvariantViolation::WriterClosed.into());
        }
        if let Some(last) = self.last_src {
            if src == last {
                return Err(InvariantViolation::DuplicateWrite { src }.into());
            }
            if src < last {
                return Err(InvariantViolation::UnorderedWrite { last, got: src }.into());
            }
        }

        let expected_offset = self.entry_offset_records * ENTRY_RECORD_SIZE as u64;
        let actual_offset = self
            .entry_file
            .stream_position()
            .map_err(|e| io_err(&self.entry_path, e))?;
        if actual_offset != expected_offset {
            return Err(InvariantViolation::MisalignedWriterOffset {
                offset: actual_offset,
                record_size: ENTRY_RECORD_SIZE,
            }
            .into());
        }

        for (tgt, prob) in entry.items() {
            self.entry_file
                .write_i32::<LittleEndian>(*tgt)
                .map_err(|e| io_err(&self.entry_path, e))?;
            self.entry_file
                .write_f64::<LittleEndian>(*prob)
                .map_err(|e| io_err(&self.entry_path, e))?;
        }

        let count = entry.size() as u64;
        self.index.push((src, self.entry_offset_records, count));
        self.entry_offset_records += count;
        self.last_src = Some(src);
        Ok(())
    }

    /// Flush the in-memory index, built from the sequence of `write`
    /// calls, to `index.<p>`. Must be called exactly once, even if no rows
    /// were written (an empty index is still a valid shard).
    pub fn write_index(&mut self) -> Result<(), AlignError> {
        if self.closed {
            return Err(InvariantViolation::WriterClosed.into());
        }
        for (src, offset, count) in &self.index {
            self.index_file
                .write_i32::<LittleEndian>(*src)
                .map_err(|e| io_err(&self.index_path, e))?;
            self.index_file
                .write_i64::<LittleEndian>(*offset as i64)
                .map_err(|e| io_err(&self.index_path, e))?;
            self.index_file
                .write_u64::<LittleEndian>(*count)
                .map_err(|e| io_err(&self.index_path, e))?;
        }
        Ok(())
    }

    /// Flush and release both file handles. Idempotent; also run on drop.
    pub fn close(&mut self) -> Result<(), AlignError> {
        if self.closed {
            return Ok(());
        }
        self.entry_file.flush().map_err(|e| io_err(&self.entry_path, e))?;
        self.index_file.flush().map_err(|e| io_err(&self.index_path, e))?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for TTableWriter {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::PartialTTable;
    use tempfile::tempdir;

    #[test]
    fn writes_in_order_and_reads_back() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.write(1, &TTableEntry::from_sorted_pairs([(10, 0.5), (20, 0.5)])).unwrap();
        w.write(2, &TTableEntry::from_sorted_pairs([(10, 1.0)])).unwrap();
        w.write_index().unwrap();
        w.close().unwrap();

        let shard = PartialTTable::load(&dir.path().join("index.0"), &dir.path().join("entry.0")).unwrap();
        assert_eq!(shard.query(1, 10), 0.5);
        assert_eq!(shard.query(2, 10), 1.0);
    }

    #[test]
    fn rejects_out_of_order_write() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.write(5, &TTableEntry::new()).unwrap();
        let err = w.write(3, &TTableEntry::new()).unwrap_err();
        assert!(matches!(err, AlignError::Invariant(InvariantViolation::UnorderedWrite { .. })));
    }

    #[test]
    fn rejects_duplicate_write() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.write(5, &TTableEntry::new()).unwrap();
        let err = w.write(5, &TTableEntry::new()).unwrap_err();
        assert!(matches!(err, AlignError::Invariant(InvariantViolation::DuplicateWrite { .. })));
    }

    #[test]
    fn rejects_use_after_close() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.close().unwrap();
        let err = w.write(1, &TTableEntry::new()).unwrap_err();
        assert!(matches!(err, AlignError::Invariant(InvariantViolation::WriterClosed)));
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.write_index().unwrap();
        w.close().unwrap();
        w.close().unwrap();
    }

    #[test]
    fn empty_shard_still_produces_valid_index() {
        let dir = tempdir().unwrap();
        let mut w = TTableWriter::create(dir.path(), 0).unwrap();
        w.write_index().unwrap();
        w.close().unwrap();
        let shard = PartialTTable::load(&dir.path().join("index.0"), &dir.path().join("entry.0")).unwrap();
        assert_eq!(shard.index_len(), 0);
    }
}
