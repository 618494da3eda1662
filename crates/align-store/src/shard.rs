//! `PartialTTable`: a single shard's translation table, served by
//! read-only mmap over two packed binary files.

use std::fs::File;
use std::path::Path;

use align_core::{binary_search_last, DEFAULT_PROBABILITY, Prob, StorageError, WordId};
use byteorder::{ByteOrder, LittleEndian};
use memmap2::{Mmap, MmapOptions};

/// Size in bytes of one index record: `(src: i32, offset: i64, count: u64)`,
/// packed with no alignment padding.
pub const INDEX_RECORD_SIZE: usize = 20;
/// Size in bytes of one entry record: `(tgt: i32, prob: f64)`, packed with
/// no alignment padding.
pub const ENTRY_RECORD_SIZE: usize = 12;

/// Backing storage for a mapped file: either a real mmap, or nothing at
/// all for a zero-length (empty) shard file, since `mmap` rejects
/// zero-length mappings.
enum Backing {
    Mapped(Mmap),
    Empty,
}

impl std::ops::Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(m) => &m[..],
            Backing::Empty => &[],
        }
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn map_file(path: &Path) -> Result<Backing, StorageError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let len = file.metadata().map_err(|e| io_err(path, e))?.len();
    if len == 0 {
        return Ok(Backing::Empty);
    }
    // SAFETY: the mapped file is a read-only shard owned by the t-table
    // producer; concurrent external truncation is outside this crate's
    // contract, matching the mmap usage of every map/reduce store in this
    // design.
    let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| io_err(path, e))?;
    Ok(Backing::Mapped(mmap))
}

fn check_aligned(path: &Path, len: usize, record_size: usize) -> Result<(), StorageError> {
    if len % record_size != 0 {
        return Err(StorageError::MisalignedShard {
            path: path.display().to_string(),
            size: len as u64,
            record_size,
        });
    }
    Ok(())
}

/// One shard of the distributed t-table: a read-only, mmap'd pair of
/// `index.<p>` / `entry.<p>` files.
pub struct PartialTTable {
    index: Backing,
    entry: Backing,
    index_len: usize,
    entry_len: usize,
}

impl PartialTTable {
    /// Memory-map `index_path` and `entry_path`, validating that each
    /// file's length is an exact multiple of its record size. A
    /// zero-length file is an empty shard, not an error.
    pub fn load(index_path: &Path, entry_path: &Path) -> Result<Self, StorageError> {
        let index = map_file(index_path)?;
        check_aligned(index_path, index.len(), INDEX_RECORD_SIZE)?;
        let entry = map_file(entry_path)?;
        check_aligned(entry_path, entry.len(), ENTRY_RECORD_SIZE)?;

        let index_len = index.len() / INDEX_RECORD_SIZE;
        let entry_len = entry.len() / ENTRY_RECORD_SIZE;
        Ok(Self {
            index,
            entry,
            index_len,
            entry_len,
        })
    }

    /// Number of distinct source words indexed by this shard.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index_len
    }

    /// Total number of (target, prob) entries across all source words in
    /// this shard.
    #[must_use]
    pub fn entry_len(&self) -> usize {
        self.entry_len
    }

    fn index_src_at(&self, i: usize) -> WordId {
        let base = i * INDEX_RECORD_SIZE;
        LittleEndian::read_i32(&self.index[base..base + 4])
    }

    fn index_record_at(&self, i: usize) -> (i64, u64) {
        let base = i * INDEX_RECORD_SIZE;
        let offset = LittleEndian::read_i64(&self.index[base + 4..base + 12]);
        let count = LittleEndian::read_u64(&self.index[base + 12..base + 20]);
        (offset, count)
    }

    fn entry_tgt_at(&self, i: usize) -> WordId {
        let base = i * ENTRY_RECORD_SIZE;
        LittleEndian::read_i32(&self.entry[base..base + 4])
    }

    fn entry_prob_at(&self, i: usize) -> Prob {
        let base = i * ENTRY_RECORD_SIZE;
        LittleEndian::read_f64(&self.entry[base + 4..base + 12])
    }

    /// Point query: `p(tgt | src)`, or [`align_core::DEFAULT_PROBABILITY`]
    /// if `src` or `tgt` is absent from this shard.
    #[must_use]
    pub fn query(&self, src: WordId, tgt: WordId) -> Prob {
        let Some(idx) = binary_search_last(self.index_len, |i| self.index_src_at(i), src) else {
            return DEFAULT_PROBABILITY;
        };
        let (offset, count) = self.index_record_at(idx);
        let offset = offset as usize;
        let count = count as usize;
        let Some(pos) = binary_search_last(count, |i| self.entry_tgt_at(offset + i), tgt) else {
            return DEFAULT_PROBABILITY;
        };
        self.entry_prob_at(offset + pos)
    }

    /// Iterate every `(src, tgt, prob)` triple stored in this shard, in
    /// on-disk order (ascending src, then ascending tgt within each src).
    pub fn dump(&self) -> impl Iterator<Item = (WordId, WordId, Prob)> + '_ {
        (0..self.index_len).flat_map(move |i| {
            let src = self.index_src_at(i);
            let (offset, count) = self.index_record_at(i);
            let offset = offset as usize;
            let count = count as usize;
            (0..count).map(move |k| (src, self.entry_tgt_at(offset + k), self.entry_prob_at(offset + k)))
        })
    }
}
