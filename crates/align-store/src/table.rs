//! `TTable`: fan-out of the distributed t-table over its `P` shards.

use std::path::Path;

use align_core::{double_to_int64, Prob, StorageError, WordId};

use crate::shard::PartialTTable;

/// The full distributed t-table: `P` shards, immutable for the table's
/// lifetime, loaded from a directory of `index.<p>` / `entry.<p>` file
/// pairs.
pub struct TTable {
    shards: Vec<PartialTTable>,
}

impl TTable {
    /// Load all `parts` shards from `dir`.
    pub fn load(dir: &Path, parts: i64) -> Result<Self, StorageError> {
        let mut shards = Vec::with_capacity(parts.max(0) as usize);
        for p in 0..parts {
            let index_path = dir.join(format!("index.{p}"));
            let entry_path = dir.join(format!("entry.{p}"));
            shards.push(PartialTTable::load(&index_path, &entry_path)?);
        }
        Ok(Self { shards })
    }

    /// Number of shards this table was loaded with.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Positive-remainder shard assignment: `src mod P`.
    fn shard_for(&self, src: WordId) -> usize {
        let p = self.shards.len() as i64;
        (((src as i64 % p) + p) % p) as usize
    }

    /// Point query: `p(tgt | src)`.
    #[must_use]
    pub fn query(&self, src: WordId, tgt: WordId) -> Prob {
        self.shards[self.shard_for(src)].query(src, tgt)
    }

    /// A human-readable diagnostic listing, one line per `(src, tgt, prob)`
    /// triple, partitioned by shard: `"src tgt ln(prob) prob
    /// int64-of-prob"`.
    pub fn dump(&self) -> impl Iterator<Item = String> + '_ {
        self.shards.iter().flat_map(|shard| {
            shard.dump().map(|(src, tgt, prob)| {
                format!("{src} {tgt} {} {prob} {}", prob.ln(), double_to_int64(prob))
            })
        })
    }
}
