//! On-disk and in-memory representation of the distributed t-table: the
//! sharded, mmap'd reader ([`TTable`]/[`PartialTTable`]) and the
//! sequential shard writer ([`TTableWriter`]).

pub mod address;
pub mod shard;
pub mod table;
pub mod writer;

pub use address::{parse_address, Address};
pub use shard::{PartialTTable, ENTRY_RECORD_SIZE, INDEX_RECORD_SIZE};
pub use table::TTable;
pub use writer::TTableWriter;
