//! Core types for the alignment pipeline: primitive ids, the bit-exact
//! double/int64 wire codec, the diagonal alignment prior, the sorted-merge
//! t-table row, configuration, and shared error kinds.

pub mod diagonal;
pub mod error;
pub mod options;
pub mod search;
pub mod ttable_entry;
pub mod types;

pub use error::{AlignError, ConfigError, InvariantViolation, StorageError, WireFormatError};
pub use options::Options;
pub use search::binary_search_last;
pub use ttable_entry::{digamma, TTableEntry};
pub use types::{
    double_to_int64, first_sz, int64_to_double, mk_sz_pair, second_sz, Prob, SentSz, SentSzPair,
    WordId, DEFAULT_PROBABILITY, EMP_FEAT_KEY, LOG_LIKELIHOOD_KEY, NULL_WORD, SIZE_COUNTS_KEY,
    TOKS_KEY,
};
