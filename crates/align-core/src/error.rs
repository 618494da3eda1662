//! Error kinds shared by every stage of the alignment pipeline.

/// Invalid environment configuration, or an inconsistent combination of options.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable that names a boolean held a string outside the
    /// recognized `{true, yes, y, 1}` / `{false, no, n, 0}` sets.
    #[error("invalid {name}: expected bool, got {found:?}")]
    InvalidBool {
        /// The environment variable name (e.g. `pa_reverse`).
        name: &'static str,
        /// The offending value.
        found: String,
    },
    /// An environment variable that names a number could not be parsed.
    #[error("invalid {name}: expected number, got {found:?}")]
    InvalidNumber {
        /// The environment variable name.
        name: &'static str,
        /// The offending value.
        found: String,
    },
    /// `pa_prob_align_null` is outside `[0, 1]`.
    #[error("prob_align_null must be in [0, 1], got {found}")]
    ProbAlignNullOutOfRange {
        /// The offending value.
        found: f64,
    },
    /// `pa_alpha` is not strictly positive while variational Bayes is enabled.
    #[error("alpha must be > 0 under variational Bayes, got {found}")]
    NonPositiveAlpha {
        /// The offending value.
        found: f64,
    },
    /// `pa_ttable_parts` is not strictly positive.
    #[error("ttable_parts must be > 0, got {found}")]
    NonPositiveShardCount {
        /// The offending value.
        found: i64,
    },
}

/// Malformed textual input on a mapper, shuffle, or meta-record channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireFormatError {
    /// A mapper input line did not split into `id`, `src`, `tgt` fields.
    #[error("malformed mapper record: {line:?}")]
    MalformedMapperRecord {
        /// The offending line.
        line: String,
    },
    /// A token in a mapper input line was not a valid decimal `WordId`.
    #[error("malformed word id {token:?} in line {line:?}")]
    MalformedWordId {
        /// The offending token.
        token: String,
        /// The line it came from.
        line: String,
    },
    /// A shuffle record was missing its `KEY\tVALUE` tab separator.
    #[error("malformed shuffle record: {line:?}")]
    MalformedShuffleRecord {
        /// The offending line.
        line: String,
    },
    /// A shuffle key was not a valid decimal `WordId`.
    #[error("malformed shuffle key {token:?}")]
    MalformedKey {
        /// The offending token.
        token: String,
    },
    /// A `TTableEntry` wire payload's advertised count did not match the
    /// number of `(id, value)` pairs actually present, or the count token
    /// itself was not an integer.
    #[error("malformed ttable entry: {reason}")]
    MalformedEntry {
        /// Human-readable description of what went wrong.
        reason: String,
    },
    /// A `TTableEntry` wire payload's keys were not strictly ascending.
    #[error("ttable entry keys not sorted ascending: {prev} before {next}")]
    UnsortedEntry {
        /// The offending key, read before.
        prev: i32,
        /// The offending key, read after (and not greater).
        next: i32,
    },
    /// A scalar (toks / emp_feat / log_likelihood) wire value was not a
    /// valid decimal `int64`.
    #[error("malformed scalar value: {found:?}")]
    MalformedScalar {
        /// The offending value.
        found: String,
    },
    /// A negative key that is not one of the four reserved meta keys.
    #[error("unrecognized meta key: {key}")]
    UnrecognizedMetaKey {
        /// The offending key.
        key: i32,
    },
}

/// A failure reading or writing a t-table shard on disk.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying filesystem operation (open, stat, mmap, read, write,
    /// close) failed.
    #[error("I/O error on shard file {path}: {source}")]
    Io {
        /// Path of the file being accessed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A shard file's length is not an exact multiple of its record size.
    #[error("shard file {path} has size {size}, not a multiple of record size {record_size}")]
    MisalignedShard {
        /// Path of the offending file.
        path: String,
        /// The file's observed length in bytes.
        size: u64,
        /// The fixed record size it must be a multiple of.
        record_size: usize,
    },
    /// An address string lacked a recognized `file:` or `hdfs:` protocol prefix.
    #[error("address {address:?} has no recognized protocol prefix (file: or hdfs:)")]
    UnrecognizedProtocol {
        /// The offending address string.
        address: String,
    },
    /// An address string named a recognized but unimplemented protocol.
    #[error("protocol {protocol:?} is recognized but has no local implementation")]
    UnsupportedProtocol {
        /// The offending protocol name (without the trailing colon).
        protocol: String,
    },
}

/// Misuse of a component that violates a documented precondition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// `TTableWriter::write` was called with entries out of ascending
    /// source-word order.
    #[error("writer received src {got} after {last}, expected ascending order")]
    UnorderedWrite {
        /// The previously written source word.
        last: i32,
        /// The out-of-order source word just received.
        got: i32,
    },
    /// `TTableWriter::write` was called twice with the same source word.
    #[error("writer received duplicate src {src}")]
    DuplicateWrite {
        /// The repeated source word.
        src: i32,
    },
    /// A method was called on a writer after `close()`.
    #[error("writer used after close")]
    WriterClosed,
    /// The current entry-file offset was not a multiple of the entry record
    /// size at the start of a write — internal writer corruption.
    #[error("entry file offset {offset} is not a multiple of record size {record_size}")]
    MisalignedWriterOffset {
        /// The observed offset.
        offset: u64,
        /// The fixed record size it must be a multiple of.
        record_size: usize,
    },
    /// A reducer received a t-table entry key while running in tension mode.
    #[error("tension mode received a ttable entry for key {key}")]
    UnexpectedEntryInTensionMode {
        /// The offending key.
        key: i32,
    },
    /// A combiner was constructed with a shard writer attached.
    #[error("combiner must not be given a TTableWriter")]
    CombinerHasWriter,
}

/// The union of fatal error kinds a pipeline stage can produce. Every
/// variant here is fatal; `NumericWarning` is deliberately not a variant of
/// this type — it is logged and swallowed at the call site.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`WireFormatError`].
    #[error(transparent)]
    Wire(#[from] WireFormatError),
    /// See [`StorageError`].
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// See [`InvariantViolation`].
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
