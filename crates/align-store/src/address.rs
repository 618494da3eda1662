//! Parsing for t-table shard address strings: `file:<path>` for the local
//! filesystem. `hdfs:<namenode><abs-path>` is recognized (and rejected with
//! a distinct error) rather than silently treated as an unknown prefix,
//! since no distributed-filesystem client ships with this crate.

use std::path::PathBuf;

use align_core::StorageError;

/// A parsed, protocol-qualified shard directory address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// A path on the local filesystem.
    File(PathBuf),
}

/// Parse an address string of the form `file:<path>`.
///
/// `hdfs:` addresses parse their prefix successfully but are rejected with
/// [`StorageError::UnsupportedProtocol`]; any other or missing prefix is
/// [`StorageError::UnrecognizedProtocol`].
pub fn parse_address(address: &str) -> Result<Address, StorageError> {
    if let Some(path) = address.strip_prefix("file:") {
        return Ok(Address::File(PathBuf::from(path)));
    }
    if address.starts_with("hdfs:") {
        return Err(StorageError::UnsupportedProtocol {
            protocol: "hdfs".to_string(),
        });
    }
    Err(StorageError::UnrecognizedProtocol {
        address: address.to_string(),
    })
}
