//! Grouped iteration over a shuffle-sorted stream: collapses consecutive
//! lines sharing a key into one `(key, values)` group, matching the
//! shuffle substrate's guarantee that same-key records are delivered
//! consecutively.

use std::io::BufRead;

use align_core::{AlignError, StorageError, WordId};

use crate::records::parse_shuffle_line;

fn stdin_io_err(source: std::io::Error) -> AlignError {
    StorageError::Io { path: "<shuffle input>".to_string(), source }.into()
}

/// Reads `"KEY\tVALUE"` lines from a [`BufRead`] and groups consecutive
/// same-key lines together.
pub struct ShuffleGroups<R> {
    lines: std::io::Lines<R>,
    pending: Option<(WordId, String)>,
}

impl<R: BufRead> ShuffleGroups<R> {
    /// Wrap a reader as a grouped shuffle stream.
    pub fn new(input: R) -> Self {
        Self { lines: input.lines(), pending: None }
    }

    fn next_line(&mut self) -> Result<Option<(WordId, String)>, AlignError> {
        if let Some(kv) = self.pending.take() {
            return Ok(Some(kv));
        }
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                let line = line.map_err(stdin_io_err)?;
                let (key, value) = parse_shuffle_line(&line)?;
                Ok(Some((key, value.to_string())))
            }
        }
    }

    /// Read the next key and all of its consecutive values, or `None` at
    /// end of stream.
    pub fn next_group(&mut self) -> Result<Option<(WordId, Vec<String>)>, AlignError> {
        let Some((key, first_value)) = self.next_line()? else {
            return Ok(None);
        };
        let mut values = vec![first_value];
        loop {
            match self.next_line()? {
                None => break,
                Some((k, v)) => {
                    if k != key {
                        self.pending = Some((k, v));
                        break;
                    }
                    values.push(v);
                }
            }
        }
        Ok(Some((key, values)))
    }
}
