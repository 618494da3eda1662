//! Viterbi decoding: per-sentence best alignment under the same E-step
//! posterior the mapper computes, without any accumulation.

use std::io::{BufRead, Write};

use align_core::{diagonal, AlignError, Options, StorageError, WordId, NULL_WORD};
use align_store::TTable;

use crate::records::parse_mapper_record;

fn stdio_err(path: &str, source: std::io::Error) -> AlignError {
    StorageError::Io { path: path.to_string(), source }.into()
}

/// Decodes a mapper-shaped input stream into one alignment line per
/// sentence.
pub struct Viterbi<'a> {
    opts: &'a Options,
    table: &'a TTable,
}

impl<'a> Viterbi<'a> {
    /// Build a decoder against a loaded t-table and the options for this run.
    #[must_use]
    pub fn new(opts: &'a Options, table: &'a TTable) -> Self {
        Self { opts, table }
    }

    /// Decode every input sentence, writing one `"id\ti0-j0 i1-j1 ...\n"`
    /// line per sentence (an empty point list is a line with no points).
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<(), AlignError> {
        for line in input.lines() {
            let line = line.map_err(|e| stdio_err("<viterbi input>", e))?;
            let record = parse_mapper_record(&line)?;
            let (mut src, mut tgt) = (record.src, record.tgt);
            if self.opts.reverse {
                std::mem::swap(&mut src, &mut tgt);
            }
            let points = self.decode_sentence(&src, &tgt);
            let rendered: Vec<String> = points.iter().map(|(i, j)| format!("{i}-{j}")).collect();
            writeln!(output, "{}\t{}", record.id, rendered.join(" ")).map_err(|e| stdio_err("<viterbi output>", e))?;
        }
        Ok(())
    }

    fn decode_sentence(&self, src: &[WordId], tgt: &[WordId]) -> Vec<(u32, u32)> {
        let m = tgt.len() as u32;
        let n = src.len() as u32;
        let no_null = self.opts.no_null_word;
        let favor_diagonal = self.opts.favor_diagonal;
        let base_uniform = 1.0 / (n as f64 + if no_null { 0.0 } else { 1.0 });

        let mut points = Vec::new();
        for (j, &f_j) in tgt.iter().enumerate() {
            let mut best_index: i64 = -1;
            let mut best_prob = -1.0_f64;

            if !no_null {
                let prior0 = if favor_diagonal { self.opts.prob_align_null } else { base_uniform };
                best_index = 0;
                best_prob = self.table.query(NULL_WORD, f_j) * prior0;
            }

            let az = if favor_diagonal {
                diagonal::compute_z(j as u32 + 1, m, n, self.opts.diagonal_tension) / (1.0 - self.opts.prob_align_null)
            } else {
                0.0
            };
            for i in 1..=n {
                let prior_i = if favor_diagonal {
                    diagonal::unnormalized_prob(j as u32 + 1, i, m, n, self.opts.diagonal_tension) / az
                } else {
                    base_uniform
                };
                let prob = self.table.query(src[(i - 1) as usize], f_j) * prior_i;
                if prob > best_prob {
                    best_index = i as i64;
                    best_prob = prob;
                }
            }

            if best_index > 0 {
                let a = (best_index - 1) as u32;
                if self.opts.reverse {
                    points.push((j as u32, a));
                } else {
                    points.push((a, j as u32));
                }
            }
        }
        points
    }
}
