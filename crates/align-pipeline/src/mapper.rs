//! Mapper: the E-step, with in-process ("in-mapper") combining of
//! pseudo-counts before anything is written to the shuffle.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use align_core::{diagonal, AlignError, Options, SentSzPair, StorageError, WordId, NULL_WORD};
use align_store::TTable;

use crate::records::{
    format_scalar, format_shuffle_line, format_size_counts, parse_mapper_record, size_pair_for,
};
use align_core::{EMP_FEAT_KEY, LOG_LIKELIHOOD_KEY, SIZE_COUNTS_KEY, TOKS_KEY};

fn stdio_err(path: &str, source: std::io::Error) -> AlignError {
    StorageError::Io { path: path.to_string(), source }.into()
}

/// Accumulated per-worker statistics the mapper emits at end-of-stream.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapperStats {
    pub toks: f64,
    pub emp_feat: f64,
    pub log_likelihood: f64,
    pub size_counts: BTreeMap<SentSzPair, i64>,
}

/// Runs the E-step over a mapper input stream, maintaining an in-memory
/// `pseudo_counts` map keyed by source word to collapse per-token
/// emissions down to one shuffle record per distinct source word seen.
pub struct Mapper<'a> {
    opts: &'a Options,
    table: &'a TTable,
    pseudo_counts: BTreeMap<WordId, BTreeMap<WordId, f64>>,
    stats: MapperStats,
}

impl<'a> Mapper<'a> {
    /// Build a mapper against a loaded t-table and the options for this run.
    #[must_use]
    pub fn new(opts: &'a Options, table: &'a TTable) -> Self {
        Self {
            opts,
            table,
            pseudo_counts: BTreeMap::new(),
            stats: MapperStats::default(),
        }
    }

    /// Consume every mapper input line, accumulating statistics, then emit
    /// the flushed shuffle records to `output`.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, output: W) -> Result<MapperStats, AlignError> {
        for line in input.lines() {
            let line = line.map_err(|e| stdio_err("<mapper input>", e))?;
            let record = parse_mapper_record(&line)?;
            let (mut src, mut tgt) = (record.src, record.tgt);
            if self.opts.reverse {
                std::mem::swap(&mut src, &mut tgt);
            }
            self.accumulate(&src, &tgt);
        }
        self.flush(output)
    }

    fn accumulate(&mut self, src: &[WordId], tgt: &[WordId]) {
        self.stats.toks += tgt.len() as f64;
        *self
            .stats
            .size_counts
            .entry(size_pair_for(tgt.len(), src.len()))
            .or_insert(0) += 1;

        let m = tgt.len() as u32;
        let n = src.len() as u32;
        let no_null = self.opts.no_null_word;
        let favor_diagonal = self.opts.favor_diagonal;

        for (j, &f_j) in tgt.iter().enumerate() {
            let base_uniform = 1.0 / (n as f64 + if no_null { 0.0 } else { 1.0 });

            let mut probs = Vec::with_capacity(n as usize + 1);
            let mut sum = 0.0_f64;

            if !no_null {
                let prior0 = if favor_diagonal { self.opts.prob_align_null } else { base_uniform };
                let p0 = self.table.query(NULL_WORD, f_j) * prior0;
                probs.push(p0);
                sum += p0;
            } else {
                probs.push(0.0);
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
                let p = self.table.query(src[(i - 1) as usize], f_j) * prior_i;
                probs.push(p);
                sum += p;
            }

            if !no_null {
                let count = probs[0] / sum;
                *self.pseudo_counts.entry(NULL_WORD).or_default().entry(f_j).or_insert(0.0) += count;
            }
            for i in 1..=n {
                let p = probs[i as usize] / sum;
                *self
                    .pseudo_counts
                    .entry(src[(i - 1) as usize])
                    .or_default()
                    .entry(f_j)
                    .or_insert(0.0) += p;
                self.stats.emp_feat += diagonal::feature(j as u32, i, m, n) * p;
            }
            self.stats.log_likelihood += sum.ln();
        }
    }

    fn flush<W: Write>(self, mut output: W) -> Result<MapperStats, AlignError> {
        for (src, row) in &self.pseudo_counts {
            let entry = align_core::TTableEntry::from_iter(row.iter().map(|(k, v)| (*k, *v)));
            writeln!(output, "{}", format_shuffle_line(*src, &entry.to_wire_string()))
                .map_err(|e| stdio_err("<mapper output>", e))?;
        }
        writeln!(
            output,
            "{}",
            format_shuffle_line(SIZE_COUNTS_KEY, &format_size_counts(&self.stats.size_counts))
        )
        .map_err(|e| stdio_err("<mapper output>", e))?;
        writeln!(output, "{}", format_shuffle_line(TOKS_KEY, &format_scalar(self.stats.toks)))
            .map_err(|e| stdio_err("<mapper output>", e))?;
        writeln!(output, "{}", format_shuffle_line(EMP_FEAT_KEY, &format_scalar(self.stats.emp_feat)))
            .map_err(|e| stdio_err("<mapper output>", e))?;
        writeln!(
            output,
            "{}",
            format_shuffle_line(LOG_LIKELIHOOD_KEY, &format_scalar(self.stats.log_likelihood))
        )
        .map_err(|e| stdio_err("<mapper output>", e))?;
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_store::TTableWriter;
    use tempfile::tempdir;

    fn one_pair_table(dir: &std::path::Path) -> TTable {
        let mut writer = TTableWriter::create(dir, 0).unwrap();
        writer.write(1, &align_core::TTableEntry::from_sorted_pairs([(2, 1.0)])).unwrap();
        writer.write_index().unwrap();
        writer.close().unwrap();
        TTable::load(dir, 1).unwrap()
    }

    #[test]
    fn single_pair_trivial_alignment() {
        let dir = tempdir().unwrap();
        let table = one_pair_table(dir.path());
        let opts = Options { favor_diagonal: false, no_null_word: true, ..Options::default() };

        let mapper = Mapper::new(&opts, &table);
        let mut out = Vec::new();
        let stats = mapper.run("0\t1\t2".as_bytes(), &mut out).unwrap();

        assert_eq!(stats.toks, 1.0);
        assert_eq!(stats.log_likelihood, 0.0);
        assert_eq!(stats.size_counts.get(&size_pair_for(1, 1)), Some(&1));

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        let first = lines.next().unwrap();
        let (key, value) = crate::records::parse_shuffle_line(first).unwrap();
        assert_eq!(key, 1);
        let entry = align_core::TTableEntry::from_wire_str(value).unwrap();
        assert_eq!(entry.items(), &[(2, 1.0)]);
    }

    #[test]
    fn reverse_swaps_src_and_tgt_before_mapping() {
        let dir = tempdir().unwrap();
        let table = one_pair_table(dir.path());
        let opts = Options {
            favor_diagonal: false,
            no_null_word: true,
            reverse: true,
            ..Options::default()
        };
        let mapper = Mapper::new(&opts, &table);
        let mut out = Vec::new();
        // Input fields are (src=[2], tgt=[1]); `reverse` swaps them before
        // mapping, so the effective src is [1] and that is the emitted key.
        let _ = mapper.run("0\t2\t1".as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().next().unwrap().starts_with("1\t"));
    }
}
