//! Reducer: the M-step's three faces over the same shuffle-grouped
//! input — full reduce-and-write, associative partial combine, and the
//! tension optimizer — selected by [`Mode`], mirroring a single shared
//! skeleton with mode-gated behavior at each key and at flush.

use std::collections::BTreeMap;
use std::io::Write;

use align_core::{
    diagonal, first_sz, second_sz, AlignError, InvariantViolation, Options, SentSzPair, StorageError, TTableEntry,
    WireFormatError, WordId, EMP_FEAT_KEY, LOG_LIKELIHOOD_KEY, SIZE_COUNTS_KEY, TOKS_KEY,
};
use align_store::TTableWriter;

use crate::groups::ShuffleGroups;
use crate::records::{format_scalar, format_shuffle_line, format_size_counts, parse_scalar, parse_size_counts};

fn stdio_err(path: &str, source: std::io::Error) -> AlignError {
    StorageError::Io { path: path.to_string(), source }.into()
}

/// Which of the three reducer personalities to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normalize and write each source word's row to its shard.
    Reducer,
    /// Sum partial rows and meta scalars without normalizing or writing.
    Combiner,
    /// Consume only meta records and re-estimate the diagonal tension.
    Tension,
}

/// Accumulated meta statistics and (in [`Mode::Tension`]) the re-estimated
/// diagonal tension.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReducerOutcome {
    pub size_counts: BTreeMap<SentSzPair, i64>,
    pub toks: f64,
    pub emp_feat: f64,
    pub log_likelihood: f64,
    pub tension: Option<f64>,
}

/// Run one reducer pass over a shuffle-grouped input stream.
///
/// `writer` must be `Some` for [`Mode::Reducer`] and `None` for
/// [`Mode::Combiner`] / [`Mode::Tension`] — passing a writer to a
/// combiner or tension run is a fatal [`InvariantViolation::CombinerHasWriter`].
pub fn run<R: std::io::BufRead, W: Write>(
    opts: &Options,
    mode: Mode,
    input: R,
    mut writer: Option<&mut TTableWriter>,
    mut meta_out: W,
) -> Result<ReducerOutcome, AlignError> {
    if matches!(mode, Mode::Combiner | Mode::Tension) && writer.is_some() {
        return Err(InvariantViolation::CombinerHasWriter.into());
    }

    let mut size_counts: BTreeMap<SentSzPair, i64> = BTreeMap::new();
    let mut toks = 0.0_f64;
    let mut emp_feat = 0.0_f64;
    let mut log_likelihood = 0.0_f64;

    let mut groups = ShuffleGroups::new(input);
    while let Some((key, values)) = groups.next_group()? {
        if key >= 0 {
            if !matches!(mode, Mode::Reducer | Mode::Combiner) {
                return Err(InvariantViolation::UnexpectedEntryInTensionMode { key }.into());
            }
            let summed = sum_ttable_entries(&values)?;
            match mode {
                Mode::Reducer => {
                    let mut row = summed;
                    if opts.variational_bayes {
                        row.normalize_vb(opts.alpha);
                    } else {
                        row.normalize();
                    }
                    let writer = writer.as_deref_mut().expect("reducer mode requires a TTableWriter");
                    writer.write(key, &row)?;
                }
                Mode::Combiner => {
                    writeln!(meta_out, "{}", format_shuffle_line(key, &summed.to_wire_string()))
                        .map_err(|e| stdio_err("<reducer output>", e))?;
                }
                Mode::Tension => unreachable!("guarded above"),
            }
        } else {
            match key {
                SIZE_COUNTS_KEY => {
                    for v in &values {
                        for (pair, count) in parse_size_counts(v)? {
                            *size_counts.entry(pair).or_insert(0) += count;
                        }
                    }
                }
                EMP_FEAT_KEY => {
                    for v in &values {
                        emp_feat += parse_scalar(v)?;
                    }
                }
                TOKS_KEY => {
                    for v in &values {
                        toks += parse_scalar(v)?;
                    }
                }
                LOG_LIKELIHOOD_KEY => {
                    for v in &values {
                        log_likelihood += parse_scalar(v)?;
                    }
                }
                _ => return Err(WireFormatError::UnrecognizedMetaKey { key }.into()),
            }
        }
    }

    let mut tension = None;
    match mode {
        Mode::Reducer => {
            let writer = writer.as_deref_mut().expect("reducer mode requires a TTableWriter");
            writer.write_index()?;
            emit_meta(&mut meta_out, &size_counts, toks, emp_feat, log_likelihood)?;
        }
        Mode::Combiner => {
            emit_meta(&mut meta_out, &size_counts, toks, emp_feat, log_likelihood)?;
        }
        Mode::Tension => {
            let base2_log_likelihood = log_likelihood / std::f64::consts::LN_2;
            tracing::info!(log_e_likelihood = log_likelihood, "tension: corpus log-likelihood (natural)");
            tracing::info!(log_2_likelihood = base2_log_likelihood, "tension: corpus log-likelihood (base 2)");
            tracing::info!(cross_entropy = base2_log_likelihood / toks, "tension: cross entropy");
            tracing::info!(
                perplexity = 2.0_f64.powf(-base2_log_likelihood / toks),
                "tension: perplexity"
            );
            tracing::info!(posterior_al_feat = emp_feat / toks, "tension: posterior alignment feature");
            tracing::info!(size_counts = size_counts.len(), "tension: distinct sentence-length pairs");
            if opts.favor_diagonal && opts.optimize_tension {
                tension = Some(optimize_tension(opts.diagonal_tension, emp_feat, toks, &size_counts));
                writeln!(meta_out, "{}", tension.unwrap()).map_err(|e| stdio_err("<tension output>", e))?;
            }
        }
    }

    Ok(ReducerOutcome { size_counts, toks, emp_feat, log_likelihood, tension })
}

fn sum_ttable_entries(values: &[String]) -> Result<TTableEntry, WireFormatError> {
    let mut acc = TTableEntry::new();
    let mut scratch = TTableEntry::new();
    for (idx, value) in values.iter().enumerate() {
        let incoming = TTableEntry::from_wire_str(value)?;
        if idx == 0 {
            acc = incoming;
            continue;
        }
        TTableEntry::plus_eq(&acc, &incoming, &mut scratch);
        std::mem::swap(&mut acc, &mut scratch);
    }
    Ok(acc)
}

fn emit_meta<W: Write>(
    out: &mut W,
    size_counts: &BTreeMap<SentSzPair, i64>,
    toks: f64,
    emp_feat: f64,
    log_likelihood: f64,
) -> Result<(), AlignError> {
    writeln!(out, "{}", format_shuffle_line(SIZE_COUNTS_KEY, &format_size_counts(size_counts)))
        .map_err(|e| stdio_err("<reducer output>", e))?;
    writeln!(out, "{}", format_shuffle_line(TOKS_KEY, &format_scalar(toks))).map_err(|e| stdio_err("<reducer output>", e))?;
    writeln!(out, "{}", format_shuffle_line(EMP_FEAT_KEY, &format_scalar(emp_feat)))
        .map_err(|e| stdio_err("<reducer output>", e))?;
    writeln!(out, "{}", format_shuffle_line(LOG_LIKELIHOOD_KEY, &format_scalar(log_likelihood)))
        .map_err(|e| stdio_err("<reducer output>", e))?;
    Ok(())
}

/// The fixed 8-iteration, step-20.0, clamp-[0.1, 14] diagonal tension
/// re-estimation. Preserved bit-exactly per design: these constants are
/// load-bearing for reproducing published convergence behavior.
fn optimize_tension(start: f64, emp_feat: f64, toks: f64, size_counts: &BTreeMap<SentSzPair, i64>) -> f64 {
    let avg_emp = emp_feat / toks;
    let mut lambda = start;
    for iteration in 0..8 {
        let mut mod_feat = 0.0_f64;
        for (&pair, &count) in size_counts {
            let m = first_sz(pair) as u32;
            let n = second_sz(pair) as u32;
            for j in 1..=m {
                mod_feat += count as f64 * diagonal::compute_dlog_z(j, m, n, lambda);
            }
        }
        mod_feat /= toks;
        tracing::info!(iteration = iteration + 1, mod_feat, tension = lambda, "tension: model alignment feature");
        lambda += (avg_emp - mod_feat) * 20.0;
        lambda = lambda.clamp(0.1, 14.0);
    }
    tracing::info!(final_tension = lambda, "tension: converged");
    lambda
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::mk_sz_pair;
    use align_store::TTableWriter;
    use tempfile::tempdir;

    #[test]
    fn empty_stream_still_writes_index_and_meta() {
        let dir = tempdir().unwrap();
        let mut writer = TTableWriter::create(dir.path(), 0).unwrap();
        let opts = Options::default();
        let mut out = Vec::new();
        let outcome = run(&opts, Mode::Reducer, "".as_bytes(), Some(&mut writer), &mut out).unwrap();
        writer.close().unwrap();
        assert_eq!(outcome.toks, 0.0);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);

        let shard = align_store::PartialTTable::load(&dir.path().join("index.0"), &dir.path().join("entry.0")).unwrap();
        assert_eq!(shard.index_len(), 0);
    }

    #[test]
    fn reducer_mode_normalizes_and_writes() {
        let dir = tempdir().unwrap();
        let mut writer = TTableWriter::create(dir.path(), 0).unwrap();
        let opts = Options { variational_bayes: false, ..Options::default() };

        let a = TTableEntry::from_sorted_pairs([(2, 1.0)]).to_wire_string();
        let b = TTableEntry::from_sorted_pairs([(2, 1.0)]).to_wire_string();
        let input = format!("1\t{a}\n1\t{b}\n");

        let mut out = Vec::new();
        run(&opts, Mode::Reducer, input.as_bytes(), Some(&mut writer), &mut out).unwrap();
        writer.close().unwrap();

        let shard = align_store::PartialTTable::load(&dir.path().join("index.0"), &dir.path().join("entry.0")).unwrap();
        assert_eq!(shard.query(1, 2), 1.0);
    }

    #[test]
    fn combiner_mode_sums_without_writing() {
        let opts = Options::default();
        let a = TTableEntry::from_sorted_pairs([(2, 1.0)]).to_wire_string();
        let b = TTableEntry::from_sorted_pairs([(2, 1.0)]).to_wire_string();
        let input = format!("1\t{a}\n1\t{b}\n");

        let mut out = Vec::new();
        run(&opts, Mode::Combiner, input.as_bytes(), None, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let first = text.lines().next().unwrap();
        let (key, value) = crate::records::parse_shuffle_line(first).unwrap();
        assert_eq!(key, 1);
        let entry = TTableEntry::from_wire_str(value).unwrap();
        assert_eq!(entry.items(), &[(2, 2.0)]);
    }

    #[test]
    fn combiner_mode_rejects_writer() {
        let dir = tempdir().unwrap();
        let mut writer = TTableWriter::create(dir.path(), 0).unwrap();
        let opts = Options::default();
        let mut out = Vec::new();
        let err = run(&opts, Mode::Combiner, "".as_bytes(), Some(&mut writer), &mut out).unwrap_err();
        assert!(matches!(err, AlignError::Invariant(InvariantViolation::CombinerHasWriter)));
    }

    #[test]
    fn tension_mode_rejects_positive_key() {
        let opts = Options::default();
        let mut out = Vec::new();
        let err = run(&opts, Mode::Tension, "1\t0".as_bytes(), None, &mut out).unwrap_err();
        assert!(matches!(
            err,
            AlignError::Invariant(InvariantViolation::UnexpectedEntryInTensionMode { key: 1 })
        ));
    }

    #[test]
    fn tension_clamps_to_lower_bound() {
        // A huge excess of "modeled > empirical" feature drives lambda down
        // every iteration; with only one size class it should bottom out at
        // the floor within 8 iterations.
        let mut size_counts = BTreeMap::new();
        size_counts.insert(mk_sz_pair(4, 4), 1000);
        let outcome = optimize_tension(4.0, -1000.0, 1.0, &size_counts);
        assert_eq!(outcome, 0.1);
    }

    #[test]
    fn tension_clamps_to_upper_bound() {
        let mut size_counts = BTreeMap::new();
        size_counts.insert(mk_sz_pair(4, 4), 1);
        let outcome = optimize_tension(4.0, 1000.0, 1.0, &size_counts);
        assert_eq!(outcome, 14.0);
    }

    #[test]
    fn tension_mode_emits_nothing_when_disabled() {
        let opts = Options { optimize_tension: false, ..Options::default() };
        let input = format!("{SIZE_COUNTS_KEY}\t\n{TOKS_KEY}\t{}\n", format_scalar(1.0));
        let mut out = Vec::new();
        let outcome = run(&opts, Mode::Tension, input.as_bytes(), None, &mut out).unwrap();
        assert!(outcome.tension.is_none());
        assert!(out.is_empty());
    }
}
