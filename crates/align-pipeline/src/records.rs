//! Textual wire records: mapper input lines, shuffle `KEY\tVALUE` lines,
//! and the scalar/size-counts payloads carried under the reserved
//! meta-record keys.

use std::collections::BTreeMap;

use align_core::{double_to_int64, int64_to_double, mk_sz_pair, SentSzPair, WireFormatError, WordId};

/// One parsed mapper input record: a zero-based sentence id plus its
/// source and target token id sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperRecord {
    pub id: u64,
    pub src: Vec<WordId>,
    pub tgt: Vec<WordId>,
}

fn parse_word_ids(field: &str, line: &str) -> Result<Vec<WordId>, WireFormatError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split_whitespace()
        .map(|tok| {
            tok.parse().map_err(|_| WireFormatError::MalformedWordId {
                token: tok.to_string(),
                line: line.to_string(),
            })
        })
        .collect()
}

/// Parse one `"<id>\t<src-ints>\t<tgt-ints>"` mapper input line.
pub fn parse_mapper_record(line: &str) -> Result<MapperRecord, WireFormatError> {
    let mut fields = line.splitn(3, '\t');
    let (Some(id_tok), Some(src_field), Some(tgt_field)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(WireFormatError::MalformedMapperRecord { line: line.to_string() });
    };
    let id: u64 = id_tok.parse().map_err(|_| WireFormatError::MalformedMapperRecord { line: line.to_string() })?;
    let src = parse_word_ids(src_field, line)?;
    let tgt = parse_word_ids(tgt_field, line)?;
    Ok(MapperRecord { id, src, tgt })
}

/// Split a `"KEY\tVALUE"` shuffle line into its key and the raw value
/// substring.
pub fn parse_shuffle_line(line: &str) -> Result<(WordId, &str), WireFormatError> {
    let (key_tok, value) = line.split_once('\t').ok_or_else(|| WireFormatError::MalformedShuffleRecord {
        line: line.to_string(),
    })?;
    let key: WordId = key_tok
        .parse()
        .map_err(|_| WireFormatError::MalformedKey { token: key_tok.to_string() })?;
    Ok((key, value))
}

/// Format a `"KEY\tVALUE"` shuffle line (without trailing newline).
#[must_use]
pub fn format_shuffle_line(key: WordId, value: &str) -> String {
    format!("{key}\t{value}")
}

/// Format the `kSizeCountsKey` payload: `"pair1 count1 pair2 count2 ..."`.
#[must_use]
pub fn format_size_counts(size_counts: &BTreeMap<SentSzPair, i64>) -> String {
    let mut out = String::new();
    for (i, (pair, count)) in size_counts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&pair.to_string());
        out.push(' ');
        out.push_str(&count.to_string());
    }
    out
}

/// Parse the `kSizeCountsKey` payload into `(pair, count)` entries.
pub fn parse_size_counts(value: &str) -> Result<Vec<(SentSzPair, i64)>, WireFormatError> {
    let mut tokens = value.split_whitespace();
    let mut out = Vec::new();
    loop {
        let Some(pair_tok) = tokens.next() else { break };
        let count_tok = tokens.next().ok_or_else(|| WireFormatError::MalformedScalar {
            found: pair_tok.to_string(),
        })?;
        let pair: SentSzPair = pair_tok
            .parse()
            .map_err(|_| WireFormatError::MalformedScalar { found: pair_tok.to_string() })?;
        let count: i64 = count_tok
            .parse()
            .map_err(|_| WireFormatError::MalformedScalar { found: count_tok.to_string() })?;
        out.push((pair, count));
    }
    Ok(out)
}

/// Build the (target length, source length)-packed key for one sentence.
#[must_use]
pub fn size_pair_for(tgt_len: usize, src_len: usize) -> SentSzPair {
    mk_sz_pair(tgt_len as u16, src_len as u16)
}

/// Format a scalar meta value (`kEmpFeatKey` / `kToksKey` /
/// `kLogLikelihoodKey`) as the decimal int64-of-double wire form.
#[must_use]
pub fn format_scalar(value: f64) -> String {
    double_to_int64(value).to_string()
}

/// Parse a scalar meta value from its decimal int64-of-double wire form.
pub fn parse_scalar(value: &str) -> Result<f64, WireFormatError> {
    let bits: i64 = value
        .trim()
        .parse()
        .map_err(|_| WireFormatError::MalformedScalar { found: value.to_string() })?;
    Ok(int64_to_double(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapper_record() {
        let rec = parse_mapper_record("0\t1 2\t3 4 5").unwrap();
        assert_eq!(rec, MapperRecord { id: 0, src: vec![1, 2], tgt: vec![3, 4, 5] });
    }

    #[test]
    fn parses_mapper_record_with_empty_fields() {
        let rec = parse_mapper_record("7\t\t").unwrap();
        assert_eq!(rec, MapperRecord { id: 7, src: vec![], tgt: vec![] });
    }

    #[test]
    fn rejects_mapper_record_missing_fields() {
        let err = parse_mapper_record("0\t1 2").unwrap_err();
        assert!(matches!(err, WireFormatError::MalformedMapperRecord { .. }));
    }

    #[test]
    fn rejects_mapper_record_bad_token() {
        let err = parse_mapper_record("0\tx\t1").unwrap_err();
        assert!(matches!(err, WireFormatError::MalformedWordId { .. }));
    }

    #[test]
    fn shuffle_line_roundtrip() {
        let line = format_shuffle_line(5, "hello world");
        let (key, value) = parse_shuffle_line(&line).unwrap();
        assert_eq!(key, 5);
        assert_eq!(value, "hello world");
    }

    #[test]
    fn size_counts_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert(size_pair_for(3, 5), 2);
        map.insert(size_pair_for(1, 1), 9);
        let value = format_size_counts(&map);
        let parsed = parse_size_counts(&value).unwrap();
        assert_eq!(parsed, map.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn scalar_roundtrip_negative_value() {
        let value = format_scalar(-12.5);
        assert_eq!(parse_scalar(&value).unwrap(), -12.5);
    }
}
