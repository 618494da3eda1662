//! Configuration-from-environment: recognized `pa_*` variables are parsed
//! by hand, every one of them is optional, unset variables keep their
//! default, and a present-but-unparseable value is fatal.

use crate::error::ConfigError;

/// Options controlling one EM iteration or decode pass, read from the
/// closed set of recognized `pa_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Swap src/tgt before all further computation.
    pub reverse: bool,
    /// Use the diagonal alignment prior instead of uniform-with-null.
    pub favor_diagonal: bool,
    /// Prior probability of a null alignment, when `favor_diagonal` is set.
    pub prob_align_null: f64,
    /// Sharpness of the diagonal prior (`lambda`).
    pub diagonal_tension: f64,
    /// Whether the tension stage should run its optimization loop.
    pub optimize_tension: bool,
    /// Use `NormalizeVB` instead of `Normalize` in the reducer.
    pub variational_bayes: bool,
    /// Symmetric Dirichlet concentration for variational Bayes.
    pub alpha: f64,
    /// Disable the synthetic NULL source word.
    pub no_null_word: bool,
    /// Writer-side address string (`file:` / `hdfs:` prefixed) for the
    /// t-table shard being produced.
    pub ttable_prefix: String,
    /// Reader-side directory the t-table's shards are loaded from.
    pub ttable_dir: String,
    /// Number of t-table shards.
    pub ttable_parts: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reverse: false,
            favor_diagonal: true,
            prob_align_null: 0.08,
            diagonal_tension: 4.0,
            optimize_tension: true,
            variational_bayes: true,
            alpha: 0.01,
            no_null_word: false,
            ttable_prefix: "ttable".to_string(),
            ttable_dir: "ttable".to_string(),
            ttable_parts: 0,
        }
    }
}

const TRUE_STRINGS: [&str; 4] = ["true", "yes", "y", "1"];
const FALSE_STRINGS: [&str; 4] = ["false", "no", "n", "0"];

fn bool_from_env(name: &'static str, dest: &mut bool) -> Result<(), ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(());
    };
    if TRUE_STRINGS.contains(&raw.as_str()) {
        *dest = true;
    } else if FALSE_STRINGS.contains(&raw.as_str()) {
        *dest = false;
    } else {
        return Err(ConfigError::InvalidBool { name, found: raw });
    }
    Ok(())
}

fn number_from_env<T: std::str::FromStr>(name: &'static str, dest: &mut T) -> Result<(), ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(());
    };
    *dest = raw
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, found: raw })?;
    Ok(())
}

fn string_from_env(name: &'static str, dest: &mut String) {
    if let Ok(raw) = std::env::var(name) {
        *dest = raw;
    }
}

impl Options {
    /// Build `Options` from the closed set of `pa_*` environment
    /// variables, starting from [`Options::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut opts = Self::default();
        bool_from_env("pa_reverse", &mut opts.reverse)?;
        bool_from_env("pa_favor_diagonal", &mut opts.favor_diagonal)?;
        number_from_env("pa_prob_align_null", &mut opts.prob_align_null)?;
        number_from_env("pa_diagonal_tension", &mut opts.diagonal_tension)?;
        bool_from_env("pa_optimize_tension", &mut opts.optimize_tension)?;
        bool_from_env("pa_variational_bayes", &mut opts.variational_bayes)?;
        number_from_env("pa_alpha", &mut opts.alpha)?;
        bool_from_env("pa_no_null_word", &mut opts.no_null_word)?;
        string_from_env("pa_ttable_prefix", &mut opts.ttable_prefix);
        string_from_env("pa_ttable_dir", &mut opts.ttable_dir);
        number_from_env("pa_ttable_parts", &mut opts.ttable_parts)?;
        Ok(opts)
    }

    /// Validate cross-option invariants. Stages call this after `from_env`
    /// and before doing any work.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.favor_diagonal && !(0.0..=1.0).contains(&self.prob_align_null) {
            return Err(ConfigError::ProbAlignNullOutOfRange {
                found: self.prob_align_null,
            });
        }
        if self.variational_bayes && self.alpha <= 0.0 {
            return Err(ConfigError::NonPositiveAlpha { found: self.alpha });
        }
        Ok(())
    }

    /// Validate that a shard count suitable for store access is positive.
    /// Kept separate from [`Self::check`] since not every stage (e.g. the
    /// tension optimizer) touches the t-table.
    pub fn check_shard_count(&self) -> Result<(), ConfigError> {
        if self.ttable_parts <= 0 {
            return Err(ConfigError::NonPositiveShardCount {
                found: self.ttable_parts,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "reverse = {}", self.reverse)?;
        writeln!(f, "favor_diagonal = {}", self.favor_diagonal)?;
        writeln!(f, "prob_align_null = {}", self.prob_align_null)?;
        writeln!(f, "diagonal_tension = {}", self.diagonal_tension)?;
        writeln!(f, "optimize_tension = {}", self.optimize_tension)?;
        writeln!(f, "variational_bayes = {}", self.variational_bayes)?;
        writeln!(f, "alpha = {}", self.alpha)?;
        writeln!(f, "no_null_word = {}", self.no_null_word)?;
        writeln!(f, "ttable_parts = {}", self.ttable_parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_pa_vars() {
        for name in [
            "pa_reverse",
            "pa_favor_diagonal",
            "pa_prob_align_null",
            "pa_diagonal_tension",
            "pa_optimize_tension",
            "pa_variational_bayes",
            "pa_alpha",
            "pa_no_null_word",
            "pa_ttable_prefix",
            "pa_ttable_dir",
            "pa_ttable_parts",
        ] {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    fn defaults_match_spec() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_pa_vars();
        let opts = Options::from_env().unwrap();
        assert_eq!(opts, Options::default());
        assert!(opts.favor_diagonal);
        assert_eq!(opts.prob_align_null, 0.08);
        assert_eq!(opts.diagonal_tension, 4.0);
        assert!(opts.variational_bayes);
        assert_eq!(opts.alpha, 0.01);
    }

    #[test]
    fn recognizes_boolean_synonyms() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_pa_vars();
        unsafe { std::env::set_var("pa_reverse", "y") };
        let opts = Options::from_env().unwrap();
        assert!(opts.reverse);
        unsafe { std::env::remove_var("pa_reverse") };
    }

    #[test]
    fn rejects_unrecognized_boolean() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_pa_vars();
        unsafe { std::env::set_var("pa_reverse", "maybe") };
        let err = Options::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
        unsafe { std::env::remove_var("pa_reverse") };
    }

    #[test]
    fn rejects_non_positive_alpha_under_vb() {
        let opts = Options {
            variational_bayes: true,
            alpha: 0.0,
            ..Options::default()
        };
        assert!(matches!(opts.check(), Err(ConfigError::NonPositiveAlpha { .. })));
    }

    #[test]
    fn accepts_any_alpha_when_vb_disabled() {
        let opts = Options {
            variational_bayes: false,
            alpha: -1.0,
            ..Options::default()
        };
        assert!(opts.check().is_ok());
    }

    #[test]
    fn rejects_out_of_range_null_prior() {
        let opts = Options {
            favor_diagonal: true,
            prob_align_null: 1.5,
            ..Options::default()
        };
        assert!(matches!(
            opts.check(),
            Err(ConfigError::ProbAlignNullOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_shard_count() {
        let opts = Options { ttable_parts: 0, ..Options::default() };
        assert!(opts.check_shard_count().is_err());
    }
}
