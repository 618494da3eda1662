use std::io;

use align_core::Options;
use align_pipeline::{reducer, ReducerMode};
use anyhow::Result;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let outcome = reducer::run(&opts, ReducerMode::Combiner, stdin.lock(), None, stdout.lock())?;
    info!(toks = outcome.toks, "combiner finished");
    Ok(())
}
