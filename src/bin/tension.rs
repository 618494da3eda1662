use std::io;

use align_core::Options;
use align_pipeline::{reducer, ReducerMode};
use anyhow::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    reducer::run(&opts, ReducerMode::Tension, stdin.lock(), None, stdout.lock())?;
    Ok(())
}
