use std::io;

use align_core::Options;
use align_pipeline::{reducer, ReducerMode};
use align_store::TTableWriter;
use anyhow::{bail, Result};
use tracing::info;

/// Trivial front-end: the shard partition this reducer instance is
/// responsible for is assigned externally by the job launcher and passed
/// as the sole command-line argument, the same way a map/reduce task
/// learns its partition index from its environment.
fn shard_part() -> Result<i64> {
    let mut args = std::env::args().skip(1);
    let Some(part) = args.next() else {
        bail!("usage: reducer <shard-part>");
    };
    Ok(part.parse()?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;
    let part = shard_part()?;

    let mut writer = TTableWriter::create_at_address(&opts.ttable_prefix, part)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let outcome = reducer::run(&opts, ReducerMode::Reducer, stdin.lock(), Some(&mut writer), stdout.lock())?;
    writer.close()?;
    info!(part, toks = outcome.toks, "reducer finished");
    Ok(())
}
