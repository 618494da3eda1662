use std::io;
use std::path::Path;

use align_core::Options;
use align_pipeline::Mapper;
use align_store::TTable;
use anyhow::Result;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;
    opts.check_shard_count()?;
    info!("options:\n{opts}");

    let table = TTable::load(Path::new(&opts.ttable_dir), opts.ttable_parts)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stats = Mapper::new(&opts, &table).run(stdin.lock(), stdout.lock())?;
    info!(toks = stats.toks, log_likelihood = stats.log_likelihood, "mapper finished");
    Ok(())
}
