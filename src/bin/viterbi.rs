use std::io;
use std::path::Path;

use align_core::Options;
use align_pipeline::Viterbi;
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
    Viterbi::new(&opts, &table).run(stdin.lock(), stdout.lock())?;
    Ok(())
}
