use std::io::{self, Write};
use std::path::Path;

use align_core::Options;
use align_store::TTable;
use anyhow::Result;
use tracing::info;

/// Diagnostic front-end: loads a complete `TTable` and writes a
/// human-readable `src tgt ln(prob) prob int64-of-prob` listing, one line
/// per stored `(src, tgt)` pair, in shard order.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;
    opts.check_shard_count()?;
    info!(parts = opts.ttable_parts, dir = %opts.ttable_dir, "dumping ttable");

    let table = TTable::load(Path::new(&opts.ttable_dir), opts.ttable_parts)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in table.dump() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
