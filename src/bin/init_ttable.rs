use align_core::Options;
use align_store::TTableWriter;
use anyhow::Result;
use tracing::info;

/// Writes `ttable_parts` empty shards (zero-record index + entry files) so
/// that the first EM iteration's mapper has a valid, all-default-probability
/// t-table to query against.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env()?;
    opts.check()?;
    opts.check_shard_count()?;
    info!(parts = opts.ttable_parts, dir = %opts.ttable_dir, "creating empty ttable");

    for part in 0..opts.ttable_parts {
        let mut writer = TTableWriter::create_at_address(&opts.ttable_prefix, part)?;
        writer.write_index()?;
        writer.close()?;
    }
    Ok(())
}
