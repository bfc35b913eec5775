//! Distributed min/max/average over a launched process group.

fn main() -> anyhow::Result<()> {
    meshbench_cli::run_stats()
}
