//! Two-party round-trip latency over a launched process group.

fn main() -> anyhow::Result<()> {
    meshbench_cli::run_latency()
}
