use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use ipxact_validate::app;
use ipxact_validate::cli::IpxactCli;

fn main() -> anyhow::Result<ExitCode> {
    let cli = IpxactCli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    Ok(runtime.block_on(app::run_ipxact(cli)))
}
