mod app;

use anyhow::Result;
use clap::Parser;
use std::io::BufWriter;

use app::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let start = std::time::Instant::now();
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let count = app::run(&cli, &mut out)?;

    tracing::info!(
        "Done! {} resources in {:.3}s",
        count,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
