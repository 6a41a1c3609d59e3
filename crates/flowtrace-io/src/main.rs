use clap::Parser;
use flowtrace_io::cli::{run_sparsify_command, run_trace_command, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Trace(args) => run_trace_command(args)?,
        Commands::Sparsify { flows, out, index_base } => {
            run_sparsify_command(flows, out, index_base)?
        }
    }

    Ok(())
}
