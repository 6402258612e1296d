mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flexsim")]
#[command(about = "Flexibility environment experiments", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  flexsim run --config configs/sample.toml --out runs/\n  flexsim validate --config configs/sample.toml --strict\n"
)]
struct Cli {
    /// Default log filter; FLEXSIM_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the naive baseline and the configured agent.
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check config, dataset and environment without running episodes.
    Validate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Also write the JSON report to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_format = match cli.log_format {
        LogFormat::Text => "text",
        LogFormat::Json => "json",
    };
    if let Err(err) = obs::init_tracing(&cli.log_level, log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Run { config, out } => Command::Run { config, out },
        CliCommand::Validate {
            config,
            strict,
            out,
        } => Command::Validate {
            config,
            strict,
            out,
        },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
