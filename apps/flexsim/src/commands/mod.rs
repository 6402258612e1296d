mod common;
mod run;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Run {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
        strict: bool,
        out: Option<PathBuf>,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Run { config, out } => run::run_experiment(config, out),
        Command::Validate {
            config,
            strict,
            out,
        } => validate::run_validate(config, strict, out),
    }
}
