mod cli;
mod run;
mod settings;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::CheckShaders(args)) => run::check_shaders(args),
        None => run::run(cli.run),
    }
}
