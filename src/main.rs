use clap::Parser;
use snowball::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
