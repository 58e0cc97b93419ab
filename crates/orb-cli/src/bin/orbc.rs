//! `orbc` binary entrypoint: parse arguments, wire up tracing, hand off to
//! [`orb_cli::driver::run`], and exit with the code spec.md §6 assigns.
//!
//! Grounded on `tsz-cli`'s `tsz_server::main` shape (`init_tracing` before
//! argument-driven work, translate the outcome into a process exit code).

use clap::Parser;
use orb_cli::args::CliArgs;
use orb_cli::{driver, tracing_config};

fn main() {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprint!("{err}");
            std::process::exit(1);
        }
    };

    tracing_config::init_tracing(args.verbose);
    std::process::exit(driver::run(&args));
}
