//! Command-line surface for the `orbc` binary (spec.md §6).
//!
//! Grounded on `tsz-cli::args::CliArgs`'s derive style, cut down to the
//! handful of flags orbc's interface actually names plus the ambient
//! verbosity/color flags every teacher CLI carries (`SPEC_FULL.md` §E).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// `orbc [INPUTS]+ [-o OUT] [-c] [-O0|-O1|-O2|-O3] [--llvm PATH]`.
#[derive(Parser, Debug)]
#[command(name = "orbc", version, about = "Compiler for the Orb language")]
pub struct CliArgs {
    /// Source files (`.orb`) and extra link inputs (anything else).
    pub inputs: Vec<PathBuf>,

    /// Output path. Defaults to the stem of the first input plus the
    /// platform object/executable extension. Repeating this flag is an
    /// error (spec.md §6 exit code 2, "multiple outputs").
    #[arg(short = 'o', long = "output")]
    pub output: Vec<PathBuf>,

    /// Emit an object file only; do not invoke the linker.
    #[arg(short = 'c')]
    pub compile_only: bool,

    /// Backend optimizer level.
    #[arg(short = 'O', value_name = "N", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub opt_level: Option<u8>,

    /// Path to an external backend/linker binary to invoke in place of
    /// the stubbed, logged default (spec.md §6 "Object/executable output").
    #[arg(long)]
    pub llvm: Option<PathBuf>,

    /// Raise the tracing verbosity; repeatable (`-v`, `-vv`, ...).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Whether diagnostics are colorized.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    #[must_use]
    pub fn resolve(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_source_with_compile_only_and_opt_level() {
        let args = CliArgs::try_parse_from(["orbc", "main.orb", "-c", "-O2"]).unwrap();
        assert_eq!(args.inputs, vec![PathBuf::from("main.orb")]);
        assert!(args.compile_only);
        assert_eq!(args.opt_level, Some(2));
    }

    #[test]
    fn rejects_an_out_of_range_opt_level() {
        assert!(CliArgs::try_parse_from(["orbc", "main.orb", "-O9"]).is_err());
    }

    #[test]
    fn accepts_repeated_output_flags_for_later_multiple_outputs_check() {
        let args = CliArgs::try_parse_from(["orbc", "main.orb", "-o", "a.o", "-o", "b.o"]).unwrap();
        assert_eq!(args.output.len(), 2);
    }
}
