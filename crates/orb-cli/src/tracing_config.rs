//! `tracing-subscriber` wiring for the `orbc` binary, always to stderr so
//! it never interleaves with diagnostic output on stdout.
//!
//! Grounded on `tsz-cli`'s `tracing_config::init_tracing` (referenced
//! from `tsz_server`'s `main.rs`), simplified to the single env-filter
//! layer orbc needs.

use tracing_subscriber::EnvFilter;

/// `verbosity` is `CliArgs::verbose`'s repeat count: 0 keeps only
/// warnings and above, 1 adds info, 2+ adds debug/trace (clamped).
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("ORBC_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
