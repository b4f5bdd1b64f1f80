//! Terminal logging setup via `sloggers`, parameterized on a level
//! instead of a hard-coded TOML snippet, since the server and client
//! want different defaults (the server is a long-running daemon, the
//! client a thin demo binary).

pub use slog::{debug, error, info, o, warn};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Builds the process-wide root logger. `verbose` selects `debug` level
/// output instead of the default `info`; everything goes to stderr so
/// that stdout stays free for any future piping of chat output.
pub fn init(verbose: bool) -> slog::Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(if verbose {
        Severity::Debug
    } else {
        Severity::Info
    });
    builder.destination(Destination::Stderr);

    builder
        .build()
        .expect("logger configuration must be valid")
}

/// A logger that discards everything, for use in tests that don't care
/// about log output but still need to thread a `Logger` through.
pub fn discard() -> slog::Logger {
    slog::Logger::root(slog::Discard, o!())
}
