use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `jvmkill=debug`.
pub const LOG_ENV: &str = "JVMKILL_LOG";

/// Installs a stderr `fmt` subscriber for the agent.
///
/// The agent lives inside somebody else's process: if a global subscriber is
/// already set this returns without touching it, and it never fails the load.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env().add_directive(
            "jvmkill=debug"
                .parse()
                .expect("static directive parses"),
        );

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
