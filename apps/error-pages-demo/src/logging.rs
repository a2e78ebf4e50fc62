use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over everything; otherwise `-v` flags raise the configured
/// level (`-v` info, `-vv` debug, `-vvv` trace).
pub fn init_logging(config: &LoggingConfig, verbose: u8) {
    let directive = match verbose {
        0 => config.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // A subscriber installed earlier (tests, embedding) keeps precedence.
    if let Err(e) = installed {
        tracing::debug!(error = %e, "global subscriber already installed");
    }
}
