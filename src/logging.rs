use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::VerbosityLevel;

/// Filter used when `RUST_LOG` is not set
pub fn default_directives(verbosity: VerbosityLevel) -> &'static str {
    match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn,ipxact_validate=info",
        VerbosityLevel::Verbose => "info,ipxact_validate=debug",
    }
}

/// Install the stderr subscriber. A second call is a no-op.
pub fn init(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(verbosity).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
