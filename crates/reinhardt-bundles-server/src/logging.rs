//! Tracing subscriber setup for hosts without their own

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a formatting subscriber as the global default
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g.
/// `"reinhardt_bundles_server=debug,info"`). Returns `false` when a global
/// subscriber was already installed, leaving it in place.
pub fn init_tracing(default_directive: &str) -> bool {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_target(false))
		.try_init()
		.is_ok()
}
