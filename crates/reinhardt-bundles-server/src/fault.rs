//! Reporting of failures that can no longer reach the client

use crate::error::ServeError;

/// Receiver of unrecoverable per-exchange failures
///
/// Called once per failure, after the response has been committed.
pub trait FaultChannel: Send + Sync {
	/// Reports `fault` for the exchange serving `request_path`.
	fn report(&self, request_path: &str, fault: &ServeError);
}

/// Reports faults through `tracing` at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultChannel;

impl FaultChannel for TracingFaultChannel {
	fn report(&self, request_path: &str, fault: &ServeError) {
		tracing::error!(path = %request_path, error = %fault, "failed to stream response body");
	}
}
