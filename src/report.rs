//! Bootstrap diagnostics.
//!
//! Every bootstrap builds a [`BootstrapReport`] snapshot and hands it to the
//! registered [`Reporter`]s in registration order. The report delivered at
//! bootstrap end shows which nodes nothing depended on; a later
//! `Container::report` call recomputes the usage fields, so post-bootstrap
//! fetches no longer count as unused there.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Snapshot of a container's graph after bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
	/// Number of registered nodes, the engine's own injector node excluded.
	pub total_nodes: usize,
	/// Nodes whose instance cache is populated.
	pub instantiated_nodes: usize,
	/// Token names no other node or caller has pulled in, in registration
	/// order.
	pub unused_nodes: Vec<String>,
	/// Wall-clock time the bootstrap took.
	pub duration: Duration,
	pub generated_at: DateTime<Utc>,
}

impl fmt::Display for BootstrapReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} nodes, {} instantiated, {} unused in {:?}",
			self.total_nodes,
			self.instantiated_nodes,
			self.unused_nodes.len(),
			self.duration
		)
	}
}

/// Receives the diagnostics snapshot at the end of a bootstrap.
///
/// Reporters run on the bootstrapping thread and must not block.
pub trait Reporter: Send + Sync {
	fn on_report(&self, report: &BootstrapReport);
}

/// Logs the report as a single JSON line at info level.
#[derive(Debug, Default)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
	fn on_report(&self, report: &BootstrapReport) {
		match serde_json::to_string(report) {
			Ok(json) => info!(report = %json, "bootstrap report"),
			Err(error) => warn!(%error, "failed to serialize bootstrap report"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn sample() -> BootstrapReport {
		BootstrapReport {
			total_nodes: 3,
			instantiated_nodes: 2,
			unused_nodes: vec!["CACHE".to_string()],
			duration: Duration::from_millis(12),
			generated_at: Utc::now(),
		}
	}

	#[rstest]
	fn display_summarizes_counts() {
		// Arrange
		let report = sample();

		// Act
		let rendered = report.to_string();

		// Assert
		assert!(rendered.starts_with("3 nodes, 2 instantiated, 1 unused"));
	}

	#[rstest]
	fn serializes_with_stable_field_names() {
		// Arrange
		let report = sample();

		// Act
		let json: serde_json::Value =
			serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();

		// Assert
		assert_eq!(json["total_nodes"], 3);
		assert_eq!(json["instantiated_nodes"], 2);
		assert_eq!(json["unused_nodes"][0], "CACHE");
		assert!(json.get("generated_at").is_some());
	}

	#[rstest]
	fn json_reporter_handles_report() {
		// Arrange
		let report = sample();

		// Act & Assert: must not panic.
		JsonReporter.on_report(&report);
	}
}
