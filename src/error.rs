//! Error types for the wirebox engine.
//!
//! This module defines the error types used throughout the wirebox crate.

use thiserror::Error;

/// Errors that can occur during registration, scanning, and resolution.
#[derive(Debug, Error)]
pub enum DiError {
	/// Registration shape was unrecognized or ambiguous.
	#[error("Invalid provider: {0}")]
	InvalidProvider(String),

	/// Resolution was requested for a token with no registered node and no
	/// default producer.
	#[error("Unknown token: {name}")]
	UnknownToken {
		/// Name of the token that could not be resolved.
		name: String,
	},

	/// A token was requested, directly or transitively, while it was still
	/// resolving.
	#[error("Circular dependency detected: {path}")]
	CircularDependency {
		/// Resolution path, in the form `A -> B -> A`.
		path: String,
	},

	/// A dependency request primitive was invoked with no open session.
	#[error("Injection requested outside of an injection context")]
	CalledOutsideContext,

	/// The container no longer accepts registrations or another bootstrap.
	#[error("Container is already bootstrapped")]
	AlreadyBootstrapped,

	/// The container has not been bootstrapped yet.
	#[error("Container is not bootstrapped")]
	NotBootstrapped,

	/// Resolution recursed past the engine's depth limit.
	#[error("Maximum resolution depth exceeded: {0}")]
	MaxDepthExceeded(usize),

	/// A cached instance could not be downcast to the requested type.
	#[error("Type mismatch for token `{token}`: expected {expected}")]
	TypeMismatch {
		/// Name of the token whose instance was accessed.
		token: String,
		/// Rust type the caller asked for.
		expected: &'static str,
	},

	/// A producer failed during real instantiation. The source chain is
	/// preserved and propagates after the context session is closed.
	#[error("Producer for token `{token}` failed: {source}")]
	Producer {
		/// Token whose producer failed.
		token: String,
		/// Underlying failure reported by the producer.
		#[source]
		source: anyhow::Error,
	},

	/// Scan-mode signal: a required single-token request has no typed
	/// placeholder, so the probed execution path ends here. Swallowed by
	/// `scan`; it never escapes to callers.
	#[error("Placeholder request during dependency scan")]
	ScanPlaceholder,
}

/// Result type alias for engine operations.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unknown_token_display() {
		let error = DiError::UnknownToken {
			name: "CONFIG".to_string(),
		};
		assert_eq!(error.to_string(), "Unknown token: CONFIG");
	}

	#[rstest]
	fn test_circular_dependency_display() {
		let error = DiError::CircularDependency {
			path: "A -> B -> A".to_string(),
		};
		assert_eq!(error.to_string(), "Circular dependency detected: A -> B -> A");
	}

	#[rstest]
	fn test_invalid_provider_display() {
		let error = DiError::InvalidProvider("no producer variant".to_string());
		assert_eq!(error.to_string(), "Invalid provider: no producer variant");
	}

	#[rstest]
	fn test_type_mismatch_display() {
		let error = DiError::TypeMismatch {
			token: "LOGGER".to_string(),
			expected: "alloc::string::String",
		};
		assert_eq!(
			error.to_string(),
			"Type mismatch for token `LOGGER`: expected alloc::string::String"
		);
	}

	#[rstest]
	fn test_producer_error_preserves_source() {
		let error = DiError::Producer {
			token: "DB".to_string(),
			source: anyhow::anyhow!("connection refused"),
		};
		assert_eq!(
			error.to_string(),
			"Producer for token `DB` failed: connection refused"
		);
		assert!(std::error::Error::source(&error).is_some());
	}

	#[rstest]
	fn test_max_depth_display() {
		let error = DiError::MaxDepthExceeded(101);
		assert_eq!(error.to_string(), "Maximum resolution depth exceeded: 101");
	}
}
