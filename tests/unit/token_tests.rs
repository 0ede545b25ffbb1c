//! Unit tests for tokens and dependency requests

use rstest::*;
use wirebox::{DepRequest, Multiplicity, RequestKind, Token, TypedToken};

#[rstest]
fn tokens_compare_by_identity_not_name() {
	// Arrange
	let first = Token::single("CONFIG");
	let second = Token::single("CONFIG");

	// Act & Assert
	assert_ne!(first, second);
	assert_eq!(first, first.clone());
}

#[rstest]
fn token_clone_preserves_identity() {
	// Arrange
	let token = Token::single("SERVICE");

	// Act
	let cloned = token.clone();

	// Assert
	assert_eq!(token, cloned);
	assert_eq!(cloned.name(), "SERVICE");
}

#[rstest]
fn multiplicity_is_fixed_at_creation() {
	// Arrange & Act
	let single = Token::single("ONE");
	let multi = Token::multi("MANY");

	// Assert
	assert_eq!(single.multiplicity(), Multiplicity::Single);
	assert_eq!(multi.multiplicity(), Multiplicity::Multi);
	assert!(!single.is_multi());
	assert!(multi.is_multi());
}

#[rstest]
fn default_producer_is_visible_on_the_token() {
	// Arrange
	let plain = Token::single("PLAIN");
	let defaulted = Token::with_default("DEFAULTED", || Ok(0u32));

	// Act & Assert
	assert!(!plain.has_default());
	assert!(defaulted.has_default());
}

#[rstest]
fn typed_token_shares_the_raw_identity() {
	// Arrange
	let typed: TypedToken<String> = TypedToken::new("NAMED");

	// Act
	let cloned = typed.clone();

	// Assert
	assert_eq!(typed.raw(), cloned.raw());
	assert_eq!(typed.raw().name(), "NAMED");
}

#[rstest]
#[case(RequestKind::Required)]
#[case(RequestKind::Optional)]
#[case(RequestKind::Collection)]
fn dep_request_kind_round_trips(#[case] kind: RequestKind) {
	// Arrange
	let token = Token::single("DEP");

	// Act
	let request = match kind {
		RequestKind::Required => DepRequest::required(&token),
		RequestKind::Optional => DepRequest::optional(&token),
		RequestKind::Collection => DepRequest::collection(&token),
	};

	// Assert
	assert_eq!(request.kind(), kind);
	assert_eq!(request.token(), &token);
}

#[rstest]
fn dep_requests_compare_by_token_and_kind() {
	// Arrange
	let token = Token::single("DEP");
	let other = Token::single("DEP");

	// Act & Assert
	assert_eq!(DepRequest::required(&token), DepRequest::required(&token));
	assert_ne!(DepRequest::required(&token), DepRequest::optional(&token));
	assert_ne!(DepRequest::required(&token), DepRequest::required(&other));
}

#[rstest]
fn token_display_uses_the_name() {
	// Arrange
	let token = Token::single("DISPLAYED");

	// Act & Assert
	assert_eq!(token.to_string(), "DISPLAYED");
}
