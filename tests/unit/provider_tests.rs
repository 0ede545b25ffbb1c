//! Unit tests for provider specs and normalization

use std::sync::Arc;

use rstest::*;
use wirebox::{
	class_token, Construct, DepRequest, DiError, ProviderSpec, ProviderSource, Token,
};

// Test type definitions
struct Alpha;

impl Construct for Alpha {
	fn construct() -> anyhow::Result<Self> {
		Ok(Alpha)
	}
}

struct Beta;

impl Construct for Beta {
	fn construct() -> anyhow::Result<Self> {
		Ok(Beta)
	}
}

#[rstest]
fn normalize_rejects_empty_spec() {
	// Arrange
	let token = Token::single("EMPTY");

	// Act
	let result = ProviderSpec::new(&token).normalize();

	// Assert
	match result {
		Err(DiError::InvalidProvider(message)) => {
			assert!(message.contains("no producer variant"));
			assert!(message.contains("EMPTY"));
		}
		other => panic!("expected InvalidProvider, got {other:?}"),
	}
}

#[rstest]
fn normalize_rejects_two_producer_slots() {
	// Arrange
	let token = Token::single("DOUBLE");

	// Act
	let result = ProviderSpec::new(&token)
		.value("a".to_string())
		.factory(|| Ok("b".to_string()))
		.normalize();

	// Assert
	match result {
		Err(DiError::InvalidProvider(message)) => {
			assert!(message.contains("more than one"));
		}
		other => panic!("expected InvalidProvider, got {other:?}"),
	}
}

#[rstest]
fn alias_to_self_is_rejected() {
	// Arrange
	let token = Token::single("SELFISH");

	// Act
	let result = ProviderSpec::new(&token).alias(&token).normalize();

	// Assert
	match result {
		Err(DiError::InvalidProvider(message)) => {
			assert!(message.contains("alias itself"));
		}
		other => panic!("expected InvalidProvider, got {other:?}"),
	}
}

#[rstest]
fn alias_to_multi_target_is_rejected() {
	// Arrange
	let token = Token::single("FACADE");
	let target = Token::multi("HANDLERS");

	// Act
	let result = ProviderSpec::new(&token).alias(&target).normalize();

	// Assert
	assert!(matches!(result, Err(DiError::InvalidProvider(_))));
}

#[rstest]
fn alias_declares_an_edge_to_its_target() {
	// Arrange
	let token = Token::single("FACADE");
	let target = Token::single("REAL");

	// Act
	let provider = ProviderSpec::new(&token).alias(&target).normalize().unwrap();

	// Assert
	assert_eq!(provider.source(), &ProviderSource::Alias(target.clone()));
	assert!(provider
		.declared_deps()
		.contains(&DepRequest::required(&target)));
}

#[rstest]
fn value_provider_hands_out_one_shared_instance() {
	// Arrange
	let token = Token::single("SHARED");
	let provider = ProviderSpec::new(&token)
		.value("payload".to_string())
		.normalize()
		.unwrap();

	// Act
	let first = provider.producer().call().unwrap();
	let second = provider.producer().call().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(provider.source(), &ProviderSource::Value);
}

#[rstest]
fn factory_error_names_the_owning_token() {
	// Arrange
	let token = Token::single("FAILING");
	let provider = ProviderSpec::new(&token)
		.factory(|| Err::<String, _>(anyhow::anyhow!("seed data missing")))
		.normalize()
		.unwrap();

	// Act
	let result = provider.producer().call();

	// Assert
	match result {
		Err(DiError::Producer { token, source }) => {
			assert_eq!(token, "FAILING");
			assert!(source.to_string().contains("seed data missing"));
		}
		other => panic!("expected Producer error, got {other:?}"),
	}
}

#[rstest]
fn class_token_is_stable_per_type() {
	// Arrange & Act
	let first = class_token::<Alpha>();
	let second = class_token::<Alpha>();
	let other = class_token::<Beta>();

	// Assert
	assert_eq!(first, second);
	assert_ne!(first, other);
	assert!(first.name().contains("Alpha"));
}

#[rstest]
fn of_class_registers_under_the_class_token() {
	// Arrange & Act
	let provider = ProviderSpec::of_class::<Alpha>().normalize().unwrap();

	// Assert
	assert_eq!(provider.token(), &class_token::<Alpha>());
	assert!(matches!(provider.source(), ProviderSource::Class(_)));
}

#[rstest]
fn declared_deps_accumulate_across_calls() {
	// Arrange
	let token = Token::single("OWNER");
	let first = Token::single("FIRST");
	let second = Token::single("SECOND");

	// Act
	let provider = ProviderSpec::new(&token)
		.value(0u32)
		.with_deps([DepRequest::required(&first)])
		.with_deps([DepRequest::optional(&second)])
		.normalize()
		.unwrap();

	// Assert
	assert_eq!(provider.declared_deps().len(), 2);
	assert_eq!(provider.declared_deps()[0], DepRequest::required(&first));
	assert_eq!(provider.declared_deps()[1], DepRequest::optional(&second));
}
