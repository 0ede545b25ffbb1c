//! Unit tests for dependency scanner plugins

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::*;
use wirebox::{Container, DependencyScanner, DepRequest, Provider, ProviderSpec, Token, TypedToken};

// Test type definitions
struct EdgeInjectingScanner {
	owner: Token,
	extra: Token,
}

impl DependencyScanner for EdgeInjectingScanner {
	fn scan(&self, provider: &Provider) -> anyhow::Result<Vec<DepRequest>> {
		if provider.token() == &self.owner {
			Ok(vec![DepRequest::required(&self.extra)])
		} else {
			Ok(Vec::new())
		}
	}
}

struct FailingScanner;

impl DependencyScanner for FailingScanner {
	fn scan(&self, _provider: &Provider) -> anyhow::Result<Vec<DepRequest>> {
		Err(anyhow::anyhow!("metadata store unreachable"))
	}
}

struct CountingScanner {
	calls: Arc<AtomicUsize>,
}

impl DependencyScanner for CountingScanner {
	fn scan(&self, _provider: &Provider) -> anyhow::Result<Vec<DepRequest>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(Vec::new())
	}
}

#[rstest]
fn custom_scanner_contributes_edges() {
	// Arrange
	let facade: TypedToken<String> = TypedToken::new("FACADE");
	let extra: TypedToken<String> = TypedToken::new("EXTRA");
	let container = Container::new();
	container
		.provide([
			ProviderSpec::new(facade.raw()).value("facade".to_string()),
			ProviderSpec::new(extra.raw()).value("extra".to_string()),
		])
		.unwrap();
	container
		.add_scanner(Arc::new(EdgeInjectingScanner {
			owner: facade.raw().clone(),
			extra: extra.raw().clone(),
		}))
		.unwrap();

	// Act
	let report = container.bootstrap().unwrap();

	// Assert: the scanner-declared edge pulled EXTRA in.
	assert!(!report.unused_nodes.contains(&"EXTRA".to_string()));
	assert!(report.unused_nodes.contains(&"FACADE".to_string()));
}

#[rstest]
fn scanner_failure_does_not_abort_bootstrap() {
	// Arrange
	let config: TypedToken<String> = TypedToken::new("CONFIG");
	let container = Container::new();
	container
		.register(ProviderSpec::new(config.raw()).value("ok".to_string()))
		.unwrap();
	container.add_scanner(Arc::new(FailingScanner)).unwrap();

	// Act
	let result = container.bootstrap();

	// Assert
	assert!(result.is_ok());
	assert_eq!(*container.get(&config).unwrap(), "ok");
}

#[rstest]
fn scanners_run_once_per_node() {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let first: TypedToken<String> = TypedToken::new("FIRST");
	let second: TypedToken<String> = TypedToken::new("SECOND");
	let container = Container::new();
	container
		.provide([
			ProviderSpec::new(first.raw()).value("a".to_string()),
			ProviderSpec::new(second.raw()).value("b".to_string()),
		])
		.unwrap();
	container
		.add_scanner(Arc::new(CountingScanner {
			calls: Arc::clone(&calls),
		}))
		.unwrap();

	// Act
	container.bootstrap().unwrap();

	// Assert: both registrations plus the engine's injector node.
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
fn scanners_are_not_inherited_by_children() {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let parent = Container::new();
	parent
		.add_scanner(Arc::new(CountingScanner {
			calls: Arc::clone(&calls),
		}))
		.unwrap();
	parent.bootstrap().unwrap();
	let scanned_by_parent = calls.load(Ordering::SeqCst);

	let child = parent.child();
	let service: TypedToken<String> = TypedToken::new("CHILD_SVC");
	child
		.register(ProviderSpec::new(service.raw()).value("leaf".to_string()))
		.unwrap();

	// Act
	child.bootstrap().unwrap();

	// Assert: the child's scan did not invoke the parent's scanner.
	assert_eq!(calls.load(Ordering::SeqCst), scanned_by_parent);
}
