//! Property-based tests for the bootstrap engine
//!
//! Uses proptest to verify invariants of the container:
//! 1. Any acyclic registration set bootstraps successfully
//! 2. Singleton law - repeated resolution yields the same instance
//! 3. Cycles of any length are always rejected, eagerly and lazily
//! 4. Multi-token resolution preserves registration order
//! 5. Isolated nodes all surface in the unused-node report

use proptest::prelude::*;
use wirebox::{inject, Container, DiError, ProviderSpec, TypedToken};

/// Node count plus an adjacency matrix where only edges from a lower to a
/// higher index are honored, which keeps the graph acyclic.
fn dag_strategy() -> impl Strategy<Value = (usize, Vec<Vec<bool>>)> {
	(2usize..8).prop_flat_map(|n| {
		(
			Just(n),
			proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
		)
	})
}

fn build_dag_container(n: usize, adj: &[Vec<bool>]) -> (Container, Vec<TypedToken<String>>) {
	let tokens: Vec<TypedToken<String>> = (0..n)
		.map(|i| TypedToken::new(format!("NODE_{i}")))
		.collect();
	let container = Container::new();
	let mut specs = Vec::new();
	for i in 0..n {
		let deps: Vec<TypedToken<String>> = (i + 1..n)
			.filter(|&j| adj[i][j])
			.map(|j| tokens[j].clone())
			.collect();
		let label = format!("n{i}");
		specs.push(ProviderSpec::new(tokens[i].raw()).factory(move || {
			let mut acc = label.clone();
			for dep in &deps {
				let part = inject(dep)?;
				acc.push_str(&part);
			}
			Ok(acc)
		}));
	}
	container.provide(specs).unwrap();
	(container, tokens)
}

proptest! {
	#[test]
	fn acyclic_graphs_bootstrap_and_stay_singleton((n, adj) in dag_strategy()) {
		// Arrange
		let (container, tokens) = build_dag_container(n, &adj);

		// Act
		let report = container.bootstrap().unwrap();

		// Assert
		prop_assert_eq!(report.total_nodes, n);
		prop_assert_eq!(report.instantiated_nodes, n);
		for token in &tokens {
			let first = container.get(token).unwrap();
			let second = container.get(token).unwrap();
			prop_assert!(std::sync::Arc::ptr_eq(&first, &second));
		}
	}

	#[test]
	fn dependency_cycles_are_always_rejected(n in 2usize..8) {
		// Arrange: リング状の依存を作成
		let tokens: Vec<TypedToken<String>> = (0..n)
			.map(|i| TypedToken::new(format!("RING_{i}")))
			.collect();
		let eager = Container::new();
		let lazy = Container::new();
		for target in [&eager, &lazy] {
			let mut specs = Vec::new();
			for i in 0..n {
				let next = tokens[(i + 1) % n].clone();
				specs.push(
					ProviderSpec::new(tokens[i].raw())
						.factory(move || Ok(inject(&next)?.to_string())),
				);
			}
			target.provide(specs).unwrap();
		}

		// Act
		let eager_rejected = matches!(eager.bootstrap(), Err(DiError::CircularDependency { .. }));
		let lazy_rejected = matches!(
			lazy.bootstrap_lazy(),
			Err(DiError::CircularDependency { .. })
		);

		// Assert
		prop_assert!(eager_rejected);
		prop_assert!(lazy_rejected);
	}

	#[test]
	fn multi_resolution_preserves_registration_order(labels in proptest::collection::vec("[a-z]{1,8}", 1..10)) {
		// Arrange
		let handlers: TypedToken<String> = TypedToken::multi("HANDLERS");
		let container = Container::new();
		let specs: Vec<_> = labels
			.iter()
			.map(|label| ProviderSpec::new(handlers.raw()).value(label.clone()))
			.collect();
		container.provide(specs).unwrap();
		container.bootstrap().unwrap();

		// Act
		let resolved = container.get_all(&handlers).unwrap();

		// Assert
		let resolved: Vec<String> = resolved.iter().map(|s| s.as_ref().clone()).collect();
		prop_assert_eq!(resolved, labels);
	}

	#[test]
	fn isolated_nodes_are_all_reported_unused(k in 1usize..10) {
		// Arrange
		let tokens: Vec<TypedToken<u32>> = (0..k)
			.map(|i| TypedToken::new(format!("ISLAND_{i}")))
			.collect();
		let container = Container::new();
		let specs: Vec<_> = tokens
			.iter()
			.enumerate()
			.map(|(i, token)| ProviderSpec::new(token.raw()).value(i as u32))
			.collect();
		container.provide(specs).unwrap();

		// Act
		let report = container.bootstrap().unwrap();

		// Assert
		prop_assert_eq!(report.total_nodes, k);
		prop_assert_eq!(report.unused_nodes.len(), k);
	}
}
