//! Dependency graph visualization for development and debugging.
//!
//! Exports a bootstrapped container's node graph in DOT format for
//! rendering with Graphviz, plus a standalone cycle scan and per-kind
//! counts. Only compiled with the `dev-tools` feature.
//!
//! ## Example
//!
//! ```rust
//! use wirebox::visualization::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("DATABASE", "value");
//! graph.add_node("USER_SERVICE", "factory");
//! graph.add_dependency("USER_SERVICE", "DATABASE");
//!
//! let dot = graph.to_dot();
//! assert!(dot.contains("digraph"));
//! ```

use std::collections::{HashMap, HashSet};

use crate::container::Container;
use crate::provider::ProviderSource;

fn source_kind(source: &ProviderSource) -> &'static str {
	match source {
		ProviderSource::Value => "value",
		ProviderSource::Factory => "factory",
		ProviderSource::Class(_) => "class",
		ProviderSource::Alias(_) => "alias",
		ProviderSource::Default => "default",
	}
}

/// A node in the rendered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
	/// Token name.
	pub name: String,
	/// Provider kind: "value", "factory", "class", "alias", or "default".
	pub kind: String,
	pub used: bool,
	pub instantiated: bool,
}

/// Dependency graph for visualization.
#[derive(Debug, Default)]
pub struct DependencyGraph {
	nodes: HashMap<String, GraphNode>,
	edges: Vec<(String, String)>,
}

impl DependencyGraph {
	pub fn new() -> Self {
		Self {
			nodes: HashMap::new(),
			edges: Vec::new(),
		}
	}

	/// Snapshots a container's graph, including the engine's injector node.
	///
	/// # Example
	///
	/// ```rust
	/// use once_cell::sync::Lazy;
	/// use wirebox::visualization::DependencyGraph;
	/// use wirebox::{Container, ProviderSpec, TypedToken};
	///
	/// static PORT: Lazy<TypedToken<u16>> = Lazy::new(|| TypedToken::new("PORT"));
	///
	/// let container = Container::new();
	/// container.register(ProviderSpec::new(PORT.raw()).value(8080u16))?;
	/// container.bootstrap()?;
	///
	/// let graph = DependencyGraph::from_container(&container);
	/// assert!(graph.to_dot().contains("PORT"));
	/// # Ok::<(), wirebox::DiError>(())
	/// ```
	pub fn from_container(container: &Container) -> Self {
		let snapshot = container.graph_snapshot();
		let mut graph = Self::new();
		for (token, source, _, used, instantiated) in &snapshot {
			graph.nodes.insert(
				token.name().to_string(),
				GraphNode {
					name: token.name().to_string(),
					kind: source_kind(source).to_string(),
					used: *used,
					instantiated: *instantiated,
				},
			);
		}
		for (token, _, deps, _, _) in &snapshot {
			for request in deps {
				let target = request.token().name();
				if graph.nodes.contains_key(target) {
					graph
						.edges
						.push((token.name().to_string(), target.to_string()));
				}
			}
		}
		graph
	}

	/// Adds a node by hand, for graphs not backed by a container.
	pub fn add_node(&mut self, name: impl Into<String>, kind: impl Into<String>) {
		let name = name.into();
		self.nodes.insert(
			name.clone(),
			GraphNode {
				name,
				kind: kind.into(),
				used: true,
				instantiated: true,
			},
		);
	}

	/// Adds a dependency edge from `from` to `to`.
	pub fn add_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.edges.push((from.into(), to.into()));
	}

	/// Generates DOT output for Graphviz.
	///
	/// # Example
	///
	/// ```rust
	/// use wirebox::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("CONFIG", "value");
	/// graph.add_node("LOGGER", "factory");
	/// graph.add_dependency("LOGGER", "CONFIG");
	///
	/// let dot = graph.to_dot();
	/// assert!(dot.contains("\"LOGGER\" -> \"CONFIG\""));
	/// ```
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		let mut names: Vec<_> = self.nodes.keys().collect();
		names.sort();
		for name in names {
			let Some(node) = self.nodes.get(name) else {
				continue;
			};
			let color = match node.kind.as_str() {
				"value" => "lightblue",
				"factory" => "lightgreen",
				"class" => "lightyellow",
				"alias" => "lightgrey",
				_ => "white",
			};
			let label = if node.used {
				node.name.clone()
			} else {
				format!("{}\\n(unused)", node.name)
			};
			output.push_str(&format!(
				"  \"{}\" [label=\"{}\", fillcolor={}, style=filled];\n",
				node.name, label, color
			));
		}

		output.push('\n');

		for (from, to) in &self.edges {
			output.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
		}

		output.push_str("}\n");
		output
	}

	/// Finds dependency cycles, each returned as the node path forming it.
	///
	/// # Example
	///
	/// ```rust
	/// use wirebox::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("A", "factory");
	/// graph.add_node("B", "factory");
	/// graph.add_dependency("A", "B");
	/// graph.add_dependency("B", "A");
	///
	/// assert!(!graph.detect_cycles().is_empty());
	/// ```
	pub fn detect_cycles(&self) -> Vec<Vec<String>> {
		let mut cycles = Vec::new();
		let mut visited = HashSet::new();
		let mut rec_stack = HashSet::new();

		let mut names: Vec<_> = self.nodes.keys().collect();
		names.sort();
		for name in names {
			if !visited.contains(name.as_str()) {
				let mut path = Vec::new();
				self.dfs_cycles(name, &mut visited, &mut rec_stack, &mut path, &mut cycles);
			}
		}

		cycles
	}

	fn dfs_cycles(
		&self,
		node: &str,
		visited: &mut HashSet<String>,
		rec_stack: &mut HashSet<String>,
		path: &mut Vec<String>,
		cycles: &mut Vec<Vec<String>>,
	) {
		visited.insert(node.to_string());
		rec_stack.insert(node.to_string());
		path.push(node.to_string());

		let targets: Vec<_> = self
			.edges
			.iter()
			.filter_map(|(from, to)| (from == node).then_some(to.as_str()))
			.collect();

		for target in targets {
			if !visited.contains(target) {
				self.dfs_cycles(target, visited, rec_stack, path, cycles);
			} else if rec_stack.contains(target) {
				if let Some(start) = path.iter().position(|seen| seen == target) {
					cycles.push(path[start..].to_vec());
				}
			}
		}

		path.pop();
		rec_stack.remove(node);
	}

	/// Per-kind node counts plus edge and usage totals.
	///
	/// # Example
	///
	/// ```rust
	/// use wirebox::visualization::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_node("A", "value");
	/// graph.add_node("B", "factory");
	/// graph.add_dependency("B", "A");
	///
	/// let stats = graph.statistics();
	/// assert_eq!(stats.node_count, 2);
	/// assert_eq!(stats.edge_count, 1);
	/// assert_eq!(stats.value_count, 1);
	/// assert_eq!(stats.factory_count, 1);
	/// ```
	pub fn statistics(&self) -> GraphStatistics {
		let count_kind = |kind: &str| {
			self.nodes
				.values()
				.filter(|node| node.kind == kind)
				.count()
		};
		GraphStatistics {
			node_count: self.nodes.len(),
			edge_count: self.edges.len(),
			value_count: count_kind("value"),
			factory_count: count_kind("factory"),
			class_count: count_kind("class"),
			alias_count: count_kind("alias"),
			used_count: self.nodes.values().filter(|node| node.used).count(),
		}
	}
}

/// Aggregate counts over a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	pub node_count: usize,
	pub edge_count: usize,
	pub value_count: usize,
	pub factory_count: usize,
	pub class_count: usize,
	pub alias_count: usize,
	pub used_count: usize,
}
