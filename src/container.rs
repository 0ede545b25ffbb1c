//! Container: node store, bootstrap engine, and resolution.
//!
//! A container accumulates normalized registrations as graph nodes, then
//! `bootstrap` turns the flat registration list into a cycle-checked,
//! dependency-ordered instantiation. Instances are cached per node, so a
//! single token resolves to the same shared instance for the life of the
//! container. Containers are cheap-to-clone handles over shared state and
//! may be handed across threads; resolution itself is synchronous and runs
//! entirely on the calling thread.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, trace, warn};

use crate::context::{self, DeclaredDepsScanner, DepResolver, DependencyScanner, Resolution};
use crate::cycle;
use crate::error::{DiError, DiResult};
use crate::injector::{Injector, injector_token};
use crate::middleware::{self, FactoryCall, Middleware};
use crate::provider::{Construct, InstanceRef, Provider, ProviderSpec, ProviderSource};
use crate::report::{BootstrapReport, Reporter};
use crate::token::{DepRequest, RequestKind, Token, TypedToken};

pub(crate) struct Node {
	provider: Provider,
	deps: OnceLock<Vec<DepRequest>>,
	instance: OnceLock<InstanceRef>,
	used: AtomicBool,
}

impl Node {
	fn new(provider: Provider) -> Arc<Self> {
		Arc::new(Self {
			provider,
			deps: OnceLock::new(),
			instance: OnceLock::new(),
			used: AtomicBool::new(false),
		})
	}

	pub(crate) fn token(&self) -> &Token {
		self.provider.token()
	}

	pub(crate) fn source(&self) -> &ProviderSource {
		self.provider.source()
	}

	pub(crate) fn deps(&self) -> &[DepRequest] {
		self.deps.get().map(Vec::as_slice).unwrap_or(&[])
	}

	pub(crate) fn is_used(&self) -> bool {
		self.used.load(Ordering::SeqCst)
	}

	pub(crate) fn is_instantiated(&self) -> bool {
		self.instance.get().is_some()
	}

	fn mark_used(&self) {
		self.used.store(true, Ordering::SeqCst);
	}
}

#[derive(Clone)]
pub(crate) enum Binding {
	Single(Arc<Node>),
	Multi(Vec<Arc<Node>>),
}

impl Binding {
	fn nodes(&self) -> Vec<Arc<Node>> {
		match self {
			Binding::Single(node) => vec![Arc::clone(node)],
			Binding::Multi(nodes) => nodes.clone(),
		}
	}
}

/// Marks a bootstrap as in flight, so producers running inside the eager
/// loop can reach the resolution entry points. Cleared on every exit path.
struct BootstrapGuard<'a>(&'a AtomicBool);

impl<'a> BootstrapGuard<'a> {
	fn engage(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::SeqCst);
		Self(flag)
	}
}

impl Drop for BootstrapGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

struct ContainerInner {
	nodes: RwLock<HashMap<Token, Binding>>,
	/// Token insertion order, for deterministic scan, eager resolution, and
	/// report output.
	order: RwLock<Vec<Token>>,
	local_middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
	/// Process-wide middlewares captured when this container was created.
	global_snapshot: Vec<Arc<dyn Middleware>>,
	scanners: RwLock<Vec<Arc<dyn DependencyScanner>>>,
	reporters: RwLock<Vec<Arc<dyn Reporter>>>,
	parent: Option<Container>,
	bootstrapped: AtomicBool,
	bootstrapping: AtomicBool,
	bootstrap_duration: OnceLock<Duration>,
}

/// Registration store and bootstrap engine.
///
/// # Examples
///
/// ```
/// use wirebox::{Container, ProviderSpec, TypedToken};
/// use once_cell::sync::Lazy;
///
/// static ANSWER: Lazy<TypedToken<u32>> = Lazy::new(|| TypedToken::new("ANSWER"));
///
/// let container = Container::new();
/// container.register(ProviderSpec::new(ANSWER.raw()).value(42u32))?;
/// container.bootstrap()?;
///
/// assert_eq!(*container.get(&ANSWER)?, 42);
/// # Ok::<(), wirebox::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
	inner: Arc<ContainerInner>,
}

/// Non-owning container handle. The injector value is cached inside the
/// node store of the very container it points back to; a strong handle
/// there would cycle the `Arc` and the store could never drop.
#[derive(Clone)]
pub(crate) struct WeakContainer {
	inner: Weak<ContainerInner>,
}

impl WeakContainer {
	pub(crate) fn upgrade(&self) -> Option<Container> {
		self.inner.upgrade().map(|inner| Container { inner })
	}
}

impl Container {
	pub fn new() -> Self {
		Self::build(None)
	}

	/// Creates a child container. Unknown tokens fall back to the parent's
	/// store read-only, and the parent's middleware chain runs ahead of the
	/// child's own. Scanners are not inherited.
	pub fn child(&self) -> Container {
		Self::build(Some(self.clone()))
	}

	fn build(parent: Option<Container>) -> Self {
		Self {
			inner: Arc::new(ContainerInner {
				nodes: RwLock::new(HashMap::new()),
				order: RwLock::new(Vec::new()),
				local_middlewares: RwLock::new(Vec::new()),
				global_snapshot: middleware::global_snapshot(),
				scanners: RwLock::new(vec![Arc::new(DeclaredDepsScanner)]),
				reporters: RwLock::new(Vec::new()),
				parent,
				bootstrapped: AtomicBool::new(false),
				bootstrapping: AtomicBool::new(false),
				bootstrap_duration: OnceLock::new(),
			}),
		}
	}

	fn downgrade(&self) -> WeakContainer {
		WeakContainer {
			inner: Arc::downgrade(&self.inner),
		}
	}

	pub fn is_bootstrapped(&self) -> bool {
		self.inner.bootstrapped.load(Ordering::SeqCst)
	}

	fn ensure_open(&self) -> DiResult<()> {
		if self.is_bootstrapped() {
			return Err(DiError::AlreadyBootstrapped);
		}
		Ok(())
	}

	/// Passes once bootstrap has begun, not only after it finished:
	/// producers running inside the eager loop resolve through the injector.
	fn ensure_resolvable(&self) -> DiResult<()> {
		if self.is_bootstrapped() || self.inner.bootstrapping.load(Ordering::SeqCst) {
			return Ok(());
		}
		Err(DiError::NotBootstrapped)
	}

	/// Registers a single provider spec. Single-token duplicates overwrite
	/// the previous registration (last wins); multi tokens accumulate.
	pub fn register(&self, spec: ProviderSpec) -> DiResult<()> {
		self.ensure_open()?;
		let provider = spec.normalize()?;
		self.insert(provider);
		Ok(())
	}

	/// Registers a bare class keyed by its implicit per-type token.
	pub fn register_class<T: Construct>(&self) -> DiResult<()> {
		self.register(ProviderSpec::of_class::<T>())
	}

	/// Registers a batch of provider specs. The batch is normalized as a
	/// whole before any node is created, so an invalid spec leaves the
	/// store untouched.
	pub fn provide(&self, specs: impl IntoIterator<Item = ProviderSpec>) -> DiResult<()> {
		self.ensure_open()?;
		let providers = specs
			.into_iter()
			.map(ProviderSpec::normalize)
			.collect::<DiResult<Vec<_>>>()?;
		for provider in providers {
			self.insert(provider);
		}
		Ok(())
	}

	fn insert(&self, provider: Provider) {
		let token = provider.token().clone();
		let node = Node::new(provider);
		let mut nodes = self
			.inner
			.nodes
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		if token.is_multi() {
			match nodes.get_mut(&token) {
				Some(Binding::Multi(members)) => {
					members.push(node);
					return;
				}
				_ => {
					nodes.insert(token.clone(), Binding::Multi(vec![node]));
				}
			}
		} else if nodes.insert(token.clone(), Binding::Single(node)).is_some() {
			warn!(token = %token, "overwriting existing provider registration");
			return;
		}
		drop(nodes);
		self.inner
			.order
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(token);
	}

	/// Appends a container-local middleware.
	pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) -> DiResult<()> {
		self.ensure_open()?;
		self.inner
			.local_middlewares
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(middleware);
		Ok(())
	}

	/// Appends a dependency scanner, run during the scan phase after the
	/// engine's own call recording.
	pub fn add_scanner(&self, scanner: Arc<dyn DependencyScanner>) -> DiResult<()> {
		self.ensure_open()?;
		self.inner
			.scanners
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(scanner);
		Ok(())
	}

	/// Appends a diagnostics reporter, invoked once per bootstrap in
	/// registration order.
	pub fn add_reporter(&self, reporter: Arc<dyn Reporter>) -> DiResult<()> {
		self.ensure_open()?;
		self.inner
			.reporters
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(reporter);
		Ok(())
	}

	fn order_snapshot(&self) -> Vec<Token> {
		self.inner
			.order
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	fn scanners_snapshot(&self) -> Vec<Arc<dyn DependencyScanner>> {
		self.inner
			.scanners
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	fn local_binding(&self, token: &Token) -> Option<Binding> {
		self.inner
			.nodes
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(token)
			.cloned()
	}

	/// Walks up the parent chain for the owning container of a token.
	fn find_binding(&self, token: &Token) -> Option<(Container, Binding)> {
		if let Some(binding) = self.local_binding(token) {
			return Some((self.clone(), binding));
		}
		self.inner
			.parent
			.as_ref()
			.and_then(|parent| parent.find_binding(token))
	}

	/// Ancestor locals followed by this container's locals.
	fn local_chain(&self) -> Vec<Arc<dyn Middleware>> {
		let mut chain = match &self.inner.parent {
			Some(parent) => parent.local_chain(),
			None => Vec::new(),
		};
		chain.extend(
			self.inner
				.local_middlewares
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.iter()
				.cloned(),
		);
		chain
	}

	/// Globals captured at creation, then the inherited local chain.
	fn effective_middlewares(&self) -> Vec<Arc<dyn Middleware>> {
		let mut chain = self.inner.global_snapshot.clone();
		chain.extend(self.local_chain());
		chain
	}

	/// Eagerly builds the graph: scans every node's dependencies, resolves
	/// all nodes in dependency order with the middleware pipeline around
	/// each producer call, then delivers the diagnostics report.
	pub fn bootstrap(&self) -> DiResult<BootstrapReport> {
		self.ensure_open()?;
		let started = Instant::now();
		let _phase = BootstrapGuard::engage(&self.inner.bootstrapping);
		self.insert_injector_node()?;
		self.scan_all();

		for token in self.order_snapshot() {
			let Some(binding) = self.local_binding(&token) else {
				continue;
			};
			for node in binding.nodes() {
				// Top-level materialization is bootstrap machinery and does
				// not count as a use.
				self.resolve_node(&node, false)?;
			}
		}

		self.finish_bootstrap(started)
	}

	/// Scans every node and cycle-checks the discovered graph, but defers
	/// instantiation until first request. `CircularDependency` still
	/// surfaces here, from an edge walk over the scanned dependency sets.
	pub fn bootstrap_lazy(&self) -> DiResult<BootstrapReport> {
		self.ensure_open()?;
		let started = Instant::now();
		let _phase = BootstrapGuard::engage(&self.inner.bootstrapping);
		self.insert_injector_node()?;
		self.scan_all();
		self.static_cycle_check()?;
		self.finish_bootstrap(started)
	}

	fn finish_bootstrap(&self, started: Instant) -> DiResult<BootstrapReport> {
		self.inner.bootstrapped.store(true, Ordering::SeqCst);
		let _ = self.inner.bootstrap_duration.set(started.elapsed());
		let report = self.build_report();
		debug!(
			total_nodes = report.total_nodes,
			instantiated = report.instantiated_nodes,
			unused = report.unused_nodes.len(),
			"bootstrap complete"
		);
		for reporter in self
			.inner
			.reporters
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
		{
			reporter.on_report(&report);
		}
		Ok(report)
	}

	fn insert_injector_node(&self) -> DiResult<()> {
		if self.local_binding(injector_token().raw()).is_some() {
			return Ok(());
		}
		let injector = Injector::new(self.downgrade());
		self.register(ProviderSpec::new(injector_token().raw()).value(injector))
	}

	fn scan_all(&self) {
		let scanners = self.scanners_snapshot();
		for token in self.order_snapshot() {
			let Some(binding) = self.local_binding(&token) else {
				continue;
			};
			for node in binding.nodes() {
				if node.deps.get().is_some() {
					continue;
				}
				let deps = context::scan(&node.provider, &scanners);
				let _ = node.deps.set(deps);
			}
		}
	}

	/// Depth-first edge walk over the scanned dependency sets, used by the
	/// lazy path where live detection would otherwise be deferred to first
	/// request.
	fn static_cycle_check(&self) -> DiResult<()> {
		let mut graph: HashMap<u64, (String, Vec<u64>)> = HashMap::new();
		for token in self.order_snapshot() {
			let Some(binding) = self.local_binding(&token) else {
				continue;
			};
			let mut edges = Vec::new();
			for node in binding.nodes() {
				for request in node.deps() {
					if self.local_binding(request.token()).is_some() {
						edges.push(request.token().id());
					}
				}
			}
			graph.insert(token.id(), (token.name().to_string(), edges));
		}

		fn dfs(
			id: u64,
			graph: &HashMap<u64, (String, Vec<u64>)>,
			visiting: &mut Vec<u64>,
			done: &mut HashSet<u64>,
		) -> DiResult<()> {
			if done.contains(&id) {
				return Ok(());
			}
			if let Some(pos) = visiting.iter().position(|seen| *seen == id) {
				let mut names: Vec<&str> = visiting[pos..]
					.iter()
					.filter_map(|vid| graph.get(vid).map(|(name, _)| name.as_str()))
					.collect();
				names.push(
					graph
						.get(&id)
						.map(|(name, _)| name.as_str())
						.unwrap_or("<unknown>"),
				);
				return Err(DiError::CircularDependency {
					path: names.join(" -> "),
				});
			}
			let Some((_, edges)) = graph.get(&id) else {
				return Ok(());
			};
			visiting.push(id);
			for edge in edges {
				dfs(*edge, graph, visiting, done)?;
			}
			visiting.pop();
			done.insert(id);
			Ok(())
		}

		let mut visiting = Vec::new();
		let mut done = HashSet::new();
		for token in self.order_snapshot() {
			dfs(token.id(), &graph, &mut visiting, &mut done)?;
		}
		Ok(())
	}

	/// Resolves one dependency request against this container, falling back
	/// to the parent chain and to the token's default producer.
	fn resolve_request(&self, request: &DepRequest, mark_used: bool) -> DiResult<Resolution> {
		if let Some((owner, binding)) = self.find_binding(request.token()) {
			return owner.resolve_binding(&binding, mark_used);
		}
		if request.token().has_default() {
			let node = self.materialize_default(request.token())?;
			return self.resolve_node(&node, mark_used).map(Resolution::Instance);
		}
		match request.kind() {
			RequestKind::Optional => Ok(Resolution::Missing),
			RequestKind::Collection => Ok(Resolution::Collection(Vec::new())),
			RequestKind::Required => Err(DiError::UnknownToken {
				name: request.token().name().to_string(),
			}),
		}
	}

	fn resolve_binding(&self, binding: &Binding, mark_used: bool) -> DiResult<Resolution> {
		match binding {
			Binding::Single(node) => {
				self.resolve_node(node, mark_used).map(Resolution::Instance)
			}
			Binding::Multi(nodes) => {
				let mut instances = Vec::with_capacity(nodes.len());
				for node in nodes {
					instances.push(self.resolve_node(node, mark_used)?);
				}
				Ok(Resolution::Collection(instances))
			}
		}
	}

	fn resolve_node(&self, node: &Arc<Node>, mark_used: bool) -> DiResult<InstanceRef> {
		if mark_used {
			node.mark_used();
		}
		if let Some(instance) = node.instance.get() {
			trace!(token = %node.token(), "resolved from cache");
			return Ok(instance.clone());
		}

		let _path_guard = cycle::begin_resolution(node.token())?;

		// Dependencies complete before the node's own producer runs.
		let deps = node.deps().to_vec();
		for request in &deps {
			self.resolve_request(request, true)?;
		}

		trace!(token = %node.token(), deps = deps.len(), "instantiating");
		let chain = self.effective_middlewares();
		let call = FactoryCall::new(node.token(), node.source(), &deps);
		let resolver: Arc<dyn DepResolver> = Arc::new(self.clone());
		let producer = node.provider.producer().clone();
		let value = middleware::run_chain(&chain, &call, || {
			context::instantiate(&producer, Arc::clone(&resolver))
		})?;

		let _ = node.instance.set(value.clone());
		match node.instance.get() {
			Some(instance) => Ok(instance.clone()),
			None => Ok(value),
		}
	}

	/// Engine-inserted node for a token that carries a default producer.
	/// Bypasses the post-bootstrap freeze: the insertion is driven by
	/// resolution, not by user registration.
	fn materialize_default(&self, token: &Token) -> DiResult<Arc<Node>> {
		let Some(producer) = token.default_producer().cloned() else {
			return Err(DiError::UnknownToken {
				name: token.name().to_string(),
			});
		};
		let node = Node::new(Provider::from_default(token.clone(), producer));
		let deps = context::scan(&node.provider, &self.scanners_snapshot());
		let _ = node.deps.set(deps);

		let mut nodes = self
			.inner
			.nodes
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		if let Some(existing) = nodes.get(token) {
			// Raced with another materialization; keep the first.
			if let Binding::Single(existing) = existing {
				return Ok(Arc::clone(existing));
			}
		}
		nodes.insert(token.clone(), Binding::Single(Arc::clone(&node)));
		drop(nodes);
		self.inner
			.order
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(token.clone());
		debug!(token = %token, "materialized default producer");
		Ok(node)
	}

	/// Resolves and returns the cached shared instance for a single token.
	pub fn get<T: Send + Sync + 'static>(&self, token: &TypedToken<T>) -> DiResult<Arc<T>> {
		self.ensure_resolvable()?;
		match self.resolve_request(&DepRequest::required(token.raw()), true)? {
			Resolution::Instance(instance) => context::downcast(token.raw(), instance),
			Resolution::Collection(_) => Err(DiError::TypeMismatch {
				token: token.raw().name().to_string(),
				expected: std::any::type_name::<T>(),
			}),
			Resolution::Missing => Err(DiError::UnknownToken {
				name: token.raw().name().to_string(),
			}),
		}
	}

	/// Resolves every instance registered under a multi token, in
	/// registration order.
	pub fn get_all<T: Send + Sync + 'static>(
		&self,
		token: &TypedToken<T>,
	) -> DiResult<Vec<Arc<T>>> {
		self.ensure_resolvable()?;
		match self.resolve_request(&DepRequest::collection(token.raw()), true)? {
			Resolution::Collection(instances) => instances
				.into_iter()
				.map(|instance| context::downcast(token.raw(), instance))
				.collect(),
			Resolution::Instance(instance) => {
				Ok(vec![context::downcast(token.raw(), instance)?])
			}
			Resolution::Missing => Ok(Vec::new()),
		}
	}

	/// Untyped resolution; multi tokens yield an `Arc<Vec<InstanceRef>>`.
	pub fn get_ref(&self, token: &Token) -> DiResult<InstanceRef> {
		self.ensure_resolvable()?;
		let request = if token.is_multi() {
			DepRequest::collection(token)
		} else {
			DepRequest::required(token)
		};
		match self.resolve_request(&request, true)? {
			Resolution::Instance(instance) => Ok(instance),
			Resolution::Collection(instances) => Ok(Arc::new(instances) as InstanceRef),
			Resolution::Missing => Err(DiError::UnknownToken {
				name: token.name().to_string(),
			}),
		}
	}

	/// Current diagnostics snapshot. The usage fields are live: a node
	/// fetched after bootstrap no longer shows up as unused here, while the
	/// copy delivered to reporters reflects the state at bootstrap end.
	pub fn report(&self) -> DiResult<BootstrapReport> {
		self.ensure_resolvable()?;
		Ok(self.build_report())
	}

	fn build_report(&self) -> BootstrapReport {
		let injector_id = injector_token().raw().id();
		let mut total = 0usize;
		let mut instantiated = 0usize;
		let mut unused = Vec::new();
		for token in self.order_snapshot() {
			if token.id() == injector_id {
				continue;
			}
			let Some(binding) = self.local_binding(&token) else {
				continue;
			};
			for node in binding.nodes() {
				total += 1;
				if node.is_instantiated() {
					instantiated += 1;
				}
				if !node.is_used() {
					unused.push(node.token().name().to_string());
				}
			}
		}
		BootstrapReport {
			total_nodes: total,
			instantiated_nodes: instantiated,
			unused_nodes: unused,
			duration: self
				.inner
				.bootstrap_duration
				.get()
				.copied()
				.unwrap_or_default(),
			generated_at: Utc::now(),
		}
	}

	pub(crate) fn produce_uncached(
		&self,
		provider: &Provider,
	) -> DiResult<InstanceRef> {
		self.ensure_resolvable()?;
		let deps = context::scan(provider, &self.scanners_snapshot());
		for request in &deps {
			self.resolve_request(request, true)?;
		}
		let chain = self.effective_middlewares();
		let call = FactoryCall::new(provider.token(), provider.source(), &deps);
		let resolver: Arc<dyn DepResolver> = Arc::new(self.clone());
		let producer = provider.producer().clone();
		middleware::run_chain(&chain, &call, || {
			context::instantiate(&producer, Arc::clone(&resolver))
		})
	}

	#[cfg(feature = "dev-tools")]
	pub(crate) fn graph_snapshot(
		&self,
	) -> Vec<(Token, ProviderSource, Vec<DepRequest>, bool, bool)> {
		let mut snapshot = Vec::new();
		for token in self.order_snapshot() {
			let Some(binding) = self.local_binding(&token) else {
				continue;
			};
			for node in binding.nodes() {
				snapshot.push((
					node.token().clone(),
					node.source().clone(),
					node.deps().to_vec(),
					node.is_used(),
					node.is_instantiated(),
				));
			}
		}
		snapshot
	}
}

impl Default for Container {
	fn default() -> Self {
		Self::new()
	}
}

impl DepResolver for Container {
	fn resolve_dep(&self, request: &DepRequest) -> DiResult<Resolution> {
		self.resolve_request(request, true)
	}
}
