//! Injection context: session tracking and dependency discovery.
//!
//! Producers are zero-argument closures that pull their dependencies through
//! the `inject*` primitives in this module. Every primitive records the
//! request in the innermost session on the current thread, then behaves
//! according to the session mode:
//!
//! - **Scan** sessions observe which tokens a producer requests by actually
//!   running it. No resolver is installed; primitives hand back placeholders
//!   where the type system allows one ([`inject_optional`] returns `None`,
//!   [`inject_all`] returns an empty collection, [`inject_ref`] returns a
//!   [`Placeholder`] instance) so execution can continue. A required single
//!   typed request has no placeholder and ends the probed path with the
//!   benign [`DiError::ScanPlaceholder`] signal, which [`scan`] swallows.
//! - **Live** sessions carry a resolver; primitives return real resolved
//!   values.
//!
//! Discovery by observed execution is a heuristic, not static analysis: a
//! producer with branch-dependent requests only reveals the branch taken,
//! and required single requests are observed only up to the first one per
//! path. Neither limits correctness, because live resolution satisfies any
//! undiscovered request recursively at instantiation time; only the edge
//! metadata (report, visualization, the lazy-mode cycle precheck) is an
//! under-approximation. Declared dependency metadata on the registration
//! closes the gap and is merged by [`DeclaredDepsScanner`].
//!
//! Sessions form a thread-local stack, so re-entrant producer execution
//! (for example `Injector::produce` called from inside a factory) nests by
//! push/pop, and the pop is guaranteed on every exit path by an RAII guard.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{DiError, DiResult};
use crate::provider::{InstanceRef, Placeholder, ProducerFn, Provider};
use crate::token::{DepRequest, Token, TypedToken};

/// Outcome of resolving a single dependency request.
pub(crate) enum Resolution {
	Instance(InstanceRef),
	Collection(Vec<InstanceRef>),
	Missing,
}

/// Resolver installed in a live session by the bootstrap engine or the
/// injector.
pub(crate) trait DepResolver: Send + Sync {
	fn resolve_dep(&self, request: &DepRequest) -> DiResult<Resolution>;
}

enum SessionMode {
	Scan,
	Live(Arc<dyn DepResolver>),
}

struct Session {
	mode: SessionMode,
	recorded: Vec<DepRequest>,
}

thread_local! {
	static SESSIONS: RefCell<Vec<Session>> = const { RefCell::new(Vec::new()) };
}

/// Pops the session on drop, closing it on both success and error paths.
struct SessionGuard;

impl Drop for SessionGuard {
	fn drop(&mut self) {
		let _ = SESSIONS.try_with(|stack| {
			stack.borrow_mut().pop();
		});
	}
}

fn push_session(mode: SessionMode) -> SessionGuard {
	SESSIONS.with(|stack| {
		stack.borrow_mut().push(Session {
			mode,
			recorded: Vec::new(),
		});
	});
	SessionGuard
}

/// Records the request in the innermost session and hands back its resolver,
/// if any. The borrow is released before the resolver runs, so resolution
/// may re-enter and push nested sessions.
fn record(request: &DepRequest) -> DiResult<Option<Arc<dyn DepResolver>>> {
	SESSIONS.with(|stack| {
		let mut stack = stack.borrow_mut();
		let Some(session) = stack.last_mut() else {
			return Err(DiError::CalledOutsideContext);
		};
		if !session.recorded.iter().any(|seen| seen == request) {
			session.recorded.push(request.clone());
		}
		Ok(match &session.mode {
			SessionMode::Scan => None,
			SessionMode::Live(resolver) => Some(Arc::clone(resolver)),
		})
	})
}

pub(crate) fn downcast<T: Send + Sync + 'static>(
	token: &Token,
	instance: InstanceRef,
) -> DiResult<Arc<T>> {
	instance.downcast::<T>().map_err(|_| DiError::TypeMismatch {
		token: token.name().to_string(),
		expected: std::any::type_name::<T>(),
	})
}

/// Requests a required single-valued dependency.
///
/// Callable only from inside a producer execution (scan or live); anywhere
/// else it fails with [`DiError::CalledOutsideContext`].
pub fn inject<T: Send + Sync + 'static>(token: &TypedToken<T>) -> DiResult<Arc<T>> {
	let request = DepRequest::required(token.raw());
	match record(&request)? {
		None => Err(DiError::ScanPlaceholder),
		Some(resolver) => match resolver.resolve_dep(&request)? {
			Resolution::Instance(instance) => downcast(token.raw(), instance),
			Resolution::Collection(_) => Err(DiError::TypeMismatch {
				token: token.raw().name().to_string(),
				expected: std::any::type_name::<T>(),
			}),
			Resolution::Missing => Err(DiError::UnknownToken {
				name: token.raw().name().to_string(),
			}),
		},
	}
}

/// Requests an optional dependency. An unregistered token yields `Ok(None)`
/// instead of an error; during a scan this always yields `Ok(None)`.
pub fn inject_optional<T: Send + Sync + 'static>(
	token: &TypedToken<T>,
) -> DiResult<Option<Arc<T>>> {
	let request = DepRequest::optional(token.raw());
	match record(&request)? {
		None => Ok(None),
		Some(resolver) => match resolver.resolve_dep(&request)? {
			Resolution::Instance(instance) => downcast(token.raw(), instance).map(Some),
			Resolution::Collection(_) => Err(DiError::TypeMismatch {
				token: token.raw().name().to_string(),
				expected: std::any::type_name::<T>(),
			}),
			Resolution::Missing => Ok(None),
		},
	}
}

/// Requests every instance registered under a multi token, in registration
/// order. A token with no registrations yields an empty collection; during
/// a scan this always yields an empty collection.
pub fn inject_all<T: Send + Sync + 'static>(token: &TypedToken<T>) -> DiResult<Vec<Arc<T>>> {
	let request = DepRequest::collection(token.raw());
	match record(&request)? {
		None => Ok(Vec::new()),
		Some(resolver) => match resolver.resolve_dep(&request)? {
			Resolution::Collection(instances) => instances
				.into_iter()
				.map(|instance| downcast(token.raw(), instance))
				.collect(),
			Resolution::Instance(instance) => Ok(vec![downcast(token.raw(), instance)?]),
			Resolution::Missing => Ok(Vec::new()),
		},
	}
}

/// Untyped request. During a scan this hands back a [`Placeholder`] instance
/// so the producer can keep executing, which makes untyped flows fully
/// discoverable.
pub fn inject_ref(token: &Token) -> DiResult<InstanceRef> {
	let request = if token.is_multi() {
		DepRequest::collection(token)
	} else {
		DepRequest::required(token)
	};
	match record(&request)? {
		None => Ok(Arc::new(Placeholder) as InstanceRef),
		Some(resolver) => match resolver.resolve_dep(&request)? {
			Resolution::Instance(instance) => Ok(instance),
			Resolution::Collection(instances) => Ok(Arc::new(instances) as InstanceRef),
			Resolution::Missing => Err(DiError::UnknownToken {
				name: token.name().to_string(),
			}),
		},
	}
}

/// Reports additional dependency requests for a provider.
///
/// Scanners support alternative dependency-declaration styles without the
/// engine knowing about them. They run in registration order after the
/// core's own call recording; a scanner failure is isolated and logged,
/// never aborting the surrounding scan.
pub trait DependencyScanner: Send + Sync {
	fn scan(&self, provider: &Provider) -> anyhow::Result<Vec<DepRequest>>;
}

/// Scanner reporting the dependency metadata declared on the registration
/// itself (see `ProviderSpec::with_deps`). Installed by default in every
/// container, so the declared-deps style is a plugin rather than an engine
/// special case.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredDepsScanner;

impl DependencyScanner for DeclaredDepsScanner {
	fn scan(&self, provider: &Provider) -> anyhow::Result<Vec<DepRequest>> {
		Ok(provider.declared_deps().to_vec())
	}
}

/// Discovers the provider's dependency requests.
///
/// Opens a scan session, runs the producer (its error, if any, is ignored:
/// producers are allowed to fail on placeholder values), then merges the
/// requests reported by each scanner plugin. Returns the merged set in
/// first-seen order, de-duplicated per (token, kind).
pub(crate) fn scan(
	provider: &Provider,
	scanners: &[Arc<dyn DependencyScanner>],
) -> Vec<DepRequest> {
	let guard = push_session(SessionMode::Scan);
	if let Err(error) = provider.producer().call() {
		trace!(token = %provider.token(), %error, "scan probe ended early");
	}
	let mut discovered = SESSIONS.with(|stack| {
		stack
			.borrow_mut()
			.last_mut()
			.map(|session| std::mem::take(&mut session.recorded))
			.unwrap_or_default()
	});
	drop(guard);

	for scanner in scanners {
		match scanner.scan(provider) {
			Ok(reported) => {
				for request in reported {
					if !discovered.iter().any(|seen| *seen == request) {
						discovered.push(request);
					}
				}
			}
			Err(error) => {
				warn!(token = %provider.token(), %error, "dependency scanner failed; ignoring");
			}
		}
	}

	debug!(token = %provider.token(), deps = discovered.len(), "scanned provider");
	discovered
}

/// Runs the producer to completion in a live session bound to `resolver`.
/// The session closes on both normal return and error.
pub(crate) fn instantiate(
	producer: &ProducerFn,
	resolver: Arc<dyn DepResolver>,
) -> DiResult<InstanceRef> {
	let _guard = push_session(SessionMode::Live(resolver));
	producer.call()
}
