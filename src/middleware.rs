//! Instantiation middleware pipeline.
//!
//! Every producer call, whether during bootstrap, lazy materialization, or
//! `Injector::produce`, runs through an ordered chain of interceptors.
//! Global middlewares (process-wide registry) run before a container's
//! local ones; a child container's effective chain is its parent's chain
//! followed by its own. The global registry is snapshotted at container
//! creation: containers created afterward see a later registration,
//! pre-existing containers do not.
//!
//! The pipeline itself is side-effect-free plumbing; logging, timing, and
//! wrapping are the interceptor's business.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::DiResult;
use crate::provider::{InstanceRef, ProviderSource};
use crate::token::{DepRequest, Token};

/// Parameters of one instantiation, visible to interceptors.
pub struct FactoryCall<'a> {
	token: &'a Token,
	source: &'a ProviderSource,
	deps: &'a [DepRequest],
}

impl<'a> FactoryCall<'a> {
	pub(crate) fn new(
		token: &'a Token,
		source: &'a ProviderSource,
		deps: &'a [DepRequest],
	) -> Self {
		Self { token, source, deps }
	}

	pub fn token(&self) -> &Token {
		self.token
	}

	pub fn source(&self) -> &ProviderSource {
		self.source
	}

	/// Dependency set discovered for the producer during the scan phase.
	pub fn deps(&self) -> &[DepRequest] {
		self.deps
	}
}

/// Continuation invoking the rest of the chain.
///
/// `run` consumes the continuation, so an interceptor can proceed at most
/// once; dropping it without running short-circuits the chain.
pub struct Next<'a> {
	chain: &'a [Arc<dyn Middleware>],
	call: &'a FactoryCall<'a>,
	terminal: &'a dyn Fn() -> DiResult<InstanceRef>,
}

impl Next<'_> {
	/// Invokes the remaining interceptors, terminating in the actual
	/// producer call.
	pub fn run(self) -> DiResult<InstanceRef> {
		match self.chain.split_first() {
			Some((head, rest)) => head.around(
				self.call,
				Next {
					chain: rest,
					call: self.call,
					terminal: self.terminal,
				},
			),
			None => (self.terminal)(),
		}
	}
}

/// An interceptor wrapped around every instantiation.
///
/// Implementations normally call `next.run()` once and may transform the
/// returned value on the way up. Returning without running `next`
/// short-circuits the chain with a substitute value. Dependency requests
/// are not available here: interceptors run outside the producer's
/// injection session.
pub trait Middleware: Send + Sync {
	fn around(&self, call: &FactoryCall<'_>, next: Next<'_>) -> DiResult<InstanceRef>;
}

static GLOBAL_MIDDLEWARES: Lazy<RwLock<Vec<Arc<dyn Middleware>>>> =
	Lazy::new(|| RwLock::new(Vec::new()));

/// Registers a process-wide middleware. Containers created afterward
/// include it ahead of their local middlewares.
pub fn register_global_middleware(middleware: Arc<dyn Middleware>) {
	GLOBAL_MIDDLEWARES.write().push(middleware);
}

/// Removes every process-wide middleware. Intended for test isolation.
#[doc(hidden)]
pub fn clear_global_middlewares() {
	GLOBAL_MIDDLEWARES.write().clear();
}

pub(crate) fn global_snapshot() -> Vec<Arc<dyn Middleware>> {
	GLOBAL_MIDDLEWARES.read().clone()
}

/// Runs `terminal` through the given chain, first middleware outermost.
pub(crate) fn run_chain<F>(
	chain: &[Arc<dyn Middleware>],
	call: &FactoryCall<'_>,
	terminal: F,
) -> DiResult<InstanceRef>
where
	F: Fn() -> DiResult<InstanceRef>,
{
	Next {
		chain,
		call,
		terminal: &terminal,
	}
	.run()
}
