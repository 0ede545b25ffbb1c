//! Runtime lookup capability.
//!
//! Every bootstrap inserts an [`Injector`] node under a well-known token, so
//! a producer can declare the injector as an ordinary dependency and keep a
//! handle for resolution after its own construction finished. Lookups
//! through the handle mark the target node as used, same as direct container
//! access. `produce*` builds throwaway instances through the full pipeline
//! (scan, dependency resolution, middlewares) without registering a node or
//! caching the result.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::container::{Container, WeakContainer};
use crate::context;
use crate::error::{DiError, DiResult};
use crate::provider::{Construct, InstanceRef, ProviderSpec};
use crate::token::{Token, TypedToken};

static INJECTOR: Lazy<TypedToken<Injector>> = Lazy::new(|| TypedToken::new("Injector"));

/// Token under which every container exposes its own injector.
pub fn injector_token() -> &'static TypedToken<Injector> {
	&INJECTOR
}

/// Handle for resolving against the container it was issued by.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use once_cell::sync::Lazy;
/// use wirebox::{injector_token, Container, Injector, ProviderSpec, TypedToken};
///
/// static GREETING: Lazy<TypedToken<String>> = Lazy::new(|| TypedToken::new("GREETING"));
/// static LATE: Lazy<TypedToken<Late>> = Lazy::new(|| TypedToken::new("LATE"));
///
/// struct Late {
///     injector: Arc<Injector>,
/// }
///
/// let container = Container::new();
/// container.register(ProviderSpec::new(GREETING.raw()).value("hi".to_string()))?;
/// container.register(ProviderSpec::new(LATE.raw()).factory(|| {
///     Ok(Late { injector: wirebox::inject(injector_token())? })
/// }))?;
/// container.bootstrap()?;
///
/// let late = container.get(&LATE)?;
/// assert_eq!(*late.injector.get(&GREETING)?, "hi");
/// # Ok::<(), wirebox::DiError>(())
/// ```
#[derive(Clone)]
pub struct Injector {
	container: WeakContainer,
}

impl Injector {
	pub(crate) fn new(container: WeakContainer) -> Self {
		Self { container }
	}

	fn container(&self) -> DiResult<Container> {
		// A handle that outlives its container has nothing to resolve from.
		self.container.upgrade().ok_or(DiError::NotBootstrapped)
	}

	/// Resolves a single token, marking it as used.
	pub fn get<T: Send + Sync + 'static>(&self, token: &TypedToken<T>) -> DiResult<Arc<T>> {
		self.container()?.get(token)
	}

	/// Resolves every instance behind a multi token.
	pub fn get_all<T: Send + Sync + 'static>(
		&self,
		token: &TypedToken<T>,
	) -> DiResult<Vec<Arc<T>>> {
		self.container()?.get_all(token)
	}

	/// Untyped resolution by raw token.
	pub fn get_ref(&self, token: &Token) -> DiResult<InstanceRef> {
		self.container()?.get_ref(token)
	}

	/// Builds a fresh `T` through the full instantiation pipeline without
	/// registering it. Two calls yield two distinct instances.
	pub fn produce<T: Construct>(&self) -> DiResult<Arc<T>> {
		let provider = ProviderSpec::of_class::<T>().normalize()?;
		let instance = self.container()?.produce_uncached(&provider)?;
		context::downcast(provider.token(), instance)
	}

	/// Like [`produce`](Self::produce), for an ad-hoc factory closure.
	pub fn produce_with<T, F>(&self, factory: F) -> DiResult<Arc<T>>
	where
		T: Send + Sync + 'static,
		F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
	{
		let token = Token::single(type_name::<T>());
		let provider = ProviderSpec::new(&token).factory(factory).normalize()?;
		let instance = self.container()?.produce_uncached(&provider)?;
		context::downcast(provider.token(), instance)
	}
}

impl fmt::Debug for Injector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Injector")
	}
}
