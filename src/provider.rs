//! Provider registration and normalization.
//!
//! A registration can arrive in several shapes: a precomputed value, a
//! factory closure, a class (a type implementing [`Construct`]), or an alias
//! redirecting to another token. [`ProviderSpec::normalize`] converts any
//! accepted shape into a uniform [`Provider`] holding the owning token and a
//! zero-argument producer, without invoking the producer.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::context;
use crate::error::{DiError, DiResult};
use crate::token::{DepRequest, Token};

/// Shared, type-erased instance handle.
pub type InstanceRef = Arc<dyn Any + Send + Sync>;

/// Stand-in instance handed out for untyped requests during a scan.
///
/// Producers probing their dependencies receive this instead of a real
/// value; downcasting it to any concrete type fails, which is how a
/// scan-mode execution path typically ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

/// Zero-argument producer in engine form.
///
/// Runs inside an injection context session, so dependency requests made
/// through the `inject*` primitives are observable and resolvable.
#[derive(Clone)]
pub struct ProducerFn(Arc<dyn Fn() -> DiResult<InstanceRef> + Send + Sync>);

impl ProducerFn {
	pub fn new<F>(f: F) -> Self
	where
		F: Fn() -> DiResult<InstanceRef> + Send + Sync + 'static,
	{
		Self(Arc::new(f))
	}

	pub fn call(&self) -> DiResult<InstanceRef> {
		(self.0)()
	}
}

impl fmt::Debug for ProducerFn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ProducerFn")
	}
}

/// Maps a producer failure into `DiError`, letting engine errors raised
/// inside the producer (cycles, unknown tokens, scan placeholders) pass
/// through unchanged instead of being double-wrapped.
pub(crate) fn wrap_producer_err(owner: &str, error: anyhow::Error) -> DiError {
	match error.downcast::<DiError>() {
		Ok(engine) => engine,
		Err(other) => DiError::Producer {
			token: owner.to_string(),
			source: other,
		},
	}
}

/// Type-erases a typed fallible factory into a [`ProducerFn`].
pub(crate) fn erased_factory<T, F>(owner: String, factory: F) -> ProducerFn
where
	T: Send + Sync + 'static,
	F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
{
	ProducerFn::new(move || {
		factory()
			.map(|value| Arc::new(value) as InstanceRef)
			.map_err(|error| wrap_producer_err(&owner, error))
	})
}

/// Constructor contract for class providers.
///
/// `construct` runs inside an injection context; dependency requests are
/// made through the `inject*` primitives rather than constructor arguments,
/// which is what makes them observable during the scan phase.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirebox::{Construct, TypedToken, inject};
/// use once_cell::sync::Lazy;
///
/// struct AppConfig {
///     url: String,
/// }
///
/// static CONFIG: Lazy<TypedToken<AppConfig>> = Lazy::new(|| TypedToken::new("CONFIG"));
///
/// struct Logger {
///     config: Arc<AppConfig>,
/// }
///
/// impl Construct for Logger {
///     fn construct() -> anyhow::Result<Self> {
///         Ok(Self { config: inject(&CONFIG)? })
///     }
/// }
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
	fn construct() -> anyhow::Result<Self>;
}

static CLASS_TOKENS: Lazy<RwLock<HashMap<TypeId, Token>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Implicit per-type token for class registrations.
///
/// The first call for a type creates the token (named after the type) and
/// records it in a process-wide registry; later calls return the same token.
/// This is the explicit counterpart of attaching injection markers to a
/// class at load time.
pub fn class_token<T: Construct>() -> Token {
	let type_id = TypeId::of::<T>();
	if let Some(token) = CLASS_TOKENS.read().get(&type_id) {
		return token.clone();
	}
	let mut tokens = CLASS_TOKENS.write();
	tokens
		.entry(type_id)
		.or_insert_with(|| Token::single(type_name::<T>()))
		.clone()
}

fn class_producer<T: Construct>() -> ProducerFn {
	ProducerFn::new(|| {
		T::construct()
			.map(|value| Arc::new(value) as InstanceRef)
			.map_err(|error| wrap_producer_err(type_name::<T>(), error))
	})
}

/// Which shape a registration was normalized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
	Value,
	Factory,
	Class(&'static str),
	Alias(Token),
	/// Engine-materialized node for a token's default producer.
	Default,
}

/// Builder for a single registration.
///
/// Exactly one producer slot must be set before [`normalize`] is called;
/// zero or more than one is an [`InvalidProvider`] error.
///
/// [`normalize`]: ProviderSpec::normalize
/// [`InvalidProvider`]: DiError::InvalidProvider
///
/// # Examples
///
/// ```
/// use wirebox::{DiError, ProviderSpec, Token};
///
/// let token = Token::single("CONFIG");
/// let error = ProviderSpec::new(&token).normalize().unwrap_err();
/// assert!(matches!(error, DiError::InvalidProvider(_)));
/// ```
pub struct ProviderSpec {
	token: Token,
	value: Option<InstanceRef>,
	factory: Option<ProducerFn>,
	class: Option<(&'static str, ProducerFn)>,
	alias: Option<Token>,
	declared: Vec<DepRequest>,
}

impl ProviderSpec {
	pub fn new(token: &Token) -> Self {
		Self {
			token: token.clone(),
			value: None,
			factory: None,
			class: None,
			alias: None,
			declared: Vec::new(),
		}
	}

	/// Shorthand for a bare class registration keyed by its implicit
	/// per-type token.
	pub fn of_class<T: Construct>() -> Self {
		Self::new(&class_token::<T>()).class::<T>()
	}

	/// Precomputed value, wrapped as a producer that hands out the shared
	/// instance.
	pub fn value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
		self.value = Some(Arc::new(value));
		self
	}

	/// Like [`value`](Self::value), for an already-wrapped `Arc`.
	pub fn value_arc<T: Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
		self.value = Some(value);
		self
	}

	/// Factory closure, invoked within the injection context so its
	/// dependency requests are observable.
	pub fn factory<T, F>(mut self, factory: F) -> Self
	where
		T: Send + Sync + 'static,
		F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
	{
		self.factory = Some(erased_factory(self.token.name().to_string(), factory));
		self
	}

	/// Class provider: instantiates `T` through its [`Construct`] impl.
	pub fn class<T: Construct>(mut self) -> Self {
		self.class = Some((type_name::<T>(), class_producer::<T>()));
		self
	}

	/// Alias: resolving this token resolves `target` instead. Forms an edge
	/// and shares the target's instance, never a separate one.
	pub fn alias(mut self, target: &Token) -> Self {
		self.alias = Some(target.clone());
		self
	}

	/// Attaches declared dependency metadata, reported during the scan
	/// phase by [`DeclaredDepsScanner`](crate::context::DeclaredDepsScanner).
	pub fn with_deps(mut self, deps: impl IntoIterator<Item = DepRequest>) -> Self {
		self.declared.extend(deps);
		self
	}

	/// Converts the registration into a uniform [`Provider`].
	///
	/// Fails with [`DiError::InvalidProvider`] when zero or more than one
	/// producer slot is set, when a token aliases itself, or when an alias
	/// targets a multi token. Never invokes the producer.
	pub fn normalize(self) -> DiResult<Provider> {
		let Self {
			token,
			value,
			factory,
			class,
			alias,
			mut declared,
		} = self;

		let slots = usize::from(value.is_some())
			+ usize::from(factory.is_some())
			+ usize::from(class.is_some())
			+ usize::from(alias.is_some());
		if slots == 0 {
			return Err(DiError::InvalidProvider(format!(
				"registration for token `{}` has no producer variant (value, factory, class, or alias)",
				token.name()
			)));
		}
		if slots > 1 {
			return Err(DiError::InvalidProvider(format!(
				"registration for token `{}` sets more than one producer variant",
				token.name()
			)));
		}

		let (source, producer) = if let Some(value) = value {
			(ProviderSource::Value, ProducerFn::new(move || Ok(value.clone())))
		} else if let Some(producer) = factory {
			(ProviderSource::Factory, producer)
		} else if let Some((name, producer)) = class {
			(ProviderSource::Class(name), producer)
		} else {
			let Some(target) = alias else {
				return Err(DiError::InvalidProvider(format!(
					"registration for token `{}` has no producer variant (value, factory, class, or alias)",
					token.name()
				)));
			};
			if target == token {
				return Err(DiError::InvalidProvider(format!(
					"token `{}` cannot alias itself",
					token.name()
				)));
			}
			if target.is_multi() {
				return Err(DiError::InvalidProvider(format!(
					"token `{}` aliases multi token `{}`; alias targets must be single-valued",
					token.name(),
					target.name()
				)));
			}
			declared.push(DepRequest::required(&target));
			let redirect = target.clone();
			(
				ProviderSource::Alias(target),
				ProducerFn::new(move || context::inject_ref(&redirect)),
			)
		};

		Ok(Provider {
			token,
			source,
			producer,
			declared,
		})
	}
}

/// Normalized registration: owning token plus a uniform producer.
#[derive(Clone)]
pub struct Provider {
	token: Token,
	source: ProviderSource,
	producer: ProducerFn,
	declared: Vec<DepRequest>,
}

impl Provider {
	pub(crate) fn from_default(token: Token, producer: ProducerFn) -> Self {
		Self {
			token,
			source: ProviderSource::Default,
			producer,
			declared: Vec::new(),
		}
	}

	pub fn token(&self) -> &Token {
		&self.token
	}

	pub fn source(&self) -> &ProviderSource {
		&self.source
	}

	pub fn producer(&self) -> &ProducerFn {
		&self.producer
	}

	/// Dependency metadata declared at registration time, as opposed to
	/// discovered by scanning.
	pub fn declared_deps(&self) -> &[DepRequest] {
		&self.declared
	}
}

impl fmt::Debug for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provider")
			.field("token", &self.token)
			.field("source", &self.source)
			.field("declared", &self.declared)
			.finish()
	}
}
