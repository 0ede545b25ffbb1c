//! Token identity and multiplicity.
//!
//! A [`Token`] is the lookup key for an injectable slot. Identity is
//! reference-based: every created token carries a process-unique id, and two
//! tokens with the same name are distinct keys. [`TypedToken`] layers a
//! compile-time value type on top for typed resolution.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::provider::{ProducerFn, erased_factory};

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a token resolves to one instance or an ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
	Single,
	Multi,
}

struct TokenData {
	id: u64,
	name: String,
	multiplicity: Multiplicity,
	default_producer: Option<ProducerFn>,
}

/// Opaque identity of an injectable slot.
///
/// Tokens are cheap to clone and immutable. The name is for diagnostics
/// only; equality and hashing use the unique id assigned at creation.
///
/// # Examples
///
/// ```
/// use wirebox::Token;
///
/// let a = Token::single("CONFIG");
/// let b = Token::single("CONFIG");
///
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b);
/// ```
#[derive(Clone)]
pub struct Token {
	data: Arc<TokenData>,
}

impl Token {
	fn create(
		name: String,
		multiplicity: Multiplicity,
		default_producer: Option<ProducerFn>,
	) -> Self {
		Self {
			data: Arc::new(TokenData {
				id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
				name,
				multiplicity,
				default_producer,
			}),
		}
	}

	/// Creates a single-valued token.
	pub fn single(name: impl Into<String>) -> Self {
		Self::create(name.into(), Multiplicity::Single, None)
	}

	/// Creates a multi-valued token. Resolution yields every registered
	/// provider's instance, in registration order.
	pub fn multi(name: impl Into<String>) -> Self {
		Self::create(name.into(), Multiplicity::Multi, None)
	}

	/// Creates a single-valued token with a default producer, used when no
	/// explicit provider is registered for it.
	///
	/// # Examples
	///
	/// ```
	/// use wirebox::Token;
	///
	/// let token = Token::with_default("ANSWER", || Ok(42u32));
	/// assert!(token.has_default());
	/// ```
	pub fn with_default<T, F>(name: impl Into<String>, factory: F) -> Self
	where
		T: Send + Sync + 'static,
		F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
	{
		let name = name.into();
		let producer = erased_factory(name.clone(), factory);
		Self::create(name, Multiplicity::Single, Some(producer))
	}

	/// Human-readable name. Not an identity; see the type-level docs.
	pub fn name(&self) -> &str {
		&self.data.name
	}

	pub fn multiplicity(&self) -> Multiplicity {
		self.data.multiplicity
	}

	pub fn is_multi(&self) -> bool {
		self.data.multiplicity == Multiplicity::Multi
	}

	/// Whether the token carries a default producer.
	pub fn has_default(&self) -> bool {
		self.data.default_producer.is_some()
	}

	pub(crate) fn id(&self) -> u64 {
		self.data.id
	}

	pub(crate) fn default_producer(&self) -> Option<&ProducerFn> {
		self.data.default_producer.as_ref()
	}
}

impl PartialEq for Token {
	fn eq(&self, other: &Self) -> bool {
		self.data.id == other.data.id
	}
}

impl Eq for Token {}

impl Hash for Token {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.data.id.hash(state);
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Token")
			.field("id", &self.data.id)
			.field("name", &self.data.name)
			.field("multiplicity", &self.data.multiplicity)
			.finish()
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.data.name)
	}
}

/// A [`Token`] with a compile-time value type.
///
/// The marker is `fn() -> T` so the token itself stays `Send + Sync`
/// regardless of `T`, and no bounds leak onto derived impls.
///
/// # Examples
///
/// ```
/// use wirebox::TypedToken;
///
/// struct AppConfig {
///     url: String,
/// }
///
/// let token: TypedToken<AppConfig> = TypedToken::new("CONFIG");
/// assert_eq!(token.raw().name(), "CONFIG");
/// ```
pub struct TypedToken<T> {
	raw: Token,
	_marker: PhantomData<fn() -> T>,
}

impl<T> TypedToken<T> {
	/// Creates a single-valued typed token.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			raw: Token::single(name),
			_marker: PhantomData,
		}
	}

	/// Creates a multi-valued typed token.
	pub fn multi(name: impl Into<String>) -> Self {
		Self {
			raw: Token::multi(name),
			_marker: PhantomData,
		}
	}

	/// The untyped token carrying the identity.
	pub fn raw(&self) -> &Token {
		&self.raw
	}
}

impl<T> TypedToken<T>
where
	T: Send + Sync + 'static,
{
	/// Creates a single-valued typed token with a default producer.
	pub fn with_default<F>(name: impl Into<String>, factory: F) -> Self
	where
		F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
	{
		Self {
			raw: Token::with_default(name, factory),
			_marker: PhantomData,
		}
	}
}

impl<T> Clone for TypedToken<T> {
	fn clone(&self) -> Self {
		Self {
			raw: self.raw.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> AsRef<Token> for TypedToken<T> {
	fn as_ref(&self) -> &Token {
		&self.raw
	}
}

impl<T> fmt::Debug for TypedToken<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypedToken")
			.field("raw", &self.raw)
			.finish()
	}
}

/// How strongly a producer requested a dependency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
	/// Absence is an `UnknownToken` error.
	Required,
	/// Absence yields `None`.
	Optional,
	/// Collection request against a multi token; absence yields an empty
	/// collection.
	Collection,
}

/// One dependency edge discovered for a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepRequest {
	token: Token,
	kind: RequestKind,
}

impl DepRequest {
	pub fn required(token: &Token) -> Self {
		Self {
			token: token.clone(),
			kind: RequestKind::Required,
		}
	}

	pub fn optional(token: &Token) -> Self {
		Self {
			token: token.clone(),
			kind: RequestKind::Optional,
		}
	}

	pub fn collection(token: &Token) -> Self {
		Self {
			token: token.clone(),
			kind: RequestKind::Collection,
		}
	}

	pub fn token(&self) -> &Token {
		&self.token
	}

	pub fn kind(&self) -> RequestKind {
		self.kind
	}

	pub fn is_optional(&self) -> bool {
		self.kind == RequestKind::Optional
	}
}
