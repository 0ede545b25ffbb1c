//! # Wirebox
//!
//! Token-based dependency injection runtime with automatic dependency
//! discovery.
//!
//! ## Features
//!
//! - **Tokens**: Reference-identity keys with single or multi binding,
//!   optional default producers, and a typed wrapper over the untyped core
//! - **Providers**: Value, factory, class, and alias registrations
//!   normalized into one producer form
//! - **Discovery**: Dependencies observed by running producers in a probe
//!   session, merged with declared edges and pluggable scanners
//! - **Bootstrap**: Eager, dependency-ordered instantiation with cycle
//!   detection, plus a lazy variant that defers producers to first request
//! - **Middleware**: Interceptors around every instantiation, process-wide
//!   and per-container, inherited down container hierarchies
//! - **Diagnostics**: A bootstrap report with node totals and unused-node
//!   names, delivered to registered reporters
//!
//! ## Example
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use wirebox::{inject, Container, ProviderSpec, TypedToken};
//!
//! static CONFIG: Lazy<TypedToken<Config>> = Lazy::new(|| TypedToken::new("CONFIG"));
//! static LOGGER: Lazy<TypedToken<Logger>> = Lazy::new(|| TypedToken::new("LOGGER"));
//!
//! struct Config {
//!     level: String,
//! }
//!
//! struct Logger {
//!     prefix: String,
//! }
//!
//! let container = Container::new();
//! container.provide([
//!     ProviderSpec::new(CONFIG.raw()).value(Config { level: "info".into() }),
//!     ProviderSpec::new(LOGGER.raw()).factory(|| {
//!         let config = inject(&CONFIG)?;
//!         Ok(Logger { prefix: format!("[{}]", config.level) })
//!     }),
//! ])?;
//! let report = container.bootstrap()?;
//!
//! assert_eq!(report.total_nodes, 2);
//! assert_eq!(container.get(&LOGGER)?.prefix, "[info]");
//! # Ok::<(), wirebox::DiError>(())
//! ```
//!
//! ## Development Tools (dev-tools feature)
//!
//! With the `dev-tools` feature enabled, [`visualization`] exports a
//! container's graph in DOT format for Graphviz and offers a standalone
//! cycle scan.

pub mod container;
pub mod context;
pub mod cycle;
pub mod error;
pub mod injector;
pub mod middleware;
pub mod provider;
pub mod report;
pub mod token;

#[cfg(feature = "dev-tools")]
pub mod visualization;

pub use container::Container;
pub use context::{
	inject, inject_all, inject_optional, inject_ref, DeclaredDepsScanner, DependencyScanner,
};
pub use cycle::MAX_RESOLUTION_DEPTH;
pub use error::{DiError, DiResult};
pub use injector::{injector_token, Injector};
pub use middleware::{register_global_middleware, FactoryCall, Middleware, Next};
pub use provider::{
	class_token, Construct, InstanceRef, Placeholder, ProducerFn, Provider, ProviderSpec,
	ProviderSource,
};
pub use report::{BootstrapReport, JsonReporter, Reporter};
pub use token::{DepRequest, Multiplicity, RequestKind, Token, TypedToken};

pub mod prelude {
	pub use crate::{
		inject, inject_all, inject_optional, inject_ref, injector_token, Construct, Container,
		DiError, DiResult, Injector, Middleware, ProviderSpec, Reporter, Token, TypedToken,
	};
}
