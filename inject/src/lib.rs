// inject/src/lib.rs

//! # Fibre Inject
//!
//! A metadata-driven dependency injection container for Rust.
//!
//! Classes describe their constructor parameters, injectable properties and
//! lifecycle hook with a [`Declaration`]. The container analyzes declarations
//! into ordered dependency lists, resolves each dependency against its providers
//! (falling back to its parent), caches one instance per token and can wrap
//! resolved trait objects in interception proxies.
//!
//! ## Core Concepts
//!
//! - **Token**: The identity a value is registered under. A Rust type, an
//!   interface marker, or a plain name.
//! - **Provider**: A token paired with a factory. Factories are [`Function`]s,
//!   so their own parameters are injected too.
//! - **Container**: Resolves tokens lazily and caches the results. Child
//!   containers shadow their parent's providers and reuse its cache for
//!   everything else.
//! - **Alterations**: `before`, `after`, `around` and `replace` hooks on the
//!   methods of an [`interceptable!`] trait.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_inject::{provide, Arguments, Container, Declaration, Injectable, Parameter, Result};
//! use std::rc::Rc;
//!
//! struct Config {
//!   url: String,
//! }
//!
//! impl Injectable for Config {
//!   fn construct(_: Arguments) -> Result<Self> {
//!     Ok(Config { url: "postgres://localhost".to_string() })
//!   }
//! }
//!
//! struct Database {
//!   config: Rc<Config>,
//! }
//!
//! impl Injectable for Database {
//!   fn declare(declaration: Declaration) -> Declaration {
//!     declaration.param(Parameter::of::<Config>())
//!   }
//!
//!   fn construct(args: Arguments) -> Result<Self> {
//!     Ok(Database { config: args.get(0)? })
//!   }
//! }
//!
//! let container = Container::new([provide::<Config>(), provide::<Database>()]);
//!
//! let db = container.get::<Database>().unwrap();
//! let config = container.get::<Config>().unwrap();
//!
//! // Both lookups share the single cached `Config`.
//! assert!(Rc::ptr_eq(&db.config, &config));
//! assert_eq!(db.config.url, "postgres://localhost");
//! ```

mod alteration;
mod analyzer;
mod class;
mod container;
mod core;
mod error;
mod function;
mod macros;
mod metadata;
mod options;
mod provider;
mod token;

pub use alteration::{method, Alteration, Interceptable, Method};
pub use analyzer::{Analyzer, Dependency, PropertyDependency};
pub use class::{Class, Injectable, Slot};
pub use container::{Container, ContainerBuilder, WeakContainer};
pub use crate::core::Instance;
pub use error::{Error, Result};
pub use function::{Arguments, Factory, Function};
pub use metadata::{
  Annotation, AnnotationKey, DeclId, Declaration, DeclaredMetadata, LifecycleHook,
  MetadataProvider, Parameter, Property, TypeRef,
};
pub use options::ContainerOptions;
pub use provider::{
  alter, alter_with, construct, construct_class, injector, provide, provide_as, provide_class,
  provide_factory, provide_interface, provide_value, Provider,
};
pub use token::{Marker, Token, TypeKey};
