// inject/src/container.rs

//! The main `Container` struct and its associated methods.

use crate::analyzer::{Analyzer, Dependency};
use crate::class::{Class, Injectable};
use crate::core::{Instance, ResolutionGuard};
use crate::error::{Error, Result};
use crate::function::{Arguments, Factory, Function};
use crate::metadata::{AnnotationKey, Declaration, MetadataProvider};
use crate::options::ContainerOptions;
use crate::provider::{Provider, Target};
use crate::token::Token;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

struct Inner {
  providers: HashMap<Token, Factory>,
  alterations: HashMap<Token, Vec<Factory>>,
  resolved: RefCell<HashMap<Token, Instance>>,
  resolving: RefCell<Vec<Token>>,
  parent: Option<Container>,
  analyzer: Rc<Analyzer>,
  options: ContainerOptions,
}

/// The dependency injection container.
///
/// A container owns a fixed provider table and lazily caches at most one
/// instance per token. Tokens it has no provider for are delegated to its
/// parent, whose cache is reused as-is. The container is single-threaded;
/// cloning it is cheap and yields a handle to the same container.
///
/// A container always provides itself under `Token::of::<Container>()`, and a
/// [`WeakContainer`] under `Token::of::<WeakContainer>()`. The first is a strong
/// handle: an instance that stores it is cached by the container it points to,
/// which forms an `Rc` cycle and keeps the whole container tree alive. Services
/// that keep a handle should inject the weak one.
#[derive(Clone)]
pub struct Container {
  inner: Rc<Inner>,
}

/// A handle that does not keep its container alive.
#[derive(Clone)]
pub struct WeakContainer {
  inner: Weak<Inner>,
}

impl WeakContainer {
  /// Returns the container, or `None` once every strong handle is gone.
  pub fn upgrade(&self) -> Option<Container> {
    self.inner.upgrade().map(|inner| Container { inner })
  }
}

impl fmt::Debug for WeakContainer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeakContainer")
      .field("alive", &(self.inner.strong_count() > 0))
      .finish()
  }
}

impl Container {
  /// Creates a root container with the given providers.
  pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
    Self::builder().providers(providers).build()
  }

  /// Creates a child of `parent` with the given providers.
  pub fn with_parent(providers: impl IntoIterator<Item = Provider>, parent: &Container) -> Self {
    Self::builder().providers(providers).parent(parent).build()
  }

  pub fn builder() -> ContainerBuilder {
    ContainerBuilder::default()
  }

  pub fn parent(&self) -> Option<&Container> {
    self.inner.parent.as_ref()
  }

  pub fn options(&self) -> &ContainerOptions {
    &self.inner.options
  }

  pub fn analyzer(&self) -> &Rc<Analyzer> {
    &self.inner.analyzer
  }

  pub fn downgrade(&self) -> WeakContainer {
    WeakContainer {
      inner: Rc::downgrade(&self.inner),
    }
  }

  /// Returns `true` if both handles refer to the same container.
  pub fn ptr_eq(&self, other: &Container) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  // --- Resolution ---

  /// Resolves `token`, failing with `Error::MissingProvider` if neither this
  /// container nor any ancestor has a provider for it.
  pub fn provide(&self, token: &Token) -> Result<Instance> {
    self
      .lookup(token, None)?
      .ok_or_else(|| Error::MissingProvider(token.to_string()))
  }

  /// Resolves `token`, returning `default` instead of failing when no provider exists.
  ///
  /// `None` plays the part of an explicit "undefined" default.
  pub fn provide_or(&self, token: &Token, default: Option<Instance>) -> Result<Option<Instance>> {
    self.lookup(token, Some(default))
  }

  /// Resolves the value bound to `T`'s own token.
  pub fn get<T: Any>(&self) -> Result<Rc<T>> {
    let token = Token::of::<T>();
    self.provide(&token)?.expect::<T>(&token)
  }

  /// Resolves the trait object bound to an interface token.
  pub fn get_interface<I: ?Sized + Any>(&self, token: &Token) -> Result<Rc<I>> {
    self.provide(token)?.expect_shared::<I>(token)
  }

  /// Builds a new `T`, bypassing the cache for `T` itself.
  pub fn construct<T: Injectable>(&self) -> Result<Rc<T>> {
    let class = Class::of::<T>();
    self.construct_class(&class)?.expect::<T>(class.token())
  }

  /// Builds a new instance of `class` and prepares it.
  pub fn construct_class(&self, class: &Class) -> Result<Instance> {
    let instance = self.build(class)?;
    self.prepare(class.token(), instance)
  }

  /// Calls `function` bound to `context`, resolving its parameters in order.
  pub fn invoke<C: ?Sized + 'static, R: 'static>(
    &self,
    context: &C,
    function: &Function<C, R>,
  ) -> Result<R> {
    let arguments = self.arguments(function.declaration())?;
    function.call(context, arguments)
  }

  /// Creates a child container with `providers`, sharing this container's
  /// analyzer and options.
  pub fn derive(&self, providers: impl IntoIterator<Item = Provider>) -> Container {
    Container::with_parent(providers, self)
  }

  /// Injects properties, runs the lifecycle hook and applies the alterations
  /// registered for `token`.
  ///
  /// Property injection and the lifecycle hook happen once per instance; later
  /// calls only apply alterations.
  pub fn prepare(&self, token: &Token, instance: Instance) -> Result<Instance> {
    if let Some(declaration) = instance.declaration().cloned() {
      if instance.mark_prepared() {
        for property in self.inner.analyzer.analyze_properties(&declaration)?.iter() {
          let value = self.resolve(&property.dependency)?;
          property.property.assign(instance.as_any(), value)?;
        }

        if let Some(hook) = declaration.lifecycle() {
          tracing::debug!(class = %declaration.name(), "running on_injection_completed");
          self.invoke(instance.as_any(), hook)?;
        }
      }
    }

    self.apply_alterations(token, instance)
  }

  // --- PRIVATE HELPERS ---

  /// Constructs `class` without preparing the result.
  pub(crate) fn build(&self, class: &Class) -> Result<Instance> {
    let declaration = class.declaration();

    if self.inner.options.require_injectable
      && self
        .inner
        .analyzer
        .metadata()
        .annotation(declaration, AnnotationKey::Injectable, None)
        .is_none()
    {
      return Err(Error::Construction {
        target: class.name().to_string(),
        reason: "class is not marked injectable".to_string(),
      });
    }

    let constructor = class.constructor().ok_or_else(|| Error::Construction {
      target: class.name().to_string(),
      reason: "value is not a constructor".to_string(),
    })?;

    let arguments = self.arguments(declaration)?;
    tracing::debug!(class = %class.name(), "constructing");
    Ok(constructor(arguments)?.with_declaration(Rc::clone(declaration)))
  }

  fn arguments(&self, declaration: &Declaration) -> Result<Arguments> {
    let values = self
      .inner
      .analyzer
      .analyze(declaration)?
      .iter()
      .map(|dependency| self.resolve(dependency))
      .collect::<Result<Vec<_>>>()?;
    Ok(Arguments::new(declaration.name_cow(), values))
  }

  /// Tries each candidate token in order, then the default, then the optional escape.
  fn resolve(&self, dependency: &Dependency) -> Result<Option<Instance>> {
    for token in &dependency.tokens {
      if let Some(value) = self.provide_or(token, None)? {
        return Ok(Some(value));
      }
    }

    if let Some(default) = &dependency.default {
      return self.invoke(&(), default).map(Some);
    }

    if dependency.optional {
      return Ok(None);
    }

    Err(Error::MissingProvider(Token::describe(&dependency.tokens)))
  }

  /// `default` is `None` when the caller gave no default at all, and
  /// `Some(None)` when it explicitly asked for nothing instead of an error.
  fn lookup(&self, token: &Token, default: Option<Option<Instance>>) -> Result<Option<Instance>> {
    if *token == Token::of::<Container>() {
      return Ok(Some(Instance::new(self.clone())));
    }
    if *token == Token::of::<WeakContainer>() {
      return Ok(Some(Instance::new(self.downgrade())));
    }

    let cached = self.inner.resolved.borrow().get(token).cloned();
    if let Some(instance) = cached {
      tracing::trace!(token = %token, "resolved from cache");
      return Ok(Some(instance));
    }

    let Some(factory) = self.inner.providers.get(token) else {
      if let Some(parent) = &self.inner.parent {
        tracing::trace!(token = %token, "delegating to parent");
        return parent.lookup(token, default);
      }
      return match default {
        Some(default) => Ok(default),
        None => Err(Error::MissingProvider(token.to_string())),
      };
    };

    let _guard = if self.inner.options.detect_cycles {
      Some(ResolutionGuard::enter(&self.inner.resolving, token)?)
    } else {
      None
    };

    tracing::debug!(token = %token, "resolving provider");
    let instance = self.invoke(&(), factory)?;
    let instance = self.prepare(token, instance)?;
    self
      .inner
      .resolved
      .borrow_mut()
      .insert(token.clone(), instance.clone());
    Ok(Some(instance))
  }

  fn apply_alterations(&self, token: &Token, instance: Instance) -> Result<Instance> {
    let Some(alterations) = self.inner.alterations.get(token) else {
      return Ok(instance);
    };

    alterations.iter().try_fold(instance, |current, alteration| {
      tracing::debug!(token = %token, alteration = ?alteration, "applying alteration");
      self
        .derive([Provider::new(token.clone(), Function::value(current))])
        .invoke(&(), alteration)
    })
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("providers", &self.inner.providers.len())
      .field("alterations", &self.inner.alterations.len())
      .field("resolved", &self.inner.resolved.borrow().len())
      .field("has_parent", &self.inner.parent.is_some())
      .finish()
  }
}

/// Configures and builds a [`Container`].
#[derive(Default)]
pub struct ContainerBuilder {
  providers: Vec<Provider>,
  parent: Option<Container>,
  analyzer: Option<Rc<Analyzer>>,
  options: Option<ContainerOptions>,
}

impl ContainerBuilder {
  pub fn provider(mut self, provider: Provider) -> Self {
    self.providers.push(provider);
    self
  }

  pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
    self.providers.extend(providers);
    self
  }

  pub fn parent(mut self, parent: &Container) -> Self {
    self.parent = Some(parent.clone());
    self
  }

  /// Shares an existing analyzer (and its memoized analyses).
  pub fn analyzer(mut self, analyzer: Rc<Analyzer>) -> Self {
    self.analyzer = Some(analyzer);
    self
  }

  /// Uses a fresh analyzer reading from `metadata`.
  pub fn metadata(self, metadata: impl MetadataProvider + 'static) -> Self {
    self.analyzer(Rc::new(Analyzer::new(metadata)))
  }

  pub fn options(mut self, options: ContainerOptions) -> Self {
    self.options = Some(options);
    self
  }

  pub fn build(self) -> Container {
    let parent = self.parent;
    let analyzer = self
      .analyzer
      .or_else(|| parent.as_ref().map(|p| Rc::clone(&p.inner.analyzer)))
      .unwrap_or_default();
    let options = self
      .options
      .or_else(|| parent.as_ref().map(|p| p.inner.options.clone()))
      .unwrap_or_default();

    let mut providers = HashMap::new();
    let mut alterations: HashMap<Token, Vec<Factory>> = HashMap::new();
    for provider in self.providers {
      match provider.into_parts() {
        // Later entries for the same token overwrite earlier ones.
        (Target::Bind(token), factory) => {
          providers.insert(token, factory);
        }
        (Target::Alter(token), factory) => alterations.entry(token).or_default().push(factory),
      }
    }

    Container {
      inner: Rc::new(Inner {
        providers,
        alterations,
        resolved: RefCell::new(HashMap::new()),
        resolving: RefCell::new(Vec::new()),
        parent,
        analyzer,
        options,
      }),
    }
  }
}
