// inject/src/token.rs

//! Lookup keys for providers and resolved instances.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The identity a dependency is registered and resolved under.
///
/// There are three flavours:
///
/// - **Type tokens** (`Token::of::<T>()`) compare by `TypeId`. Every generic
///   instantiation is its own token, and asking for the same instantiation twice
///   always yields an equal token.
/// - **Interface tokens** (`Token::interface("Greeter")`) compare by reference.
///   Two markers created separately are never equal, even with the same name, so
///   a marker has to be shared between registration and resolution. A
///   `once_cell::sync::Lazy<Token>` static is the usual home for one.
/// - **Named tokens** (`Token::named("db_url")`) compare by value.
#[derive(Clone)]
pub enum Token {
  Type(TypeKey),
  Interface(Marker),
  Named(Cow<'static, str>),
}

impl Token {
  pub fn of<T: ?Sized + Any>() -> Self {
    Token::Type(TypeKey::of::<T>())
  }

  pub fn interface(name: impl Into<Cow<'static, str>>) -> Self {
    Token::Interface(Marker::new(name))
  }

  pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
    Token::Named(name.into())
  }

  /// Human readable name, used in error messages and logs.
  pub fn name(&self) -> &str {
    match self {
      Token::Type(key) => key.name,
      Token::Interface(marker) => &marker.inner.name,
      Token::Named(name) => name,
    }
  }

  pub(crate) fn describe(tokens: &[Token]) -> String {
    tokens
      .iter()
      .map(Token::name)
      .collect::<Vec<_>>()
      .join(" | ")
  }
}

impl PartialEq for Token {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Token::Type(a), Token::Type(b)) => a == b,
      (Token::Interface(a), Token::Interface(b)) => a == b,
      (Token::Named(a), Token::Named(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Token {}

impl Hash for Token {
  fn hash<H: Hasher>(&self, state: &mut H) {
    std::mem::discriminant(self).hash(state);
    match self {
      Token::Type(key) => key.hash(state),
      Token::Interface(marker) => marker.hash(state),
      Token::Named(name) => name.hash(state),
    }
  }
}

impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Token::Type(key) => write!(f, "Token::Type({})", key.name),
      Token::Interface(marker) => write!(
        f,
        "Token::Interface({} @ {:p})",
        marker.inner.name,
        Arc::as_ptr(&marker.inner)
      ),
      Token::Named(name) => write!(f, "Token::Named({})", name),
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A `TypeId` paired with the type's name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
  id: TypeId,
  name: &'static str,
}

impl TypeKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

struct MarkerInner {
  name: Cow<'static, str>,
}

/// An identity-compared marker standing in for an interface.
#[derive(Clone)]
pub struct Marker {
  inner: Arc<MarkerInner>,
}

impl Marker {
  fn new(name: impl Into<Cow<'static, str>>) -> Self {
    Self {
      inner: Arc::new(MarkerInner { name: name.into() }),
    }
  }
}

impl PartialEq for Marker {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl Eq for Marker {}

impl Hash for Marker {
  fn hash<H: Hasher>(&self, state: &mut H) {
    (Arc::as_ptr(&self.inner) as usize).hash(state);
  }
}
