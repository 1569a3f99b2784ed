// inject/src/class.rs

//! Constructible types.

use crate::core::Instance;
use crate::error::Result;
use crate::function::Arguments;
use crate::metadata::Declaration;
use crate::token::Token;
use once_cell::unsync::OnceCell;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A type the container knows how to build.
///
/// `declare` describes the constructor parameters (in the order `construct`
/// reads them), the injectable properties and the lifecycle hook.
///
/// ```
/// use fibre_inject::{Arguments, Declaration, Injectable, Parameter, Result};
/// use std::rc::Rc;
///
/// struct Database;
///
/// impl Injectable for Database {
///   fn construct(_: Arguments) -> Result<Self> {
///     Ok(Database)
///   }
/// }
///
/// struct UserService {
///   db: Rc<Database>,
/// }
///
/// impl Injectable for UserService {
///   fn declare(declaration: Declaration) -> Declaration {
///     declaration.param(Parameter::of::<Database>())
///   }
///
///   fn construct(args: Arguments) -> Result<Self> {
///     Ok(UserService { db: args.get(0)? })
///   }
/// }
/// ```
pub trait Injectable: Any + Sized {
  fn declare(declaration: Declaration) -> Declaration {
    declaration
  }

  fn construct(arguments: Arguments) -> Result<Self>;
}

type Constructor = Rc<dyn Fn(Arguments) -> Result<Instance>>;

/// A declaration paired with the constructor that builds it, if it has one.
#[derive(Clone)]
pub struct Class {
  token: Token,
  declaration: Rc<Declaration>,
  constructor: Option<Constructor>,
}

impl Class {
  pub fn of<T: Injectable>() -> Self {
    Self::new(T::declare(Declaration::of_type::<T>()), |arguments| {
      T::construct(arguments).map(Instance::new)
    })
  }

  pub fn new(
    declaration: Declaration,
    constructor: impl Fn(Arguments) -> Result<Instance> + 'static,
  ) -> Self {
    Self {
      constructor: Some(Rc::new(constructor)),
      ..Self::declared(declaration)
    }
  }

  /// A class known only by its declaration. Constructing it fails.
  pub fn declared(declaration: Declaration) -> Self {
    let token = declaration
      .token()
      .cloned()
      .unwrap_or_else(|| Token::named(declaration.name_cow()));
    Self {
      token,
      declaration: Rc::new(declaration),
      constructor: None,
    }
  }

  pub fn token(&self) -> &Token {
    &self.token
  }

  pub fn name(&self) -> &str {
    self.declaration.name()
  }

  pub fn declaration(&self) -> &Rc<Declaration> {
    &self.declaration
  }

  pub(crate) fn constructor(&self) -> Option<&Constructor> {
    self.constructor.as_ref()
  }
}

impl fmt::Debug for Class {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Class")
      .field("token", &self.token)
      .field("constructible", &self.constructor.is_some())
      .finish()
  }
}

/// Storage for an injected property, written once by the container.
pub struct Slot<T: ?Sized>(OnceCell<Rc<T>>);

impl<T: ?Sized> Slot<T> {
  pub fn new() -> Self {
    Self(OnceCell::new())
  }

  pub fn get(&self) -> Option<Rc<T>> {
    self.0.get().cloned()
  }

  pub fn is_filled(&self) -> bool {
    self.0.get().is_some()
  }

  pub(crate) fn fill(&self, value: Rc<T>) {
    // First write wins; a re-prepared instance keeps its original value.
    let _ = self.0.set(value);
  }
}

impl<T: ?Sized> Default for Slot<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Slot(filled: {})", self.is_filled())
  }
}
