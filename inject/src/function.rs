// inject/src/function.rs

//! Injectable callables and the arguments resolved for them.

use crate::core::Instance;
use crate::error::{Error, Result};
use crate::metadata::{Declaration, Parameter};
use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// A callable whose parameters are resolved by a container.
///
/// `C` is the context the function is bound to when invoked (the receiver of a
/// method, `()` for free functions) and `R` is what it returns. Clones share the
/// same declaration, so analysis of a function happens once no matter how many
/// times it is cloned or invoked.
pub struct Function<C: ?Sized = (), R = Instance> {
  declaration: Rc<Declaration>,
  body: Rc<dyn Fn(&C, Arguments) -> Result<R>>,
}

/// A function producing the value bound to a token.
pub type Factory = Function<(), Instance>;

impl<C: ?Sized, R> Clone for Function<C, R> {
  fn clone(&self) -> Self {
    Self {
      declaration: Rc::clone(&self.declaration),
      body: Rc::clone(&self.body),
    }
  }
}

impl<C: ?Sized + 'static, R: 'static> Function<C, R> {
  pub fn new(
    name: impl Into<Cow<'static, str>>,
    parameters: impl IntoIterator<Item = Parameter>,
    body: impl Fn(&C, Arguments) -> Result<R> + 'static,
  ) -> Self {
    Self::from_declaration(Declaration::function(name).params(parameters), body)
  }

  pub fn from_declaration(
    declaration: Declaration,
    body: impl Fn(&C, Arguments) -> Result<R> + 'static,
  ) -> Self {
    Self {
      declaration: Rc::new(declaration),
      body: Rc::new(body),
    }
  }

  pub fn declaration(&self) -> &Rc<Declaration> {
    &self.declaration
  }

  pub(crate) fn call(&self, context: &C, arguments: Arguments) -> Result<R> {
    (self.body)(context, arguments)
  }
}

impl<R: 'static> Function<(), R> {
  /// A free-standing function, not bound to any context.
  pub fn of(
    name: impl Into<Cow<'static, str>>,
    parameters: impl IntoIterator<Item = Parameter>,
    body: impl Fn(Arguments) -> Result<R> + 'static,
  ) -> Self {
    Self::new(name, parameters, move |_: &(), arguments| body(arguments))
  }
}

impl Function<(), Instance> {
  /// A factory that always returns `value`.
  pub fn value(value: Instance) -> Self {
    Self::of(format!("value of {}", value.type_name()), [], move |_| {
      Ok(value.clone())
    })
  }
}

impl<C: ?Sized, R> fmt::Debug for Function<C, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Function({})", self.declaration.name())
  }
}

/// Values resolved for a declaration's parameters, in declaration order.
///
/// A slot is empty when its parameter was optional and nothing resolved.
pub struct Arguments {
  owner: Cow<'static, str>,
  values: Vec<Option<Instance>>,
}

impl Arguments {
  pub(crate) fn new(owner: Cow<'static, str>, values: Vec<Option<Instance>>) -> Self {
    Self { owner, values }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn instance(&self, index: usize) -> Option<&Instance> {
    self.values.get(index)?.as_ref()
  }

  pub fn get<T: Any>(&self, index: usize) -> Result<Rc<T>> {
    self
      .optional::<T>(index)?
      .ok_or_else(|| self.missing(index))
  }

  pub fn optional<T: Any>(&self, index: usize) -> Result<Option<Rc<T>>> {
    self
      .instance(index)
      .map(|value| {
        value
          .downcast::<T>()
          .ok_or_else(|| self.mismatch(index, type_name::<T>()))
      })
      .transpose()
  }

  pub fn shared<I: ?Sized + Any>(&self, index: usize) -> Result<Rc<I>> {
    self
      .optional_shared::<I>(index)?
      .ok_or_else(|| self.missing(index))
  }

  pub fn optional_shared<I: ?Sized + Any>(&self, index: usize) -> Result<Option<Rc<I>>> {
    self
      .instance(index)
      .map(|value| {
        value
          .downcast_shared::<I>()
          .ok_or_else(|| self.mismatch(index, type_name::<I>()))
      })
      .transpose()
  }

  fn missing(&self, index: usize) -> Error {
    Error::MissingProvider(format!("argument #{} of {}", index, self.owner))
  }

  fn mismatch(&self, index: usize, expected: &'static str) -> Error {
    Error::TypeMismatch {
      token: format!("argument #{} of {}", index, self.owner),
      expected,
    }
  }
}
