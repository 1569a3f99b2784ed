// inject/src/provider.rs

//! Provider entries and the functions that create them.

use crate::alteration::{Alteration, Interceptable};
use crate::class::{Class, Injectable};
use crate::container::Container;
use crate::core::Instance;
use crate::function::{Factory, Function};
use crate::metadata::Parameter;
use crate::token::Token;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub(crate) enum Target {
  Bind(Token),
  Alter(Token),
}

/// A token paired with the factory that produces its value.
///
/// Alteration entries travel in the same provider list; the container sets them
/// apart when it is built.
#[derive(Clone)]
pub struct Provider {
  target: Target,
  factory: Factory,
}

impl Provider {
  pub fn new(token: Token, factory: Factory) -> Self {
    Self {
      target: Target::Bind(token),
      factory,
    }
  }

  pub fn token(&self) -> &Token {
    match &self.target {
      Target::Bind(token) | Target::Alter(token) => token,
    }
  }

  pub fn is_alteration(&self) -> bool {
    matches!(self.target, Target::Alter(_))
  }

  pub(crate) fn into_parts(self) -> (Target, Factory) {
    (self.target, self.factory)
  }
}

impl fmt::Debug for Provider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Provider")
      .field("token", self.token())
      .field("alteration", &self.is_alteration())
      .field("factory", &self.factory)
      .finish()
  }
}

/// A factory that builds a new `T` with injected constructor arguments.
pub fn construct<T: Injectable>() -> Factory {
  construct_class(Class::of::<T>())
}

pub fn construct_class(class: Class) -> Factory {
  Function::of(
    format!("construct {}", class.name()),
    [Parameter::of::<Container>()],
    move |arguments| arguments.get::<Container>(0)?.build(&class),
  )
}

/// Binds `T`'s own token to a constructor of `T`.
pub fn provide<T: Injectable>() -> Provider {
  provide_as::<T>(Token::of::<T>())
}

/// Binds `token` to a constructor of `T`.
pub fn provide_as<T: Injectable>(token: Token) -> Provider {
  provide_class(token, Class::of::<T>())
}

pub fn provide_class(token: Token, class: Class) -> Provider {
  Provider::new(token, construct_class(class))
}

pub fn provide_value(token: Token, value: Instance) -> Provider {
  Provider::new(token, Function::value(value))
}

pub fn provide_factory(token: Token, factory: Factory) -> Provider {
  Provider::new(token, factory)
}

/// Binds an interface token to a constructed `T`, exposed as `Rc<I>`.
///
/// `upcast` is usually just `|it| it` with the target type spelled out, which
/// lets the compiler perform the unsizing coercion to the trait object.
pub fn provide_interface<T, I>(token: Token, upcast: fn(Rc<T>) -> Rc<I>) -> Provider
where
  T: Injectable,
  I: ?Sized + Any,
{
  let factory = Function::of(
    format!("{} as {}", std::any::type_name::<T>(), token),
    [Parameter::of::<Container>()],
    move |arguments| {
      let value = arguments.get::<Container>(0)?.construct::<T>()?;
      Ok(Instance::shared(upcast(value)))
    },
  );
  Provider::new(token, factory)
}

/// Registers hooks against the trait object bound to `token`.
pub fn alter<I>(token: Token, alteration: Alteration<I>) -> Provider
where
  I: ?Sized + Interceptable,
{
  let target = token.clone();
  let alteration = Rc::new(alteration);
  let factory = Function::of(
    format!("alter {}", token),
    [Parameter::of::<Container>()],
    move |arguments| {
      let container = arguments.get::<Container>(0)?;
      let delegate = container.provide(&target)?.expect_shared::<I>(&target)?;
      let altered = I::intercept(delegate, &alteration)?;
      Ok(Instance::shared(altered))
    },
  );
  Provider {
    target: Target::Alter(token),
    factory,
  }
}

/// Registers a replacement factory for `token`. The factory resolves `token`
/// to the value produced so far and returns whatever should take its place.
pub fn alter_with(token: Token, factory: Factory) -> Provider {
  Provider {
    target: Target::Alter(token),
    factory,
  }
}

/// Builds a container; shorthand for `Container::new` / `Container::with_parent`.
pub fn injector(providers: impl IntoIterator<Item = Provider>, parent: Option<&Container>) -> Container {
  match parent {
    Some(parent) => Container::with_parent(providers, parent),
    None => Container::new(providers),
  }
}
