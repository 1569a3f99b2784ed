// inject/src/core.rs

//! Core data structures shared by the container, the analyzer and the alteration engine.

use crate::error::{Error, Result};
use crate::metadata::Declaration;
use crate::token::Token;
use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A type-erased, reference-counted value produced by a provider.
///
/// Cloning an `Instance` never clones the value: all clones point at the same
/// allocation, which is what the container caches and hands out. Concrete values
/// are stored as-is (`Instance::new`) and read back with [`Instance::downcast`].
/// Trait objects are stored as an `Rc<dyn Trait>` payload (`Instance::shared`)
/// and read back with [`Instance::downcast_shared`].
#[derive(Clone)]
pub struct Instance {
  value: Rc<dyn Any>,
  type_name: &'static str,
  declaration: Option<Rc<Declaration>>,
  prepared: Rc<Cell<bool>>,
}

impl Instance {
  pub fn new<T: Any>(value: T) -> Self {
    Self::from_rc(Rc::new(value))
  }

  pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
    Self {
      value,
      type_name: type_name::<T>(),
      declaration: None,
      prepared: Rc::new(Cell::new(false)),
    }
  }

  /// Wraps a trait object (or any unsized value) so it can be bound to a token.
  pub fn shared<I: ?Sized + Any>(value: Rc<I>) -> Self {
    Self {
      value: Rc::new(value),
      type_name: type_name::<I>(),
      declaration: None,
      prepared: Rc::new(Cell::new(false)),
    }
  }

  pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
    Rc::clone(&self.value).downcast::<T>().ok()
  }

  pub fn downcast_shared<I: ?Sized + Any>(&self) -> Option<Rc<I>> {
    self.value.downcast_ref::<Rc<I>>().cloned()
  }

  pub fn is<T: Any>(&self) -> bool {
    self.value.is::<T>()
  }

  /// Returns `true` if both instances point at the same value.
  pub fn ptr_eq(&self, other: &Instance) -> bool {
    std::ptr::eq(
      Rc::as_ptr(&self.value) as *const (),
      Rc::as_ptr(&other.value) as *const (),
    )
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub(crate) fn as_any(&self) -> &(dyn Any + 'static) {
    &*self.value
  }

  pub(crate) fn with_declaration(mut self, declaration: Rc<Declaration>) -> Self {
    self.declaration = Some(declaration);
    self
  }

  pub(crate) fn declaration(&self) -> Option<&Rc<Declaration>> {
    self.declaration.as_ref()
  }

  /// Marks the instance as prepared. Returns `false` if it already was.
  pub(crate) fn mark_prepared(&self) -> bool {
    !self.prepared.replace(true)
  }

  pub(crate) fn expect<T: Any>(&self, token: &Token) -> Result<Rc<T>> {
    self.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
      token: token.to_string(),
      expected: type_name::<T>(),
    })
  }

  pub(crate) fn expect_shared<I: ?Sized + Any>(&self, token: &Token) -> Result<Rc<I>> {
    self.downcast_shared::<I>().ok_or_else(|| Error::TypeMismatch {
      token: token.to_string(),
      expected: type_name::<I>(),
    })
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Instance({} @ {:p})", self.type_name, Rc::as_ptr(&self.value))
  }
}

/// An RAII guard that detects re-entrant resolution of a token.
///
/// When created, it pushes the token onto the container's resolution stack.
/// If the token is already on the stack the factory for it is still running, so
/// resolving it again would recurse forever. When the guard is dropped the token
/// is popped again.
pub(crate) struct ResolutionGuard<'a> {
  stack: &'a RefCell<Vec<Token>>,
}

impl<'a> ResolutionGuard<'a> {
  pub(crate) fn enter(stack: &'a RefCell<Vec<Token>>, token: &Token) -> Result<Self> {
    let mut resolving = stack.borrow_mut();
    if resolving.contains(token) {
      let path = resolving
        .iter()
        .chain(std::iter::once(token))
        .map(Token::name)
        .collect::<Vec<_>>()
        .join(" -> ");
      return Err(Error::CircularDependency(path));
    }
    resolving.push(token.clone());
    Ok(Self { stack })
  }
}

impl Drop for ResolutionGuard<'_> {
  fn drop(&mut self) {
    self.stack.borrow_mut().pop();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  trait Shape {
    fn sides(&self) -> u32;
  }

  struct Square;
  impl Shape for Square {
    fn sides(&self) -> u32 {
      4
    }
  }

  #[test]
  fn clones_share_identity() {
    let a = Instance::new(5_u32);
    let b = a.clone();
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&Instance::new(5_u32)));
    assert_eq!(*a.downcast::<u32>().unwrap(), 5);
    assert!(a.downcast::<i32>().is_none());
  }

  #[test]
  fn shared_payload_round_trips_trait_objects() {
    let shape: Rc<dyn Shape> = Rc::new(Square);
    let instance = Instance::shared(shape);
    assert_eq!(instance.downcast_shared::<dyn Shape>().unwrap().sides(), 4);
  }

  #[test]
  fn guard_reports_the_resolution_path() {
    let stack = RefCell::new(Vec::new());
    let a = Token::named("a");
    let b = Token::named("b");

    let _outer = ResolutionGuard::enter(&stack, &a).unwrap();
    {
      let _inner = ResolutionGuard::enter(&stack, &b).unwrap();
      let err = ResolutionGuard::enter(&stack, &a).err().unwrap();
      assert_eq!(
        err.to_string(),
        "Circular dependency detected while resolving: a -> b -> a"
      );
    }
    assert_eq!(stack.borrow().len(), 1);
  }
}
