// inject/src/alteration.rs

//! Method interception for resolved instances.
//!
//! An [`Alteration`] collects typed hooks for the methods of an interceptable
//! trait. When the altered token is first resolved, the `interceptable!` proxy
//! for the trait compiles one pipeline per method and wraps the resolved
//! instance. Consumers keep talking to an `Rc<dyn Trait>` and cannot tell the
//! proxy from the plain instance except through the hooks' effects.

use crate::error::{Error, Result};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// A method of `I` taking its arguments as the tuple `A` and returning `R`.
pub type Method<I, A, R> = Rc<dyn Fn(&I, A) -> R>;

type Hook<A> = Rc<dyn Fn(&A)>;
type Around<I, A, R> = Rc<dyn Fn(Method<I, A, R>) -> Method<I, A, R>>;

/// Builds a [`Method`] from a closure, fixing the closure's signature.
pub fn method<I: ?Sized, A, R>(f: impl Fn(&I, A) -> R + 'static) -> Method<I, A, R> {
  Rc::new(f)
}

/// A type whose instances can be wrapped in an interception proxy.
///
/// Implemented for `dyn Trait` by the `interceptable!` macro.
pub trait Interceptable: Any {
  fn intercept(delegate: Rc<Self>, alteration: &Alteration<Self>) -> Result<Rc<Self>>;
}

/// Hooks for the methods of `I`, keyed by method name.
///
/// Per method, the pipeline is assembled as follows: a replacement (if any)
/// stands in for the original method; `before` and `after` bracket that call,
/// `after` running even if the call unwinds; `around` receives the bracketed
/// method and returns the function that is finally installed.
pub struct Alteration<I: ?Sized> {
  before: HashMap<&'static str, Rc<dyn Any>>,
  after: HashMap<&'static str, Rc<dyn Any>>,
  around: HashMap<&'static str, Rc<dyn Any>>,
  replace: HashMap<&'static str, Rc<dyn Any>>,
  _target: PhantomData<fn(&I)>,
}

impl<I: ?Sized + 'static> Alteration<I> {
  pub fn new() -> Self {
    Self {
      before: HashMap::new(),
      after: HashMap::new(),
      around: HashMap::new(),
      replace: HashMap::new(),
      _target: PhantomData,
    }
  }

  /// Runs `hook` with the call's arguments before the method. Its return value
  /// is discarded; a panic prevents the method from running.
  pub fn before<A: 'static>(mut self, method: &'static str, hook: impl Fn(&A) + 'static) -> Self {
    let hook: Hook<A> = Rc::new(hook);
    self.before.insert(method, Rc::new(hook));
    self
  }

  /// Runs `hook` with the call's arguments after the method, including when
  /// the method panics.
  ///
  /// If the hook itself panics while the method is unwinding, its panic is
  /// discarded and the method's panic continues. A hook that panics after a
  /// normal return propagates as usual.
  pub fn after<A: 'static>(mut self, method: &'static str, hook: impl Fn(&A) + 'static) -> Self {
    let hook: Hook<A> = Rc::new(hook);
    self.after.insert(method, Rc::new(hook));
    self
  }

  pub fn around<A: 'static, R: 'static>(
    mut self,
    method: &'static str,
    hook: impl Fn(Method<I, A, R>) -> Method<I, A, R> + 'static,
  ) -> Self {
    let hook: Around<I, A, R> = Rc::new(hook);
    self.around.insert(method, Rc::new(hook));
    self
  }

  /// Replaces the method outright; the original is never called.
  pub fn replace<A: 'static, R: 'static>(
    mut self,
    method: &'static str,
    replacement: impl Fn(&I, A) -> R + 'static,
  ) -> Self {
    let replacement: Method<I, A, R> = Rc::new(replacement);
    self.replace.insert(method, Rc::new(replacement));
    self
  }

  /// Fails if a hook names a method outside `methods`.
  pub fn ensure_known(&self, methods: &[&'static str]) -> Result<()> {
    let unknown = self
      .before
      .keys()
      .chain(self.after.keys())
      .chain(self.around.keys())
      .chain(self.replace.keys())
      .find(|name| !methods.contains(*name));
    match unknown {
      Some(name) => Err(Error::Alteration {
        method: name.to_string(),
        reason: "not an interceptable method".to_string(),
      }),
      None => Ok(()),
    }
  }

  /// Assembles the pipeline for one method around `original`.
  pub fn compile<A: Clone + 'static, R: 'static>(
    &self,
    method: &'static str,
    original: Method<I, A, R>,
  ) -> Result<Method<I, A, R>> {
    let mut compiled = match self.replace.get(method) {
      Some(replacement) => hook::<Method<I, A, R>>(replacement, method, "replacement")?,
      None => original,
    };

    let before = self
      .before
      .get(method)
      .map(|h| hook::<Hook<A>>(h, method, "before hook"))
      .transpose()?;
    let after = self
      .after
      .get(method)
      .map(|h| hook::<Hook<A>>(h, method, "after hook"))
      .transpose()?;

    if before.is_some() || after.is_some() {
      let inner = compiled;
      compiled = Rc::new(move |this: &I, args: A| {
        let _finally = after.as_ref().map(|hook| Finally {
          hook: Rc::clone(hook),
          args: args.clone(),
        });
        if let Some(before) = &before {
          before(&args);
        }
        inner(this, args)
      });
    }

    if let Some(around) = self.around.get(method) {
      let around = hook::<Around<I, A, R>>(around, method, "around hook")?;
      compiled = around(compiled);
    }

    Ok(compiled)
  }

  pub fn is_empty(&self) -> bool {
    self.before.is_empty()
      && self.after.is_empty()
      && self.around.is_empty()
      && self.replace.is_empty()
  }
}

impl<I: ?Sized + 'static> Default for Alteration<I> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: ?Sized> fmt::Debug for Alteration<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names = |hooks: &HashMap<&'static str, Rc<dyn Any>>| {
      let mut names: Vec<_> = hooks.keys().copied().collect();
      names.sort_unstable();
      names
    };
    f.debug_struct("Alteration")
      .field("before", &names(&self.before))
      .field("after", &names(&self.after))
      .field("around", &names(&self.around))
      .field("replace", &names(&self.replace))
      .finish()
  }
}

fn hook<H: Clone + 'static>(hook: &Rc<dyn Any>, method: &str, kind: &str) -> Result<H> {
  hook
    .downcast_ref::<H>()
    .cloned()
    .ok_or_else(|| Error::Alteration {
      method: method.to_string(),
      reason: format!("{} does not match the method signature", kind),
    })
}

/// Runs the after hook when dropped, so it also fires while unwinding.
struct Finally<A> {
  hook: Hook<A>,
  args: A,
}

impl<A> Drop for Finally<A> {
  fn drop(&mut self) {
    if !std::thread::panicking() {
      (self.hook)(&self.args);
      return;
    }
    // A second panic while unwinding would abort the process.
    let hook = &self.hook;
    let args = &self.args;
    if catch_unwind(AssertUnwindSafe(|| hook(args))).is_err() {
      tracing::warn!("after hook panicked while the method was unwinding; discarding its panic");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  struct Counter;

  fn add() -> Method<Counter, (i32, i32), i32> {
    method(|_: &Counter, (a, b): (i32, i32)| a + b)
  }

  #[test]
  fn without_hooks_the_original_is_returned() {
    let original = add();
    let compiled = Alteration::<Counter>::new()
      .compile("add", Rc::clone(&original))
      .unwrap();
    assert!(Rc::ptr_eq(&original, &compiled));
  }

  #[test]
  fn replacement_skips_the_original() {
    let compiled = Alteration::<Counter>::new()
      .replace("add", |_: &Counter, (a, b): (i32, i32)| a * b)
      .compile("add", add())
      .unwrap();
    assert_eq!(compiled(&Counter, (3, 4)), 12);
  }

  #[test]
  fn hook_with_wrong_signature_is_rejected() {
    let err = Alteration::<Counter>::new()
      .before("add", |_: &String| {})
      .compile("add", add())
      .err()
      .unwrap();
    assert_eq!(
      err.to_string(),
      "Invalid alteration of 'add': before hook does not match the method signature"
    );
  }

  #[test]
  fn after_runs_when_the_method_panics() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let after_log = Rc::clone(&log);
    let compiled = Alteration::<Counter>::new()
      .after("add", move |_: &(i32, i32)| after_log.borrow_mut().push("after"))
      .compile(
        "add",
        method(|_: &Counter, _: (i32, i32)| -> i32 { panic!("boom") }),
      )
      .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| compiled(&Counter, (1, 2))));
    assert!(result.is_err());
    assert_eq!(*log.borrow(), vec!["after"]);
  }

  #[test]
  fn unknown_methods_are_rejected() {
    let alteration = Alteration::<Counter>::new().before("sub", |_: &(i32, i32)| {});
    assert!(alteration.ensure_known(&["add"]).is_err());
    assert!(alteration.ensure_known(&["add", "sub"]).is_ok());
  }
}
