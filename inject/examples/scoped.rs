use fibre_inject::{
  provide, provide_value, Arguments, Container, Declaration, Injectable, Instance, Parameter,
  Result, Token,
};
use std::rc::Rc;

struct RequestId(u64);

struct Logger;

impl Injectable for Logger {
  fn construct(_: Arguments) -> Result<Self> {
    println!("Building the shared Logger...");
    Ok(Logger)
  }
}

struct Handler {
  logger: Rc<Logger>,
  request: Rc<RequestId>,
}

impl Injectable for Handler {
  fn declare(declaration: Declaration) -> Declaration {
    declaration.params([Parameter::of::<Logger>(), Parameter::of::<RequestId>()])
  }

  fn construct(args: Arguments) -> Result<Self> {
    Ok(Handler {
      logger: args.get(0)?,
      request: args.get(1)?,
    })
  }
}

fn main() -> Result<()> {
  // Application-wide services live in the root container.
  let root = Container::new([provide::<Logger>()]);

  let mut handlers = Vec::new();
  for id in 1..=3 {
    // Each request gets a child container with its own values.
    let request = root.derive([
      provide_value(Token::of::<RequestId>(), Instance::new(RequestId(id))),
      provide::<Handler>(),
    ]);
    let handler = request.get::<Handler>()?;
    println!("Handled request {}", handler.request.0);
    handlers.push(handler);
  }

  // The logger was resolved by the root and shared by every request.
  assert!(handlers
    .windows(2)
    .all(|pair| Rc::ptr_eq(&pair[0].logger, &pair[1].logger)));
  println!("All handlers shared one Logger.");

  Ok(())
}
