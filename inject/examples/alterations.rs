use fibre_inject::{
  alter, interceptable, method, provide_interface, Alteration, Arguments, Container, Injectable,
  Method, Result, Token,
};
use once_cell::sync::Lazy;

static CALCULATOR: Lazy<Token> = Lazy::new(|| Token::interface("Calculator"));

trait Calculator {
  fn add(&self, a: i64, b: i64) -> i64;
  fn divide(&self, a: i64, b: i64) -> i64;
}

interceptable! {
  dyn Calculator {
    fn add(&self, a: i64, b: i64) -> i64;
    fn divide(&self, a: i64, b: i64) -> i64;
  }
}

struct Basic;

impl Calculator for Basic {
  fn add(&self, a: i64, b: i64) -> i64 {
    a + b
  }

  fn divide(&self, a: i64, b: i64) -> i64 {
    a / b
  }
}

impl Injectable for Basic {
  fn construct(_: Arguments) -> Result<Self> {
    Ok(Basic)
  }
}

type BinaryOp = Method<dyn Calculator, (i64, i64), i64>;

fn main() -> Result<()> {
  let tracing = Alteration::<dyn Calculator>::new()
    .before("add", |(a, b): &(i64, i64)| println!("-> add({}, {})", a, b))
    .after("add", |_: &(i64, i64)| println!("<- add"))
    // Division by zero returns zero instead of panicking.
    .around("divide", |inner: BinaryOp| -> BinaryOp {
      method(move |this, (a, b): (i64, i64)| if b == 0 { 0 } else { inner(this, (a, b)) })
    });

  let container = Container::new([
    provide_interface::<Basic, dyn Calculator>(CALCULATOR.clone(), |basic| basic),
    alter(CALCULATOR.clone(), tracing),
  ]);

  let calculator = container.get_interface::<dyn Calculator>(&CALCULATOR)?;
  println!("2 + 3 = {}", calculator.add(2, 3));
  println!("7 / 0 = {}", calculator.divide(7, 0));

  Ok(())
}
