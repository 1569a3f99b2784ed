use fibre_inject::{
  alter_with, provide, provide_interface, provide_value, Arguments, Class, Container,
  ContainerOptions, Declaration, Error, Function, Injectable, Instance, Parameter, Property,
  Result, Slot, Token,
};
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// --- Test Fixtures ---

static RADIO: Lazy<Token> = Lazy::new(|| Token::interface("Radio"));
static LABEL: Lazy<Token> = Lazy::new(|| Token::named("label"));
static HOOK_CALLS: Lazy<Token> = Lazy::new(|| Token::named("hook_calls"));

trait Radio {
  fn station(&self) -> String;
}

struct Fm;

impl Radio for Fm {
  fn station(&self) -> String {
    "101.1".to_string()
  }
}

impl Injectable for Fm {
  fn construct(_: Arguments) -> Result<Self> {
    Ok(Fm)
  }
}

struct Engine;

impl Injectable for Engine {
  fn construct(_: Arguments) -> Result<Self> {
    Ok(Engine)
  }
}

struct Car {
  engine: Slot<Engine>,
  radio: Slot<dyn Radio>,
  label: RefCell<Option<String>>,
}

impl Injectable for Car {
  fn declare(declaration: Declaration) -> Declaration {
    declaration
      .property(Property::of::<Car, Engine>("engine", |car| &car.engine))
      .property(Property::interface::<Car, dyn Radio>("radio", &RADIO, |car| &car.radio).optional())
      .on_injection_completed::<Car>(
        [Parameter::inject(LABEL.clone()), Parameter::inject(HOOK_CALLS.clone())],
        |car, args| {
          let calls = args.get::<Cell<u32>>(1)?;
          calls.set(calls.get() + 1);
          if !car.engine.is_filled() {
            return Err(Error::factory("engine was not injected before the hook"));
          }
          *car.label.borrow_mut() = Some((*args.get::<String>(0)?).clone());
          Ok(())
        },
      )
  }

  fn construct(_: Arguments) -> Result<Self> {
    Ok(Car {
      engine: Slot::new(),
      radio: Slot::new(),
      label: RefCell::new(None),
    })
  }
}

struct Garage {
  car: Rc<Car>,
}

impl Injectable for Garage {
  fn declare(declaration: Declaration) -> Declaration {
    declaration.param(Parameter::of::<Car>())
  }

  fn construct(args: Arguments) -> Result<Self> {
    Ok(Garage { car: args.get(0)? })
  }
}

struct Gauge {
  reading: Slot<u32>,
  offset: Slot<u32>,
  note: Slot<String>,
}

impl Injectable for Gauge {
  fn declare(declaration: Declaration) -> Declaration {
    declaration
      .property(
        Property::of::<Gauge, u32>("reading", |gauge| &gauge.reading).with_token(Token::named("n")),
      )
      .property(Property::of::<Gauge, u32>("offset", |gauge| &gauge.offset))
      .property(Property::of::<Gauge, String>("note", |gauge| &gauge.note).nullable())
  }

  fn construct(_: Arguments) -> Result<Self> {
    Ok(Gauge {
      reading: Slot::new(),
      offset: Slot::new(),
      note: Slot::new(),
    })
  }
}

fn gauge_container() -> Container {
  Container::new([
    provide::<Gauge>(),
    provide_value(Token::of::<u32>(), Instance::new(1_u32)),
    provide_value(Token::named("n"), Instance::new(9_u32)),
  ])
}

fn car_container(hook_calls: &Rc<Cell<u32>>) -> Container {
  Container::new([
    provide::<Engine>(),
    provide::<Car>(),
    provide::<Garage>(),
    provide_value(LABEL.clone(), Instance::new("daily driver".to_string())),
    provide_value(HOOK_CALLS.clone(), Instance::from_rc(Rc::clone(hook_calls))),
  ])
}

// --- Lifecycle Tests ---

#[test]
fn test_properties_are_injected_before_the_hook() {
  let calls = Rc::new(Cell::new(0));
  let container = car_container(&calls);

  let car = container.get::<Car>().unwrap();

  assert!(Rc::ptr_eq(
    &car.engine.get().unwrap(),
    &container.get::<Engine>().unwrap()
  ));
  assert_eq!(car.label.borrow().as_deref(), Some("daily driver"));
  assert_eq!(calls.get(), 1);
}

#[test]
fn test_optional_properties_stay_empty() {
  let calls = Rc::new(Cell::new(0));
  let car = car_container(&calls).get::<Car>().unwrap();

  assert!(!car.radio.is_filled());
}

#[test]
fn test_interface_properties_are_injected() {
  let calls = Rc::new(Cell::new(0));
  let container = car_container(&calls).derive([
    provide_interface::<Fm, dyn Radio>(RADIO.clone(), |fm| fm),
    provide::<Car>(),
  ]);

  let car = container.get::<Car>().unwrap();

  assert_eq!(car.radio.get().unwrap().station(), "101.1");
}

#[test]
fn test_hook_runs_once_per_instance() {
  let calls = Rc::new(Cell::new(0));
  let container = car_container(&calls);

  let car = container.get::<Car>().unwrap();
  let garage = container.get::<Garage>().unwrap();

  assert!(Rc::ptr_eq(&car, &garage.car));
  assert_eq!(calls.get(), 1);
}

#[test]
fn test_alterations_do_not_rerun_the_hook() {
  let calls = Rc::new(Cell::new(0));
  let container = car_container(&calls).derive([
    provide::<Car>(),
    alter_with(
      Token::of::<Car>(),
      Function::of("inspect", [Parameter::of::<Car>()], |args| {
        args
          .instance(0)
          .cloned()
          .ok_or_else(|| Error::factory("no car to inspect"))
      }),
    ),
  ]);

  container.get::<Car>().unwrap();

  assert_eq!(calls.get(), 1);
}

#[test]
fn test_construct_prepares_each_new_instance() {
  let calls = Rc::new(Cell::new(0));
  let container = car_container(&calls);

  let first = container.construct::<Car>().unwrap();
  let second = container.construct::<Car>().unwrap();

  assert!(!Rc::ptr_eq(&first, &second));
  assert!(first.engine.is_filled() && second.engine.is_filled());
  assert_eq!(calls.get(), 2);
}

#[test]
fn test_missing_required_property_fails() {
  let container = Container::new([provide::<Car>()]);

  assert!(matches!(
    container.get::<Car>(),
    Err(Error::MissingProvider(_))
  ));
}

#[test]
fn test_hook_errors_propagate_and_nothing_is_cached() {
  struct Fragile;
  impl Injectable for Fragile {
    fn declare(declaration: Declaration) -> Declaration {
      declaration.on_injection_completed::<Fragile>([], |_, _| Err(Error::factory("not ready")))
    }
    fn construct(_: Arguments) -> Result<Self> {
      Ok(Fragile)
    }
  }

  let container = Container::new([provide::<Fragile>()]);

  let err = container.get::<Fragile>().err().unwrap();
  assert_eq!(err.to_string(), "Factory failed: not ready");
  assert!(container.get::<Fragile>().is_err());
}

#[test]
fn test_require_injectable_rejects_unmarked_classes() {
  struct Marked;
  impl Injectable for Marked {
    fn declare(declaration: Declaration) -> Declaration {
      declaration.injectable()
    }
    fn construct(_: Arguments) -> Result<Self> {
      Ok(Marked)
    }
  }

  let container = Container::builder()
    .providers([provide::<Engine>(), provide::<Marked>()])
    .options(ContainerOptions {
      require_injectable: true,
      ..ContainerOptions::default()
    })
    .build();

  assert!(container.get::<Marked>().is_ok());
  let err = container.get::<Engine>().err().unwrap();
  assert_eq!(
    err.to_string(),
    format!(
      "Cannot construct {}: class is not marked injectable",
      std::any::type_name::<Engine>()
    )
  );
}

#[test]
fn test_declared_only_classes_cannot_be_constructed() {
  let container = Container::new([]);
  let ghost = Class::declared(Declaration::function("Ghost"));

  let err = container.construct_class(&ghost).unwrap_err();

  assert_eq!(err.to_string(), "Cannot construct Ghost: value is not a constructor");
  assert_eq!(ghost.token(), &Token::named("Ghost"));
}

#[test]
fn test_property_token_overrides_the_declared_type() {
  let gauge = gauge_container().get::<Gauge>().unwrap();

  assert_eq!(*gauge.reading.get().unwrap(), 9);
  assert_eq!(*gauge.offset.get().unwrap(), 1);
}

#[test]
fn test_nullable_properties_without_a_provider_stay_empty() {
  let container = gauge_container();

  let gauge = container.get::<Gauge>().unwrap();

  assert!(!gauge.note.is_filled());
  // Once a provider exists the same property is filled.
  let noted = container
    .derive([
      provide::<Gauge>(),
      provide_value(Token::of::<String>(), Instance::new("calibrated".to_string())),
    ])
    .get::<Gauge>()
    .unwrap();
  assert_eq!(noted.note.get().unwrap().as_str(), "calibrated");
}
