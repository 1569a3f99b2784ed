use fibre_inject::{
  injector, provide, provide_as, provide_value, Arguments, Container, ContainerOptions,
  Declaration, Injectable, Instance, Parameter, Result, Token,
};
use pretty_assertions::assert_eq;
use std::rc::Rc;

// --- Test Fixtures ---

struct Settings {
  env: &'static str,
}

impl Injectable for Settings {
  fn construct(_: Arguments) -> Result<Self> {
    Ok(Settings { env: "parent" })
  }
}

struct Mailer {
  settings: Rc<Settings>,
}

impl Injectable for Mailer {
  fn declare(declaration: Declaration) -> Declaration {
    declaration.param(Parameter::of::<Settings>())
  }

  fn construct(args: Arguments) -> Result<Self> {
    Ok(Mailer {
      settings: args.get(0)?,
    })
  }
}

struct Signup {
  mailer: Rc<Mailer>,
  settings: Rc<Settings>,
}

impl Injectable for Signup {
  fn declare(declaration: Declaration) -> Declaration {
    declaration.params([Parameter::of::<Mailer>(), Parameter::of::<Settings>()])
  }

  fn construct(args: Arguments) -> Result<Self> {
    Ok(Signup {
      mailer: args.get(0)?,
      settings: args.get(1)?,
    })
  }
}

// An unrelated class, bound under a named token by `provide_as`.
struct ChildSettings;

impl Injectable for ChildSettings {
  fn construct(_: Arguments) -> Result<Self> {
    Ok(ChildSettings)
  }
}

fn child_settings() -> Instance {
  Instance::new(Settings { env: "child" })
}

// --- Hierarchy Tests ---

#[test]
fn test_child_reuses_parent_singletons() {
  let parent = Container::new([provide::<Settings>(), provide::<Mailer>()]);
  let child = parent.derive([provide::<Signup>()]);

  let signup = child.get::<Signup>().unwrap();

  assert!(Rc::ptr_eq(&signup.mailer, &parent.get::<Mailer>().unwrap()));
  assert!(Rc::ptr_eq(&signup.settings, &parent.get::<Settings>().unwrap()));
  assert!(child.parent().unwrap().ptr_eq(&parent));
}

#[test]
fn test_child_providers_shadow_the_parent() {
  let parent = Container::new([provide::<Settings>(), provide::<Mailer>()]);
  let child = parent.derive([
    provide_value(Token::of::<Settings>(), child_settings()),
    provide::<Signup>(),
  ]);

  let signup = child.get::<Signup>().unwrap();

  assert_eq!(signup.settings.env, "child");
  // Mailer is resolved (and cached) by the parent, with the parent's Settings.
  assert_eq!(signup.mailer.settings.env, "parent");
  assert_eq!(parent.get::<Settings>().unwrap().env, "parent");
}

#[test]
fn test_child_instances_are_not_visible_to_the_parent() {
  let parent = Container::new([]);
  let child = injector([provide::<Settings>()], Some(&parent));

  assert_eq!(child.get::<Settings>().unwrap().env, "parent");
  assert!(parent
    .provide_or(&Token::of::<Settings>(), None)
    .unwrap()
    .is_none());
}

#[test]
fn test_provide_as_binds_another_class_to_a_token() {
  let token = Token::named("settings");
  let container = Container::new([provide_as::<ChildSettings>(token.clone())]);

  let resolved = container.provide(&token).unwrap();

  assert!(resolved.is::<ChildSettings>());
}

#[test]
fn test_last_duplicate_provider_wins() {
  let token = Token::named("level");
  let container = Container::new([
    provide_value(token.clone(), Instance::new(1_u8)),
    provide_value(token.clone(), Instance::new(2_u8)),
  ]);

  let level = container.provide(&token).unwrap();

  assert_eq!(*level.downcast::<u8>().unwrap(), 2);
}

#[test]
fn test_each_container_answers_with_itself() {
  let parent = Container::new([]);
  let child = parent.derive([]);

  assert!(child.get::<Container>().unwrap().ptr_eq(&child));
  assert!(parent.get::<Container>().unwrap().ptr_eq(&parent));
}

#[test]
fn test_children_share_analyzer_and_options() {
  let options = ContainerOptions {
    require_injectable: true,
    ..ContainerOptions::default()
  };
  let parent = Container::builder().options(options.clone()).build();
  let child = parent.derive([]);
  let grandchild = Container::with_parent([], &child);

  assert!(Rc::ptr_eq(parent.analyzer(), grandchild.analyzer()));
  assert_eq!(grandchild.options(), &options);
}

#[test]
fn test_derive_seeds_values_for_a_single_call() {
  let parent = Container::new([provide::<Settings>(), provide::<Mailer>()]);

  let scoped = parent.derive([provide_value(Token::of::<Settings>(), child_settings())]);
  let mailer = scoped.construct::<Mailer>().unwrap();

  assert_eq!(mailer.settings.env, "child");
  assert_eq!(parent.get::<Mailer>().unwrap().settings.env, "parent");
}
