// inject/src/metadata.rs

//! Declared type information consumed by the analyzer.
//!
//! Rust has no runtime reflection, so the class author describes each
//! constructor parameter, injectable property and lifecycle hook explicitly with
//! a [`Declaration`]. The analyzer never reads a declaration directly. It goes
//! through a [`MetadataProvider`], which lets an application layer its own
//! metadata source (a registry, generated code, overrides in tests) over the
//! declared schema.

use crate::class::Slot;
use crate::core::Instance;
use crate::error::{Error, Result};
use crate::function::{Arguments, Factory, Function};
use crate::token::Token;
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a declaration, used to memoize analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclId {
  /// The declaration `Class::of` derives from a type's `Injectable` impl.
  Type(TypeId),
  /// A named member of a class, such as its lifecycle hook.
  Member(TypeId, &'static str),
  /// Any other declaration; allocated once per declaration and shared by the
  /// clones of its `Function`.
  Anonymous(u64),
}

impl DeclId {
  fn fresh() -> Self {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    DeclId::Anonymous(NEXT_ID.fetch_add(1, Ordering::Relaxed))
  }
}

/// The declared type of a parameter or property.
#[derive(Clone, Debug)]
pub enum TypeRef {
  Class(Token),
  Interface(Token),
  /// Members are tried in order; the first one with a provider wins.
  Union(Vec<TypeRef>),
  /// A literal value's type; it resolves through the token of that type.
  Literal(Token),
  Intersection(Vec<TypeRef>),
  Unknown(Cow<'static, str>),
}

impl TypeRef {
  pub fn class<T: ?Sized + Any>() -> Self {
    TypeRef::Class(Token::of::<T>())
  }

  pub fn interface(token: &Token) -> Self {
    TypeRef::Interface(token.clone())
  }

  pub fn literal<T: Any>() -> Self {
    TypeRef::Literal(Token::of::<T>())
  }

  pub fn union(members: impl IntoIterator<Item = TypeRef>) -> Self {
    TypeRef::Union(members.into_iter().collect())
  }
}

impl fmt::Display for TypeRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let join = |members: &[TypeRef], sep: &str| {
      members
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
    };
    match self {
      TypeRef::Class(token) | TypeRef::Interface(token) => write!(f, "{}", token),
      TypeRef::Literal(token) => write!(f, "literal {}", token),
      TypeRef::Union(members) => f.write_str(&join(members, " | ")),
      TypeRef::Intersection(members) => f.write_str(&join(members, " & ")),
      TypeRef::Unknown(description) => f.write_str(description),
    }
  }
}

/// One constructor or function parameter.
#[derive(Clone)]
pub struct Parameter {
  name: Option<Cow<'static, str>>,
  ty: Option<TypeRef>,
  inject: Option<Token>,
  optional: bool,
  nullable: bool,
  default: Option<Factory>,
}

impl Parameter {
  pub fn typed(ty: TypeRef) -> Self {
    Self {
      name: None,
      ty: Some(ty),
      inject: None,
      optional: false,
      nullable: false,
      default: None,
    }
  }

  pub fn of<T: ?Sized + Any>() -> Self {
    Self::typed(TypeRef::class::<T>())
  }

  pub fn interface(token: &Token) -> Self {
    Self::typed(TypeRef::interface(token))
  }

  pub fn union(members: impl IntoIterator<Item = TypeRef>) -> Self {
    Self::typed(TypeRef::union(members))
  }

  /// A parameter with no declared type, resolved only through its explicit token.
  pub fn inject(token: Token) -> Self {
    Self {
      name: None,
      ty: None,
      inject: Some(token),
      optional: false,
      nullable: false,
      default: None,
    }
  }

  pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Overrides type-based inference with an explicit token.
  pub fn with_token(mut self, token: Token) -> Self {
    self.inject = Some(token);
    self
  }

  /// Marks the parameter optional: it resolves to nothing instead of failing.
  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  /// Declares the parameter as an `Option<_>` in the constructor signature.
  pub fn nullable(mut self) -> Self {
    self.nullable = true;
    self
  }

  /// Falls back to a clone of `value` when no provider resolves.
  pub fn default_value<T: Any + Clone>(self, value: T) -> Self {
    self.default_with(Function::of("default", [], move |_| {
      Ok(Instance::new(value.clone()))
    }))
  }

  /// Falls back to `supplier`, invoked through the resolving container.
  pub fn default_with(mut self, supplier: Factory) -> Self {
    self.default = Some(supplier);
    self
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

type Assign = Rc<dyn Fn(&(dyn Any + 'static), Option<Instance>) -> Result<()>>;

/// An injectable property, filled after construction.
#[derive(Clone)]
pub struct Property {
  name: Cow<'static, str>,
  ty: TypeRef,
  inject: Option<Token>,
  optional: bool,
  nullable: bool,
  assign: Assign,
}

impl Property {
  pub fn new<O: Any>(
    name: impl Into<Cow<'static, str>>,
    ty: TypeRef,
    assign: impl Fn(&O, Instance) -> Result<()> + 'static,
  ) -> Self {
    let name = name.into();
    let owner_name = name.clone();
    let assign: Assign = Rc::new(move |owner: &(dyn Any + 'static), value: Option<Instance>| {
      let owner = owner
        .downcast_ref::<O>()
        .ok_or_else(|| Error::TypeMismatch {
          token: owner_name.to_string(),
          expected: type_name::<O>(),
        })?;
      match value {
        Some(value) => assign(owner, value),
        None => Ok(()),
      }
    });
    Self {
      name,
      ty,
      inject: None,
      optional: false,
      nullable: false,
      assign,
    }
  }

  /// A property holding a concrete type, stored in a [`Slot`] on the owner.
  pub fn of<O: Any, T: Any>(name: &'static str, slot: fn(&O) -> &Slot<T>) -> Self {
    Self::new(name, TypeRef::class::<T>(), move |owner: &O, value: Instance| {
      let value = value.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
        token: name.to_string(),
        expected: type_name::<T>(),
      })?;
      slot(owner).fill(value);
      Ok(())
    })
  }

  /// A property holding a trait object bound to an interface token.
  pub fn interface<O: Any, I: ?Sized + Any>(
    name: &'static str,
    token: &Token,
    slot: fn(&O) -> &Slot<I>,
  ) -> Self {
    Self::new(name, TypeRef::interface(token), move |owner: &O, value: Instance| {
      let value = value
        .downcast_shared::<I>()
        .ok_or_else(|| Error::TypeMismatch {
          token: name.to_string(),
          expected: type_name::<I>(),
        })?;
      slot(owner).fill(value);
      Ok(())
    })
  }

  pub fn with_token(mut self, token: Token) -> Self {
    self.inject = Some(token);
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn nullable(mut self) -> Self {
    self.nullable = true;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn type_ref(&self) -> &TypeRef {
    &self.ty
  }

  pub fn token(&self) -> Option<&Token> {
    self.inject.as_ref()
  }

  pub fn is_optional(&self) -> bool {
    self.optional || self.nullable
  }

  pub(crate) fn assign(&self, owner: &(dyn Any + 'static), value: Option<Instance>) -> Result<()> {
    (self.assign)(owner, value)
  }
}

/// The lifecycle hook run once construction and property injection are done.
pub type LifecycleHook = Function<dyn Any, ()>;

/// The declared shape of a class or function.
pub struct Declaration {
  id: DeclId,
  name: Cow<'static, str>,
  token: Option<Token>,
  parameters: Vec<Parameter>,
  properties: Vec<Property>,
  injectable: bool,
  lifecycle: Option<LifecycleHook>,
}

impl Declaration {
  /// A declaration for `T`, bound under `Token::of::<T>()`.
  ///
  /// Each call describes a new declaration, so two hand-built classes of one
  /// type never share an analysis.
  pub fn class<T: Any>() -> Self {
    Self {
      name: Cow::Borrowed(type_name::<T>()),
      token: Some(Token::of::<T>()),
      ..Self::function("")
    }
  }

  /// The declaration `T::declare` starts from. It is the same on every call, so
  /// its analysis is keyed by the type.
  pub(crate) fn of_type<T: Any>() -> Self {
    Self {
      id: DeclId::Type(TypeId::of::<T>()),
      ..Self::class::<T>()
    }
  }

  pub fn function(name: impl Into<Cow<'static, str>>) -> Self {
    Self {
      id: DeclId::fresh(),
      name: name.into(),
      token: None,
      parameters: Vec::new(),
      properties: Vec::new(),
      injectable: false,
      lifecycle: None,
    }
  }

  pub fn param(mut self, parameter: Parameter) -> Self {
    self.parameters.push(parameter);
    self
  }

  pub fn params(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
    self.parameters.extend(parameters);
    self
  }

  pub fn property(mut self, property: Property) -> Self {
    self.properties.push(property);
    self
  }

  /// Attaches the injectable marker, required when the container is built with
  /// `require_injectable`.
  pub fn injectable(mut self) -> Self {
    self.injectable = true;
    self
  }

  /// Registers `on_injection_completed`. Its parameters are injected like any
  /// other function's.
  pub fn on_injection_completed<T: Any>(
    mut self,
    parameters: impl IntoIterator<Item = Parameter>,
    hook: impl Fn(&T, Arguments) -> Result<()> + 'static,
  ) -> Self {
    let name = format!("{}::on_injection_completed", self.name);
    let id = match self.id {
      DeclId::Type(type_id) => DeclId::Member(type_id, "on_injection_completed"),
      _ => DeclId::fresh(),
    };
    let declaration = Declaration {
      id,
      ..Declaration::function(name.clone()).params(parameters)
    };
    self.lifecycle = Some(LifecycleHook::from_declaration(
      declaration,
      move |this, arguments| {
        let this = this.downcast_ref::<T>().ok_or_else(|| Error::TypeMismatch {
          token: name.clone(),
          expected: type_name::<T>(),
        })?;
        hook(this, arguments)
      },
    ));
    self
  }

  pub fn id(&self) -> DeclId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub(crate) fn name_cow(&self) -> Cow<'static, str> {
    self.name.clone()
  }

  pub fn token(&self) -> Option<&Token> {
    self.token.as_ref()
  }

  pub fn parameters(&self) -> &[Parameter] {
    &self.parameters
  }

  pub fn properties(&self) -> &[Property] {
    &self.properties
  }

  pub fn lifecycle(&self) -> Option<&LifecycleHook> {
    self.lifecycle.as_ref()
  }
}

impl fmt::Debug for Declaration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Declaration")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("parameters", &self.parameters.len())
      .field("properties", &self.properties.len())
      .field("injectable", &self.injectable)
      .finish()
  }
}

/// The annotation keys the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKey {
  /// Opt-in marker on a class.
  Injectable,
  /// Explicit token override on a parameter or property.
  Inject,
  /// Optional marker on a parameter or property.
  Optional,
}

#[derive(Debug, Clone)]
pub enum Annotation {
  Marker,
  Token(Token),
}

/// Source of declared type and annotation information.
///
/// `index` selects a parameter; `None` addresses the declaration itself.
pub trait MetadataProvider {
  fn parameter_count(&self, declaration: &Declaration) -> usize;

  fn declared_type(&self, declaration: &Declaration, index: Option<usize>) -> Option<TypeRef>;

  fn annotation(
    &self,
    declaration: &Declaration,
    key: AnnotationKey,
    index: Option<usize>,
  ) -> Option<Annotation>;

  fn is_optional_syntactically(&self, declaration: &Declaration, index: usize) -> bool;

  fn default_initializer(&self, declaration: &Declaration, index: usize) -> Option<Factory>;

  fn properties_of(&self, declaration: &Declaration) -> Vec<Property>;
}

/// Reads metadata straight from the declared schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredMetadata;

impl MetadataProvider for DeclaredMetadata {
  fn parameter_count(&self, declaration: &Declaration) -> usize {
    declaration.parameters.len()
  }

  fn declared_type(&self, declaration: &Declaration, index: Option<usize>) -> Option<TypeRef> {
    match index {
      None => declaration.token.clone().map(TypeRef::Class),
      Some(index) => declaration.parameters.get(index)?.ty.clone(),
    }
  }

  fn annotation(
    &self,
    declaration: &Declaration,
    key: AnnotationKey,
    index: Option<usize>,
  ) -> Option<Annotation> {
    let Some(index) = index else {
      return (key == AnnotationKey::Injectable && declaration.injectable)
        .then_some(Annotation::Marker);
    };
    let parameter = declaration.parameters.get(index)?;
    match key {
      AnnotationKey::Inject => parameter.inject.clone().map(Annotation::Token),
      AnnotationKey::Optional => parameter.optional.then_some(Annotation::Marker),
      AnnotationKey::Injectable => None,
    }
  }

  fn is_optional_syntactically(&self, declaration: &Declaration, index: usize) -> bool {
    declaration
      .parameters
      .get(index)
      .is_some_and(|parameter| parameter.nullable)
  }

  fn default_initializer(&self, declaration: &Declaration, index: usize) -> Option<Factory> {
    declaration.parameters.get(index)?.default.clone()
  }

  fn properties_of(&self, declaration: &Declaration) -> Vec<Property> {
    declaration.properties.clone()
  }
}
