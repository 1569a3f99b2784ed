// inject/src/analyzer.rs

//! Turns declarations into ordered lists of dependencies.

use crate::error::{Error, Result};
use crate::function::Factory;
use crate::metadata::{
  Annotation, AnnotationKey, DeclId, Declaration, DeclaredMetadata, MetadataProvider, Property,
  TypeRef,
};
use crate::token::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// What a single parameter or property needs.
#[derive(Clone)]
pub struct Dependency {
  /// Candidate tokens, tried in order.
  pub tokens: Vec<Token>,
  pub optional: bool,
  /// Evaluated only when no candidate resolves.
  pub default: Option<Factory>,
}

impl fmt::Debug for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dependency")
      .field("tokens", &self.tokens)
      .field("optional", &self.optional)
      .field("default", &self.default.is_some())
      .finish()
  }
}

/// An injectable property together with its analyzed dependency.
#[derive(Clone)]
pub struct PropertyDependency {
  pub property: Property,
  pub dependency: Dependency,
}

/// The dependency analyzer.
///
/// Results are memoized per declaration for as long as the analyzer lives. A
/// container tree shares one analyzer, so a class is analyzed once no matter how
/// many containers construct it.
pub struct Analyzer {
  metadata: Box<dyn MetadataProvider>,
  parameters: RefCell<HashMap<DeclId, Rc<[Dependency]>>>,
  properties: RefCell<HashMap<DeclId, Rc<[PropertyDependency]>>>,
}

impl Analyzer {
  pub fn new(metadata: impl MetadataProvider + 'static) -> Self {
    Self {
      metadata: Box::new(metadata),
      parameters: RefCell::new(HashMap::new()),
      properties: RefCell::new(HashMap::new()),
    }
  }

  pub fn metadata(&self) -> &dyn MetadataProvider {
    &*self.metadata
  }

  /// Dependencies of a constructor or function, one per parameter.
  pub fn analyze(&self, declaration: &Declaration) -> Result<Rc<[Dependency]>> {
    let count = self.metadata.parameter_count(declaration);
    if count == 0 {
      return Ok(Rc::from(Vec::new()));
    }

    let cached = self.parameters.borrow().get(&declaration.id()).cloned();
    if let Some(dependencies) = cached {
      tracing::trace!(declaration = %declaration.name(), "analysis memo hit");
      return Ok(dependencies);
    }

    let dependencies = (0..count)
      .map(|index| self.parameter(declaration, index))
      .collect::<Result<Vec<_>>>()?;
    tracing::debug!(
      declaration = %declaration.name(),
      parameters = count,
      "analyzed declaration"
    );

    let dependencies: Rc<[Dependency]> = Rc::from(dependencies);
    self
      .parameters
      .borrow_mut()
      .insert(declaration.id(), Rc::clone(&dependencies));
    Ok(dependencies)
  }

  /// Dependencies of the injectable properties of a class.
  pub fn analyze_properties(&self, declaration: &Declaration) -> Result<Rc<[PropertyDependency]>> {
    let cached = self.properties.borrow().get(&declaration.id()).cloned();
    if let Some(properties) = cached {
      return Ok(properties);
    }

    let properties = self
      .metadata
      .properties_of(declaration)
      .into_iter()
      .map(|property| {
        let tokens = match property.token() {
          Some(token) => vec![token.clone()],
          None => self.type_tokens(property.type_ref())?,
        };
        let dependency = Dependency {
          tokens,
          optional: property.is_optional(),
          default: None,
        };
        Ok(PropertyDependency {
          property,
          dependency,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    let properties: Rc<[PropertyDependency]> = Rc::from(properties);
    self
      .properties
      .borrow_mut()
      .insert(declaration.id(), Rc::clone(&properties));
    Ok(properties)
  }

  /// Candidate tokens for a declared type.
  pub fn type_tokens(&self, ty: &TypeRef) -> Result<Vec<Token>> {
    match ty {
      TypeRef::Class(token) | TypeRef::Interface(token) | TypeRef::Literal(token) => {
        Ok(vec![token.clone()])
      }
      TypeRef::Union(members) => {
        let mut tokens = Vec::new();
        for member in members {
          tokens.extend(self.type_tokens(member)?);
        }
        Ok(tokens)
      }
      TypeRef::Intersection(_) | TypeRef::Unknown(_) => Err(Error::UnsupportedType(ty.to_string())),
    }
  }

  /// Returns `true` if `declaration` has already been analyzed.
  pub fn is_memoized(&self, declaration: &Declaration) -> bool {
    self.parameters.borrow().contains_key(&declaration.id())
  }

  fn parameter(&self, declaration: &Declaration, index: usize) -> Result<Dependency> {
    let metadata = &*self.metadata;

    let tokens = match metadata.annotation(declaration, AnnotationKey::Inject, Some(index)) {
      Some(Annotation::Token(token)) => vec![token],
      _ => {
        let ty = metadata
          .declared_type(declaration, Some(index))
          .ok_or_else(|| {
            let parameter = declaration
              .parameters()
              .get(index)
              .and_then(|parameter| parameter.name())
              .map(str::to_owned)
              .unwrap_or_else(|| format!("#{}", index));
            Error::UnsupportedType(format!(
              "parameter {} of {} has no declared type",
              parameter,
              declaration.name()
            ))
          })?;
        self.type_tokens(&ty)?
      }
    };

    let default = metadata.default_initializer(declaration, index);
    let optional = metadata.is_optional_syntactically(declaration, index)
      || metadata
        .annotation(declaration, AnnotationKey::Optional, Some(index))
        .is_some()
      || default.is_some();

    Ok(Dependency {
      tokens,
      optional,
      default,
    })
  }
}

impl Default for Analyzer {
  fn default() -> Self {
    Self::new(DeclaredMetadata)
  }
}

impl fmt::Debug for Analyzer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Analyzer")
      .field("memoized", &self.parameters.borrow().len())
      .finish()
  }
}
