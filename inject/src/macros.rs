// inject/src/macros.rs

//! Public macros.

/// Makes a trait's objects interceptable by alterations.
///
/// List every method of the trait. Methods must take `&self`, have no generic
/// parameters, spell out their return type and take only `Clone + 'static`
/// arguments, because before/after hooks see a copy of the arguments.
///
/// The macro generates a private proxy type implementing the trait and
/// implements [`Interceptable`](crate::Interceptable) for `dyn Trait`.
///
/// # Examples
///
/// ```
/// use fibre_inject::{alter, interceptable, provide_value, Alteration, Container, Instance, Token};
/// use std::rc::Rc;
///
/// trait Greeter {
///   fn greet(&self, name: String) -> String;
/// }
///
/// interceptable! {
///   dyn Greeter {
///     fn greet(&self, name: String) -> String;
///   }
/// }
///
/// struct English;
/// impl Greeter for English {
///   fn greet(&self, name: String) -> String {
///     format!("Hello, {}!", name)
///   }
/// }
///
/// let greeter_token = Token::interface("Greeter");
/// let english: Rc<dyn Greeter> = Rc::new(English);
/// let container = Container::new([
///   provide_value(greeter_token.clone(), Instance::shared(english)),
///   alter(
///     greeter_token.clone(),
///     Alteration::<dyn Greeter>::new()
///       .replace("greet", |_, (name,): (String,)| format!("Hi {}", name)),
///   ),
/// ]);
///
/// let greeter = container.get_interface::<dyn Greeter>(&greeter_token).unwrap();
/// assert_eq!(greeter.greet("Ada".to_string()), "Hi Ada");
/// ```
#[macro_export]
macro_rules! interceptable {
  ($(
    dyn $trait_ident:ident {
      $(fn $method:ident(&self $(, $arg:ident : $ty:ty)* $(,)?) -> $ret:ty;)*
    }
  )*) => {$(
    const _: () = {
      struct Proxy {
        delegate: ::std::rc::Rc<dyn $trait_ident>,
        $($method: $crate::Method<dyn $trait_ident, ($($ty,)*), $ret>,)*
      }

      impl $trait_ident for Proxy {
        $(
          fn $method(&self $(, $arg: $ty)*) -> $ret {
            (self.$method)(&*self.delegate, ($($arg,)*))
          }
        )*
      }

      impl $crate::Interceptable for dyn $trait_ident {
        fn intercept(
          delegate: ::std::rc::Rc<Self>,
          alteration: &$crate::Alteration<Self>,
        ) -> $crate::Result<::std::rc::Rc<Self>> {
          alteration.ensure_known(&[$(stringify!($method)),*])?;
          let proxy: ::std::rc::Rc<Self> = ::std::rc::Rc::new(Proxy {
            $(
              $method: alteration.compile(
                stringify!($method),
                $crate::method(|this: &Self, ($($arg,)*): ($($ty,)*)| {
                  this.$method($($arg),*)
                }),
              )?,
            )*
            delegate,
          });
          Ok(proxy)
        }
      }
    };
  )*};
}
