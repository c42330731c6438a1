use di::ServiceCollection;

use crate::{config::Config, error::BootstrapError};

/// a module used for di configuration.
///
/// Modules run after the configuration is loaded, so they can read their own section and
/// fail the startup when it is invalid.
///
/// # Example
/// ```
/// use di::{Ref, ServiceCollection, singleton_as_self};
/// use kindle_bootstrap::{config::Config, error::BootstrapError, module::Module};
///
/// pub struct Greeting(String);
/// pub struct GreetingModule;
///
/// impl Module for GreetingModule {
///     fn configure(
///         &self,
///         _config: &Config,
///         binder: &mut ServiceCollection,
///     ) -> Result<(), BootstrapError> {
///         let greeting = Ref::new(Greeting("hello".to_string()));
///         binder.add(singleton_as_self::<Greeting>().from(move |_| greeting.clone()));
///         Ok(())
///     }
/// }
/// ```
pub trait Module {
    fn configure(&self, config: &Config, binder: &mut ServiceCollection)
    -> Result<(), BootstrapError>;
}
