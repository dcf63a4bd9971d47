use crate::continuation::Next;
use crate::promise::{Promise, PromiseFactory};

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Resolver fallback consulted for suspensions no built-in kind recognizes.
///
/// The hook receives the payload (a boxed [`Value`](crate::Value) for
/// [`Suspension::Value`](crate::Suspension::Value), the original box for
/// [`Suspension::Other`](crate::Suspension::Other)) together with the
/// continuation handle. Returning `Ok(())` means the hook took charge and will
/// invoke the handle; returning the payload back means "not mine".
pub type CustomYieldable = Rc<dyn Fn(Box<dyn Any>, Next) -> Result<(), Box<dyn Any>>>;

/// Immutable configuration of one start operation.
///
/// A `Config` is built once through [`Config::builder`] and shared, unchanged,
/// by the operation and every routine nested inside it.
#[derive(Clone)]
pub struct Config {
    /// Builds the promise returned when no terminal callback is given.
    /// `None` disables promises and puts callback-less runs in raw-throw mode.
    future_constructor: Option<PromiseFactory>,

    /// Put the continuation handle first in the argument list instead of last.
    prepend_continuation: bool,

    /// Extra resolver fallback.
    custom_yieldable: Option<CustomYieldable>,

    /// Resume routines with the raw `[error, values..]` list instead of
    /// injecting errors.
    raw_mode: bool,
}

impl Config {
    /// Returns a builder initialised with the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn future_constructor(&self) -> Option<PromiseFactory> {
        self.future_constructor
    }

    pub fn prepend_continuation(&self) -> bool {
        self.prepend_continuation
    }

    pub fn custom_yieldable(&self) -> Option<&CustomYieldable> {
        self.custom_yieldable.as_ref()
    }

    pub fn raw_mode(&self) -> bool {
        self.raw_mode
    }
}

impl Default for Config {
    /// Promises enabled, continuation appended, no custom resolver, errors
    /// injected.
    fn default() -> Self {
        Self {
            future_constructor: Some(Promise::pending),
            prepend_continuation: false,
            custom_yieldable: None,
            raw_mode: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("future_constructor", &self.future_constructor.is_some())
            .field("prepend_continuation", &self.prepend_continuation)
            .field("custom_yieldable", &self.custom_yieldable.is_some())
            .field("raw_mode", &self.raw_mode)
            .finish()
    }
}

/// Builder for [`Config`].
///
/// # Examples
///
/// ```rust,ignore
/// let config = Config::builder()
///     .prepend_continuation(true)
///     .without_futures()
///     .build();
/// ```
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the constructor of returned promises.
    pub fn future_constructor(mut self, factory: PromiseFactory) -> Self {
        self.config.future_constructor = Some(factory);
        self
    }

    /// Disables promise support.
    ///
    /// A run started without a terminal callback then has nobody to report
    /// failures to, and lets them escape as [`Error::Unobserved`](crate::Error::Unobserved).
    pub fn without_futures(mut self) -> Self {
        self.config.future_constructor = None;
        self
    }

    pub fn prepend_continuation(mut self, prepend: bool) -> Self {
        self.config.prepend_continuation = prepend;
        self
    }

    /// Installs a resolver fallback.
    pub fn custom_yieldable<F>(mut self, hook: F) -> Self
    where
        F: Fn(Box<dyn Any>, Next) -> Result<(), Box<dyn Any>> + 'static,
    {
        self.config.custom_yieldable = Some(Rc::new(hook));
        self
    }

    pub fn raw_mode(mut self, raw: bool) -> Self {
        self.config.raw_mode = raw;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
