//! Name based remote procedure calls.
//!
//! A caller sends the `Work` tag and a function name (see `Link::call`), the callee
//! looks the name up in its `Registry` and runs the handler, which then performs
//! whatever exchange the operation needs over the same link.

use std::{collections::HashMap, error::Error, fmt, io};

use futures::future::BoxFuture;

/// A registered handler. Receives the callee's context and nothing else.
pub type Handler<C> =
    Box<dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, io::Result<()>> + Send + Sync>;

/// Protocol contract violations. These mean both ends run mismatched versions.
#[derive(Debug)]
pub enum ProtocolErr {
    UnknownFunction(String),
    UnexpectedTag(u32),
}

impl fmt::Display for ProtocolErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFunction(name) => write!(f, "no function registered as {name:?}"),
            Self::UnexpectedTag(tag) => write!(f, "unexpected control tag {tag:#04x}"),
        }
    }
}

impl Error for ProtocolErr {}

/// Boundary conversion for I/O APIs.
impl From<ProtocolErr> for io::Error {
    fn from(value: ProtocolErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}

/// Maps function names to handlers over a context of type `C`.
pub struct Registry<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> Registry<C> {
    /// Creates a new empty `Registry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `name` with `handler`, replacing any previous binding.
    ///
    /// # Arguments
    /// * `name` - The name callers will use.
    /// * `handler` - The function to run on each call.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, io::Result<()>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            log::debug!("handler for {name:?} replaced");
        }
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Looks up the handler registered as `name` and starts it over `ctx`.
    ///
    /// # Arguments
    /// * `name` - The called function.
    /// * `ctx` - The context the handler runs against.
    ///
    /// # Returns
    /// The running handler, or `ProtocolErr::UnknownFunction` if nothing is
    /// registered under `name`.
    pub fn invoke<'a>(
        &self,
        name: &str,
        ctx: &'a mut C,
    ) -> Result<BoxFuture<'a, io::Result<()>>, ProtocolErr> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ProtocolErr::UnknownFunction(name.to_string()))?;

        Ok(handler(ctx))
    }
}
