//! Variable resolvers.
//!
//! This module contains basic support for variable resolvers, used to expand `${...}` placeholders
//! in configured locations (e.g. `${env.USERNAME}` or `${install.dir}`).

use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::rc::Rc;

/// The error type for operations interacting with variables.
#[cfg_attr(test, derive(PartialEq))]
#[derive(Debug, thiserror::Error)]
pub(crate) enum VarError {
    /// The specified variable is not present.
    #[error("variable '{0}' not found")]
    NotPresent(String),
}

/// Trait for variable resolvers.
pub(crate) trait VarResolver: fmt::Debug {
    /// Resolves the variable with the given name.
    fn resolve_var(&self, var_name: &str) -> Result<String, VarError>;
}

/// [`VarResolver`] implementation for environment variables of the current process.
#[derive(Debug)]
pub(crate) struct OsEnvVarResolver;

impl VarResolver for OsEnvVarResolver {
    #[tracing::instrument(level = "trace", ret)]
    fn resolve_var(&self, v: &str) -> Result<String, VarError> {
        env::var(v).map_err(|_| VarError::NotPresent(v.to_owned()))
    }
}

/// [`VarResolver`] that first removes the given prefix from the variable and then delegates to the given resolver.
#[derive(Debug)]
pub(crate) struct PrefixedVarResolver {
    resolver: Rc<dyn VarResolver>,
    prefix: String,
}

impl PrefixedVarResolver {
    /// Constructs a new `PrefixedVarResolver` for the given variable resolver.
    pub(crate) fn new(prefix: impl Into<String>, resolver: Rc<dyn VarResolver>) -> Self {
        Self {
            prefix: prefix.into(),
            resolver,
        }
    }
}

impl VarResolver for PrefixedVarResolver {
    #[tracing::instrument(level = "trace", ret)]
    fn resolve_var(&self, v: &str) -> Result<String, VarError> {
        match v.strip_prefix(&self.prefix) {
            Some(v) => self.resolver.resolve_var(v),
            None => Err(VarError::NotPresent(v.to_owned())),
        }
    }
}

/// [`VarResolver`] implementation for a fixed set of variables.
#[derive(Debug, Default)]
pub(crate) struct SimpleVarResolver {
    vars: HashMap<String, String>,
}

impl SimpleVarResolver {
    /// Registers the value for the given variable name.
    pub(crate) fn insert(&mut self, name: impl Into<String>, val: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), val.into());

        self
    }
}

impl VarResolver for SimpleVarResolver {
    #[tracing::instrument(level = "trace", ret)]
    fn resolve_var(&self, v: &str) -> Result<String, VarError> {
        self.vars.get(v).cloned().ok_or_else(|| VarError::NotPresent(v.to_owned()))
    }
}

/// Expands variables in strings with the help of variable resolvers, asking them in order.
#[derive(Debug)]
pub(crate) struct VarExpander {
    // The resolvers, first match wins.
    #[doc(hidden)]
    resolvers: Vec<Rc<dyn VarResolver>>,
}

impl VarExpander {
    /// Constructs a new `VarExpander` with the given variable resolvers.
    pub(crate) fn new<I>(resolvers: I) -> Self
    where
        I: IntoIterator<Item = Rc<dyn VarResolver>>,
    {
        Self {
            resolvers: Vec::from_iter(resolvers),
        }
    }

    /// Constructs the usual `VarExpander`: the given simple variables plus `env.*` for the process environment.
    pub(crate) fn with_env(vars: SimpleVarResolver) -> Self {
        let env_resolver = PrefixedVarResolver::new("env.", Rc::new(OsEnvVarResolver));
        Self::new([Rc::new(vars) as Rc<dyn VarResolver>, Rc::new(env_resolver)])
    }

    /// Expands all known variables in the given string.
    #[tracing::instrument(level = "trace", ret)]
    pub(crate) fn expand<'a, S>(&self, s: &'a S) -> Result<Cow<'a, str>, VarError>
    where
        S: ?Sized + AsRef<str> + fmt::Debug,
    {
        shellexpand::env_with_context(s.as_ref(), |v| self.resolve(v)).map_err(|err| err.cause)
    }

    // Provides the context for `expand`.
    #[doc(hidden)]
    fn resolve(&self, v: &str) -> Result<Option<String>, VarError> {
        for resolver in &self.resolvers {
            if let Ok(value) = resolver.resolve_var(v) {
                return Ok(Some(value));
            }
        }

        Err(VarError::NotPresent(v.to_owned()))
    }
}
