use thiserror::Error;

/// Runtime dispatch failures.
///
/// All failures are local to the call that raised them and propagate to the
/// caller of the method that attempted the lookup. An unresolvable `base`
/// call is a defect in the type hierarchy definition, not a transient
/// condition — nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// `base(name)` found no definition of `name` rootward of the level that
    /// is currently executing.
    #[error("no ancestor level defines `{method}`")]
    NoSuchBase { method: String },

    /// The receiver (and its whole ancestor chain) has no member of this name.
    #[error("`{name}` is not defined")]
    Undefined { name: String },

    /// The member exists but is a data value, not a method.
    #[error("`{name}` is not callable")]
    NotCallable { name: String },
}

impl DispatchError {
    pub fn no_such_base(method: impl Into<String>) -> Self {
        Self::NoSuchBase { method: method.into() }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        Self::Undefined { name: name.into() }
    }

    pub fn not_callable(name: impl Into<String>) -> Self {
        Self::NotCallable { name: name.into() }
    }
}
