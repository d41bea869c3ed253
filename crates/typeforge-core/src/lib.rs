//! Runtime type synthesis: build class-like types from plain data — a base
//! type, a set of instance behaviors, a set of type-level behaviors — with
//! multi-level single inheritance and `base` dispatch on both instances and
//! the type objects themselves.
//!
//! ```
//! use typeforge_core::{define, Behaviors, Value};
//!
//! let counter = define(
//!     None,
//!     Behaviors::new()
//!         .method("initialize", |ctx, _args| {
//!             ctx.set("count", 0.0);
//!             Ok(Value::Null)
//!         })
//!         .method("bump", |ctx, _args| {
//!             let n = ctx.get("count").and_then(|v| v.as_float()).unwrap_or(0.0);
//!             ctx.set("count", n + 1.0);
//!             Ok(Value::Null)
//!         }),
//!     Behaviors::new(),
//! )
//! .unwrap();
//!
//! let c = counter.construct(&[]).unwrap();
//! c.call("bump", &[]).unwrap();
//! assert_eq!(c.get("count").and_then(|v| v.as_float()), Some(1.0));
//! ```

pub mod error;
pub mod runtime;
pub mod types;

pub use error::DispatchError;
pub use runtime::instance::{Instance, InstanceRef};
pub use runtime::value::{value_type_name, MethodFn, Value};
pub use types::descriptor::{Behaviors, TypeDescriptor, TypeId, TypeRef};
pub use types::dispatch::{BoundMethod, CallContext, Receiver};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Synthesize a new type. The sole constructive entry point: a missing
/// `base` defaults to the universal root, missing behaviors to empty. The
/// type constructor runs here, once, with the new type as receiver.
pub fn define(
    base: Option<&TypeRef>,
    instance: Behaviors,
    type_behaviors: Behaviors,
) -> Result<TypeRef, DispatchError> {
    types::descriptor::define(base, instance, type_behaviors)
}

/// The universal root type — the implicit top of every inheritance chain.
pub fn root() -> TypeRef {
    types::descriptor::root()
}
