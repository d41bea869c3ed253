//! Per-invocation dispatch context and `base` resolution.
//!
//! Every method invocation builds a fresh [`CallContext`] recording two
//! things: the receiver the body runs against, and the chain level whose
//! table defines the executing body. `base(name)` starts one level rootward
//! of that recorded level and scans toward the root for the nearest
//! definition of `name`, skipping levels that do not override it. Because
//! the level travels with the context instead of being recovered from the
//! call stack, resolution stays correct across arbitrarily long chains and
//! across levels that never mention the method at all.
//!
//! The same mechanism serves both sides of the symmetry: instance dispatch
//! walks the ancestors' own instance tables; type dispatch walks the
//! ancestors' snapshot type tables, and the slot found there carries the
//! level that originally introduced it, so nested `base` calls keep moving
//! strictly rootward.

use tracing::trace;

use crate::error::DispatchError;
use crate::runtime::instance::InstanceRef;
use crate::runtime::value::{MethodFn, Value};
use crate::types::descriptor::TypeRef;

// ─── Receiver ─────────────────────────────────────────────────────────────────

/// What a method runs against: an instance, or a type object itself.
#[derive(Clone)]
pub enum Receiver {
    Instance(InstanceRef),
    Type(TypeRef),
}

impl Receiver {
    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Receiver::Instance(i) => Some(i),
            Receiver::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Receiver::Instance(_) => None,
            Receiver::Type(t) => Some(t),
        }
    }
}

// ─── Call context ─────────────────────────────────────────────────────────────

/// The per-invocation context handed to every behavior body.
pub struct CallContext {
    receiver: Receiver,
    /// The chain level whose table defines the executing body.
    level: TypeRef,
}

impl CallContext {
    pub(crate) fn new(receiver: Receiver, level: TypeRef) -> Self {
        Self { receiver, level }
    }

    pub(crate) fn at_level(&self, level: TypeRef) -> Self {
        Self { receiver: self.receiver.clone(), level }
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Read a member on the receiver. Instances consult own fields then the
    /// live chain of instance tables; types consult their snapshot table.
    pub fn get(&self, name: &str) -> Option<Value> {
        match &self.receiver {
            Receiver::Instance(i) => i.get(name),
            Receiver::Type(t) => t.get(name),
        }
    }

    /// Write a member on the receiver: an own instance field, or an own
    /// type-level slot (snapshots already taken by subtypes are unaffected).
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        match &self.receiver {
            Receiver::Instance(i) => i.set(name, value),
            Receiver::Type(t) => t.set_type_behavior(name, value),
        }
    }

    /// Ordinary dispatch on the receiver: the most-derived definition wins,
    /// regardless of the level currently executing.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, DispatchError> {
        match &self.receiver {
            Receiver::Instance(i) => i.call(name, args),
            Receiver::Type(t) => t.call(name, args),
        }
    }

    /// Resolve the nearest ancestor implementation of `name`, relative to
    /// the level that is currently executing — never this level itself, and
    /// never anything more derived, even when intermediate levels do not
    /// override `name`.
    pub fn base(&self, name: &str) -> Result<BoundMethod, DispatchError> {
        let start = self.level.base_type().cloned();
        let resolved = match &self.receiver {
            Receiver::Instance(_) => start.and_then(|s| find_instance_entry(&s, name)),
            Receiver::Type(_) => start.and_then(|s| find_type_slot(&s, name)),
        };
        match resolved {
            Some((level, Value::Method(method))) => {
                trace!(
                    method = name,
                    from = self.level.id().0,
                    to = level.id().0,
                    "resolved base method"
                );
                Ok(BoundMethod { receiver: self.receiver.clone(), level, method })
            }
            Some((_, _)) => Err(DispatchError::not_callable(name)),
            None => Err(DispatchError::no_such_base(name)),
        }
    }
}

// ─── Bound method ─────────────────────────────────────────────────────────────

/// An ancestor implementation resolved by [`CallContext::base`], bound to
/// the original receiver.
pub struct BoundMethod {
    receiver: Receiver,
    level: TypeRef,
    method: MethodFn,
}

impl BoundMethod {
    /// Invoke the resolved implementation with the caller's arguments
    /// forwarded unchanged. The body executes at the level it was defined
    /// at, so its own `base` calls continue rootward from there.
    pub fn call(&self, args: &[Value]) -> Result<Value, DispatchError> {
        let ctx = CallContext::new(self.receiver.clone(), self.level.clone());
        (self.method)(&ctx, args)
    }
}

// ─── Chain walks ──────────────────────────────────────────────────────────────

/// Nearest own instance-table entry at or rootward of `start`, together
/// with the level that defines it. Lookup is live: entries added to an
/// ancestor after a subtype was created are found here.
pub(crate) fn find_instance_entry(start: &TypeRef, name: &str) -> Option<(TypeRef, Value)> {
    let mut current = Some(start.clone());
    while let Some(t) = current {
        if let Some(v) = t.instance_entry(name) {
            return Some((t, v));
        }
        current = t.base_type().cloned();
    }
    None
}

/// Nearest type-table slot at or rootward of `start`. Type tables are
/// snapshots, so the slot may have been introduced further rootward than
/// the table it was found in; the returned level is the introducing one.
pub(crate) fn find_type_slot(start: &TypeRef, name: &str) -> Option<(TypeRef, Value)> {
    let mut current = Some(start.clone());
    while let Some(t) = current {
        if let Some(slot) = t.type_slot(name) {
            let level = t.level_of(slot.origin);
            return Some((level, slot.value));
        }
        current = t.base_type().cloned();
    }
    None
}
