//! Type descriptors — the factory that synthesizes class-like types at
//! runtime from plain data: a base type, instance behaviors, and type-level
//! behaviors.
//!
//! A descriptor plays two roles at once. Invoked as a constructor
//! ([`TypeRef::construct`]) it produces instances whose members resolve
//! live through the chain of ancestor instance tables. As a value it
//! exposes its type-level behaviors directly: those are copied down from
//! the base type at creation time — a snapshot, deliberately the opposite
//! of the live instance-side delegation — and then overwritten with the
//! explicitly supplied ones. Each copied slot remembers which level
//! introduced it, which is what keeps `base` moving strictly rootward even
//! for inherited type methods.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::DispatchError;
use crate::runtime::instance::InstanceRef;
use crate::runtime::value::Value;
use crate::types::dispatch::{find_instance_entry, CallContext, Receiver};

// ─── Identity ─────────────────────────────────────────────────────────────────

/// Diagnostic identity for a descriptor. Dispatch and `is_instance_of`
/// checks use pointer equality; the id only names levels in logs and
/// locates a slot's introducing level within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u64);

const ROOT_TYPE_ID: TypeId = TypeId(0);

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_type_id() -> TypeId {
    TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
}

// ─── Behaviors ────────────────────────────────────────────────────────────────

/// Named behaviors supplied to [`define`]: methods and plain data values.
/// Order-preserving; a later entry of the same name wins.
#[derive(Clone, Default)]
pub struct Behaviors {
    entries: Vec<(String, Value)>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method behavior.
    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&CallContext, &[Value]) -> Result<Value, DispatchError> + 'static,
    {
        self.entries.push((name.to_string(), Value::Method(Rc::new(f))));
        self
    }

    /// Add a data behavior.
    pub fn value(mut self, name: &str, v: impl Into<Value>) -> Self {
        self.entries.push((name.to_string(), v.into()));
        self
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.entries.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

// ─── Descriptor ───────────────────────────────────────────────────────────────

/// A type-level slot: the value plus the id of the level whose explicit
/// behaviors introduced it. The origin survives the snapshot copy into
/// subtypes, so an inherited method still resolves `base` from the level
/// that defined it.
#[derive(Clone)]
pub(crate) struct TypeSlot {
    pub(crate) value: Value,
    pub(crate) origin: TypeId,
}

/// Shared handle to a type descriptor. Cheap to clone; identity is pointer
/// identity.
#[derive(Clone)]
pub struct TypeRef(Rc<TypeDescriptor>);

pub struct TypeDescriptor {
    id: TypeId,
    /// Immediate base type. `None` exactly for the universal root.
    base: Option<TypeRef>,
    /// Own instance behaviors only — never a flattened copy. Ancestors are
    /// consulted live at lookup time.
    instance_methods: RefCell<HashMap<String, Value>>,
    /// Snapshot of the base's slots taken at creation, overwritten with the
    /// explicit type behaviors.
    type_methods: RefCell<HashMap<String, TypeSlot>>,
}

thread_local! {
    static ROOT: TypeRef = TypeRef(Rc::new(TypeDescriptor {
        id: ROOT_TYPE_ID,
        base: None,
        instance_methods: RefCell::new(HashMap::new()),
        type_methods: RefCell::new(HashMap::new()),
    }));
}

/// The universal root type: no base, empty tables, no-op construction.
/// Used as the default base when [`define`] is given none.
pub fn root() -> TypeRef {
    ROOT.with(TypeRef::clone)
}

impl TypeRef {
    pub fn ptr_eq(a: &TypeRef, b: &TypeRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// True for `other == self` and every ancestor of `self`.
    pub fn is_subtype_of(&self, other: &TypeRef) -> bool {
        let mut current = Some(self.clone());
        while let Some(t) = current {
            if TypeRef::ptr_eq(&t, other) {
                return true;
            }
            current = t.base_type().cloned();
        }
        false
    }

    /// Instantiate. Runs the instance constructor with a fresh dispatch
    /// context bound to this level of the chain.
    pub fn construct(&self, args: &[Value]) -> Result<InstanceRef, DispatchError> {
        trace!(ty = self.id().0, "constructing instance");
        let instance = InstanceRef::new(self.clone());
        match self.instance_entry("initialize") {
            Some(Value::Method(method)) => {
                let ctx = CallContext::new(Receiver::Instance(instance.clone()), self.clone());
                method(&ctx, args)?;
                Ok(instance)
            }
            Some(_) => Err(DispatchError::not_callable("initialize")),
            // The universal root: constructing means a bare instance.
            None => Ok(instance),
        }
    }

    /// Invoke a type-level method. The executing level is the one that
    /// introduced the slot, so `base` inside the body resolves rootward of
    /// the definition even when the slot was inherited by copy.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let slot = self
            .type_slot(name)
            .ok_or_else(|| DispatchError::undefined(name))?;
        let Value::Method(method) = slot.value else {
            return Err(DispatchError::not_callable(name));
        };
        let level = self.level_of(slot.origin);
        let ctx = CallContext::new(Receiver::Type(self.clone()), level);
        method(&ctx, args)
    }

    /// The chain level with the given id, searched from `self` rootward.
    /// Slot origins always lie on the chain of the table that holds them;
    /// the fallback to `self` is unreachable in practice.
    pub(crate) fn level_of(&self, origin: TypeId) -> TypeRef {
        let mut current = Some(self.clone());
        while let Some(t) = current {
            if t.id == origin {
                return t;
            }
            current = t.base_type().cloned();
        }
        self.clone()
    }
}

impl Deref for TypeRef {
    type Target = TypeDescriptor;

    fn deref(&self) -> &TypeDescriptor {
        &self.0
    }
}

impl TypeDescriptor {
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The immediate base type; `None` only for the universal root.
    pub fn base_type(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    /// Read a type-level member from the snapshot table.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.type_methods.borrow().get(name).map(|slot| slot.value.clone())
    }

    /// Write an own type-level member. Snapshots already taken by existing
    /// subtypes are unaffected; subtypes created afterwards copy the new
    /// value.
    pub fn set_type_behavior(&self, name: &str, value: impl Into<Value>) {
        self.type_methods
            .borrow_mut()
            .insert(name.to_string(), TypeSlot { value: value.into(), origin: self.id });
    }

    /// Add or replace an own instance behavior after creation. Existing
    /// instances of this type and of its subtypes see the change, since
    /// instance lookup delegates live.
    pub fn set_instance_behavior(&self, name: &str, value: impl Into<Value>) {
        self.instance_methods.borrow_mut().insert(name.to_string(), value.into());
    }

    pub(crate) fn instance_entry(&self, name: &str) -> Option<Value> {
        self.instance_methods.borrow().get(name).cloned()
    }

    pub(crate) fn type_slot(&self, name: &str) -> Option<TypeSlot> {
        self.type_methods.borrow().get(name).cloned()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Some(b) => write!(f, "Type#{}(base #{})", self.id.0, b.id().0),
            None => write!(f, "Type#{}(root)", self.id.0),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─── The factory ──────────────────────────────────────────────────────────────

/// Synthesize a new type from a base type, instance behaviors, and type
/// behaviors. A missing base defaults to the universal root; missing
/// behaviors default to empty.
///
/// The instance constructor is the explicit `initialize` instance behavior
/// if there is one; otherwise a wrapper delegating to the base type's
/// instance constructor (resolved live at call time); otherwise — when the
/// base is the universal root — a no-op. Whichever it is, it is installed
/// as this level's own `initialize` entry, so it is reachable through
/// `base("initialize")` from subtypes. The type constructor is determined
/// the same way from the type behaviors and runs exactly once, here, with
/// the new type as receiver.
pub fn define(
    base: Option<&TypeRef>,
    instance: Behaviors,
    type_behaviors: Behaviors,
) -> Result<TypeRef, DispatchError> {
    let base = base.cloned().unwrap_or_else(root);
    let id = next_type_id();

    let instance_ctor = match instance.lookup("initialize") {
        Some(v) => v.clone(),
        None => default_instance_ctor(&base),
    };
    let type_ctor = match type_behaviors.lookup("initialize") {
        Some(v) => v.clone(),
        None => default_type_ctor(&base),
    };

    let ty = TypeRef(Rc::new(TypeDescriptor {
        id,
        base: Some(base.clone()),
        instance_methods: RefCell::new(HashMap::new()),
        type_methods: RefCell::new(HashMap::new()),
    }));

    {
        let mut table = ty.instance_methods.borrow_mut();
        for (name, value) in &instance.entries {
            if name != "initialize" {
                table.insert(name.clone(), value.clone());
            }
        }
        table.insert("initialize".to_string(), instance_ctor);
    }

    {
        let mut table = ty.type_methods.borrow_mut();
        // Snapshot: copy every slot of the base, origins included. Later
        // mutation of the base's own slots does not reach this table.
        for (name, slot) in base.type_methods.borrow().iter() {
            table.insert(name.clone(), slot.clone());
        }
        for (name, value) in &type_behaviors.entries {
            if name != "initialize" {
                table.insert(name.clone(), TypeSlot { value: value.clone(), origin: id });
            }
        }
        table.insert("initialize".to_string(), TypeSlot { value: type_ctor, origin: id });
    }

    debug!(id = id.0, base = base.id().0, "defined type");

    // Run the type constructor once, receiver = the new type.
    ty.call("initialize", &[])?;

    Ok(ty)
}

/// Delegating wrapper used when the base is a synthesized type (it then
/// always carries a type-level `initialize` slot). Resolves the base's
/// instance `initialize` at call time, so a table mutated after this type
/// was created is still honored.
fn default_instance_ctor(base: &TypeRef) -> Value {
    if base.type_slot("initialize").is_none() {
        // Base is the universal root: constructing means nothing to run.
        return Value::Method(Rc::new(|_: &CallContext, _: &[Value]| Ok(Value::Null)));
    }
    let base = base.clone();
    Value::Method(Rc::new(move |ctx: &CallContext, args: &[Value]| {
        let (level, entry) = find_instance_entry(&base, "initialize")
            .ok_or_else(|| DispatchError::undefined("initialize"))?;
        let Value::Method(method) = entry else {
            return Err(DispatchError::not_callable("initialize"));
        };
        method(&ctx.at_level(level), args)
    }))
}

/// Same delegation for the type constructor: invoke the base's type-level
/// `initialize` slot, read at call time, executing at the level that
/// introduced it.
fn default_type_ctor(base: &TypeRef) -> Value {
    if base.type_slot("initialize").is_none() {
        return Value::Method(Rc::new(|_: &CallContext, _: &[Value]| Ok(Value::Null)));
    }
    let base = base.clone();
    Value::Method(Rc::new(move |ctx: &CallContext, args: &[Value]| {
        let Some(slot) = base.type_slot("initialize") else {
            return Err(DispatchError::undefined("initialize"));
        };
        let Value::Method(method) = slot.value else {
            return Err(DispatchError::not_callable("initialize"));
        };
        let level = base.level_of(slot.origin);
        method(&ctx.at_level(level), args)
    }))
}
