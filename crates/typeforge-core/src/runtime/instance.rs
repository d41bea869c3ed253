//! Instances — objects produced by invoking a type descriptor as a
//! constructor. An instance owns its field map and a back-reference to the
//! type that produced it; everything it does not carry itself resolves live
//! through the chain of ancestor instance tables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::error::DispatchError;
use crate::runtime::value::Value;
use crate::types::descriptor::TypeRef;
use crate::types::dispatch::{find_instance_entry, CallContext, Receiver};

/// Shared handle to an instance. Cheap to clone; identity is pointer
/// identity.
#[derive(Clone)]
pub struct InstanceRef(Rc<Instance>);

pub struct Instance {
    ty: TypeRef,
    fields: RefCell<HashMap<String, Value>>,
}

impl InstanceRef {
    pub(crate) fn new(ty: TypeRef) -> Self {
        Self(Rc::new(Instance { ty, fields: RefCell::new(HashMap::new()) }))
    }

    pub fn ptr_eq(a: &InstanceRef, b: &InstanceRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Invoke a method by name. Ordinary dispatch: the most-derived
    /// definition wins, and the call context records which level it came
    /// from so the body can ask for `base`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let (level, entry) = find_instance_entry(self.ty(), name)
            .ok_or_else(|| DispatchError::undefined(name))?;
        let Value::Method(method) = entry else {
            return Err(DispatchError::not_callable(name));
        };
        let ctx = CallContext::new(Receiver::Instance(self.clone()), level);
        method(&ctx, args)
    }
}

impl Deref for InstanceRef {
    type Target = Instance;

    fn deref(&self) -> &Instance {
        &self.0
    }
}

impl Instance {
    /// The type that produced this instance.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// True for the producing type and every ancestor of it, transitively.
    pub fn is_instance_of(&self, ty: &TypeRef) -> bool {
        let mut current = Some(self.ty.clone());
        while let Some(t) = current {
            if TypeRef::ptr_eq(&t, ty) {
                return true;
            }
            current = t.base_type().cloned();
        }
        false
    }

    /// Read a member: own fields first, then live delegation through the
    /// ancestor instance tables. Mutating an ancestor's table after this
    /// instance was created is visible here.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.fields.borrow().get(name) {
            return Some(v.clone());
        }
        find_instance_entry(&self.ty, name).map(|(_, v)| v)
    }

    /// Write an own field. Shadows any inherited behavior of the same name.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(name.to_string(), value.into());
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance(of type#{}, {} fields)", self.ty.id().0, self.fields.borrow().len())
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
