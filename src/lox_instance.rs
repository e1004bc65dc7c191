use crate::lox_callable::LoxCallable;
use crate::lox_class::LoxClass;
use crate::lox_result::Result;
use crate::object::Object;
use crate::runtime_error::RuntimeError;
use crate::token::Token;

use std::collections::HashMap;
use std::fmt;

use gc::{Finalize, Gc, GcCell, Trace};

/// An instance: a class reference plus a mutable field table. Cloning
/// shares the instance; equality is reference identity.
#[derive(Clone, Debug, Finalize, Trace)]
pub struct LoxInstance(Gc<GcCell<InstanceInternal>>);

#[derive(Debug, Finalize, Trace)]
struct InstanceInternal {
    class: LoxClass,
    fields: HashMap<String, Object>,
}

impl LoxInstance {
    pub fn new(class: LoxClass) -> Self {
        Self(Gc::new(GcCell::new(InstanceInternal {
            class,
            fields: HashMap::new(),
        })))
    }

    /// Fields shadow methods; a found method comes back bound to this
    /// instance.
    pub fn get(&self, name: &Gc<Token>) -> Result<Object> {
        if let Some(value) = self.0.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = self.0.borrow().class.clone();
        if let Some(method) = class.find_method(&name.lexeme) {
            return Ok(Object::Callable(Gc::new(LoxCallable::Function(
                method.bind(self.clone()),
            ))));
        }

        Err(RuntimeError::new(
            name.clone(),
            &format!("Undefined property {}.", name.lexeme),
        )
        .into())
    }

    pub fn set(&self, name: &Gc<Token>, value: Object) {
        self.0
            .borrow_mut()
            .fields
            .insert(name.lexeme.to_owned(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} instance", self.0.borrow().class.name())
    }
}

impl PartialEq for LoxInstance {
    fn eq(&self, other: &Self) -> bool {
        Gc::ptr_eq(&self.0, &other.0)
    }
}
