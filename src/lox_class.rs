use crate::interpreter::Interpreter;
use crate::lox_function::LoxFunction;
use crate::lox_instance::LoxInstance;
use crate::lox_result::Result;
use crate::object::Object;
use crate::unique_id::unique_id;

use std::collections::HashMap;
use std::fmt;

use gc::{Finalize, Gc, Trace};

/// A class object. Cloning shares the definition; equality is identity.
#[derive(Clone, Debug, Finalize, Trace)]
pub struct LoxClass(Gc<ClassInternal>);

#[derive(Debug, Finalize, Trace)]
struct ClassInternal {
    name: String,
    superclass: Option<LoxClass>,
    methods: HashMap<String, LoxFunction>,
    id: usize,
}

impl LoxClass {
    pub fn new(
        name: &str,
        superclass: Option<LoxClass>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        Self(Gc::new(ClassInternal {
            name: name.to_owned(),
            superclass,
            methods,
            id: unique_id(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.0.methods.get(name) {
            return Some(method.clone());
        }
        self.0
            .superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Constructing takes whatever the initializer takes.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    pub fn construct(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Object],
    ) -> Result<Object> {
        let instance = LoxInstance::new(self.clone());
        if let Some(initializer) = self.find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }
        Ok(Object::Instance(instance))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PartialEq for LoxClass {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
