use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::lox_instance::LoxInstance;
use crate::lox_result::Result;
use crate::lox_return::Return;
use crate::object::Object;
use crate::stmt;
use crate::unique_id::unique_id;

use std::fmt;
use std::iter::zip;

use gc::{Finalize, Gc, Trace};

#[derive(Clone, Debug, Finalize, Trace)]
pub struct LoxFunction {
    is_initializer: bool,
    closure: Environment,
    declaration: Gc<stmt::Function>,
    id: usize,
}

impl LoxFunction {
    pub fn new(
        declaration: Gc<stmt::Function>,
        closure: Environment,
        is_initializer: bool,
    ) -> Self {
        Self {
            is_initializer,
            closure,
            declaration,
            id: unique_id(),
        }
    }

    /// Produces the bound method: the same declaration, closed over one
    /// extra frame that defines `this`.
    pub fn bind(&self, instance: LoxInstance) -> LoxFunction {
        let environment = Environment::new(Some(self.closure.clone()));
        environment.define("this", Object::Instance(instance));
        LoxFunction::new(self.declaration.clone(), environment, self.is_initializer)
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Object],
    ) -> Result<Object> {
        let environment = Environment::new(Some(self.closure.clone()));
        for (param, argument) in zip(self.declaration.params.iter(), arguments.iter()) {
            environment.define(&param.lexeme, argument.clone());
        }

        if let Err(error) = interpreter.execute_block(&self.declaration.body, environment) {
            if let Some(return_signal) = error.downcast_ref::<Return>() {
                // An initializer always yields the instance, even on a
                // bare `return;`.
                if self.is_initializer {
                    return Ok(self.closure.get_at(0, "this"));
                }
                return Ok(return_signal.value.clone());
            }
            return Err(error);
        }

        if self.is_initializer {
            return Ok(self.closure.get_at(0, "this"));
        }

        Ok(Object::Nil)
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}
