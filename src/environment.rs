use crate::lox_result::Result;
use crate::object::Object;
use crate::runtime_error::RuntimeError;
use crate::token::Token;

use std::collections::HashMap;

use gc::{Finalize, Gc, GcCell, Trace};

/// A frame in the lexical chain. Cloning is cheap and shares the frame:
/// every closure that captured a scope holds the same `Environment`, and
/// the tracing collector keeps it alive for as long as any of them do
/// (closure/frame cycles included).
#[derive(Clone, Debug, Finalize, Trace)]
pub struct Environment(Gc<GcCell<EnvironmentInternal>>);

impl Environment {
    pub fn new(enclosing: Option<Environment>) -> Self {
        Self(Gc::new(GcCell::new(EnvironmentInternal::new(enclosing))))
    }

    pub fn define(&self, name: &str, value: Object) {
        self.0.borrow_mut().define(name, value)
    }

    /// Chain-walking lookup. Only ever reaches a frame without an
    /// enclosing link for names the resolver classified as global.
    pub fn get(&self, name: &Token) -> Result<Object> {
        self.0.borrow().get(name)
    }

    pub fn assign(&self, name: &Gc<Token>, value: Object) -> Result<()> {
        self.0.borrow_mut().assign(name, value)
    }

    fn ancestor(&self, distance: usize) -> Self {
        if distance == 0 {
            self.clone()
        } else {
            self.0
                .borrow()
                .enclosing
                .as_ref()
                .expect("Environment chain shorter than resolved distance.")
                .ancestor(distance - 1)
        }
    }

    pub fn get_at(&self, distance: usize, name: &str) -> Object {
        self.ancestor(distance).0.borrow().get_at(name, distance)
    }

    pub fn assign_at(&self, distance: usize, name: &Gc<Token>, value: Object) {
        self.ancestor(distance)
            .0
            .borrow_mut()
            .assign_at(name, value);
    }
}

#[derive(Debug, Finalize, Trace)]
struct EnvironmentInternal {
    enclosing: Option<Environment>,
    values: HashMap<String, Object>,
}

impl EnvironmentInternal {
    fn new(enclosing: Option<Environment>) -> Self {
        Self {
            enclosing,
            values: HashMap::new(),
        }
    }

    fn get(&self, name: &Token) -> Result<Object> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.get(name);
        }

        Err(RuntimeError::new(
            Gc::new(name.clone()),
            &format!("Undefined variable {}.", name.lexeme),
        )
        .into())
    }

    fn assign(&mut self, name: &Gc<Token>, value: Object) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.assign(name, value);
        }

        Err(RuntimeError::new(
            name.clone(),
            &format!("Cannot assign value to undefined variable {}.", name.lexeme),
        )
        .into())
    }

    fn define(&mut self, name: &str, value: Object) {
        self.values.insert(name.to_owned(), value);
    }

    fn get_at(&self, name: &str, distance: usize) -> Object {
        self.values
            .get(name)
            .unwrap_or_else(|| {
                panic!("Didn't find local variable {name} at distance {distance}")
            })
            .clone()
    }

    fn assign_at(&mut self, name: &Gc<Token>, value: Object) {
        self.values.insert(name.lexeme.to_owned(), value);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token_type::TokenType;

    fn name_token(name: &str) -> Gc<Token> {
        Gc::new(Token::new(TokenType::Identifier, name, Object::Nil, 1))
    }

    #[test]
    fn define_then_get() {
        let env = Environment::new(None);
        env.define("a", Object::Number(1.0));
        assert_eq!(env.get(&name_token("a")).unwrap(), Object::Number(1.0));
        assert!(env.get(&name_token("b")).is_err());
    }

    #[test]
    fn assignment_mutates_the_defining_frame() {
        let outer = Environment::new(None);
        outer.define("a", Object::Number(1.0));
        let inner = Environment::new(Some(outer.clone()));

        inner.assign(&name_token("a"), Object::Number(2.0)).unwrap();
        assert_eq!(outer.get(&name_token("a")).unwrap(), Object::Number(2.0));

        assert!(inner.assign(&name_token("b"), Object::Nil).is_err());
    }

    #[test]
    fn resolved_access_walks_exactly_the_given_distance() {
        let outer = Environment::new(None);
        outer.define("a", Object::String("outer".to_owned()));
        let inner = Environment::new(Some(outer.clone()));
        inner.define("a", Object::String("inner".to_owned()));

        assert_eq!(inner.get_at(0, "a"), Object::String("inner".to_owned()));
        assert_eq!(inner.get_at(1, "a"), Object::String("outer".to_owned()));

        inner.assign_at(1, &name_token("a"), Object::String("updated".to_owned()));
        assert_eq!(outer.get_at(0, "a"), Object::String("updated".to_owned()));
    }
}
