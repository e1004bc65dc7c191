use crate::expr::{self, Expr};
use crate::interpreter::Interpreter;
use crate::lox_result::Result;
use crate::stmt::{self, Stmt};
use crate::token::Token;

use std::cell::RefCell;
use std::collections::HashMap;

use gc::Gc;
use log::trace;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    // Only set for a source-written `<` clause; the synthesized Object
    // superclass does not make a class a subclass for `super` purposes.
    SubClass,
}

/// Walks the tree once, recording for every non-global variable use the
/// number of enclosing frames between the use and its binding. Also the
/// home of the static scope diagnostics.
pub struct Resolver<'a, F>
where
    F: FnMut(&Token, &str),
{
    interpreter: &'a mut Interpreter,
    // false = declared, true = defined.
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    error_handler: RefCell<F>,
}

impl<'a, F> Resolver<'a, F>
where
    F: FnMut(&Token, &str),
{
    pub fn new(interpreter: &'a mut Interpreter, error_handler: F) -> Self {
        Self {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            error_handler: error_handler.into(),
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        self.resolve_stmts(statements)
    }

    fn error(&self, token: &Token, message: &str) {
        (self.error_handler.borrow_mut())(token, message);
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            self.resolve_stmt(statement)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, statement: &Stmt) -> Result<()> {
        match statement {
            Stmt::Block(s) => self.visit_block_stmt(s),
            Stmt::Class(s) => self.visit_class_stmt(s),
            Stmt::Expression(s) => self.visit_expression_stmt(s),
            Stmt::Function(s) => self.visit_function_stmt(s),
            Stmt::If(s) => self.visit_if_stmt(s),
            Stmt::Print(s) => self.visit_print_stmt(s),
            Stmt::Return(s) => self.visit_return_stmt(s),
            Stmt::Var(s) => self.visit_var_stmt(s),
            Stmt::While(s) => self.visit_while_stmt(s),
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Assign(ex) => self.visit_assign_expr(ex),
            Expr::Binary(ex) => self.visit_binary_expr(ex),
            Expr::Call(ex) => self.visit_call_expr(ex),
            Expr::Get(ex) => self.visit_get_expr(ex),
            Expr::Grouping(ex) => self.visit_grouping_expr(ex),
            Expr::Literal(ex) => self.visit_literal_expr(ex),
            Expr::Logical(ex) => self.visit_logical_expr(ex),
            Expr::Set(ex) => self.visit_set_expr(ex),
            Expr::Super(ex) => self.visit_super_expr(ex),
            Expr::This(ex) => self.visit_this_expr(ex),
            Expr::Unary(ex) => self.visit_unary_expr(ex),
            Expr::Variable(ex) => self.visit_variable_expr(ex),
        }
    }

    fn visit_block_stmt(&mut self, stmt: &Gc<stmt::Block>) -> Result<()> {
        self.begin_scope();
        self.resolve_stmts(&stmt.statements)?;
        self.end_scope();

        Ok(())
    }

    fn visit_class_stmt(&mut self, stmt: &Gc<stmt::Class>) -> Result<()> {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&stmt.name);
        self.define(&stmt.name);

        if stmt.has_superclass {
            if stmt.name.lexeme == stmt.superclass.name.lexeme {
                self.error(&stmt.superclass.name, "A class can't inherit from itself.");
            }
            self.current_class = ClassType::SubClass;
        }

        // The superclass name is an ordinary variable use, synthesized
        // Object reference included, so shadowing behaves consistently.
        self.visit_variable_expr(&stmt.superclass)?;

        if stmt.has_superclass {
            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("Scope stack empty after begin_scope.")
                .insert("super".to_owned(), true);
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("Scope stack empty after begin_scope.")
            .insert("this".to_owned(), true);

        for method in &stmt.methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration)?;
        }

        self.end_scope();

        if stmt.has_superclass {
            self.end_scope();
        }

        self.current_class = enclosing_class;

        Ok(())
    }

    fn visit_expression_stmt(&mut self, stmt: &Gc<stmt::Expression>) -> Result<()> {
        self.resolve_expr(&stmt.expression)
    }

    fn visit_function_stmt(&mut self, stmt: &Gc<stmt::Function>) -> Result<()> {
        self.declare(&stmt.name);
        self.define(&stmt.name);

        self.resolve_function(stmt, FunctionType::Function)
    }

    fn visit_if_stmt(&mut self, stmt: &Gc<stmt::If>) -> Result<()> {
        self.resolve_expr(&stmt.condition)?;
        self.resolve_stmt(&stmt.then_branch)?;
        self.resolve_stmt(&stmt.else_branch)
    }

    fn visit_print_stmt(&mut self, stmt: &Gc<stmt::Print>) -> Result<()> {
        self.resolve_expr(&stmt.expression)
    }

    fn visit_return_stmt(&mut self, stmt: &Gc<stmt::Return>) -> Result<()> {
        if self.current_function == FunctionType::None {
            self.error(&stmt.keyword, "Can't return from top-level code.");
        }

        if !stmt.empty && self.current_function == FunctionType::Initializer {
            self.error(&stmt.keyword, "Can't return a value from an initializer.");
        }

        self.resolve_expr(&stmt.value)
    }

    fn visit_var_stmt(&mut self, stmt: &Gc<stmt::Var>) -> Result<()> {
        self.declare(&stmt.name);
        self.resolve_expr(&stmt.initializer)?;
        self.define(&stmt.name);

        Ok(())
    }

    fn visit_while_stmt(&mut self, stmt: &Gc<stmt::While>) -> Result<()> {
        self.resolve_expr(&stmt.condition)?;
        self.resolve_stmt(&stmt.body)
    }

    fn visit_assign_expr(&mut self, expr: &Gc<expr::Assign>) -> Result<()> {
        self.resolve_expr(&expr.value)?;
        self.resolve_local(expr.id(), &expr.name);
        Ok(())
    }

    fn visit_binary_expr(&mut self, expr: &Gc<expr::Binary>) -> Result<()> {
        self.resolve_expr(&expr.left)?;
        self.resolve_expr(&expr.right)
    }

    fn visit_call_expr(&mut self, expr: &Gc<expr::Call>) -> Result<()> {
        self.resolve_expr(&expr.callee)?;

        for argument in &expr.arguments {
            self.resolve_expr(argument)?;
        }

        Ok(())
    }

    fn visit_get_expr(&mut self, expr: &Gc<expr::Get>) -> Result<()> {
        self.resolve_expr(&expr.object)
    }

    fn visit_grouping_expr(&mut self, expr: &Gc<expr::Grouping>) -> Result<()> {
        self.resolve_expr(&expr.expression)
    }

    fn visit_literal_expr(&mut self, _expr: &Gc<expr::Literal>) -> Result<()> {
        Ok(())
    }

    fn visit_logical_expr(&mut self, expr: &Gc<expr::Logical>) -> Result<()> {
        self.resolve_expr(&expr.left)?;
        self.resolve_expr(&expr.right)
    }

    fn visit_set_expr(&mut self, expr: &Gc<expr::Set>) -> Result<()> {
        self.resolve_expr(&expr.value)?;
        self.resolve_expr(&expr.object)
    }

    fn visit_super_expr(&mut self, expr: &Gc<expr::Super>) -> Result<()> {
        if self.current_class == ClassType::None {
            self.error(&expr.keyword, "Can't use 'super' outside of a class.");
        } else if self.current_class != ClassType::SubClass {
            self.error(
                &expr.keyword,
                "Can't use 'super' in a class with no superclass.",
            );
        }

        self.resolve_local(expr.id(), &expr.keyword);
        Ok(())
    }

    fn visit_this_expr(&mut self, expr: &Gc<expr::This>) -> Result<()> {
        if self.current_class == ClassType::None {
            self.error(&expr.keyword, "Can't use 'this' outside of a class.");
            return Ok(());
        }

        self.resolve_local(expr.id(), &expr.keyword);
        Ok(())
    }

    fn visit_unary_expr(&mut self, expr: &Gc<expr::Unary>) -> Result<()> {
        self.resolve_expr(&expr.right)
    }

    fn visit_variable_expr(&mut self, expr: &Gc<expr::Variable>) -> Result<()> {
        if self
            .scopes
            .last()
            .is_some_and(|scope| scope.get(&expr.name.lexeme) == Some(&false))
        {
            self.error(
                &expr.name,
                "Can not read local variable in its own initializer",
            );
        }

        self.resolve_local(expr.id(), &expr.name);
        Ok(())
    }

    fn resolve_function(
        &mut self,
        function: &Gc<stmt::Function>,
        type_: FunctionType,
    ) -> Result<()> {
        let enclosing_function = self.current_function;
        self.current_function = type_;

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&function.body)?;
        self.end_scope();
        self.current_function = enclosing_function;

        Ok(())
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop().expect("Scope stack underflow.");
    }

    fn declare(&mut self, name: &Gc<Token>) {
        if let Some(scope) = self.scopes.last() {
            if scope.contains_key(&name.lexeme) {
                self.error(
                    name,
                    &format!(
                        "Variable with name {} already declared in this scope",
                        name.lexeme
                    ),
                );
            }
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Gc<Token>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, expr_id: usize, name: &Gc<Token>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                trace!("{} resolved at depth {depth}", name.lexeme);
                self.interpreter.resolve(expr_id, depth);
                return;
            }
        }
        // Not found in any local scope: treated as a global.
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::interpreter::{Interpreter, InterpreterOutput};
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    use gc::{Gc, GcCell};

    fn resolver_test(
        source: &str,
        expected_error_count: usize,
        expected_error_message: Option<&str>,
    ) {
        let mut error_count = 0usize;
        let mut error = None;

        let tokens = Scanner::new(source, |_, _| error_count += 1).scan_tokens();

        let statements = Parser::new(tokens, |_, _| {
            error_count += 1;
        })
        .parse();

        // Resolver tests should always scan and parse.
        assert_eq!(error_count, 0);

        let output = Gc::new(GcCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(InterpreterOutput::ByteVec(output));

        Resolver::new(&mut interpreter, |_, message| {
            error_count += 1;
            error = Some(message.to_owned());
        })
        .resolve(&statements)
        .unwrap();

        assert_eq!(error_count, expected_error_count);

        if let Some(expected) = expected_error_message {
            assert_eq!(error.as_deref(), Some(expected));
        }
    }

    #[test]
    fn this_outside_class() {
        resolver_test(
            "print this;",
            1,
            Some("Can't use 'this' outside of a class."),
        );
    }

    #[test]
    fn this_inside_method_is_fine() {
        resolver_test("class C { m() { print this; } }", 0, None);
    }

    #[test]
    fn return_at_top_level() {
        resolver_test("return 1;", 1, Some("Can't return from top-level code."));
    }

    #[test]
    fn bare_return_at_top_level() {
        resolver_test("return;", 1, Some("Can't return from top-level code."));
    }

    #[test]
    fn variable_read_in_its_own_initializer() {
        resolver_test(
            "{ var a = a; }",
            1,
            Some("Can not read local variable in its own initializer"),
        );
    }

    #[test]
    fn global_self_initialization_is_not_diagnosed() {
        // Globals are late-bound; only local scopes get the check.
        resolver_test("var a = a;", 0, None);
    }

    #[test]
    fn redeclaration_in_the_same_scope() {
        resolver_test(
            "{ var a = 1; var a = 2; }",
            1,
            Some("Variable with name a already declared in this scope"),
        );
    }

    #[test]
    fn redeclaration_of_a_global_is_fine() {
        resolver_test("var a = 1; var a = 2;", 0, None);
    }

    #[test]
    fn class_inheriting_from_itself() {
        resolver_test(
            "class Foo < Foo {}",
            1,
            Some("A class can't inherit from itself."),
        );
    }

    #[test]
    fn value_return_from_initializer() {
        resolver_test(
            "class X { init() { return 1; } }",
            1,
            Some("Can't return a value from an initializer."),
        );
    }

    #[test]
    fn bare_return_from_initializer_is_fine() {
        resolver_test("class X { init() { return; } }", 0, None);
    }

    #[test]
    fn super_outside_class() {
        resolver_test(
            "print super.m;",
            1,
            Some("Can't use 'super' outside of a class."),
        );
    }

    #[test]
    fn super_without_declared_superclass() {
        // The implicit Object superclass doesn't count as one.
        resolver_test(
            "class C { m() { super.m(); } }",
            1,
            Some("Can't use 'super' in a class with no superclass."),
        );
    }

    #[test]
    fn super_in_declared_subclass_is_fine() {
        resolver_test("class A {} class B < A { m() { super.m(); } }", 0, None);
    }
}
