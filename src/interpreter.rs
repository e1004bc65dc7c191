use crate::environment::Environment;
use crate::expr::{self, Expr};
use crate::lox_callable::{Clock, LoxCallable};
use crate::lox_class::LoxClass;
use crate::lox_function::LoxFunction;
use crate::lox_result::Result;
use crate::lox_return::Return;
use crate::object::Object::{
    self, Boolean as OBoolean, Callable as OCallable, Class as OClass,
    Instance as OInstance, Nil as ONil, Number as ONumber, String as OString,
};
use crate::runtime_error::RuntimeError;
use crate::stmt::{self, Stmt};
use crate::token::Token;
use crate::token_type::TokenType as TT;

use std::collections::HashMap;
use std::io::Write;

use gc::{Finalize, Gc, GcCell, Trace};
use log::debug;

#[derive(Clone, Finalize, Trace)]
pub enum InterpreterOutput {
    StdOut,
    #[allow(unused)]
    ByteVec(Gc<GcCell<Vec<u8>>>),
}

#[derive(Finalize, Trace)]
pub struct Interpreter {
    pub globals: Environment,
    environment: Environment,
    // Resolution side-table: expression id -> lexical distance to the
    // defining frame. Expressions absent from the table are globals.
    locals: HashMap<usize, usize>,
    output: InterpreterOutput,
}

impl Interpreter {
    pub fn new(output: InterpreterOutput) -> Self {
        let globals = Environment::new(None);

        globals.define(
            "clock",
            OCallable(Gc::new(LoxCallable::Clock(Clock::new()))),
        );
        // The root class: implicit superclass of every class declared
        // without a `<` clause.
        globals.define("Object", OClass(LoxClass::new("Object", None, HashMap::new())));

        Self {
            globals: globals.clone(),
            environment: globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Runs the program and yields the value of its last statement, for
    /// the REPL to echo. A runtime error goes to the handler and aborts
    /// the run.
    pub fn interpret<F>(&mut self, statements: &[Stmt], mut error_handler: F) -> Option<Object>
    where
        F: FnMut(&RuntimeError),
    {
        let mut value = ONil;
        for statement in statements {
            match self.execute(statement) {
                Ok(v) => value = v,
                Err(error) => {
                    let error = error
                        .downcast_ref::<RuntimeError>()
                        .expect("Unexpected error.");
                    debug!("runtime error at line {}: {}", error.token.line, error.message);
                    (error_handler)(error);
                    return None;
                }
            }
        }
        Some(value)
    }

    pub fn resolve(&mut self, expr_id: usize, depth: usize) {
        self.locals.insert(expr_id, depth);
    }

    /// Expression statements yield their expression's value; every other
    /// statement yields nil.
    fn execute(&mut self, stmt: &Stmt) -> Result<Object> {
        match stmt {
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

    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Environment,
    ) -> Result<()> {
        let previous = self.environment.clone();
        self.environment = environment;

        for statement in statements {
            if let Err(error) = self.execute(statement) {
                self.environment = previous;
                return Err(error);
            }
        }

        self.environment = previous;
        Ok(())
    }

    fn visit_block_stmt(&mut self, stmt: &Gc<stmt::Block>) -> Result<Object> {
        self.execute_block(
            &stmt.statements,
            Environment::new(Some(self.environment.clone())),
        )?;
        Ok(ONil)
    }

    fn visit_class_stmt(&mut self, stmt: &Gc<stmt::Class>) -> Result<Object> {
        let superclass = match &self.visit_variable_expr(&stmt.superclass)? {
            OClass(superclass) => superclass.clone(),
            _ => {
                return Err(RuntimeError::new(
                    stmt.superclass.name.clone(),
                    "Super class must be a class.",
                )
                .into())
            }
        };

        self.environment.define(&stmt.name.lexeme, ONil);

        // Methods of a declared subclass close over one extra frame
        // holding `super`; the synthesized Object superclass gets none.
        let enclosing = self.environment.clone();
        if stmt.has_superclass {
            self.environment = Environment::new(Some(self.environment.clone()));
            self.environment.define("super", OClass(superclass.clone()));
        }

        let mut methods = HashMap::new();
        for method in &stmt.methods {
            let function = LoxFunction::new(
                method.clone(),
                self.environment.clone(),
                method.name.lexeme == "init",
            );
            methods.insert(method.name.lexeme.clone(), function);
        }

        let class = LoxClass::new(&stmt.name.lexeme, Some(superclass), methods);

        if stmt.has_superclass {
            self.environment = enclosing;
        }

        self.environment.assign(&stmt.name, OClass(class))?;
        Ok(ONil)
    }

    fn visit_expression_stmt(&mut self, stmt: &Gc<stmt::Expression>) -> Result<Object> {
        self.evaluate(&stmt.expression)
    }

    fn visit_function_stmt(&mut self, stmt: &Gc<stmt::Function>) -> Result<Object> {
        let function = LoxFunction::new(stmt.clone(), self.environment.clone(), false);
        self.environment.define(
            &stmt.name.lexeme,
            OCallable(Gc::new(LoxCallable::Function(function))),
        );
        Ok(ONil)
    }

    fn visit_if_stmt(&mut self, stmt: &Gc<stmt::If>) -> Result<Object> {
        if is_truthy(&self.evaluate(&stmt.condition)?) {
            self.execute(&stmt.then_branch)?;
        } else {
            self.execute(&stmt.else_branch)?;
        }
        Ok(ONil)
    }

    fn visit_print_stmt(&mut self, stmt: &Gc<stmt::Print>) -> Result<Object> {
        let value = self.evaluate(&stmt.expression)?;
        match &self.output {
            InterpreterOutput::ByteVec(buffer) => writeln!(buffer.borrow_mut(), "{value}")?,
            InterpreterOutput::StdOut => println!("{value}"),
        }
        Ok(ONil)
    }

    fn visit_return_stmt(&mut self, stmt: &Gc<stmt::Return>) -> Result<Object> {
        let value = self.evaluate(&stmt.value)?;
        Err(Return::new(value).into())
    }

    fn visit_var_stmt(&mut self, stmt: &Gc<stmt::Var>) -> Result<Object> {
        let value = self.evaluate(&stmt.initializer)?;
        self.environment.define(&stmt.name.lexeme, value);
        Ok(ONil)
    }

    fn visit_while_stmt(&mut self, stmt: &Gc<stmt::While>) -> Result<Object> {
        while is_truthy(&self.evaluate(&stmt.condition)?) {
            self.execute(&stmt.body)?;
        }
        Ok(ONil)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Object> {
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

    fn visit_assign_expr(&mut self, expr: &Gc<expr::Assign>) -> Result<Object> {
        let value = self.evaluate(&expr.value)?;

        if let Some(distance) = self.locals.get(&expr.id()) {
            self.environment
                .assign_at(*distance, &expr.name, value.clone());
        } else {
            self.globals.assign(&expr.name, value.clone())?;
        }

        Ok(value)
    }

    fn visit_binary_expr(&mut self, expr: &Gc<expr::Binary>) -> Result<Object> {
        let left = self.evaluate(&expr.left)?;
        let right = self.evaluate(&expr.right)?;

        let object = match expr.operator.type_ {
            TT::BangEqual => OBoolean(!is_equal(&left, &right)),
            TT::EqualEqual => OBoolean(is_equal(&left, &right)),
            TT::Greater => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                OBoolean(l > r)
            }
            TT::GreaterEqual => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                OBoolean(l >= r)
            }
            TT::Less => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                OBoolean(l < r)
            }
            TT::LessEqual => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                OBoolean(l <= r)
            }
            TT::Minus => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                ONumber(l - r)
            }
            TT::Plus => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                ONumber(l + r)
            }
            TT::PlusPlus => match (&left, &right) {
                (OString(l), OString(r)) => OString(l.to_owned() + r.as_str()),
                _ => {
                    return Err(RuntimeError::new(
                        expr.operator.clone(),
                        "Operands must be strings.",
                    )
                    .into())
                }
            },
            TT::Slash => {
                // Division by zero is IEEE-754's problem, not ours.
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                ONumber(l / r)
            }
            TT::Star => {
                let (l, r) = check_number_operands(&expr.operator, &left, &right)?;
                ONumber(l * r)
            }
            _ => unreachable!(),
        };
        Ok(object)
    }

    fn visit_call_expr(&mut self, expr: &Gc<expr::Call>) -> Result<Object> {
        let callee = self.evaluate(&expr.callee)?;

        let arguments = {
            let mut arguments = Vec::new();
            for argument in &expr.arguments {
                arguments.push(self.evaluate(argument)?);
            }
            arguments
        };

        match &callee {
            OCallable(function) => {
                check_arity(function.arity(), arguments.len(), &expr.paren)?;
                function.call(self, &arguments)
            }
            OClass(class) => {
                check_arity(class.arity(), arguments.len(), &expr.paren)?;
                class.construct(self, &arguments)
            }
            _ => Err(RuntimeError::new(
                expr.paren.clone(),
                "Only functions and classes are callable.",
            )
            .into()),
        }
    }

    fn visit_get_expr(&mut self, expr: &Gc<expr::Get>) -> Result<Object> {
        match &self.evaluate(&expr.object)? {
            OInstance(instance) => instance.get(&expr.name),
            _ => Err(RuntimeError::new(
                expr.name.clone(),
                "Can not access property from a non-instance value.",
            )
            .into()),
        }
    }

    fn visit_grouping_expr(&mut self, expr: &Gc<expr::Grouping>) -> Result<Object> {
        self.evaluate(&expr.expression)
    }

    fn visit_literal_expr(&mut self, expr: &Gc<expr::Literal>) -> Result<Object> {
        Ok(expr.value.clone())
    }

    fn visit_logical_expr(&mut self, expr: &Gc<expr::Logical>) -> Result<Object> {
        let left = self.evaluate(&expr.left)?;

        match expr.operator.type_ {
            TT::Or => {
                if is_truthy(&left) {
                    return Ok(left);
                }
            }
            TT::And => {
                if !is_truthy(&left) {
                    return Ok(left);
                }
            }
            _ => unreachable!(),
        }

        self.evaluate(&expr.right)
    }

    fn visit_set_expr(&mut self, expr: &Gc<expr::Set>) -> Result<Object> {
        match &self.evaluate(&expr.object)? {
            OInstance(instance) => {
                let value = self.evaluate(&expr.value)?;
                instance.set(&expr.name, value.clone());
                Ok(value)
            }
            _ => Err(RuntimeError::new(expr.name.clone(), "Only objects have fields").into()),
        }
    }

    fn visit_super_expr(&mut self, expr: &Gc<expr::Super>) -> Result<Object> {
        let distance = *self
            .locals
            .get(&expr.id())
            .expect("Unresolved 'super' expression.");

        // The frame holding `this` sits directly inside the one holding
        // `super`.
        let superclass = match &self.environment.get_at(distance, "super") {
            OClass(superclass) => superclass.clone(),
            _ => unreachable!(),
        };
        let instance = match &self.environment.get_at(distance - 1, "this") {
            OInstance(instance) => instance.clone(),
            _ => unreachable!(),
        };

        let method = superclass.find_method(&expr.method.lexeme).ok_or_else(|| {
            RuntimeError::new(
                expr.method.clone(),
                &format!("Undefined method {}.", expr.method.lexeme),
            )
        })?;

        Ok(OCallable(Gc::new(LoxCallable::Function(
            method.bind(instance),
        ))))
    }

    fn visit_this_expr(&mut self, expr: &Gc<expr::This>) -> Result<Object> {
        self.look_up_variable(&expr.keyword, expr.id())
    }

    fn visit_unary_expr(&mut self, expr: &Gc<expr::Unary>) -> Result<Object> {
        let right = self.evaluate(&expr.right)?;

        match expr.operator.type_ {
            TT::Bang => Ok(OBoolean(!is_truthy(&right))),
            TT::Minus => {
                let r = check_number_operand(&expr.operator, &right)?;
                Ok(ONumber(-r))
            }
            _ => unreachable!(),
        }
    }

    fn visit_variable_expr(&mut self, expr: &Gc<expr::Variable>) -> Result<Object> {
        self.look_up_variable(&expr.name, expr.id())
    }

    fn look_up_variable(&self, name: &Gc<Token>, expr_id: usize) -> Result<Object> {
        if let Some(distance) = self.locals.get(&expr_id) {
            Ok(self.environment.get_at(*distance, &name.lexeme))
        } else {
            self.globals.get(name)
        }
    }
}

fn check_arity(arity: usize, provided: usize, paren: &Gc<Token>) -> Result<()> {
    if provided != arity {
        return Err(RuntimeError::new(
            paren.clone(),
            &format!("Expected {arity} arguments but got {provided}."),
        )
        .into());
    }
    Ok(())
}

fn check_number_operand(operator: &Gc<Token>, operand: &Object) -> Result<f64> {
    if let ONumber(value) = operand {
        Ok(*value)
    } else {
        Err(RuntimeError::new(operator.clone(), "Operand must be a number.").into())
    }
}

fn check_number_operands(
    operator: &Gc<Token>,
    left: &Object,
    right: &Object,
) -> Result<(f64, f64)> {
    if let (ONumber(l), ONumber(r)) = (left, right) {
        Ok((*l, *r))
    } else {
        Err(RuntimeError::new(operator.clone(), "Operands must be numbers.").into())
    }
}

fn is_truthy(object: &Object) -> bool {
    match object {
        ONil => false,
        OBoolean(b) => *b,
        _ => true,
    }
}

fn is_equal(a: &Object, b: &Object) -> bool {
    a == b
}
