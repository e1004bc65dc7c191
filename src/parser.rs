use crate::expr::{self, Expr};
use crate::object::Object;
use crate::stmt::{self, Stmt};
use crate::token::Token;
use crate::token_type::TokenType;
use crate::token_type::TokenType as TT;

use std::cell::RefCell;

use anyhow::Result;
use gc::Gc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("parse error")]
struct ParseError;

pub struct Parser<F>
where
    F: FnMut(&Token, &str),
{
    tokens: Vec<Gc<Token>>,
    current: RefCell<usize>,
    error_handler: RefCell<F>,
}

impl<F> Parser<F>
where
    F: FnMut(&Token, &str),
{
    pub fn new(tokens: Vec<Gc<Token>>, error_handler: F) -> Self {
        Self {
            tokens,
            current: 0.into(),
            error_handler: error_handler.into(),
        }
    }

    /// Parses the whole token stream. Errors are reported through the
    /// handler and recovered from at declaration granularity; a tree is
    /// always produced, but the caller must discard it if any diagnostic
    /// fired.
    pub fn parse(self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }

    fn declaration(&self) -> Option<Stmt> {
        let result = if self.match_(&[TT::Class]) {
            self.class_declaration()
        } else if self.match_(&[TT::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_(&[TT::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&self) -> Result<Stmt> {
        let name = self.consume(TT::Identifier, "Expect class name.")?.clone();

        // A class without a `<` clause still gets a superclass expression:
        // a synthesized reference to the global root class `Object`.
        // `has_superclass` stays false so the resolver knows the source
        // never wrote one.
        let (superclass, has_superclass) = if self.match_(&[TT::Less]) {
            let superclass_name =
                self.consume(TT::Identifier, "Expect superclass name.")?.clone();
            (Gc::new(expr::Variable::new(superclass_name)), true)
        } else {
            let object = Gc::new(Token::new(TT::Identifier, "Object", Object::Nil, name.line));
            (Gc::new(expr::Variable::new(object)), false)
        };

        self.consume(TT::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TT::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TT::RightBrace, "Expect '}' after class body.")?;

        Ok(stmt::Class::make(name, superclass, has_superclass, methods))
    }

    fn function(&self, kind: &str) -> Result<Gc<stmt::Function>> {
        let name = self
            .consume(TT::Identifier, &format!("Expect {kind} name."))?
            .clone();
        self.consume(TT::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = Vec::new();
        if !self.check(TT::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TT::Identifier, "Expect parameter name.")?.clone());
                if !self.match_(&[TT::Comma]) {
                    break;
                }
            }
        }
        self.consume(TT::RightParen, "Expect ')' after parameters.")?;

        self.consume(TT::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;

        Ok(Gc::new(stmt::Function::new(name, params, body)))
    }

    fn var_declaration(&self) -> Result<Stmt> {
        let name = self.consume(TT::Identifier, "Expect variable name.")?.clone();

        let initializer = if self.match_(&[TT::Equal]) {
            self.expression()?
        } else {
            expr::Literal::make(Object::Nil)
        };

        self.consume(TT::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(stmt::Var::make(name, initializer))
    }

    fn statement(&self) -> Result<Stmt> {
        if self.match_(&[TT::For]) {
            return self.for_statement();
        }
        if self.match_(&[TT::If]) {
            return self.if_statement();
        }
        if self.match_(&[TT::Print]) {
            return self.print_statement();
        }
        if self.match_(&[TT::Return]) {
            return self.return_statement();
        }
        if self.match_(&[TT::While]) {
            return self.while_statement();
        }
        if self.match_(&[TT::LeftBrace]) {
            return Ok(stmt::Block::make(self.block()?));
        }
        self.expression_statement()
    }

    /// `for` is pure sugar: the loop is rewritten to a `while` inside a
    /// block, with missing clauses replaced by neutral defaults.
    fn for_statement(&self) -> Result<Stmt> {
        self.consume(TT::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_(&[TT::Semicolon]) {
            stmt::Block::make(Vec::new())
        } else if self.match_(&[TT::Var]) {
            self.var_declaration()?
        } else {
            self.expression_statement()?
        };

        let condition = if self.check(TT::Semicolon) {
            expr::Literal::make(Object::Boolean(true))
        } else {
            self.expression()?
        };
        self.consume(TT::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TT::RightParen) {
            expr::Literal::make(Object::Nil)
        } else {
            self.expression()?
        };
        self.consume(TT::RightParen, "Expect ')' after for clauses.")?;

        let body = self.statement()?;
        let body = stmt::Block::make(vec![body, stmt::Expression::make(increment)]);
        let loop_ = stmt::While::make(condition, body);
        Ok(stmt::Block::make(vec![initializer, loop_]))
    }

    fn if_statement(&self) -> Result<Stmt> {
        self.consume(TT::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TT::RightParen, "Expect ')' after if condition.")?;

        let then_branch = self.statement()?;
        let else_branch = if self.match_(&[TT::Else]) {
            self.statement()?
        } else {
            stmt::Block::make(Vec::new())
        };

        Ok(stmt::If::make(condition, then_branch, else_branch))
    }

    fn print_statement(&self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(TT::Semicolon, "Expect ';' after value.")?;
        Ok(stmt::Print::make(value))
    }

    fn return_statement(&self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        // A bare `return;` yields nil; the `empty` flag survives so the
        // resolver can still tell it apart from `return nil;` inside an
        // initializer.
        let (value, empty) = if self.check(TT::Semicolon) {
            (expr::Literal::make(Object::Nil), true)
        } else {
            (self.expression()?, false)
        };

        self.consume(TT::Semicolon, "Expect ';' after return value.")?;
        Ok(stmt::Return::make(keyword, value, empty))
    }

    fn while_statement(&self) -> Result<Stmt> {
        self.consume(TT::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TT::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;

        Ok(stmt::While::make(condition, body))
    }

    fn block(&self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TT::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.consume(TT::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(TT::Semicolon, "Expect ';' after expression.")?;
        Ok(stmt::Expression::make(expr))
    }

    fn expression(&self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&self) -> Result<Expr> {
        let expr = self.or()?;

        if self.match_(&[TT::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match &expr {
                Expr::Variable(target) => {
                    return Ok(expr::Assign::make(target.name.clone(), value));
                }
                Expr::Get(target) => {
                    return Ok(expr::Set::make(
                        target.object.clone(),
                        target.name.clone(),
                        value,
                    ));
                }
                // Report but don't unwind; the parse position is already
                // past the right-hand side.
                _ => {
                    self.error(&equals, "Invalid assignment target.");
                }
            }
        }

        Ok(expr)
    }

    fn or(&self) -> Result<Expr> {
        let mut expr = self.and()?;

        while self.match_(&[TT::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = expr::Logical::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn and(&self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.match_(&[TT::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = expr::Logical::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn equality(&self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.match_(&[TT::BangEqual, TT::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = expr::Binary::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.match_(&[TT::Greater, TT::GreaterEqual, TT::Less, TT::LessEqual]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = expr::Binary::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&self) -> Result<Expr> {
        let mut expr = self.factor()?;

        // String concatenation `++` binds exactly like `+` and `-`.
        while self.match_(&[TT::Minus, TT::Plus, TT::PlusPlus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = expr::Binary::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.match_(&[TT::Slash, TT::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = expr::Binary::make(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&self) -> Result<Expr> {
        if self.match_(&[TT::Bang, TT::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(expr::Unary::make(operator, right));
        }

        self.call()
    }

    fn call(&self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_(&[TT::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_(&[TT::Dot]) {
                let name = self
                    .consume(TT::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = expr::Get::make(expr, name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&self, callee: Expr) -> Result<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TT::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_(&[TT::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TT::RightParen, "Expect ')' after arguments.")?.clone();
        Ok(expr::Call::make(callee, paren, arguments))
    }

    fn primary(&self) -> Result<Expr> {
        if self.match_(&[TT::False]) {
            return Ok(expr::Literal::make(Object::Boolean(false)));
        }
        if self.match_(&[TT::True]) {
            return Ok(expr::Literal::make(Object::Boolean(true)));
        }
        if self.match_(&[TT::Nil]) {
            return Ok(expr::Literal::make(Object::Nil));
        }

        if self.match_(&[TT::Number, TT::String]) {
            return Ok(expr::Literal::make(self.previous().literal.clone()));
        }

        if self.match_(&[TT::Super]) {
            let keyword = self.previous().clone();
            self.consume(TT::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(TT::Identifier, "Expect superclass method name.")?
                .clone();
            return Ok(expr::Super::make(keyword, method));
        }

        if self.match_(&[TT::This]) {
            return Ok(expr::This::make(self.previous().clone()));
        }

        if self.match_(&[TT::Identifier]) {
            return Ok(expr::Variable::make(self.previous().clone()));
        }

        if self.match_(&[TT::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TT::RightParen, "Expect ')' after expression.")?;
            return Ok(expr::Grouping::make(expr));
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expect expression.").into())
    }

    fn match_(&self, types: &[TokenType]) -> bool {
        for type_ in types {
            if self.check(type_.clone()) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&self, type_: TokenType, message: &str) -> Result<&Gc<Token>> {
        if self.check(type_) {
            return Ok(self.advance());
        }

        let token = self.peek().clone();
        Err(self.error(&token, message).into())
    }

    fn check(&self, type_: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().type_ == type_
    }

    fn advance(&self) -> &Gc<Token> {
        if !self.is_at_end() {
            *self.current.borrow_mut() += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().type_ == TT::Eof
    }

    fn peek(&self) -> &Gc<Token> {
        &self.tokens[*self.current.borrow()]
    }

    fn previous(&self) -> &Gc<Token> {
        &self.tokens[*self.current.borrow() - 1]
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        (self.error_handler.borrow_mut())(token, message);
        ParseError
    }

    /// Skips forward to a likely statement boundary after a parse error.
    fn synchronize(&self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().type_ == TT::Semicolon {
                return;
            }

            match self.peek().type_ {
                TT::Class
                | TT::Fun
                | TT::Var
                | TT::For
                | TT::If
                | TT::While
                | TT::Print
                | TT::Return => {
                    return;
                }
                _ => self.advance(),
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pretty_printer::AstPrinter;
    use crate::scanner::Scanner;

    use std::cell::RefCell;

    fn parse_source(source: &str, expected_error_count: usize) -> Vec<Stmt> {
        let error_count = RefCell::new(0usize);
        let tokens = Scanner::new(source, |_, _| {
            *error_count.borrow_mut() += 1;
        })
        .scan_tokens();
        assert_eq!(*error_count.borrow(), 0);

        let statements = Parser::new(tokens, |_, _| {
            *error_count.borrow_mut() += 1;
        })
        .parse();
        assert_eq!(*error_count.borrow(), expected_error_count);
        statements
    }

    #[test]
    fn simple_expr() {
        let error_count = RefCell::new(0usize);

        let tokens = vec![
            Gc::new(Token::new(TT::LeftParen, "(", Object::Nil, 1)),
            Gc::new(Token::new(TT::Number, "1", Object::Number(1.0), 1)),
            Gc::new(Token::new(TT::Plus, "+", Object::Nil, 1)),
            Gc::new(Token::new(TT::Number, "2", Object::Number(2.0), 1)),
            Gc::new(Token::new(TT::Minus, "-", Object::Nil, 1)),
            Gc::new(Token::new(TT::Number, "0.5", Object::Number(0.5), 1)),
            Gc::new(Token::new(TT::RightParen, ")", Object::Nil, 1)),
            Gc::new(Token::new(TT::Star, "*", Object::Nil, 1)),
            Gc::new(Token::new(TT::Minus, "-", Object::Nil, 1)),
            Gc::new(Token::new(TT::Number, "4", Object::Number(4.0), 1)),
            Gc::new(Token::new(TT::Semicolon, ";", Object::Nil, 1)),
            Gc::new(Token::new(TT::Eof, "", Object::Nil, 1)),
        ];

        let statements = Parser::new(tokens, |_, _| {
            *error_count.borrow_mut() += 1;
        })
        .parse();

        assert_eq!(*error_count.borrow(), 0);

        if let Stmt::Expression(expr_statement) = &statements[0] {
            assert_eq!(
                AstPrinter::print(&expr_statement.expression),
                "(* (group (- (+ 1 2) 0.5)) (- 4))"
            );
        } else {
            panic!("Expected an expression statement");
        }
    }

    #[test]
    fn concatenation_binds_like_term() {
        let statements = parse_source(r#"print "a" ++ "b" ++ "c";"#, 0);
        if let Stmt::Print(print) = &statements[0] {
            assert_eq!(AstPrinter::print(&print.expression), "(++ (++ a b) c)");
        } else {
            panic!("Expected a print statement");
        }
    }

    #[test]
    fn var_without_initializer_desugars_to_nil() {
        let statements = parse_source("var x;", 0);
        if let Stmt::Var(var) = &statements[0] {
            assert_eq!(var.name.lexeme, "x");
            assert!(
                matches!(&var.initializer, Expr::Literal(l) if l.value == Object::Nil)
            );
        } else {
            panic!("Expected a var statement");
        }
    }

    #[test]
    fn if_without_else_desugars_to_empty_block() {
        let statements = parse_source("if (true) print 1;", 0);
        if let Stmt::If(if_) = &statements[0] {
            assert!(
                matches!(&if_.else_branch, Stmt::Block(b) if b.statements.is_empty())
            );
        } else {
            panic!("Expected an if statement");
        }
    }

    #[test]
    fn bare_for_desugars_to_while_true() {
        let statements = parse_source("for (;;) {}", 0);
        let Stmt::Block(outer) = &statements[0] else {
            panic!("Expected the outer block");
        };
        assert_eq!(outer.statements.len(), 2);
        assert!(
            matches!(&outer.statements[0], Stmt::Block(b) if b.statements.is_empty())
        );
        let Stmt::While(loop_) = &outer.statements[1] else {
            panic!("Expected the while loop");
        };
        assert!(
            matches!(&loop_.condition, Expr::Literal(l) if l.value == Object::Boolean(true))
        );
        let Stmt::Block(body) = &loop_.body else {
            panic!("Expected the loop body block");
        };
        assert_eq!(body.statements.len(), 2);
        assert!(matches!(
            &body.statements[1],
            Stmt::Expression(e) if matches!(&e.expression, Expr::Literal(l) if l.value == Object::Nil)
        ));
    }

    #[test]
    fn empty_return_keeps_its_flag() {
        let statements = parse_source("fun f() { return; }", 0);
        let Stmt::Function(function) = &statements[0] else {
            panic!("Expected a function statement");
        };
        let Stmt::Return(return_) = &function.body[0] else {
            panic!("Expected a return statement");
        };
        assert!(return_.empty);
        assert!(matches!(&return_.value, Expr::Literal(l) if l.value == Object::Nil));
    }

    #[test]
    fn class_without_superclass_references_object() {
        let statements = parse_source("class A { }", 0);
        let Stmt::Class(class) = &statements[0] else {
            panic!("Expected a class statement");
        };
        assert!(!class.has_superclass);
        assert_eq!(class.superclass.name.lexeme, "Object");
    }

    #[test]
    fn class_with_superclass() {
        let statements = parse_source("class B < A { m() { } }", 0);
        let Stmt::Class(class) = &statements[0] else {
            panic!("Expected a class statement");
        };
        assert!(class.has_superclass);
        assert_eq!(class.superclass.name.lexeme, "A");
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].name.lexeme, "m");
    }

    #[test]
    fn invalid_assignment_target() {
        parse_source("1 = 2;", 1);
    }

    #[test]
    fn super_requires_a_method_access() {
        parse_source("class B < A { m() { super; } }", 1);
    }

    #[test]
    fn too_many_arguments() {
        let args = (0..=255).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
        parse_source(&format!("f({args});"), 1);
    }
}
