use crate::interpreter::{Interpreter, InterpreterOutput};
use crate::object::Object;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::runtime_error::RuntimeError;
use crate::scanner::Scanner;
use crate::token::Token;
use crate::token_type::TokenType;

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::process;

use anyhow::Result;
use log::debug;

pub struct Lox {
    lox: LoxInternal,
    interpreter: Interpreter,
}

impl Lox {
    pub fn new() -> Self {
        Self {
            lox: LoxInternal::new(),
            interpreter: Interpreter::new(InterpreterOutput::StdOut),
        }
    }

    pub fn run_file(&mut self, path: &str) -> Result<()> {
        self.lox.run_file(path, &mut self.interpreter)
    }

    pub fn run_prompt(&mut self) -> Result<()> {
        self.lox.run_prompt(&mut self.interpreter)
    }
}

struct LoxInternal {
    had_error: RefCell<bool>,
    had_runtime_error: RefCell<bool>,
}

impl LoxInternal {
    fn new() -> Self {
        Self {
            had_error: false.into(),
            had_runtime_error: false.into(),
        }
    }

    fn run_file(&self, path: &str, interpreter: &mut Interpreter) -> Result<()> {
        let bytes = fs::read(path)?;
        let _ = self.run(&String::from_utf8(bytes)?, interpreter);
        if *self.had_error.borrow() {
            process::exit(65);
        }
        if *self.had_runtime_error.borrow() {
            process::exit(70);
        }
        Ok(())
    }

    /// The interpreter carries over between lines, so globals persist;
    /// the error flags do not. An empty line ends the session.
    fn run_prompt(&self, interpreter: &mut Interpreter) -> Result<()> {
        let mut line = String::new();
        loop {
            print!("> ");
            io::stdout().flush()?;
            match io::stdin().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if line.trim().is_empty() {
                        break;
                    }
                    if let Some(value) = self.run(&line, interpreter) {
                        println!("{value}");
                    }
                    *self.had_error.borrow_mut() = false;
                    *self.had_runtime_error.borrow_mut() = false;
                }
                Err(error) => eprintln!("IO error: {error}"),
            }
            line.clear();
        }

        // Don't leave a dangling prompt line on exit.
        println!();
        Ok(())
    }

    /// Runs the pipeline over one source chunk. Yields the value of the
    /// last statement, or None if any stage diagnosed an error.
    fn run(&self, source: &str, interpreter: &mut Interpreter) -> Option<Object> {
        let tokens = Scanner::new(source, |line, message| self.line_error(line, message))
            .scan_tokens();
        debug!("scanned {} tokens", tokens.len());

        let statements = Parser::new(tokens, |token, message| {
            self.token_error(token, message)
        })
        .parse();
        debug!("parsed {} statements", statements.len());

        // A tree recovered from parse errors is not worth resolving.
        if *self.had_error.borrow() {
            return None;
        }

        Resolver::new(interpreter, |token, message| {
            self.token_error(token, message)
        })
        .resolve(&statements)
        .expect("Unexpected resolve error.");

        if *self.had_error.borrow() {
            return None;
        }

        interpreter.interpret(&statements, |error| self.runtime_error(error))
    }

    fn line_error(&self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    fn report(&self, line: usize, where_: &str, message: &str) {
        eprintln!("[line {line}] Error{where_}: {message}");
        *self.had_error.borrow_mut() = true;
    }

    fn token_error(&self, token: &Token, message: &str) {
        if token.type_ == TokenType::Eof {
            self.report(token.line, " at end", message);
        } else {
            self.report(token.line, &format!(" at {}", token.lexeme), message);
        }
    }

    fn runtime_error(&self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        *self.had_runtime_error.borrow_mut() = true;
    }
}
