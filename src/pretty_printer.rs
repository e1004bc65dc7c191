use crate::expr::Expr;

/// Lisp-style rendering of an expression tree, for tests and debugging.
#[allow(unused)]
pub struct AstPrinter;

impl AstPrinter {
    #[allow(unused)]
    pub fn print(expr: &Expr) -> String {
        visit(expr)
    }
}

#[allow(unused)]
fn visit(expr: &Expr) -> String {
    match expr {
        Expr::Assign(ex) => group(&ex.name.lexeme, &[&ex.value]),
        Expr::Binary(ex) => group(&ex.operator.lexeme, &[&ex.left, &ex.right]),
        Expr::Call(ex) => {
            let mut parts: Vec<&Expr> = vec![&ex.callee];
            parts.extend(ex.arguments.iter());
            group("call", &parts)
        }
        Expr::Get(ex) => group(&format!("get {}", ex.name.lexeme), &[&ex.object]),
        Expr::Grouping(ex) => group("group", &[&ex.expression]),
        Expr::Literal(ex) => ex.value.to_string(),
        Expr::Logical(ex) => group(&ex.operator.lexeme, &[&ex.left, &ex.right]),
        Expr::Set(ex) => {
            group(&format!("set {}", ex.name.lexeme), &[&ex.object, &ex.value])
        }
        Expr::Super(ex) => format!("(super {})", ex.method.lexeme),
        Expr::This(ex) => ex.keyword.lexeme.to_string(),
        Expr::Unary(ex) => group(&ex.operator.lexeme, &[&ex.right]),
        Expr::Variable(ex) => ex.name.lexeme.to_string(),
    }
}

#[allow(unused)]
fn group(name: &str, children: &[&Expr]) -> String {
    let mut rendered = String::from("(");
    rendered.push_str(name);
    for child in children {
        rendered.push(' ');
        rendered.push_str(&visit(child));
    }
    rendered.push(')');
    rendered
}

#[cfg(test)]
mod test {
    use crate::expr::{Binary, Call, Grouping, Literal, Super, Unary, Variable};
    use crate::{object::Object, token::Token, token_type::TokenType};

    use super::*;

    use gc::Gc;

    fn token(type_: TokenType, lexeme: &str) -> Gc<Token> {
        Gc::new(Token::new(type_, lexeme, Object::Nil, 1))
    }

    #[test]
    fn print_exprs() {
        let expr = Binary::make(
            Unary::make(
                token(TokenType::Minus, "-"),
                Literal::make(Object::Number(123.0)),
            ),
            token(TokenType::Star, "*"),
            Grouping::make(Literal::make(Object::Number(45.67))),
        );
        assert_eq!(
            AstPrinter::print(&expr).as_str(),
            "(* (- 123) (group 45.67))"
        );
    }

    #[test]
    fn print_call_with_arguments() {
        let expr = Call::make(
            Variable::make(token(TokenType::Identifier, "f")),
            token(TokenType::RightParen, ")"),
            vec![
                Literal::make(Object::Number(1.0)),
                Literal::make(Object::String("x".to_owned())),
            ],
        );
        assert_eq!(AstPrinter::print(&expr).as_str(), "(call f 1 x)");
    }

    #[test]
    fn print_super_access() {
        let expr = Super::make(
            token(TokenType::Super, "super"),
            token(TokenType::Identifier, "greet"),
        );
        assert_eq!(AstPrinter::print(&expr).as_str(), "(super greet)");
    }
}
