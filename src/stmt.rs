use crate::expr::{self, Expr};
use crate::token::Token;

use gc::Gc;

// The parser fully desugars before these are built: `Var` always has an
// initializer, `If` always has an else branch, and `Class` always has a
// superclass expression (`has_superclass` records whether the source
// wrote one). `Return` keeps its `empty` flag for the resolver.
crate::ast_struct!(Stmt, Block, statements, Vec<Stmt>);
crate::ast_struct!(
    Stmt,
    Class,
    name,
    Gc<Token>,
    superclass,
    Gc<expr::Variable>,
    has_superclass,
    bool,
    methods,
    Vec<Gc<Function>>
);
crate::ast_struct!(Stmt, Expression, expression, Expr);
crate::ast_struct!(Stmt, Function, name, Gc<Token>, params, Vec<Gc<Token>>, body, Vec<Stmt>);
crate::ast_struct!(Stmt, If, condition, Expr, then_branch, Stmt, else_branch, Stmt);
crate::ast_struct!(Stmt, Print, expression, Expr);
crate::ast_struct!(Stmt, Return, keyword, Gc<Token>, value, Expr, empty, bool);
crate::ast_struct!(Stmt, Var, name, Gc<Token>, initializer, Expr);
crate::ast_struct!(Stmt, While, condition, Expr, body, Stmt);

crate::ast_enum!(Stmt, Block, Class, Expression, Function, If, Print, Return, Var, While);
