//! Expression AST and the recursive-descent parser/evaluator that builds
//! and interprets it (spec §4.7).

pub mod eval;
pub mod functions;
pub mod parse;

use crate::pattern::PatternChain;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StringPredOp {
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum QuantifierKind {
    Any,
    All,
    None,
    Single,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Param {
    Name(String),
    Index(u64),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Parameter(Param),
    Variable(String),
    Property {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        target: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
    },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Chained comparison: `a < b < c` desugars to pairs `[(a,Lt,b), (b,Lt,c)]`
    /// ANDed together (spec §4.7 step 10).
    Comparison(Vec<(Expr, CompareOp)>, Box<Expr>),
    StringPredicate {
        op: StringPredOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull {
        operand: Box<Expr>,
        negated: bool,
    },
    In {
        item: Box<Expr>,
        list: Box<Expr>,
    },
    LabelCheck {
        target: Box<Expr>,
        labels: Vec<String>,
    },
    PatternPredicate(Box<PatternChain>),
    List(Vec<Expr>),
    ListComprehension {
        variable: String,
        list: Box<Expr>,
        where_expr: Option<Box<Expr>>,
        map_expr: Option<Box<Expr>>,
    },
    PatternComprehension {
        pattern: Box<PatternChain>,
        where_expr: Option<Box<Expr>>,
        map_expr: Box<Expr>,
    },
    Map(Vec<(String, Expr)>),
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
    },
    ExistsSubquery(Box<crate::ast::Query>),
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    Quantifier {
        kind: QuantifierKind,
        variable: String,
        list: Box<Expr>,
        predicate: Box<Expr>,
    },
}

/// A parsed expression together with the source span it came from, used by
/// ORDER BY / projection caching and by error reporting.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SpannedExpr {
    pub expr: Expr,
    pub span: Span,
    pub text: String,
}
