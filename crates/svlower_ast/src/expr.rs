//! Expression and assignment-target AST nodes.
//!
//! Expressions and LHSs are separate families: an [`Lhs`] is the restricted
//! shape legal on the left of an assignment or in a sensitivity list.
//! [`expr_to_lhs`] and [`lhs_to_expr`] convert between the two where the
//! shapes overlap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decl::Type;

/// A design identifier. Identifiers are plain strings: conversion passes
/// manufacture new names constantly (mangles, synthetic packages, repair
/// nets), and rendering goes through `Display` with no side state.
pub type Identifier = String;

/// A packed or unpacked dimension `[msb:lsb]`.
pub type Range = (Expr, Expr);

// ============================================================================
// Expressions
// ============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A simple identifier.
    Ident(Identifier),
    /// A package-scoped identifier (e.g., `pkg::name`).
    PkgIdent(Identifier, Identifier),
    /// A class-scoped identifier with parameter bindings
    /// (e.g., `cls#(8)::name`).
    ClassIdent(Identifier, Vec<ParamBinding>, Identifier),
    /// A numeric literal, preserved as source text (e.g., `8'hff`).
    Number(String),
    /// A real literal, preserved as source text.
    Real(String),
    /// A time literal, preserved as source text (e.g., `10ns`).
    Time(String),
    /// A string literal, stored without the surrounding quotes.
    StringLit(String),
    /// A bit select (e.g., `data[7]`).
    Bit(Box<Expr>, Box<Expr>),
    /// A part select (e.g., `data[7:0]`, `data[i+:4]`).
    RangeSel(Box<Expr>, PartSelectMode, Box<Range>),
    /// A member access (e.g., `bus.valid`).
    Dot(Box<Expr>, Identifier),
    /// A concatenation (e.g., `{a, b, c}`).
    Concat(Vec<Expr>),
    /// A replication (e.g., `{3{a}}`).
    Repeat(Box<Expr>, Vec<Expr>),
    /// A function or task call.
    Call(Box<Expr>, Vec<Expr>),
    /// A unary operation.
    UniOp(UniOp, Box<Expr>),
    /// A binary operation.
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// A conditional expression (e.g., `sel ? a : b`).
    Mux(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A cast (e.g., `int'(x)`, `8'(x)`).
    Cast(Box<TypeOrExpr>, Box<Expr>),
    /// The absent expression: an unconnected port or a parameter with no
    /// default.
    Nil,
}

/// The addressing mode of a part select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartSelectMode {
    /// `[msb:lsb]`
    Constant,
    /// `[base+:width]`
    IndexedPlus,
    /// `[base-:width]`
    IndexedMinus,
}

/// A parameter binding in an instantiation or class specialization.
///
/// An empty `param` name marks a positional binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBinding {
    /// The formal parameter name, or empty for positional.
    pub param: Identifier,
    /// The bound value.
    pub value: TypeOrExpr,
}

/// Either a type or an expression, for positions accepting both
/// (casts, type parameter bindings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeOrExpr {
    /// A type value.
    Type(Type),
    /// An expression value.
    Expr(Expr),
}

// ============================================================================
// Assignment targets
// ============================================================================

/// An assignment target: the restricted expression shape legal on the left
/// of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lhs {
    /// A simple identifier.
    Ident(Identifier),
    /// A bit select.
    Bit(Box<Lhs>, Expr),
    /// A part select.
    Range(Box<Lhs>, PartSelectMode, Box<Range>),
    /// A member access.
    Dot(Box<Lhs>, Identifier),
    /// A concatenation of targets.
    Concat(Vec<Lhs>),
}

impl Lhs {
    /// Returns the base identifier this target ultimately writes, or
    /// `None` for concatenations.
    pub fn base_ident(&self) -> Option<&Identifier> {
        match self {
            Lhs::Ident(x) => Some(x),
            Lhs::Bit(base, _) | Lhs::Range(base, _, _) | Lhs::Dot(base, _) => base.base_ident(),
            Lhs::Concat(_) => None,
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniOp {
    /// `+` (unary plus)
    Plus,
    /// `-` (unary minus)
    Minus,
    /// `!` (logical NOT)
    LogNot,
    /// `~` (bitwise NOT)
    BitNot,
    /// `&` (reduction AND)
    RedAnd,
    /// `~&` (reduction NAND)
    RedNand,
    /// `|` (reduction OR)
    RedOr,
    /// `~|` (reduction NOR)
    RedNor,
    /// `^` (reduction XOR)
    RedXor,
    /// `~^` (reduction XNOR)
    RedXnor,
}

impl UniOp {
    /// Returns the operator's surface syntax.
    pub fn symbol(self) -> &'static str {
        match self {
            UniOp::Plus => "+",
            UniOp::Minus => "-",
            UniOp::LogNot => "!",
            UniOp::BitNot => "~",
            UniOp::RedAnd => "&",
            UniOp::RedNand => "~&",
            UniOp::RedOr => "|",
            UniOp::RedNor => "~|",
            UniOp::RedXor => "^",
            UniOp::RedXnor => "~^",
        }
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===`
    CaseEq,
    /// `!==`
    CaseNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    LogAnd,
    /// `||`
    LogOr,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `~^`
    BitXnor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<<<`
    AShl,
    /// `>>>`
    AShr,
}

impl BinOp {
    /// Returns the operator's surface syntax.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::CaseEq => "===",
            BinOp::CaseNe => "!==",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::LogAnd => "&&",
            BinOp::LogOr => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitXnor => "~^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::AShl => "<<<",
            BinOp::AShr => ">>>",
        }
    }
}

/// An assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsgnOp {
    /// Blocking `=`.
    Eq,
    /// Non-blocking `<=`.
    NonBlocking,
    /// Compound `op=` (e.g., `+=`).
    BinOp(BinOp),
}

// ============================================================================
// Conversions
// ============================================================================

/// Converts an expression to an assignment target where the shapes
/// overlap, or `None` for non-lvalue expressions.
pub fn expr_to_lhs(expr: &Expr) -> Option<Lhs> {
    match expr {
        Expr::Ident(x) => Some(Lhs::Ident(x.clone())),
        Expr::Bit(base, idx) => Some(Lhs::Bit(Box::new(expr_to_lhs(base)?), (**idx).clone())),
        Expr::RangeSel(base, mode, range) => Some(Lhs::Range(
            Box::new(expr_to_lhs(base)?),
            *mode,
            range.clone(),
        )),
        Expr::Dot(base, field) => Some(Lhs::Dot(Box::new(expr_to_lhs(base)?), field.clone())),
        Expr::Concat(items) => {
            let targets = items.iter().map(expr_to_lhs).collect::<Option<Vec<_>>>()?;
            Some(Lhs::Concat(targets))
        }
        _ => None,
    }
}

/// Converts an assignment target back into the equivalent expression.
pub fn lhs_to_expr(lhs: &Lhs) -> Expr {
    match lhs {
        Lhs::Ident(x) => Expr::Ident(x.clone()),
        Lhs::Bit(base, idx) => Expr::Bit(Box::new(lhs_to_expr(base)), Box::new(idx.clone())),
        Lhs::Range(base, mode, range) => {
            Expr::RangeSel(Box::new(lhs_to_expr(base)), *mode, range.clone())
        }
        Lhs::Dot(base, field) => Expr::Dot(Box::new(lhs_to_expr(base)), field.clone()),
        Lhs::Concat(items) => Expr::Concat(items.iter().map(lhs_to_expr).collect()),
    }
}

/// Best-effort conversion of an expression used in a type position to the
/// type it names. Returns `None` when the expression does not denote a
/// type.
pub fn expr_to_type(expr: &Expr) -> Option<Type> {
    match expr {
        Expr::Ident(x) => Some(Type::Alias(x.clone(), Vec::new())),
        Expr::PkgIdent(pkg, x) => Some(Type::PkgAlias(pkg.clone(), x.clone(), Vec::new())),
        Expr::ClassIdent(cls, bindings, x) => Some(Type::ClassAlias(
            cls.clone(),
            bindings.clone(),
            x.clone(),
            Vec::new(),
        )),
        Expr::RangeSel(base, PartSelectMode::Constant, range) => {
            let ty = expr_to_type(base)?;
            match ty {
                Type::Alias(x, mut rs) => {
                    rs.push((**range).clone());
                    Some(Type::Alias(x, rs))
                }
                Type::PkgAlias(p, x, mut rs) => {
                    rs.push((**range).clone());
                    Some(Type::PkgAlias(p, x, rs))
                }
                Type::ClassAlias(c, b, x, mut rs) => {
                    rs.push((**range).clone());
                    Some(Type::ClassAlias(c, b, x, rs))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders a sub-expression, parenthesizing compound operands.
fn operand(expr: &Expr) -> String {
    match expr {
        Expr::UniOp(..) | Expr::BinOp(..) | Expr::Mux(..) => format!("({expr})"),
        _ => format!("{expr}"),
    }
}

fn comma_separated<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(x) => write!(f, "{x}"),
            Expr::PkgIdent(pkg, x) => write!(f, "{pkg}::{x}"),
            Expr::ClassIdent(cls, bindings, x) => {
                write!(f, "{cls}#({})::{x}", comma_separated(bindings))
            }
            Expr::Number(text) | Expr::Real(text) | Expr::Time(text) => write!(f, "{text}"),
            Expr::StringLit(text) => write!(f, "\"{text}\""),
            Expr::Bit(base, idx) => write!(f, "{}[{idx}]", operand(base)),
            Expr::RangeSel(base, mode, range) => {
                write!(f, "{}[{}{}{}]", operand(base), range.0, mode, range.1)
            }
            Expr::Dot(base, field) => write!(f, "{}.{field}", operand(base)),
            Expr::Concat(items) => write!(f, "{{{}}}", comma_separated(items)),
            Expr::Repeat(count, items) => {
                write!(f, "{{{}{{{}}}}}", operand(count), comma_separated(items))
            }
            Expr::Call(func, args) => write!(f, "{func}({})", comma_separated(args)),
            Expr::UniOp(op, arg) => write!(f, "{}{}", op.symbol(), operand(arg)),
            Expr::BinOp(op, lhs, rhs) => {
                write!(f, "{} {} {}", operand(lhs), op.symbol(), operand(rhs))
            }
            Expr::Mux(cond, then_e, else_e) => write!(
                f,
                "{} ? {} : {}",
                operand(cond),
                operand(then_e),
                operand(else_e)
            ),
            Expr::Cast(target, value) => write!(f, "{target}'({value})"),
            Expr::Nil => Ok(()),
        }
    }
}

impl fmt::Display for PartSelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartSelectMode::Constant => write!(f, ":"),
            PartSelectMode::IndexedPlus => write!(f, "+:"),
            PartSelectMode::IndexedMinus => write!(f, "-:"),
        }
    }
}

impl fmt::Display for Lhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lhs::Ident(x) => write!(f, "{x}"),
            Lhs::Bit(base, idx) => write!(f, "{base}[{idx}]"),
            Lhs::Range(base, mode, range) => {
                write!(f, "{base}[{}{}{}]", range.0, mode, range.1)
            }
            Lhs::Dot(base, field) => write!(f, "{base}.{field}"),
            Lhs::Concat(items) => write!(f, "{{{}}}", comma_separated(items)),
        }
    }
}

impl fmt::Display for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.param.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, ".{}({})", self.param, self.value)
        }
    }
}

impl fmt::Display for TypeOrExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeOrExpr::Type(ty) => write!(f, "{ty}"),
            TypeOrExpr::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for AsgnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsgnOp::Eq => write!(f, "="),
            AsgnOp::NonBlocking => write!(f, "<="),
            AsgnOp::BinOp(op) => write!(f, "{}=", op.symbol()),
        }
    }
}
