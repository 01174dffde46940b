//! Procedural statement AST nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decl::Decl;
use crate::expr::{AsgnOp, Expr, Identifier, Lhs};
use crate::indent;

/// A statement in a procedural context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// A `begin ... end` block, optionally named, with leading
    /// declarations.
    Block {
        /// Optional block label.
        name: Option<Identifier>,
        /// Declarations at the head of the block.
        decls: Vec<Decl>,
        /// The statements in the block.
        stmts: Vec<Stmt>,
    },
    /// An assignment, blocking, non-blocking, or compound, with optional
    /// intra-assignment timing.
    Asgn {
        /// The assignment operator.
        op: AsgnOp,
        /// Optional intra-assignment timing control.
        timing: Option<Timing>,
        /// The assignment target.
        lhs: Lhs,
        /// The assigned expression.
        expr: Expr,
    },
    /// An `if` statement; the else branch is [`Stmt::Null`] when absent.
    If {
        /// The condition.
        cond: Expr,
        /// The then branch.
        then_stmt: Box<Stmt>,
        /// The else branch.
        else_stmt: Box<Stmt>,
    },
    /// A `for` loop.
    For {
        /// Loop initializations, as target/value pairs.
        inits: Vec<(Lhs, Expr)>,
        /// The loop condition.
        cond: Expr,
        /// Loop step assignments.
        steps: Vec<(Lhs, AsgnOp, Expr)>,
        /// The loop body.
        body: Box<Stmt>,
    },
    /// A `while` loop.
    While(Expr, Box<Stmt>),
    /// A statement under a timing control (e.g., `@(posedge clk) ...`).
    Timing(Timing, Box<Stmt>),
    /// A `case`, `casex`, or `casez` statement.
    Case {
        /// The case keyword.
        kind: CaseKw,
        /// The matched expression.
        expr: Expr,
        /// The case arms; an arm with no match expressions is `default`.
        arms: Vec<CaseArm>,
    },
    /// A task or system task invocation (e.g., `$readmemh("f", mem);`).
    Subroutine(Expr, Vec<Expr>),
    /// A comment emitted verbatim; semantically inert.
    Comment(String),
    /// The null statement.
    Null,
}

/// A timing control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timing {
    /// An event control `@(...)`.
    Event(Sense),
    /// A delay control `#expr`.
    Delay(Expr),
}

/// A sensitivity expression inside an event control.
///
/// Sense terms reference signals as [`Lhs`] shapes; these are reads, not
/// assignment targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// A level-sensitive term.
    Lhs(Lhs),
    /// Two senses joined by `or`.
    Or(Box<Sense>, Box<Sense>),
    /// A `posedge` term.
    Posedge(Lhs),
    /// A `negedge` term.
    Negedge(Lhs),
    /// The implicit `@*` sensitivity.
    Star,
}

/// The kind of a case statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseKw {
    /// `case`
    Case,
    /// `casex`
    Casex,
    /// `casez`
    Casez,
}

impl CaseKw {
    fn keyword(self) -> &'static str {
        match self {
            CaseKw::Case => "case",
            CaseKw::Casex => "casex",
            CaseKw::Casez => "casez",
        }
    }
}

/// One arm of a case statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseArm {
    /// The match expressions; empty marks the `default` arm.
    pub exprs: Vec<Expr>,
    /// The arm body.
    pub stmt: Stmt,
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Block { name, decls, stmts } => {
                match name {
                    Some(name) => writeln!(f, "begin : {name}")?,
                    None => writeln!(f, "begin")?,
                }
                for decl in decls {
                    writeln!(f, "{}", indent(&decl.to_string()))?;
                }
                for stmt in stmts {
                    writeln!(f, "{}", indent(&stmt.to_string()))?;
                }
                write!(f, "end")
            }
            Stmt::Asgn {
                op,
                timing,
                lhs,
                expr,
            } => match timing {
                Some(timing) => write!(f, "{lhs} {op} {timing} {expr};"),
                None => write!(f, "{lhs} {op} {expr};"),
            },
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                write!(f, "if ({cond}) {then_stmt}")?;
                if **else_stmt != Stmt::Null {
                    write!(f, "\nelse {else_stmt}")?;
                }
                Ok(())
            }
            Stmt::For {
                inits,
                cond,
                steps,
                body,
            } => {
                let inits = inits
                    .iter()
                    .map(|(lhs, expr)| format!("{lhs} = {expr}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let steps = steps
                    .iter()
                    .map(|(lhs, op, expr)| format!("{lhs} {op} {expr}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "for ({inits}; {cond}; {steps}) {body}")
            }
            Stmt::While(cond, body) => write!(f, "while ({cond}) {body}"),
            Stmt::Timing(timing, stmt) => write!(f, "{timing} {stmt}"),
            Stmt::Case { kind, expr, arms } => {
                writeln!(f, "{} ({expr})", kind.keyword())?;
                for arm in arms {
                    writeln!(f, "{}", indent(&arm.to_string()))?;
                }
                write!(f, "endcase")
            }
            Stmt::Subroutine(name, args) => {
                if args.is_empty() {
                    write!(f, "{name};")
                } else {
                    let args = args
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "{name}({args});")
                }
            }
            Stmt::Comment(text) => write!(f, "// {text}"),
            Stmt::Null => write!(f, ";"),
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timing::Event(Sense::Star) => write!(f, "@*"),
            Timing::Event(sense) => write!(f, "@({sense})"),
            Timing::Delay(expr) => write!(f, "#{expr}"),
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Lhs(lhs) => write!(f, "{lhs}"),
            Sense::Or(a, b) => write!(f, "{a} or {b}"),
            Sense::Posedge(lhs) => write!(f, "posedge {lhs}"),
            Sense::Negedge(lhs) => write!(f, "negedge {lhs}"),
            Sense::Star => write!(f, "*"),
        }
    }
}

impl fmt::Display for CaseArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exprs.is_empty() {
            write!(f, "default: {}", self.stmt)
        } else {
            let patterns = self
                .exprs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "{patterns}: {}", self.stmt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(lhs: &str, rhs: &str) -> Stmt {
        Stmt::Asgn {
            op: AsgnOp::Eq,
            timing: None,
            lhs: Lhs::Ident(lhs.to_string()),
            expr: Expr::Ident(rhs.to_string()),
        }
    }

    #[test]
    fn display_assignment() {
        assert_eq!(assign("q", "d").to_string(), "q = d;");
        let nb = Stmt::Asgn {
            op: AsgnOp::NonBlocking,
            timing: None,
            lhs: Lhs::Ident("q".to_string()),
            expr: Expr::Ident("d".to_string()),
        };
        assert_eq!(nb.to_string(), "q <= d;");
    }

    #[test]
    fn display_timed_block() {
        let stmt = Stmt::Timing(
            Timing::Event(Sense::Posedge(Lhs::Ident("clk".to_string()))),
            Box::new(assign("q", "d")),
        );
        assert_eq!(stmt.to_string(), "@(posedge clk) q = d;");
    }

    #[test]
    fn display_star_event() {
        let stmt = Stmt::Timing(Timing::Event(Sense::Star), Box::new(assign("o", "w")));
        assert_eq!(stmt.to_string(), "@* o = w;");
    }

    #[test]
    fn display_named_block() {
        let stmt = Stmt::Block {
            name: Some("work".to_string()),
            decls: Vec::new(),
            stmts: vec![assign("a", "b")],
        };
        assert_eq!(stmt.to_string(), "begin : work\n\ta = b;\nend");
    }

    #[test]
    fn display_if_without_else() {
        let stmt = Stmt::If {
            cond: Expr::Ident("en".to_string()),
            then_stmt: Box::new(assign("q", "d")),
            else_stmt: Box::new(Stmt::Null),
        };
        assert_eq!(stmt.to_string(), "if (en) q = d;");
    }

    #[test]
    fn display_case() {
        let stmt = Stmt::Case {
            kind: CaseKw::Case,
            expr: Expr::Ident("state".to_string()),
            arms: vec![
                CaseArm {
                    exprs: vec![Expr::Number("0".to_string())],
                    stmt: assign("o", "a"),
                },
                CaseArm {
                    exprs: Vec::new(),
                    stmt: assign("o", "b"),
                },
            ],
        };
        assert_eq!(
            stmt.to_string(),
            "case (state)\n\t0: o = a;\n\tdefault: o = b;\nendcase"
        );
    }

    #[test]
    fn display_subroutine() {
        let stmt = Stmt::Subroutine(
            Expr::Ident("$readmemh".to_string()),
            vec![
                Expr::StringLit("boot.hex".to_string()),
                Expr::Ident("mem".to_string()),
            ],
        );
        assert_eq!(stmt.to_string(), "$readmemh(\"boot.hex\", mem);");
    }

    #[test]
    fn serde_roundtrip_stmt() {
        let stmt = Stmt::While(Expr::Ident("go".to_string()), Box::new(Stmt::Null));
        let json = serde_json::to_string(&stmt).unwrap();
        let back: Stmt = serde_json::from_str(&json).unwrap();
        assert_eq!(stmt, back);
    }
}
