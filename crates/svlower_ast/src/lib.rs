//! AST data model for the svlower SystemVerilog-to-Verilog converter.
//!
//! The AST is a closed family of tagged variants; every node is immutable,
//! comparable, and serializable. Nodes are created by the front-end parser
//! (delivered as serialized JSON) and replaced wholesale by conversion
//! passes; there is no in-place mutation and no parent-to-child cycle.
//!
//! Each node family implements [`std::fmt::Display`], rendering standard
//! Verilog surface syntax. Rendering a converted description list yields
//! the Verilog-2005 output of the tool.

#![warn(missing_docs)]

pub mod ast;
pub mod decl;
pub mod expr;
pub mod stmt;

pub use ast::{
    AlwaysKw, Class, Description, ExportSpec, Function, GenItem, Lifetime, ModuleItem, Package,
    PackageItem, Part, PartKind, PortBinding, Task,
};
pub use decl::{
    atom_to_vector, Decl, Direction, EnumItem, Field, IntegerAtomKind, IntegerVectorKind, NetKind,
    NonIntegerKind, Packing, ParamScope, Signing, Type,
};
pub use expr::{
    expr_to_lhs, expr_to_type, lhs_to_expr, AsgnOp, BinOp, Expr, Identifier, Lhs, ParamBinding,
    PartSelectMode, Range, TypeOrExpr, UniOp,
};
pub use stmt::{CaseArm, CaseKw, Sense, Stmt, Timing};

/// Indents every non-empty line of `text` by one tab.
pub(crate) fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("\t{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a range list as `[a:b][c:d]...`, with a leading space when
/// non-empty.
pub(crate) fn ranges_suffix(ranges: &[Range]) -> String {
    if ranges.is_empty() {
        return String::new();
    }
    let mut out = String::from(" ");
    for (msb, lsb) in ranges {
        out.push_str(&format!("[{msb}:{lsb}]"));
    }
    out
}
