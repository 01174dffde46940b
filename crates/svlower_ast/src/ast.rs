//! Top-level AST nodes: descriptions, parts, packages, classes, and the
//! items inside them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decl::{Decl, Type};
use crate::expr::{AsgnOp, Expr, Identifier, Lhs, ParamBinding, Range};
use crate::stmt::Stmt;
use crate::indent;

// ============================================================================
// Descriptions
// ============================================================================

/// One top-level item of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Description {
    /// A module or interface.
    Part(Part),
    /// A package.
    Package(Package),
    /// A class.
    Class(Class),
    /// A stray package item at file scope.
    Item(PackageItem),
}

/// A module or interface description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Header attributes, preserved verbatim (e.g., `(* keep *)`).
    pub attrs: Vec<String>,
    /// Whether this is an `extern` declaration without a body.
    pub is_extern: bool,
    /// Module or interface.
    pub kind: PartKind,
    /// Default lifetime of the part's procedural contents.
    pub lifetime: Lifetime,
    /// The part name.
    pub name: Identifier,
    /// The header port-name list.
    pub ports: Vec<Identifier>,
    /// The body items.
    pub items: Vec<ModuleItem>,
}

/// The keyword kind of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    /// `module` ... `endmodule`
    Module,
    /// `interface` ... `endinterface`
    Interface,
}

impl PartKind {
    fn keywords(self) -> (&'static str, &'static str) {
        match self {
            PartKind::Module => ("module", "endmodule"),
            PartKind::Interface => ("interface", "endinterface"),
        }
    }
}

/// A declaration lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    /// No explicit lifetime keyword.
    Inherit,
    /// `static`
    Static,
    /// `automatic`
    Automatic,
}

impl Lifetime {
    fn suffix(self) -> &'static str {
        match self {
            Lifetime::Inherit => "",
            Lifetime::Static => " static",
            Lifetime::Automatic => " automatic",
        }
    }
}

/// A package description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Default lifetime of the package's procedural contents.
    pub lifetime: Lifetime,
    /// The package name.
    pub name: Identifier,
    /// The package body items.
    pub items: Vec<PackageItem>,
}

/// A class description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Default lifetime of the class's procedural contents.
    pub lifetime: Lifetime,
    /// The class name.
    pub name: Identifier,
    /// The class parameter declarations.
    pub params: Vec<Decl>,
    /// The class body items.
    pub items: Vec<PackageItem>,
}

// ============================================================================
// Package items
// ============================================================================

/// A declaration-like item legal at package or module scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageItem {
    /// A function declaration.
    Function(Function),
    /// A task declaration.
    Task(Task),
    /// An import; `None` imports the whole package (`pkg::*`).
    Import(Identifier, Option<Identifier>),
    /// An export.
    Export(ExportSpec),
    /// A declaration.
    Decl(Decl),
    /// A compiler directive, preserved verbatim.
    Directive(String),
}

/// What an `export` statement exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportSpec {
    /// `export *::*;` — every imported symbol.
    All,
    /// `export pkg::*;` — every symbol imported from `pkg`.
    Package(Identifier),
    /// `export pkg::name;` — one imported symbol.
    Item(Identifier, Identifier),
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// The function's lifetime.
    pub lifetime: Lifetime,
    /// The return type.
    pub ret: Type,
    /// The function name.
    pub name: Identifier,
    /// Argument and local declarations.
    pub decls: Vec<Decl>,
    /// The function body.
    pub stmts: Vec<Stmt>,
}

/// A task declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// The task's lifetime.
    pub lifetime: Lifetime,
    /// The task name.
    pub name: Identifier,
    /// Argument and local declarations.
    pub decls: Vec<Decl>,
    /// The task body.
    pub stmts: Vec<Stmt>,
}

// ============================================================================
// Module items
// ============================================================================

/// An item inside a part body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleItem {
    /// A package item used at module scope.
    PackageItem(PackageItem),
    /// A module or interface instantiation.
    Instance {
        /// The instantiated module name.
        module: Identifier,
        /// Parameter overrides.
        params: Vec<ParamBinding>,
        /// The instance name.
        name: Identifier,
        /// Optional instance-array range.
        range: Option<Range>,
        /// Port connections.
        ports: Vec<PortBinding>,
    },
    /// A continuous assignment.
    Assign {
        /// The assignment target.
        lhs: Lhs,
        /// The driven expression.
        expr: Expr,
    },
    /// An always block of any flavor.
    AlwaysC {
        /// The always keyword used.
        kw: AlwaysKw,
        /// The body statement.
        stmt: Stmt,
    },
    /// An `initial` block.
    Initial(Stmt),
    /// A `final` block.
    Final(Stmt),
    /// A genvar declaration.
    Genvar(Identifier),
    /// A generate region.
    Generate(Vec<GenItem>),
}

/// The keyword of an always block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlwaysKw {
    /// `always`
    Always,
    /// `always_comb`
    AlwaysComb,
    /// `always_ff`
    AlwaysFf,
    /// `always_latch`
    AlwaysLatch,
}

impl AlwaysKw {
    fn keyword(self) -> &'static str {
        match self {
            AlwaysKw::Always => "always",
            AlwaysKw::AlwaysComb => "always_comb",
            AlwaysKw::AlwaysFf => "always_ff",
            AlwaysKw::AlwaysLatch => "always_latch",
        }
    }
}

/// A port connection in an instantiation.
///
/// An empty `port` name marks a positional connection; [`Expr::Nil`]
/// marks an explicitly unconnected port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// The formal port name, or empty for positional.
    pub port: Identifier,
    /// The connected expression.
    pub expr: Expr,
}

/// An item inside a generate region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenItem {
    /// A generate block, optionally named.
    Block(Option<Identifier>, Vec<GenItem>),
    /// An ordinary module item.
    ModuleItem(Box<ModuleItem>),
    /// A conditional generate; the else branch is [`GenItem::Null`] when
    /// absent.
    If(Expr, Box<GenItem>, Box<GenItem>),
    /// A generate loop over a genvar.
    For {
        /// The loop genvar and its initial value.
        init: (Identifier, Expr),
        /// The loop condition.
        cond: Expr,
        /// The loop step: genvar, operator, value.
        step: (Identifier, AsgnOp, Expr),
        /// The loop body.
        body: Box<GenItem>,
    },
    /// The empty generate item.
    Null,
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Part(part) => write!(f, "{part}"),
            Description::Package(package) => write!(f, "{package}"),
            Description::Class(class) => write!(f, "{class}"),
            Description::Item(item) => write!(f, "{item}"),
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attr in &self.attrs {
            writeln!(f, "{attr}")?;
        }
        let (open, close) = self.kind.keywords();
        let ports = self.ports.join(", ");
        if self.is_extern {
            return write!(
                f,
                "extern {open}{} {}({ports});",
                self.lifetime.suffix(),
                self.name
            );
        }
        writeln!(f, "{open}{} {}({ports});", self.lifetime.suffix(), self.name)?;
        for item in &self.items {
            writeln!(f, "{}", indent(&item.to_string()))?;
        }
        write!(f, "{close}")
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "package{} {};", self.lifetime.suffix(), self.name)?;
        for item in &self.items {
            writeln!(f, "{}", indent(&item.to_string()))?;
        }
        write!(f, "endpackage")
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class{} {}", self.lifetime.suffix(), self.name)?;
        if !self.params.is_empty() {
            writeln!(f, " #(")?;
            for param in &self.params {
                writeln!(f, "{}", indent(&param.to_string()))?;
            }
            writeln!(f, ");")?;
        } else {
            writeln!(f, ";")?;
        }
        for item in &self.items {
            writeln!(f, "{}", indent(&item.to_string()))?;
        }
        write!(f, "endclass")
    }
}

impl fmt::Display for PackageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageItem::Function(func) => write!(f, "{func}"),
            PackageItem::Task(task) => write!(f, "{task}"),
            PackageItem::Import(pkg, Some(name)) => write!(f, "import {pkg}::{name};"),
            PackageItem::Import(pkg, None) => write!(f, "import {pkg}::*;"),
            PackageItem::Export(spec) => write!(f, "{spec}"),
            PackageItem::Decl(decl) => write!(f, "{decl}"),
            PackageItem::Directive(text) => write!(f, "{text}"),
        }
    }
}

impl fmt::Display for ExportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportSpec::All => write!(f, "export *::*;"),
            ExportSpec::Package(pkg) => write!(f, "export {pkg}::*;"),
            ExportSpec::Item(pkg, name) => write!(f, "export {pkg}::{name};"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret = self.ret.to_string();
        if ret.is_empty() {
            writeln!(f, "function{} {};", self.lifetime.suffix(), self.name)?;
        } else {
            writeln!(f, "function{} {ret} {};", self.lifetime.suffix(), self.name)?;
        }
        for decl in &self.decls {
            writeln!(f, "{}", indent(&decl.to_string()))?;
        }
        for stmt in &self.stmts {
            writeln!(f, "{}", indent(&stmt.to_string()))?;
        }
        write!(f, "endfunction")
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "task{} {};", self.lifetime.suffix(), self.name)?;
        for decl in &self.decls {
            writeln!(f, "{}", indent(&decl.to_string()))?;
        }
        for stmt in &self.stmts {
            writeln!(f, "{}", indent(&stmt.to_string()))?;
        }
        write!(f, "endtask")
    }
}

impl fmt::Display for ModuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleItem::PackageItem(item) => write!(f, "{item}"),
            ModuleItem::Instance {
                module,
                params,
                name,
                range,
                ports,
            } => {
                write!(f, "{module} ")?;
                if !params.is_empty() {
                    let params = params
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "#({params}) ")?;
                }
                write!(f, "{name}")?;
                if let Some((msb, lsb)) = range {
                    write!(f, " [{msb}:{lsb}]")?;
                }
                let ports = ports
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({ports});")
            }
            ModuleItem::Assign { lhs, expr } => write!(f, "assign {lhs} = {expr};"),
            ModuleItem::AlwaysC { kw, stmt } => write!(f, "{} {stmt}", kw.keyword()),
            ModuleItem::Initial(stmt) => write!(f, "initial {stmt}"),
            ModuleItem::Final(stmt) => write!(f, "final {stmt}"),
            ModuleItem::Genvar(name) => write!(f, "genvar {name};"),
            ModuleItem::Generate(items) => {
                writeln!(f, "generate")?;
                for item in items {
                    writeln!(f, "{}", indent(&item.to_string()))?;
                }
                write!(f, "endgenerate")
            }
        }
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port.is_empty() {
            write!(f, "{}", self.expr)
        } else if self.expr == Expr::Nil {
            write!(f, ".{}()", self.port)
        } else {
            write!(f, ".{}({})", self.port, self.expr)
        }
    }
}

impl fmt::Display for GenItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenItem::Block(name, items) => {
                match name {
                    Some(name) => writeln!(f, "begin : {name}")?,
                    None => writeln!(f, "begin")?,
                }
                for item in items {
                    writeln!(f, "{}", indent(&item.to_string()))?;
                }
                write!(f, "end")
            }
            GenItem::ModuleItem(item) => write!(f, "{item}"),
            GenItem::If(cond, then_item, else_item) => {
                write!(f, "if ({cond}) {then_item}")?;
                if **else_item != GenItem::Null {
                    write!(f, "\nelse {else_item}")?;
                }
                Ok(())
            }
            GenItem::For {
                init,
                cond,
                step,
                body,
            } => {
                write!(
                    f,
                    "for ({} = {}; {cond}; {} {} {}) {body}",
                    init.0, init.1, step.0, step.1, step.2
                )
            }
            GenItem::Null => write!(f, ";"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Direction, IntegerVectorKind, Signing};
    use crate::expr::AsgnOp;
    use crate::stmt::{Sense, Timing};

    fn logic_ty() -> Type {
        Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, Vec::new())
    }

    fn out_decl(name: &str) -> ModuleItem {
        ModuleItem::PackageItem(PackageItem::Decl(Decl::Variable {
            dir: Direction::Output,
            ty: logic_ty(),
            name: name.to_string(),
            dims: Vec::new(),
            init: None,
        }))
    }

    #[test]
    fn display_module() {
        let part = Part {
            attrs: Vec::new(),
            is_extern: false,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: "top".to_string(),
            ports: vec!["o".to_string()],
            items: vec![out_decl("o")],
        };
        assert_eq!(
            part.to_string(),
            "module top(o);\n\toutput logic o;\nendmodule"
        );
    }

    #[test]
    fn display_extern_module() {
        let part = Part {
            attrs: Vec::new(),
            is_extern: true,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: "stub".to_string(),
            ports: Vec::new(),
            items: Vec::new(),
        };
        assert_eq!(part.to_string(), "extern module stub();");
    }

    #[test]
    fn display_package() {
        let package = Package {
            lifetime: Lifetime::Inherit,
            name: "pkg".to_string(),
            items: vec![PackageItem::Import("other".to_string(), None)],
        };
        assert_eq!(
            package.to_string(),
            "package pkg;\n\timport other::*;\nendpackage"
        );
    }

    #[test]
    fn display_instance() {
        let inst = ModuleItem::Instance {
            module: "sub".to_string(),
            params: Vec::new(),
            name: "u".to_string(),
            range: None,
            ports: vec![PortBinding {
                port: "q".to_string(),
                expr: Expr::Ident("r".to_string()),
            }],
        };
        assert_eq!(inst.to_string(), "sub u(.q(r));");
    }

    #[test]
    fn display_always_star() {
        let item = ModuleItem::AlwaysC {
            kw: AlwaysKw::Always,
            stmt: Stmt::Timing(
                Timing::Event(Sense::Star),
                Box::new(Stmt::Asgn {
                    op: AsgnOp::Eq,
                    timing: None,
                    lhs: Lhs::Ident("r".to_string()),
                    expr: Expr::Ident("w".to_string()),
                }),
            ),
        };
        assert_eq!(item.to_string(), "always @* r = w;");
    }

    #[test]
    fn display_generate_region() {
        let gen = ModuleItem::Generate(vec![GenItem::Block(
            None,
            vec![GenItem::ModuleItem(Box::new(out_decl("x")))],
        )]);
        assert_eq!(
            gen.to_string(),
            "generate\n\tbegin\n\t\toutput logic x;\n\tend\nendgenerate"
        );
    }

    #[test]
    fn display_export_specs() {
        assert_eq!(ExportSpec::All.to_string(), "export *::*;");
        assert_eq!(
            ExportSpec::Package("p".to_string()).to_string(),
            "export p::*;"
        );
        assert_eq!(
            ExportSpec::Item("p".to_string(), "x".to_string()).to_string(),
            "export p::x;"
        );
    }

    #[test]
    fn serde_roundtrip_description() {
        let desc = Description::Part(Part {
            attrs: vec!["(* keep *)".to_string()],
            is_extern: false,
            kind: PartKind::Interface,
            lifetime: Lifetime::Automatic,
            name: "bus_if".to_string(),
            ports: Vec::new(),
            items: Vec::new(),
        });
        let json = serde_json::to_string(&desc).unwrap();
        let back: Description = serde_json::from_str(&json).unwrap();
        assert_eq!(desc, back);
    }
}
