//! Declarations and the data type vocabulary.
//!
//! [`Type`] is the discriminated union spanning the integer-vector,
//! integer-atom, non-integer, net, implicit, alias, aggregate, and
//! internal type shapes the conversion manipulates. Range lists only
//! exist on variants that can carry them; [`Type::with_ranges`] enforces
//! the invariant at the one place ranges are ever reattached.

use serde::{Deserialize, Serialize};
use std::fmt;

use svlower_common::{ConvertError, ConvertResult};

use crate::expr::{Expr, Identifier, ParamBinding, Range};
use crate::ranges_suffix;

// ============================================================================
// Declarations
// ============================================================================

/// A declaration-like item: a variable or net, a parameter, a type
/// parameter, or an inert comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decl {
    /// A data declaration (e.g., `input logic [7:0] a;`, `wire w;`).
    Variable {
        /// Port direction, or [`Direction::Local`] for non-port
        /// declarations.
        dir: Direction,
        /// The declared type.
        ty: Type,
        /// The declared name.
        name: Identifier,
        /// Unpacked dimensions following the name.
        dims: Vec<Range>,
        /// Optional initializer.
        init: Option<Expr>,
    },
    /// A value parameter (e.g., `parameter WIDTH = 8;`).
    Param {
        /// Whether this is a `parameter` or a `localparam`.
        kind: ParamScope,
        /// The parameter type.
        ty: Type,
        /// The parameter name.
        name: Identifier,
        /// The default or assigned value; [`Expr::Nil`] when the
        /// parameter has no default and must be overridden.
        value: Expr,
    },
    /// A type parameter (e.g., `parameter type T = logic;`).
    ///
    /// With [`ParamScope::Localparam`] this is the representation of a
    /// `typedef`, and it renders as one.
    ParamType {
        /// Whether this is a `parameter` or a `localparam`.
        kind: ParamScope,
        /// The parameter name.
        name: Identifier,
        /// The default or assigned type.
        ty: Type,
    },
    /// A comment emitted verbatim; semantically inert.
    Comment(String),
}

impl Decl {
    /// Returns the declared identifier, or `None` for comments.
    pub fn name(&self) -> Option<&Identifier> {
        match self {
            Decl::Variable { name, .. }
            | Decl::Param { name, .. }
            | Decl::ParamType { name, .. } => Some(name),
            Decl::Comment(_) => None,
        }
    }
}

/// Port or signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `input`
    Input,
    /// `output`
    Output,
    /// `inout`
    Inout,
    /// No direction: an ordinary local declaration.
    Local,
}

impl Direction {
    /// Returns the direction keyword, or an empty string for
    /// [`Direction::Local`].
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
            Direction::Local => "",
        }
    }
}

/// Whether a parameter is overridable from outside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamScope {
    /// `parameter`
    Parameter,
    /// `localparam`
    Localparam,
}

impl ParamScope {
    /// Returns the declaring keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            ParamScope::Parameter => "parameter",
            ParamScope::Localparam => "localparam",
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Explicit or inherited signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signing {
    /// No explicit signing keyword.
    Unspecified,
    /// `signed`
    Signed,
    /// `unsigned`
    Unsigned,
}

impl Signing {
    fn suffix(self) -> &'static str {
        match self {
            Signing::Unspecified => "",
            Signing::Signed => " signed",
            Signing::Unsigned => " unsigned",
        }
    }
}

/// An integer vector keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerVectorKind {
    /// `bit` (2-state)
    Bit,
    /// `logic` (4-state)
    Logic,
    /// `reg` (4-state, Verilog-2005)
    Reg,
}

impl IntegerVectorKind {
    fn keyword(self) -> &'static str {
        match self {
            IntegerVectorKind::Bit => "bit",
            IntegerVectorKind::Logic => "logic",
            IntegerVectorKind::Reg => "reg",
        }
    }
}

/// An integer atom keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerAtomKind {
    /// `byte` — 8-bit signed
    Byte,
    /// `shortint` — 16-bit signed
    Shortint,
    /// `int` — 32-bit signed
    Int,
    /// `longint` — 64-bit signed
    Longint,
    /// `integer` — 32-bit signed, 4-state
    Integer,
    /// `time` — 64-bit unsigned
    Time,
}

impl IntegerAtomKind {
    fn keyword(self) -> &'static str {
        match self {
            IntegerAtomKind::Byte => "byte",
            IntegerAtomKind::Shortint => "shortint",
            IntegerAtomKind::Int => "int",
            IntegerAtomKind::Longint => "longint",
            IntegerAtomKind::Integer => "integer",
            IntegerAtomKind::Time => "time",
        }
    }

    /// Returns the atom's bit width.
    pub fn width(self) -> u32 {
        match self {
            IntegerAtomKind::Byte => 8,
            IntegerAtomKind::Shortint => 16,
            IntegerAtomKind::Int | IntegerAtomKind::Integer => 32,
            IntegerAtomKind::Longint | IntegerAtomKind::Time => 64,
        }
    }
}

/// A non-integer keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonIntegerKind {
    /// `real`
    Real,
    /// `realtime`
    Realtime,
    /// `string`
    String,
}

impl NonIntegerKind {
    fn keyword(self) -> &'static str {
        match self {
            NonIntegerKind::Real => "real",
            NonIntegerKind::Realtime => "realtime",
            NonIntegerKind::String => "string",
        }
    }
}

/// A net type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetKind {
    /// `wire`
    Wire,
    /// `tri`
    Tri,
    /// `supply0`
    Supply0,
    /// `supply1`
    Supply1,
}

impl NetKind {
    fn keyword(self) -> &'static str {
        match self {
            NetKind::Wire => "wire",
            NetKind::Tri => "tri",
            NetKind::Supply0 => "supply0",
            NetKind::Supply1 => "supply1",
        }
    }
}

/// Whether an aggregate is packed, and with what signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packing {
    /// An unpacked aggregate.
    Unpacked,
    /// A packed aggregate with the given signing.
    Packed(Signing),
}

/// A member of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumItem {
    /// The member name.
    pub name: Identifier,
    /// Optional explicit value.
    pub value: Option<Expr>,
}

/// A member of a struct or union type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// The member type.
    pub ty: Type,
    /// The member name.
    pub name: Identifier,
}

/// A data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// An integer vector type with signing and packed ranges.
    IntegerVector(IntegerVectorKind, Signing, Vec<Range>),
    /// An integer atom type; atoms carry no ranges.
    IntegerAtom(IntegerAtomKind, Signing),
    /// A non-integer type; carries no ranges.
    NonInteger(NonIntegerKind),
    /// A net type with signing and packed ranges.
    Net(NetKind, Signing, Vec<Range>),
    /// An implicit type: signing and ranges with no keyword.
    Implicit(Signing, Vec<Range>),
    /// A reference to a named type.
    Alias(Identifier, Vec<Range>),
    /// A reference to a package-scoped type (`pkg::name`).
    PkgAlias(Identifier, Identifier, Vec<Range>),
    /// A reference to a class-scoped type (`cls#(bindings)::name`).
    ClassAlias(Identifier, Vec<ParamBinding>, Identifier, Vec<Range>),
    /// An enum type over a base type.
    Enum(Box<Type>, Vec<EnumItem>, Vec<Range>),
    /// A struct type.
    Struct(Packing, Vec<Field>, Vec<Range>),
    /// A union type.
    Union(Packing, Vec<Field>, Vec<Range>),
    /// An interface port reference with optional modport.
    InterfaceRef(Identifier, Option<Identifier>, Vec<Range>),
    /// A `type(expr)` reference.
    TypeOf(Box<Expr>),
    /// An internal marker pairing a type with unpacked dimensions.
    UnpackedType(Box<Type>, Vec<Range>),
}

impl Type {
    /// Returns this type's range list; empty for variants that cannot
    /// carry ranges.
    pub fn ranges(&self) -> &[Range] {
        match self {
            Type::IntegerVector(_, _, rs)
            | Type::Net(_, _, rs)
            | Type::Implicit(_, rs)
            | Type::Alias(_, rs)
            | Type::PkgAlias(_, _, rs)
            | Type::ClassAlias(_, _, _, rs)
            | Type::Enum(_, _, rs)
            | Type::Struct(_, _, rs)
            | Type::Union(_, _, rs)
            | Type::InterfaceRef(_, _, rs)
            | Type::UnpackedType(_, rs) => rs,
            Type::IntegerAtom(..) | Type::NonInteger(_) | Type::TypeOf(_) => &[],
        }
    }

    /// Destructures this type into its rangeless shape and its range
    /// list. Variants that cannot carry ranges split into themselves and
    /// an empty list.
    pub fn split_ranges(self) -> (Type, Vec<Range>) {
        match self {
            Type::IntegerVector(kind, sg, rs) => {
                (Type::IntegerVector(kind, sg, Vec::new()), rs)
            }
            Type::Net(kind, sg, rs) => (Type::Net(kind, sg, Vec::new()), rs),
            Type::Implicit(sg, rs) => (Type::Implicit(sg, Vec::new()), rs),
            Type::Alias(name, rs) => (Type::Alias(name, Vec::new()), rs),
            Type::PkgAlias(pkg, name, rs) => (Type::PkgAlias(pkg, name, Vec::new()), rs),
            Type::ClassAlias(cls, bindings, name, rs) => {
                (Type::ClassAlias(cls, bindings, name, Vec::new()), rs)
            }
            Type::Enum(base, items, rs) => (Type::Enum(base, items, Vec::new()), rs),
            Type::Struct(packing, fields, rs) => (Type::Struct(packing, fields, Vec::new()), rs),
            Type::Union(packing, fields, rs) => (Type::Union(packing, fields, Vec::new()), rs),
            Type::InterfaceRef(name, modport, rs) => {
                (Type::InterfaceRef(name, modport, Vec::new()), rs)
            }
            Type::UnpackedType(inner, rs) => (Type::UnpackedType(inner, Vec::new()), rs),
            other @ (Type::IntegerAtom(..) | Type::NonInteger(_) | Type::TypeOf(_)) => {
                (other, Vec::new())
            }
        }
    }

    /// Reattaches a range list to this type.
    ///
    /// Fails with a structural error when a non-empty range list is
    /// applied to a variant that cannot carry ranges.
    pub fn with_ranges(self, rs: Vec<Range>) -> ConvertResult<Type> {
        match self {
            Type::IntegerVector(kind, sg, _) => Ok(Type::IntegerVector(kind, sg, rs)),
            Type::Net(kind, sg, _) => Ok(Type::Net(kind, sg, rs)),
            Type::Implicit(sg, _) => Ok(Type::Implicit(sg, rs)),
            Type::Alias(name, _) => Ok(Type::Alias(name, rs)),
            Type::PkgAlias(pkg, name, _) => Ok(Type::PkgAlias(pkg, name, rs)),
            Type::ClassAlias(cls, bindings, name, _) => {
                Ok(Type::ClassAlias(cls, bindings, name, rs))
            }
            Type::Enum(base, items, _) => Ok(Type::Enum(base, items, rs)),
            Type::Struct(packing, fields, _) => Ok(Type::Struct(packing, fields, rs)),
            Type::Union(packing, fields, _) => Ok(Type::Union(packing, fields, rs)),
            Type::InterfaceRef(name, modport, _) => Ok(Type::InterfaceRef(name, modport, rs)),
            Type::UnpackedType(inner, _) => Ok(Type::UnpackedType(inner, rs)),
            other @ (Type::IntegerAtom(..) | Type::NonInteger(_) | Type::TypeOf(_)) => {
                if rs.is_empty() {
                    Ok(other)
                } else {
                    Err(ConvertError::Structural {
                        message: format!("packed ranges applied to non-vector type `{other}`"),
                    })
                }
            }
        }
    }
}

/// Elaborates an integer atom to the equivalent explicit logic vector.
///
/// `byte`/`shortint`/`int`/`longint` become `logic` with a range of width
/// 8/16/32/64, signed unless explicitly declared unsigned. `integer`
/// becomes `logic` with a 32-bit range appended to any range list already
/// accumulated for the declaration. `time` is 64 bits, unsigned unless
/// explicitly declared signed.
pub fn atom_to_vector(kind: IntegerAtomKind, sg: Signing, extra: Vec<Range>) -> Type {
    let signing = match kind {
        IntegerAtomKind::Time => match sg {
            Signing::Signed => Signing::Signed,
            _ => Signing::Unsigned,
        },
        _ => match sg {
            Signing::Unsigned => Signing::Unsigned,
            _ => Signing::Signed,
        },
    };
    let msb = Expr::Number(format!("{}", kind.width() - 1));
    let lsb = Expr::Number("0".to_string());
    let mut ranges = extra;
    ranges.push((msb, lsb));
    Type::IntegerVector(IntegerVectorKind::Logic, signing, ranges)
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::IntegerVector(kind, sg, rs) => {
                write!(f, "{}{}{}", kind.keyword(), sg.suffix(), ranges_suffix(rs))
            }
            Type::IntegerAtom(kind, sg) => write!(f, "{}{}", kind.keyword(), sg.suffix()),
            Type::NonInteger(kind) => write!(f, "{}", kind.keyword()),
            Type::Net(kind, sg, rs) => {
                write!(f, "{}{}{}", kind.keyword(), sg.suffix(), ranges_suffix(rs))
            }
            Type::Implicit(sg, rs) => {
                let text = format!("{}{}", sg.suffix(), ranges_suffix(rs));
                write!(f, "{}", text.trim_start())
            }
            Type::Alias(name, rs) => write!(f, "{name}{}", ranges_suffix(rs)),
            Type::PkgAlias(pkg, name, rs) => {
                write!(f, "{pkg}::{name}{}", ranges_suffix(rs))
            }
            Type::ClassAlias(cls, bindings, name, rs) => {
                let args = bindings
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{cls}#({args})::{name}{}", ranges_suffix(rs))
            }
            Type::Enum(base, items, rs) => {
                let members = items
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let base_text = base.to_string();
                if base_text.is_empty() {
                    write!(f, "enum {{{members}}}{}", ranges_suffix(rs))
                } else {
                    write!(f, "enum {base_text} {{{members}}}{}", ranges_suffix(rs))
                }
            }
            Type::Struct(packing, fields, rs) => {
                write!(f, "struct{}{}", packing, aggregate_body(fields))?;
                write!(f, "{}", ranges_suffix(rs))
            }
            Type::Union(packing, fields, rs) => {
                write!(f, "union{}{}", packing, aggregate_body(fields))?;
                write!(f, "{}", ranges_suffix(rs))
            }
            Type::InterfaceRef(name, modport, rs) => {
                write!(f, "{name}")?;
                if let Some(modport) = modport {
                    write!(f, ".{modport}")?;
                }
                write!(f, "{}", ranges_suffix(rs))
            }
            Type::TypeOf(expr) => write!(f, "type({expr})"),
            Type::UnpackedType(inner, rs) => write!(f, "{inner}{}", ranges_suffix(rs)),
        }
    }
}

fn aggregate_body(fields: &[Field]) -> String {
    let body = fields
        .iter()
        .map(|field| format!("{} {};", field.ty, field.name))
        .collect::<Vec<_>>()
        .join(" ");
    format!(" {{{body}}}")
}

impl fmt::Display for Packing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packing::Unpacked => Ok(()),
            Packing::Packed(sg) => write!(f, " packed{}", sg.suffix()),
        }
    }
}

impl fmt::Display for EnumItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} = {value}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Variable {
                dir,
                ty,
                name,
                dims,
                init,
            } => {
                let mut words: Vec<String> = Vec::new();
                if !dir.keyword().is_empty() {
                    words.push(dir.keyword().to_string());
                }
                let ty_text = ty.to_string();
                if !ty_text.is_empty() {
                    words.push(ty_text);
                }
                words.push(format!("{name}{}", ranges_suffix(dims)));
                write!(f, "{}", words.join(" "))?;
                if let Some(init) = init {
                    write!(f, " = {init}")?;
                }
                write!(f, ";")
            }
            Decl::Param {
                kind,
                ty,
                name,
                value,
            } => {
                let mut words: Vec<String> = vec![kind.keyword().to_string()];
                let ty_text = ty.to_string();
                if !ty_text.is_empty() {
                    words.push(ty_text);
                }
                words.push(name.clone());
                write!(f, "{}", words.join(" "))?;
                if *value != Expr::Nil {
                    write!(f, " = {value}")?;
                }
                write!(f, ";")
            }
            Decl::ParamType { kind, name, ty } => match kind {
                ParamScope::Parameter => write!(f, "parameter type {name} = {ty};"),
                ParamScope::Localparam => write!(f, "typedef {ty} {name};"),
            },
            Decl::Comment(text) => write!(f, "// {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Expr {
        Expr::Number(text.to_string())
    }

    fn byte_range() -> Range {
        (num("7"), num("0"))
    }

    #[test]
    fn display_vector_type() {
        let ty = Type::IntegerVector(IntegerVectorKind::Logic, Signing::Signed, vec![byte_range()]);
        assert_eq!(ty.to_string(), "logic signed [7:0]");
    }

    #[test]
    fn display_net_and_implicit() {
        let net = Type::Net(NetKind::Wire, Signing::Unspecified, vec![byte_range()]);
        assert_eq!(net.to_string(), "wire [7:0]");

        let implicit = Type::Implicit(Signing::Unspecified, vec![byte_range()]);
        assert_eq!(implicit.to_string(), "[7:0]");

        let empty = Type::Implicit(Signing::Unspecified, Vec::new());
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn display_enum_type() {
        let ty = Type::Enum(
            Box::new(Type::IntegerVector(
                IntegerVectorKind::Logic,
                Signing::Unspecified,
                vec![(num("1"), num("0"))],
            )),
            vec![
                EnumItem {
                    name: "IDLE".to_string(),
                    value: Some(num("0")),
                },
                EnumItem {
                    name: "BUSY".to_string(),
                    value: None,
                },
            ],
            Vec::new(),
        );
        assert_eq!(ty.to_string(), "enum logic [1:0] {IDLE = 0, BUSY}");
    }

    #[test]
    fn display_variable_decl() {
        let d = Decl::Variable {
            dir: Direction::Output,
            ty: Type::IntegerVector(IntegerVectorKind::Reg, Signing::Unspecified, Vec::new()),
            name: "o".to_string(),
            dims: Vec::new(),
            init: None,
        };
        assert_eq!(d.to_string(), "output reg o;");
    }

    #[test]
    fn display_param_decl() {
        let d = Decl::Param {
            kind: ParamScope::Parameter,
            ty: Type::Implicit(Signing::Unspecified, Vec::new()),
            name: "WIDTH".to_string(),
            value: num("8"),
        };
        assert_eq!(d.to_string(), "parameter WIDTH = 8;");
    }

    #[test]
    fn display_typedef() {
        let d = Decl::ParamType {
            kind: ParamScope::Localparam,
            name: "word_t".to_string(),
            ty: Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, vec![byte_range()]),
        };
        assert_eq!(d.to_string(), "typedef logic [7:0] word_t;");

        let p = Decl::ParamType {
            kind: ParamScope::Parameter,
            name: "T".to_string(),
            ty: Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, Vec::new()),
        };
        assert_eq!(p.to_string(), "parameter type T = logic;");
    }

    #[test]
    fn split_and_reattach_ranges() {
        let ty = Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, vec![byte_range()]);
        let (stripped, rs) = ty.clone().split_ranges();
        assert!(stripped.ranges().is_empty());
        assert_eq!(rs.len(), 1);
        assert_eq!(stripped.with_ranges(rs).unwrap(), ty);
    }

    #[test]
    fn ranges_on_atom_are_rejected() {
        let atom = Type::IntegerAtom(IntegerAtomKind::Int, Signing::Unspecified);
        let (same, rs) = atom.clone().split_ranges();
        assert!(rs.is_empty());
        let err = same.with_ranges(vec![byte_range()]).unwrap_err();
        assert!(err.to_string().contains("non-vector"));
    }

    #[test]
    fn atom_elaboration_widths() {
        for (kind, width) in [
            (IntegerAtomKind::Byte, "7"),
            (IntegerAtomKind::Shortint, "15"),
            (IntegerAtomKind::Int, "31"),
            (IntegerAtomKind::Longint, "63"),
        ] {
            match atom_to_vector(kind, Signing::Unspecified, Vec::new()) {
                Type::IntegerVector(IntegerVectorKind::Logic, Signing::Signed, rs) => {
                    assert_eq!(rs.len(), 1);
                    assert_eq!(rs[0].0, Expr::Number(width.to_string()));
                }
                other => panic!("unexpected elaboration {other:?}"),
            }
        }
    }

    #[test]
    fn atom_elaboration_unsigned_override() {
        match atom_to_vector(IntegerAtomKind::Int, Signing::Unsigned, Vec::new()) {
            Type::IntegerVector(_, sg, _) => assert_eq!(sg, Signing::Unsigned),
            other => panic!("unexpected elaboration {other:?}"),
        }
    }

    #[test]
    fn integer_appends_to_existing_ranges() {
        let ty = atom_to_vector(
            IntegerAtomKind::Integer,
            Signing::Unspecified,
            vec![(num("3"), num("0"))],
        );
        match ty {
            Type::IntegerVector(_, _, rs) => {
                assert_eq!(rs.len(), 2);
                assert_eq!(rs[0].0, num("3"));
                assert_eq!(rs[1].0, num("31"));
            }
            other => panic!("unexpected elaboration {other:?}"),
        }
    }

    #[test]
    fn serde_roundtrip_decl() {
        let d = Decl::ParamType {
            kind: ParamScope::Parameter,
            name: "T".to_string(),
            ty: Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, Vec::new()),
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: Decl = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
