//! Bottom-up rewriting traversals.

use svlower_ast::{
    Decl, Expr, Field, GenItem, Lhs, ModuleItem, ParamBinding, PortBinding, Range, Sense, Stmt,
    Timing, Type, TypeOrExpr,
};
use svlower_common::ConvertResult;

/// Per-node rewrite hooks for the leaf AST families.
///
/// Every hook defaults to the identity, so an implementation only
/// overrides the families it cares about. Hooks are invoked after the
/// node's children have been rebuilt.
pub trait LeafMapper {
    /// Rewrites one expression node.
    fn expr(&mut self, expr: Expr) -> ConvertResult<Expr> {
        Ok(expr)
    }

    /// Rewrites one type node.
    fn ty(&mut self, ty: Type) -> ConvertResult<Type> {
        Ok(ty)
    }

    /// Rewrites one assignment-target node.
    fn lhs(&mut self, lhs: Lhs) -> ConvertResult<Lhs> {
        Ok(lhs)
    }
}

fn map_exprs<M: LeafMapper + ?Sized>(exprs: Vec<Expr>, m: &mut M) -> ConvertResult<Vec<Expr>> {
    exprs.into_iter().map(|e| map_expr(e, m)).collect()
}

fn map_ranges<M: LeafMapper + ?Sized>(ranges: Vec<Range>, m: &mut M) -> ConvertResult<Vec<Range>> {
    ranges
        .into_iter()
        .map(|(a, b)| Ok((map_expr(a, m)?, map_expr(b, m)?)))
        .collect()
}

fn map_bindings<M: LeafMapper + ?Sized>(
    bindings: Vec<ParamBinding>,
    m: &mut M,
) -> ConvertResult<Vec<ParamBinding>> {
    bindings
        .into_iter()
        .map(|b| {
            Ok(ParamBinding {
                param: b.param,
                value: map_type_or_expr(b.value, m)?,
            })
        })
        .collect()
}

/// Maps the leaves of a type-or-expression value.
pub fn map_type_or_expr<M: LeafMapper + ?Sized>(
    value: TypeOrExpr,
    m: &mut M,
) -> ConvertResult<TypeOrExpr> {
    match value {
        TypeOrExpr::Type(ty) => Ok(TypeOrExpr::Type(map_type(ty, m)?)),
        TypeOrExpr::Expr(expr) => Ok(TypeOrExpr::Expr(map_expr(expr, m)?)),
    }
}

/// Rebuilds an expression bottom-up, invoking the mapper's hooks on every
/// node, including the expressions and types nested inside casts and
/// class parameter bindings.
pub fn map_expr<M: LeafMapper + ?Sized>(expr: Expr, m: &mut M) -> ConvertResult<Expr> {
    let expr = match expr {
        Expr::ClassIdent(cls, bindings, name) => {
            Expr::ClassIdent(cls, map_bindings(bindings, m)?, name)
        }
        Expr::Bit(base, idx) => Expr::Bit(
            Box::new(map_expr(*base, m)?),
            Box::new(map_expr(*idx, m)?),
        ),
        Expr::RangeSel(base, mode, range) => {
            let (a, b) = *range;
            Expr::RangeSel(
                Box::new(map_expr(*base, m)?),
                mode,
                Box::new((map_expr(a, m)?, map_expr(b, m)?)),
            )
        }
        Expr::Dot(base, field) => Expr::Dot(Box::new(map_expr(*base, m)?), field),
        Expr::Concat(items) => Expr::Concat(map_exprs(items, m)?),
        Expr::Repeat(count, items) => {
            Expr::Repeat(Box::new(map_expr(*count, m)?), map_exprs(items, m)?)
        }
        Expr::Call(func, args) => {
            Expr::Call(Box::new(map_expr(*func, m)?), map_exprs(args, m)?)
        }
        Expr::UniOp(op, arg) => Expr::UniOp(op, Box::new(map_expr(*arg, m)?)),
        Expr::BinOp(op, lhs, rhs) => Expr::BinOp(
            op,
            Box::new(map_expr(*lhs, m)?),
            Box::new(map_expr(*rhs, m)?),
        ),
        Expr::Mux(cond, then_e, else_e) => Expr::Mux(
            Box::new(map_expr(*cond, m)?),
            Box::new(map_expr(*then_e, m)?),
            Box::new(map_expr(*else_e, m)?),
        ),
        Expr::Cast(target, value) => Expr::Cast(
            Box::new(map_type_or_expr(*target, m)?),
            Box::new(map_expr(*value, m)?),
        ),
        other => other,
    };
    m.expr(expr)
}

/// Rebuilds a type bottom-up, invoking the mapper's hooks on every nested
/// type and every contained expression.
pub fn map_type<M: LeafMapper + ?Sized>(ty: Type, m: &mut M) -> ConvertResult<Type> {
    let ty = match ty {
        Type::IntegerVector(kind, sg, rs) => Type::IntegerVector(kind, sg, map_ranges(rs, m)?),
        Type::Net(kind, sg, rs) => Type::Net(kind, sg, map_ranges(rs, m)?),
        Type::Implicit(sg, rs) => Type::Implicit(sg, map_ranges(rs, m)?),
        Type::Alias(name, rs) => Type::Alias(name, map_ranges(rs, m)?),
        Type::PkgAlias(pkg, name, rs) => Type::PkgAlias(pkg, name, map_ranges(rs, m)?),
        Type::ClassAlias(cls, bindings, name, rs) => {
            Type::ClassAlias(cls, map_bindings(bindings, m)?, name, map_ranges(rs, m)?)
        }
        Type::Enum(base, items, rs) => {
            let base = map_type(*base, m)?;
            let items = items
                .into_iter()
                .map(|mut item| {
                    item.value = item.value.map(|v| map_expr(v, m)).transpose()?;
                    Ok(item)
                })
                .collect::<ConvertResult<Vec<_>>>()?;
            Type::Enum(Box::new(base), items, map_ranges(rs, m)?)
        }
        Type::Struct(packing, fields, rs) => {
            let fields = map_fields(fields, m)?;
            Type::Struct(packing, fields, map_ranges(rs, m)?)
        }
        Type::Union(packing, fields, rs) => {
            let fields = map_fields(fields, m)?;
            Type::Union(packing, fields, map_ranges(rs, m)?)
        }
        Type::InterfaceRef(name, modport, rs) => {
            Type::InterfaceRef(name, modport, map_ranges(rs, m)?)
        }
        Type::TypeOf(expr) => Type::TypeOf(Box::new(map_expr(*expr, m)?)),
        Type::UnpackedType(inner, rs) => {
            Type::UnpackedType(Box::new(map_type(*inner, m)?), map_ranges(rs, m)?)
        }
        other @ (Type::IntegerAtom(..) | Type::NonInteger(_)) => other,
    };
    m.ty(ty)
}

fn map_fields<M: LeafMapper + ?Sized>(fields: Vec<Field>, m: &mut M) -> ConvertResult<Vec<Field>> {
    fields
        .into_iter()
        .map(|mut field| {
            field.ty = map_type(field.ty, m)?;
            Ok(field)
        })
        .collect()
}

/// Rebuilds an assignment target bottom-up, invoking the mapper's hooks on
/// every target node and on the index expressions inside selects.
pub fn map_lhs<M: LeafMapper + ?Sized>(lhs: Lhs, m: &mut M) -> ConvertResult<Lhs> {
    let lhs = match lhs {
        Lhs::Bit(base, idx) => Lhs::Bit(Box::new(map_lhs(*base, m)?), map_expr(idx, m)?),
        Lhs::Range(base, mode, range) => {
            let (a, b) = *range;
            Lhs::Range(
                Box::new(map_lhs(*base, m)?),
                mode,
                Box::new((map_expr(a, m)?, map_expr(b, m)?)),
            )
        }
        Lhs::Dot(base, field) => Lhs::Dot(Box::new(map_lhs(*base, m)?), field),
        Lhs::Concat(items) => Lhs::Concat(
            items
                .into_iter()
                .map(|l| map_lhs(l, m))
                .collect::<ConvertResult<Vec<_>>>()?,
        ),
        other => other,
    };
    m.lhs(lhs)
}

/// Maps the leaves of a declaration: its type, its dimensions, and its
/// initializer.
pub fn map_decl<M: LeafMapper + ?Sized>(decl: Decl, m: &mut M) -> ConvertResult<Decl> {
    Ok(match decl {
        Decl::Variable {
            dir,
            ty,
            name,
            dims,
            init,
        } => Decl::Variable {
            dir,
            ty: map_type(ty, m)?,
            name,
            dims: map_ranges(dims, m)?,
            init: init.map(|e| map_expr(e, m)).transpose()?,
        },
        Decl::Param {
            kind,
            ty,
            name,
            value,
        } => Decl::Param {
            kind,
            ty: map_type(ty, m)?,
            name,
            value: map_expr(value, m)?,
        },
        Decl::ParamType { kind, name, ty } => Decl::ParamType {
            kind,
            name,
            ty: map_type(ty, m)?,
        },
        comment @ Decl::Comment(_) => comment,
    })
}

fn map_timing<M: LeafMapper + ?Sized>(timing: Timing, m: &mut M) -> ConvertResult<Timing> {
    Ok(match timing {
        Timing::Event(sense) => Timing::Event(map_sense(sense, m)?),
        Timing::Delay(expr) => Timing::Delay(map_expr(expr, m)?),
    })
}

fn map_sense<M: LeafMapper + ?Sized>(sense: Sense, m: &mut M) -> ConvertResult<Sense> {
    Ok(match sense {
        Sense::Lhs(lhs) => Sense::Lhs(map_lhs(lhs, m)?),
        Sense::Or(a, b) => Sense::Or(
            Box::new(map_sense(*a, m)?),
            Box::new(map_sense(*b, m)?),
        ),
        Sense::Posedge(lhs) => Sense::Posedge(map_lhs(lhs, m)?),
        Sense::Negedge(lhs) => Sense::Negedge(map_lhs(lhs, m)?),
        Sense::Star => Sense::Star,
    })
}

/// Maps the leaves owned directly by a statement.
///
/// Child statements and block declarations are untouched; the scope walk
/// reaches them with their own hook invocations.
pub fn map_stmt<M: LeafMapper + ?Sized>(stmt: Stmt, m: &mut M) -> ConvertResult<Stmt> {
    Ok(match stmt {
        Stmt::Asgn {
            op,
            timing,
            lhs,
            expr,
        } => Stmt::Asgn {
            op,
            timing: timing.map(|t| map_timing(t, m)).transpose()?,
            lhs: map_lhs(lhs, m)?,
            expr: map_expr(expr, m)?,
        },
        Stmt::If {
            cond,
            then_stmt,
            else_stmt,
        } => Stmt::If {
            cond: map_expr(cond, m)?,
            then_stmt,
            else_stmt,
        },
        Stmt::For {
            inits,
            cond,
            steps,
            body,
        } => Stmt::For {
            inits: inits
                .into_iter()
                .map(|(lhs, expr)| Ok((map_lhs(lhs, m)?, map_expr(expr, m)?)))
                .collect::<ConvertResult<Vec<_>>>()?,
            cond: map_expr(cond, m)?,
            steps: steps
                .into_iter()
                .map(|(lhs, op, expr)| Ok((map_lhs(lhs, m)?, op, map_expr(expr, m)?)))
                .collect::<ConvertResult<Vec<_>>>()?,
            body,
        },
        Stmt::While(cond, body) => Stmt::While(map_expr(cond, m)?, body),
        Stmt::Timing(timing, body) => Stmt::Timing(map_timing(timing, m)?, body),
        Stmt::Case { kind, expr, arms } => Stmt::Case {
            kind,
            expr: map_expr(expr, m)?,
            arms: arms
                .into_iter()
                .map(|mut arm| {
                    arm.exprs = map_exprs(arm.exprs, m)?;
                    Ok(arm)
                })
                .collect::<ConvertResult<Vec<_>>>()?,
        },
        Stmt::Subroutine(name, args) => {
            Stmt::Subroutine(map_expr(name, m)?, map_exprs(args, m)?)
        }
        other @ (Stmt::Block { .. } | Stmt::Comment(_) | Stmt::Null) => other,
    })
}

/// Maps the leaves owned directly by a module item.
///
/// Statements, generate items, and nested package items are untouched;
/// the scope walk reaches them with their own hook invocations.
pub fn map_module_item<M: LeafMapper + ?Sized>(
    item: ModuleItem,
    m: &mut M,
) -> ConvertResult<ModuleItem> {
    Ok(match item {
        ModuleItem::Instance {
            module,
            params,
            name,
            range,
            ports,
        } => ModuleItem::Instance {
            module,
            params: map_bindings(params, m)?,
            name,
            range: match range {
                Some((a, b)) => Some((map_expr(a, m)?, map_expr(b, m)?)),
                None => None,
            },
            ports: ports
                .into_iter()
                .map(|binding| {
                    Ok(PortBinding {
                        port: binding.port,
                        expr: map_expr(binding.expr, m)?,
                    })
                })
                .collect::<ConvertResult<Vec<_>>>()?,
        },
        ModuleItem::Assign { lhs, expr } => ModuleItem::Assign {
            lhs: map_lhs(lhs, m)?,
            expr: map_expr(expr, m)?,
        },
        other => other,
    })
}

/// Maps the leaves owned directly by a generate item.
pub fn map_gen_item<M: LeafMapper + ?Sized>(item: GenItem, m: &mut M) -> ConvertResult<GenItem> {
    Ok(match item {
        GenItem::If(cond, then_item, else_item) => {
            GenItem::If(map_expr(cond, m)?, then_item, else_item)
        }
        GenItem::For {
            init,
            cond,
            step,
            body,
        } => GenItem::For {
            init: (init.0, map_expr(init.1, m)?),
            cond: map_expr(cond, m)?,
            step: (step.0, step.1, map_expr(step.2, m)?),
            body,
        },
        other => other,
    })
}

/// Applies `f` to each direct child statement of a statement, rebuilding
/// the parent. Not recursive: `f` decides whether to descend further.
pub fn map_nested_stmts<F>(stmt: Stmt, f: &mut F) -> ConvertResult<Stmt>
where
    F: FnMut(Stmt) -> ConvertResult<Stmt>,
{
    Ok(match stmt {
        Stmt::Block { name, decls, stmts } => Stmt::Block {
            name,
            decls,
            stmts: stmts.into_iter().map(&mut *f).collect::<ConvertResult<Vec<_>>>()?,
        },
        Stmt::If {
            cond,
            then_stmt,
            else_stmt,
        } => Stmt::If {
            cond,
            then_stmt: Box::new(f(*then_stmt)?),
            else_stmt: Box::new(f(*else_stmt)?),
        },
        Stmt::For {
            inits,
            cond,
            steps,
            body,
        } => Stmt::For {
            inits,
            cond,
            steps,
            body: Box::new(f(*body)?),
        },
        Stmt::While(cond, body) => Stmt::While(cond, Box::new(f(*body)?)),
        Stmt::Timing(timing, body) => Stmt::Timing(timing, Box::new(f(*body)?)),
        Stmt::Case { kind, expr, arms } => Stmt::Case {
            kind,
            expr,
            arms: arms
                .into_iter()
                .map(|mut arm| {
                    arm.stmt = f(arm.stmt)?;
                    Ok(arm)
                })
                .collect::<ConvertResult<Vec<_>>>()?,
        },
        other => other,
    })
}

/// Applies `f` to each direct child generate item, rebuilding the parent.
/// Not recursive: `f` decides whether to descend further.
pub fn map_nested_gen_items<F>(item: GenItem, f: &mut F) -> ConvertResult<GenItem>
where
    F: FnMut(GenItem) -> ConvertResult<GenItem>,
{
    Ok(match item {
        GenItem::Block(name, items) => GenItem::Block(
            name,
            items.into_iter().map(&mut *f).collect::<ConvertResult<Vec<_>>>()?,
        ),
        GenItem::If(cond, then_item, else_item) => GenItem::If(
            cond,
            Box::new(f(*then_item)?),
            Box::new(f(*else_item)?),
        ),
        GenItem::For {
            init,
            cond,
            step,
            body,
        } => GenItem::For {
            init,
            cond,
            step,
            body: Box::new(f(*body)?),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::{AsgnOp, BinOp};

    struct Renamer;

    impl LeafMapper for Renamer {
        fn expr(&mut self, expr: Expr) -> ConvertResult<Expr> {
            Ok(match expr {
                Expr::Ident(x) => Expr::Ident(format!("p_{x}")),
                other => other,
            })
        }
    }

    fn ident(x: &str) -> Expr {
        Expr::Ident(x.to_string())
    }

    #[test]
    fn map_expr_is_bottom_up_and_deep() {
        let e = Expr::BinOp(
            BinOp::Add,
            Box::new(ident("a")),
            Box::new(Expr::Bit(Box::new(ident("m")), Box::new(ident("i")))),
        );
        let mapped = map_expr(e, &mut Renamer).unwrap();
        assert_eq!(mapped.to_string(), "p_a + p_m[p_i]");
    }

    #[test]
    fn map_expr_reaches_class_bindings() {
        let e = Expr::ClassIdent(
            "cls".to_string(),
            vec![ParamBinding {
                param: String::new(),
                value: TypeOrExpr::Expr(ident("w")),
            }],
            "item".to_string(),
        );
        let mapped = map_expr(e, &mut Renamer).unwrap();
        assert_eq!(mapped.to_string(), "cls#(p_w)::item");
    }

    #[test]
    fn map_type_reaches_range_bounds() {
        let ty = Type::Alias("word_t".to_string(), vec![(ident("hi"), ident("lo"))]);
        let mapped = map_type(ty, &mut Renamer).unwrap();
        assert_eq!(mapped.to_string(), "word_t [p_hi:p_lo]");
    }

    #[test]
    fn map_stmt_leaves_children_alone() {
        let inner = Stmt::Asgn {
            op: AsgnOp::Eq,
            timing: None,
            lhs: Lhs::Ident("q".to_string()),
            expr: ident("d"),
        };
        let stmt = Stmt::If {
            cond: ident("en"),
            then_stmt: Box::new(inner.clone()),
            else_stmt: Box::new(Stmt::Null),
        };
        let mapped = map_stmt(stmt, &mut Renamer).unwrap();
        match mapped {
            Stmt::If {
                cond, then_stmt, ..
            } => {
                assert_eq!(cond, ident("p_en"));
                assert_eq!(*then_stmt, inner, "child statements must be untouched");
            }
            other => panic!("unexpected mapping {other:?}"),
        }
    }

    #[test]
    fn map_nested_stmts_visits_direct_children() {
        let stmt = Stmt::Block {
            name: None,
            decls: Vec::new(),
            stmts: vec![Stmt::Null, Stmt::Comment("x".to_string())],
        };
        let mut seen = 0usize;
        map_nested_stmts(stmt, &mut |s| {
            seen += 1;
            Ok(s)
        })
        .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn map_errors_propagate() {
        struct Failing;
        impl LeafMapper for Failing {
            fn expr(&mut self, _: Expr) -> ConvertResult<Expr> {
                Err(svlower_common::ConvertError::Structural {
                    message: "boom".to_string(),
                })
            }
        }
        assert!(map_expr(ident("x"), &mut Failing).is_err());
    }
}
