//! Write-only deep traversals.
//!
//! Unlike the mappers, collectors descend through every nested statement,
//! generate item, and subroutine body: they exist to accumulate facts
//! about a whole subtree (used identifiers, referenced types) and need no
//! scope bookkeeping.

use svlower_ast::{
    Decl, Expr, GenItem, Lhs, ModuleItem, PackageItem, ParamBinding, Range, Sense, Stmt, Timing,
    Type, TypeOrExpr,
};

/// Per-node observation hooks for the leaf AST families.
///
/// Every hook defaults to a no-op. Hooks are invoked on every node of the
/// subtree, parents after children.
pub trait LeafCollector {
    /// Observes one expression node.
    fn expr(&mut self, _expr: &Expr) {}

    /// Observes one type node.
    fn ty(&mut self, _ty: &Type) {}

    /// Observes one assignment-target node.
    fn lhs(&mut self, _lhs: &Lhs) {}
}

fn collect_ranges<C: LeafCollector + ?Sized>(ranges: &[Range], c: &mut C) {
    for (a, b) in ranges {
        collect_expr(a, c);
        collect_expr(b, c);
    }
}

fn collect_bindings<C: LeafCollector + ?Sized>(bindings: &[ParamBinding], c: &mut C) {
    for binding in bindings {
        match &binding.value {
            TypeOrExpr::Type(ty) => collect_type(ty, c),
            TypeOrExpr::Expr(expr) => collect_expr(expr, c),
        }
    }
}

/// Observes every node of an expression tree.
pub fn collect_expr<C: LeafCollector + ?Sized>(expr: &Expr, c: &mut C) {
    match expr {
        Expr::ClassIdent(_, bindings, _) => collect_bindings(bindings, c),
        Expr::Bit(base, idx) => {
            collect_expr(base, c);
            collect_expr(idx, c);
        }
        Expr::RangeSel(base, _, range) => {
            collect_expr(base, c);
            collect_expr(&range.0, c);
            collect_expr(&range.1, c);
        }
        Expr::Dot(base, _) => collect_expr(base, c),
        Expr::Concat(items) => items.iter().for_each(|e| collect_expr(e, c)),
        Expr::Repeat(count, items) => {
            collect_expr(count, c);
            items.iter().for_each(|e| collect_expr(e, c));
        }
        Expr::Call(func, args) => {
            collect_expr(func, c);
            args.iter().for_each(|e| collect_expr(e, c));
        }
        Expr::UniOp(_, arg) => collect_expr(arg, c),
        Expr::BinOp(_, lhs, rhs) => {
            collect_expr(lhs, c);
            collect_expr(rhs, c);
        }
        Expr::Mux(cond, then_e, else_e) => {
            collect_expr(cond, c);
            collect_expr(then_e, c);
            collect_expr(else_e, c);
        }
        Expr::Cast(target, value) => {
            match &**target {
                TypeOrExpr::Type(ty) => collect_type(ty, c),
                TypeOrExpr::Expr(expr) => collect_expr(expr, c),
            }
            collect_expr(value, c);
        }
        Expr::Ident(_)
        | Expr::PkgIdent(..)
        | Expr::Number(_)
        | Expr::Real(_)
        | Expr::Time(_)
        | Expr::StringLit(_)
        | Expr::Nil => {}
    }
    c.expr(expr);
}

/// Observes every node of a type tree.
pub fn collect_type<C: LeafCollector + ?Sized>(ty: &Type, c: &mut C) {
    match ty {
        Type::IntegerVector(_, _, rs)
        | Type::Net(_, _, rs)
        | Type::Implicit(_, rs)
        | Type::Alias(_, rs)
        | Type::PkgAlias(_, _, rs)
        | Type::InterfaceRef(_, _, rs) => collect_ranges(rs, c),
        Type::ClassAlias(_, bindings, _, rs) => {
            collect_bindings(bindings, c);
            collect_ranges(rs, c);
        }
        Type::Enum(base, items, rs) => {
            collect_type(base, c);
            for item in items {
                if let Some(value) = &item.value {
                    collect_expr(value, c);
                }
            }
            collect_ranges(rs, c);
        }
        Type::Struct(_, fields, rs) | Type::Union(_, fields, rs) => {
            for field in fields {
                collect_type(&field.ty, c);
            }
            collect_ranges(rs, c);
        }
        Type::TypeOf(expr) => collect_expr(expr, c),
        Type::UnpackedType(inner, rs) => {
            collect_type(inner, c);
            collect_ranges(rs, c);
        }
        Type::IntegerAtom(..) | Type::NonInteger(_) => {}
    }
    c.ty(ty);
}

/// Observes every node of an assignment-target tree.
pub fn collect_lhs<C: LeafCollector + ?Sized>(lhs: &Lhs, c: &mut C) {
    match lhs {
        Lhs::Bit(base, idx) => {
            collect_lhs(base, c);
            collect_expr(idx, c);
        }
        Lhs::Range(base, _, range) => {
            collect_lhs(base, c);
            collect_expr(&range.0, c);
            collect_expr(&range.1, c);
        }
        Lhs::Dot(base, _) => collect_lhs(base, c),
        Lhs::Concat(items) => items.iter().for_each(|l| collect_lhs(l, c)),
        Lhs::Ident(_) => {}
    }
    c.lhs(lhs);
}

/// Observes every leaf node in a declaration.
pub fn collect_decl<C: LeafCollector + ?Sized>(decl: &Decl, c: &mut C) {
    match decl {
        Decl::Variable { ty, dims, init, .. } => {
            collect_type(ty, c);
            collect_ranges(dims, c);
            if let Some(init) = init {
                collect_expr(init, c);
            }
        }
        Decl::Param { ty, value, .. } => {
            collect_type(ty, c);
            collect_expr(value, c);
        }
        Decl::ParamType { ty, .. } => collect_type(ty, c),
        Decl::Comment(_) => {}
    }
}

fn collect_timing<C: LeafCollector + ?Sized>(timing: &Timing, c: &mut C) {
    match timing {
        Timing::Event(sense) => collect_sense(sense, c),
        Timing::Delay(expr) => collect_expr(expr, c),
    }
}

fn collect_sense<C: LeafCollector + ?Sized>(sense: &Sense, c: &mut C) {
    match sense {
        Sense::Lhs(lhs) | Sense::Posedge(lhs) | Sense::Negedge(lhs) => collect_lhs(lhs, c),
        Sense::Or(a, b) => {
            collect_sense(a, c);
            collect_sense(b, c);
        }
        Sense::Star => {}
    }
}

/// Observes every leaf node in a statement, descending through nested
/// statements.
pub fn collect_stmt<C: LeafCollector + ?Sized>(stmt: &Stmt, c: &mut C) {
    match stmt {
        Stmt::Block { decls, stmts, .. } => {
            decls.iter().for_each(|d| collect_decl(d, c));
            stmts.iter().for_each(|s| collect_stmt(s, c));
        }
        Stmt::Asgn {
            timing, lhs, expr, ..
        } => {
            if let Some(timing) = timing {
                collect_timing(timing, c);
            }
            collect_lhs(lhs, c);
            collect_expr(expr, c);
        }
        Stmt::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            collect_expr(cond, c);
            collect_stmt(then_stmt, c);
            collect_stmt(else_stmt, c);
        }
        Stmt::For {
            inits,
            cond,
            steps,
            body,
        } => {
            for (lhs, expr) in inits {
                collect_lhs(lhs, c);
                collect_expr(expr, c);
            }
            collect_expr(cond, c);
            for (lhs, _, expr) in steps {
                collect_lhs(lhs, c);
                collect_expr(expr, c);
            }
            collect_stmt(body, c);
        }
        Stmt::While(cond, body) => {
            collect_expr(cond, c);
            collect_stmt(body, c);
        }
        Stmt::Timing(timing, body) => {
            collect_timing(timing, c);
            collect_stmt(body, c);
        }
        Stmt::Case { expr, arms, .. } => {
            collect_expr(expr, c);
            for arm in arms {
                arm.exprs.iter().for_each(|e| collect_expr(e, c));
                collect_stmt(&arm.stmt, c);
            }
        }
        Stmt::Subroutine(name, args) => {
            collect_expr(name, c);
            args.iter().for_each(|e| collect_expr(e, c));
        }
        Stmt::Comment(_) | Stmt::Null => {}
    }
}

/// Observes every leaf node in a package item, descending through
/// subroutine bodies.
pub fn collect_package_item<C: LeafCollector + ?Sized>(item: &PackageItem, c: &mut C) {
    match item {
        PackageItem::Function(func) => {
            collect_type(&func.ret, c);
            func.decls.iter().for_each(|d| collect_decl(d, c));
            func.stmts.iter().for_each(|s| collect_stmt(s, c));
        }
        PackageItem::Task(task) => {
            task.decls.iter().for_each(|d| collect_decl(d, c));
            task.stmts.iter().for_each(|s| collect_stmt(s, c));
        }
        PackageItem::Decl(decl) => collect_decl(decl, c),
        PackageItem::Import(..) | PackageItem::Export(_) | PackageItem::Directive(_) => {}
    }
}

/// Observes every leaf node in a module item, descending through
/// statements and generate items.
pub fn collect_module_item<C: LeafCollector + ?Sized>(item: &ModuleItem, c: &mut C) {
    match item {
        ModuleItem::PackageItem(pi) => collect_package_item(pi, c),
        ModuleItem::Instance {
            params,
            range,
            ports,
            ..
        } => {
            collect_bindings(params, c);
            if let Some((a, b)) = range {
                collect_expr(a, c);
                collect_expr(b, c);
            }
            for port in ports {
                collect_expr(&port.expr, c);
            }
        }
        ModuleItem::Assign { lhs, expr } => {
            collect_lhs(lhs, c);
            collect_expr(expr, c);
        }
        ModuleItem::AlwaysC { stmt, .. } => collect_stmt(stmt, c),
        ModuleItem::Initial(stmt) | ModuleItem::Final(stmt) => collect_stmt(stmt, c),
        ModuleItem::Generate(items) => items.iter().for_each(|g| collect_gen_item(g, c)),
        ModuleItem::Genvar(_) => {}
    }
}

/// Observes every leaf node in a generate item, descending through nested
/// generate items.
pub fn collect_gen_item<C: LeafCollector + ?Sized>(item: &GenItem, c: &mut C) {
    match item {
        GenItem::Block(_, items) => items.iter().for_each(|g| collect_gen_item(g, c)),
        GenItem::ModuleItem(inner) => collect_module_item(inner, c),
        GenItem::If(cond, then_item, else_item) => {
            collect_expr(cond, c);
            collect_gen_item(then_item, c);
            collect_gen_item(else_item, c);
        }
        GenItem::For {
            init,
            cond,
            step,
            body,
        } => {
            collect_expr(&init.1, c);
            collect_expr(cond, c);
            collect_expr(&step.2, c);
            collect_gen_item(body, c);
        }
        GenItem::Null => {}
    }
}
