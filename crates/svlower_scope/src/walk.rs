//! Scope-aware traversal drivers.

use svlower_ast::{Decl, GenItem, ModuleItem, PackageItem, Part, Stmt};
use svlower_common::ConvertResult;
use svlower_traverse::{map_nested_gen_items, map_nested_stmts};

use crate::scoper::Scoper;

/// Per-node rewrite hooks invoked by the scope walk.
///
/// Every hook defaults to the identity and receives the scoper positioned
/// at the node's scope. Hooks run before the walk descends into the
/// node's children, so a hook that replaces a node sees its replacement
/// traversed. Declarations always arrive through [`decl`](Self::decl),
/// including those wrapped in module items; the
/// [`module_item`](Self::module_item) hook never sees a package item.
pub trait ScopePass<M> {
    /// Rewrites a package item other than a plain declaration.
    fn package_item(
        &mut self,
        _scoper: &mut Scoper<M>,
        item: PackageItem,
    ) -> ConvertResult<PackageItem> {
        Ok(item)
    }

    /// Rewrites a declaration.
    fn decl(&mut self, _scoper: &mut Scoper<M>, decl: Decl) -> ConvertResult<Decl> {
        Ok(decl)
    }

    /// Rewrites a module item.
    fn module_item(
        &mut self,
        _scoper: &mut Scoper<M>,
        item: ModuleItem,
    ) -> ConvertResult<ModuleItem> {
        Ok(item)
    }

    /// Rewrites a generate item.
    fn gen_item(&mut self, _scoper: &mut Scoper<M>, item: GenItem) -> ConvertResult<GenItem> {
        Ok(item)
    }

    /// Rewrites a statement.
    fn stmt(&mut self, _scoper: &mut Scoper<M>, stmt: Stmt) -> ConvertResult<Stmt> {
        Ok(stmt)
    }
}

/// Runs a complete per-frame rewrite over a part.
///
/// A frame named after the part is active for the whole walk. Passes
/// needing an observe-then-rewrite sequence run this twice with fresh
/// scopers.
pub fn scope_part<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    mut part: Part,
) -> ConvertResult<Part> {
    let items = std::mem::take(&mut part.items);
    scoper.enter(&part.name, false);
    let items: ConvertResult<Vec<ModuleItem>> = items
        .into_iter()
        .map(|item| scope_module_item(scoper, pass, item))
        .collect();
    scoper.exit();
    part.items = items?;
    Ok(part)
}

/// Walks one module item, dispatching hooks and recursing into bodies.
pub fn scope_module_item<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    item: ModuleItem,
) -> ConvertResult<ModuleItem> {
    if let ModuleItem::PackageItem(inner) = item {
        return Ok(ModuleItem::PackageItem(scope_package_item(
            scoper, pass, inner,
        )?));
    }
    let item = pass.module_item(scoper, item)?;
    match item {
        ModuleItem::AlwaysC { kw, stmt } => Ok(ModuleItem::AlwaysC {
            kw,
            stmt: scope_stmt(scoper, pass, stmt)?,
        }),
        ModuleItem::Initial(stmt) => Ok(ModuleItem::Initial(scope_stmt(scoper, pass, stmt)?)),
        ModuleItem::Final(stmt) => Ok(ModuleItem::Final(scope_stmt(scoper, pass, stmt)?)),
        ModuleItem::Generate(items) => {
            let items: ConvertResult<Vec<GenItem>> = items
                .into_iter()
                .map(|g| scope_gen_item(scoper, pass, g))
                .collect();
            Ok(ModuleItem::Generate(items?))
        }
        ModuleItem::PackageItem(inner) => Ok(ModuleItem::PackageItem(scope_package_item(
            scoper, pass, inner,
        )?)),
        other => Ok(other),
    }
}

/// Walks one package item. Functions and tasks get a procedural frame
/// covering their declarations and body.
pub fn scope_package_item<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    item: PackageItem,
) -> ConvertResult<PackageItem> {
    if let PackageItem::Decl(decl) = item {
        return Ok(PackageItem::Decl(pass.decl(scoper, decl)?));
    }
    let item = pass.package_item(scoper, item)?;
    match item {
        PackageItem::Function(mut func) => {
            scoper.enter(&func.name, true);
            let result = scope_subroutine_body(scoper, pass, func.decls, func.stmts);
            scoper.exit();
            let (decls, stmts) = result?;
            func.decls = decls;
            func.stmts = stmts;
            Ok(PackageItem::Function(func))
        }
        PackageItem::Task(mut task) => {
            scoper.enter(&task.name, true);
            let result = scope_subroutine_body(scoper, pass, task.decls, task.stmts);
            scoper.exit();
            let (decls, stmts) = result?;
            task.decls = decls;
            task.stmts = stmts;
            Ok(PackageItem::Task(task))
        }
        other => Ok(other),
    }
}

fn scope_subroutine_body<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    decls: Vec<Decl>,
    stmts: Vec<Stmt>,
) -> ConvertResult<(Vec<Decl>, Vec<Stmt>)> {
    let decls: ConvertResult<Vec<Decl>> = decls
        .into_iter()
        .map(|d| pass.decl(scoper, d))
        .collect();
    let decls = decls?;
    let stmts: ConvertResult<Vec<Stmt>> = stmts
        .into_iter()
        .map(|s| scope_stmt(scoper, pass, s))
        .collect();
    Ok((decls, stmts?))
}

/// Walks one generate item. Named blocks get a frame; unnamed blocks and
/// conditional branches recurse in the enclosing scope.
pub fn scope_gen_item<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    item: GenItem,
) -> ConvertResult<GenItem> {
    let item = pass.gen_item(scoper, item)?;
    match item {
        GenItem::Block(Some(name), items) => {
            scoper.enter(&name, false);
            let items: ConvertResult<Vec<GenItem>> = items
                .into_iter()
                .map(|g| scope_gen_item(scoper, pass, g))
                .collect();
            scoper.exit();
            Ok(GenItem::Block(Some(name), items?))
        }
        GenItem::ModuleItem(inner) => Ok(GenItem::ModuleItem(Box::new(scope_module_item(
            scoper, pass, *inner,
        )?))),
        other => map_nested_gen_items(other, &mut |g| scope_gen_item(scoper, pass, g)),
    }
}

/// Walks one statement. Blocks get a procedural frame covering their
/// declarations and child statements.
pub fn scope_stmt<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    stmt: Stmt,
) -> ConvertResult<Stmt> {
    let stmt = pass.stmt(scoper, stmt)?;
    match stmt {
        Stmt::Block { name, decls, stmts } => {
            scoper.enter(name.as_deref().unwrap_or(""), true);
            let result = scope_block_body(scoper, pass, decls, stmts);
            scoper.exit();
            let (decls, stmts) = result?;
            Ok(Stmt::Block { name, decls, stmts })
        }
        other => map_nested_stmts(other, &mut |s| scope_stmt(scoper, pass, s)),
    }
}

fn scope_block_body<M, P: ScopePass<M>>(
    scoper: &mut Scoper<M>,
    pass: &mut P,
    decls: Vec<Decl>,
    stmts: Vec<Stmt>,
) -> ConvertResult<(Vec<Decl>, Vec<Stmt>)> {
    let decls: ConvertResult<Vec<Decl>> = decls
        .into_iter()
        .map(|d| pass.decl(scoper, d))
        .collect();
    let decls = decls?;
    let stmts: ConvertResult<Vec<Stmt>> = stmts
        .into_iter()
        .map(|s| scope_stmt(scoper, pass, s))
        .collect();
    Ok((decls, stmts?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::{
        AsgnOp, Direction, Expr, IntegerVectorKind, Lhs, Lifetime, PartKind, Signing, Type,
    };

    /// Records the (path, procedural) context of every declaration seen.
    #[derive(Default)]
    struct DeclObserver {
        seen: Vec<(String, bool)>,
    }

    impl ScopePass<()> for DeclObserver {
        fn decl(&mut self, scoper: &mut Scoper<()>, decl: Decl) -> ConvertResult<Decl> {
            if let Some(name) = decl.name() {
                scoper.insert_elem(name, ());
                let entry = scoper.lookup(name).unwrap().1;
                self.seen.push((
                    crate::access_key(&entry.accesses),
                    scoper.within_procedure(),
                ));
            }
            Ok(decl)
        }
    }

    fn var(name: &str) -> Decl {
        Decl::Variable {
            dir: Direction::Local,
            ty: Type::IntegerVector(IntegerVectorKind::Logic, Signing::Unspecified, Vec::new()),
            name: name.to_string(),
            dims: Vec::new(),
            init: None,
        }
    }

    fn part(items: Vec<ModuleItem>) -> Part {
        Part {
            attrs: Vec::new(),
            is_extern: false,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: "m".to_string(),
            ports: Vec::new(),
            items,
        }
    }

    #[test]
    fn module_scope_decl_is_not_procedural() {
        let p = part(vec![ModuleItem::PackageItem(PackageItem::Decl(var("w")))]);
        let mut scoper = Scoper::new();
        let mut pass = DeclObserver::default();
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(pass.seen, vec![("m.w".to_string(), false)]);
    }

    #[test]
    fn generate_block_contributes_path_segment() {
        let p = part(vec![ModuleItem::Generate(vec![GenItem::Block(
            Some("g".to_string()),
            vec![GenItem::ModuleItem(Box::new(ModuleItem::PackageItem(
                PackageItem::Decl(var("w")),
            )))],
        )])]);
        let mut scoper = Scoper::new();
        let mut pass = DeclObserver::default();
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(pass.seen, vec![("m.g.w".to_string(), false)]);
    }

    #[test]
    fn function_decls_are_procedural() {
        let func = svlower_ast::Function {
            lifetime: Lifetime::Inherit,
            ret: Type::Implicit(Signing::Unspecified, Vec::new()),
            name: "f".to_string(),
            decls: vec![var("tmp")],
            stmts: Vec::new(),
        };
        let p = part(vec![ModuleItem::PackageItem(PackageItem::Function(func))]);
        let mut scoper = Scoper::new();
        let mut pass = DeclObserver::default();
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(pass.seen, vec![("m.f.tmp".to_string(), true)]);
    }

    #[test]
    fn block_decls_are_procedural() {
        let stmt = Stmt::Block {
            name: Some("work".to_string()),
            decls: vec![var("i")],
            stmts: Vec::new(),
        };
        let p = part(vec![ModuleItem::Initial(stmt)]);
        let mut scoper = Scoper::new();
        let mut pass = DeclObserver::default();
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(pass.seen, vec![("m.work.i".to_string(), true)]);
    }

    #[test]
    fn frames_pop_after_walk() {
        let p = part(vec![ModuleItem::Initial(Stmt::Block {
            name: Some("b".to_string()),
            decls: Vec::new(),
            stmts: Vec::new(),
        })]);
        let mut scoper: Scoper<()> = Scoper::new();
        let mut pass = DeclObserver::default();
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(scoper.depth(), 0);
    }

    #[test]
    fn stmt_hook_sees_nested_statements() {
        struct CountAsgns(usize);
        impl ScopePass<()> for CountAsgns {
            fn stmt(&mut self, _: &mut Scoper<()>, stmt: Stmt) -> ConvertResult<Stmt> {
                if matches!(stmt, Stmt::Asgn { .. }) {
                    self.0 += 1;
                }
                Ok(stmt)
            }
        }
        let asgn = Stmt::Asgn {
            op: AsgnOp::Eq,
            timing: None,
            lhs: Lhs::Ident("q".to_string()),
            expr: Expr::Ident("d".to_string()),
        };
        let p = part(vec![ModuleItem::Initial(Stmt::Block {
            name: None,
            decls: Vec::new(),
            stmts: vec![
                asgn.clone(),
                Stmt::If {
                    cond: Expr::Ident("en".to_string()),
                    then_stmt: Box::new(asgn),
                    else_stmt: Box::new(Stmt::Null),
                },
            ],
        })]);
        let mut scoper = Scoper::new();
        let mut pass = CountAsgns(0);
        scope_part(&mut scoper, &mut pass, p).unwrap();
        assert_eq!(pass.0, 2);
    }
}
