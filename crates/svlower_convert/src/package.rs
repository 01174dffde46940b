//! Package and class elaboration.
//!
//! Packages and classes do not exist in Verilog-2005. This pass collects
//! them out of the description list, elaborates each package lazily on
//! first reference, flattens package-scoped names by mangling
//! (`pkg::x` becomes `pkg_x`), specializes parameterized classes into
//! synthetic packages keyed by their resolved bindings, and finally
//! injects the package items a module needs ahead of their first use.

use std::collections::{BTreeMap, BTreeSet};

use svlower_ast::{
    expr_to_type, Decl, Description, Expr, ExportSpec, Identifier, Lhs, ModuleItem, PackageItem,
    ParamScope, Part, Type, TypeOrExpr,
};
use svlower_common::{short_hash, ConvertResult};
use svlower_scope::{scope_package_item, scope_part, ScopePass, Scoper};
use svlower_traverse::{
    collect_decl, collect_expr, collect_module_item, collect_package_item, collect_type, map_decl,
    map_gen_item, map_module_item, map_stmt, map_type, LeafCollector, LeafMapper,
};

use crate::bindings::resolve_bindings;
use crate::errors;
use crate::reorder::reorder_items;

/// Elaborates every package and class reference in the design.
pub fn convert(descriptions: Vec<Description>) -> ConvertResult<Vec<Description>> {
    let mut table = PackageTable::default();
    let mut root_items: Vec<PackageItem> = Vec::new();
    let mut positional: Vec<Description> = Vec::new();

    // Step A: collect packages and classes, leaving removal markers.
    for desc in descriptions {
        match desc {
            Description::Package(package) => {
                positional.push(Description::Item(comment(format!(
                    "removed package {}",
                    package.name
                ))));
                table.packages.insert(package.name, package.items);
            }
            Description::Class(class) => {
                positional.push(Description::Item(comment(format!(
                    "removed class {}",
                    class.name
                ))));
                table.classes.insert(
                    class.name,
                    ClassDef {
                        params: class.params,
                        items: class.items,
                    },
                );
            }
            Description::Item(item) => root_items.push(item),
            part => positional.push(part),
        }
    }

    // Steps B-D: process parts (triggering packages lazily, in reference
    // order), then sweep the remaining packages, then the root items.
    let mut parts: Vec<Description> = Vec::new();
    for desc in positional {
        match desc {
            Description::Part(part) if !part.is_extern => {
                parts.push(Description::Part(process_part(&mut table, part)?));
            }
            other => parts.push(other),
        }
    }
    let remaining: Vec<Identifier> = table.packages.keys().cloned().collect();
    for name in remaining {
        ensure_processed(&mut table, &name)?;
    }
    let (_, root_items) = process_items(&mut table, "", root_items)?;

    // Step E: inject needed root and synthetic items into each part.
    let mut pis: BTreeMap<Identifier, PackageItem> = BTreeMap::new();
    for item in &root_items {
        for name in package_item_names(item) {
            pis.insert(name, item.clone());
        }
    }
    for syn in &table.synthetic {
        for item in &table.processed[syn].items {
            for name in package_item_names(item) {
                pis.insert(name, item.clone());
            }
        }
    }
    let parts: Vec<Description> = parts
        .into_iter()
        .map(|desc| match desc {
            Description::Part(part) => Description::Part(add_items(&pis, part)),
            other => other,
        })
        .collect();

    // Emission: processed package items first, in completion order (a
    // topological order of the import graph), then the root items, then
    // the parts and removal markers in source order.
    let mut out: Vec<Description> = Vec::new();
    for name in &table.completion_order {
        for item in &table.processed[name].items {
            out.push(Description::Item(item.clone()));
        }
    }
    out.extend(root_items.into_iter().map(Description::Item));
    out.extend(parts);
    Ok(out)
}

fn comment(text: String) -> PackageItem {
    PackageItem::Decl(Decl::Comment(text))
}

// ============================================================================
// Tables
// ============================================================================

/// Per-identifier binding state during item processing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentState {
    /// Candidate from wildcard imports of the listed root packages.
    Available(Vec<Identifier>),
    /// Bound to a specific root package by an explicit import or a use.
    Imported(Identifier),
    /// Defined locally.
    Declared,
}

#[derive(Debug, Clone)]
struct ClassDef {
    params: Vec<Decl>,
    items: Vec<PackageItem>,
}

#[derive(Debug, Clone, Default)]
struct Processed {
    /// Exported member name to the package where it is truly declared.
    exports: BTreeMap<Identifier, Identifier>,
    items: Vec<PackageItem>,
}

/// All package and class state for one conversion run.
#[derive(Default)]
struct PackageTable {
    packages: BTreeMap<Identifier, Vec<PackageItem>>,
    classes: BTreeMap<Identifier, ClassDef>,
    processed: BTreeMap<Identifier, Processed>,
    /// Packages currently being processed, for dependency-loop detection.
    visiting: Vec<Identifier>,
    /// Real packages in the order their processing completed.
    completion_order: Vec<Identifier>,
    /// Synthetic class-specialization packages, in creation order.
    synthetic: Vec<Identifier>,
}

/// Processes a package on first use and returns its export map.
fn package_exports(
    table: &mut PackageTable,
    name: &str,
) -> ConvertResult<BTreeMap<Identifier, Identifier>> {
    ensure_processed(table, name)?;
    Ok(table.processed[name].exports.clone())
}

fn ensure_processed(table: &mut PackageTable, name: &str) -> ConvertResult<()> {
    if table.processed.contains_key(name) {
        return Ok(());
    }
    if table.visiting.iter().any(|n| n == name) {
        let mut cycle = table.visiting.clone();
        cycle.push(name.to_string());
        return Err(errors::dependency_loop(&cycle));
    }
    let Some(items) = table.packages.get(name).cloned() else {
        return Err(errors::unknown_package(name));
    };
    table.visiting.push(name.to_string());
    let result = process_items(table, name, items);
    table.visiting.pop();
    let (exports, items) = result?;
    table.processed.insert(
        name.to_string(),
        Processed { exports, items },
    );
    table.completion_order.push(name.to_string());
    Ok(())
}

// ============================================================================
// Item processing
// ============================================================================

/// Reorders, renames, and resolves one item list, for the package named
/// `pkg` (empty at file scope). Returns the export map and the processed
/// items.
fn process_items(
    table: &mut PackageTable,
    pkg: &str,
    items: Vec<PackageItem>,
) -> ConvertResult<(BTreeMap<Identifier, Identifier>, Vec<PackageItem>)> {
    let items = reorder_items(items, package_item_names, package_item_used);
    let mut scoper: Scoper<IdentState> = Scoper::new();
    scoper.enter(pkg, false);
    let mut pass = PackagePass {
        table,
        pkg: pkg.to_string(),
        export_specs: Vec::new(),
    };
    let processed: ConvertResult<Vec<PackageItem>> = items
        .into_iter()
        .map(|item| scope_package_item(&mut scoper, &mut pass, item))
        .collect();
    let result = processed.and_then(|items| {
        let exports = if pkg.is_empty() {
            BTreeMap::new()
        } else {
            resolve_exports(&mut pass, &scoper)?
        };
        Ok((exports, items))
    });
    scoper.exit();
    result
}

fn process_part(table: &mut PackageTable, part: Part) -> ConvertResult<Part> {
    let mut scoper: Scoper<IdentState> = Scoper::new();
    let mut pass = PackagePass {
        table,
        pkg: String::new(),
        export_specs: Vec::new(),
    };
    scope_part(&mut scoper, &mut pass, part)
}

/// Validates the recorded export specs against the final scope state and
/// builds the package's export map.
fn resolve_exports(
    pass: &mut PackagePass<'_>,
    scoper: &Scoper<IdentState>,
) -> ConvertResult<BTreeMap<Identifier, Identifier>> {
    let mut exports: BTreeMap<Identifier, Identifier> = BTreeMap::new();
    for (name, entry) in scoper.frame_mapping(0) {
        if entry.meta == IdentState::Declared {
            exports.insert(name.clone(), pass.pkg.clone());
        }
    }
    let flat = scoper.extract_mapping();
    let specs = std::mem::take(&mut pass.export_specs);
    for spec in specs {
        match spec {
            ExportSpec::All => {
                for (name, state) in &flat {
                    if let IdentState::Imported(root) = state {
                        exports.insert(name.clone(), root.clone());
                    }
                }
            }
            ExportSpec::Package(pkg) => {
                // Symbols re-imported from the same root are re-exported;
                // anything else is dropped silently.
                for (name, root) in package_exports(pass.table, &pkg)? {
                    if flat.get(&name) == Some(&IdentState::Imported(root.clone())) {
                        exports.insert(name, root);
                    }
                }
            }
            ExportSpec::Item(pkg, name) => {
                let upstream = package_exports(pass.table, &pkg)?;
                let root = upstream
                    .get(&name)
                    .ok_or_else(|| errors::unknown_member(&pkg, &name))?;
                if flat.get(&name) != Some(&IdentState::Imported(root.clone())) {
                    return Err(errors::export_not_imported(&pkg, &name));
                }
                exports.insert(name, root.clone());
            }
        }
    }
    Ok(exports)
}

// ============================================================================
// The scoped pass
// ============================================================================

struct PackagePass<'a> {
    table: &'a mut PackageTable,
    /// The package being processed; empty at module or file scope.
    pkg: Identifier,
    export_specs: Vec<ExportSpec>,
}

/// Declares `name` in the current frame and returns the emitted name:
/// mangled at the top frame of a package, unchanged elsewhere.
fn prefix_ident(
    pkg: &str,
    scoper: &mut Scoper<IdentState>,
    name: &str,
) -> ConvertResult<Identifier> {
    if let Some(entry) = scoper.lookup_local(name) {
        if let IdentState::Imported(from) = &entry.meta {
            return Err(errors::import_conflicts_with_decl(name, from));
        }
    }
    scoper.insert_elem(name, IdentState::Declared);
    if !pkg.is_empty() && scoper.depth() == 1 && !scoper.within_procedure() {
        Ok(format!("{pkg}_{name}"))
    } else {
        Ok(name.to_string())
    }
}

impl PackagePass<'_> {
    fn import_explicit(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        pkg: &str,
        name: &str,
    ) -> ConvertResult<()> {
        let exports = package_exports(self.table, pkg)?;
        let root = exports
            .get(name)
            .ok_or_else(|| errors::unknown_member(pkg, name))?
            .clone();
        if let Some(entry) = scoper.lookup_local(name) {
            match &entry.meta {
                IdentState::Imported(prev) if prev != &root => {
                    return Err(errors::conflicting_imports(name, prev, &root));
                }
                IdentState::Declared => {
                    return Err(errors::import_conflicts_with_decl(name, pkg));
                }
                _ => {}
            }
        }
        scoper.insert_elem(name, IdentState::Imported(root));
        Ok(())
    }

    fn import_wildcard(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        pkg: &str,
    ) -> ConvertResult<()> {
        let exports = package_exports(self.table, pkg)?;
        for (name, root) in exports {
            match scoper.lookup_local(&name).map(|e| e.meta.clone()) {
                Some(IdentState::Imported(_)) | Some(IdentState::Declared) => {}
                Some(IdentState::Available(mut roots)) => {
                    if !roots.contains(&root) {
                        roots.push(root);
                        scoper.insert_elem(&name, IdentState::Available(roots));
                    }
                }
                None => scoper.insert_elem(&name, IdentState::Available(vec![root])),
            }
        }
        Ok(())
    }
}

impl ScopePass<IdentState> for PackagePass<'_> {
    fn package_item(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        item: PackageItem,
    ) -> ConvertResult<PackageItem> {
        match item {
            PackageItem::Import(pkg, Some(name)) => {
                self.import_explicit(scoper, &pkg, &name)?;
                Ok(comment(format!("import {pkg}::{name}")))
            }
            PackageItem::Import(pkg, None) => {
                self.import_wildcard(scoper, &pkg)?;
                Ok(comment(format!("import {pkg}::*")))
            }
            PackageItem::Export(spec) => {
                if self.pkg.is_empty() {
                    return Err(errors::export_outside_package(&spec));
                }
                self.export_specs.push(spec.clone());
                Ok(comment(format!("{spec}")))
            }
            PackageItem::Function(mut func) => {
                func.ret = map_type(
                    func.ret,
                    &mut Resolver {
                        table: &mut *self.table,
                        pkg: self.pkg.as_str(),
                        scoper: &mut *scoper,
                    },
                )?;
                func.name = prefix_ident(&self.pkg, scoper, &func.name)?;
                Ok(PackageItem::Function(func))
            }
            PackageItem::Task(mut task) => {
                task.name = prefix_ident(&self.pkg, scoper, &task.name)?;
                Ok(PackageItem::Task(task))
            }
            other => Ok(other),
        }
    }

    fn decl(&mut self, scoper: &mut Scoper<IdentState>, decl: Decl) -> ConvertResult<Decl> {
        let decl = map_decl(
            decl,
            &mut Resolver {
                table: &mut *self.table,
                pkg: self.pkg.as_str(),
                scoper: &mut *scoper,
            },
        )?;
        Ok(match decl {
            Decl::Variable {
                dir,
                ty,
                name,
                dims,
                init,
            } => {
                let name = prefix_ident(&self.pkg, scoper, &name)?;
                Decl::Variable {
                    dir,
                    ty,
                    name,
                    dims,
                    init,
                }
            }
            Decl::Param {
                kind,
                ty,
                name,
                value,
            } => {
                let name = prefix_ident(&self.pkg, scoper, &name)?;
                Decl::Param {
                    kind,
                    ty,
                    name,
                    value,
                }
            }
            Decl::ParamType { kind, name, ty } => {
                let name = prefix_ident(&self.pkg, scoper, &name)?;
                Decl::ParamType { kind, name, ty }
            }
            comment @ Decl::Comment(_) => comment,
        })
    }

    fn module_item(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        item: ModuleItem,
    ) -> ConvertResult<ModuleItem> {
        map_module_item(
            item,
            &mut Resolver {
                table: &mut *self.table,
                pkg: self.pkg.as_str(),
                scoper: &mut *scoper,
            },
        )
    }

    fn gen_item(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        item: svlower_ast::GenItem,
    ) -> ConvertResult<svlower_ast::GenItem> {
        map_gen_item(
            item,
            &mut Resolver {
                table: &mut *self.table,
                pkg: self.pkg.as_str(),
                scoper: &mut *scoper,
            },
        )
    }

    fn stmt(
        &mut self,
        scoper: &mut Scoper<IdentState>,
        stmt: svlower_ast::Stmt,
    ) -> ConvertResult<svlower_ast::Stmt> {
        map_stmt(
            stmt,
            &mut Resolver {
                table: &mut *self.table,
                pkg: self.pkg.as_str(),
                scoper: &mut *scoper,
            },
        )
    }
}

// ============================================================================
// Identifier resolution
// ============================================================================

/// Rewrites identifier leaves against the current scope and package
/// tables.
struct Resolver<'t, 's> {
    table: &'t mut PackageTable,
    pkg: &'t str,
    scoper: &'s mut Scoper<IdentState>,
}

impl Resolver<'_, '_> {
    fn resolve_ident(&mut self, name: Identifier) -> ConvertResult<Identifier> {
        let Some((frame, entry)) = self.scoper.lookup(&name) else {
            // Unknown names are left alone; they may be ports, genvars,
            // or file-scope items resolved by injection.
            return Ok(name);
        };
        match entry.meta.clone() {
            IdentState::Declared => {
                if !self.pkg.is_empty() && frame == 0 {
                    Ok(format!("{}_{name}", self.pkg))
                } else {
                    Ok(name)
                }
            }
            IdentState::Imported(root) => Ok(format!("{root}_{name}")),
            IdentState::Available(roots) if roots.len() == 1 => {
                let root = roots[0].clone();
                let (_, entry) = self.scoper.lookup_mut(&name).unwrap();
                entry.meta = IdentState::Imported(root.clone());
                Ok(format!("{root}_{name}"))
            }
            IdentState::Available(roots) => Err(errors::ambiguous_reference(&name, &roots)),
        }
    }

    fn resolve_ps_ident(&mut self, pkg: &str, name: &str) -> ConvertResult<Identifier> {
        if let Some(class) = self.table.classes.get(pkg) {
            let parameterized = class
                .params
                .iter()
                .any(|d| matches!(d, Decl::Param { kind: ParamScope::Parameter, .. }
                    | Decl::ParamType { kind: ParamScope::Parameter, .. }));
            if parameterized {
                return Err(errors::class_without_bindings(pkg));
            }
            return self.resolve_cs_ident(pkg, Vec::new(), name);
        }
        let exports = package_exports(self.table, pkg)?;
        let root = exports
            .get(name)
            .ok_or_else(|| errors::unknown_member(pkg, name))?;
        Ok(format!("{root}_{name}"))
    }

    /// Specializes `cls` with the given bindings and resolves `name`
    /// within the resulting synthetic package.
    fn resolve_cs_ident(
        &mut self,
        cls: &str,
        bindings: Vec<svlower_ast::ParamBinding>,
        name: &str,
    ) -> ConvertResult<Identifier> {
        let Some(class) = self.table.classes.get(cls).cloned() else {
            return Err(errors::unknown_class(cls));
        };
        let param_names: Vec<Identifier> = class
            .params
            .iter()
            .filter(|d| {
                matches!(d, Decl::Param { kind: ParamScope::Parameter, .. }
                    | Decl::ParamType { kind: ParamScope::Parameter, .. })
            })
            .filter_map(|d| d.name().cloned())
            .collect();
        let msg = format!("specialization of class `{cls}`");
        let resolved = resolve_bindings(&msg, &param_names, bindings)?;

        // Hash the scope keys of every identifier the bindings reference,
        // so identical instantiations in different scopes that resolve to
        // the same definitions share one specialization.
        let mut idents = UsedIdents::default();
        for (_, value) in &resolved {
            match value {
                TypeOrExpr::Expr(expr) => collect_expr(expr, &mut idents),
                TypeOrExpr::Type(ty) => collect_type(ty, &mut idents),
            }
        }
        let scope_keys: BTreeSet<String> = idents
            .0
            .iter()
            .map(|ident| match self.scoper.lookup(ident) {
                Some((_, entry)) => entry.extra_key.clone(),
                None => short_hash(ident),
            })
            .collect();

        let keys = scope_keys.into_iter().collect::<Vec<_>>().join(",");
        let binds = resolved
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let syn = format!("{cls}_{}", short_hash(&format!("{keys};{binds}")));

        if !self.table.processed.contains_key(&syn) {
            let mut items: Vec<PackageItem> =
                class.params.into_iter().map(PackageItem::Decl).collect();
            items.extend(class.items);
            self.table.visiting.push(syn.clone());
            let result = process_items(self.table, &syn, items);
            self.table.visiting.pop();
            let (exports, mut items) = result?;
            apply_overrides(cls, &syn, &mut items, &param_names, &resolved)?;
            self.table.processed.insert(
                syn.clone(),
                Processed { exports, items },
            );
            self.table.synthetic.push(syn.clone());
        }
        if !self.table.processed[&syn].exports.contains_key(name) {
            return Err(errors::unknown_member(cls, name));
        }
        Ok(format!("{syn}_{name}"))
    }
}

/// Replaces specialized parameter defaults with the supplied overrides.
fn apply_overrides(
    cls: &str,
    syn: &str,
    items: &mut [PackageItem],
    param_names: &[Identifier],
    resolved: &[(Identifier, TypeOrExpr)],
) -> ConvertResult<()> {
    for param in param_names {
        let supplied = resolved.iter().find(|(n, _)| n == param).map(|(_, v)| v);
        let mangled = format!("{syn}_{param}");
        for item in items.iter_mut() {
            match item {
                PackageItem::Decl(Decl::Param {
                    kind: ParamScope::Parameter,
                    name,
                    value,
                    ..
                }) if *name == mangled => match supplied {
                    Some(TypeOrExpr::Expr(expr)) => *value = expr.clone(),
                    Some(TypeOrExpr::Type(_)) => {
                        return Err(errors::class_param_mismatch(cls, param));
                    }
                    None => {
                        if *value == Expr::Nil {
                            return Err(errors::missing_class_param(cls, param));
                        }
                    }
                },
                PackageItem::Decl(Decl::ParamType {
                    kind: ParamScope::Parameter,
                    name,
                    ty,
                }) if *name == mangled => match supplied {
                    Some(TypeOrExpr::Type(new_ty)) => *ty = new_ty.clone(),
                    Some(TypeOrExpr::Expr(expr)) => match expr_to_type(expr) {
                        Some(new_ty) => *ty = new_ty,
                        None => return Err(errors::class_param_mismatch(cls, param)),
                    },
                    None => {}
                },
                _ => {}
            }
        }
    }
    Ok(())
}

impl LeafMapper for Resolver<'_, '_> {
    fn expr(&mut self, expr: Expr) -> ConvertResult<Expr> {
        match expr {
            Expr::Ident(name) => Ok(Expr::Ident(self.resolve_ident(name)?)),
            Expr::PkgIdent(pkg, name) => Ok(Expr::Ident(self.resolve_ps_ident(&pkg, &name)?)),
            Expr::ClassIdent(cls, bindings, name) => {
                Ok(Expr::Ident(self.resolve_cs_ident(&cls, bindings, &name)?))
            }
            other => Ok(other),
        }
    }

    fn ty(&mut self, ty: Type) -> ConvertResult<Type> {
        match ty {
            Type::Alias(name, rs) => Ok(Type::Alias(self.resolve_ident(name)?, rs)),
            Type::PkgAlias(pkg, name, rs) => {
                Ok(Type::Alias(self.resolve_ps_ident(&pkg, &name)?, rs))
            }
            Type::ClassAlias(cls, bindings, name, rs) => {
                Ok(Type::Alias(self.resolve_cs_ident(&cls, bindings, &name)?, rs))
            }
            Type::Enum(base, items, rs) => {
                // Enum members are declarations prefixed alongside their
                // owning declaration.
                let items = items
                    .into_iter()
                    .map(|mut item| {
                        item.name = prefix_ident(self.pkg, self.scoper, &item.name)?;
                        Ok(item)
                    })
                    .collect::<ConvertResult<Vec<_>>>()?;
                Ok(Type::Enum(base, items, rs))
            }
            Type::TypeOf(expr) => Ok(match expr_to_type(&expr) {
                Some(ty) => ty,
                None => Type::TypeOf(expr),
            }),
            other => Ok(other),
        }
    }

    fn lhs(&mut self, lhs: Lhs) -> ConvertResult<Lhs> {
        match lhs {
            Lhs::Ident(name) => Ok(Lhs::Ident(self.resolve_ident(name)?)),
            other => Ok(other),
        }
    }
}

// ============================================================================
// Used and declared identifier sets
// ============================================================================

/// Collects every referenced identifier name.
#[derive(Default)]
struct UsedIdents(BTreeSet<Identifier>);

impl LeafCollector for UsedIdents {
    fn expr(&mut self, expr: &Expr) {
        if let Expr::Ident(name) = expr {
            self.0.insert(name.clone());
        }
    }

    fn ty(&mut self, ty: &Type) {
        if let Type::Alias(name, _) = ty {
            self.0.insert(name.clone());
        }
    }

    fn lhs(&mut self, lhs: &Lhs) {
        if let Lhs::Ident(name) = lhs {
            self.0.insert(name.clone());
        }
    }
}

fn package_item_used(item: &PackageItem) -> BTreeSet<Identifier> {
    let mut idents = UsedIdents::default();
    collect_package_item(item, &mut idents);
    idents.0
}

fn module_item_used(item: &ModuleItem) -> BTreeSet<Identifier> {
    let mut idents = UsedIdents::default();
    collect_module_item(item, &mut idents);
    idents.0
}

/// Collects enum member names, which are declarations of their own.
#[derive(Default)]
struct EnumMemberNames(Vec<Identifier>);

impl LeafCollector for EnumMemberNames {
    fn ty(&mut self, ty: &Type) {
        if let Type::Enum(_, items, _) = ty {
            self.0.extend(items.iter().map(|item| item.name.clone()));
        }
    }
}

fn decl_names(decl: &Decl) -> Vec<Identifier> {
    let mut names: Vec<Identifier> = decl.name().cloned().into_iter().collect();
    let mut members = EnumMemberNames::default();
    collect_decl(decl, &mut members);
    names.extend(members.0);
    names
}

fn package_item_names(item: &PackageItem) -> Vec<Identifier> {
    match item {
        PackageItem::Function(func) => vec![func.name.clone()],
        PackageItem::Task(task) => vec![task.name.clone()],
        PackageItem::Decl(decl) => decl_names(decl),
        PackageItem::Import(..) | PackageItem::Export(_) | PackageItem::Directive(_) => Vec::new(),
    }
}

fn module_item_names(item: &ModuleItem) -> Vec<Identifier> {
    match item {
        ModuleItem::PackageItem(pi) => package_item_names(pi),
        ModuleItem::Genvar(name) => vec![name.clone()],
        ModuleItem::Instance { name, .. } => vec![name.clone()],
        _ => Vec::new(),
    }
}

// ============================================================================
// Step E: injection
// ============================================================================

/// Splices needed package items into a part ahead of their first use.
///
/// The pool is cloned per part, so every part receives its own copy of
/// each item it needs. Names already declared earlier in the part never
/// count as unmet dependencies.
fn add_items(pool: &BTreeMap<Identifier, PackageItem>, mut part: Part) -> Part {
    let mut pool = pool.clone();
    let mut items = std::mem::take(&mut part.items);
    loop {
        let mut seen: BTreeSet<Identifier> = BTreeSet::new();
        let mut insertion: Option<(usize, Identifier)> = None;
        'scan: for (index, item) in items.iter().enumerate() {
            for used in module_item_used(item) {
                if !seen.contains(&used) && pool.contains_key(&used) {
                    insertion = Some((index, used));
                    break 'scan;
                }
            }
            seen.extend(module_item_names(item));
        }
        match insertion {
            Some((index, name)) => {
                let item = pool.remove(&name).unwrap();
                items.insert(index, ModuleItem::PackageItem(item));
            }
            None => break,
        }
    }
    part.items = items;
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::{Direction, IntegerVectorKind, Lifetime, Package, PartKind, Signing};

    fn param(name: &str, value: Expr) -> PackageItem {
        PackageItem::Decl(Decl::Param {
            kind: ParamScope::Parameter,
            ty: Type::Implicit(Signing::Unspecified, Vec::new()),
            name: name.to_string(),
            value,
        })
    }

    fn package(name: &str, items: Vec<PackageItem>) -> Description {
        Description::Package(Package {
            lifetime: Lifetime::Inherit,
            name: name.to_string(),
            items,
        })
    }

    fn module(name: &str, items: Vec<ModuleItem>) -> Description {
        Description::Part(Part {
            attrs: Vec::new(),
            is_extern: false,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: name.to_string(),
            ports: Vec::new(),
            items,
        })
    }

    fn num(text: &str) -> Expr {
        Expr::Number(text.to_string())
    }

    fn rendered(descs: &[Description]) -> String {
        descs
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn declared_symbols_are_mangled() {
        let out = convert(vec![package("p", vec![param("X", num("5"))])]).unwrap();
        assert!(rendered(&out).contains("parameter p_X = 5;"));
    }

    #[test]
    fn wildcard_import_resolves_and_upgrades() {
        let out = convert(vec![
            package("a", vec![param("X", num("5"))]),
            package(
                "b",
                vec![
                    PackageItem::Import("a".to_string(), None),
                    param("Y", Expr::BinOp(
                        svlower_ast::BinOp::Add,
                        Box::new(Expr::Ident("X".to_string())),
                        Box::new(num("1")),
                    )),
                ],
            ),
        ])
        .unwrap();
        let text = rendered(&out);
        assert!(text.contains("parameter a_X = 5;"));
        assert!(text.contains("parameter b_Y = a_X + 1;"));
        let a_pos = text.find("parameter a_X").unwrap();
        let b_pos = text.find("parameter b_Y").unwrap();
        assert!(a_pos < b_pos, "dependency must be emitted first");
    }

    #[test]
    fn ambiguous_wildcard_import_is_fatal() {
        let err = convert(vec![
            package("a", vec![param("X", num("1"))]),
            package("b", vec![param("X", num("2"))]),
            module(
                "m",
                vec![
                    ModuleItem::PackageItem(PackageItem::Import("a".to_string(), None)),
                    ModuleItem::PackageItem(PackageItem::Import("b".to_string(), None)),
                    ModuleItem::PackageItem(param("Y", Expr::Ident("X".to_string()))),
                ],
            ),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`X`"));
        assert!(msg.contains('a'));
        assert!(msg.contains('b'));
    }

    #[test]
    fn import_cycle_is_fatal() {
        let err = convert(vec![
            package("a", vec![PackageItem::Import("b".to_string(), None)]),
            package("b", vec![PackageItem::Import("a".to_string(), None)]),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("dependency loop"));
        assert!(msg.contains('a'));
        assert!(msg.contains('b'));
    }

    #[test]
    fn unknown_package_import_is_fatal() {
        let err = convert(vec![module(
            "m",
            vec![ModuleItem::PackageItem(PackageItem::Import(
                "ghost".to_string(),
                None,
            ))],
        )])
        .unwrap_err();
        assert!(err.to_string().contains("`ghost`"));
    }

    #[test]
    fn import_conflicting_with_declaration_is_fatal() {
        let err = convert(vec![
            package("a", vec![param("X", num("1"))]),
            module(
                "m",
                vec![
                    ModuleItem::PackageItem(param("X", num("2"))),
                    ModuleItem::PackageItem(PackageItem::Import(
                        "a".to_string(),
                        Some("X".to_string()),
                    )),
                ],
            ),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            svlower_common::ConvertError::NameConflict { .. }
        ));
    }

    #[test]
    fn export_reexports_imported_symbol() {
        let out = convert(vec![
            package("a", vec![param("X", num("1"))]),
            package(
                "b",
                vec![
                    PackageItem::Import("a".to_string(), Some("X".to_string())),
                    PackageItem::Export(ExportSpec::Item("a".to_string(), "X".to_string())),
                ],
            ),
            module(
                "m",
                vec![ModuleItem::PackageItem(param(
                    "Y",
                    Expr::PkgIdent("b".to_string(), "X".to_string()),
                ))],
            ),
        ])
        .unwrap();
        // b::X resolves through b's exports to the root package a.
        assert!(rendered(&out).contains("parameter Y = a_X;"));
    }

    #[test]
    fn export_of_unimported_symbol_is_fatal() {
        let err = convert(vec![
            package("a", vec![param("X", num("1"))]),
            package(
                "b",
                vec![PackageItem::Export(ExportSpec::Item(
                    "a".to_string(),
                    "X".to_string(),
                ))],
            ),
            module(
                "m",
                vec![ModuleItem::PackageItem(param(
                    "Y",
                    Expr::PkgIdent("b".to_string(), "X".to_string()),
                ))],
            ),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("was not imported"));
    }

    #[test]
    fn export_outside_package_is_fatal() {
        let err = convert(vec![module(
            "m",
            vec![ModuleItem::PackageItem(PackageItem::Export(
                ExportSpec::All,
            ))],
        )])
        .unwrap_err();
        assert!(err.to_string().contains("only legal inside a package"));
    }

    #[test]
    fn module_locals_keep_their_names() {
        let out = convert(vec![module(
            "m",
            vec![ModuleItem::PackageItem(param("X", num("1")))],
        )])
        .unwrap();
        assert!(rendered(&out).contains("parameter X = 1;"));
    }

    #[test]
    fn reorder_pulls_definition_ahead_of_use() {
        let out = convert(vec![package(
            "p",
            vec![
                param("Y", Expr::Ident("X".to_string())),
                param("X", num("1")),
            ],
        )])
        .unwrap();
        let text = rendered(&out);
        let x_pos = text.find("parameter p_X").unwrap();
        let y_pos = text.find("parameter p_Y").unwrap();
        assert!(x_pos < y_pos);
    }

    #[test]
    fn identical_specializations_share_one_package() {
        let class = Description::Class(svlower_ast::Class {
            lifetime: Lifetime::Inherit,
            name: "c".to_string(),
            params: vec![Decl::Param {
                kind: ParamScope::Parameter,
                ty: Type::Implicit(Signing::Unspecified, Vec::new()),
                name: "W".to_string(),
                value: num("1"),
            }],
            items: vec![PackageItem::Decl(Decl::ParamType {
                kind: ParamScope::Localparam,
                name: "unit_t".to_string(),
                ty: Type::IntegerVector(
                    IntegerVectorKind::Logic,
                    Signing::Unspecified,
                    Vec::new(),
                ),
            })],
        });
        let use_site = |module_name: &str| {
            module(
                module_name,
                vec![ModuleItem::PackageItem(PackageItem::Decl(Decl::Variable {
                    dir: Direction::Local,
                    ty: Type::ClassAlias(
                        "c".to_string(),
                        vec![svlower_ast::ParamBinding {
                            param: String::new(),
                            value: TypeOrExpr::Expr(num("2")),
                        }],
                        "unit_t".to_string(),
                        Vec::new(),
                    ),
                    name: "x".to_string(),
                    dims: Vec::new(),
                    init: None,
                }))],
            )
        };
        let out = convert(vec![class, use_site("m1"), use_site("m2")]).unwrap();
        let text = rendered(&out);
        // Both modules inject the same synthetic typedef.
        let names: BTreeSet<&str> = text
            .lines()
            .filter(|line| line.contains("typedef logic c_"))
            .collect();
        assert_eq!(
            text.lines()
                .filter(|line| line.contains("typedef logic c_"))
                .count(),
            2,
            "one injected copy per module"
        );
        assert_eq!(names.len(), 1, "identical specializations share a name");
    }

    #[test]
    fn parameterized_class_without_bindings_is_fatal() {
        let class = Description::Class(svlower_ast::Class {
            lifetime: Lifetime::Inherit,
            name: "c".to_string(),
            params: vec![Decl::Param {
                kind: ParamScope::Parameter,
                ty: Type::Implicit(Signing::Unspecified, Vec::new()),
                name: "W".to_string(),
                value: num("1"),
            }],
            items: Vec::new(),
        });
        let err = convert(vec![
            class,
            module(
                "m",
                vec![ModuleItem::PackageItem(param(
                    "Y",
                    Expr::PkgIdent("c".to_string(), "W".to_string()),
                ))],
            ),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("without `#()`"));
    }

    #[test]
    fn missing_required_class_param_is_fatal() {
        let class = Description::Class(svlower_ast::Class {
            lifetime: Lifetime::Inherit,
            name: "c".to_string(),
            params: vec![Decl::Param {
                kind: ParamScope::Parameter,
                ty: Type::Implicit(Signing::Unspecified, Vec::new()),
                name: "W".to_string(),
                value: Expr::Nil,
            }],
            items: Vec::new(),
        });
        let err = convert(vec![
            class,
            module(
                "m",
                vec![ModuleItem::PackageItem(param(
                    "Y",
                    Expr::ClassIdent("c".to_string(), Vec::new(), "W".to_string()),
                ))],
            ),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("missing required parameter `W`"));
    }

    #[test]
    fn package_removal_markers_are_emitted() {
        let out = convert(vec![package("p", vec![param("X", num("5"))])]).unwrap();
        assert!(rendered(&out).contains("// removed package p"));
    }
}
