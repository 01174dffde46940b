//! Logic-to-net/variable conversion.
//!
//! SystemVerilog's `logic` works in both procedural and continuous
//! contexts; Verilog-2005 forces a choice between `reg` and `wire`. This
//! pass walks each part twice: phase one records the absolute path of
//! every procedural assignment target, phase two reclassifies each
//! `logic` declaration from those observations and repairs the module
//! items the reclassification breaks.

use std::collections::BTreeSet;

use svlower_ast::{
    atom_to_vector, expr_to_lhs, AlwaysKw, AsgnOp, BinOp, Decl, Description, Direction, Expr,
    GenItem, Identifier, IntegerVectorKind, Lhs, ModuleItem, NetKind, PackageItem, Part,
    PartSelectMode, PortBinding, Range, Sense, Signing, Stmt, Timing, Type,
};
use svlower_common::{short_hash, ConvertResult};
use svlower_scope::{access_key, scope_part, Access, ScopePass, Scoper};

use crate::errors;

/// Prefix of every net this pass manufactures.
const TMP_PREFIX: &str = "sv2v_tmp";

/// Reclassifies `logic` declarations across the whole design.
pub fn convert(descriptions: Vec<Description>) -> ConvertResult<Vec<Description>> {
    let output_ports = collect_output_ports(&descriptions);
    descriptions
        .into_iter()
        .map(|desc| match desc {
            Description::Part(part) if !part.is_extern => {
                Ok(Description::Part(convert_part(part, &output_ports)?))
            }
            other => Ok(other),
        })
        .collect()
}

/// Builds the set of `(module, port)` pairs with output direction, for
/// the reg-driven-output repair.
fn collect_output_ports(descriptions: &[Description]) -> BTreeSet<(Identifier, Identifier)> {
    let mut ports = BTreeSet::new();
    for desc in descriptions {
        let Description::Part(part) = desc else {
            continue;
        };
        for item in &part.items {
            if let ModuleItem::PackageItem(PackageItem::Decl(Decl::Variable {
                dir: Direction::Output,
                name,
                ..
            })) = item
            {
                if part.ports.contains(name) {
                    ports.insert((part.name.clone(), name.clone()));
                }
            }
        }
    }
    ports
}

fn convert_part(
    part: Part,
    output_ports: &BTreeSet<(Identifier, Identifier)>,
) -> ConvertResult<Part> {
    let mut observe = Observe {
        written: BTreeSet::new(),
    };
    let mut scoper = Scoper::new();
    let part = scope_part(&mut scoper, &mut observe, part)?;

    let mut rewrite = Rewrite {
        written: &observe.written,
        output_ports,
    };
    let mut scoper = Scoper::new();
    scope_part(&mut scoper, &mut rewrite, part)
}

// ============================================================================
// Phase 1: observe
// ============================================================================

/// Collects the absolute paths of every procedurally assigned target.
struct Observe {
    written: BTreeSet<String>,
}

impl Observe {
    fn record_lhs(&mut self, scoper: &Scoper<Type>, lhs: &Lhs) {
        if let Lhs::Concat(items) = lhs {
            for item in items {
                self.record_lhs(scoper, item);
            }
            return;
        }
        if let Some((_, entry)) = scoper.lookup_lhs(lhs) {
            self.written.insert(access_key(&entry.accesses));
        }
    }
}

impl ScopePass<Type> for Observe {
    fn decl(&mut self, scoper: &mut Scoper<Type>, decl: Decl) -> ConvertResult<Decl> {
        if let Decl::Variable { name, ty, .. } = &decl {
            scoper.insert_elem(name, ty.clone());
        }
        Ok(decl)
    }

    fn stmt(&mut self, scoper: &mut Scoper<Type>, stmt: Stmt) -> ConvertResult<Stmt> {
        match &stmt {
            Stmt::Asgn { lhs, .. } => self.record_lhs(scoper, lhs),
            Stmt::For { inits, steps, .. } => {
                for (lhs, _) in inits {
                    self.record_lhs(scoper, lhs);
                }
                for (lhs, _, _) in steps {
                    self.record_lhs(scoper, lhs);
                }
            }
            Stmt::Subroutine(Expr::Ident(task), args)
                if task == "$readmemh" || task == "$readmemb" =>
            {
                // The second argument is the loaded memory.
                if let Some((_, entry)) = args.get(1).and_then(|arg| scoper.lookup_expr(arg)) {
                    self.written.insert(access_key(&entry.accesses));
                }
            }
            _ => {}
        }
        Ok(stmt)
    }
}

// ============================================================================
// Phase 2: rewrite
// ============================================================================

/// Reclassifies declarations and repairs the surrounding module items.
struct Rewrite<'a> {
    written: &'a BTreeSet<String>,
    output_ports: &'a BTreeSet<(Identifier, Identifier)>,
}

impl Rewrite<'_> {
    fn is_reg_lhs(&self, scoper: &Scoper<Type>, lhs: &Lhs) -> bool {
        if let Lhs::Concat(items) = lhs {
            return items.iter().any(|item| self.is_reg_lhs(scoper, item));
        }
        matches!(
            scoper.lookup_lhs(lhs),
            Some((_, entry)) if matches!(entry.meta, Type::IntegerVector(IntegerVectorKind::Reg, ..))
        )
    }
}

impl ScopePass<Type> for Rewrite<'_> {
    fn package_item(
        &mut self,
        _scoper: &mut Scoper<Type>,
        item: PackageItem,
    ) -> ConvertResult<PackageItem> {
        Ok(match item {
            // Verilog-2005 function returns carry no vector keyword.
            PackageItem::Function(mut func) => {
                let ret = match func.ret {
                    Type::IntegerAtom(kind, sg) => atom_to_vector(kind, sg, Vec::new()),
                    other => other,
                };
                func.ret = match ret {
                    Type::IntegerVector(_, sg, rs) => Type::Implicit(sg, rs),
                    other => other,
                };
                PackageItem::Function(func)
            }
            other => other,
        })
    }

    fn decl(&mut self, scoper: &mut Scoper<Type>, decl: Decl) -> ConvertResult<Decl> {
        Ok(match decl {
            Decl::Variable {
                dir,
                ty,
                name,
                dims,
                init,
            } => {
                let ty = match ty {
                    Type::IntegerAtom(kind, sg) => atom_to_vector(kind, sg, Vec::new()),
                    other => other,
                };
                let (dir, ty) = match ty {
                    Type::IntegerVector(IntegerVectorKind::Logic, sg, rs) => {
                        let mut accesses = scoper.path();
                        accesses.push(Access::new(name.clone()));
                        let written = self.written.contains(&access_key(&accesses));
                        if written || scoper.within_procedure() {
                            let dir = match dir {
                                Direction::Inout => Direction::Output,
                                other => other,
                            };
                            (dir, Type::IntegerVector(IntegerVectorKind::Reg, sg, rs))
                        } else {
                            (dir, Type::Net(NetKind::Wire, sg, rs))
                        }
                    }
                    other => (dir, other),
                };
                scoper.insert_elem(&name, ty.clone());
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
                let ty = match ty {
                    Type::IntegerAtom(atom, sg) => atom_to_vector(atom, sg, Vec::new()),
                    other => other,
                };
                // Verilog-2005 has no vector keywords on parameters.
                let ty = match ty {
                    Type::IntegerVector(_, sg, rs) => {
                        let rs = if rs.is_empty() {
                            vec![(Expr::Number("0".to_string()), Expr::Number("0".to_string()))]
                        } else {
                            rs
                        };
                        Type::Implicit(sg, rs)
                    }
                    other => other,
                };
                Decl::Param {
                    kind,
                    ty,
                    name,
                    value,
                }
            }
            other => other,
        })
    }

    fn module_item(
        &mut self,
        scoper: &mut Scoper<Type>,
        item: ModuleItem,
    ) -> ConvertResult<ModuleItem> {
        match item {
            ModuleItem::Assign { lhs, expr } if self.is_reg_lhs(scoper, &lhs) => {
                Ok(repair_assign(scoper, lhs, expr))
            }
            ModuleItem::Instance {
                module,
                params,
                name,
                range,
                ports,
            } => repair_instance(scoper, self, module, params, name, range, ports),
            other => Ok(other),
        }
    }
}

/// Builds `always @* lhs = expr;`.
fn always_star_copy(lhs: Lhs, expr: Expr) -> ModuleItem {
    ModuleItem::AlwaysC {
        kw: AlwaysKw::Always,
        stmt: Stmt::Timing(
            Timing::Event(Sense::Star),
            Box::new(Stmt::Asgn {
                op: AsgnOp::Eq,
                timing: None,
                lhs,
                expr,
            }),
        ),
    }
}

/// Computes the packed range a temporary net needs to match the width of
/// an assignment target, from the target's declared type.
fn lhs_width_range(scoper: &Scoper<Type>, lhs: &Lhs) -> Option<Range> {
    fn remaining_ranges(scoper: &Scoper<Type>, lhs: &Lhs) -> Option<Vec<Range>> {
        match lhs {
            Lhs::Ident(name) => {
                let (_, entry) = scoper.lookup(name)?;
                Some(entry.meta.ranges().to_vec())
            }
            Lhs::Bit(base, _) => {
                let mut ranges = remaining_ranges(scoper, base)?;
                if ranges.is_empty() {
                    return None;
                }
                ranges.remove(0);
                Some(ranges)
            }
            Lhs::Range(base, mode, range) => {
                let mut ranges = remaining_ranges(scoper, base)?;
                if !ranges.is_empty() {
                    ranges.remove(0);
                }
                let selected = match mode {
                    PartSelectMode::Constant => (range.0.clone(), range.1.clone()),
                    // [base+:w] and [base-:w] have width w.
                    PartSelectMode::IndexedPlus | PartSelectMode::IndexedMinus => (
                        Expr::BinOp(
                            BinOp::Sub,
                            Box::new(range.1.clone()),
                            Box::new(Expr::Number("1".to_string())),
                        ),
                        Expr::Number("0".to_string()),
                    ),
                };
                ranges.insert(0, selected);
                Some(ranges)
            }
            Lhs::Dot(..) | Lhs::Concat(_) => None,
        }
    }
    remaining_ranges(scoper, lhs)?.into_iter().next()
}

/// Replaces `assign lhs = expr` on a reg target with a generate block
/// driving the reg procedurally through a fresh wire.
fn repair_assign(scoper: &Scoper<Type>, lhs: Lhs, expr: Expr) -> ModuleItem {
    let tmp = format!("{TMP_PREFIX}_{}", short_hash(&format!("{lhs} = {expr}")));
    let range = lhs_width_range(scoper, &lhs);
    let wire = Decl::Variable {
        dir: Direction::Local,
        ty: Type::Net(
            NetKind::Wire,
            Signing::Unspecified,
            range.into_iter().collect(),
        ),
        name: tmp.clone(),
        dims: Vec::new(),
        init: None,
    };
    let items = vec![
        GenItem::ModuleItem(Box::new(ModuleItem::PackageItem(PackageItem::Decl(wire)))),
        GenItem::ModuleItem(Box::new(ModuleItem::Assign {
            lhs: Lhs::Ident(tmp.clone()),
            expr,
        })),
        GenItem::ModuleItem(Box::new(always_star_copy(lhs, Expr::Ident(tmp)))),
    ];
    ModuleItem::Generate(vec![GenItem::Block(None, items)])
}

/// Reroutes reg-bound output ports of an instance through fresh wires,
/// copying each wire back into its reg procedurally.
fn repair_instance(
    scoper: &Scoper<Type>,
    pass: &Rewrite<'_>,
    module: Identifier,
    params: Vec<svlower_ast::ParamBinding>,
    name: Identifier,
    range: Option<Range>,
    ports: Vec<PortBinding>,
) -> ConvertResult<ModuleItem> {
    let mut repairs: Vec<(Lhs, Identifier, Option<Range>)> = Vec::new();
    let mut bound = Vec::with_capacity(ports.len());
    for binding in ports {
        let is_output = !binding.port.is_empty()
            && pass
                .output_ports
                .contains(&(module.clone(), binding.port.clone()));
        if !is_output || binding.expr == Expr::Nil {
            bound.push(binding);
            continue;
        }
        let Some(lhs) = expr_to_lhs(&binding.expr) else {
            return Err(errors::output_not_lvalue(&name, &binding.port));
        };
        if !pass.is_reg_lhs(scoper, &lhs) {
            bound.push(binding);
            continue;
        }
        let tmp = format!("{TMP_PREFIX}_{name}_{}", binding.port);
        repairs.push((lhs.clone(), tmp.clone(), lhs_width_range(scoper, &lhs)));
        bound.push(PortBinding {
            port: binding.port,
            expr: Expr::Ident(tmp),
        });
    }

    let instance = ModuleItem::Instance {
        module,
        params,
        name: name.clone(),
        range,
        ports: bound,
    };
    if repairs.is_empty() {
        return Ok(instance);
    }

    let mut items = vec![GenItem::ModuleItem(Box::new(ModuleItem::PackageItem(
        PackageItem::Decl(Decl::Comment(format!(
            "reg-driven outputs of instance {name} rerouted through nets"
        ))),
    )))];
    for (_, tmp, range) in &repairs {
        items.push(GenItem::ModuleItem(Box::new(ModuleItem::PackageItem(
            PackageItem::Decl(Decl::Variable {
                dir: Direction::Local,
                ty: Type::Net(
                    NetKind::Wire,
                    Signing::Unspecified,
                    range.clone().into_iter().collect(),
                ),
                name: tmp.clone(),
                dims: Vec::new(),
                init: None,
            }),
        ))));
    }
    items.push(GenItem::ModuleItem(Box::new(instance)));
    for (lhs, tmp, _) in repairs {
        items.push(GenItem::ModuleItem(Box::new(always_star_copy(
            lhs,
            Expr::Ident(tmp),
        ))));
    }
    Ok(ModuleItem::Generate(items))
}
