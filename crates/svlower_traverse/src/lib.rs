//! Generic traversal kit over the svlower AST families.
//!
//! Two shapes are provided for the leaf families (expressions, types,
//! assignment targets):
//!
//! - **Map**: [`LeafMapper`] plus the `map_*` functions rebuild a node
//!   bottom-up, invoking the user's per-node hooks after each node's
//!   children have been rebuilt. The container-family functions
//!   (`map_stmt`, `map_module_item`, ...) rewrite only the leaves owned
//!   directly by that node; nested statements and generate items are
//!   reached by the scope-aware walk that drives the hooks, so each node
//!   is visited exactly once.
//! - **Collect**: [`LeafCollector`] plus the `collect_*` functions are
//!   write-only and fully deep, descending through nested statements,
//!   generate items, and subroutine bodies. They feed the
//!   used-identifier sets of the elaboration passes.
//!
//! [`map_nested_stmts`] and [`map_nested_gen_items`] walk only the direct
//! same-family children of a node, letting a caller interleave its own
//! bookkeeping (scope frames) with the recursion.

#![warn(missing_docs)]

pub mod collect;
pub mod map;

pub use collect::{
    collect_decl, collect_expr, collect_gen_item, collect_lhs, collect_module_item,
    collect_package_item, collect_stmt, collect_type, LeafCollector,
};
pub use map::{
    map_decl, map_expr, map_gen_item, map_lhs, map_module_item, map_nested_gen_items,
    map_nested_stmts, map_stmt, map_type, map_type_or_expr, LeafMapper,
};
