//! Lexical scope tracking layered on top of the traversal kit.
//!
//! A [`Scoper`] maintains a stack of named frames mirroring the syntactic
//! nesting of the design: parts, packages, named generate blocks,
//! statement blocks, functions, and tasks. Each frame records its
//! declared identifiers with caller-chosen metadata, and lookups walk
//! outward from the innermost frame, respecting shadowing.
//!
//! [`ScopePass`] and the `scope_*` drivers run a rewrite over a part or an
//! item list while the scoper tracks frames; passes sequence multiple
//! walks over the same tree (observe, then rewrite) by running the driver
//! twice with fresh scopers.

#![warn(missing_docs)]

pub mod scoper;
pub mod walk;

pub use scoper::{access_key, Access, Entry, Scoper};
pub use walk::{
    scope_gen_item, scope_module_item, scope_package_item, scope_part, scope_stmt, ScopePass,
};
