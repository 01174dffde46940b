//! The scope frame stack.

use std::collections::BTreeMap;

use svlower_ast::{Expr, Identifier, Lhs};
use svlower_common::short_hash;

/// One segment of an absolute access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    /// The scope or identifier name of this segment.
    pub name: Identifier,
    /// The loop index of this segment, for scopes inside generate loops.
    pub index: Option<Expr>,
}

impl Access {
    /// Creates an index-free access segment.
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// Renders an access path as a dotted key string.
///
/// Keys are used for set membership and hashing; identical paths always
/// produce identical keys.
pub fn access_key(accesses: &[Access]) -> String {
    accesses
        .iter()
        .map(|a| match &a.index {
            Some(index) => format!("{}[{index}]", a.name),
            None => a.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// The record kept for one identifier within one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<M> {
    /// The resolved absolute path of the identifier.
    pub accesses: Vec<Access>,
    /// A small hash of the access path, distinguishing shadowed
    /// declarations of the same name.
    pub extra_key: String,
    /// The caller-chosen metadata.
    pub meta: M,
}

#[derive(Debug)]
struct Frame<M> {
    name: Identifier,
    procedural: bool,
    mapping: BTreeMap<Identifier, Entry<M>>,
}

/// A hierarchical, lexically scoped symbol table.
///
/// Frames are pushed and popped by the scope walk as the traversal enters
/// and leaves scopes; each frame maps identifiers to an [`Entry`] with
/// caller-chosen metadata. Frame mappings are ordered, so every iteration
/// over a scope is deterministic.
#[derive(Debug)]
pub struct Scoper<M> {
    frames: Vec<Frame<M>>,
}

impl<M> Scoper<M> {
    /// Creates a scoper with no frames.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Pushes a frame with the given name.
    pub fn enter(&mut self, name: &str, procedural: bool) {
        self.frames.push(Frame {
            name: name.to_string(),
            procedural,
            mapping: BTreeMap::new(),
        });
    }

    /// Pops the innermost frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame is active; enter and exit calls must pair.
    pub fn exit(&mut self) {
        self.frames.pop().expect("scope exit without matching enter");
    }

    /// Returns the number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` when any enclosing frame is procedural (a function,
    /// task, or statement block).
    pub fn within_procedure(&self) -> bool {
        self.frames.iter().any(|f| f.procedural)
    }

    /// Returns the absolute path of the current scope.
    pub fn path(&self) -> Vec<Access> {
        self.frames.iter().map(|f| Access::new(f.name.clone())).collect()
    }

    /// Records an identifier in the current frame, overwriting any prior
    /// entry for the same name in that frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame is active.
    pub fn insert_elem(&mut self, name: &str, meta: M) {
        let mut accesses = self.path();
        accesses.push(Access::new(name));
        self.insert_elem_at(accesses, name, meta);
    }

    /// Records an identifier in the current frame under an explicit
    /// access path, for declarations that do not live at the current
    /// scope.
    pub fn insert_elem_at(&mut self, accesses: Vec<Access>, name: &str, meta: M) {
        let extra_key = short_hash(&access_key(&accesses));
        let frame = self
            .frames
            .last_mut()
            .expect("insertion without an active frame");
        frame.mapping.insert(
            name.to_string(),
            Entry {
                accesses,
                extra_key,
                meta,
            },
        );
    }

    /// Resolves an identifier by walking outward from the innermost
    /// frame. Returns the index of the defining frame (0 is the
    /// outermost) and the entry.
    pub fn lookup(&self, name: &str) -> Option<(usize, &Entry<M>)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, frame)| frame.mapping.get(name).map(|e| (idx, e)))
    }

    /// Like [`lookup`](Self::lookup), with a mutable entry.
    pub fn lookup_mut(&mut self, name: &str) -> Option<(usize, &mut Entry<M>)> {
        self.frames
            .iter_mut()
            .enumerate()
            .rev()
            .find_map(|(idx, frame)| frame.mapping.get_mut(name).map(|e| (idx, e)))
    }

    /// Resolves an identifier in the current frame only.
    pub fn lookup_local(&self, name: &str) -> Option<&Entry<M>> {
        self.frames.last().and_then(|f| f.mapping.get(name))
    }

    /// Resolves the base identifier of an assignment target.
    pub fn lookup_lhs(&self, lhs: &Lhs) -> Option<(usize, &Entry<M>)> {
        self.lookup(lhs.base_ident()?)
    }

    /// Resolves the base identifier of an expression prefix, walking
    /// through selects and member accesses.
    pub fn lookup_expr(&self, expr: &Expr) -> Option<(usize, &Entry<M>)> {
        self.lookup(expr_base_ident(expr)?)
    }

    /// Returns the ordered mapping of the frame at the given index.
    pub fn frame_mapping(&self, index: usize) -> &BTreeMap<Identifier, Entry<M>> {
        &self.frames[index].mapping
    }
}

impl<M: Clone> Scoper<M> {
    /// Projects the scope stack into a flat map from identifier to
    /// metadata. Inner frames shadow outer ones.
    pub fn extract_mapping(&self) -> BTreeMap<Identifier, M> {
        let mut out = BTreeMap::new();
        for frame in &self.frames {
            for (name, entry) in &frame.mapping {
                out.insert(name.clone(), entry.meta.clone());
            }
        }
        out
    }
}

impl<M> Default for Scoper<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the base identifier of an expression prefix, or `None` for
/// expressions that do not start from a plain identifier.
fn expr_base_ident(expr: &Expr) -> Option<&Identifier> {
    match expr {
        Expr::Ident(x) => Some(x),
        Expr::Bit(base, _) | Expr::Dot(base, _) | Expr::RangeSel(base, _, _) => {
            expr_base_ident(base)
        }
        _ => None,
    }
}
