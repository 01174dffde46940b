//! Common result and fatal-error types for the converter.

/// The standard result type for fallible conversion operations.
///
/// Conversion has no error recovery: the first `ConvertError` aborts the
/// whole run and is reported to the user as a single diagnostic line.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// A fatal conversion error.
///
/// Every variant aborts the run; there are no warnings and no recovery.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// An import collides with a declaration, or two imports of the same
    /// symbol disagree.
    #[error("name conflict: {message}")]
    NameConflict {
        /// Description of the conflicting bindings.
        message: String,
    },

    /// Wildcard imports expose two distinct definitions of the same name.
    #[error("ambiguous reference to `{name}`: defined in packages {packages}")]
    AmbiguousReference {
        /// The ambiguous identifier.
        name: String,
        /// Comma-separated list of packages providing a definition.
        packages: String,
    },

    /// An import, export, or scoped reference names an unknown package or
    /// an unknown member.
    #[error("missing symbol: {message}")]
    MissingSymbol {
        /// Description of what could not be found.
        message: String,
    },

    /// A package transitively imports itself.
    #[error("dependency loop among packages: {cycle}")]
    DependencyCycle {
        /// The packages forming the cycle, in visiting order.
        cycle: String,
    },

    /// A class specialization is malformed: a required parameter is
    /// missing, an override mixes types and expressions, or a
    /// parameterized class is referenced without `#()`.
    #[error("class parameter error: {message}")]
    ClassParam {
        /// Description of the parameter problem.
        message: String,
    },

    /// The input AST is structurally unusable: an export outside a
    /// package, a non-lvalue bound to an output port, or packed ranges
    /// applied to a type that cannot carry them.
    #[error("{message}")]
    Structural {
        /// Description of the structural problem.
        message: String,
    },
}
