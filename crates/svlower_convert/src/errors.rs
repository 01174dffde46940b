//! Message constructors for conversion errors.
//!
//! Each fatal condition has one constructor so the exact wording lives in
//! a single place and tests can assert on stable fragments.

use svlower_ast::ExportSpec;
use svlower_common::ConvertError;

/// An import collides with a local declaration of the same name.
pub fn import_conflicts_with_decl(name: &str, pkg: &str) -> ConvertError {
    ConvertError::NameConflict {
        message: format!("declaration of `{name}` collides with import from package `{pkg}`"),
    }
}

/// Two explicit imports of the same name disagree on the source package.
pub fn conflicting_imports(name: &str, prev: &str, new: &str) -> ConvertError {
    ConvertError::NameConflict {
        message: format!("`{name}` imported from both `{prev}` and `{new}`"),
    }
}

/// Wildcard imports expose multiple definitions of a name.
pub fn ambiguous_reference(name: &str, packages: &[String]) -> ConvertError {
    ConvertError::AmbiguousReference {
        name: name.to_string(),
        packages: packages.join(", "),
    }
}

/// A reference names a package that does not exist.
pub fn unknown_package(pkg: &str) -> ConvertError {
    ConvertError::MissingSymbol {
        message: format!("package `{pkg}` not found"),
    }
}

/// A reference names a member its package does not export.
pub fn unknown_member(pkg: &str, name: &str) -> ConvertError {
    ConvertError::MissingSymbol {
        message: format!("package `{pkg}` does not export `{name}`"),
    }
}

/// A reference names a class that does not exist.
pub fn unknown_class(cls: &str) -> ConvertError {
    ConvertError::MissingSymbol {
        message: format!("class `{cls}` not found"),
    }
}

/// A package transitively imports itself.
pub fn dependency_loop(cycle: &[String]) -> ConvertError {
    ConvertError::DependencyCycle {
        cycle: cycle.join(" -> "),
    }
}

/// A parameterized class is referenced without `#()` bindings.
pub fn class_without_bindings(cls: &str) -> ConvertError {
    ConvertError::ClassParam {
        message: format!("parameterized class `{cls}` referenced without `#()`"),
    }
}

/// A required class parameter received no binding.
pub fn missing_class_param(cls: &str, param: &str) -> ConvertError {
    ConvertError::ClassParam {
        message: format!("specialization of class `{cls}` is missing required parameter `{param}`"),
    }
}

/// A class parameter override mixes types and expressions.
pub fn class_param_mismatch(cls: &str, param: &str) -> ConvertError {
    ConvertError::ClassParam {
        message: format!(
            "override for parameter `{param}` of class `{cls}` mixes types and expressions"
        ),
    }
}

/// An `export` appears outside a package.
pub fn export_outside_package(spec: &ExportSpec) -> ConvertError {
    ConvertError::Structural {
        message: format!("`{spec}` is only legal inside a package"),
    }
}

/// An `export pkg::name` names a symbol that was never imported from
/// that package.
pub fn export_not_imported(pkg: &str, name: &str) -> ConvertError {
    ConvertError::MissingSymbol {
        message: format!("cannot export `{pkg}::{name}`: `{name}` was not imported from `{pkg}`"),
    }
}

/// A non-lvalue expression is bound to an output port.
pub fn output_not_lvalue(instance: &str, port: &str) -> ConvertError {
    ConvertError::Structural {
        message: format!(
            "expression bound to output port `{port}` of instance `{instance}` is not an lvalue"
        ),
    }
}
