//! Conversion passes lowering SystemVerilog AST constructs to their
//! Verilog-2005 equivalents, and the driver applying them in order.
//!
//! The driver takes the full parsed description list, elaborates packages
//! and classes into flat mangled declarations, then reclassifies `logic`
//! declarations as nets or variables. A fatal error in any pass aborts
//! the run immediately.

#![warn(missing_docs)]

pub mod bindings;
pub mod errors;
pub mod logic;
pub mod package;
pub mod reorder;

use svlower_ast::Description;
use svlower_common::ConvertResult;

/// Applies all conversion passes to a parsed design, in order.
pub fn convert(descriptions: Vec<Description>) -> ConvertResult<Vec<Description>> {
    let descriptions = package::convert(descriptions)?;
    logic::convert(descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::{Lifetime, Part, PartKind};

    #[test]
    fn convert_empty_design() {
        assert!(convert(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn convert_passthrough_module() {
        let descs = vec![Description::Part(Part {
            attrs: Vec::new(),
            is_extern: false,
            kind: PartKind::Module,
            lifetime: Lifetime::Inherit,
            name: "empty".to_string(),
            ports: Vec::new(),
            items: Vec::new(),
        })];
        let out = convert(descs.clone()).unwrap();
        assert_eq!(out, descs);
    }
}
