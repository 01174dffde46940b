//! Positional and named parameter binding resolution.

use std::collections::BTreeMap;

use svlower_ast::{Identifier, ParamBinding, TypeOrExpr};
use svlower_common::{ConvertError, ConvertResult};

/// Matches the supplied positional and named bindings against the
/// declared parameter names.
///
/// Returns the bound `(name, value)` pairs in declared-parameter order;
/// parameters without a binding are absent from the result. `msg` names
/// the construct being bound and is included in every failure.
pub fn resolve_bindings(
    msg: &str,
    names: &[Identifier],
    bindings: Vec<ParamBinding>,
) -> ConvertResult<Vec<(Identifier, TypeOrExpr)>> {
    let mut by_name: BTreeMap<Identifier, TypeOrExpr> = BTreeMap::new();
    let mut positional = 0usize;
    for binding in bindings {
        let name = if binding.param.is_empty() {
            let name = names.get(positional).ok_or_else(|| ConvertError::ClassParam {
                message: format!(
                    "{msg}: too many positional bindings ({} parameters declared)",
                    names.len()
                ),
            })?;
            positional += 1;
            name.clone()
        } else {
            if !names.contains(&binding.param) {
                return Err(ConvertError::ClassParam {
                    message: format!("{msg}: no parameter named `{}`", binding.param),
                });
            }
            binding.param
        };
        if by_name.insert(name.clone(), binding.value).is_some() {
            return Err(ConvertError::ClassParam {
                message: format!("{msg}: parameter `{name}` bound more than once"),
            });
        }
    }
    Ok(names
        .iter()
        .filter_map(|name| by_name.remove(name).map(|value| (name.clone(), value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svlower_ast::Expr;

    fn expr(text: &str) -> TypeOrExpr {
        TypeOrExpr::Expr(Expr::Number(text.to_string()))
    }

    fn names() -> Vec<Identifier> {
        vec!["WIDTH".to_string(), "DEPTH".to_string()]
    }

    #[test]
    fn positional_bindings_match_in_order() {
        let resolved = resolve_bindings(
            "test",
            &names(),
            vec![
                ParamBinding {
                    param: String::new(),
                    value: expr("8"),
                },
                ParamBinding {
                    param: String::new(),
                    value: expr("16"),
                },
            ],
        )
        .unwrap();
        assert_eq!(resolved[0].0, "WIDTH");
        assert_eq!(resolved[1].0, "DEPTH");
    }

    #[test]
    fn named_bindings_reorder_to_declared_order() {
        let resolved = resolve_bindings(
            "test",
            &names(),
            vec![
                ParamBinding {
                    param: "DEPTH".to_string(),
                    value: expr("16"),
                },
                ParamBinding {
                    param: "WIDTH".to_string(),
                    value: expr("8"),
                },
            ],
        )
        .unwrap();
        assert_eq!(resolved[0].0, "WIDTH");
        assert_eq!(resolved[1].0, "DEPTH");
    }

    #[test]
    fn unbound_parameters_are_absent() {
        let resolved = resolve_bindings(
            "test",
            &names(),
            vec![ParamBinding {
                param: "DEPTH".to_string(),
                value: expr("4"),
            }],
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "DEPTH");
    }

    #[test]
    fn too_many_positional_fails() {
        let err = resolve_bindings(
            "specialization of class `c`",
            &["W".to_string()],
            vec![
                ParamBinding {
                    param: String::new(),
                    value: expr("1"),
                },
                ParamBinding {
                    param: String::new(),
                    value: expr("2"),
                },
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("too many positional"));
    }

    #[test]
    fn unknown_name_fails() {
        let err = resolve_bindings(
            "test",
            &names(),
            vec![ParamBinding {
                param: "BOGUS".to_string(),
                value: expr("1"),
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("BOGUS"));
    }

    #[test]
    fn duplicate_binding_fails() {
        let err = resolve_bindings(
            "test",
            &names(),
            vec![
                ParamBinding {
                    param: "WIDTH".to_string(),
                    value: expr("1"),
                },
                ParamBinding {
                    param: String::new(),
                    value: expr("2"),
                },
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
