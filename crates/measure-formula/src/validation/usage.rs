//! Gating of string and dimension arguments

use super::{CallSite, Flow, ValidationStage};
use crate::functions::{DimensionUsage, ItemContext, StringUsage};
use crate::node::ExpressionNode;
use measure_formula_core::{ErrorCode, ValidationMessages};

/// Text arguments to string-gated items need the string-argument flag
#[derive(Debug, Default)]
pub struct StringUsageCheck;

impl ValidationStage for StringUsageCheck {
    fn name(&self) -> &'static str {
        "string-usage"
    }

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        let Ok(item) = call.item else {
            return Flow::Continue;
        };
        if item.string_usage == StringUsage::Allowed || cx.flags().string_arguments {
            return Flow::Continue;
        }
        for (position, arg) in call.args.iter().enumerate() {
            if arg.return_type().is_string() {
                out.report(
                    ErrorCode::StringNotSupported,
                    format!(
                        "Argument {} of {}: text arguments are not supported",
                        position + 1,
                        item.name
                    ),
                );
            }
        }
        Flow::Continue
    }
}

/// Dimension references only where the item's dimension usage allows them
#[derive(Debug, Default)]
pub struct DimensionUsageCheck;

impl ValidationStage for DimensionUsageCheck {
    fn name(&self) -> &'static str {
        "dimension-usage"
    }

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        let Ok(item) = call.item else {
            return Flow::Continue;
        };
        let allowed = match item.dimension_usage {
            DimensionUsage::Never => false,
            DimensionUsage::Gated => cx.flags().dimension_arguments,
            DimensionUsage::Filter | DimensionUsage::Always => true,
        };

        for arg in call.args {
            let ExpressionNode::Attribute(attribute) = arg else {
                continue;
            };
            if !allowed {
                out.report(
                    ErrorCode::DimensionNotSupported,
                    format!(
                        "{} does not accept dimension {}",
                        item.name, attribute.reference
                    ),
                );
            } else if attribute.is_version() && item.dimension_usage != DimensionUsage::Filter {
                out.report(
                    ErrorCode::VersionDimensionNotAllowed,
                    format!(
                        "Version dimension {} can only be used in a member filter",
                        attribute.reference
                    ),
                );
            }
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::{CompilerConfig, CompilerEnvironment};
    use measure_formula_core::{Backend, Dimension, FeatureFlags};
    use pretty_assertions::assert_eq;

    fn check(
        env: &CompilerEnvironment,
        stage: &dyn ValidationStage,
        name: &str,
        args: &[ExpressionNode],
    ) -> Vec<ErrorCode> {
        let metadata = metadata();
        let cx = ItemContext::new(env, &metadata);
        let item = env.registry.resolve(name, Backend::Hana);
        let mut out = ValidationMessages::new();
        stage.check(&CallSite::new(name, item, args), &cx, &mut out);
        out.codes()
    }

    fn without(flags: FeatureFlags) -> CompilerEnvironment {
        CompilerEnvironment::new(CompilerConfig {
            flags,
            ..CompilerConfig::default()
        })
    }

    #[test]
    fn test_string_arguments_gated() {
        let args = [ExpressionNode::string("abc")];
        assert_eq!(check(&environment(), &StringUsageCheck, "UPPER", &args), vec![]);

        let env = without(FeatureFlags {
            string_arguments: false,
            ..FeatureFlags::default()
        });
        assert_eq!(
            check(&env, &StringUsageCheck, "UPPER", &args),
            vec![ErrorCode::StringNotSupported]
        );
        // Comparisons always accept text
        assert_eq!(
            check(&env, &StringUsageCheck, "=", &[args[0].clone(), args[0].clone()]),
            vec![]
        );
    }

    #[test]
    fn test_dimension_arguments() {
        let city = attribute(Dimension::new("City"));
        assert_eq!(
            check(&environment(), &DimensionUsageCheck, "+", &[city.clone(), num(1)]),
            vec![ErrorCode::DimensionNotSupported]
        );
        assert_eq!(
            check(&environment(), &DimensionUsageCheck, "UPPER", &[city.clone()]),
            vec![]
        );

        let env = without(FeatureFlags {
            dimension_arguments: false,
            ..FeatureFlags::default()
        });
        assert_eq!(
            check(&env, &DimensionUsageCheck, "UPPER", &[city]),
            vec![ErrorCode::DimensionNotSupported]
        );
    }

    #[test]
    fn test_version_dimension_only_in_filters() {
        let version = attribute(Dimension::new("Version").version());
        assert_eq!(
            check(
                &environment(),
                &DimensionUsageCheck,
                "SUBTOTAL",
                &[sales(), version.clone()]
            ),
            vec![ErrorCode::VersionDimensionNotAllowed]
        );
        assert_eq!(
            check(
                &environment(),
                &DimensionUsageCheck,
                "=",
                &[version, ExpressionNode::string("Actual")]
            ),
            vec![]
        );
    }
}
