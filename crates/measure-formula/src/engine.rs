//! Fold/rewrite engine
//!
//! Pure functions over built nodes. Lowering a call tries its item's rewrite
//! first and lowers the result again; only when no rewrite applies is the call
//! folded.

use crate::functions::{FormulaBehavior, ItemContext};
use crate::node::{ExpressionNode, FunctionNode};

/// Upper bound on chained rewrites below one node
const MAX_REWRITES: usize = 16;

/// Constant-fold a call node; `None` when not applicable
pub fn fold(node: &ExpressionNode, cx: &ItemContext<'_>) -> Option<ExpressionNode> {
    match node {
        ExpressionNode::Function(FunctionNode { kind, args }) => kind.fold(args, cx),
        _ => None,
    }
}

/// Structurally lower a call node; `None` when not applicable
pub fn rewrite(node: &ExpressionNode, cx: &ItemContext<'_>) -> Option<ExpressionNode> {
    match node {
        ExpressionNode::Function(FunctionNode { kind, args }) => kind.rewrite(args, cx),
        _ => None,
    }
}

/// Lower a whole tree bottom-up
pub fn lower(node: ExpressionNode, cx: &ItemContext<'_>) -> ExpressionNode {
    lower_tree(node, cx, MAX_REWRITES)
}

/// Lower one node whose children are already lowered
pub fn lower_node(node: ExpressionNode, cx: &ItemContext<'_>) -> ExpressionNode {
    lower_with_budget(node, cx, MAX_REWRITES)
}

fn lower_tree(node: ExpressionNode, cx: &ItemContext<'_>, budget: usize) -> ExpressionNode {
    let node = match node {
        ExpressionNode::Function(FunctionNode { kind, args }) => ExpressionNode::call(
            kind,
            args.into_iter()
                .map(|arg| lower_tree(arg, cx, budget))
                .collect(),
        ),
        ExpressionNode::Array(items) => ExpressionNode::list(
            items
                .into_iter()
                .map(|item| lower_tree(item, cx, budget))
                .collect(),
        ),
        other => other,
    };
    lower_with_budget(node, cx, budget)
}

fn lower_with_budget(node: ExpressionNode, cx: &ItemContext<'_>, budget: usize) -> ExpressionNode {
    if budget > 0 {
        if let Some(rewritten) = rewrite(&node, cx) {
            tracing::trace!(from = %node, to = %rewritten, "rewrite applied");
            // The rewrite may build new calls that need lowering themselves
            return lower_tree(rewritten, cx, budget - 1);
        }
    } else {
        tracing::debug!(node = %node, "rewrite budget exhausted");
    }

    match fold(&node, cx) {
        Some(folded) => {
            tracing::trace!(from = %node, to = %folded, "fold applied");
            folded
        }
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerEnvironment;
    use crate::functions::FunctionKind;
    use crate::node::Literal;
    use measure_formula_core::{Backend, MetadataSnapshot};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn num(n: i64) -> ExpressionNode {
        ExpressionNode::number(Decimal::from(n))
    }

    #[test]
    fn test_lower_folds_bottom_up() {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Hana);
        let cx = ItemContext::new(&env, &metadata);

        // (1 + 2) * 3
        let tree = ExpressionNode::call(
            FunctionKind::Multiply,
            vec![ExpressionNode::call(FunctionKind::Add, vec![num(1), num(2)]), num(3)],
        );
        assert_eq!(lower(tree, &cx), num(9));
    }

    #[test]
    fn test_rewrite_precedes_fold() {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Hana);
        let cx = ItemContext::new(&env, &metadata);

        // 2 IN {1, 2} expands to an OR chain which then folds
        let tree = ExpressionNode::call(
            FunctionKind::In,
            vec![
                num(2),
                ExpressionNode::ListConstant(vec![
                    Literal::Number(Decimal::from(1)),
                    Literal::Number(Decimal::from(2)),
                ]),
            ],
        );
        assert!(rewrite(&tree, &cx).is_some());
        assert_eq!(lower(tree, &cx), ExpressionNode::boolean(true));
    }

    #[test]
    fn test_folded_literals_are_final() {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Hana);
        let cx = ItemContext::new(&env, &metadata);

        assert_eq!(fold(&num(4), &cx), None);
        assert_eq!(rewrite(&num(4), &cx), None);
        let list = ExpressionNode::Array(vec![
            ExpressionNode::call(FunctionKind::Add, vec![num(1), num(1)]),
            num(3),
        ]);
        assert_eq!(
            lower(list, &cx),
            ExpressionNode::ListConstant(vec![
                Literal::Number(Decimal::from(2)),
                Literal::Number(Decimal::from(3))
            ])
        );
    }
}
