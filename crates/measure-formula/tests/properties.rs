//! Property tests for text conversion, folding and arity

use measure_formula::engine;
use measure_formula::functions::ItemContext;
use measure_formula::presentation::check_separators;
use measure_formula::{
    to_canonical_text, to_display_text, CompileContext, Compiler, CompilerEnvironment,
    ExpressionNode, FunctionKind, Locale,
};
use measure_formula_core::{Backend, ErrorCode, MetadataSnapshot};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,4}",
        "[0-9]{1,3}\\.[0-9]{1,3}",
        "\\.[0-9]{1,3}",
        Just("[Sales]".to_string()),
        Just("[d/\"Model, 1.0\":City].[p/Name]".to_string()),
        "[a-z ,.;]{0,6}".prop_map(|s| format!("\"{}\"", s)),
    ]
}

/// Canonical formula text: calls, lists and infix operators over leaves
fn canonical_formula() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} + {}", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("MAX({}, {})", a, b)),
            prop::collection::vec(inner, 1..4).prop_map(|items| format!("{{{}}}", items.join(", "))),
        ]
    })
}

proptest! {
    #[test]
    fn prop_display_round_trip(text in canonical_formula()) {
        let display = to_display_text(&text, Locale::COMMA_DECIMAL);
        prop_assert_eq!(to_canonical_text(&display, Locale::COMMA_DECIMAL), text.clone());
        prop_assert_eq!(display.len(), text.len());
    }

    #[test]
    fn prop_display_text_passes_separator_guard(text in canonical_formula()) {
        let display = to_display_text(&text, Locale::COMMA_DECIMAL);
        prop_assert!(check_separators(&display, Locale::COMMA_DECIMAL).is_empty());
    }

    #[test]
    fn prop_canonical_locale_is_identity(text in canonical_formula()) {
        prop_assert_eq!(to_display_text(&text, Locale::CANONICAL), text.clone());
    }

    #[test]
    fn prop_folded_literals_stay_put(a in -1000i64..1000, b in -1000i64..1000, c in 1i64..100) {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Hana);
        let cx = ItemContext::new(&env, &metadata);

        // (a + b) * c
        let tree = ExpressionNode::call(
            FunctionKind::Multiply,
            vec![
                ExpressionNode::call(
                    FunctionKind::Add,
                    vec![
                        ExpressionNode::number(Decimal::from(a)),
                        ExpressionNode::number(Decimal::from(b)),
                    ],
                ),
                ExpressionNode::number(Decimal::from(c)),
            ],
        );
        let folded = engine::lower(tree, &cx);
        prop_assert_eq!(folded.as_number(), Some(Decimal::from((a + b) * c)));
        prop_assert!(engine::fold(&folded, &cx).is_none());
        prop_assert!(engine::rewrite(&folded, &cx).is_none());
        prop_assert_eq!(engine::lower(folded.clone(), &cx), folded);
    }

    #[test]
    fn prop_literals_do_not_fold(text in "[a-z]{0,8}", flag in any::<bool>()) {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Hana);
        let cx = ItemContext::new(&env, &metadata);

        for node in [
            ExpressionNode::string(text),
            ExpressionNode::boolean(flag),
            ExpressionNode::null(),
        ] {
            prop_assert!(engine::fold(&node, &cx).is_none());
        }
    }
}

#[test]
fn test_arity_boundaries() {
    let env = CompilerEnvironment::default();
    let metadata = MetadataSnapshot::new(Backend::Hana);
    let compiler = Compiler::new(&env, &metadata);
    let cx = CompileContext::new();
    let codes = |text: &str| compiler.validate(text, &cx).codes();

    // SUBSTRING takes two required arguments and one optional one
    assert_eq!(
        codes(r#"LENGTH(SUBSTRING("abcdef"))"#),
        vec![ErrorCode::TooFewArguments]
    );
    assert_eq!(codes(r#"LENGTH(SUBSTRING("abcdef", 2))"#), vec![]);
    assert_eq!(codes(r#"LENGTH(SUBSTRING("abcdef", 2, 3))"#), vec![]);
    assert_eq!(
        codes(r#"LENGTH(SUBSTRING("abcdef", 2, 3, 4))"#),
        vec![ErrorCode::TooManyArguments]
    );

    // REPLACE takes exactly three or four
    assert_eq!(
        codes(r#"LENGTH(REPLACE("abc", "b"))"#),
        vec![ErrorCode::ArgumentCountMismatch]
    );
}
