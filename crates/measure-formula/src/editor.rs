//! Editor integration
//!
//! [`EditorBridge`] keeps the formula being edited together with its tokens
//! so an editor can ask what sits under the cursor. Display and canonical text
//! differ only in single-byte separators, so token offsets are valid in both.
//! Hooks that need a native editor surface are not provided by this crate.

use crate::compiler::{CompileContext, Compiler};
use crate::config::CompilerEnvironment;
use crate::error::{FormulaError, FormulaResult};
use crate::node::ExpressionNode;
use crate::presentation::FormulaText;
use crate::scanner::{self, Direction, Token, TokenKind};
use measure_formula_core::{DataType, MetadataSnapshot, StructureMembers, ValidationMessages};
use std::ops::Range;
use std::sync::Arc;

/// Style class of a highlighted span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightClass {
    Function,
    Measure,
    Dimension,
    Literal,
}

/// Formula state of one editor
pub struct EditorBridge<'a> {
    env: &'a CompilerEnvironment,
    metadata: Arc<MetadataSnapshot>,
    context: CompileContext,
    text: FormulaText,
    tokens: Vec<Token>,
}

impl<'a> EditorBridge<'a> {
    /// Attach to a model; fails until its structure members are loaded
    pub fn attach(env: &'a CompilerEnvironment, members: &StructureMembers) -> FormulaResult<Self> {
        let metadata = members.snapshot()?;
        Ok(Self::with_snapshot(env, metadata))
    }

    pub fn with_snapshot(env: &'a CompilerEnvironment, metadata: Arc<MetadataSnapshot>) -> Self {
        Self {
            env,
            metadata,
            context: CompileContext::new(),
            text: FormulaText::empty(),
            tokens: Vec::new(),
        }
    }

    /// Edit the formula of an existing measure
    pub fn editing(mut self, measure: impl Into<String>) -> Self {
        self.context = CompileContext::editing(measure);
        self
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(self.env, self.metadata.as_ref())
    }

    pub fn text(&self) -> &FormulaText {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Replace the formula with text typed in the editor's locale
    pub fn set_display_text(&mut self, display: &str) {
        self.text = FormulaText::from_display(display, self.env.locale());
        self.retokenize();
    }

    /// Replace the formula with canonical text
    pub fn set_canonical_text(&mut self, canonical: &str) {
        self.text = FormulaText::from_canonical(canonical, self.env.locale());
        self.retokenize();
    }

    fn retokenize(&mut self) {
        let tokens = self.compiler().tokenize(self.text.canonical());
        self.tokens = tokens;
    }

    pub fn token_at(&self, position: usize, direction: Direction) -> Option<&Token> {
        scanner::token_at(&self.tokens, position, direction)
    }

    /// Types accepted by the call argument under the cursor
    pub fn expected_types_at(&self, position: usize) -> &[DataType] {
        self.tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Argument && t.touches(position))
            .min_by_key(|t| t.interaction_span.len())
            .map(|t| t.data_types.as_slice())
            .unwrap_or(&[])
    }

    /// Messages for the current text, separator guard included
    pub fn validate(&self) -> ValidationMessages {
        self.compiler()
            .validate_display(self.text.display(), &self.context)
    }

    pub fn highlight(&self) -> FormulaResult<Vec<(Range<usize>, HighlightClass)>> {
        Err(FormulaError::NotImplemented("syntax highlighting"))
    }

    pub fn bind_keys(&mut self) -> FormulaResult<()> {
        Err(FormulaError::NotImplemented("editor key bindings"))
    }

    pub fn node_at_cursor(&self, _position: usize) -> FormulaResult<&ExpressionNode> {
        Err(FormulaError::NotImplemented("cursor to node mapping"))
    }
}
