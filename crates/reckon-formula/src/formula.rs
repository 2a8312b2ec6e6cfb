//! Formula facade
//!
//! A [`Formula`] owns its parsed tree, its variable bindings and, once
//! compiled, its evaluator. Rebinding variables never triggers a recompile;
//! new text or a new operator set does.

use crate::ast::Expr;
use crate::compiler::{self, CompiledExpr};
use crate::error::{FormulaError, FormulaResult};
use crate::operators::OperatorRegistry;
use crate::options::{CompileMode, FormulaOptions};
use crate::parser::parse_expression;
use crate::variables::{Binding, ValueSource, Variables};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lifecycle state of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaState {
    /// No text has been parsed yet
    Uninitialized,
    /// Parsed, evaluator not built
    Parsed,
    /// Ready to evaluate
    Compiled,
}

enum Stage {
    Uninitialized,
    Parsed(Expr),
    Compiled { ast: Expr, evaluator: CompiledExpr },
}

impl Stage {
    fn state(&self) -> FormulaState {
        match self {
            Stage::Uninitialized => FormulaState::Uninitialized,
            Stage::Parsed(_) => FormulaState::Parsed,
            Stage::Compiled { .. } => FormulaState::Compiled,
        }
    }

    fn ast(&self) -> Option<&Expr> {
        match self {
            Stage::Uninitialized => None,
            Stage::Parsed(ast) | Stage::Compiled { ast, .. } => Some(ast),
        }
    }
}

/// Parsed formula with its variable bindings
///
/// # Example
/// ```rust
/// use reckon_formula::{Formula, FormulaState};
///
/// let mut formula = Formula::new("a * a").unwrap();
/// formula.bind_variable("a", 2.0);
/// assert_eq!(formula.evaluate().unwrap(), 4.0);
///
/// // Rebinding does not re-parse or recompile
/// formula.bind_variable("a", 5.0);
/// assert_eq!(formula.evaluate().unwrap(), 25.0);
/// assert_eq!(formula.state(), FormulaState::Compiled);
/// ```
pub struct Formula {
    text: String,
    operators: Arc<OperatorRegistry>,
    options: FormulaOptions,
    variables: Variables,
    stage: Stage,
}

impl Formula {
    /// Parse text with the built-in operators and default options
    pub fn new(text: &str) -> FormulaResult<Self> {
        Self::parse(text, OperatorRegistry::global())
    }

    /// Parse text with the given operators
    pub fn parse(text: &str, operators: Arc<OperatorRegistry>) -> FormulaResult<Self> {
        Self::parse_with_options(text, operators, FormulaOptions::default())
    }

    /// Parse text with the given operators and options
    pub fn parse_with_options(
        text: &str,
        operators: Arc<OperatorRegistry>,
        options: FormulaOptions,
    ) -> FormulaResult<Self> {
        let mut formula = Self {
            text: String::new(),
            operators,
            options,
            variables: Variables::new(),
            stage: Stage::Uninitialized,
        };
        formula.set_text(text)?;
        Ok(formula)
    }

    /// Create a formula without text
    ///
    /// Evaluating it fails with [`FormulaError::NotParsed`] until
    /// [`set_text`](Self::set_text) succeeds.
    pub fn with_operators(operators: Arc<OperatorRegistry>) -> Self {
        Self {
            text: String::new(),
            operators,
            options: FormulaOptions::default(),
            variables: Variables::new(),
            stage: Stage::Uninitialized,
        }
    }

    /// Replace the options used by the next parse or compile
    pub fn with_options(mut self, options: FormulaOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse new text, keeping variable bindings
    ///
    /// On failure the formula keeps its previous text and state.
    pub fn set_text(&mut self, text: &str) -> FormulaResult<()> {
        let ast = parse_expression(text, &self.operators, self.options.max_nesting_depth)?;

        self.text = text.to_string();
        self.transition(Stage::Parsed(ast));
        // Slots reserved for the old text are no longer referenced
        self.variables.release_unbound();

        if self.options.compile_mode == CompileMode::Eager {
            self.compile()?;
        }
        Ok(())
    }

    /// Build the evaluator now instead of on the first evaluation
    pub fn compile(&mut self) -> FormulaResult<()> {
        let ast = match std::mem::replace(&mut self.stage, Stage::Uninitialized) {
            Stage::Parsed(ast) => ast,
            Stage::Uninitialized => return Err(FormulaError::NotParsed),
            compiled @ Stage::Compiled { .. } => {
                self.stage = compiled;
                return Ok(());
            }
        };

        match compiler::compile(
            &ast,
            &self.operators,
            &mut self.variables,
            self.options.constant_folding,
        ) {
            Ok(evaluator) => {
                self.transition(Stage::Compiled { ast, evaluator });
                Ok(())
            }
            Err(e) => {
                self.stage = Stage::Parsed(ast);
                Err(e)
            }
        }
    }

    /// Drop the compiled evaluator
    ///
    /// It is rebuilt by the next evaluation, or right away in eager mode.
    pub fn recompile(&mut self) -> FormulaResult<()> {
        let stage = match std::mem::replace(&mut self.stage, Stage::Uninitialized) {
            Stage::Compiled { ast, .. } => Stage::Parsed(ast),
            other => other,
        };
        self.transition(stage);

        if self.options.compile_mode == CompileMode::Eager && self.stage.ast().is_some() {
            self.compile()?;
        }
        Ok(())
    }

    /// Switch to another operator set
    ///
    /// The parsed tree is kept; compiling fails with
    /// [`FormulaError::MissingOperator`] if it uses an operator the new set
    /// lacks.
    pub fn set_operators(&mut self, operators: Arc<OperatorRegistry>) -> FormulaResult<()> {
        self.operators = operators;
        self.recompile()
    }

    /// Evaluate with the current variable bindings, compiling first if needed
    pub fn evaluate(&mut self) -> FormulaResult<f64> {
        self.compile()?;
        match &self.stage {
            Stage::Compiled { evaluator, .. } => evaluator.evaluate(&self.variables),
            _ => Err(FormulaError::NotParsed),
        }
    }

    // === Variables ===

    /// Bind a value or a [`Binding`], replacing any previous binding
    pub fn bind_variable(&mut self, name: &str, binding: impl Into<Binding>) {
        self.variables.bind(name, binding);
    }

    /// Bind a supplier that is read on every evaluation
    pub fn bind_supplier<S>(&mut self, name: &str, source: S)
    where
        S: ValueSource + 'static,
    {
        self.variables.bind_supplier(name, source);
    }

    /// Remove a binding; evaluating afterwards fails until it is bound again
    pub fn unbind_variable(&mut self, name: &str) -> Option<Binding> {
        self.variables.unbind(name)
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Distinct variable names used by the formula, in order of appearance
    pub fn referenced_variables(&self) -> Vec<&str> {
        self.stage.ast().map(Expr::variables).unwrap_or_default()
    }

    /// Referenced variables without a binding
    pub fn unbound_variables(&self) -> Vec<&str> {
        self.referenced_variables()
            .into_iter()
            .filter(|name| !self.variables.contains(name))
            .collect()
    }

    // === Accessors ===

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> Option<&Expr> {
        self.stage.ast()
    }

    pub fn state(&self) -> FormulaState {
        self.stage.state()
    }

    pub fn options(&self) -> &FormulaOptions {
        &self.options
    }

    pub fn operators(&self) -> &Arc<OperatorRegistry> {
        &self.operators
    }

    fn transition(&mut self, stage: Stage) {
        let from = self.stage.state();
        let to = stage.state();
        if from != to {
            log::trace!("formula '{}': {:?} -> {:?}", self.text, from, to);
        }
        self.stage = stage;
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::new(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("text", &self.text)
            .field("state", &self.state())
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Arity;

    #[test]
    fn test_lazy_compilation() {
        let mut formula = Formula::new("1 + 2").unwrap();
        assert_eq!(formula.state(), FormulaState::Parsed);

        assert_eq!(formula.evaluate().unwrap(), 3.0);
        assert_eq!(formula.state(), FormulaState::Compiled);

        formula.bind_variable("unused", 1.0);
        assert_eq!(formula.state(), FormulaState::Compiled);
    }

    #[test]
    fn test_eager_compilation() {
        let options = FormulaOptions {
            compile_mode: CompileMode::Eager,
            ..Default::default()
        };
        let formula = Formula::parse_with_options("x * 2", OperatorRegistry::global(), options)
            .unwrap();
        assert_eq!(formula.state(), FormulaState::Compiled);
    }

    #[test]
    fn test_uninitialized() {
        let mut formula = Formula::with_operators(OperatorRegistry::global());
        assert_eq!(formula.state(), FormulaState::Uninitialized);
        assert_eq!(formula.evaluate(), Err(FormulaError::NotParsed));
        assert!(formula.ast().is_none());
        assert!(formula.referenced_variables().is_empty());

        formula.set_text("4 / 2").unwrap();
        assert_eq!(formula.state(), FormulaState::Parsed);
        assert_eq!(formula.evaluate().unwrap(), 2.0);
    }

    #[test]
    fn test_set_text_returns_to_parsed() {
        let mut formula = Formula::new("a + 1").unwrap();
        formula.bind_variable("a", 1.0);
        assert_eq!(formula.evaluate().unwrap(), 2.0);

        formula.set_text("a * 10").unwrap();
        assert_eq!(formula.state(), FormulaState::Parsed);
        assert_eq!(formula.evaluate().unwrap(), 10.0);
    }

    #[test]
    fn test_set_text_releases_stale_slots() {
        let mut formula = Formula::new("1").unwrap();
        formula.bind_variable("keep", 2.0);

        for i in 0..50 {
            formula.set_text(&format!("keep * v{}", i)).unwrap();
            assert!(formula.evaluate().is_err());
            assert_eq!(formula.variables().slot_count(), 2);
        }

        formula.set_text("keep + 1").unwrap();
        assert_eq!(formula.evaluate().unwrap(), 3.0);
        assert_eq!(formula.variables().slot_count(), 1);
    }

    #[test]
    fn test_failed_set_text_keeps_state() {
        let mut formula = Formula::new("2 * 3").unwrap();
        formula.evaluate().unwrap();

        let err = formula.set_text("2 * (3").unwrap_err();
        assert_eq!(err, FormulaError::UnbalancedParentheses { offset: 4 });
        assert_eq!(formula.text(), "2 * 3");
        assert_eq!(formula.state(), FormulaState::Compiled);
        assert_eq!(formula.evaluate().unwrap(), 6.0);
    }

    #[test]
    fn test_recompile() {
        let mut formula = Formula::new("1").unwrap();
        formula.evaluate().unwrap();
        formula.recompile().unwrap();
        assert_eq!(formula.state(), FormulaState::Parsed);

        let mut empty = Formula::with_operators(OperatorRegistry::global());
        empty.recompile().unwrap();
        assert_eq!(empty.state(), FormulaState::Uninitialized);
    }

    #[test]
    fn test_set_operators_missing_operator() {
        let mut formula = Formula::new("2 ^ 3").unwrap();
        assert_eq!(formula.evaluate().unwrap(), 8.0);

        let mut operators = OperatorRegistry::new();
        operators.unregister("^", Arity::Binary);
        formula.set_operators(Arc::new(operators)).unwrap();
        assert_eq!(formula.state(), FormulaState::Parsed);

        assert_eq!(
            formula.evaluate(),
            Err(FormulaError::MissingOperator {
                symbol: "^".into(),
                arity: Arity::Binary,
                offset: 2,
            })
        );
        assert_eq!(formula.state(), FormulaState::Parsed);

        formula.set_operators(OperatorRegistry::global()).unwrap();
        assert_eq!(formula.evaluate().unwrap(), 8.0);
    }

    #[test]
    fn test_variable_listing() {
        let mut formula = Formula::new("b + a * b - c").unwrap();
        formula.bind_variable("a", 1.0);

        assert_eq!(formula.referenced_variables(), vec!["b", "a", "c"]);
        assert_eq!(formula.unbound_variables(), vec!["b", "c"]);

        formula.unbind_variable("a");
        assert_eq!(formula.unbound_variables(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_from_str_and_display() {
        let formula: Formula = "max(1, 2) + x".parse().unwrap();
        assert_eq!(formula.to_string(), "max(1, 2) + x");
        assert!("1 +".parse::<Formula>().is_err());
    }

    #[test]
    fn test_formula_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Formula>();
    }
}
