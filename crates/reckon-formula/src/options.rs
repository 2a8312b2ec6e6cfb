//! Formula compilation options

/// Default limit for parenthesis, call and operator nesting
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// When a formula is lowered into its compiled evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompileMode {
    /// Compile on the first call to `evaluate`
    #[default]
    Lazy,
    /// Compile as soon as the text has been parsed
    Eager,
}

/// Options for parsing and compiling a formula
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormulaOptions {
    /// When the compiled evaluator is built (default: lazily)
    pub compile_mode: CompileMode,
    /// Fold sub-trees without variables or volatile operators (default: true)
    pub constant_folding: bool,
    /// Maximum nesting depth accepted by the parser (default: 128)
    pub max_nesting_depth: usize,
}

impl Default for FormulaOptions {
    fn default() -> Self {
        Self {
            compile_mode: CompileMode::Lazy,
            constant_folding: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}
