//! # reckon
//!
//! A formula evaluation engine: parse an expression once, then evaluate it
//! as often as needed while its variables change.
//!
//! ## Features
//!
//! - Arithmetic, comparison and logical operators, `? :` conditionals
//! - Built-in math functions (`SQRT`, `MAX`, `ROUND`, `LOG`, ...)
//! - User-defined unary, binary, ternary and function operators
//! - Static values and suppliers that are read on every evaluation
//! - Lazy compilation with constant folding
//!
//! ## Example
//!
//! ```rust
//! use reckon::prelude::*;
//! use std::sync::Arc;
//!
//! let mut operators = OperatorRegistry::new();
//! operators
//!     .register(OperatorDescriptor::binary("%", 6, Associativity::Left, |a, b| Ok(a % b)))
//!     .unwrap();
//!
//! let mut formula = Formula::parse("(total % 7) * rate", Arc::new(operators)).unwrap();
//! formula.bind_variable("total", 30.0);
//! formula.bind_variable("rate", 1.5);
//! assert_eq!(formula.evaluate().unwrap(), 3.0);
//! ```

pub mod prelude;

// Re-export the engine
pub use reckon_formula::{
    // Parsing
    parse_expression,
    Expr,
    Spanned,
    Token,
    TokenStream,

    // Operators
    Arity,
    Associativity,
    Operand,
    OperatorDescriptor,
    OperatorFn,
    OperatorRegistry,

    // Variables
    Binding,
    Slot,
    ValueSource,
    Variables,

    // Compilation
    compile,
    CompileMode,
    CompiledExpr,
    FormulaOptions,
    DEFAULT_MAX_NESTING_DEPTH,

    // Main types
    Formula,
    FormulaState,

    // Error types
    FormulaError,
    FormulaResult,
};

pub use reckon_formula::{functions, operators::builtin};
