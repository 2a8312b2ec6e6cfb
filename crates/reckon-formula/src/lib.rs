//! # reckon-formula
//!
//! Formula parser, compiler and evaluator for reckon.
//!
//! This crate provides:
//! - A lexer driven by the operator registry (text → tokens)
//! - A precedence-climbing parser (tokens → AST)
//! - An extensible operator registry: unary, binary, ternary and function
//!   operators, with the usual arithmetic, comparison and logical built-ins
//! - A compiler that turns the AST into a reusable evaluator with constant
//!   folding and slot-based variable lookup
//! - [`Formula`], which ties it all together and recompiles only when its
//!   text or operator set changes
//!
//! ## Example
//!
//! ```rust
//! use reckon_formula::Formula;
//!
//! let mut formula = Formula::new("2 * (a + b) ^ 2 - c ? 1 : sqrt(a)").unwrap();
//! formula.bind_variable("a", 4.0);
//! formula.bind_variable("b", 1.0);
//! formula.bind_variable("c", 50.0);
//! assert_eq!(formula.evaluate().unwrap(), 2.0);
//!
//! formula.bind_variable("c", 0.0);
//! assert_eq!(formula.evaluate().unwrap(), 1.0);
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod formula;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod options;
pub mod parser;
pub mod variables;

pub use ast::Expr;
pub use compiler::{compile, CompiledExpr};
pub use error::{FormulaError, FormulaResult};
pub use formula::{Formula, FormulaState};
pub use lexer::{Spanned, Token, TokenStream};
pub use operators::{Arity, Associativity, Operand, OperatorDescriptor, OperatorFn, OperatorRegistry};
pub use options::{CompileMode, FormulaOptions, DEFAULT_MAX_NESTING_DEPTH};
pub use parser::parse_expression;
pub use variables::{Binding, Slot, ValueSource, Variables};
