//! Prelude module - common imports for reckon users
//!
//! ```rust
//! use reckon::prelude::*;
//! ```

pub use crate::{
    // Operators
    Associativity,
    Binding,
    CompileMode,

    // Main types
    Formula,
    // Error types
    FormulaError,
    FormulaOptions,
    FormulaResult,
    FormulaState,

    OperatorDescriptor,
    OperatorRegistry,
    ValueSource,
};
