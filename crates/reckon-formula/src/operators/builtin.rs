//! Built-in operators
//!
//! Precedence (lowest to highest):
//! 1. Ternary: `? :`
//! 2. Logical OR
//! 3. Logical AND
//! 4. Comparison: `=`, `<>`, `<`, `<=`, `>`, `>=`
//! 5. Addition/Subtraction: `+`, `-`
//! 6. Multiplication/Division: `*`, `/`
//! 7. Exponentiation: `^` (right associative)
//! 8. Prefix: `-`, `+`, `NOT`
//!
//! Comparisons and logical operators yield `1.0` or `0.0`; any non-zero
//! operand counts as true.

use super::{Associativity, OperatorDescriptor, Operand};
use crate::error::{FormulaError, FormulaResult};

pub const TERNARY: u8 = 1;
pub const OR: u8 = 2;
pub const AND: u8 = 3;
pub const COMPARISON: u8 = 4;
pub const ADDITIVE: u8 = 5;
pub const MULTIPLICATIVE: u8 = 6;
pub const POWER: u8 = 7;
pub const PREFIX: u8 = 8;

/// Truth value of a number
pub fn truthy(value: f64) -> bool {
    value != 0.0
}

fn boolean(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// The operators every registry created with `OperatorRegistry::new` starts with
pub fn operators() -> Vec<OperatorDescriptor> {
    use Associativity::{Left, Right};

    vec![
        // Arithmetic
        OperatorDescriptor::binary("+", ADDITIVE, Left, |a, b| Ok(a + b)),
        OperatorDescriptor::binary("-", ADDITIVE, Left, |a, b| Ok(a - b)),
        OperatorDescriptor::binary("*", MULTIPLICATIVE, Left, |a, b| Ok(a * b)),
        OperatorDescriptor::binary("/", MULTIPLICATIVE, Left, |a, b| Ok(a / b)),
        OperatorDescriptor::binary("^", POWER, Right, |a, b| Ok(a.powf(b))),
        OperatorDescriptor::unary("-", PREFIX, |a| Ok(-a)),
        OperatorDescriptor::unary("+", PREFIX, Ok),
        // Comparison
        OperatorDescriptor::binary("=", COMPARISON, Left, |a, b| Ok(boolean(a == b))),
        OperatorDescriptor::binary("<>", COMPARISON, Left, |a, b| Ok(boolean(a != b))),
        OperatorDescriptor::binary("<", COMPARISON, Left, |a, b| Ok(boolean(a < b))),
        OperatorDescriptor::binary("<=", COMPARISON, Left, |a, b| Ok(boolean(a <= b))),
        OperatorDescriptor::binary(">", COMPARISON, Left, |a, b| Ok(boolean(a > b))),
        OperatorDescriptor::binary(">=", COMPARISON, Left, |a, b| Ok(boolean(a >= b))),
        // Logical
        OperatorDescriptor::binary("AND", AND, Left, |a, b| {
            Ok(boolean(truthy(a) && truthy(b)))
        }),
        OperatorDescriptor::binary("OR", OR, Left, |a, b| Ok(boolean(truthy(a) || truthy(b)))),
        OperatorDescriptor::unary("NOT", PREFIX, |a| Ok(boolean(!truthy(a)))),
        // Conditional
        OperatorDescriptor::ternary("?", ":", TERNARY, conditional),
    ]
}

/// `cond ? a : b`, evaluating only the selected branch
fn conditional(condition: f64, if_true: Operand<'_>, if_false: Operand<'_>) -> FormulaResult<f64> {
    if truthy(condition) {
        if_true()
    } else {
        if_false()
    }
}

/// Division that fails on a zero divisor instead of producing infinity or NaN
///
/// Not registered by default; register it under a symbol of your choice.
///
/// # Example
/// ```rust
/// use reckon_formula::{operators::builtin, Formula, FormulaError, OperatorRegistry};
/// use std::sync::Arc;
///
/// let mut operators = OperatorRegistry::new();
/// operators.register(builtin::strict_divide("//")).unwrap();
///
/// let mut formula = Formula::parse("1 // 0", Arc::new(operators)).unwrap();
/// assert_eq!(formula.evaluate(), Err(FormulaError::DivideByZero));
/// ```
pub fn strict_divide(symbol: &str) -> OperatorDescriptor {
    OperatorDescriptor::binary(symbol, MULTIPLICATIVE, Associativity::Left, |a, b| {
        if b == 0.0 {
            Err(FormulaError::DivideByZero)
        } else {
            Ok(a / b)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorFn;

    fn binary(symbol: &str) -> impl Fn(f64, f64) -> f64 {
        let descriptor = operators()
            .into_iter()
            .find(|d| d.symbol() == symbol && d.arity() == crate::operators::Arity::Binary)
            .unwrap();
        move |a, b| match descriptor.operator_fn() {
            OperatorFn::Binary(apply) => apply(a, b).unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary("<")(1.0, 2.0), 1.0);
        assert_eq!(binary(">=")(1.0, 2.0), 0.0);
        assert_eq!(binary("<>")(3.0, 3.0), 0.0);
        assert_eq!(binary("=")(3.0, 3.0), 1.0);
    }

    #[test]
    fn test_logical() {
        assert_eq!(binary("AND")(2.0, -1.0), 1.0);
        assert_eq!(binary("AND")(2.0, 0.0), 0.0);
        assert_eq!(binary("OR")(0.0, 0.0), 0.0);
        assert_eq!(binary("OR")(0.0, 0.5), 1.0);
    }

    #[test]
    fn test_ieee_division() {
        assert_eq!(binary("/")(1.0, 0.0), f64::INFINITY);
        assert!(binary("/")(0.0, 0.0).is_nan());
    }

    #[test]
    fn test_conditional_is_lazy() {
        let fail = || -> FormulaResult<f64> { Err(FormulaError::Evaluation("evaluated".into())) };
        let ten = || -> FormulaResult<f64> { Ok(10.0) };
        assert_eq!(conditional(1.0, &ten, &fail), Ok(10.0));
        assert_eq!(conditional(0.0, &fail, &ten), Ok(10.0));
    }

    #[test]
    fn test_strict_divide() {
        let descriptor = strict_divide("//");
        let OperatorFn::Binary(apply) = descriptor.operator_fn() else {
            panic!("Expected binary operator");
        };
        assert_eq!(apply(6.0, 3.0), Ok(2.0));
        assert_eq!(apply(1.0, 0.0), Err(FormulaError::DivideByZero));
    }
}
