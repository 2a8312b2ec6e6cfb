//! Formula Abstract Syntax Tree types

use std::fmt;

/// Formula expression AST
///
/// Operator and call nodes keep the byte offset of their operator token so
/// that errors found after parsing can still point into the text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// Numeric literal
    Constant(f64),
    /// Variable reference, resolved when the formula is compiled
    Variable(String),
    /// Prefix operation
    Unary {
        op: String,
        operand: Box<Expr>,
        offset: usize,
    },
    /// Infix operation
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        offset: usize,
    },
    /// Ternary operation such as `cond ? a : b`
    Ternary {
        op: String,
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        offset: usize,
    },
    /// Function call
    Call {
        name: String,
        args: Vec<Expr>,
        offset: usize,
    },
}

impl Expr {
    /// Distinct variable names, in order of first appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_variables(names),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Ternary {
                condition,
                if_true,
                if_false,
                ..
            } => {
                condition.collect_variables(names);
                if_true.collect_variables(names);
                if_false.collect_variables(names);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}

/// Fully parenthesized rendering, e.g. `(2 + (3 * 4))`
///
/// Ternary operations are rendered as `op(cond, a, b)`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::Variable(name) => f.write_str(name),
            Expr::Unary { op, operand, .. } => {
                if op.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    write!(f, "({} {})", op, operand)
                } else {
                    write!(f, "({}{})", op, operand)
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op, right),
            Expr::Ternary {
                op,
                condition,
                if_true,
                if_false,
                ..
            } => write!(f, "{}({}, {}, {})", op, condition, if_true, if_false),
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
