//! Formula compiler
//!
//! Lowers an [`Expr`] into a [`CompiledExpr`]: a tree of operator closures
//! that reads variables through slots instead of names. The compiled tree
//! owns no variable state, so it stays valid while bindings change.

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::operators::{
    Arity, BinaryFn, NAryFn, OperatorDescriptor, OperatorFn, OperatorRegistry, TernaryFn, UnaryFn,
};
use crate::variables::{Slot, Variables};
use std::fmt;

/// Compiled node
enum Node {
    Constant(f64),
    Variable(Slot),
    Unary {
        apply: UnaryFn,
        operand: Box<Node>,
    },
    Binary {
        apply: BinaryFn,
        left: Box<Node>,
        right: Box<Node>,
    },
    Ternary {
        apply: TernaryFn,
        condition: Box<Node>,
        if_true: Box<Node>,
        if_false: Box<Node>,
    },
    Call {
        apply: NAryFn,
        args: Vec<Node>,
    },
}

impl Node {
    fn eval(&self, variables: &Variables) -> FormulaResult<f64> {
        match self {
            Node::Constant(value) => Ok(*value),
            Node::Variable(slot) => variables.read(*slot),
            Node::Unary { apply, operand } => apply(operand.eval(variables)?),
            Node::Binary { apply, left, right } => {
                let left = left.eval(variables)?;
                let right = right.eval(variables)?;
                apply(left, right)
            }
            Node::Ternary {
                apply,
                condition,
                if_true,
                if_false,
            } => {
                let condition = condition.eval(variables)?;
                let when_true = || if_true.eval(variables);
                let when_false = || if_false.eval(variables);
                apply(condition, &when_true, &when_false)
            }
            Node::Call { apply, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(variables))
                    .collect::<FormulaResult<Vec<_>>>()?;
                apply(&values)
            }
        }
    }

    fn is_constant(&self) -> bool {
        matches!(self, Node::Constant(_))
    }

    /// All operands are constants, so the node itself can be folded
    fn has_constant_operands(&self) -> bool {
        match self {
            Node::Constant(_) | Node::Variable(_) => false,
            Node::Unary { operand, .. } => operand.is_constant(),
            Node::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Node::Ternary {
                condition,
                if_true,
                if_false,
                ..
            } => condition.is_constant() && if_true.is_constant() && if_false.is_constant(),
            Node::Call { args, .. } => args.iter().all(Node::is_constant),
        }
    }
}

/// Compiled, repeatedly evaluable formula
pub struct CompiledExpr {
    root: Node,
    slots: usize,
    folded: usize,
}

impl CompiledExpr {
    /// Evaluate against the current variable bindings
    pub fn evaluate(&self, variables: &Variables) -> FormulaResult<f64> {
        self.root.eval(variables)
    }

    /// The whole formula folded into a single value
    pub fn is_constant(&self) -> bool {
        self.root.is_constant()
    }

    /// Number of distinct variables the formula reads
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Number of nodes replaced by constants
    pub fn folded_nodes(&self) -> usize {
        self.folded
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("slots", &self.slots)
            .field("folded", &self.folded)
            .field("constant", &self.is_constant())
            .finish()
    }
}

/// Compile an AST
///
/// Variables referenced by the AST get a slot in `variables`, bound or not;
/// reading an unbound one fails at evaluation time. Fails if an operator or
/// function used by the AST is no longer registered.
pub fn compile(
    expr: &Expr,
    operators: &OperatorRegistry,
    variables: &mut Variables,
    constant_folding: bool,
) -> FormulaResult<CompiledExpr> {
    let mut compiler = Compiler {
        operators,
        variables,
        constant_folding,
        slots: Vec::new(),
        folded: 0,
    };
    let root = compiler.node(expr)?;

    log::debug!(
        "compiled formula: {} variable slots, {} nodes folded",
        compiler.slots.len(),
        compiler.folded
    );

    Ok(CompiledExpr {
        root,
        slots: compiler.slots.len(),
        folded: compiler.folded,
    })
}

struct Compiler<'a> {
    operators: &'a OperatorRegistry,
    variables: &'a mut Variables,
    constant_folding: bool,
    /// Distinct slots referenced so far
    slots: Vec<Slot>,
    folded: usize,
}

impl<'a> Compiler<'a> {
    fn node(&mut self, expr: &Expr) -> FormulaResult<Node> {
        match expr {
            Expr::Constant(value) => Ok(Node::Constant(*value)),

            Expr::Variable(name) => {
                let slot = self.variables.slot(name);
                if !self.slots.contains(&slot) {
                    self.slots.push(slot);
                }
                Ok(Node::Variable(slot))
            }

            Expr::Unary {
                op,
                operand,
                offset,
            } => {
                let descriptor = self.resolve(op, Arity::Unary, *offset)?;
                let OperatorFn::Unary(apply) = descriptor.operator_fn() else {
                    return Err(missing(op, Arity::Unary, *offset));
                };
                let node = Node::Unary {
                    apply: apply.clone(),
                    operand: Box::new(self.node(operand)?),
                };
                Ok(self.fold(node, descriptor))
            }

            Expr::Binary {
                op,
                left,
                right,
                offset,
            } => {
                let descriptor = self.resolve(op, Arity::Binary, *offset)?;
                let OperatorFn::Binary(apply) = descriptor.operator_fn() else {
                    return Err(missing(op, Arity::Binary, *offset));
                };
                let node = Node::Binary {
                    apply: apply.clone(),
                    left: Box::new(self.node(left)?),
                    right: Box::new(self.node(right)?),
                };
                Ok(self.fold(node, descriptor))
            }

            Expr::Ternary {
                op,
                condition,
                if_true,
                if_false,
                offset,
            } => {
                let descriptor = self.resolve(op, Arity::Ternary, *offset)?;
                let OperatorFn::Ternary { apply, .. } = descriptor.operator_fn() else {
                    return Err(missing(op, Arity::Ternary, *offset));
                };
                let node = Node::Ternary {
                    apply: apply.clone(),
                    condition: Box::new(self.node(condition)?),
                    if_true: Box::new(self.node(if_true)?),
                    if_false: Box::new(self.node(if_false)?),
                };
                Ok(self.fold(node, descriptor))
            }

            Expr::Call { name, args, offset } => {
                let descriptor = self.resolve(name, Arity::NAry, *offset)?;
                let OperatorFn::NAry { apply, .. } = descriptor.operator_fn() else {
                    return Err(missing(name, Arity::NAry, *offset));
                };
                // The function may have been replaced since the formula was parsed
                if let Some(expected) = descriptor.check_arg_count(args.len()) {
                    return Err(FormulaError::ArgumentCount {
                        function: descriptor.symbol().to_string(),
                        expected,
                        actual: args.len(),
                        offset: *offset,
                    });
                }

                let args = args
                    .iter()
                    .map(|arg| self.node(arg))
                    .collect::<FormulaResult<Vec<_>>>()?;
                let node = Node::Call {
                    apply: apply.clone(),
                    args,
                };
                Ok(self.fold(node, descriptor))
            }
        }
    }

    fn resolve(
        &self,
        symbol: &str,
        arity: Arity,
        offset: usize,
    ) -> FormulaResult<&'a OperatorDescriptor> {
        let operators: &'a OperatorRegistry = self.operators;
        operators
            .resolve(symbol, arity)
            .ok_or_else(|| missing(symbol, arity, offset))
    }

    /// Replace a node by its value when its operands are constants
    ///
    /// A node whose evaluation fails is kept so the error surfaces when the
    /// formula is evaluated.
    fn fold(&mut self, node: Node, descriptor: &OperatorDescriptor) -> Node {
        if !self.constant_folding || descriptor.is_volatile() || !node.has_constant_operands() {
            return node;
        }

        match node.eval(self.variables) {
            Ok(value) => {
                self.folded += 1;
                Node::Constant(value)
            }
            Err(e) => {
                log::trace!("not folding '{}': {}", descriptor.symbol(), e);
                node
            }
        }
    }
}

fn missing(symbol: &str, arity: Arity, offset: usize) -> FormulaError {
    FormulaError::MissingOperator {
        symbol: symbol.to_string(),
        arity,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::builtin;
    use crate::parser::parse_expression;

    fn compile_text(
        text: &str,
        operators: &OperatorRegistry,
        variables: &mut Variables,
        constant_folding: bool,
    ) -> FormulaResult<CompiledExpr> {
        let ast = parse_expression(text, operators, 64)?;
        compile(&ast, operators, variables, constant_folding)
    }

    #[test]
    fn test_constant_folding() {
        let operators = OperatorRegistry::new();
        let mut vars = Variables::new();

        let compiled = compile_text("2 + 3 * 4", &operators, &mut vars, true).unwrap();
        assert!(compiled.is_constant());
        assert_eq!(compiled.folded_nodes(), 2);
        assert_eq!(compiled.evaluate(&vars).unwrap(), 14.0);

        let compiled = compile_text("x * (2 + 3)", &operators, &mut vars, true).unwrap();
        assert!(!compiled.is_constant());
        assert_eq!(compiled.folded_nodes(), 1);
        assert_eq!(compiled.slot_count(), 1);

        let compiled = compile_text("2 + 3 * 4", &operators, &mut vars, false).unwrap();
        assert!(!compiled.is_constant());
        assert_eq!(compiled.folded_nodes(), 0);
        assert_eq!(compiled.evaluate(&vars).unwrap(), 14.0);
    }

    #[test]
    fn test_folding_is_bit_identical() {
        let operators = OperatorRegistry::new();
        let mut vars = Variables::new();
        let text = "sqrt(2) / 3 + 0.1 * 0.2";

        let folded = compile_text(text, &operators, &mut vars, true).unwrap();
        let unfolded = compile_text(text, &operators, &mut vars, false).unwrap();
        assert_eq!(
            folded.evaluate(&vars).unwrap().to_bits(),
            unfolded.evaluate(&vars).unwrap().to_bits()
        );
    }

    #[test]
    fn test_volatile_not_folded() {
        let operators = OperatorRegistry::new();
        let mut vars = Variables::new();

        let compiled = compile_text("rand() * 0 + 1", &operators, &mut vars, true).unwrap();
        assert!(!compiled.is_constant());
        assert_eq!(compiled.evaluate(&vars).unwrap(), 1.0);

        let compiled = compile_text("pi()", &operators, &mut vars, true).unwrap();
        assert!(compiled.is_constant());
    }

    #[test]
    fn test_failed_fold_surfaces_at_evaluation() {
        let mut operators = OperatorRegistry::new();
        operators.register(builtin::strict_divide("//")).unwrap();
        let mut vars = Variables::new();

        let compiled = compile_text("1 + 1 // 0", &operators, &mut vars, true).unwrap();
        assert!(!compiled.is_constant());
        assert_eq!(compiled.evaluate(&vars), Err(FormulaError::DivideByZero));
    }

    #[test]
    fn test_unbound_variables_reserve_slots() {
        let operators = OperatorRegistry::new();
        let mut vars = Variables::new();

        let compiled = compile_text("x + y * x", &operators, &mut vars, true).unwrap();
        assert_eq!(compiled.slot_count(), 2);
        assert_eq!(vars.slot_count(), 2);
        assert_eq!(
            compiled.evaluate(&vars),
            Err(FormulaError::UnboundVariable("x".into()))
        );

        vars.bind("x", 2.0);
        vars.bind("y", 3.0);
        assert_eq!(compiled.evaluate(&vars).unwrap(), 8.0);
    }

    #[test]
    fn test_missing_operator() {
        let mut operators = OperatorRegistry::new();
        let ast = parse_expression("1 + 2 <= 3", &operators, 64).unwrap();
        operators.unregister("<=", Arity::Binary);

        let result = compile(&ast, &operators, &mut Variables::new(), true);
        assert_eq!(
            result.unwrap_err(),
            FormulaError::MissingOperator {
                symbol: "<=".into(),
                arity: Arity::Binary,
                offset: 6,
            }
        );
    }

    #[test]
    fn test_replaced_function_argument_count() {
        let mut operators = OperatorRegistry::new();
        let ast = parse_expression("log(8, 2)", &operators, 64).unwrap();

        operators.unregister("LOG", Arity::NAry);
        operators
            .register(OperatorDescriptor::function("LOG", 1, Some(1), |args| {
                Ok(args[0].ln())
            }))
            .unwrap();

        let result = compile(&ast, &operators, &mut Variables::new(), true);
        assert!(matches!(
            result,
            Err(FormulaError::ArgumentCount { actual: 2, .. })
        ));
    }

    #[test]
    fn test_ternary_branches_are_lazy() {
        let operators = OperatorRegistry::new();
        let mut vars = Variables::new();
        vars.bind("flag", 1.0);

        // `missing` is never bound; only the taken branch is read
        let compiled = compile_text("flag ? 10 : missing", &operators, &mut vars, true).unwrap();
        assert_eq!(compiled.evaluate(&vars).unwrap(), 10.0);

        vars.bind("flag", 0.0);
        assert_eq!(
            compiled.evaluate(&vars),
            Err(FormulaError::UnboundVariable("missing".into()))
        );
    }
}
