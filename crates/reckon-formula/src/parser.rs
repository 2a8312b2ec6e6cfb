//! Formula parser
//!
//! A precedence-climbing parser driven by the operator registry: binary and
//! ternary operators take their precedence and associativity from their
//! descriptors, prefix operators bind tighter than any binary operator.
//!
//! Parsing has no side effects. Bare identifiers become variable references
//! and are only resolved when the formula is compiled.

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{Spanned, Token, TokenStream};
use crate::operators::{Arity, Associativity, OperatorRegistry};

/// Tree height allowed per level of nesting depth
///
/// Flat operator chains grow the tree without nesting, so they get a
/// wider bound than parentheses and prefix chains.
const HEIGHT_PER_DEPTH: usize = 4;

/// Parse formula text into an AST
///
/// # Example
/// ```rust
/// use reckon_formula::{parse_expression, OperatorRegistry};
///
/// let operators = OperatorRegistry::new();
/// let ast = parse_expression("2 * (a + b) ^ 2", &operators, 64).unwrap();
/// assert_eq!(ast.to_string(), "(2 * ((a + b) ^ 2))");
/// ```
pub fn parse_expression(
    text: &str,
    operators: &OperatorRegistry,
    max_depth: usize,
) -> FormulaResult<Expr> {
    let mut parser = FormulaParser::new(text, operators, max_depth);
    let tree = parser.expression(0)?;

    // Make sure we consumed all input
    let Spanned { token, offset } = parser.tokens.next_token()?;
    match token {
        Token::End => Ok(tree.expr),
        Token::RightParen => Err(FormulaError::UnbalancedParentheses { offset }),
        other => Err(unexpected(&other, offset)),
    }
}

/// Parsed node together with the height of its tree
struct Subtree {
    expr: Expr,
    height: usize,
}

impl Subtree {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}

/// Formula parser
struct FormulaParser<'a> {
    tokens: TokenStream<'a>,
    operators: &'a OperatorRegistry,
    max_depth: usize,
    max_height: usize,
    /// Current recursion depth
    depth: usize,
    /// Offsets of the parentheses that are still open
    open_parens: Vec<usize>,
}

impl<'a> FormulaParser<'a> {
    fn new(text: &'a str, operators: &'a OperatorRegistry, max_depth: usize) -> Self {
        Self {
            tokens: TokenStream::new(text, operators),
            operators,
            max_depth,
            max_height: max_depth.saturating_mul(HEIGHT_PER_DEPTH),
            depth: 0,
            open_parens: Vec::new(),
        }
    }

    // === Nesting guards ===

    fn enter(&mut self, offset: usize) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaError::MaxNestingExceeded {
                limit: self.max_depth,
                offset,
            });
        }
        Ok(())
    }

    fn node(&self, expr: Expr, height: usize, offset: usize) -> FormulaResult<Subtree> {
        if height > self.max_height {
            return Err(FormulaError::MaxNestingExceeded {
                limit: self.max_height,
                offset,
            });
        }
        Ok(Subtree { expr, height })
    }

    // === Expression parsing with precedence ===

    fn expression(&mut self, min_precedence: u16) -> FormulaResult<Subtree> {
        let offset = self.tokens.peek_token()?.offset;
        self.enter(offset)?;
        let tree = self.climb(min_precedence)?;
        self.depth -= 1;
        Ok(tree)
    }

    fn climb(&mut self, min_precedence: u16) -> FormulaResult<Subtree> {
        let operators = self.operators;
        let mut lhs = self.unary()?;

        loop {
            let (symbol, offset) = match self.tokens.peek_token()? {
                Spanned {
                    token: Token::Operator(symbol),
                    offset,
                } => (symbol.clone(), *offset),
                _ => break,
            };

            if let Some(descriptor) = operators.resolve(&symbol, Arity::Binary) {
                if u16::from(descriptor.precedence()) < min_precedence {
                    break;
                }
                self.tokens.next_token()?;

                let rhs = self.expression(next_precedence(
                    descriptor.precedence(),
                    descriptor.associativity(),
                ))?;

                let height = lhs.height.max(rhs.height) + 1;
                let expr = Expr::Binary {
                    op: symbol,
                    left: Box::new(lhs.expr),
                    right: Box::new(rhs.expr),
                    offset,
                };
                lhs = self.node(expr, height, offset)?;
            } else if let Some(descriptor) = operators.resolve(&symbol, Arity::Ternary) {
                if u16::from(descriptor.precedence()) < min_precedence {
                    break;
                }
                self.tokens.next_token()?;
                let separator = descriptor.separator().unwrap_or_default();

                // Nothing left for the middle operand
                if matches!(
                    self.tokens.peek_token()?.token,
                    Token::End | Token::RightParen | Token::Comma
                ) {
                    return Err(FormulaError::UnmatchedTernary {
                        symbol,
                        separator: separator.to_string(),
                        offset,
                    });
                }

                let if_true = self.expression(0)?;
                match self.tokens.peek_token()? {
                    Spanned {
                        token: Token::Operator(s),
                        ..
                    } if s == separator => {}
                    _ => {
                        return Err(FormulaError::UnmatchedTernary {
                            symbol,
                            separator: separator.to_string(),
                            offset,
                        })
                    }
                }
                self.tokens.next_token()?;

                let if_false = self.expression(next_precedence(
                    descriptor.precedence(),
                    descriptor.associativity(),
                ))?;

                let height = lhs.height.max(if_true.height).max(if_false.height) + 1;
                let expr = Expr::Ternary {
                    op: symbol,
                    condition: Box::new(lhs.expr),
                    if_true: Box::new(if_true.expr),
                    if_false: Box::new(if_false.expr),
                    offset,
                };
                lhs = self.node(expr, height, offset)?;
            } else {
                // Separator or prefix-only operator: belongs to an enclosing rule
                break;
            }
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> FormulaResult<Subtree> {
        let (symbol, offset) = match self.tokens.peek_token()? {
            Spanned {
                token: Token::Operator(symbol),
                offset,
            } => (symbol.clone(), *offset),
            _ => return self.primary(),
        };

        if self.operators.resolve(&symbol, Arity::Unary).is_none() {
            return Err(unexpected(&Token::Operator(symbol), offset));
        }
        self.tokens.next_token()?;

        // Right associative: - - x is -(-(x))
        self.enter(offset)?;
        let operand = self.unary()?;
        self.depth -= 1;

        let height = operand.height + 1;
        let expr = Expr::Unary {
            op: symbol,
            operand: Box::new(operand.expr),
            offset,
        };
        self.node(expr, height, offset)
    }

    fn primary(&mut self) -> FormulaResult<Subtree> {
        let Spanned { token, offset } = self.tokens.next_token()?;

        match token {
            Token::Number(value) => Ok(Subtree::leaf(Expr::Constant(value))),

            Token::Identifier(name) => {
                // Check if it's a function call
                if matches!(self.tokens.peek_token()?.token, Token::LeftParen) {
                    self.parse_function_call(name, offset)
                } else {
                    Ok(Subtree::leaf(Expr::Variable(name)))
                }
            }

            Token::LeftParen => {
                self.open_parens.push(offset);
                let inner = self.expression(0)?;
                self.close_paren()?;
                Ok(inner)
            }

            Token::RightParen if self.open_parens.is_empty() => {
                Err(FormulaError::UnbalancedParentheses { offset })
            }

            Token::End => Err(self.unexpected_end(offset)),

            other => Err(unexpected(&other, offset)),
        }
    }

    fn parse_function_call(&mut self, name: String, offset: usize) -> FormulaResult<Subtree> {
        let operators = self.operators;
        let descriptor = operators
            .function(&name)
            .ok_or(FormulaError::UnknownFunction { name, offset })?;

        let open = self.tokens.next_token()?;
        self.open_parens.push(open.offset);

        let mut args = Vec::new();
        let mut height = 0;

        // Parse arguments
        if matches!(self.tokens.peek_token()?.token, Token::RightParen) {
            self.close_paren()?;
        } else {
            loop {
                let arg = self.expression(0)?;
                height = height.max(arg.height);
                args.push(arg.expr);

                if matches!(self.tokens.peek_token()?.token, Token::Comma) {
                    self.tokens.next_token()?;
                    continue;
                }
                self.close_paren()?;
                break;
            }
        }

        if let Some(expected) = descriptor.check_arg_count(args.len()) {
            return Err(FormulaError::ArgumentCount {
                function: descriptor.symbol().to_string(),
                expected,
                actual: args.len(),
                offset,
            });
        }

        let expr = Expr::Call {
            name: descriptor.symbol().to_string(),
            args,
            offset,
        };
        self.node(expr, height + 1, offset)
    }

    fn close_paren(&mut self) -> FormulaResult<()> {
        let Spanned { token, offset } = self.tokens.next_token()?;
        match token {
            Token::RightParen => {
                self.open_parens.pop();
                Ok(())
            }
            Token::End => Err(self.unexpected_end(offset)),
            other => Err(unexpected(&other, offset)),
        }
    }

    /// Running out of input inside parentheses blames the unmatched `(`
    fn unexpected_end(&self, offset: usize) -> FormulaError {
        match self.open_parens.last() {
            Some(&open) => FormulaError::UnbalancedParentheses { offset: open },
            None => unexpected(&Token::End, offset),
        }
    }
}

fn next_precedence(precedence: u8, associativity: Associativity) -> u16 {
    match associativity {
        Associativity::Left => u16::from(precedence) + 1,
        Associativity::Right => u16::from(precedence),
    }
}

fn unexpected(token: &Token, offset: usize) -> FormulaError {
    FormulaError::UnexpectedToken {
        found: token.to_string(),
        offset,
    }
}
