//! Operator registry
//!
//! Every operator the lexer and parser know about, including functions, is an
//! [`OperatorDescriptor`] stored under its `(symbol, arity)` key. The same
//! symbol may be registered once per arity, which is how `-` is both negation
//! and subtraction.
//!
//! Word symbols (`AND`, `NOT`, function names) are case-insensitive and kept
//! upper case. Punctuation symbols are matched exactly, longest first.

pub mod builtin;

use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Process-wide registry holding only the built-ins
static GLOBAL_REGISTRY: Lazy<Arc<OperatorRegistry>> = Lazy::new(|| Arc::new(OperatorRegistry::new()));

/// Number of operands an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arity {
    Unary,
    Binary,
    Ternary,
    /// Function call with a variable argument count
    NAry,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arity::Unary => "unary",
            Arity::Binary => "binary",
            Arity::Ternary => "ternary",
            Arity::NAry => "function",
        };
        f.write_str(name)
    }
}

/// Grouping of operators with equal precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Lazily evaluated operand handed to ternary operators
pub type Operand<'a> = &'a dyn Fn() -> FormulaResult<f64>;

pub type UnaryFn = Arc<dyn Fn(f64) -> FormulaResult<f64> + Send + Sync>;
pub type BinaryFn = Arc<dyn Fn(f64, f64) -> FormulaResult<f64> + Send + Sync>;
/// The first operand is evaluated up front, the other two only when called.
pub type TernaryFn =
    Arc<dyn for<'a, 'b> Fn(f64, Operand<'a>, Operand<'b>) -> FormulaResult<f64> + Send + Sync>;
pub type NAryFn = Arc<dyn Fn(&[f64]) -> FormulaResult<f64> + Send + Sync>;

/// Arity-specific implementation of an operator
#[derive(Clone)]
pub enum OperatorFn {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Ternary {
        separator: String,
        apply: TernaryFn,
    },
    NAry {
        min_args: usize,
        max_args: Option<usize>,
        apply: NAryFn,
    },
}

impl OperatorFn {
    pub fn arity(&self) -> Arity {
        match self {
            OperatorFn::Unary(_) => Arity::Unary,
            OperatorFn::Binary(_) => Arity::Binary,
            OperatorFn::Ternary { .. } => Arity::Ternary,
            OperatorFn::NAry { .. } => Arity::NAry,
        }
    }
}

impl fmt::Debug for OperatorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorFn::Unary(_) => f.write_str("Unary(..)"),
            OperatorFn::Binary(_) => f.write_str("Binary(..)"),
            OperatorFn::Ternary { separator, .. } => f
                .debug_struct("Ternary")
                .field("separator", separator)
                .finish_non_exhaustive(),
            OperatorFn::NAry {
                min_args, max_args, ..
            } => f
                .debug_struct("NAry")
                .field("min_args", min_args)
                .field("max_args", max_args)
                .finish_non_exhaustive(),
        }
    }
}

/// Operator definition
///
/// # Example
/// ```rust
/// use reckon_formula::{Formula, OperatorDescriptor, OperatorRegistry};
/// use std::sync::Arc;
///
/// let mut operators = OperatorRegistry::new();
/// operators
///     .register(OperatorDescriptor::ternary("@", "#", 1, |x, lo, hi| {
///         Ok(x.max(lo()?).min(hi()?))
///     }))
///     .unwrap();
///
/// let mut formula = Formula::parse("15 @ 0 # 10", Arc::new(operators)).unwrap();
/// assert_eq!(formula.evaluate().unwrap(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct OperatorDescriptor {
    symbol: String,
    precedence: u8,
    associativity: Associativity,
    volatile: bool,
    apply: OperatorFn,
}

impl OperatorDescriptor {
    /// Prefix operator
    pub fn unary<F>(symbol: &str, precedence: u8, apply: F) -> Self
    where
        F: Fn(f64) -> FormulaResult<f64> + Send + Sync + 'static,
    {
        Self::from_fn(
            symbol,
            precedence,
            Associativity::Right,
            OperatorFn::Unary(Arc::new(apply)),
        )
    }

    /// Infix operator
    pub fn binary<F>(symbol: &str, precedence: u8, associativity: Associativity, apply: F) -> Self
    where
        F: Fn(f64, f64) -> FormulaResult<f64> + Send + Sync + 'static,
    {
        Self::from_fn(
            symbol,
            precedence,
            associativity,
            OperatorFn::Binary(Arc::new(apply)),
        )
    }

    /// Two-symbol operator written `a <symbol> b <separator> c`, right-associative
    pub fn ternary<F>(symbol: &str, separator: &str, precedence: u8, apply: F) -> Self
    where
        F: for<'a, 'b> Fn(f64, Operand<'a>, Operand<'b>) -> FormulaResult<f64>
            + Send
            + Sync
            + 'static,
    {
        Self::from_fn(
            symbol,
            precedence,
            Associativity::Right,
            OperatorFn::Ternary {
                separator: normalize_symbol(separator),
                apply: Arc::new(apply),
            },
        )
    }

    /// Function called as `name(arg, ...)`
    pub fn function<F>(name: &str, min_args: usize, max_args: Option<usize>, apply: F) -> Self
    where
        F: Fn(&[f64]) -> FormulaResult<f64> + Send + Sync + 'static,
    {
        Self::from_fn(
            name,
            u8::MAX,
            Associativity::Left,
            OperatorFn::NAry {
                min_args,
                max_args,
                apply: Arc::new(apply),
            },
        )
    }

    /// Build a descriptor from an already-wrapped implementation
    pub fn from_fn(
        symbol: &str,
        precedence: u8,
        associativity: Associativity,
        apply: OperatorFn,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            precedence,
            associativity,
            volatile: false,
            apply,
        }
    }

    /// Mark the operator as volatile: it is never constant-folded
    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn arity(&self) -> Arity {
        self.apply.arity()
    }

    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    /// Closing symbol of a ternary operator
    pub fn separator(&self) -> Option<&str> {
        match &self.apply {
            OperatorFn::Ternary { separator, .. } => Some(separator),
            _ => None,
        }
    }

    /// Accepted argument counts of a function
    pub fn arg_bounds(&self) -> Option<(usize, Option<usize>)> {
        match &self.apply {
            OperatorFn::NAry {
                min_args, max_args, ..
            } => Some((*min_args, *max_args)),
            _ => None,
        }
    }

    /// Describe the accepted argument counts when `count` is outside them
    pub(crate) fn check_arg_count(&self, count: usize) -> Option<String> {
        let (min, max) = self.arg_bounds()?;
        if count < min {
            return Some(match max {
                Some(max) if max == min => format!("exactly {}", min),
                _ => format!("at least {}", min),
            });
        }
        match max {
            Some(max) if count > max && max == min => Some(format!("exactly {}", max)),
            Some(max) if count > max => Some(format!("at most {}", max)),
            _ => None,
        }
    }

    pub fn operator_fn(&self) -> &OperatorFn {
        &self.apply
    }
}

/// Operator registry
///
/// Cloning is cheap enough to derive a customized registry from the
/// built-ins; implementations are shared behind `Arc`.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: AHashMap<(String, Arity), OperatorDescriptor>,
    /// Word symbols the lexer turns into operator tokens
    words: AHashSet<String>,
    /// Punctuation symbols, including ternary separators
    punctuation: AHashSet<String>,
    longest_punctuation: usize,
}

impl OperatorRegistry {
    /// Create a registry with the built-in operators and functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin::operators()
            .into_iter()
            .chain(functions::builtin_functions())
        {
            registry.insert(descriptor);
        }
        registry.rebuild_symbols();
        registry
    }

    /// Create a registry without any operators
    pub fn empty() -> Self {
        Self {
            operators: AHashMap::new(),
            words: AHashSet::new(),
            punctuation: AHashSet::new(),
            longest_punctuation: 0,
        }
    }

    /// Shared registry holding only the built-ins
    pub fn global() -> Arc<OperatorRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register an operator
    ///
    /// Fails if the symbol is already registered with the same arity; a
    /// built-in is never silently shadowed.
    pub fn register(&mut self, descriptor: OperatorDescriptor) -> FormulaResult<()> {
        validate(&descriptor)?;

        let key = (descriptor.symbol.clone(), descriptor.arity());
        if self.operators.contains_key(&key) {
            return Err(FormulaError::DuplicateOperator {
                symbol: key.0,
                arity: key.1,
            });
        }

        log::trace!("registering {} operator '{}'", key.1, key.0);
        self.insert(descriptor);
        self.rebuild_symbols();
        Ok(())
    }

    /// Remove an operator, returning its descriptor
    pub fn unregister(&mut self, symbol: &str, arity: Arity) -> Option<OperatorDescriptor> {
        let removed = self.operators.remove(&(normalize_symbol(symbol), arity));
        if removed.is_some() {
            self.rebuild_symbols();
        }
        removed
    }

    /// Look up an operator by symbol and arity
    pub fn resolve(&self, symbol: &str, arity: Arity) -> Option<&OperatorDescriptor> {
        self.operators.get(&(normalize_symbol(symbol), arity))
    }

    /// Look up a function by name
    pub fn function(&self, name: &str) -> Option<&OperatorDescriptor> {
        self.resolve(name, Arity::NAry)
    }

    /// Check whether a word is lexed as an operator rather than an identifier
    pub fn is_word_operator(&self, word: &str) -> bool {
        self.words.contains(&normalize_symbol(word))
    }

    /// Longest punctuation symbol at the start of `rest`
    pub fn match_punctuation<'s>(&self, rest: &'s str) -> Option<&'s str> {
        let longest = self.longest_punctuation.min(rest.len());
        (1..=longest)
            .rev()
            .filter(|&len| rest.is_char_boundary(len))
            .map(|len| &rest[..len])
            .find(|candidate| self.punctuation.contains(*candidate))
    }

    /// Iterate over all registered operators
    pub fn iter(&self) -> impl Iterator<Item = &OperatorDescriptor> {
        self.operators.values()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    fn insert(&mut self, descriptor: OperatorDescriptor) {
        let key = (descriptor.symbol.clone(), descriptor.arity());
        self.operators.insert(key, descriptor);
    }

    fn rebuild_symbols(&mut self) {
        self.words.clear();
        self.punctuation.clear();

        for descriptor in self.operators.values() {
            if descriptor.arity() == Arity::NAry {
                continue;
            }
            let symbols = std::iter::once(descriptor.symbol()).chain(descriptor.separator());
            for symbol in symbols {
                if is_word(symbol) {
                    self.words.insert(symbol.to_string());
                } else {
                    self.punctuation.insert(symbol.to_string());
                }
            }
        }

        self.longest_punctuation = self.punctuation.iter().map(String::len).max().unwrap_or(0);
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.operators.keys().collect();
        keys.sort();
        f.debug_struct("OperatorRegistry")
            .field("operators", &keys)
            .finish()
    }
}

/// Upper-case word symbols, keep punctuation as written
pub(crate) fn normalize_symbol(symbol: &str) -> String {
    if is_word(symbol) {
        symbol.to_ascii_uppercase()
    } else {
        symbol.to_string()
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_word(symbol: &str) -> bool {
    let mut chars = symbol.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_punctuation(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.chars().all(|c| {
            !c.is_whitespace() && !c.is_alphanumeric() && !matches!(c, '_' | '.' | '(' | ')' | ',')
        })
}

fn validate(descriptor: &OperatorDescriptor) -> FormulaResult<()> {
    let symbol = descriptor.symbol();
    let valid = match descriptor.arity() {
        Arity::NAry => is_word(symbol),
        _ => is_word(symbol) || is_punctuation(symbol),
    };
    if !valid {
        return Err(FormulaError::InvalidOperator(symbol.to_string()));
    }

    if let Some(separator) = descriptor.separator() {
        if separator == symbol || !(is_word(separator) || is_punctuation(separator)) {
            return Err(FormulaError::InvalidOperator(separator.to_string()));
        }
    }

    Ok(())
}
