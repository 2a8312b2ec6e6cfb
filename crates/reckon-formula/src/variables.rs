//! Variable bindings
//!
//! Every name gets a [`Slot`] the first time it is bound or referenced by a
//! compiled formula. Slots never move, so compiled evaluators keep working
//! when a variable is rebound or unbound.

use crate::error::{FormulaError, FormulaResult};
use ahash::AHashMap;
use std::fmt;

/// Source of a dynamically bound value, read on every evaluation
pub trait ValueSource: Send {
    fn current(&self) -> f64;
}

impl<F> ValueSource for F
where
    F: Fn() -> f64 + Send,
{
    fn current(&self) -> f64 {
        self()
    }
}

/// Value bound to a variable
pub enum Binding {
    /// Fixed value; a constant is a static binding
    Static(f64),
    /// Supplier invoked once per read
    Dynamic(Box<dyn ValueSource>),
}

impl Binding {
    /// Wrap a supplier
    ///
    /// # Example
    /// ```rust
    /// use reckon_formula::{Binding, Formula};
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// let calls = AtomicU64::new(0);
    /// let mut formula = Formula::new("n * 10").unwrap();
    /// formula.bind_variable("n", Binding::dynamic(move || {
    ///     calls.fetch_add(1, Ordering::SeqCst) as f64
    /// }));
    ///
    /// assert_eq!(formula.evaluate().unwrap(), 0.0);
    /// assert_eq!(formula.evaluate().unwrap(), 10.0);
    /// ```
    pub fn dynamic<S>(source: S) -> Self
    where
        S: ValueSource + 'static,
    {
        Binding::Dynamic(Box::new(source))
    }

    /// Current value
    pub fn read(&self) -> f64 {
        match self {
            Binding::Static(value) => *value,
            Binding::Dynamic(source) => source.current(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Binding::Dynamic(_))
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Binding::Static(value)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Binding::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Stable handle to a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(usize);

impl Slot {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Name to value binding table
#[derive(Debug, Default)]
pub struct Variables {
    /// Name of each slot
    names: Vec<String>,
    slots: Vec<Option<Binding>>,
    index: AHashMap<String, Slot>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value or supplier, replacing any previous binding
    pub fn bind(&mut self, name: &str, binding: impl Into<Binding>) {
        let slot = self.slot(name);
        self.slots[slot.0] = Some(binding.into());
    }

    /// Bind a supplier that is read on every evaluation
    pub fn bind_supplier<S>(&mut self, name: &str, source: S)
    where
        S: ValueSource + 'static,
    {
        self.bind(name, Binding::dynamic(source));
    }

    /// Remove a binding, keeping its slot
    pub fn unbind(&mut self, name: &str) -> Option<Binding> {
        let slot = self.lookup(name)?;
        self.slots[slot.0].take()
    }

    /// Current value of a bound variable
    pub fn value(&self, name: &str) -> FormulaResult<f64> {
        match self.lookup(name) {
            Some(slot) => self.read(slot),
            None => Err(FormulaError::UnboundVariable(name.to_string())),
        }
    }

    /// Check whether a variable is bound
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name)
            .map_or(false, |slot| self.slots[slot.0].is_some())
    }

    /// Slot for a name, reserving an empty one if needed
    pub fn slot(&mut self, name: &str) -> Slot {
        if let Some(slot) = self.lookup(name) {
            return slot;
        }

        let slot = Slot(self.slots.len());
        self.names.push(name.to_string());
        self.slots.push(None);
        self.index.insert(name.to_string(), slot);
        slot
    }

    /// Slot for a name, if it has one
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.index.get(name).copied()
    }

    /// Read a slot
    pub fn read(&self, slot: Slot) -> FormulaResult<f64> {
        match self.slots.get(slot.0) {
            Some(Some(binding)) => Ok(binding.read()),
            _ => Err(FormulaError::UnboundVariable(
                self.names.get(slot.0).cloned().unwrap_or_default(),
            )),
        }
    }

    /// Names of the bound variables, in slot order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .zip(&self.slots)
            .filter(|(_, binding)| binding.is_some())
            .map(|(name, _)| name.as_str())
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|binding| binding.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, bound or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Drop every slot without a binding
    ///
    /// Bound variables keep their relative order but may move to a new
    /// slot, so evaluators compiled against this table must be rebuilt.
    pub fn release_unbound(&mut self) {
        let names = std::mem::take(&mut self.names);
        let slots = std::mem::take(&mut self.slots);
        self.index.clear();

        for (name, binding) in names.into_iter().zip(slots) {
            if let Some(binding) = binding {
                self.index.insert(name.clone(), Slot(self.slots.len()));
                self.names.push(name);
                self.slots.push(Some(binding));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_bind_and_read() {
        let mut vars = Variables::new();
        vars.bind("a", 2.0);
        assert_eq!(vars.value("a").unwrap(), 2.0);
        assert!(vars.contains("a"));

        // Last write wins, same slot
        let slot = vars.lookup("a").unwrap();
        vars.bind("a", 5.0);
        assert_eq!(vars.lookup("a"), Some(slot));
        assert_eq!(vars.read(slot).unwrap(), 5.0);
    }

    #[test]
    fn test_unbound() {
        let mut vars = Variables::new();
        assert_eq!(
            vars.value("x"),
            Err(FormulaError::UnboundVariable("x".into()))
        );

        // Reserved slots read as unbound until bound
        let slot = vars.slot("x");
        assert!(!vars.contains("x"));
        assert_eq!(
            vars.read(slot),
            Err(FormulaError::UnboundVariable("x".into()))
        );
        vars.bind("x", 3.0);
        assert_eq!(vars.read(slot).unwrap(), 3.0);
    }

    #[test]
    fn test_unbind_keeps_slot() {
        let mut vars = Variables::new();
        vars.bind("a", 1.0);
        let slot = vars.lookup("a").unwrap();

        assert!(matches!(vars.unbind("a"), Some(Binding::Static(v)) if v == 1.0));
        assert!(vars.unbind("a").is_none());
        assert!(vars.unbind("missing").is_none());
        assert_eq!(vars.lookup("a"), Some(slot));
        assert!(vars.read(slot).is_err());
        assert!(vars.is_empty());
        assert_eq!(vars.slot_count(), 1);
    }

    #[test]
    fn test_release_unbound() {
        let mut vars = Variables::new();
        vars.slot("gone");
        vars.bind("a", 1.0);
        vars.slot("also_gone");
        vars.bind("b", 2.0);
        vars.bind("c", 3.0);
        vars.unbind("c");
        assert_eq!(vars.slot_count(), 5);

        vars.release_unbound();
        assert_eq!(vars.slot_count(), 2);
        assert_eq!(vars.lookup("a"), Some(Slot(0)));
        assert_eq!(vars.lookup("b"), Some(Slot(1)));
        assert_eq!(vars.lookup("gone"), None);
        assert_eq!(vars.lookup("c"), None);
        assert_eq!(vars.read(Slot(1)).unwrap(), 2.0);
        assert_eq!(vars.names().collect::<Vec<_>>(), vec!["a", "b"]);

        // Freed names can be reserved again
        assert_eq!(vars.slot("gone"), Slot(2));
    }

    #[test]
    fn test_supplier_read_every_time() {
        let mut vars = Variables::new();
        let counter = Cell::new(0.0);
        vars.bind_supplier("n", move || {
            counter.set(counter.get() + 1.0);
            counter.get()
        });

        assert_eq!(vars.value("n").unwrap(), 1.0);
        assert_eq!(vars.value("n").unwrap(), 2.0);
        assert_eq!(vars.value("n").unwrap(), 3.0);
    }

    #[test]
    fn test_names() {
        let mut vars = Variables::new();
        vars.bind("b", 1.0);
        vars.slot("unused");
        vars.bind("a", Binding::dynamic(|| 4.0));

        assert_eq!(vars.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(vars.len(), 2);
        assert_eq!(format!("{:?}", vars.unbind("a").unwrap()), "Dynamic(..)");
    }
}
