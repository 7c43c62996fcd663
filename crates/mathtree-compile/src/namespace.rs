use mathtree_value::{EvalError, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Native implementation of a namespace entry.
pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => f.write_str("any number of"),
        }
    }
}

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub arity: Arity,
    func: BuiltinFn,
}

impl Builtin {
    pub fn new<F>(name: impl Into<String>, arity: Arity, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Builtin {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    /// Calls the native implementation. Argument counts outside the declared
    /// arity are rejected before the implementation runs.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        if !self.arity.accepts(args.len()) {
            return Err(EvalError::Argument(format!(
                "Function {} expects {} argument(s), got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Named functions available to compiled trees. Lookups are exact-name and
/// happen once, at compile time.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: HashMap<String, Builtin>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry, returning the previous one.
    pub fn insert(&mut self, builtin: Builtin) -> Option<Builtin> {
        self.entries.insert(builtin.name.clone(), builtin)
    }

    pub fn register<F>(&mut self, name: &str, arity: Arity, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(Builtin::new(name, arity, func));
        self
    }

    /// Registers `alias` as another name for an existing entry.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        match self.entries.get(target).cloned() {
            Some(mut builtin) => {
                builtin.name = alias.to_string();
                self.insert(builtin);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Builtin> {
        self.entries.remove(name)
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `other` into this namespace; entries of `other` win.
    pub fn extend(&mut self, other: Namespace) {
        self.entries.extend(other.entries);
    }
}
