use mathtree_value::{Value, MAX_ELEMENTS};
use std::collections::HashMap;

/// Default limit on nested user-function calls.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default limit on the elements a range may produce or an update may grow a
/// matrix to. Also the ceiling for [`Scope::set_max_elements`].
pub const DEFAULT_MAX_ELEMENTS: usize = MAX_ELEMENTS;

/// Variable bindings passed to every evaluation.
///
/// A scope persists only as long as the caller keeps reusing it; compiled
/// expressions never hold on to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    vars: HashMap<String, Value>,
    depth: usize,
    max_depth: usize,
    max_elements: usize,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            vars: HashMap::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Scope {
            max_depth,
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Current user-function call depth (0 at top level).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn max_elements(&self) -> usize {
        self.max_elements
    }

    /// Limits ranges and matrix growth through updates. Values above
    /// [`DEFAULT_MAX_ELEMENTS`] are clamped to it.
    pub fn set_max_elements(&mut self, max_elements: usize) {
        self.max_elements = max_elements.min(DEFAULT_MAX_ELEMENTS);
    }

    /// Copy of this scope used as the body scope of a call at `depth`.
    pub(crate) fn frame(&self, depth: usize) -> Scope {
        Scope {
            vars: self.vars.clone(),
            depth,
            max_depth: self.max_depth,
            max_elements: self.max_elements,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for (name, value) in iter {
            scope.set(name, value);
        }
        scope
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Scope {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}
