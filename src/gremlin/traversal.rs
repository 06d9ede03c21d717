//! Parameter-bound Gremlin traversal construction.
//!
//! Every label, key and value is sent as a binding (`p0`, `p1`, ...), so
//! user-supplied text never becomes part of the script. An escaped inline
//! rendering is kept alongside for logging.

use serde_json::{Map, Value};

/// A traversal script plus its bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    script: String,
    inline: String,
    bindings: Map<String, Value>,
}

impl Traversal {
    fn root() -> Self {
        Self {
            script: "g".to_string(),
            inline: "g".to_string(),
            bindings: Map::new(),
        }
    }

    /// `g.V()`
    pub fn vertices() -> Self {
        Self::root().step("V", &[])
    }

    /// `g.V(id)`
    pub fn vertex(id: &str) -> Self {
        Self::root().step("V", &[id])
    }

    /// `g.addV(label)`
    pub fn add_vertex(label: &str) -> Self {
        Self::root().step("addV", &[label])
    }

    pub fn has_label(self, label: &str) -> Self {
        self.step("hasLabel", &[label])
    }

    pub fn has(self, key: &str, value: &str) -> Self {
        self.step("has", &[key, value])
    }

    pub fn property(self, key: &str, value: &str) -> Self {
        self.step("property", &[key, value])
    }

    pub fn out(self, edge_label: &str) -> Self {
        self.step("out", &[edge_label])
    }

    pub fn in_(self, edge_label: &str) -> Self {
        self.step("in", &[edge_label])
    }

    pub fn both(self, edge_label: &str) -> Self {
        self.step("both", &[edge_label])
    }

    /// `.addE(label)`
    pub fn add_edge(self, label: &str) -> Self {
        self.step("addE", &[label])
    }

    /// `.to(g.V(id))`
    pub fn to_vertex(mut self, id: &str) -> Self {
        let name = self.bind(id);
        self.script.push_str(&format!(".to(g.V({}))", name));
        self.inline.push_str(&format!(".to(g.V({}))", quote(id)));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.script.push_str(&format!(".limit({})", n));
        self.inline.push_str(&format!(".limit({})", n));
        self
    }

    pub fn count(self) -> Self {
        self.step("count", &[])
    }

    /// Append `.name(arg, ...)`, binding every argument.
    fn step(mut self, name: &str, args: &[&str]) -> Self {
        let mut bound = Vec::with_capacity(args.len());
        let mut quoted = Vec::with_capacity(args.len());
        for arg in args {
            bound.push(self.bind(arg));
            quoted.push(quote(arg));
        }
        self.script.push_str(&format!(".{}({})", name, bound.join(", ")));
        self.inline.push_str(&format!(".{}({})", name, quoted.join(", ")));
        self
    }

    fn bind(&mut self, value: &str) -> String {
        let name = format!("p{}", self.bindings.len());
        self.bindings
            .insert(name.clone(), Value::String(value.to_string()));
        name
    }

    /// Script text referencing bindings.
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    /// The same traversal with values inlined as escaped string literals.
    pub fn to_inline_script(&self) -> &str {
        &self.inline
    }
}

#[cfg(test)]
impl Traversal {
    /// Value bound for `name`, if any.
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).and_then(Value::as_str)
    }

    /// True when any binding carries exactly `value`.
    pub fn binds_value(&self, value: &str) -> bool {
        self.bindings.values().any(|v| v.as_str() == Some(value))
    }
}

/// Escape a value for use inside a single-quoted Gremlin string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quote(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}
