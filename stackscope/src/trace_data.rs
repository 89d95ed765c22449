//! Stack data shared between stack providers and the call-tree model
//!
//! Providers produce [`ThreadStack`]s; the sampler merges them into
//! [`crate::tree::ThreadForest`].

use std::fmt;

/// One captured stack frame, identified by its declaring namespace and
/// method name only (no signature, no line).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub namespace: String,
    pub name: String,
}

impl StackFrame {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    /// Split a qualified frame token into namespace and name.
    ///
    /// The split happens at the last `::`, otherwise at the last `.`
    /// (`com.app.Main.run` → `com.app.Main` / `run`). A token with neither
    /// separator has an empty namespace, and so does a token with a leading
    /// `::` (`::a.b` → empty namespace / `a.b`).
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if let Some(pos) = token.rfind("::") {
            return Self::new(&token[..pos], &token[pos + 2..]);
        }
        if let Some(pos) = token.rfind('.') {
            return Self::new(&token[..pos], &token[pos + 1..]);
        }
        Self::new("", token)
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.namespace, self.name)
        }
    }
}

/// The call stack of one live thread at the moment of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadStack {
    /// Thread name, the key of the thread's call tree.
    pub name: String,
    /// Frames innermost first: index 0 is the top of the stack, the last
    /// element is the thread's entry point.
    pub frames: Vec<StackFrame>,
}

impl ThreadStack {
    pub fn new(name: impl Into<String>, frames: Vec<StackFrame>) -> Self {
        Self { name: name.into(), frames }
    }
}
