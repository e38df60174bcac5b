//! Global bindings of one session (or one ephemeral execution)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::bridge::CallBridge;
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::stdlib;
use crate::executor::types::Val;

/// Name -> value mapping a script's top level reads and writes.
///
/// User bindings and built-ins are kept apart: built-ins (including the
/// `tools` bridge object) are re-injected on every execution and never
/// count as user state.
#[derive(Debug, Default)]
pub struct Namespace {
    bindings: HashMap<String, Val>,
    constants: HashSet<String>,
    builtins: HashMap<String, Val>,
    bridge: Option<Arc<CallBridge>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stdlib and the call bridge. Safe to repeat.
    pub fn inject_builtins(&mut self, bridge: Option<Arc<CallBridge>>) {
        stdlib::inject_stdlib(&mut self.builtins);
        self.bridge = bridge;
    }

    pub fn bridge(&self) -> Option<Arc<CallBridge>> {
        self.bridge.clone()
    }

    /// Resolve a name against user bindings, then built-ins
    pub fn get(&self, name: &str) -> Option<&Val> {
        self.bindings.get(name).or_else(|| self.builtins.get(name))
    }

    pub fn get_binding_mut(&mut self, name: &str) -> Option<&mut Val> {
        self.bindings.get_mut(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    /// Create or replace a binding; top-level re-declaration wins
    pub fn declare(&mut self, name: impl Into<String>, value: Val, constant: bool) {
        let name = name.into();
        if constant {
            self.constants.insert(name.clone());
        } else {
            self.constants.remove(&name);
        }
        self.bindings.insert(name, value);
    }

    /// Assign to an existing binding, or create one if the name is new
    pub fn assign(&mut self, name: &str, value: Val) -> Result<(), ErrorInfo> {
        if self.constants.contains(name) {
            return Err(ErrorInfo::new(
                errors::CONST_REASSIGNMENT,
                format!("Cannot reassign constant '{}'", name),
            ));
        }
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Number of user bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// User binding names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }
}
