//! Named context registry.
//!
//! A context pairs a root range with the set of sub-blocks consumed from it.
//! The registry is a plain owned table of contexts keyed by case-insensitive
//! name; it is held by whatever CLI or service layer drives the engine and
//! is only reachable through these methods.
//!
//! The registry carries no internal locking: the engine assumes a single
//! logical owner per context. Embedders that mutate contexts from multiple
//! threads must serialize those calls themselves, e.g. behind one `Mutex`
//! per context name held for the duration of an operation or batch.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::consumed::ConsumedSet;
use crate::error::IpamError;
use crate::range::AddressRange;

/// A named root range plus its consumed sub-blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    name: String,
    set: ConsumedSet,
}

impl Context {
    /// The context name in the casing the caller supplied
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root range this context carves from
    pub fn root(&self) -> AddressRange {
        self.set.root()
    }

    /// Read access to the consumed set
    pub fn consumed(&self) -> &ConsumedSet {
        &self.set
    }

    /// Mutable access for reservation and release operations
    pub fn consumed_mut(&mut self) -> &mut ConsumedSet {
        &mut self.set
    }
}

/// Process-wide table of named contexts, case-insensitive on name
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    /// Keyed by the ASCII-lowercased name; the value keeps original casing
    contexts: BTreeMap<String, Context>,
}

fn key_for(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl ContextRegistry {
    pub fn new() -> Self {
        ContextRegistry::default()
    }

    /// Create or wholesale-replace a named context.
    ///
    /// The seed list is validated against the root as one atomic check
    /// before anything is stored; on failure any existing context under the
    /// same name is left untouched.
    pub fn set_context(
        &mut self,
        name: &str,
        root: AddressRange,
        seed: Vec<AddressRange>,
    ) -> Result<(), IpamError> {
        let set = ConsumedSet::with_ranges(root, seed)?;
        let replaced = self
            .contexts
            .insert(
                key_for(name),
                Context {
                    name: name.to_string(),
                    set,
                },
            )
            .is_some();
        if replaced {
            info!("Replaced context '{}' with root {}", name, root);
        } else {
            info!("Created context '{}' with root {}", name, root);
        }
        Ok(())
    }

    /// Look up a context by name
    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.get(&key_for(name))
    }

    /// Look up a context for mutation, failing if it does not exist
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Context, IpamError> {
        self.contexts
            .get_mut(&key_for(name))
            .ok_or_else(|| IpamError::ContextNotFound {
                name: name.to_string(),
            })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.contexts.contains_key(&key_for(name))
    }

    /// All contexts, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Move a context to a new name, dropping the old key.
    ///
    /// Root and consumed set carry over exactly. An existing context under
    /// the new name is overwritten, matching `set_context` semantics.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), IpamError> {
        let mut context =
            self.contexts
                .remove(&key_for(old))
                .ok_or_else(|| IpamError::ContextNotFound {
                    name: old.to_string(),
                })?;
        context.name = new.to_string();
        self.contexts.insert(key_for(new), context);
        info!("Renamed context '{}' to '{}'", old, new);
        Ok(())
    }

    /// Empty a context's consumed set in place, keeping root and entry
    pub fn clear(&mut self, name: &str) -> Result<(), IpamError> {
        let context = self.get_mut(name)?;
        context.set.clear();
        info!("Cleared all consumed ranges from context '{}'", name);
        Ok(())
    }

    /// Remove a context entirely. Returns the removed context, if any.
    pub fn remove(&mut self, name: &str) -> Option<Context> {
        let removed = self.contexts.remove(&key_for(name));
        if removed.is_some() {
            debug!("Removed context '{}'", name);
        }
        removed
    }
}
