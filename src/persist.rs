//! Persisted context documents.
//!
//! A context's durable form is a small JSON document:
//!
//! ```json
//! {
//!   "Name": "prod-east",
//!   "RootIPAddressRange": "10.0.0.0/8",
//!   "ConsumedRanges": ["10.0.0.0/24", "10.1.0.0/16"]
//! }
//! ```
//!
//! Loading a document routes through `ContextRegistry::set_context`, so it is
//! equivalent to replaying each consumed range in listed order against an
//! empty context of that root: the load path reuses the same validation as
//! live reservation. The registry snapshot file is a JSON array of these
//! documents.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::IpamError;
use crate::range::AddressRange;
use crate::registry::{Context, ContextRegistry};

/// Durable form of one context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RootIPAddressRange")]
    pub root: String,
    #[serde(rename = "ConsumedRanges")]
    pub consumed_ranges: Vec<String>,
}

impl ContextDocument {
    /// Snapshot a live context into its persisted form
    pub fn from_context(context: &Context) -> Self {
        ContextDocument {
            name: context.name().to_string(),
            root: context.root().to_string(),
            consumed_ranges: context
                .consumed()
                .ranges()
                .iter()
                .map(|range| range.to_string())
                .collect(),
        }
    }

    /// Install this document into the registry.
    ///
    /// Parses the root and every consumed range, then goes through
    /// `set_context` so the whole list is validated atomically.
    pub fn apply(&self, registry: &mut ContextRegistry) -> Result<(), IpamError> {
        let root: AddressRange = self.root.parse()?;
        let consumed = self
            .consumed_ranges
            .iter()
            .map(|text| text.parse())
            .collect::<Result<Vec<AddressRange>, IpamError>>()?;
        registry.set_context(&self.name, root, consumed)
    }
}

/// Load a registry snapshot from a JSON state file
pub fn load_registry(path: &Path) -> Result<ContextRegistry> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open state file '{}'", path.display()))?;
    let documents: Vec<ContextDocument> = serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("Failed to parse state file '{}'", path.display()))?;

    let mut registry = ContextRegistry::new();
    for document in &documents {
        document
            .apply(&mut registry)
            .wrap_err_with(|| format!("Invalid persisted context '{}'", document.name))?;
    }
    info!(
        "Loaded {} context(s) from '{}'",
        registry.len(),
        path.display()
    );
    Ok(registry)
}

/// Write the registry snapshot back out as a JSON state file
pub fn save_registry(path: &Path, registry: &ContextRegistry) -> Result<()> {
    let documents: Vec<ContextDocument> = registry
        .iter()
        .map(ContextDocument::from_context)
        .collect();
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create state file '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, &documents)
        .wrap_err_with(|| format!("Failed to write state file '{}'", path.display()))?;
    info!(
        "Saved {} context(s) to '{}'",
        documents.len(),
        path.display()
    );
    Ok(())
}
