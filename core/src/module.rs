//! The currently selected module and its option registry.

use std::collections::BTreeMap;

use redops_backends::msf::ModuleDescriptor;
use redops_common::module::ModuleKind;

/// A module picked by a `use` operation, together with the operator's
/// option overrides.
///
/// The declared option set is captured from the backend at selection
/// time; overrides are merged client-side and shipped wholesale when the
/// module is executed. Reads and writes are both partial: option names
/// the module never declared are dropped, never rejected as a batch.
#[derive(Debug, Clone)]
pub struct SelectedModule {
    descriptor: ModuleDescriptor,
    overrides: BTreeMap<String, String>,
}

impl SelectedModule {
    pub fn new(descriptor: ModuleDescriptor) -> Self {
        Self {
            descriptor,
            overrides: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        self.descriptor.kind
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Current option values. An empty `names` slice selects every
    /// declared option; otherwise only the requested names that the
    /// module actually declares are returned.
    pub fn options(&self, names: &[String]) -> BTreeMap<String, String> {
        self.descriptor
            .options
            .iter()
            .filter(|(name, _)| names.is_empty() || names.iter().any(|wanted| wanted == *name))
            .map(|(name, declared)| {
                let value = self.overrides.get(name).unwrap_or(declared);
                (name.clone(), value.clone())
            })
            .collect()
    }

    /// Best-effort merge: each key is applied only if the module declares
    /// it. Unknown keys are ignored without failing the batch.
    pub fn set_options(&mut self, updates: &BTreeMap<String, String>) {
        for (name, value) in updates {
            if self.descriptor.options.contains_key(name) {
                self.overrides.insert(name.clone(), value.clone());
            }
        }
    }

    /// The override map shipped to the backend on execution.
    pub fn overrides(&self) -> &BTreeMap<String, String> {
        &self.overrides
    }
}
