use super::{GeneratorFactory, GeneratorMetadata, RegistryEntry, StaticRegistration};
use crate::config::ParamValues;
use crate::core::validate_name;
use crate::error::{PipelineError, Result};
use crate::pipeline::{Generator, PipelineDefinition};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Name to factory map guarded by a single mutex.
///
/// Instances are created outside the lock and never shared by the registry.
pub struct GeneratorRegistry {
    entries: Mutex<BTreeMap<String, RegistryEntry>>,
}

impl GeneratorRegistry {
    /// An empty, isolated registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// A registry seeded from every `#[derive(RegisterGenerator)]` in the binary.
    pub fn with_static_registrations() -> Result<Self> {
        let registry = Self::new();
        for registration in inventory::iter::<StaticRegistration> {
            registry.register_entry((registration.0)())?;
        }
        Ok(registry)
    }

    /// The process-wide registry, seeded on first use.
    ///
    /// # Panics
    ///
    /// Panics if two static registrations share a name.
    pub fn global() -> &'static GeneratorRegistry {
        static GLOBAL: OnceLock<GeneratorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| match Self::with_static_registrations() {
            Ok(registry) => registry,
            Err(e) => panic!("invalid static generator registration: {}", e),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, RegistryEntry>> {
        // Every update is a single insert or remove, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register<F>(&self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Generator> + Send + Sync + 'static,
    {
        self.register_entry(RegistryEntry::new(name, factory))
    }

    pub fn register_entry(&self, entry: RegistryEntry) -> Result<()> {
        validate_name(&entry.name)?;
        let mut entries = self.lock();
        if entries.contains_key(&entry.name) {
            return Err(PipelineError::Duplicate {
                what: "generator".to_string(),
                name: entry.name,
            });
        }
        log::info!("registered generator '{}'", entry.name);
        entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<()> {
        match self.lock().remove(name) {
            Some(_) => {
                log::info!("unregistered generator '{}'", name);
                Ok(())
            }
            None => Err(PipelineError::lookup("generator", name)),
        }
    }

    fn entry(&self, name: &str) -> Result<RegistryEntry> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::lookup("generator", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Instantiates `name`, registers its schema and applies `values`.
    pub fn create(&self, name: &str, values: &ParamValues) -> Result<PipelineDefinition> {
        let entry = self.entry(name)?;
        let mut definition = PipelineDefinition::new(entry.create_instance())?.with_name(name);
        definition.set_param_values(values)?;
        log::info!("created generator '{}' with {} value(s)", name, values.len());
        Ok(definition)
    }

    /// Registered names in sorted order.
    pub fn enumerate(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn wrapper_of(&self, name: &str) -> Result<Option<String>> {
        Ok(self.entry(name)?.wrapper)
    }

    pub fn factory(&self, name: &str) -> Result<GeneratorFactory> {
        Ok(self.entry(name)?.factory)
    }

    /// Declared parameters and ports of `name` at their default configuration.
    pub fn metadata(&self, name: &str) -> Result<GeneratorMetadata> {
        let entry = self.entry(name)?;
        let definition = PipelineDefinition::new(entry.create_instance())?.with_name(name);
        Ok(GeneratorMetadata::from_definition(name, entry.wrapper, &definition))
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("names", &self.enumerate())
            .finish()
    }
}
