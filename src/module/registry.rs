use std::sync::Arc;

use dashmap::DashMap;

use crate::boundary::{ModuleError, NativeModule};

use super::sample::{SampleModule, SAMPLE_MODULE_NAME};

pub type ModuleFactory = Box<dyn Fn() -> Arc<dyn NativeModule> + Send + Sync>;

/// Maps bundle names to module factories. Loading is the single
/// capability-acquisition step of a run; an unknown name is fatal to the
/// caller.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: DashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        let registry = Self::default();
        registry.register_builtin_modules();
        registry
    }

    fn register_builtin_modules(&self) {
        self.factories.insert(
            SAMPLE_MODULE_NAME.to_string(),
            Box::new(|| Arc::new(SampleModule::new())),
        );
    }

    pub fn register(&self, name: &str, factory: ModuleFactory) -> Result<(), ModuleError> {
        if self.factories.contains_key(name) {
            return Err(ModuleError::Operation {
                operation: "register",
                message: format!("module already registered: {}", name),
            });
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Obtains the named capability bundle.
    pub fn load(&self, name: &str) -> Result<Arc<dyn NativeModule>, ModuleError> {
        let factory = self.factories.get(name).ok_or(ModuleError::NotFound {
            name: name.to_string(),
        })?;
        Ok((factory.value())())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_module_is_registered() {
        let registry = ModuleRegistry::new();
        assert!(registry.contains(SAMPLE_MODULE_NAME));
    }

    #[test]
    fn test_load_builtin_module() {
        let registry = ModuleRegistry::new();
        let module = registry.load(SAMPLE_MODULE_NAME).unwrap();
        assert_eq!(module.name(), SAMPLE_MODULE_NAME);
    }

    #[test]
    fn test_unknown_module_is_fatal() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.load("no-such-bundle"),
            Err(ModuleError::NotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = ModuleRegistry::new();
        let result = registry.register(
            SAMPLE_MODULE_NAME,
            Box::new(|| Arc::new(SampleModule::new())),
        );
        assert!(matches!(result, Err(ModuleError::Operation { .. })));
    }

    #[test]
    fn test_custom_registration() {
        let registry = ModuleRegistry::new();
        registry
            .register("rejecting", Box::new(|| Arc::new(SampleModule::rejecting())))
            .unwrap();
        assert!(registry.contains("rejecting"));
        assert_eq!(registry.names().len(), 2);
    }
}
