//! Driver registry for controller backends.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories. This uses constructor-injection rather than global state, so
//! multiple independent controller sessions and deterministic teardown stay
//! possible.

use lstep_common::config::ControllerConfig;
use lstep_common::driver::{ControllerDriver, DriverError, DriverFactory};
use std::collections::HashMap;

use crate::drivers::native::NativeDriver;
use crate::drivers::simulation::SimulationDriver;

/// Registry of available controller drivers.
///
/// Constructed at startup, populated via `register()`, and handed to
/// whoever selects the backend by name. No global state — testable in
/// isolation.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in drivers ("native",
    /// "simulation") registered.
    pub fn with_default_drivers() -> Self {
        let mut registry = Self::new();
        registry.register("native", NativeDriver::factory);
        registry.register("simulation", SimulationDriver::factory);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `DriverError::DriverNotFound` if no driver with the given
    /// name is registered; construction errors (library load, symbol
    /// resolution) pass through from the factory.
    pub fn create_driver(
        &self,
        name: &str,
        config: &ControllerConfig,
    ) -> Result<Box<dyn ControllerDriver>, DriverError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DriverError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_creates_simulation_driver() {
        let registry = DriverRegistry::with_default_drivers();
        let config = ControllerConfig::default();
        let driver = registry
            .create_driver("simulation", &config)
            .expect("should create");
        assert_eq!(driver.name(), "simulation");
    }

    #[test]
    fn registry_lists_default_drivers() {
        let registry = DriverRegistry::with_default_drivers();
        let mut names = registry.list_drivers();
        names.sort();
        assert_eq!(names, vec!["native", "simulation"]);
    }

    #[test]
    fn registry_driver_not_found() {
        let registry = DriverRegistry::with_default_drivers();
        let config = ControllerConfig::default();
        let result = registry.create_driver("ethercat", &config);
        assert!(matches!(result, Err(DriverError::DriverNotFound(_))));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut registry = DriverRegistry::with_default_drivers();
        registry.register("simulation", SimulationDriver::factory);
    }
}
