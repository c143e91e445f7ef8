//! Bundle instance identity
//!
//! Pairs a named, typed bundle with its lifecycle handler. The instance
//! id is the identity the running-instance registry deduplicates on.

use uuid::Uuid;

use crate::errors::Result;
use crate::lifecycle::{BundleDriver, LifecycleHandler, LifecyclePhase, Timings};

/// One controlled bundle: identity plus lifecycle state machine
///
/// Typically wrapped in an `Arc` and shared between the test code driving
/// the lifecycle and the running-instance registry.
pub struct BundleInstance {
    id: Uuid,
    name: String,
    kind: String,
    handler: LifecycleHandler,
}

impl BundleInstance {
    /// Create an instance around a bundle driver
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name (e.g., "jetty-main")
    /// * `kind` - Capability kind used for registry filtering (e.g., "jetty")
    /// * `driver` - The bundle implementation's primitive operations
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        driver: Box<dyn BundleDriver>,
    ) -> Self {
        BundleInstance {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: kind.into(),
            handler: LifecycleHandler::new(driver),
        }
    }

    /// Unique instance id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Instance name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The instance's lifecycle handler
    pub fn handler(&self) -> &LifecycleHandler {
        &self.handler
    }

    /// Clean, then prepare the bundle
    pub fn prepare(&self) -> Result<()> {
        self.handler.prepare()
    }

    /// Restore the pristine target state
    pub fn cleanup(&self) -> Result<()> {
        self.handler.cleanup()
    }

    /// Prepare, then start the bundle
    pub fn start(&self) -> Result<()> {
        self.handler.start()
    }

    /// Stop the bundle
    pub fn stop(&self) -> Result<()> {
        self.handler.stop()
    }

    /// Current observable phase
    pub fn phase(&self) -> LifecyclePhase {
        self.handler.phase()
    }

    /// Timing snapshot for the most recent transition of each kind
    pub fn timings(&self) -> Timings {
        self.handler.timings()
    }

    /// Whether the underlying process reports itself alive
    pub fn is_running(&self) -> bool {
        self.handler.is_running()
    }
}
