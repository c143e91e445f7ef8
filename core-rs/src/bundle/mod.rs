//! Bundle module for instance identity, registries, and script bundles

mod config;
mod instance;
mod registry;
mod script;

pub use config::{BundleConfig, BundleSpec, Metadata, PhaseCommands};
pub use instance::BundleInstance;
pub use registry::RunningRegistry;
pub use script::ScriptBundle;
