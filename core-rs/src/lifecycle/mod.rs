//! Lifecycle module for bundle state machines and driver extension points

mod driver;
mod handler;

pub use driver::BundleDriver;
pub use handler::{LifecycleHandler, LifecyclePhase, Timings};
