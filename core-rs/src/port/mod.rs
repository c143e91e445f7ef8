/**
 * port module
 * Shared port reservation with blocked ranges for concurrent test runs
 */

pub mod probe;
pub mod registry;

pub use probe::{is_port_free, OsPortProbe, PortProbe};
pub use registry::{BlockedRange, PortRegistry, DEFAULT_RESERVE_ATTEMPTS};
