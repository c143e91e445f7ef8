//! # Bundle Core - Test Process Harness Runtime
//!
//! Coordinates the controlled lifecycle of external test processes
//! ("bundles": application servers, service containers) and arbitrates
//! shared network ports across concurrently executing test runs.
//!
//! ## Core Principle
//!
//! **One lock per concern**: each bundle instance owns the lock around its
//! four lifecycle primitives, and the process-wide port registry owns the
//! single critical section around reservation decisions. Nothing else is
//! shared.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              test run threads            │
//! └──────────────────────────────────────────┘
//!       │ start/stop            │ reserve/cancel
//!       ▼                       ▼
//! ┌───────────────────┐   ┌───────────────────┐
//! │ LifecycleHandler  │──▶│   PortRegistry    │
//! │ (one per bundle)  │   │  (process-wide)   │
//! └───────────────────┘   └───────────────────┘
//!       │ registers
//!       ▼
//! ┌───────────────────┐
//! │  RunningRegistry  │
//! │  (process-wide)   │
//! └───────────────────┘
//! ```

pub mod bundle;
pub mod errors;
pub mod lifecycle;
pub mod port;
pub mod process;
pub mod resolver;

pub use bundle::{BundleConfig, BundleInstance, BundleSpec, PhaseCommands, RunningRegistry, ScriptBundle};
pub use errors::HarnessError;
pub use lifecycle::{BundleDriver, LifecycleHandler, LifecyclePhase, Timings};
pub use port::{is_port_free, BlockedRange, OsPortProbe, PortProbe, PortRegistry, DEFAULT_RESERVE_ATTEMPTS};
pub use process::{CommandSpec, ProcessLauncher, ShellLauncher};
pub use resolver::{BundleResolver, DirectoryResolver};

/// Version of the harness descriptor format accepted by this runtime
pub const API_VERSION: &str = "harness/v1";

/// Environment variable a bundle's reserved port is exported through by default
pub const DEFAULT_PORT_ENV: &str = "BUNDLE_PORT";
