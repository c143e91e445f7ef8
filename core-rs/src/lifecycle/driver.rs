//! Bundle driver trait
//!
//! Defines the extension points every bundle type must supply. The
//! lifecycle handler sequences these primitives; it does not implement
//! process launching, archive extraction, or URL composition itself.

use crate::errors::Result;

/// Primitive lifecycle operations of a bundle implementation
///
/// The handler guarantees mutual exclusion, failure capture, and timing
/// around these calls. The primitives themselves must be safe to re-run:
/// `do_start` on an already-running process should be a no-op or a
/// restart, and `do_clean` on a pristine target must succeed.
///
/// # Example Implementation
///
/// ```rust,ignore
/// pub struct JettyBundle { ... }
///
/// impl BundleDriver for JettyBundle {
///     fn do_prepare(&mut self) -> Result<()> {
///         // Materialize the working directory from the resolved archive
///     }
///
///     // ... other primitives
/// }
/// ```
pub trait BundleDriver: Send {
    /// Bring the working directory to a runnable state
    fn do_prepare(&mut self) -> Result<()>;

    /// Restore the pristine target state
    fn do_clean(&mut self) -> Result<()>;

    /// Launch the external process
    fn do_start(&mut self) -> Result<()>;

    /// Shut the external process down
    fn do_stop(&mut self) -> Result<()>;

    /// Whether the external process is currently alive
    fn is_running(&self) -> bool;
}
