/*!
# Galaxy 3D Validation

Buffer validation layer for the Galaxy 3D graphics device API.

Every call made through [`galaxy3d::ValidationLayer`] is checked against a
catalog of usage rules before it reaches the device. Violations are
reported per call with their stable rule identifier; the call is then
applied to the layer's tracked state and forwarded, unless the layer is
configured to abort on violation.

## Architecture

- **ObjectRegistry**: live objects behind generational handles
- **CommandBufferState**: recording state of each command buffer
- **RuleCatalog**: declarative rules keyed by call shape
- **Interceptor**: resolves handles and evaluates the catalog for one call
- **DiagnosticReporter**: per-call reports, log output and statistics
- **Device**: the forwarded implementation (`NullDevice` simulates one)
*/

// Internal modules
mod config;
mod device;
mod dispatch;
mod error;
mod registry;
mod report;
mod rules;
mod state;
pub mod log;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Layer entry point and configuration
    pub use crate::config::LayerConfig;
    pub use crate::dispatch::{Call, CallShape, CommandIds, Interceptor, Phase, ValidationLayer};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Device-facing argument types, capabilities and forwarding
    pub mod device {
        pub use crate::device::*;
        pub use crate::device::null_device::DEFAULT_MAX_ALLOCATION_SIZE;
    }

    // Handles and tracked state
    pub mod registry {
        pub use crate::registry::*;
        pub use crate::state::{BindingState, CommandBufferState, RecordingState};
    }

    // Rule model and catalog
    pub mod rules {
        pub use crate::rules::*;
    }

    // Violations and reports
    pub mod report {
        pub use crate::report::*;
    }
}
