// Define engine modules
pub mod diagnostics;      // Append-only per-check detail trails
pub mod error;            // Construction-time errors
pub mod fixes;            // Minimal corrective suggestions
pub mod logic;            // Time / weekday / frequency matching primitives
pub mod models;           // Value types (specification, pattern, events, results)
pub mod readiness;        // Creation-flow readiness gate
pub mod routes_validate;  // HTTP handlers wrapping the validators
pub mod settings;         // Settings loading (data/settings.json)
pub mod validate_events;  // Dated calendar-event validation
pub mod validate_pattern; // Weekly pattern validation
pub mod weeks;            // Date range -> 7-day windows

pub use error::ScheduleError;
pub use readiness::{evaluate_readiness, ReadinessContext, ReadinessReport};
pub use validate_events::{validate_events, validate_events_with};
pub use validate_pattern::{validate_pattern, validate_pattern_with};
pub use weeks::partition;
