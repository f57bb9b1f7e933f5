//! Adaptive Metabolism - On-device TDEE estimation and weekly nutrition coaching
//!
//! The engine turns noisy self-reported weigh-ins and food logs into an
//! estimate of true daily energy expenditure through a deterministic pipeline:
//! series smoothing → energy-balance estimation → confidence and flexibility
//! scoring → rule-based weekly coaching.
//!
//! The only long-lived state is the rolling [`MetabolicEstimate`], which callers
//! persist and pass back on the next cycle.

pub mod coaching;
pub mod config;
pub mod energy_balance;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod scorer;
pub mod smoother;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::EngineError;
pub use pipeline::{coach, coach_with_config, estimate, estimate_at, MetabolicEngine};
pub use request::EstimationRequest;
pub use types::{
    BiologicalSex, Goal, IntakeSample, MetabolicEstimate, QualityFlag, Recommendation,
    UserProfile, WeeklyCoaching, WeightSample,
};

/// Engine version embedded in CLI and diagnostic output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "adaptive-metabolism";
