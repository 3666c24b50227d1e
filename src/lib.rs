// Library interface for loadwatch modules
// The CLI in main.rs and the integration tests both build on this

pub mod acwr;
pub mod alerts;
pub mod baseline;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod readiness;
pub mod session;
pub mod variability;

// Re-export commonly used types for convenience
pub use models::*;
pub use acwr::{compute_acwr_series, AcwrCalculator, AcwrConfig, AcwrZone};
pub use alerts::{generate_alerts, Alert, AlertConfig, AlertEngine, AlertType, Severity};
pub use baseline::{compute_baseline_28d, BaselineConfig, BaselineEstimator};
pub use readiness::{compute_readiness_index, ReadinessComposer, ReadinessConfig, ReadinessWeights};
pub use session::{aggregate_daily_loads, compute_session_load, validate_session};
pub use variability::{compute_monotony_weekly, compute_strain_weekly, VariabilityCalculator};
pub use pipeline::{run_batch, AthleteInput, AthletePipeline, AthleteReport, BatchConfig, PipelineConfig};
pub use config::AppConfig;
pub use error::{LoadWatchError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
