//! Browser Matrix - run browser tasks across a remote device grid.
//!
//! This crate provides:
//! - Capability adaptation from a vendor browser inventory
//! - A WebDriver client for remote sessions, plus a mock for dry runs
//! - A bounded, paced work queue with per-task timeouts
//! - Result aggregation into a JSON report
//! - Report flattening into a CSV table
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use browser_matrix::{
//!     MockDriverFactory, PlatformMatrix, RunPlan, StaticInventory, TaskRegistry, config, run_matrix,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = config::get();
//! let run = run_matrix(RunPlan {
//!     source: Arc::new(StaticInventory::new("platforms.json")),
//!     matrix: PlatformMatrix::builtin(),
//!     registry: TaskRegistry::builtin(),
//!     factory: Arc::new(MockDriverFactory::new()),
//!     grid: cfg.grid.clone(),
//!     settings: cfg.run.clone(),
//!     grouped_report: None,
//! })
//! .await?;
//! println!("{}", run.summary);
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod config;
pub mod driver;
pub mod error;
pub mod queue;
pub mod report;
pub mod runner;
pub mod session;
pub mod task;

// Re-export capability types
pub use capability::{
    Capability, CapabilityBuilder, CapabilitySource, Orientation, PlatformDescriptor,
    PlatformMatrix, RemoteInventory, StaticInventory, Variant,
};

// Re-export drivers
pub use driver::{By, DriverFactory, MockDriverFactory, RemoteDriverFactory, WebDriver};

// Re-export errors
pub use error::{
    CapabilityError, DriverError, FlattenError, HarnessError, HarnessResult, TaskError,
};

// Re-export orchestration
pub use queue::{QueueSummary, WorkQueue};
pub use runner::{MatrixRun, RunPlan, expand, resolve_capabilities, run_matrix};
pub use session::{SessionRunner, WorkItem};
pub use task::{Task, TaskContext, TaskRegistry};

// Re-export reporting
pub use report::{
    EmptyResultPolicy, FlattenSummary, Flattened, Outcome, ResultAggregator, ResultRecord,
    RunSummary, flatten_report, write_csv,
};
