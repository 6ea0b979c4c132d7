pub mod display_metrics;
pub mod registry;
pub mod route_landing;
pub mod types;

pub use display_metrics::DisplayMetrics;
pub use registry::TaskRegistry;
pub use route_landing::RouteLanding;
pub use types::{Task, TaskContext, TaskLogger};
