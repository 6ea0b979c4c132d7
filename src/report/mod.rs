pub mod aggregator;
pub mod csv;
pub mod flatten;
pub mod types;

pub use aggregator::{PlatformEntry, PlatformResults, ResultAggregator, platform_key};
pub use flatten::{EmptyResultPolicy, FlattenSummary, Flattened, RecordClass, classify, flatten_record, flatten_records, flatten_report, write_csv};
pub use types::{Outcome, OutcomeKind, ResultRecord, RunSummary, TIMEOUT_MESSAGE};
