pub mod aggregator;
pub mod config;
pub mod delivery;
pub mod error;
pub mod models;
pub mod names;
pub mod notify;
pub mod payload;
pub mod pipeline;
pub mod scheduler;
pub mod source;

pub use aggregator::Aggregator;
pub use config::Config;
pub use delivery::DeliveryClient;
pub use error::{NameResolutionError, PipelineError, ResponseError, ScheduleError, SourceError};
pub use models::{DeliveryOutcome, UsageEntry, UsageRecord, UsageSummary};
pub use pipeline::{PipelineRun, UsagePipeline};
pub use scheduler::{PeriodicRequest, Scheduler, SchedulerState, TickResult};
