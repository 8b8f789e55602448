mod engine;
mod types;

pub use engine::{MAX_PROJECTION_YEARS, project, project_scenario, summarize};
pub use types::{ProjectionSummary, Scenario, WithdrawalPolicy, YearRow};
