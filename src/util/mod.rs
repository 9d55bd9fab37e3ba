pub mod failures;
pub mod report;
pub mod units;
