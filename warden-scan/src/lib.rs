//! Scan orchestration: collect snapshots, match policies, plan actions,
//! aggregate summaries.

#![warn(missing_docs, clippy::pedantic)]

pub mod collector;
mod cost;
pub mod report;
mod scanner;

pub use collector::{CollectorError, CollectorResult, ResourceCollector, StaticCollector};
pub use cost::monthly_cost;
pub use report::{
    BatchScanError, BatchScanReport, ComplianceStatus, EstimatedCost, MatchedResource, RiskLevel,
    ScanReport, ScanSummary,
};
pub use scanner::Scanner;
