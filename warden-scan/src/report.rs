//! Scan report types: matched resources, summaries, and batch results.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden_policy::{ActionImpact, PlannedAction};
use warden_primitives::{ResourceSnapshot, ResourceType, ScanId};

/// Risk classification for one matched resource.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Only metadata-level actions are planned.
    #[default]
    Low,
    /// Recoverable service interruption is planned.
    Medium,
    /// Destructive actions are planned.
    High,
}

impl From<ActionImpact> for RiskLevel {
    fn from(impact: ActionImpact) -> Self {
        match impact {
            ActionImpact::Low => Self::Low,
            ActionImpact::Medium => Self::Medium,
            ActionImpact::High => Self::High,
        }
    }
}

/// Compliance verdict attached to a matched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStatus {
    /// Whether the resource complies with the policy (matched resources do
    /// not).
    pub compliant: bool,
    /// Human-readable findings.
    pub issues: Vec<String>,
    /// Severity mirroring the resource risk level.
    pub severity: RiskLevel,
}

/// One resource that satisfied a policy's filter, enriched with its plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedResource {
    /// Provider-assigned resource identifier.
    pub id: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Region the resource lives in.
    pub region: String,
    /// Optional lifecycle state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Tag map at collection time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Property map at collection time.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Actions planned against the resource, in policy order.
    pub planned_actions: Vec<PlannedAction>,
    /// Highest impact among the planned actions.
    pub risk_level: RiskLevel,
    /// Compliance verdict.
    pub compliance: ComplianceStatus,
}

impl MatchedResource {
    /// Enriches a snapshot with its planned actions.
    #[must_use]
    pub fn new(
        snapshot: ResourceSnapshot,
        planned_actions: Vec<PlannedAction>,
        policy_name: &str,
    ) -> Self {
        let risk_level = planned_actions
            .iter()
            .map(|action| RiskLevel::from(action.impact))
            .max()
            .unwrap_or_default();

        Self {
            id: snapshot.id().to_owned(),
            name: snapshot.name().map(ToOwned::to_owned),
            resource_type: snapshot.resource_type(),
            region: snapshot.region().to_owned(),
            state: snapshot.state().map(ToOwned::to_owned),
            tags: snapshot.tags().clone(),
            properties: snapshot.properties().clone(),
            planned_actions,
            risk_level,
            compliance: ComplianceStatus {
                compliant: false,
                issues: vec![format!("matched governance policy `{policy_name}`")],
                severity: risk_level,
            },
        }
    }
}

/// Aggregate statistics for one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Snapshots evaluated (after the per-scan cap).
    pub total_scanned: usize,
    /// Snapshots that satisfied the filter set.
    pub matched_resources: usize,
    /// Planned actions across all matches.
    pub actions_planned: usize,
    /// Planned actions with high impact.
    pub high_risk_actions: usize,
    /// Estimated monthly savings from the static cost table.
    pub estimated_cost_savings: f64,
}

/// Optional cost projection attached to a scan report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedCost {
    /// Current monthly spend of the matched resources.
    pub current_monthly_cost: f64,
    /// Projected monthly savings if the plan were applied.
    pub projected_savings: f64,
    /// ISO currency code.
    pub currency: String,
}

/// Result of scanning one policy. Scans never mutate the store or the
/// snapshots; the dry-run marker is always true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique identifier for this scan invocation.
    pub scan_id: ScanId,
    /// Name of the scanned policy.
    pub policy_name: String,
    /// Resource type the policy targets.
    pub resource_type: ResourceType,
    /// When the scan ran.
    pub scan_time: SystemTime,
    /// Resources that satisfied the filter set, with their plans.
    pub matched_resources: Vec<MatchedResource>,
    /// Aggregate statistics.
    pub summary: ScanSummary,
    /// Non-fatal errors captured during the scan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Always true: scanning must never trigger a live action.
    pub dry_run: bool,
    /// Cost projection, present when any matched resource carries a cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<EstimatedCost>,
}

/// Per-policy failure captured during a batch scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScanError {
    /// Policy whose scan failed.
    pub policy_name: String,
    /// Human-readable failure.
    pub message: String,
}

/// Result of scanning every active policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchScanReport {
    /// Successful per-policy reports.
    pub reports: Vec<ScanReport>,
    /// Accumulated per-policy failures; never aborts the batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::{ActionSpec, plan_actions};

    fn snapshot() -> ResourceSnapshot {
        ResourceSnapshot::builder("i-0abc", ResourceType::Ec2, "us-east-1")
            .name("web-1")
            .state("running")
            .build()
            .unwrap()
    }

    #[test]
    fn risk_level_is_the_maximum_action_impact() {
        let specs = vec![
            ActionSpec::new("tag").unwrap(),
            ActionSpec::new("terminate").unwrap(),
        ];
        let planned = plan_actions(&snapshot(), &specs);
        let matched = MatchedResource::new(snapshot(), planned, "reaper");

        assert_eq!(matched.risk_level, RiskLevel::High);
        assert_eq!(matched.compliance.severity, RiskLevel::High);
        assert!(!matched.compliance.compliant);
    }

    #[test]
    fn no_planned_actions_means_low_risk() {
        let matched = MatchedResource::new(snapshot(), Vec::new(), "observer");
        assert_eq!(matched.risk_level, RiskLevel::Low);
    }

    #[test]
    fn matched_resource_carries_snapshot_fields() {
        let matched = MatchedResource::new(snapshot(), Vec::new(), "p");
        assert_eq!(matched.id, "i-0abc");
        assert_eq!(matched.name.as_deref(), Some("web-1"));
        assert_eq!(matched.state.as_deref(), Some("running"));
        assert_eq!(matched.resource_type, ResourceType::Ec2);
    }
}
