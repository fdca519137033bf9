//! Action planning for matched resources.
//!
//! Planning never fails and has no side effects: planned actions are a pure
//! function of the action specs and the resource snapshot. Impact and
//! reversibility come from a static table built once per process; unknown
//! action types degrade to a medium-impact, reversible plan with a generic
//! description.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use warden_primitives::ResourceSnapshot;

use crate::model::ActionSpec;

/// Blast-radius classification for a planned action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionImpact {
    /// Metadata-only changes.
    Low,
    /// Service-interrupting but recoverable changes.
    Medium,
    /// Destructive or hard-to-recover changes.
    High,
}

/// Impact table row: classification plus reversibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImpactProfile {
    impact: ActionImpact,
    reversible: bool,
}

const DEFAULT_PROFILE: ImpactProfile = ImpactProfile {
    impact: ActionImpact::Medium,
    reversible: true,
};

fn impact_table() -> &'static HashMap<&'static str, ImpactProfile> {
    static TABLE: OnceLock<HashMap<&'static str, ImpactProfile>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let low = |reversible| ImpactProfile {
            impact: ActionImpact::Low,
            reversible,
        };
        let medium = |reversible| ImpactProfile {
            impact: ActionImpact::Medium,
            reversible,
        };
        let high = |reversible| ImpactProfile {
            impact: ActionImpact::High,
            reversible,
        };

        HashMap::from([
            ("tag", low(true)),
            ("untag", low(true)),
            ("notify", low(true)),
            ("snapshot", low(true)),
            ("stop", medium(true)),
            ("resize", medium(true)),
            ("detach", medium(true)),
            ("terminate", high(false)),
            ("delete", high(false)),
            ("release", high(false)),
        ])
    })
}

/// One planned operation against a matched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// Action type copied from the spec.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Human-readable description naming the resource.
    pub description: String,
    /// Static impact classification.
    pub impact: ActionImpact,
    /// Whether the action can be undone.
    pub reversible: bool,
    /// Dry-run flag propagated from the spec.
    pub dry_run: bool,
}

/// Plans the supplied action specs against one matched resource.
///
/// Output order mirrors the spec order.
#[must_use]
pub fn plan_actions(resource: &ResourceSnapshot, specs: &[ActionSpec]) -> Vec<PlannedAction> {
    specs
        .iter()
        .map(|spec| {
            let profile = impact_table()
                .get(spec.action_type())
                .copied()
                .unwrap_or(DEFAULT_PROFILE);
            PlannedAction {
                action_type: spec.action_type().to_owned(),
                description: describe(spec.action_type(), resource.id()),
                impact: profile.impact,
                reversible: profile.reversible,
                dry_run: spec.dry_run(),
            }
        })
        .collect()
}

fn describe(action_type: &str, resource_id: &str) -> String {
    match action_type {
        "tag" => format!("Apply tags to resource {resource_id}"),
        "untag" => format!("Remove tags from resource {resource_id}"),
        "notify" => format!("Send notification for resource {resource_id}"),
        "snapshot" => format!("Create snapshot of resource {resource_id}"),
        "stop" => format!("Stop resource {resource_id}"),
        "resize" => format!("Resize resource {resource_id}"),
        "detach" => format!("Detach resource {resource_id}"),
        "terminate" => format!("Terminate resource {resource_id}"),
        "delete" => format!("Delete resource {resource_id}"),
        "release" => format!("Release resource {resource_id}"),
        other => format!("Apply `{other}` to resource {resource_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_primitives::ResourceType;

    fn resource() -> ResourceSnapshot {
        ResourceSnapshot::builder("i-0abc", ResourceType::Ec2, "us-east-1")
            .build()
            .unwrap()
    }

    #[test]
    fn planning_preserves_spec_order() {
        let specs = vec![
            ActionSpec::new("snapshot").unwrap(),
            ActionSpec::new("stop").unwrap(),
            ActionSpec::new("terminate").unwrap(),
        ];
        let planned = plan_actions(&resource(), &specs);

        let types: Vec<&str> = planned.iter().map(|p| p.action_type.as_str()).collect();
        assert_eq!(types, ["snapshot", "stop", "terminate"]);
    }

    #[test]
    fn known_actions_use_the_static_table() {
        let planned = plan_actions(&resource(), &[ActionSpec::new("stop").unwrap()]);
        assert_eq!(planned[0].impact, ActionImpact::Medium);
        assert!(planned[0].reversible);
        assert_eq!(planned[0].description, "Stop resource i-0abc");

        let planned = plan_actions(&resource(), &[ActionSpec::new("terminate").unwrap()]);
        assert_eq!(planned[0].impact, ActionImpact::High);
        assert!(!planned[0].reversible);
    }

    #[test]
    fn unknown_actions_degrade_to_the_default_profile() {
        let planned = plan_actions(&resource(), &[ActionSpec::new("quarantine").unwrap()]);
        assert_eq!(planned[0].impact, ActionImpact::Medium);
        assert!(planned[0].reversible);
        assert_eq!(
            planned[0].description,
            "Apply `quarantine` to resource i-0abc"
        );
    }

    #[test]
    fn dry_run_flag_propagates_from_spec() {
        let specs = vec![
            ActionSpec::new("stop").unwrap(),
            ActionSpec::new("stop").unwrap().with_dry_run(false),
        ];
        let planned = plan_actions(&resource(), &specs);
        assert!(planned[0].dry_run);
        assert!(!planned[1].dry_run);
    }

    #[test]
    fn impact_ordering_ranks_high_above_low() {
        assert!(ActionImpact::High > ActionImpact::Medium);
        assert!(ActionImpact::Medium > ActionImpact::Low);
    }
}
