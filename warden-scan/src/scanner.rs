//! Scan execution against stored policies.

use std::sync::Arc;
use std::time::SystemTime;

use futures::future::join_all;
use tracing::{debug, warn};
use warden_config::RuntimeConfig;
use warden_policy::{ActionImpact, FilterEvaluator, Policy, PolicyStatus, plan_actions};
use warden_primitives::ScanId;
use warden_store::{PolicyStore, StoreResult};

use crate::collector::ResourceCollector;
use crate::cost::monthly_cost;
use crate::report::{
    BatchScanError, BatchScanReport, EstimatedCost, MatchedResource, ScanReport, ScanSummary,
};

/// Drives scans of one or many policies.
///
/// Scanning is read-only: it never mutates the store or any snapshot, and
/// every report is marked dry-run regardless of the policy's configured mode.
pub struct Scanner {
    store: Arc<dyn PolicyStore>,
    collector: Arc<dyn ResourceCollector>,
    evaluator: FilterEvaluator,
    config: RuntimeConfig,
}

impl Scanner {
    /// Creates a scanner over the supplied store and collector.
    #[must_use]
    pub fn new(
        store: Arc<dyn PolicyStore>,
        collector: Arc<dyn ResourceCollector>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            store,
            collector,
            evaluator: FilterEvaluator::new(),
            config,
        }
    }

    /// Replaces the filter evaluator, e.g. to attach a relation resolver.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: FilterEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Scans one policy by name.
    ///
    /// # Errors
    ///
    /// Fails only when the policy record itself cannot be loaded. Collector
    /// failures degrade into the report's error list with partial results.
    pub async fn scan_policy(&self, name: &str) -> StoreResult<ScanReport> {
        let policy = self.store.get(name).await?;
        Ok(self.run_scan(&policy).await)
    }

    /// Scans every active policy, skipping the rest.
    ///
    /// A failing policy is logged and recorded as a batch error; it never
    /// aborts the remaining batch.
    ///
    /// # Errors
    ///
    /// Fails only when the policy listing itself cannot be loaded.
    pub async fn scan_all(&self) -> StoreResult<BatchScanReport> {
        let policies = self.store.list().await?;
        let active: Vec<Policy> = policies
            .into_iter()
            .filter(|policy| policy.status() == PolicyStatus::Active)
            .collect();

        // Scans of distinct policies share no mutable state; dispatch them
        // concurrently and collect per-policy outcomes.
        let outcomes = join_all(active.iter().map(|policy| async {
            (policy.name().to_owned(), self.scan_policy(policy.name()).await)
        }))
        .await;

        let mut batch = BatchScanReport::default();
        for (policy_name, outcome) in outcomes {
            match outcome {
                Ok(report) => batch.reports.push(report),
                Err(err) => {
                    warn!(policy = %policy_name, error = %err, "policy scan failed, continuing batch");
                    batch.errors.push(BatchScanError {
                        policy_name,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }

    async fn run_scan(&self, policy: &Policy) -> ScanReport {
        let scan_time = SystemTime::now();
        let mut errors = Vec::new();

        let mut snapshots = match self
            .collector
            .collect(policy.resource_type(), self.config.region())
            .await
        {
            Ok(snapshots) => snapshots,
            Err(err) => {
                warn!(
                    policy = policy.name(),
                    resource_type = %policy.resource_type(),
                    error = %err,
                    "snapshot collection failed"
                );
                errors.push(format!(
                    "collection failed for {}: {}",
                    policy.resource_type(),
                    err.reason()
                ));
                Vec::new()
            }
        };

        let cap = self.config.max_resources();
        if snapshots.len() > cap {
            warn!(
                policy = policy.name(),
                collected = snapshots.len(),
                cap,
                "truncating scan to the configured resource cap"
            );
            snapshots.truncate(cap);
        }

        let total_scanned = snapshots.len();
        let mut matched = Vec::new();
        for snapshot in snapshots {
            if self.evaluator.matches_all(policy.filters(), &snapshot) {
                let planned = plan_actions(&snapshot, policy.actions());
                let savings = snapshot.size_class().map_or(0.0, monthly_cost);
                matched.push((MatchedResource::new(snapshot, planned, policy.name()), savings));
            }
        }

        let summary = ScanSummary {
            total_scanned,
            matched_resources: matched.len(),
            actions_planned: matched
                .iter()
                .map(|(resource, _)| resource.planned_actions.len())
                .sum(),
            high_risk_actions: matched
                .iter()
                .flat_map(|(resource, _)| &resource.planned_actions)
                .filter(|action| action.impact == ActionImpact::High)
                .count(),
            estimated_cost_savings: matched.iter().map(|(_, savings)| savings).sum(),
        };

        let estimated_cost = (summary.estimated_cost_savings > 0.0).then(|| EstimatedCost {
            current_monthly_cost: summary.estimated_cost_savings,
            projected_savings: summary.estimated_cost_savings,
            currency: "USD".to_owned(),
        });

        debug!(
            policy = policy.name(),
            scanned = summary.total_scanned,
            matched = summary.matched_resources,
            "scan complete"
        );

        ScanReport {
            scan_id: ScanId::random(),
            policy_name: policy.name().to_owned(),
            resource_type: policy.resource_type(),
            scan_time,
            matched_resources: matched.into_iter().map(|(resource, _)| resource).collect(),
            summary,
            errors,
            dry_run: true,
            estimated_cost,
        }
    }
}
