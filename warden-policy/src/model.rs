//! Persistent policy records and their supporting value types.

use std::collections::BTreeSet;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden_primitives::ResourceType;

use crate::filter::Filter;
use crate::{PolicyError, PolicyResult};

/// Lifecycle status of a policy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Being authored; excluded from batch scans.
    Draft,
    /// Eligible for scanning.
    Active,
    /// Retained but excluded from scanning.
    Inactive,
    /// Terminal archived state.
    Deleted,
}

/// How a policy record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    /// Authored directly by an operator.
    Manual,
    /// Instantiated from a template catalog.
    Template,
    /// Brought in through the import path.
    Import,
    /// Produced by the interactive wizard.
    Wizard,
}

/// When a policy is expected to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// Run only when explicitly requested.
    OnDemand,
    /// Run on a recurring schedule.
    Scheduled,
    /// Run in response to an external event.
    Event,
}

/// Execution mode attached to a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMode {
    #[serde(rename = "type")]
    kind: ExecutionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    settings: Map<String, Value>,
}

impl ExecutionMode {
    /// Returns an on-demand execution mode.
    #[must_use]
    pub fn on_demand() -> Self {
        Self {
            kind: ExecutionKind::OnDemand,
            schedule: None,
            settings: Map::new(),
        }
    }

    /// Returns a scheduled execution mode with the supplied schedule expression.
    #[must_use]
    pub fn scheduled(schedule: impl Into<String>) -> Self {
        Self {
            kind: ExecutionKind::Scheduled,
            schedule: Some(schedule.into()),
            settings: Map::new(),
        }
    }

    /// Returns an event-driven execution mode.
    #[must_use]
    pub fn event() -> Self {
        Self {
            kind: ExecutionKind::Event,
            schedule: None,
            settings: Map::new(),
        }
    }

    /// Adds a mode setting and returns the updated instance.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Returns the execution kind.
    #[must_use]
    pub const fn kind(&self) -> ExecutionKind {
        self.kind
    }

    /// Returns the schedule expression, when scheduled.
    #[must_use]
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    /// Returns the mode settings.
    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::on_demand()
    }
}

/// Static remediation action template attached to a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    settings: Map<String, Value>,
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

impl ActionSpec {
    /// Creates an action spec of the supplied type, defaulting to dry-run.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Validation`] when the action type is empty.
    pub fn new(action_type: impl Into<String>) -> PolicyResult<Self> {
        let action_type = action_type.into();
        if action_type.trim().is_empty() {
            return Err(PolicyError::Validation("action type must not be empty"));
        }
        Ok(Self {
            action_type,
            settings: Map::new(),
            dry_run: true,
        })
    }

    /// Adds a setting and returns the updated spec.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Overrides the dry-run flag.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the action type.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Returns the settings map.
    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// Returns the dry-run flag.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Named governance rule: a resource selector plus remediation actions.
///
/// The policy store owns persistence; everything else treats records as
/// immutable snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<ActionSpec>,
    #[serde(default)]
    mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
    created_at: SystemTime,
    updated_at: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
    version: u64,
    status: PolicyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_run: Option<SystemTime>,
    #[serde(default)]
    run_count: u64,
    source: PolicySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template_id: Option<String>,
}

impl Policy {
    /// Creates a builder for a new policy record.
    #[must_use]
    pub fn builder(name: impl Into<String>, resource_type: ResourceType) -> PolicyBuilder {
        PolicyBuilder {
            name: name.into(),
            description: None,
            resource_type,
            filters: Vec::new(),
            actions: Vec::new(),
            mode: ExecutionMode::default(),
            tags: BTreeSet::new(),
            metadata: Map::new(),
            created_by: None,
            status: PolicyStatus::Draft,
            source: PolicySource::Manual,
            template_id: None,
        }
    }

    /// Returns the unique policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the targeted resource type.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Returns the filter expressions; an empty set matches every resource.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the ordered action list.
    #[must_use]
    pub fn actions(&self) -> &[ActionSpec] {
        &self.actions
    }

    /// Returns the execution mode.
    #[must_use]
    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Returns the tag set.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the free-form metadata map.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> SystemTime {
        self.updated_at
    }

    /// Returns the author, when recorded.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    /// Returns the monotonic record version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> PolicyStatus {
        self.status
    }

    /// Returns the timestamp of the most recent recorded run.
    #[must_use]
    pub const fn last_run(&self) -> Option<SystemTime> {
        self.last_run
    }

    /// Returns the number of recorded runs.
    #[must_use]
    pub const fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Returns the provenance of the record.
    #[must_use]
    pub const fn source(&self) -> PolicySource {
        self.source
    }

    /// Returns the originating template identifier, when any.
    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    /// Overrides the record version.
    ///
    /// Intended for the policy store's version bookkeeping.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Replaces the lifecycle status.
    pub fn set_status(&mut self, status: PolicyStatus) {
        self.status = status;
    }

    /// Replaces the provenance marker.
    pub fn set_source(&mut self, source: PolicySource) {
        self.source = source;
    }

    /// Updates the modification timestamp.
    pub fn touch(&mut self, now: SystemTime) {
        self.updated_at = now;
    }

    /// Assigns fresh creation and modification timestamps and clears run
    /// bookkeeping, as required by the import path.
    pub fn refresh_timestamps(&mut self, now: SystemTime) {
        self.created_at = now;
        self.updated_at = now;
        self.last_run = None;
        self.run_count = 0;
    }

    /// Records one completed run at the supplied instant.
    pub fn mark_run(&mut self, at: SystemTime) {
        self.last_run = Some(at);
        self.run_count += 1;
    }
}

/// Builder for [`Policy`] records.
#[derive(Debug)]
pub struct PolicyBuilder {
    name: String,
    description: Option<String>,
    resource_type: ResourceType,
    filters: Vec<Filter>,
    actions: Vec<ActionSpec>,
    mode: ExecutionMode,
    tags: BTreeSet<String>,
    metadata: Map<String, Value>,
    created_by: Option<String>,
    status: PolicyStatus,
    source: PolicySource,
    template_id: Option<String>,
}

impl PolicyBuilder {
    /// Sets the human-readable description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a filter expression.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replaces the filter list.
    #[must_use]
    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Appends an action spec.
    #[must_use]
    pub fn action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    /// Replaces the action list.
    #[must_use]
    pub fn actions(mut self, actions: Vec<ActionSpec>) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the execution mode.
    #[must_use]
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds a tag, ignoring empty or whitespace-only strings.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.trim().is_empty() {
            self.tags.insert(tag);
        }
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Records the author.
    #[must_use]
    pub fn created_by(mut self, author: impl Into<String>) -> Self {
        self.created_by = Some(author.into());
        self
    }

    /// Sets the initial lifecycle status.
    #[must_use]
    pub fn status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the provenance marker.
    #[must_use]
    pub fn source(mut self, source: PolicySource) -> Self {
        self.source = source;
        self
    }

    /// Records the originating template.
    #[must_use]
    pub fn template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    /// Finalises the builder and produces the policy record.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Validation`] when the name is empty.
    pub fn build(self) -> PolicyResult<Policy> {
        if self.name.trim().is_empty() {
            return Err(PolicyError::Validation("policy name must not be empty"));
        }

        let now = SystemTime::now();
        Ok(Policy {
            name: self.name,
            description: self.description,
            resource_type: self.resource_type,
            filters: self.filters,
            actions: self.actions,
            mode: self.mode,
            tags: self.tags,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
            created_by: self.created_by,
            version: 1,
            status: self.status,
            last_run: None,
            run_count: 0,
            source: self.source,
            template_id: self.template_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_constructs_policy() {
        let policy = Policy::builder("stale-ec2", ResourceType::Ec2)
            .description("stop long-idle instances")
            .action(ActionSpec::new("stop").unwrap())
            .mode(ExecutionMode::scheduled("rate(1 day)"))
            .tag("cost")
            .tag(" ")
            .status(PolicyStatus::Active)
            .build()
            .unwrap();

        assert_eq!(policy.name(), "stale-ec2");
        assert_eq!(policy.resource_type(), ResourceType::Ec2);
        assert_eq!(policy.version(), 1);
        assert_eq!(policy.run_count(), 0);
        assert_eq!(policy.status(), PolicyStatus::Active);
        assert_eq!(policy.tags().len(), 1);
        assert_eq!(policy.mode().schedule(), Some("rate(1 day)"));
    }

    #[test]
    fn builder_rejects_empty_name() {
        let result = Policy::builder("  ", ResourceType::S3).build();
        assert!(matches!(result, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn action_spec_rejects_empty_type() {
        let result = ActionSpec::new("");
        assert!(matches!(result, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn action_spec_defaults_to_dry_run() {
        let spec = ActionSpec::new("stop").unwrap();
        assert!(spec.dry_run());
        let spec = spec.with_dry_run(false);
        assert!(!spec.dry_run());
    }

    #[test]
    fn mark_run_accumulates() {
        let mut policy = Policy::builder("p", ResourceType::Ec2).build().unwrap();
        assert!(policy.last_run().is_none());
        policy.mark_run(SystemTime::now());
        policy.mark_run(SystemTime::now());
        assert_eq!(policy.run_count(), 2);
        assert!(policy.last_run().is_some());
    }

    #[test]
    fn policy_serializes_round_trip() {
        let policy = Policy::builder("tagged-ebs", ResourceType::Ebs)
            .action(
                ActionSpec::new("tag")
                    .unwrap()
                    .with_setting("key", json!("owner")),
            )
            .metadata("team", json!("platform"))
            .build()
            .unwrap();

        let encoded = serde_json::to_string(&policy).unwrap();
        let decoded: Policy = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.name(), policy.name());
        assert_eq!(decoded.actions().len(), 1);
        assert_eq!(decoded.actions()[0].action_type(), "tag");
        assert_eq!(decoded.metadata().get("team").unwrap(), "platform");
    }
}
