//! Point-in-time resource snapshots produced by collectors.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Cloud resource categories the engine understands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// EC2 compute instances.
    Ec2,
    /// EBS block storage volumes.
    Ebs,
    /// RDS database instances.
    Rds,
    /// S3 object storage buckets.
    S3,
    /// Lambda functions.
    Lambda,
    /// Elastic IP addresses.
    Eip,
    /// VPC security groups.
    SecurityGroup,
}

impl ResourceType {
    /// Returns the canonical string form used in persisted records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Ebs => "ebs",
            Self::Rds => "rds",
            Self::S3 => "s3",
            Self::Lambda => "lambda",
            Self::Eip => "eip",
            Self::SecurityGroup => "security-group",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ec2" => Ok(Self::Ec2),
            "ebs" => Ok(Self::Ebs),
            "rds" => Ok(Self::Rds),
            "s3" => Ok(Self::S3),
            "lambda" => Ok(Self::Lambda),
            "eip" => Ok(Self::Eip),
            "security-group" => Ok(Self::SecurityGroup),
            other => Err(Error::UnsupportedResourceType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Describes one cloud resource at collection time.
///
/// Snapshots are produced per scan by a collector and are never persisted by
/// the core engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    resource_type: ResourceType,
    region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
}

impl ResourceSnapshot {
    /// Creates a builder for a new resource snapshot.
    #[must_use]
    pub fn builder(
        id: impl Into<String>,
        resource_type: ResourceType,
        region: impl Into<String>,
    ) -> ResourceSnapshotBuilder {
        ResourceSnapshotBuilder {
            id: id.into(),
            name: None,
            resource_type,
            region: region.into(),
            state: None,
            tags: BTreeMap::new(),
            properties: Map::new(),
        }
    }

    /// Returns the provider-assigned resource identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the optional display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the resource type.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Returns the region the resource lives in.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the optional lifecycle state (e.g. `running`, `stopped`).
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns the tag map.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns one tag value by key.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns the typed property map.
    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns one property value by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Returns the size class used for cost estimation, when present.
    ///
    /// Reads the `instance_type` property first, then `size`.
    #[must_use]
    pub fn size_class(&self) -> Option<&str> {
        self.property("instance_type")
            .or_else(|| self.property("size"))
            .and_then(Value::as_str)
    }
}

/// Builder type used to assemble [`ResourceSnapshot`] instances safely.
#[derive(Debug)]
pub struct ResourceSnapshotBuilder {
    id: String,
    name: Option<String>,
    resource_type: ResourceType,
    region: String,
    state: Option<String>,
    tags: BTreeMap<String, String>,
    properties: Map<String, Value>,
}

impl ResourceSnapshotBuilder {
    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Adds a tag after validating that the key is not empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] when the tag key is empty or
    /// whitespace.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidResource("tag keys must not be empty"));
        }
        self.tags.insert(key, value.into());
        Ok(self)
    }

    /// Adds a typed property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Adds a full property map, overwriting existing keys when duplicates occur.
    #[must_use]
    pub fn merge_properties(mut self, map: Map<String, Value>) -> Self {
        self.properties.extend(map);
        self
    }

    /// Finalises the builder and produces the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] when the resource id or region is
    /// empty.
    pub fn build(self) -> Result<ResourceSnapshot> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidResource("resource id must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(Error::InvalidResource("resource region must not be empty"));
        }

        Ok(ResourceSnapshot {
            id: self.id,
            name: self.name,
            resource_type: self.resource_type,
            region: self.region,
            state: self.state,
            tags: self.tags,
            properties: self.properties,
        })
    }
}
