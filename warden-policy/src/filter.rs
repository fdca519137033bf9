//! Composite filter expressions and their evaluator.
//!
//! Evaluation never fails: unrecognized filter kinds and operators match by
//! default so that forward-compatible filter types cannot silently exclude
//! every resource. Relationship filters are the one deliberate exception and
//! fail closed when the related resource cannot be resolved.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use warden_primitives::ResourceSnapshot;

/// Leaf comparison operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Attribute equals the literal after coercion to the attribute's type.
    #[default]
    Equals,
    /// Attribute (tag or property) is present.
    Exists,
    /// Attribute (tag or property) is missing.
    Absent,
    /// Numeric attribute is strictly less than the literal.
    LessThan,
    /// Numeric attribute is greater than or equal to the literal.
    GreaterOrEqual,
    /// Resource state is one of the listed states.
    InState,
    /// Operator emitted by a newer producer; matches everything.
    #[serde(other)]
    Unknown,
}

/// Quantifier applied by collection filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    /// At least one element matches.
    Any,
    /// Every element matches; vacuously true when empty.
    All,
    /// No element matches; vacuously true when empty.
    None,
}

/// Boolean predicate over one resource snapshot, leaf or composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Leaf comparison against one attribute.
    Comparison {
        /// Attribute to inspect: an intrinsic field, a property, or a tag.
        attribute: String,
        /// Comparison operator.
        #[serde(default)]
        op: CompareOp,
        /// Literal operand; ignored by presence operators.
        #[serde(default)]
        value: Value,
        /// Flips the result of a recognized operator.
        #[serde(default)]
        negate: bool,
    },
    /// True iff all sub-filters are true; vacuously true when empty.
    And {
        /// Conjunction operands.
        #[serde(default)]
        filters: Vec<Filter>,
    },
    /// True iff any sub-filter is true; vacuously false when empty.
    Or {
        /// Disjunction operands.
        #[serde(default)]
        filters: Vec<Filter>,
    },
    /// Negation of a single sub-filter.
    Not {
        /// Negated operand.
        filter: Box<Filter>,
    },
    /// Quantified evaluation over a named sub-collection attribute.
    Collection {
        /// Property holding the sub-collection array.
        attribute: String,
        /// Quantifier combining the per-element results.
        quantifier: Quantifier,
        /// Filter applied to each element.
        filter: Box<Filter>,
    },
    /// Evaluation against a related resource resolved by relation type.
    Related {
        /// Declared relation type (e.g. `attached-volume`).
        relation: String,
        /// Filter applied to the resolved resource.
        filter: Box<Filter>,
    },
    /// Filter kind emitted by a newer producer; matches everything.
    #[serde(other)]
    Unknown,
}

/// Resolves related resources for relationship filters.
pub trait RelationResolver: Send + Sync {
    /// Returns the resource related to `resource` through `relation`, when it
    /// can be resolved.
    fn resolve(&self, relation: &str, resource: &ResourceSnapshot) -> Option<ResourceSnapshot>;
}

/// Evaluates filter expressions against resource snapshots.
///
/// Evaluation is a pure, bounded computation with no side effects.
#[derive(Clone, Default)]
pub struct FilterEvaluator {
    resolver: Option<Arc<dyn RelationResolver>>,
}

/// Attribute source for one evaluation step: either a full snapshot or one
/// element of a sub-collection viewed as a bare property bag.
enum AttrView<'a> {
    Snapshot(&'a ResourceSnapshot),
    Element(&'a Map<String, Value>),
}

impl AttrView<'_> {
    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Self::Snapshot(resource) => match name {
                "id" => Some(Value::from(resource.id())),
                "name" => resource.name().map(Value::from),
                "region" => Some(Value::from(resource.region())),
                "state" => resource.state().map(Value::from),
                "type" | "resource_type" => Some(Value::from(resource.resource_type().as_str())),
                _ => resource
                    .property(name)
                    .cloned()
                    .or_else(|| resource.tag(name).map(Value::from)),
            },
            Self::Element(map) => map.get(name).cloned(),
        }
    }

    fn state(&self) -> Option<Value> {
        self.attribute("state")
    }
}

impl FilterEvaluator {
    /// Creates an evaluator with no relation resolver; relationship filters
    /// will never match.
    #[must_use]
    pub fn new() -> Self {
        Self { resolver: None }
    }

    /// Creates an evaluator that resolves relationship filters through the
    /// supplied resolver.
    #[must_use]
    pub fn with_resolver(resolver: Arc<dyn RelationResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Returns whether the resource satisfies the filter expression.
    #[must_use]
    pub fn matches(&self, filter: &Filter, resource: &ResourceSnapshot) -> bool {
        self.eval(filter, &AttrView::Snapshot(resource), Some(resource))
    }

    /// Returns whether the resource satisfies every filter in the set.
    ///
    /// Policies carry a list of top-level filters combined as an implicit
    /// conjunction; an empty set matches every resource.
    #[must_use]
    pub fn matches_all(&self, filters: &[Filter], resource: &ResourceSnapshot) -> bool {
        filters.iter().all(|filter| self.matches(filter, resource))
    }

    fn eval(&self, filter: &Filter, view: &AttrView<'_>, origin: Option<&ResourceSnapshot>) -> bool {
        match filter {
            Filter::Comparison {
                attribute,
                op,
                value,
                negate,
            } => eval_comparison(attribute, *op, value, *negate, view),
            Filter::And { filters } => filters.iter().all(|f| self.eval(f, view, origin)),
            Filter::Or { filters } => filters.iter().any(|f| self.eval(f, view, origin)),
            Filter::Not { filter } => !self.eval(filter, view, origin),
            Filter::Collection {
                attribute,
                quantifier,
                filter,
            } => self.eval_collection(attribute, *quantifier, filter, view, origin),
            Filter::Related { relation, filter } => self.eval_related(relation, filter, origin),
            Filter::Unknown => {
                debug!("unrecognized filter kind, matching by default");
                true
            }
        }
    }

    fn eval_collection(
        &self,
        attribute: &str,
        quantifier: Quantifier,
        filter: &Filter,
        view: &AttrView<'_>,
        origin: Option<&ResourceSnapshot>,
    ) -> bool {
        let elements = view.attribute(attribute);
        let elements = elements
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let empty = Map::new();
        let mut results = elements.iter().map(|element| {
            let bag = element.as_object().unwrap_or(&empty);
            self.eval(filter, &AttrView::Element(bag), origin)
        });

        match quantifier {
            Quantifier::Any => results.any(|matched| matched),
            Quantifier::All => results.all(|matched| matched),
            Quantifier::None => !results.any(|matched| matched),
        }
    }

    fn eval_related(
        &self,
        relation: &str,
        filter: &Filter,
        origin: Option<&ResourceSnapshot>,
    ) -> bool {
        let Some(resource) = origin else {
            return false;
        };
        let Some(resolver) = &self.resolver else {
            return false;
        };
        match resolver.resolve(relation, resource) {
            Some(related) => self.eval(filter, &AttrView::Snapshot(&related), Some(&related)),
            None => {
                debug!(relation, resource = resource.id(), "related resource unresolved");
                false
            }
        }
    }
}

fn eval_comparison(
    attribute: &str,
    op: CompareOp,
    literal: &Value,
    negate: bool,
    view: &AttrView<'_>,
) -> bool {
    let result = match op {
        // Fail-open law: an unrecognized operator matches unconditionally,
        // before negation is considered.
        CompareOp::Unknown => {
            debug!(attribute, "unrecognized comparison operator, matching by default");
            return true;
        }
        CompareOp::Exists => view.attribute(attribute).is_some(),
        CompareOp::Absent => view.attribute(attribute).is_none(),
        CompareOp::Equals => view
            .attribute(attribute)
            .is_some_and(|actual| values_equal(&actual, literal)),
        CompareOp::LessThan => numeric_compare(view.attribute(attribute), literal)
            .is_some_and(|(actual, bound)| actual < bound),
        CompareOp::GreaterOrEqual => numeric_compare(view.attribute(attribute), literal)
            .is_some_and(|(actual, bound)| actual >= bound),
        CompareOp::InState => state_matches(view.state(), literal),
    };

    if negate { !result } else { result }
}

/// Coerces the literal to the attribute's runtime type before comparing.
fn values_equal(actual: &Value, literal: &Value) -> bool {
    match actual {
        Value::Number(_) => match (actual.as_f64(), literal_as_f64(literal)) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        Value::String(a) => match literal {
            Value::String(b) => a == b,
            Value::Number(n) => *a == n.to_string(),
            Value::Bool(b) => *a == b.to_string(),
            _ => false,
        },
        Value::Bool(a) => literal.as_bool().is_some_and(|b| *a == b),
        _ => actual == literal,
    }
}

fn numeric_compare(actual: Option<Value>, literal: &Value) -> Option<(f64, f64)> {
    let actual = actual?.as_f64()?;
    let bound = literal_as_f64(literal)?;
    Some((actual, bound))
}

fn literal_as_f64(literal: &Value) -> Option<f64> {
    match literal {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn state_matches(state: Option<Value>, literal: &Value) -> bool {
    let Some(state) = state.as_ref().and_then(Value::as_str) else {
        return false;
    };
    match literal {
        Value::Array(states) => states
            .iter()
            .filter_map(Value::as_str)
            .any(|candidate| candidate == state),
        Value::String(single) => single == state,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_primitives::ResourceType;

    fn instance(cpu: f64, running_days: u64) -> ResourceSnapshot {
        ResourceSnapshot::builder("i-0abc", ResourceType::Ec2, "us-east-1")
            .state("running")
            .tag("env", "prod")
            .unwrap()
            .property("cpu_utilization", json!(cpu))
            .property("running_days", json!(running_days))
            .property(
                "attached_volumes",
                json!([
                    {"size_gb": 100, "encrypted": true},
                    {"size_gb": 20, "encrypted": false},
                ]),
            )
            .build()
            .unwrap()
    }

    fn comparison(attribute: &str, op: CompareOp, value: Value) -> Filter {
        Filter::Comparison {
            attribute: attribute.into(),
            op,
            value,
            negate: false,
        }
    }

    #[test]
    fn numeric_thresholds_combine_under_and() {
        let filter = Filter::And {
            filters: vec![
                comparison("cpu_utilization", CompareOp::LessThan, json!(5)),
                comparison("running_days", CompareOp::GreaterOrEqual, json!(7)),
            ],
        };
        let evaluator = FilterEvaluator::new();
        assert!(evaluator.matches(&filter, &instance(2.5, 15)));
        assert!(!evaluator.matches(&filter, &instance(80.0, 15)));
        assert!(!evaluator.matches(&filter, &instance(2.5, 3)));
    }

    #[test]
    fn and_is_vacuously_true_and_or_vacuously_false() {
        let evaluator = FilterEvaluator::new();
        let resource = instance(50.0, 1);
        assert!(evaluator.matches(&Filter::And { filters: vec![] }, &resource));
        assert!(!evaluator.matches(&Filter::Or { filters: vec![] }, &resource));
    }

    #[test]
    fn unknown_filter_kind_matches_every_resource() {
        let evaluator = FilterEvaluator::new();
        assert!(evaluator.matches(&Filter::Unknown, &instance(99.0, 0)));

        // A tagged payload with an unrecognized kind deserializes to Unknown.
        let parsed: Filter =
            serde_json::from_value(json!({"kind": "geo_fence", "zone": "eu"})).unwrap();
        assert_eq!(parsed, Filter::Unknown);
        assert!(evaluator.matches(&parsed, &instance(99.0, 0)));
    }

    #[test]
    fn unknown_operator_matches_even_when_negated() {
        let filter = Filter::Comparison {
            attribute: "cpu_utilization".into(),
            op: CompareOp::Unknown,
            value: json!(5),
            negate: true,
        };
        assert!(FilterEvaluator::new().matches(&filter, &instance(50.0, 1)));
    }

    #[test]
    fn presence_operators_cover_tags_and_properties() {
        let evaluator = FilterEvaluator::new();
        let resource = instance(1.0, 1);
        assert!(evaluator.matches(&comparison("env", CompareOp::Exists, Value::Null), &resource));
        assert!(evaluator.matches(
            &comparison("owner", CompareOp::Absent, Value::Null),
            &resource
        ));
        assert!(!evaluator.matches(
            &comparison("env", CompareOp::Absent, Value::Null),
            &resource
        ));
    }

    #[test]
    fn negate_flips_recognized_operators() {
        let filter = Filter::Comparison {
            attribute: "env".into(),
            op: CompareOp::Equals,
            value: json!("prod"),
            negate: true,
        };
        assert!(!FilterEvaluator::new().matches(&filter, &instance(1.0, 1)));
    }

    #[test]
    fn state_membership_checks_listed_states() {
        let evaluator = FilterEvaluator::new();
        let resource = instance(1.0, 1);
        assert!(evaluator.matches(
            &comparison("state", CompareOp::InState, json!(["running", "pending"])),
            &resource
        ));
        assert!(!evaluator.matches(
            &comparison("state", CompareOp::InState, json!(["stopped"])),
            &resource
        ));
    }

    #[test]
    fn numeric_mismatch_evaluates_false() {
        let evaluator = FilterEvaluator::new();
        let resource = instance(1.0, 1);
        // `env` is a string tag; it has no numeric interpretation.
        assert!(!evaluator.matches(
            &comparison("env", CompareOp::LessThan, json!(5)),
            &resource
        ));
        // Missing property.
        assert!(!evaluator.matches(
            &comparison("iops", CompareOp::GreaterOrEqual, json!(100)),
            &resource
        ));
    }

    #[test]
    fn collection_quantifiers_follow_their_semantics() {
        let evaluator = FilterEvaluator::new();
        let resource = instance(1.0, 1);
        let encrypted = comparison("encrypted", CompareOp::Equals, json!(true));

        let any = Filter::Collection {
            attribute: "attached_volumes".into(),
            quantifier: Quantifier::Any,
            filter: Box::new(encrypted.clone()),
        };
        let all = Filter::Collection {
            attribute: "attached_volumes".into(),
            quantifier: Quantifier::All,
            filter: Box::new(encrypted.clone()),
        };
        let none = Filter::Collection {
            attribute: "attached_volumes".into(),
            quantifier: Quantifier::None,
            filter: Box::new(encrypted.clone()),
        };

        assert!(evaluator.matches(&any, &resource));
        assert!(!evaluator.matches(&all, &resource));
        assert!(!evaluator.matches(&none, &resource));

        // Missing attribute behaves as the empty collection: ALL and NONE are
        // vacuously true, ANY is false.
        for (quantifier, expected) in [
            (Quantifier::All, true),
            (Quantifier::None, true),
            (Quantifier::Any, false),
        ] {
            let missing = Filter::Collection {
                attribute: "network_interfaces".into(),
                quantifier,
                filter: Box::new(encrypted.clone()),
            };
            assert_eq!(evaluator.matches(&missing, &resource), expected);
        }
    }

    struct FixedResolver(Option<ResourceSnapshot>);

    impl RelationResolver for FixedResolver {
        fn resolve(&self, _relation: &str, _resource: &ResourceSnapshot) -> Option<ResourceSnapshot> {
            self.0.clone()
        }
    }

    #[test]
    fn relationship_filter_fails_closed_when_unresolved() {
        let filter = Filter::Related {
            relation: "attached-volume".into(),
            filter: Box::new(comparison("state", CompareOp::Equals, json!("available"))),
        };
        let resource = instance(1.0, 1);

        // No resolver configured at all.
        assert!(!FilterEvaluator::new().matches(&filter, &resource));

        // Resolver present but the relation does not resolve.
        let evaluator = FilterEvaluator::with_resolver(Arc::new(FixedResolver(None)));
        assert!(!evaluator.matches(&filter, &resource));

        // Resolution succeeds and the inner filter decides.
        let related = ResourceSnapshot::builder("vol-9", ResourceType::Ebs, "us-east-1")
            .state("available")
            .build()
            .unwrap();
        let evaluator = FilterEvaluator::with_resolver(Arc::new(FixedResolver(Some(related))));
        assert!(evaluator.matches(&filter, &resource));
    }

    #[test]
    fn empty_filter_set_matches_everything() {
        let evaluator = FilterEvaluator::new();
        assert!(evaluator.matches_all(&[], &instance(1.0, 1)));
    }

    #[test]
    fn filter_tree_serializes_round_trip() {
        let filter = Filter::Or {
            filters: vec![
                comparison("cpu_utilization", CompareOp::LessThan, json!(5)),
                Filter::Not {
                    filter: Box::new(comparison("env", CompareOp::Equals, json!("prod"))),
                },
            ],
        };
        let encoded = serde_json::to_value(&filter).unwrap();
        let decoded: Filter = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, filter);
    }
}
