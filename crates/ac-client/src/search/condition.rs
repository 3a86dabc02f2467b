//! Search conditions and their compilation into the `where` document.

use serde_json::{json, Map, Value};

/// A single property test, e.g. `name = "Customer"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    property: String,
    operator: String,
    value: Option<String>,
    negated: Option<bool>,
}

impl Condition {
    /// Creates a condition comparing `property` against `value`.
    pub fn new(property: &str, operator: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            operator: operator.to_string(),
            value: Some(value.to_string()),
            negated: None,
        }
    }

    /// Creates a value-less condition (e.g. `isNull`) with an explicit negation flag.
    pub fn unary(property: &str, operator: &str, negated: bool) -> Self {
        Self {
            property: property.to_string(),
            operator: operator.to_string(),
            value: None,
            negated: Some(negated),
        }
    }

    /// Shorthand for `property = value`.
    pub fn equals(property: &str, value: &str) -> Self {
        Self::new(property, "=", value)
    }

    /// Shorthand for a `like %{0}%` containment test.
    pub fn contains(property: &str, value: &str) -> Self {
        Self::new(property, "like %{0}%", value)
    }

    /// Shorthand for `property isNull`, optionally negated.
    pub fn is_null(property: &str, negated: bool) -> Self {
        Self::unary(property, "isNull", negated)
    }

    /// Sets the negation flag.
    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = Some(negated);
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_negated(&self) -> Option<bool> {
        self.negated
    }

    /// Compiles the condition; absent value/negation keys are omitted, never null.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("property".to_string(), json!(self.property));
        doc.insert("operator".to_string(), json!(self.operator));
        if let Some(value) = &self.value {
            doc.insert("value".to_string(), json!(value));
        }
        if let Some(negated) = self.negated {
            doc.insert("negated".to_string(), json!(negated));
        }
        Value::Object(doc)
    }
}

/// How the leaf conditions of a set are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

impl JoinOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinOperator::And => "and",
            JoinOperator::Or => "or",
        }
    }
}

/// An ordered set of conditions with at most one nested sub-set.
///
/// The nested set is compiled as one more element of this set's `conditions`
/// array, so it is combined with the leaves using this set's operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
    join: JoinOperator,
    nested: Option<Box<ConditionSet>>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a one-element set.
    pub fn single(condition: Condition) -> Self {
        let mut set = Self::new();
        set.add_condition(condition);
        set
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Builder form of [`ConditionSet::add_condition`].
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.add_condition(condition);
        self
    }

    /// `true` joins the leaves with `or`, `false` with `and`.
    pub fn set_match_any_condition(&mut self, on: bool) {
        self.join = if on { JoinOperator::Or } else { JoinOperator::And };
    }

    /// Places `set` in the nested slot, replacing any previous nested set.
    pub fn add_nested_condition_set(&mut self, set: ConditionSet) {
        self.nested = Some(Box::new(set));
    }

    /// Number of leaf conditions (the nested set is not counted).
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True when there are no criteria at all.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.nested.is_none()
    }

    pub fn join(&self) -> JoinOperator {
        self.join
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn nested(&self) -> Option<&ConditionSet> {
        self.nested.as_deref()
    }

    /// Compiles the set. An empty set compiles to `{}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        if self.is_empty() {
            return Value::Object(doc);
        }

        let mut compiled: Vec<Value> = self.conditions.iter().map(Condition::to_document).collect();
        if let Some(nested) = &self.nested {
            compiled.push(nested.to_document());
        }

        doc.insert("conditions".to_string(), Value::Array(compiled));
        doc.insert("operator".to_string(), json!(self.join.as_str()));
        Value::Object(doc)
    }
}

impl From<Condition> for ConditionSet {
    fn from(condition: Condition) -> Self {
        Self::single(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_omits_absent_keys() {
        let doc = Condition::equals("name", "Customer").to_document();
        assert_eq!(
            doc,
            json!({"property": "name", "operator": "=", "value": "Customer"})
        );
        assert!(doc.get("negated").is_none());

        let doc = Condition::is_null("short_description", true).to_document();
        assert_eq!(
            doc,
            json!({"property": "short_description", "operator": "isNull", "negated": true})
        );
    }

    #[test]
    fn test_empty_set_compiles_to_empty_document() {
        let set = ConditionSet::new();
        assert!(set.is_empty());
        assert_eq!(set.to_document(), json!({}));

        let mut toggled = ConditionSet::new();
        toggled.set_match_any_condition(true);
        assert_eq!(toggled.to_document(), json!({}));
    }

    #[test]
    fn test_operator_follows_last_toggle() {
        let mut set = ConditionSet::single(Condition::equals("name", "a"));
        assert_eq!(set.to_document()["operator"], "and");

        set.set_match_any_condition(true);
        assert_eq!(set.to_document()["operator"], "or");

        set.set_match_any_condition(false);
        assert_eq!(set.to_document()["operator"], "and");
    }

    #[test]
    fn test_nested_set_appended_after_leaves() {
        let a = Condition::equals("name", "A");
        let b = Condition::equals("name", "B");

        let mut inner = ConditionSet::single(b);
        inner.set_match_any_condition(true);

        let mut outer = ConditionSet::single(a.clone());
        outer.add_nested_condition_set(inner.clone());

        let doc = outer.to_document();
        assert_eq!(doc["operator"], "and");
        assert_eq!(
            doc["conditions"],
            json!([a.to_document(), inner.to_document()])
        );
        assert_eq!(doc["conditions"][1]["operator"], "or");
    }

    #[test]
    fn test_nested_only_set() {
        let mut outer = ConditionSet::new();
        outer.add_nested_condition_set(ConditionSet::single(Condition::equals("_id", "x")));

        assert!(!outer.is_empty());
        assert_eq!(outer.len(), 0);
        let doc = outer.to_document();
        assert_eq!(doc["conditions"].as_array().unwrap().len(), 1);
        assert_eq!(doc["operator"], "and");
    }
}
