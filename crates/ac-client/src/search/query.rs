//! Search request descriptor.

use super::condition::{Condition, ConditionSet};
use serde_json::{json, Map, Value};

/// Value of the `workflowMode` key that asks for draft (development glossary) assets.
pub const WORKFLOW_MODE_DRAFT: &str = "draft";

/// Sort criterion for a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub property: String,
    pub ascending: bool,
}

/// A search request: which types, which properties, which conditions and how to page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    types: Vec<String>,
    properties: Option<Vec<String>>,
    conditions: ConditionSet,
    page_size: Option<u32>,
    begin: Option<u32>,
    sorts: Vec<Sort>,
    dev_glossary: bool,
}

impl SearchQuery {
    /// Searches `target_type` without criteria.
    ///
    /// An empty type name is passed through unchanged; the service reads it as
    /// a search over context (category) assets.
    pub fn new(target_type: &str) -> Self {
        Self {
            types: vec![target_type.to_string()],
            properties: None,
            conditions: ConditionSet::new(),
            page_size: None,
            begin: None,
            sorts: Vec::new(),
            dev_glossary: false,
        }
    }

    pub fn with_conditions(target_type: &str, conditions: ConditionSet) -> Self {
        Self {
            conditions,
            ..Self::new(target_type)
        }
    }

    /// Searches with a single condition.
    pub fn with_condition(target_type: &str, condition: Condition) -> Self {
        Self::with_conditions(target_type, ConditionSet::single(condition))
    }

    /// Searches with an explicit property projection.
    pub fn with_properties(target_type: &str, properties: &[&str], conditions: ConditionSet) -> Self {
        let mut query = Self::with_conditions(target_type, conditions);
        query.set_properties(properties);
        query
    }

    /// Adds another type to search across.
    pub fn add_type(&mut self, asset_type: &str) {
        self.types.push(asset_type.to_string());
    }

    pub fn add_property(&mut self, property: &str) {
        self.properties
            .get_or_insert_with(Vec::new)
            .push(property.to_string());
    }

    pub fn set_properties(&mut self, properties: &[&str]) {
        self.properties = Some(properties.iter().map(|p| p.to_string()).collect());
    }

    pub fn set_conditions(&mut self, conditions: ConditionSet) {
        self.conditions = conditions;
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = Some(page_size);
    }

    pub fn set_begin(&mut self, begin: u32) {
        self.begin = Some(begin);
    }

    pub fn add_sort(&mut self, property: &str, ascending: bool) {
        self.sorts.push(Sort {
            property: property.to_string(),
            ascending,
        });
    }

    /// Includes draft (workflow) assets in the results.
    pub fn set_dev_glossary(&mut self, on: bool) {
        self.dev_glossary = on;
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn properties(&self) -> Option<&[String]> {
        self.properties.as_deref()
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn dev_glossary(&self) -> bool {
        self.dev_glossary
    }

    /// Compiles the request body sent to the search route.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("types".to_string(), json!(self.types));
        if let Some(properties) = &self.properties {
            doc.insert("properties".to_string(), json!(properties));
        }
        if !self.conditions.is_empty() {
            doc.insert("where".to_string(), self.conditions.to_document());
        }
        if let Some(page_size) = self.page_size {
            doc.insert("pageSize".to_string(), json!(page_size));
        }
        if let Some(begin) = self.begin {
            doc.insert("begin".to_string(), json!(begin));
        }
        if !self.sorts.is_empty() {
            let sorts: Vec<Value> = self
                .sorts
                .iter()
                .map(|s| json!({"property": s.property, "ascending": s.ascending}))
                .collect();
            doc.insert("sorts".to_string(), Value::Array(sorts));
        }
        if self.dev_glossary {
            doc.insert("workflowMode".to_string(), json!(WORKFLOW_MODE_DRAFT));
        }
        Value::Object(doc)
    }

    /// Short human-readable description for logs and error messages.
    pub fn describe(&self) -> String {
        let criteria: Vec<String> = self
            .conditions
            .conditions()
            .iter()
            .map(|c| match c.value() {
                Some(value) => format!("{} {} {}", c.property(), c.operator(), value),
                None => format!("{} {}", c.property(), c.operator()),
            })
            .collect();
        if criteria.is_empty() {
            format!("[{}]", self.types.join(","))
        } else {
            format!("[{}] where {}", self.types.join(","), criteria.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_condition_document() {
        let mut query = SearchQuery::with_condition("term", Condition::equals("name", "Customer"));
        query.set_page_size(2);

        assert_eq!(
            query.to_document(),
            json!({
                "types": ["term"],
                "where": {
                    "conditions": [{"property": "name", "operator": "=", "value": "Customer"}],
                    "operator": "and"
                },
                "pageSize": 2
            })
        );
    }

    #[test]
    fn test_no_criteria_omits_where() {
        let query = SearchQuery::new("category");
        let doc = query.to_document();
        assert!(doc.get("where").is_none());
        assert!(doc.get("properties").is_none());
        assert!(doc.get("pageSize").is_none());
    }

    #[test]
    fn test_projection_sorts_and_workflow_mode() {
        let mut query =
            SearchQuery::with_properties("term", &["name", "_context"], ConditionSet::new());
        query.add_type("category");
        query.add_sort("name", true);
        query.set_begin(10);
        query.set_dev_glossary(true);

        let doc = query.to_document();
        assert_eq!(doc["types"], json!(["term", "category"]));
        assert_eq!(doc["properties"], json!(["name", "_context"]));
        assert_eq!(doc["sorts"], json!([{"property": "name", "ascending": true}]));
        assert_eq!(doc["begin"], 10);
        assert_eq!(doc["workflowMode"], "draft");
    }

    #[test]
    fn test_empty_target_type_is_kept() {
        let query = SearchQuery::new("");
        assert_eq!(query.to_document()["types"], json!([""]));
    }

    #[test]
    fn test_describe() {
        let query = SearchQuery::with_condition("term", Condition::equals("_id", "abc"));
        assert_eq!(query.describe(), "[term] where _id = abc");
    }
}
