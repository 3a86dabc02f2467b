//! Extended assets: a reference plus descriptive, relationship and audit attributes.

use super::{Identity, Reference, ReferenceList};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// The ancestry chain of an asset, which many payloads omit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextSlot {
    /// Not known yet; a lookup by id can fill it in.
    #[default]
    Unresolved,
    /// Known, outermost ancestor first. May be empty for top-level assets.
    Resolved(Vec<Reference>),
}

impl ContextSlot {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ContextSlot::Resolved(_))
    }

    pub fn chain(&self) -> Option<&[Reference]> {
        match self {
            ContextSlot::Resolved(chain) => Some(chain),
            ContextSlot::Unresolved => None,
        }
    }

    /// Resolves the slot once. Later calls leave the first chain in place and return it.
    pub fn resolve(&mut self, chain: Vec<Reference>) -> &[Reference] {
        if let ContextSlot::Unresolved = self {
            *self = ContextSlot::Resolved(chain);
        }
        match self {
            ContextSlot::Resolved(chain) => chain.as_slice(),
            ContextSlot::Unresolved => &[],
        }
    }
}

/// A named attribute of an asset, classified by its decoded shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue<'a> {
    Simple(Value),
    Reference(&'a Reference),
    ReferenceList(&'a ReferenceList),
}

impl PropertyValue<'_> {
    pub fn is_reference(&self) -> bool {
        matches!(self, PropertyValue::Reference(_))
    }

    pub fn is_reference_list(&self) -> bool {
        matches!(self, PropertyValue::ReferenceList(_))
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, PropertyValue::Simple(_))
    }
}

/// An asset decoded through a registered shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub(crate) reference: Reference,
    /// The `name` property, distinct from the display name `_name`.
    pub(crate) name: Option<String>,
    pub(crate) short_description: Option<String>,
    pub(crate) long_description: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) context: ContextSlot,
    pub(crate) relationships: BTreeMap<String, ReferenceList>,
    pub(crate) references: BTreeMap<String, Reference>,
    pub(crate) properties: BTreeMap<String, Value>,
    pub(crate) created_by: Option<String>,
    pub(crate) created_on: Option<DateTime<Utc>>,
    pub(crate) modified_by: Option<String>,
    pub(crate) modified_on: Option<DateTime<Utc>>,
    pub(crate) identity: Option<Identity>,
}

impl Asset {
    /// An asset known only by its reference, e.g. a relationship stub.
    pub fn stub(reference: Reference) -> Self {
        Self {
            reference,
            name: None,
            short_description: None,
            long_description: None,
            description: None,
            context: ContextSlot::Unresolved,
            relationships: BTreeMap::new(),
            references: BTreeMap::new(),
            properties: BTreeMap::new(),
            created_by: None,
            created_on: None,
            modified_by: None,
            modified_on: None,
            identity: None,
        }
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn id(&self) -> &str {
        &self.reference.id
    }

    pub fn asset_type(&self) -> &str {
        &self.reference.asset_type
    }

    /// The `_name` display name.
    pub fn display_name(&self) -> &str {
        &self.reference.name
    }

    pub fn url(&self) -> &str {
        &self.reference.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn short_description(&self) -> Option<&str> {
        self.short_description.as_deref()
    }

    pub fn long_description(&self) -> Option<&str> {
        self.long_description.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    pub fn modified_by(&self) -> Option<&str> {
        self.modified_by.as_deref()
    }

    pub fn modified_on(&self) -> Option<DateTime<Utc>> {
        self.modified_on
    }

    pub fn context_slot(&self) -> &ContextSlot {
        &self.context
    }

    /// The ancestry chain, if resolved.
    pub fn context(&self) -> Option<&[Reference]> {
        self.context.chain()
    }

    pub fn relationship(&self, name: &str) -> Option<&ReferenceList> {
        self.relationships.get(name)
    }

    /// Names of the relationship collections present on this asset.
    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships.keys().cloned().collect()
    }

    /// Replaces a relationship collection wholesale.
    pub fn set_relationship(&mut self, name: &str, list: ReferenceList) {
        self.relationships.insert(name.to_string(), list);
    }

    pub(crate) fn take_relationship(&mut self, name: &str) -> Option<ReferenceList> {
        self.relationships.remove(name)
    }

    pub fn reference_property(&self, name: &str) -> Option<&Reference> {
        self.references.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Looks up any attribute by its wire name.
    pub fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        if let Some(list) = self.relationships.get(name) {
            return Some(PropertyValue::ReferenceList(list));
        }
        if let Some(reference) = self.references.get(name) {
            return Some(PropertyValue::Reference(reference));
        }
        if let Some(value) = self.properties.get(name) {
            return Some(PropertyValue::Simple(value.clone()));
        }
        let base = match name {
            "_id" => Some(self.reference.id.as_str()),
            "_type" => Some(self.reference.asset_type.as_str()),
            "_name" => Some(self.reference.name.as_str()),
            "_url" => Some(self.reference.url.as_str()),
            "name" => self.name.as_deref(),
            "short_description" => self.short_description.as_deref(),
            "long_description" => self.long_description.as_deref(),
            "description" => self.description.as_deref(),
            "created_by" => self.created_by.as_deref(),
            "modified_by" => self.modified_by.as_deref(),
            _ => None,
        };
        base.map(|v| PropertyValue::Simple(json!(v)))
    }

    /// Fills in the ancestry chain and `name` when the context is still unresolved.
    ///
    /// Nothing else on the asset is touched. Returns false if it was already resolved.
    pub(crate) fn resolve_context(&mut self, name: String, chain: Vec<Reference>) -> bool {
        if self.context.is_resolved() {
            return false;
        }
        self.name = Some(name);
        self.context.resolve(chain);
        true
    }

    /// The identity, computed on first call once the context is resolved.
    pub fn identity(&mut self) -> Option<Identity> {
        if let Some(identity) = &self.identity {
            return Some(identity.clone());
        }
        let chain = self.context.chain()?;
        let identity = Identity::new(chain, &self.reference.asset_type, &self.reference.name);
        self.identity = Some(identity.clone());
        Some(identity)
    }

    pub fn cached_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Renders the asset back into its wire form.
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".to_string(), json!(self.reference.id));
        doc.insert("_type".to_string(), json!(self.reference.asset_type));
        doc.insert("_name".to_string(), json!(self.reference.name));
        doc.insert("_url".to_string(), json!(self.reference.url));
        if let Some(chain) = self.context.chain() {
            doc.insert("_context".to_string(), json!(chain));
        }
        let text_fields = [
            ("name", &self.name),
            ("short_description", &self.short_description),
            ("long_description", &self.long_description),
            ("description", &self.description),
            ("created_by", &self.created_by),
            ("modified_by", &self.modified_by),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                doc.insert(key.to_string(), json!(value));
            }
        }
        if let Some(created_on) = self.created_on {
            doc.insert("created_on".to_string(), json!(created_on.to_rfc3339()));
        }
        if let Some(modified_on) = self.modified_on {
            doc.insert("modified_on".to_string(), json!(modified_on.to_rfc3339()));
        }
        for (key, reference) in &self.references {
            doc.insert(key.clone(), json!(reference));
        }
        for (key, list) in &self.relationships {
            doc.insert(key.clone(), json!(list));
        }
        for (key, value) in &self.properties {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

/// Reads a timestamp sent either as epoch milliseconds or as an RFC 3339 string.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paging;

    fn term_stub() -> Asset {
        Asset::stub(Reference::new("t1", "term", "Customer", "https://infosvr/assets/t1"))
    }

    #[test]
    fn test_context_slot_resolves_once() {
        let mut slot = ContextSlot::Unresolved;
        assert!(!slot.is_resolved());

        let first = vec![Reference::new("c1", "category", "Finance", "")];
        assert_eq!(slot.resolve(first).len(), 1);

        let chain = slot.resolve(Vec::new());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name, "Finance");
    }

    #[test]
    fn test_resolve_context_only_touches_name_and_context() {
        let mut asset = term_stub();
        asset.short_description = Some("A buyer".to_string());

        let chain = vec![Reference::new("c1", "category", "Finance", "")];
        assert!(asset.resolve_context("Customer".to_string(), chain));
        assert_eq!(asset.name(), Some("Customer"));
        assert_eq!(asset.context().unwrap().len(), 1);
        assert_eq!(asset.short_description(), Some("A buyer"));

        assert!(!asset.resolve_context("Other".to_string(), Vec::new()));
        assert_eq!(asset.name(), Some("Customer"));
    }

    #[test]
    fn test_identity_requires_resolved_context_and_is_cached() {
        let mut asset = term_stub();
        assert!(asset.identity().is_none());

        asset.resolve_context(
            "Customer".to_string(),
            vec![Reference::new("c1", "category", "Finance", "")],
        );
        let identity = asset.identity().unwrap();
        assert_eq!(identity.as_str(), "(category)=Finance::(term)=Customer");
        assert_eq!(asset.cached_identity(), Some(&identity));
    }

    #[test]
    fn test_property_classification() {
        let mut asset = term_stub();
        asset.set_relationship("labels", ReferenceList::new(Vec::new(), Paging::full(0)));
        asset.references.insert(
            "parent_category".to_string(),
            Reference::new("c1", "category", "Finance", ""),
        );
        asset
            .properties
            .insert("status".to_string(), json!("ACCEPTED"));

        assert!(asset.property("labels").unwrap().is_reference_list());
        assert!(asset.property("parent_category").unwrap().is_reference());
        assert!(asset.property("status").unwrap().is_simple());
        assert!(asset.property("_name").unwrap().is_simple());
        assert!(asset.property("missing").is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let from_millis = parse_timestamp(&json!(1_519_307_200_000i64)).unwrap();
        assert_eq!(from_millis.timestamp(), 1_519_307_200);

        let from_string = parse_timestamp(&json!("2018-02-22T13:46:40Z")).unwrap();
        assert_eq!(from_string, from_millis);

        assert!(parse_timestamp(&json!(true)).is_none());
    }

    #[test]
    fn test_to_value_round_trips_base_fields() {
        let asset = term_stub();
        let value = asset.to_value();
        assert_eq!(value["_id"], "t1");
        assert_eq!(value["_type"], "term");
        assert!(value.get("_context").is_none());
    }
}
