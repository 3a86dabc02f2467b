//! Discriminator-driven decoding.
//!
//! Shapes are plain data: each [`ShapeDescriptor`] lists which attributes of a
//! type are relationship collections, single references or retained scalars.
//! That table is what full-detail expansion walks to find collections to drain.

use super::asset::parse_timestamp;
use super::{Asset, CatalogObject, ContextSlot, Paging, Reference, ReferenceList};
use crate::error::{CatalogError, CatalogResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Relationship collections shared by nearly every catalog asset type.
pub const MAIN_OBJECT_RELATIONSHIPS: &[&str] = &[
    "labels",
    "stewards",
    "assigned_to_terms",
    "implements_rules",
    "governed_by_rules",
];

/// Types whose built-in shape is the main-object base.
const BUILTIN_MAIN_OBJECT_TYPES: &[&str] = &[
    "category",
    "term",
    "information_governance_policy",
    "information_governance_rule",
];

/// How a declared attribute is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single `{_id, _type, _name, _url}` object.
    Reference,
    /// An `{items, paging}` collection.
    ReferenceList,
    /// Any other JSON value, kept as-is.
    Simple,
}

/// Describes the attributes decoded for one discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDescriptor {
    type_name: String,
    fields: Vec<(String, FieldKind)>,
}

impl ShapeDescriptor {
    /// A shape with only the common base attributes.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: Vec::new(),
        }
    }

    /// A shape with the base attributes plus the main-object relationships.
    pub fn main_object(type_name: &str) -> Self {
        MAIN_OBJECT_RELATIONSHIPS
            .iter()
            .fold(Self::new(type_name), |shape, name| shape.with_relationship(name))
    }

    pub fn with_relationship(self, name: &str) -> Self {
        self.with_field(name, FieldKind::ReferenceList)
    }

    pub fn with_reference(self, name: &str) -> Self {
        self.with_field(name, FieldKind::Reference)
    }

    pub fn with_property(self, name: &str) -> Self {
        self.with_field(name, FieldKind::Simple)
    }

    /// Declares a field; redeclaring a name changes its kind.
    pub fn with_field(mut self, name: &str, kind: FieldKind) -> Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = kind,
            None => self.fields.push((name.to_string(), kind)),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, k)| *k)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.fields.iter().map(|(n, k)| (n.as_str(), *k))
    }

    /// Names of the declared relationship collections.
    pub fn relationship_fields(&self) -> impl Iterator<Item = &str> {
        self.fields()
            .filter(|(_, kind)| *kind == FieldKind::ReferenceList)
            .map(|(name, _)| name)
    }
}

/// Maps discriminators to shapes for one client.
///
/// Registration is not retroactive: values decoded before a shape was
/// registered keep the shape they were decoded with.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    shapes: HashMap<String, ShapeDescriptor>,
    decoding_started: AtomicBool,
}

impl TypeRegistry {
    /// A registry with no shapes; every payload decodes to a bare reference.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in shapes.
    pub fn with_builtin_shapes() -> Self {
        let mut registry = Self::empty();
        registry.register(ShapeDescriptor::new("label").with_relationship("labeled_assets"));
        for type_name in BUILTIN_MAIN_OBJECT_TYPES {
            registry.register(ShapeDescriptor::main_object(type_name));
        }
        registry
    }

    /// Registers a shape, replacing any earlier shape for the same discriminator.
    pub fn register(&mut self, shape: ShapeDescriptor) {
        if self.decoding_started.load(Ordering::Relaxed) {
            warn!(
                asset_type = %shape.type_name(),
                "Shape registered after decoding started; earlier values keep their old shape"
            );
        }
        debug!(asset_type = %shape.type_name(), "Registering shape");
        self.shapes.insert(shape.type_name().to_string(), shape);
    }

    pub fn is_registered(&self, asset_type: &str) -> bool {
        self.shapes.contains_key(asset_type)
    }

    pub fn shape(&self, asset_type: &str) -> Option<&ShapeDescriptor> {
        self.shapes.get(asset_type)
    }

    /// Registered discriminators, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.shapes.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Decodes a payload through its discriminator.
    pub fn decode(&self, value: &Value) -> CatalogResult<CatalogObject> {
        self.decode_in(value, "payload")
    }

    /// Decodes a payload, naming `context` (usually the source URL) in errors.
    pub fn decode_in(&self, value: &Value, context: &str) -> CatalogResult<CatalogObject> {
        self.decoding_started.store(true, Ordering::Relaxed);
        let asset_type = discriminator(value, context)?;
        match self.shapes.get(asset_type) {
            Some(shape) => Ok(CatalogObject::Asset(Box::new(
                self.decode_with_shape(value, shape, context)?,
            ))),
            None => {
                let reference = Reference::deserialize(value)
                    .map_err(|e| CatalogError::decode(context, e))?;
                Ok(CatalogObject::Reference(reference))
            }
        }
    }

    /// Decodes a payload as an asset, using the main-object base for unregistered types.
    pub fn decode_asset(&self, value: &Value, context: &str) -> CatalogResult<Asset> {
        self.decoding_started.store(true, Ordering::Relaxed);
        let asset_type = discriminator(value, context)?;
        match self.shapes.get(asset_type) {
            Some(shape) => self.decode_with_shape(value, shape, context),
            None => self.decode_with_shape(value, &ShapeDescriptor::main_object(asset_type), context),
        }
    }

    /// Decodes an `{items, paging}` document. Both keys are required.
    pub fn decode_list(&self, value: &Value, context: &str) -> CatalogResult<ReferenceList> {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::decode(context, "missing 'items' array"))?;
        let paging = value
            .get("paging")
            .ok_or_else(|| CatalogError::decode(context, "missing 'paging' cursor"))?;
        let paging = Paging::deserialize(paging)
            .map_err(|e| CatalogError::decode(context, format!("invalid paging cursor: {}", e)))?;

        let items = items
            .iter()
            .map(|item| self.decode_in(item, context))
            .collect::<CatalogResult<Vec<_>>>()?;

        Ok(ReferenceList::new(items, paging))
    }

    fn decode_with_shape(
        &self,
        value: &Value,
        shape: &ShapeDescriptor,
        context: &str,
    ) -> CatalogResult<Asset> {
        let object = value
            .as_object()
            .ok_or_else(|| CatalogError::decode(context, "expected a JSON object"))?;
        let reference =
            Reference::deserialize(value).map_err(|e| CatalogError::decode(context, e))?;

        let name = text(object, "name");
        let chain = match object.get("_context") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(Reference::deserialize)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CatalogError::decode(context, format!("invalid _context: {}", e)))?,
            Some(_) => return Err(CatalogError::decode(context, "'_context' is not an array")),
        };
        let context_slot = if !chain.is_empty() || name.is_some() {
            ContextSlot::Resolved(chain)
        } else {
            ContextSlot::Unresolved
        };

        let mut relationships = BTreeMap::new();
        let mut references = BTreeMap::new();
        let mut properties = BTreeMap::new();
        for (field, kind) in shape.fields() {
            let raw = match object.get(field) {
                None | Some(Value::Null) => continue,
                Some(raw) => raw,
            };
            let field_context = format!("{} ({}.{})", context, shape.type_name(), field);
            match kind {
                FieldKind::ReferenceList => {
                    relationships.insert(field.to_string(), self.decode_list(raw, &field_context)?);
                }
                FieldKind::Reference => {
                    let reference = Reference::deserialize(raw)
                        .map_err(|e| CatalogError::decode(&field_context, e))?;
                    references.insert(field.to_string(), reference);
                }
                FieldKind::Simple => {
                    properties.insert(field.to_string(), raw.clone());
                }
            }
        }

        Ok(Asset {
            reference,
            name,
            short_description: text(object, "short_description"),
            long_description: text(object, "long_description"),
            description: text(object, "description"),
            context: context_slot,
            relationships,
            references,
            properties,
            created_by: text(object, "created_by"),
            created_on: object.get("created_on").and_then(parse_timestamp),
            modified_by: text(object, "modified_by"),
            modified_on: object.get("modified_on").and_then(parse_timestamp),
            identity: None,
        })
    }
}

fn discriminator<'a>(value: &'a Value, context: &str) -> CatalogResult<&'a str> {
    value
        .get("_type")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogError::decode(context, "missing '_type' discriminator"))
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reference_json(id: &str, asset_type: &str, name: &str) -> Value {
        json!({
            "_id": id,
            "_type": asset_type,
            "_name": name,
            "_url": format!("https://infosvr/ibm/iis/igc-rest/v1/assets/{}", id)
        })
    }

    #[test]
    fn test_unknown_discriminator_falls_back_to_reference() {
        let registry = TypeRegistry::with_builtin_shapes();
        let mut payload = reference_json("d1", "database_column", "SALARY");
        payload["data_type"] = json!("DECIMAL");
        payload["_context"] = json!([reference_json("h1", "host", "infosvr")]);

        let decoded = registry.decode(&payload).unwrap();
        match decoded {
            CatalogObject::Reference(reference) => {
                assert_eq!(reference.id, "d1");
                assert_eq!(reference.asset_type, "database_column");
                assert_eq!(reference.name, "SALARY");
                assert_eq!(
                    reference.url,
                    "https://infosvr/ibm/iis/igc-rest/v1/assets/d1"
                );
            }
            other => panic!("Expected a bare reference, got {:?}", other),
        }
    }

    #[test]
    fn test_registered_type_decodes_relationships() {
        let registry = TypeRegistry::with_builtin_shapes();
        let mut payload = reference_json("t1", "term", "Customer");
        payload["short_description"] = json!("A buyer");
        payload["unknown_attribute"] = json!({"nested": true});
        payload["labels"] = json!({
            "items": [reference_json("l1", "label", "PII")],
            "paging": {"numTotal": 1, "pageSize": 10, "begin": 0, "end": 1}
        });
        payload["_context"] = json!([reference_json("c1", "category", "Finance")]);

        let asset = registry.decode(&payload).unwrap().into_asset();
        assert_eq!(asset.short_description(), Some("A buyer"));
        assert_eq!(asset.context().unwrap().len(), 1);

        let labels = asset.relationship("labels").unwrap();
        assert_eq!(labels.len(), 1);
        // label is a registered shape itself
        assert!(labels.items[0].is_asset());
        assert!(asset.property("unknown_attribute").is_none());
    }

    #[test]
    fn test_user_registered_shape() {
        let mut registry = TypeRegistry::with_builtin_shapes();
        registry.register(
            ShapeDescriptor::main_object("database_column")
                .with_property("data_type")
                .with_reference("database_table_or_view"),
        );

        let mut payload = reference_json("d1", "database_column", "SALARY");
        payload["data_type"] = json!("DECIMAL");
        payload["database_table_or_view"] = reference_json("tbl", "database_table", "EMP");

        let asset = registry.decode(&payload).unwrap().into_asset();
        assert!(asset.property("data_type").unwrap().is_simple());
        assert!(asset.property("database_table_or_view").unwrap().is_reference());
        assert_eq!(asset.scalar("data_type"), Some(&json!("DECIMAL")));
    }

    #[test]
    fn test_missing_discriminator_is_decode_error() {
        let registry = TypeRegistry::with_builtin_shapes();
        let err = registry
            .decode_in(&json!({"_id": "x"}), "https://infosvr/assets/x")
            .unwrap_err();
        match err {
            CatalogError::Decode { context, .. } => assert_eq!(context, "https://infosvr/assets/x"),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_list_requires_paging() {
        let registry = TypeRegistry::empty();
        let result = registry.decode_list(&json!({"items": []}), "search");
        assert!(matches!(result, Err(CatalogError::Decode { .. })));
    }

    #[test]
    fn test_context_slot_from_payload() {
        let registry = TypeRegistry::with_builtin_shapes();

        let stub = registry
            .decode(&reference_json("t1", "term", "Customer"))
            .unwrap()
            .into_asset();
        assert!(!stub.context_slot().is_resolved());

        let mut top_level = reference_json("c1", "category", "Finance");
        top_level["name"] = json!("Finance");
        top_level["_context"] = json!([]);
        let top_level = registry.decode(&top_level).unwrap().into_asset();
        assert_eq!(top_level.context(), Some(&[][..]));
    }

    #[test]
    fn test_decode_asset_uses_base_shape_for_unknown_types() {
        let registry = TypeRegistry::empty();
        let mut payload = reference_json("d1", "database_column", "SALARY");
        payload["_context"] = json!([reference_json("h1", "host", "infosvr")]);
        payload["stewards"] = json!({"items": [], "paging": {"numTotal": 0, "end": -1}});

        let asset = registry.decode_asset(&payload, "search").unwrap();
        assert_eq!(asset.context().unwrap()[0].name, "infosvr");
        assert!(asset.relationship("stewards").unwrap().is_empty());
    }

    #[test]
    fn test_shape_descriptor_relationship_fields() {
        let shape = ShapeDescriptor::main_object("term")
            .with_relationship("assigned_assets")
            .with_property("status");
        let fields: Vec<&str> = shape.relationship_fields().collect();
        assert_eq!(fields.len(), MAIN_OBJECT_RELATIONSHIPS.len() + 1);
        assert!(fields.contains(&"assigned_assets"));
        assert_eq!(shape.field_kind("status"), Some(FieldKind::Simple));

        let shape = shape.with_field("status", FieldKind::Reference);
        assert_eq!(shape.field_kind("status"), Some(FieldKind::Reference));
    }

    #[test]
    fn test_builtin_shapes() {
        let registry = TypeRegistry::with_builtin_shapes();
        assert_eq!(
            registry.registered_types(),
            vec![
                "category",
                "information_governance_policy",
                "information_governance_rule",
                "label",
                "term"
            ]
        );
        assert_eq!(
            registry.shape("label").unwrap().field_kind("labeled_assets"),
            Some(FieldKind::ReferenceList)
        );
    }
}
