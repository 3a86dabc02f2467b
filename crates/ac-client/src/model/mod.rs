//! Typed model for catalog payloads.
//!
//! Every payload carries a `_type` discriminator. The [`TypeRegistry`] maps
//! discriminators to [`ShapeDescriptor`]s; registered types decode into an
//! [`Asset`], anything else falls back to a bare [`Reference`].

pub mod asset;
pub mod identity;
pub mod reference;
pub mod registry;

pub use asset::{Asset, ContextSlot, PropertyValue};
pub use identity::Identity;
pub use reference::{PageState, Paging, Reference, ReferenceList};
pub use registry::{FieldKind, ShapeDescriptor, TypeRegistry, MAIN_OBJECT_RELATIONSHIPS};

use serde::{Serialize, Serializer};

/// A decoded payload: either a registered shape or the minimal fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogObject {
    Reference(Reference),
    Asset(Box<Asset>),
}

impl CatalogObject {
    pub fn reference(&self) -> &Reference {
        match self {
            CatalogObject::Reference(reference) => reference,
            CatalogObject::Asset(asset) => asset.reference(),
        }
    }

    pub fn id(&self) -> &str {
        &self.reference().id
    }

    pub fn asset_type(&self) -> &str {
        &self.reference().asset_type
    }

    pub fn is_asset(&self) -> bool {
        matches!(self, CatalogObject::Asset(_))
    }

    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            CatalogObject::Asset(asset) => Some(asset),
            CatalogObject::Reference(_) => None,
        }
    }

    pub fn as_asset_mut(&mut self) -> Option<&mut Asset> {
        match self {
            CatalogObject::Asset(asset) => Some(asset),
            CatalogObject::Reference(_) => None,
        }
    }

    /// Converts into an asset; a bare reference becomes an unresolved stub.
    pub fn into_asset(self) -> Asset {
        match self {
            CatalogObject::Asset(asset) => *asset,
            CatalogObject::Reference(reference) => Asset::stub(reference),
        }
    }
}

impl Serialize for CatalogObject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CatalogObject::Reference(reference) => reference.serialize(serializer),
            CatalogObject::Asset(asset) => asset.serialize(serializer),
        }
    }
}
