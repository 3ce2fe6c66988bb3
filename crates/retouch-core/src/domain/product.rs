//! Product as exposed by the host catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{AssetRef, ProductId};

/// Record kind that reconciliation and submission accept.
pub const PRODUCT_KIND: &str = "product";

/// Attribute names read from the catalog.
pub mod attr {
    pub const BRAND: &str = "brand";
    pub const MODEL: &str = "model";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const DIAMETER: &str = "diameter";
    pub const LOAD_INDEX: &str = "load_index";
    pub const SPEED_INDEX: &str = "speed_index";
    pub const SEASON: &str = "season";
}

fn default_kind() -> String {
    PRODUCT_KIND.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Record type in the host (a post id may also denote a page, an order, ...).
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Main photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetRef>,
}

impl Product {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            kind: default_kind(),
            attributes: BTreeMap::new(),
            image: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_image(mut self, image: AssetRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Missing attributes read as empty strings.
    pub fn attribute(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn is_product(&self) -> bool {
        self.kind == PRODUCT_KIND
    }
}
