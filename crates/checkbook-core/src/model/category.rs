use checkbook_api::Params;

use super::{int_field, string_field};
use crate::store::Element;

pub const CATEGORY_URL: &str = "/categories/:id";

pub fn category_params() -> Params {
    Params::from([("id", "@id")])
}

/// A spending category (`/categories/:id`).
#[derive(Debug, Clone)]
pub struct Category(Element);

impl Category {
    /// A category that does not exist on the server yet.
    pub fn new(caption: &str) -> Self {
        let element = Element::new();
        element.set_field("caption", caption);
        Self(element)
    }

    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn caption(&self) -> String {
        string_field(&self.0, "caption").unwrap_or_default()
    }

    pub fn set_caption(&self, caption: &str) {
        self.0.set_field("caption", caption);
    }
}

impl From<Element> for Category {
    fn from(element: Element) -> Self {
        Self(element)
    }
}
