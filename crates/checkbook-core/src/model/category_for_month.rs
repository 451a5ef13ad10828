use checkbook_api::Params;

use super::{float_field, int_field, string_field, sum_values};
use crate::store::{Collection, Element};

pub const CATEGORIES_FOR_MONTH_URL: &str = "/months/:monthid/categories/:id";

pub fn category_for_month_params() -> Params {
    Params::from([("monthid", "@monthid"), ("id", "@id")])
}

/// A category together with its total for one month
/// (`/months/:monthid/categories/:id`). Read-only on the server.
#[derive(Debug, Clone)]
pub struct CategoryForMonth(Element);

impl CategoryForMonth {
    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn monthid(&self) -> Option<i64> {
        int_field(&self.0, "monthid")
    }

    pub fn caption(&self) -> String {
        string_field(&self.0, "caption").unwrap_or_default()
    }

    /// The value reported by the server.
    pub fn value(&self) -> f64 {
        float_field(&self.0, "value")
    }

    /// Sum of the entry values when the entries are loaded, otherwise the
    /// server's value.
    pub fn total(&self, entries: Option<&Collection>) -> f64 {
        match entries {
            Some(entries) => sum_values(&entries.members()),
            None => self.value(),
        }
    }
}

impl From<Element> for CategoryForMonth {
    fn from(element: Element) -> Self {
        Self(element)
    }
}
