// ── Ledger entries ──
//
// Entries are reachable through two URL spaces: `/entries/:id` and the
// per-month, per-category `/months/:monthid/categories/:category/entries/:id`.
// Their store files elements under the primary URL only, so an entry that
// arrived through a nested list is still found by a primary lookup.

use chrono::{DateTime, SecondsFormat, Utc};
use checkbook_api::{FieldSource, ParamValue, Params, UrlTemplate, strip_last_segment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::month::{monthid_of, parse_datetime};
use super::{float_field, int_field, string_field};
use crate::error::StoreError;
use crate::store::{Element, Item, Store};

pub const ENTRY_URL: &str = "/entries/:id";
pub const MONTH_ENTRIES_URL: &str = "/months/:monthid/categories/:category/entries/:id";

/// Fields whose changes move an entry between lists.
const WATCHED: [&str; 2] = ["datetime", "category"];

pub fn entry_params() -> Params {
    Params::from([("id", "@id")])
}

/// `monthid` is read from the data when present (collection attributes),
/// otherwise computed from `datetime`.
pub fn month_entries_params() -> Params {
    Params::new()
        .with("monthid", ParamValue::computed(monthid_param))
        .with("category", "@category")
        .with("id", "@id")
}

fn monthid_param(data: Option<&dyn FieldSource>) -> Value {
    let Some(data) = data else {
        return Value::Null;
    };
    data.field("monthid")
        .filter(|v| !v.is_null())
        .or_else(|| {
            data.field("datetime")
                .as_ref()
                .and_then(parse_datetime)
                .map(|dt| Value::from(monthid_of(&dt)))
        })
        .unwrap_or(Value::Null)
}

/// Store for entries.
///
/// - elements are keyed by `/entries/:id`
/// - collections carrying `monthid` and `category` attributes are keyed by
///   the nested list URL, every other collection by `/entries/`
/// - an entry belongs to both lists its fields point at
/// - changing `datetime` or `category` re-files the entry
pub fn entry_store() -> Result<Store, StoreError> {
    let primary = UrlTemplate::new(ENTRY_URL);
    let secondary = UrlTemplate::new(MONTH_ENTRIES_URL);
    let (primary_params, secondary_params) = (entry_params(), month_entries_params());

    let key_fn = {
        let (primary, secondary) = (primary.clone(), secondary.clone());
        let (primary_params, secondary_params) = (primary_params.clone(), secondary_params.clone());
        move |item: &Item| match item {
            Item::Collection(c) if is_nested_list(c) => secondary.expand(&secondary_params, Some(c)),
            Item::Collection(c) => primary.expand(&primary_params, Some(c)),
            Item::Element(e) => primary.expand(&primary_params, Some(e)),
        }
    };

    let associate_fn = move |e: &Element| -> Vec<String> {
        [
            primary.expand(&primary_params, Some(e)),
            secondary.expand(&secondary_params, Some(e)),
        ]
        .iter()
        .map(|key| strip_last_segment(key).to_owned())
        .collect()
    };

    Store::builder()
        .key_fn(key_fn)
        .associate_fn(associate_fn)
        .watch(WATCHED)
        .build()
}

fn is_nested_list(collection: &crate::store::Collection) -> bool {
    let present = |name| collection.attribute(name).is_some_and(|v| !v.is_null());
    present("monthid") && present("category")
}

/// Canonical text form of an entry datetime.
fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Data for an entry that does not exist on the server yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub caption: String,
    pub value: f64,
    pub category: i64,
    pub datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A ledger entry.
#[derive(Debug, Clone)]
pub struct Entry(Element);

impl Entry {
    pub fn new(data: &NewEntry) -> Self {
        let element = Element::new();
        element.set_field("caption", data.caption.as_str());
        element.set_field("value", data.value);
        element.set_field("category", data.category);
        element.set_field("datetime", format_datetime(&data.datetime));
        if let Some(details) = &data.details {
            element.set_field("details", details.as_str());
        }
        Self(element)
    }

    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn into_element(self) -> Element {
        self.0
    }

    // ── Fields ───────────────────────────────────────────────────────

    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn caption(&self) -> String {
        string_field(&self.0, "caption").unwrap_or_default()
    }

    pub fn value(&self) -> f64 {
        float_field(&self.0, "value")
    }

    pub fn category(&self) -> Option<i64> {
        int_field(&self.0, "category")
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.0.get("datetime").as_ref().and_then(parse_datetime)
    }

    pub fn details(&self) -> Option<String> {
        string_field(&self.0, "details")
    }

    /// Months since January 1970 of the entry's datetime.
    pub fn monthid(&self) -> Option<i64> {
        self.datetime().as_ref().map(monthid_of)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    pub fn set_caption(&self, caption: &str) {
        self.0.set_field("caption", caption);
    }

    pub fn set_value(&self, value: f64) {
        self.0.set_field("value", value);
    }

    pub fn set_details(&self, details: Option<&str>) {
        self.0.set_field("details", details);
    }

    /// Change the category. Stores watching `category` re-file the entry.
    pub fn set_category(&self, category: i64) -> bool {
        self.0.set_field("category", category)
    }

    /// Change the datetime. Setting the same instant is not a change,
    /// whatever its textual form.
    pub fn set_datetime(&self, datetime: DateTime<Utc>) -> bool {
        if self.datetime() == Some(datetime) {
            return false;
        }
        self.0.set_field("datetime", format_datetime(&datetime))
    }

    /// Whether both entries have the same caption, value, category,
    /// datetime and details.
    pub fn same_content(&self, other: &Entry) -> bool {
        self.caption() == other.caption()
            && (self.value() - other.value()).abs() < f64::EPSILON
            && self.category() == other.category()
            && self.datetime() == other.datetime()
            && self.details() == other.details()
    }
}

impl From<Element> for Entry {
    fn from(element: Element) -> Self {
        Self(element)
    }
}
