// ── Domain model ──
//
// Typed views over store elements. Each view wraps a shared `Element`, so
// reads always see the current field values and writes go through the
// element's change notification.

mod category;
mod category_for_month;
mod entry;
mod month;

pub use category::{CATEGORY_URL, Category, category_params};
pub use category_for_month::{CATEGORIES_FOR_MONTH_URL, CategoryForMonth, category_for_month_params};
pub use entry::{
    ENTRY_URL, Entry, MONTH_ENTRIES_URL, NewEntry, entry_params, entry_store, month_entries_params,
};
pub use month::{MONTH_URL, Month, month_label, month_params, monthid_of, parse_datetime};

use serde_json::Value;

use crate::store::Element;

// ── Field helpers ────────────────────────────────────────────────────

pub(crate) fn int_field(element: &Element, name: &str) -> Option<i64> {
    element.get(name).and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

pub(crate) fn float_field(element: &Element, name: &str) -> f64 {
    element
        .get(name)
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or_default()
}

pub(crate) fn string_field(element: &Element, name: &str) -> Option<String> {
    match element.get(name)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Sum of the `value` fields of `elements`.
pub(crate) fn sum_values(elements: &[Element]) -> f64 {
    elements.iter().map(|e| float_field(e, "value")).sum()
}
