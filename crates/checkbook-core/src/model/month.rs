use chrono::{DateTime, Datelike, Utc};
use checkbook_api::Params;
use serde_json::Value;

use super::{float_field, int_field};
use crate::store::Element;

pub const MONTH_URL: &str = "/months/:id";

pub fn month_params() -> Params {
    Params::from([("id", "@id")])
}

/// Months since January 1970 (`0` is January 1970).
pub fn monthid_of(datetime: &DateTime<Utc>) -> i64 {
    (i64::from(datetime.year()) - 1970) * 12 + i64::from(datetime.month0())
}

/// `YYYY-MM` for a month id.
pub fn month_label(monthid: i64) -> String {
    let year = 1970 + monthid.div_euclid(12);
    let month = monthid.rem_euclid(12) + 1;
    format!("{year:04}-{month:02}")
}

/// Read a datetime field: an RFC 3339 string or epoch milliseconds.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// A month summary (`/months/:id`). Read-only on the server.
#[derive(Debug, Clone)]
pub struct Month(Element);

impl Month {
    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn label(&self) -> String {
        self.id().map(month_label).unwrap_or_default()
    }

    /// The value reported by the server.
    pub fn value(&self) -> f64 {
        float_field(&self.0, "value")
    }

    /// Sum of the category totals when categories are loaded, otherwise
    /// the server's value.
    pub fn total<I>(&self, category_totals: Option<I>) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        match category_totals {
            Some(totals) => totals.into_iter().sum(),
            None => self.value(),
        }
    }
}

impl From<Element> for Month {
    fn from(element: Element) -> Self {
        Self(element)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn monthid_counts_from_1970() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let june_2016 = Utc.with_ymd_and_hms(2016, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(monthid_of(&epoch), 0);
        assert_eq!(monthid_of(&june_2016), 557);
        assert_eq!(month_label(557), "2016-06");
    }

    #[test]
    fn datetimes_parse_from_strings_and_millis() {
        let a = parse_datetime(&json!("2016-06-01T00:00:00Z")).unwrap();
        let b = parse_datetime(&json!(1_464_739_200_000_i64)).unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime(&json!(true)).is_none());
    }

    #[test]
    fn total_prefers_category_totals() {
        let month = Month::from(Element::from_value(json!({ "id": 0, "value": 100 })).unwrap());
        assert!((month.total(None::<Vec<f64>>) - 100.0).abs() < f64::EPSILON);
        assert!((month.total(Some(vec![20.0, 30.5])) - 50.5).abs() < f64::EPSILON);
    }
}
