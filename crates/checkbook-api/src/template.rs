// ── URL templates ──
//
// Expands `:placeholder` path templates into concrete paths. The same
// expansion produces request paths and the keys the core store files
// resources under, so it never percent-encodes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Anything that can supply named field values for `@field` accessors.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Value>;
}

impl FieldSource for Map<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}

type ComputeFn = Arc<dyn Fn(Option<&dyn FieldSource>) -> Value + Send + Sync>;

/// Value bound to a template parameter.
#[derive(Clone)]
pub enum ParamValue {
    /// Fixed value.
    Literal(Value),
    /// Read from the data object (`"@name"` in string form).
    Field(String),
    /// Computed from the data object at expansion time.
    Computed(ComputeFn),
}

impl ParamValue {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn computed(
        f: impl Fn(Option<&dyn FieldSource>) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Resolve against optional data. Accessors without data resolve to `None`.
    pub fn resolve(&self, data: Option<&dyn FieldSource>) -> Option<Value> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Field(name) => data.and_then(|d| d.field(name)),
            Self::Computed(f) => Some((**f)(data)),
        }
    }

    /// The literal value, if this is one.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "Literal({value})"),
            Self::Field(name) => write!(f, "Field(@{name})"),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        match s.strip_prefix('@') {
            Some(name) => Self::Field(name.to_owned()),
            None => Self::Literal(Value::String(s.to_owned())),
        }
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::from(s),
            other => Self::Literal(other),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Literal(Value::from(n))
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        Self::Literal(Value::from(n))
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        Self::Literal(Value::from(n))
    }
}

/// Ordered parameter bindings. Later merges override earlier ones while
/// keeping the first insertion position.
#[derive(Debug, Clone, Default)]
pub struct Params(IndexMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// `self` overlaid with `other`.
    pub fn merged(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Literal bindings only, as a JSON field map.
    pub fn literals(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter_map(|(name, value)| value.as_literal().map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ParamValue>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A path template such as `/months/:monthid/categories/:category/entries/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of the `:placeholder` path segments, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        let (_, rest) = split_origin(strip_fragment(&self.template));
        let (path, _) = split_query(rest);
        path.split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .collect()
    }

    /// Fill placeholders from `params`, reading `@field` accessors from `data`.
    ///
    /// - a leading `http(s)://host/` is copied verbatim
    /// - an existing query string is kept
    /// - unresolvable placeholders become empty segments
    /// - parameters not used in the path are appended as query pairs
    /// - any `#fragment` is dropped
    pub fn expand(&self, params: &Params, data: Option<&dyn FieldSource>) -> String {
        let mut remaining = params.0.clone();
        let (origin, rest) = split_origin(strip_fragment(&self.template));
        let (path, query) = split_query(rest);

        let mut substitute = |name: &str| -> String {
            remaining
                .shift_remove(name)
                .and_then(|value| value.resolve(data))
                .map(|value| render(&value))
                .unwrap_or_default()
        };

        let path = path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => substitute(name),
                None => segment.to_owned(),
            })
            .collect::<Vec<_>>()
            .join("/");

        let mut result = format!("{origin}{path}{query}");

        if !remaining.is_empty() {
            let pairs = remaining
                .iter()
                .map(|(name, value)| {
                    let value = value.resolve(data).map(|v| render(&v)).unwrap_or_default();
                    format!("{name}={value}")
                })
                .collect::<Vec<_>>()
                .join("&");
            result.push(if query.is_empty() { '?' } else { '&' });
            result.push_str(&pairs);
        }

        result
    }

    /// Expand without data.
    pub fn expand_params(&self, params: &Params) -> String {
        self.expand(params, None)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Everything up to and including the last `/`.
///
/// Turns an element key (`/entries/7`) into its collection key (`/entries/`).
pub fn strip_last_segment(key: &str) -> String {
    key.rfind('/')
        .map(|idx| key[..=idx].to_owned())
        .unwrap_or_default()
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

/// Split `http(s)://host[:port]/` off the front. Only counts as an origin
/// when a path slash follows the host.
fn split_origin(url: &str) -> (&str, &str) {
    let lower = url.to_ascii_lowercase();
    let scheme_len = if lower.starts_with("https://") {
        "https://".len()
    } else if lower.starts_with("http://") {
        "http://".len()
    } else {
        return ("", url);
    };

    match url[scheme_len..].find('/') {
        Some(idx) if idx > 0 => url.split_at(scheme_len + idx + 1),
        _ => ("", url),
    }
}

fn split_query(rest: &str) -> (&str, &str) {
    rest.find('?').map_or((rest, ""), |idx| rest.split_at(idx))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn copies_origin() {
        let t = UrlTemplate::new("http://www.example.com/path");
        assert_eq!(t.expand_params(&Params::new()), "http://www.example.com/path");
    }

    #[test]
    fn keeps_existing_query() {
        let t = UrlTemplate::new("/path?q1=1&q2=2");
        assert_eq!(t.expand_params(&Params::new()), "/path?q1=1&q2=2");
    }

    #[test]
    fn fills_literals() {
        let t = UrlTemplate::new("/number/:i/string/:s");
        let params = Params::new().with("i", 1).with("s", "string");
        assert_eq!(t.expand_params(&params), "/number/1/string/string");
    }

    #[test]
    fn fills_field_accessors() {
        let t = UrlTemplate::new("/property/:prop");
        let params = Params::new().with("prop", "@target");
        let source = data(json!({ "target": "value" }));
        assert_eq!(t.expand(&params, Some(&source)), "/property/value");
    }

    #[test]
    fn fills_computed_values() {
        let t = UrlTemplate::new("/function/:f");
        let params = Params::new().with(
            "f",
            ParamValue::computed(|data| data.and_then(|d| d.field("n")).unwrap_or(json!(0))),
        );
        let source = data(json!({ "n": 42 }));
        assert_eq!(t.expand(&params, Some(&source)), "/function/42");
    }

    #[test]
    fn appends_unused_params_as_query() {
        let t = UrlTemplate::new("/path");
        let params = Params::new().with("q1", 5).with("q2", "x");
        assert_eq!(t.expand_params(&params), "/path?q1=5&q2=x");
    }

    #[test]
    fn appends_to_existing_query() {
        let t = UrlTemplate::new("/path?p=1");
        let params = Params::new().with("q", "x");
        assert_eq!(t.expand_params(&params), "/path?p=1&q=x");
    }

    #[test]
    fn missing_values_leave_empty_segments() {
        let t = UrlTemplate::new("/entries/:id");
        let params = Params::new().with("id", "@id");
        let source = data(json!({ "caption": "no id yet" }));
        assert_eq!(t.expand(&params, Some(&source)), "/entries/");
        assert_eq!(t.expand_params(&Params::new()), "/entries/");
    }

    #[test]
    fn drops_fragment() {
        let t = UrlTemplate::new("/months/:id#top");
        assert_eq!(t.expand_params(&Params::new().with("id", 3)), "/months/3");
    }

    #[test]
    fn placeholders_in_order() {
        let t = UrlTemplate::new("/months/:monthid/categories/:category/entries/:id");
        assert_eq!(t.placeholders(), vec!["monthid", "category", "id"]);
    }

    #[test]
    fn later_params_override_defaults() {
        let defaults = Params::new().with("id", "@id");
        let merged = defaults.merged(&Params::new().with("id", 7));
        let t = UrlTemplate::new("/categories/:id");
        assert_eq!(t.expand_params(&merged), "/categories/7");
    }

    #[test]
    fn strip_last_segment_keeps_slash() {
        assert_eq!(strip_last_segment("/entries/7"), "/entries/");
        assert_eq!(
            strip_last_segment("/months/3/categories/1/entries/9"),
            "/months/3/categories/1/entries/"
        );
        assert_eq!(strip_last_segment("no-slash"), "");
    }
}
