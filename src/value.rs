//! Typed attribute values and the coercions used by comparisons.

use std::cmp::Ordering;
use std::fmt;

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A value resolved from a node, bound as a parameter, or written as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Date(OffsetDateTime),
    List(Vec<Value>),
}

/// `Aug 07 2013 16:32:59 GMT+0200`, the ECMA form after its weekday is dropped.
const ECMA_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:short] [day] [year] [hour]:[minute]:[second] GMT[offset_hour sign:mandatory][offset_minute]"
);

const OFFSET_NO_COLON: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

const LOCAL_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

const DATE_ONLY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse the date forms the filter language understands.
///
/// ISO-8601 timestamps without an offset are taken as UTC.
pub fn parse_date(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if let Some(dt) = parse_zoned_date(text) {
        return Some(dt);
    }
    if let Some(local) = text.strip_suffix('Z') {
        return parse_local(local);
    }
    parse_local(text)
}

/// Only the forms that carry an explicit offset: RFC 3339, ISO-8601 with a
/// `+hhmm` offset, and the ECMA `Thu Aug 07 2013 16:32:59 GMT+0200` form.
pub fn parse_zoned_date(text: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(text, OFFSET_NO_COLON) {
        return Some(dt);
    }
    parse_ecma_date(text)
}

fn parse_local(text: &str) -> Option<OffsetDateTime> {
    for format in LOCAL_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(text, *format) {
            return Some(dt.assume_offset(UtcOffset::UTC));
        }
    }
    Date::parse(text, DATE_ONLY)
        .ok()
        .map(|d| d.midnight().assume_offset(UtcOffset::UTC))
}

fn parse_ecma_date(text: &str) -> Option<OffsetDateTime> {
    // Some writers append the zone name, e.g. "... GMT+0200 (CEST)".
    let text = match text.find(" (") {
        Some(idx) => &text[..idx],
        None => text,
    };
    // The weekday is redundant and not checked.
    let (weekday, rest) = text.split_once(' ')?;
    if weekday.len() != 3 || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    OffsetDateTime::parse(rest, ECMA_DATE).ok()
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            Value::Boolean(_) | Value::Null | Value::Date(_) | Value::List(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Long values are read as milliseconds since the Unix epoch.
    pub fn as_date(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Date(dt) => Some(*dt),
            Value::String(s) => parse_date(s),
            Value::Long(millis) => {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000).ok()
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness of a value used on its own as a condition.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Long(n) => *n != 0,
            Value::Double(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) => true,
            Value::List(items) => !items.is_empty(),
        }
    }

    /// The elements of a list, or the value itself as a single element.
    pub fn elements(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Order two scalar values after coercing them to a common type.
    ///
    /// Dates win over numbers, numbers over booleans, booleans over strings.
    /// Returns `None` when the coercion fails or either side is a list or null.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) | (Value::List(_), _) | (_, Value::List(_)) => None,
            (Value::Date(_), _) | (_, Value::Date(_)) => {
                let (a, b) = (self.as_date()?, other.as_date()?);
                Some(a.cmp(&b))
            }
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (l, r) if l.is_number() || r.is_number() => {
                let (a, b) = (l.as_number()?, r.as_number()?);
                a.partial_cmp(&b)
            }
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                let (a, b) = (self.as_bool()?, other.as_bool()?);
                Some(a.cmp(&b))
            }
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Equality under the same coercion rules as [`Value::compare`].
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Build a value from JSON, keeping strings as strings.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Long(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(_) => Value::String(json.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Long(n) => serde_json::Value::from(*n),
            Value::Double(n) => serde_json::Value::from(*n),
            Value::String(_) | Value::Date(_) => serde_json::Value::String(self.to_string()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    /// String form used by `like` and `contains` on text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(dt) => match dt.format(&Rfc3339) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "{:?}", dt),
            },
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Long(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_iso_without_offset_as_utc() {
        assert_eq!(
            parse_date("2013-08-08T16:32:59"),
            Some(datetime!(2013-08-08 16:32:59 UTC))
        );
        assert_eq!(
            parse_date("2013-08-08T16:32:59.250Z"),
            Some(datetime!(2013-08-08 16:32:59.25 UTC))
        );
        assert_eq!(parse_date("2013-08-08"), Some(datetime!(2013-08-08 0:00 UTC)));
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(
            parse_date("2013-08-08T16:32:59+02:00"),
            Some(datetime!(2013-08-08 14:32:59 UTC))
        );
        assert_eq!(
            parse_date("2013-08-08T16:32:59+0200"),
            Some(datetime!(2013-08-08 14:32:59 UTC))
        );
    }

    #[test]
    fn parses_ecma_dates() {
        assert_eq!(
            parse_date("Thu Aug 07 2013 16:32:59 GMT+0200"),
            Some(datetime!(2013-08-07 14:32:59 UTC))
        );
        assert_eq!(
            parse_date("Thu Aug 07 2013 16:32:59 GMT+0200 (CEST)"),
            Some(datetime!(2013-08-07 14:32:59 UTC))
        );
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn zoned_dates_require_an_offset() {
        assert!(parse_zoned_date("2013-08-08T16:32:59Z").is_some());
        assert!(parse_zoned_date("Thu Aug 07 2013 16:32:59 GMT+0200").is_some());
        assert_eq!(parse_zoned_date("2013-08-08"), None);
        assert_eq!(parse_zoned_date("2013-08-08T16:32:59"), None);
    }

    #[test]
    fn compare_coerces_towards_dates_then_numbers() {
        let date = Value::Date(datetime!(2013-08-08 16:32:59 UTC));
        let text = Value::from("2013-08-07T00:00:00");
        assert_eq!(date.compare(&text), Some(Ordering::Greater));

        assert_eq!(Value::from("5").compare(&Value::Long(5)), Some(Ordering::Equal));
        assert_eq!(Value::Double(2.5).compare(&Value::Long(3)), Some(Ordering::Less));
        assert_eq!(Value::from("abc").compare(&Value::Long(3)), None);
        assert_eq!(Value::from("true").compare(&Value::Boolean(true)), Some(Ordering::Equal));
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert_eq!(Value::from("10").compare(&Value::from("9")), Some(Ordering::Less));
        assert!(Value::from("Mongolian").loosely_equals(&Value::from("Mongolian")));
    }

    #[test]
    fn lists_and_null_are_incomparable() {
        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.compare(&Value::from("a")), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn truthiness() {
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Long(0).is_truthy());
        assert!(Value::from(vec![1i64]).is_truthy());
        assert!(!Value::Null.is_truthy());
    }
}
