use std::ops::RangeInclusive;

use time::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::context::Function;
use crate::resource::Attributed;
use crate::value::Value;

/// `name()`: last segment of the node's path.
#[derive(Debug, Clone, Copy)]
pub struct Name;

impl Function for Name {
    fn arity(&self) -> RangeInclusive<usize> {
        0..=0
    }

    fn call(&self, node: &dyn Attributed, _args: &[Value]) -> Option<Value> {
        Some(Value::String(node.name().into_owned()))
    }
}

/// `path()`: absolute path of the node.
#[derive(Debug, Clone, Copy)]
pub struct Path;

impl Function for Path {
    fn arity(&self) -> RangeInclusive<usize> {
        0..=0
    }

    fn call(&self, node: &dyn Attributed, _args: &[Value]) -> Option<Value> {
        Some(Value::String(node.path().into_owned()))
    }
}

/// `date(text)` or `date(text, format)`.
///
/// Without a format the usual ISO-8601 and ECMA forms are accepted and a
/// long is read as epoch milliseconds. The format uses `time`'s description
/// syntax, e.g. `'[day].[month].[year]'`; missing offsets mean UTC.
#[derive(Debug, Clone, Copy)]
pub struct DateOf;

impl DateOf {
    fn with_format(text: &str, format: &str) -> Option<OffsetDateTime> {
        let items = format_description::parse(format).ok()?;
        if let Ok(dt) = OffsetDateTime::parse(text, &items) {
            return Some(dt);
        }
        if let Ok(dt) = PrimitiveDateTime::parse(text, &items) {
            return Some(dt.assume_offset(UtcOffset::UTC));
        }
        Date::parse(text, &items)
            .ok()
            .map(|d| d.midnight().assume_offset(UtcOffset::UTC))
    }
}

impl Function for DateOf {
    fn arity(&self) -> RangeInclusive<usize> {
        1..=2
    }

    fn call(&self, _node: &dyn Attributed, args: &[Value]) -> Option<Value> {
        let parsed = match args {
            [value] => value.as_date(),
            [value, format] => Self::with_format(&value.to_string(), &format.to_string()),
            _ => None,
        };
        parsed.map(Value::Date)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use time::macros::datetime;

    struct Fixed;

    impl Attributed for Fixed {
        fn name(&self) -> Cow<'_, str> {
            Cow::Borrowed("page1")
        }

        fn path(&self) -> Cow<'_, str> {
            Cow::Borrowed("/content/page1")
        }

        fn resolve(&self, _path: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn name_and_path() {
        assert_eq!(Name.call(&Fixed, &[]), Some(Value::from("page1")));
        assert_eq!(Path.call(&Fixed, &[]), Some(Value::from("/content/page1")));
    }

    #[test]
    fn date_without_format() {
        assert_eq!(
            DateOf.call(&Fixed, &[Value::from("2013-08-08T16:32:59")]),
            Some(Value::Date(datetime!(2013-08-08 16:32:59 UTC)))
        );
        assert_eq!(
            DateOf.call(&Fixed, &[Value::Long(0)]),
            Some(Value::Date(OffsetDateTime::UNIX_EPOCH))
        );
        assert_eq!(DateOf.call(&Fixed, &[Value::from("soon")]), None);
    }

    #[test]
    fn date_with_format() {
        let args = [Value::from("08.08.2013"), Value::from("[day].[month].[year]")];
        assert_eq!(
            DateOf.call(&Fixed, &args),
            Some(Value::Date(datetime!(2013-08-08 0:00 UTC)))
        );
        let bad = [Value::from("08.08.2013"), Value::from("[nonsense")];
        assert_eq!(DateOf.call(&Fixed, &bad), None);
    }
}
