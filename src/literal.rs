//! GraphQL value literals (argument defaults) as engine values.

use async_graphql::{Name, Value as ConstValue};
use graphql_parser::query::{Definition, Document, OperationDefinition, Selection, Value};

pub fn to_const_value(value: &Value<String>) -> Result<ConstValue, String> {
    Ok(match value {
        Value::Variable(name) => return Err(format!("variable ${name} is not a constant")),
        Value::Int(n) => n
            .as_i64()
            .map(ConstValue::from)
            .ok_or_else(|| "integer literal out of range".to_string())?,
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(ConstValue::Number)
            .ok_or_else(|| format!("float literal {f} is not finite"))?,
        Value::String(s) => ConstValue::String(s.clone()),
        Value::Boolean(b) => ConstValue::Boolean(*b),
        Value::Null => ConstValue::Null,
        Value::Enum(e) => ConstValue::Enum(Name::new(e)),
        Value::List(items) => ConstValue::List(
            items
                .iter()
                .map(to_const_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(fields) => ConstValue::Object(
            fields
                .iter()
                .map(|(k, v)| Ok((Name::new(k), to_const_value(v)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}

/// Parses literal text such as `"abc"`, `[1, 2]` or `{a: RED}`.
///
/// Introspection reports default values in this form.
pub fn parse_literal(text: &str) -> Result<ConstValue, String> {
    let wrapped = format!("{{ f(v: {text}) }}");
    let doc: Document<String> = graphql_parser::parse_query(&wrapped)
        .map_err(|e| format!("invalid literal {text:?}: {e}"))?;

    let value = doc.definitions.first().and_then(|def| match def {
        Definition::Operation(OperationDefinition::SelectionSet(ss)) => {
            ss.items.first().and_then(|sel| match sel {
                Selection::Field(field) => field.arguments.first().map(|(_, v)| v),
                _ => None,
            })
        }
        _ => None,
    });

    match value {
        Some(v) if doc.definitions.len() == 1 => to_const_value(v),
        _ => Err(format!("invalid literal {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::value;

    #[test]
    fn parses_scalar_literals() {
        assert_eq!(parse_literal("42").unwrap(), value!(42));
        assert_eq!(parse_literal("\"hi\"").unwrap(), value!("hi"));
        assert_eq!(parse_literal("true").unwrap(), value!(true));
        assert_eq!(parse_literal("null").unwrap(), ConstValue::Null);
        assert_eq!(
            parse_literal("RED").unwrap(),
            ConstValue::Enum(Name::new("RED"))
        );
    }

    #[test]
    fn parses_nested_literals() {
        let parsed = parse_literal("{limit: 10, tags: [\"a\", \"b\"]}").unwrap();
        assert_eq!(parsed, value!({ "limit": 10, "tags": ["a", "b"] }));
    }

    #[test]
    fn rejects_variables_and_garbage() {
        assert!(parse_literal("$x").is_err());
        assert!(parse_literal("{{").is_err());
    }
}
