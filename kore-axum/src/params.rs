//! Query-string parameters -> [`Criteria`].
//!
//! Feathers-style reserved keys control paging and ordering:
//! `$limit`, `$skip` and `$sort[field]=1|-1`. Every other key is an
//! equality filter. Values are matched both as text and, when they parse
//! as a JSON scalar, as that scalar, so `?floor=3` finds `"floor": 3`.
//! The value `null` matches a missing or null field.

use kore_core::{Criteria, Direction, KoreError, Predicate};
use serde_json::Value;

fn parse_usize(key: &str, raw: &str) -> Result<usize, KoreError> {
    raw.parse().map_err(|_| {
        KoreError::bad_request(format!("{key} must be a non-negative integer"))
            .with_errors(serde_json::json!({ key: [format!("invalid value `{raw}`")] }))
    })
}

fn sort_field(key: &str) -> Option<&str> {
    key.strip_prefix("$sort[")?.strip_suffix(']')
}

fn equality(field: &str, raw: &str) -> Predicate {
    if raw == "null" {
        return Predicate::is_null(field);
    }
    let text = Value::String(raw.to_string());
    match serde_json::from_str::<Value>(raw) {
        Ok(parsed @ (Value::Bool(_) | Value::Number(_))) => {
            Predicate::is_in(field, vec![text, parsed])
        }
        _ => Predicate::eq(field, text),
    }
}

/// Build criteria from decoded `(key, value)` pairs, in order.
pub fn criteria_from_query(pairs: &[(String, String)]) -> Result<Criteria, KoreError> {
    let mut criteria = Criteria::new();

    for (key, raw) in pairs {
        match key.as_str() {
            "$limit" => criteria = criteria.limit(parse_usize(key, raw)?),
            "$skip" => criteria = criteria.offset(parse_usize(key, raw)?),
            k if k.starts_with("$sort") => {
                let Some(field) = sort_field(k) else {
                    return Err(KoreError::bad_request(format!("malformed sort key `{k}`")));
                };
                let direction = match raw.as_str() {
                    "1" | "asc" => Direction::Asc,
                    "-1" | "desc" => Direction::Desc,
                    other => {
                        return Err(KoreError::bad_request(format!(
                            "sort direction for `{field}` must be 1 or -1, got `{other}`"
                        )))
                    }
                };
                criteria = criteria.order_by(field, direction);
            }
            k if k.starts_with('$') => {
                return Err(KoreError::bad_request(format!("unsupported query parameter `{k}`")));
            }
            field => criteria = criteria.and_where(equality(field, raw)),
        }
    }

    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reserved_keys_control_paging_and_order() {
        let criteria = criteria_from_query(&pairs(&[
            ("$limit", "10"),
            ("$skip", "20"),
            ("$sort[name]", "-1"),
        ]))
        .unwrap();

        assert_eq!(criteria.limit, Some(10));
        assert_eq!(criteria.offset, Some(20));
        assert_eq!(criteria.order_by.len(), 1);
        assert_eq!(criteria.order_by[0].field.field, "name");
        assert_eq!(criteria.order_by[0].direction, Direction::Desc);
        assert!(criteria.filter.is_none());
    }

    #[test]
    fn numeric_values_match_text_or_number() {
        let criteria = criteria_from_query(&pairs(&[("floor", "3"), ("name", "Tower")])).unwrap();

        assert_eq!(
            criteria.filter,
            Some(Predicate::And(vec![
                Predicate::is_in("floor", vec![json!("3"), json!(3)]),
                Predicate::eq("name", "Tower"),
            ]))
        );
    }

    #[test]
    fn bad_limit_is_a_bad_request() {
        let err = criteria_from_query(&pairs(&[("$limit", "lots")])).unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.errors.is_some());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = criteria_from_query(&pairs(&[("$where", "1=1")])).unwrap_err();
        assert_eq!(err.code(), 400);
    }
}
