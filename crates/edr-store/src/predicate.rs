//! Query evaluation against cache entries

use edr_core::{
    CompiledQuery, EndpointDataReference, Operand, Operator, Predicate, QueryField, SortOrder,
};
use std::cmp::Ordering;

/// Read a field of a cache entry
pub fn field_value<'a>(
    field: &QueryField,
    transfer_process_id: &'a str,
    edr: &'a EndpointDataReference,
) -> Option<&'a str> {
    match field {
        QueryField::TransferProcessId => Some(transfer_process_id),
        QueryField::Id => Some(&edr.id),
        QueryField::ContractId => Some(&edr.contract_id),
        QueryField::Endpoint => Some(&edr.endpoint),
        QueryField::AuthKey => edr.auth_key.as_deref(),
        QueryField::Property(key) => edr.properties.get(key).map(String::as_str),
    }
}

/// Check one predicate; a missing field only satisfies `!=`
pub fn test_predicate(
    predicate: &Predicate,
    transfer_process_id: &str,
    edr: &EndpointDataReference,
) -> bool {
    let value = field_value(&predicate.field, transfer_process_id, edr);
    let Some(value) = value else {
        return predicate.operator == Operator::NotEq;
    };

    match (&predicate.operand, predicate.operator) {
        (Operand::List(items), Operator::In) => items.iter().any(|item| item == value),
        (Operand::Single(expected), op) => match op {
            Operator::Eq => value == expected,
            Operator::NotEq => value != expected,
            Operator::Like => like(expected, value),
            Operator::Lt => value < expected.as_str(),
            Operator::Le => value <= expected.as_str(),
            Operator::Gt => value > expected.as_str(),
            Operator::Ge => value >= expected.as_str(),
            Operator::In => false,
        },
        (Operand::List(_), _) => false,
    }
}

/// Check every predicate of a query
pub fn matches(query: &CompiledQuery, transfer_process_id: &str, edr: &EndpointDataReference) -> bool {
    query
        .predicates
        .iter()
        .all(|predicate| test_predicate(predicate, transfer_process_id, edr))
}

/// Filter, sort and page a snapshot of `(transfer_process_id, edr)` entries
///
/// Without a sort field the snapshot order is kept and the result stays lazy. Sorting
/// has to see every match first.
pub fn evaluate(
    query: CompiledQuery,
    snapshot: Vec<(String, EndpointDataReference)>,
) -> Box<dyn Iterator<Item = EndpointDataReference> + Send> {
    let offset = query.offset;
    let limit = query.limit;

    match query.sort_field.clone() {
        None => Box::new(
            snapshot
                .into_iter()
                .filter(move |(tp, edr)| matches(&query, tp, edr))
                .map(|(_, edr)| edr)
                .skip(offset)
                .take(limit),
        ),
        Some(field) => {
            let mut hits: Vec<_> = snapshot
                .into_iter()
                .filter(|(tp, edr)| matches(&query, tp, edr))
                .collect();
            hits.sort_by(|(tp_a, a), (tp_b, b)| {
                let ordering = compare_optional(
                    field_value(&field, tp_a, a),
                    field_value(&field, tp_b, b),
                );
                match query.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
            Box::new(hits.into_iter().map(|(_, edr)| edr).skip(offset).take(limit))
        }
    }
}

// Entries lacking the sort field come first in ascending order.
fn compare_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one
pub fn like(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some(&c) if c == '_' || c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    v = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_core::{Criterion, QuerySpec};
    use proptest::prelude::*;

    fn entry(tp: &str, id: &str, contract: &str) -> (String, EndpointDataReference) {
        (
            tp.to_string(),
            EndpointDataReference::new(id, contract, format!("http://peer/{id}")),
        )
    }

    fn run(query: QuerySpec, snapshot: Vec<(String, EndpointDataReference)>) -> Vec<String> {
        evaluate(query.compile(1000).unwrap(), snapshot)
            .map(|edr| edr.id)
            .collect()
    }

    #[test]
    fn like_patterns() {
        assert!(like("http://%", "http://peer/data"));
        assert!(like("%/data", "http://peer/data"));
        assert!(like("a_c", "abc"));
        assert!(like("%", ""));
        assert!(!like("a_c", "ac"));
        assert!(!like("http://%", "https://peer"));
        assert!(like("a%b%c", "aXXbYYc"));
        assert!(!like("a%b%c", "aXXbYY"));
    }

    #[test]
    fn equality_filter() {
        let snapshot = vec![entry("tp-1", "e1", "c1"), entry("tp-2", "e2", "c2")];
        let ids = run(
            QuerySpec::all().filter(Criterion::equals("contractId", "c2")),
            snapshot,
        );
        assert_eq!(ids, ["e2"]);
    }

    #[test]
    fn in_and_range_filters() {
        let snapshot = vec![
            entry("tp-1", "e1", "c1"),
            entry("tp-2", "e2", "c2"),
            entry("tp-3", "e3", "c3"),
        ];
        let ids = run(
            QuerySpec::all().filter(Criterion::new(
                "transferProcessId",
                "in",
                serde_json::json!(["tp-1", "tp-3"]),
            )),
            snapshot.clone(),
        );
        assert_eq!(ids, ["e1", "e3"]);

        let ids = run(
            QuerySpec::all().filter(Criterion::new("contractId", ">=", "c2")),
            snapshot,
        );
        assert_eq!(ids, ["e2", "e3"]);
    }

    #[test]
    fn every_operator_through_evaluate() {
        let snapshot = vec![
            entry("tp-1", "e1", "c1"),
            entry("tp-2", "e2", "c2"),
            entry("tp-3", "e3", "c3"),
        ];
        let cases: [(&str, serde_json::Value, &[&str]); 9] = [
            ("=", "c2".into(), &["e2"]),
            ("!=", "c2".into(), &["e1", "e3"]),
            ("in", serde_json::json!(["c1", "c3", "c9"]), &["e1", "e3"]),
            ("like", "c%".into(), &["e1", "e2", "e3"]),
            ("LIKE", "_3".into(), &["e3"]),
            ("<", "c2".into(), &["e1"]),
            ("<=", "c2".into(), &["e1", "e2"]),
            (">", "c2".into(), &["e3"]),
            (">=", "c2".into(), &["e2", "e3"]),
        ];

        for (operator, operand, expected) in cases {
            let ids = run(
                QuerySpec::all().filter(Criterion::new("contractId", operator, operand)),
                snapshot.clone(),
            );
            assert_eq!(ids, expected, "operator {operator}");
        }
    }

    #[test]
    fn missing_property_only_matches_not_equal() {
        let mut with_prop = entry("tp-1", "e1", "c1");
        with_prop.1.properties.insert("cid".into(), "x".into());
        let snapshot = vec![with_prop, entry("tp-2", "e2", "c2")];

        let ids = run(
            QuerySpec::all().filter(Criterion::equals("properties.cid", "x")),
            snapshot.clone(),
        );
        assert_eq!(ids, ["e1"]);

        let ids = run(
            QuerySpec::all().filter(Criterion::new("properties.cid", "!=", "x")),
            snapshot,
        );
        assert_eq!(ids, ["e2"]);
    }

    #[test]
    fn sort_and_page() {
        let snapshot = vec![
            entry("tp-1", "e1", "c3"),
            entry("tp-2", "e2", "c1"),
            entry("tp-3", "e3", "c2"),
        ];
        let ids = run(
            QuerySpec::all()
                .sorted_by("contractId", SortOrder::Desc)
                .page(1, 5),
            snapshot,
        );
        assert_eq!(ids, ["e3", "e2"]);
    }

    proptest! {
        /// Paging never yields more than the limit, and never more than the matches after offset
        #[test]
        fn paging_bounds(count in 0usize..40, offset in 0usize..50, limit in 1usize..20) {
            let snapshot: Vec<_> = (0..count)
                .map(|i| entry(&format!("tp-{i:02}"), &format!("e{i:02}"), "c"))
                .collect();
            let ids = run(QuerySpec::all().page(offset, limit), snapshot);
            prop_assert_eq!(ids.len(), count.saturating_sub(offset).min(limit));
        }

        /// Ascending and descending sorts are mirror images when keys are distinct
        #[test]
        fn sort_orders_mirror(count in 1usize..30) {
            let snapshot: Vec<_> = (0..count)
                .map(|i| entry(&format!("tp-{i:02}"), &format!("e{:02}", count - i), "c"))
                .collect();
            let asc = run(QuerySpec::all().sorted_by("id", SortOrder::Asc).page(0, 100), snapshot.clone());
            let mut desc = run(QuerySpec::all().sorted_by("id", SortOrder::Desc).page(0, 100), snapshot);
            desc.reverse();
            prop_assert_eq!(asc, desc);
        }

        /// A literal pattern without wildcards behaves like equality
        #[test]
        fn literal_like_is_equality(a in "[a-z]{0,8}", b in "[a-z]{0,8}") {
            prop_assert_eq!(like(&a, &b), a == b);
        }
    }
}
