//! Ordering comparator (spec §4.8): a total order over `Value` used for
//! ORDER BY, `min`/`max`, and percentile sorting, plus a separate
//! null-propagating partial order used by the `<`/`<=`/`>`/`>=` operators.

use std::cmp::Ordering;

use crate::temporal::TemporalValue;
use crate::value::Value;

/// Total order: nulls sort last, booleans false < true, numbers compare as
/// floats, strings by code-unit order, nodes/relationships by id, paths and
/// same-kind temporal values by their canonical rank, and any remaining
/// cross-type pair falls back to comparing the two values' string form
/// (spec: "the comparator is total").
pub fn order_cmp(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Greater,
        (_, Null) => Ordering::Less,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(_) | Float(_), Int(_) | Float(_)) => a
            .as_f64()
            .unwrap()
            .partial_cmp(&b.as_f64().unwrap())
            .unwrap_or(Ordering::Equal),
        (String(x), String(y)) => x.cmp(y),
        (Node(x), Node(y)) => x.id.cmp(&y.id),
        (Relationship(x), Relationship(y)) => x.id.cmp(&y.id),
        (Path(x), Path(y)) => {
            let xs: Vec<u64> = x.nodes.iter().map(|n| n.id).collect();
            let ys: Vec<u64> = y.nodes.iter().map(|n| n.id).collect();
            xs.cmp(&ys).then_with(|| {
                let xr: Vec<u64> = x.relationships.iter().map(|r| r.id).collect();
                let yr: Vec<u64> = y.relationships.iter().map(|r| r.id).collect();
                xr.cmp(&yr)
            })
        }
        (Temporal(x), Temporal(y)) if same_temporal_kind(x, y) => x.order_rank().cmp(&y.order_rank()),
        (List(x), List(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let c = order_cmp(xi, yi);
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn same_temporal_kind(a: &TemporalValue, b: &TemporalValue) -> bool {
    a.kind_name() == b.kind_name()
}

/// Partial order used by `<`, `<=`, `>`, `>=` (spec §4.7 step 10): `None`
/// means the comparison yields `null` (either operand is null, or the pair
/// isn't ordered-comparable), matching the operators' null-propagation
/// rule rather than the total, nulls-last ORDER BY order.
pub fn partial_cmp_for_operator(a: &Value, b: &Value) -> Option<Ordering> {
    use Value::*;
    match (a, b) {
        (Null, _) | (_, Null) => None,
        (Int(_) | Float(_), Int(_) | Float(_)) => a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap()),
        (String(x), String(y)) => Some(x.cmp(y)),
        (Bool(x), Bool(y)) => Some(x.cmp(y)),
        (Node(x), Node(y)) => Some(x.id.cmp(&y.id)),
        (Relationship(x), Relationship(y)) => Some(x.id.cmp(&y.id)),
        (Temporal(x), Temporal(y)) if same_temporal_kind(x, y) => Some(x.order_rank().cmp(&y.order_rank())),
        (List(x), List(y)) => Some(order_cmp(&List(x.clone()), &List(y.clone()))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NodeValue;
    use std::collections::BTreeMap;

    #[test]
    fn nulls_sort_last_in_total_order() {
        assert_eq!(order_cmp(&Value::Null, &Value::Int(1)), Ordering::Greater);
    }

    #[test]
    fn comparison_operator_propagates_null() {
        assert_eq!(partial_cmp_for_operator(&Value::Null, &Value::Int(1)), None);
    }

    #[test]
    fn nodes_order_by_id() {
        let a = Value::Node(NodeValue { id: 1, labels: vec![], properties: BTreeMap::new() });
        let b = Value::Node(NodeValue { id: 2, labels: vec![], properties: BTreeMap::new() });
        assert_eq!(order_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn cross_type_falls_back_to_string_form() {
        assert_eq!(order_cmp(&Value::Int(1), &Value::String("1".to_string())), Ordering::Equal);
    }
}
