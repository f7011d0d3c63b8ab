use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use skein_core::error::Result;
use skein_core::traits::Condition;
use skein_core::types::{Payload, Results};

/// Always fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Condition for Always {
    fn evaluate(&self, _results: &Results) -> Result<bool> {
        Ok(true)
    }
}

/// Fires once the named node has produced an output in this run.
#[derive(Debug, Clone)]
pub struct KeyPresent {
    node: String,
}

impl KeyPresent {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Condition for KeyPresent {
    fn evaluate(&self, results: &Results) -> Result<bool> {
        Ok(results.contains(&self.node))
    }
}

/// Comparison operator for [`Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Apply the operator. Numbers compare by value regardless of their
    /// integer/float representation; ordering operators on anything other
    /// than two numbers are false.
    pub fn apply(self, actual: &Payload, expected: &Payload) -> bool {
        let ordering = numeric_cmp(actual, expected);
        match self {
            CompareOp::Eq => ordering.map_or(actual == expected, Ordering::is_eq),
            CompareOp::Ne => ordering.map_or(actual != expected, Ordering::is_ne),
            CompareOp::Gt => ordering.is_some_and(Ordering::is_gt),
            CompareOp::Ge => ordering.is_some_and(Ordering::is_ge),
            CompareOp::Lt => ordering.is_some_and(Ordering::is_lt),
            CompareOp::Le => ordering.is_some_and(Ordering::is_le),
        }
    }
}

/// Integers compare exactly; floats and mixed operands go through `f64`.
/// `None` unless both sides are numbers (or a float is NaN).
fn numeric_cmp(a: &Payload, b: &Payload) -> Option<Ordering> {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn as_integer(value: &Payload) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

/// Compares a node's last output against a fixed value. False while the
/// node has no output.
#[derive(Debug, Clone)]
pub struct Compare {
    node: String,
    op: CompareOp,
    value: Payload,
}

impl Compare {
    pub fn new(node: impl Into<String>, op: CompareOp, value: Payload) -> Self {
        Self {
            node: node.into(),
            op,
            value,
        }
    }

    /// `results[node] == value`
    pub fn equals(node: impl Into<String>, value: Payload) -> Self {
        Self::new(node, CompareOp::Eq, value)
    }

    /// `results[node] >= value`
    pub fn at_least(node: impl Into<String>, value: Payload) -> Self {
        Self::new(node, CompareOp::Ge, value)
    }
}

impl Condition for Compare {
    fn evaluate(&self, results: &Results) -> Result<bool> {
        Ok(results
            .get(&self.node)
            .is_some_and(|actual| self.op.apply(actual, &self.value)))
    }
}

/// Use a closure as a transition condition.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&Results) -> Result<bool> + Send + Sync + 'static,
{
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skein_core::error::SkeinError;

    fn results(pairs: &[(&str, Payload)]) -> Results {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_always() {
        assert!(Always.evaluate(&Results::new()).unwrap());
    }

    #[test]
    fn test_key_present() {
        let cond = KeyPresent::new("a");
        assert!(!cond.evaluate(&Results::new()).unwrap());
        assert!(cond.evaluate(&results(&[("a", json!(null))])).unwrap());
    }

    #[test]
    fn test_compare_numbers_across_representations() {
        let r = results(&[("score", json!(10))]);
        assert!(Compare::equals("score", json!(10.0)).evaluate(&r).unwrap());
        assert!(Compare::at_least("score", json!(10)).evaluate(&r).unwrap());
        assert!(Compare::new("score", CompareOp::Gt, json!(9.5)).evaluate(&r).unwrap());
        assert!(!Compare::new("score", CompareOp::Lt, json!(3)).evaluate(&r).unwrap());
        assert!(Compare::new("score", CompareOp::Le, json!(10)).evaluate(&r).unwrap());
    }

    #[test]
    fn test_compare_large_integers_exactly() {
        let r = results(&[("id", json!(9_007_199_254_740_993_i64))]);
        assert!(!Compare::equals("id", json!(9_007_199_254_740_992_i64)).evaluate(&r).unwrap());
        assert!(Compare::new("id", CompareOp::Ne, json!(9_007_199_254_740_992_i64))
            .evaluate(&r)
            .unwrap());
        assert!(Compare::new("id", CompareOp::Gt, json!(9_007_199_254_740_992_i64))
            .evaluate(&r)
            .unwrap());

        let r = results(&[("big", json!(u64::MAX))]);
        assert!(Compare::equals("big", json!(u64::MAX)).evaluate(&r).unwrap());
        assert!(!Compare::equals("big", json!(u64::MAX - 1)).evaluate(&r).unwrap());
        assert!(Compare::new("big", CompareOp::Gt, json!(-1)).evaluate(&r).unwrap());
    }

    #[test]
    fn test_compare_non_numbers() {
        let r = results(&[("status", json!("ok"))]);
        assert!(Compare::equals("status", json!("ok")).evaluate(&r).unwrap());
        assert!(Compare::new("status", CompareOp::Ne, json!("failed")).evaluate(&r).unwrap());
        assert!(!Compare::new("status", CompareOp::Gt, json!("a")).evaluate(&r).unwrap());
    }

    #[test]
    fn test_compare_missing_node_is_false() {
        let cond = Compare::new("missing", CompareOp::Ne, json!(1));
        assert!(!cond.evaluate(&Results::new()).unwrap());
    }

    #[test]
    fn test_closure_condition_can_fail() {
        let cond = from_fn(|r: &Results| {
            if r.is_empty() {
                Err(SkeinError::Condition("nothing to inspect".into()))
            } else {
                Ok(true)
            }
        });
        assert!(cond.evaluate(&Results::new()).is_err());
        assert!(cond.evaluate(&results(&[("a", json!(1))])).unwrap());
    }

    #[test]
    fn test_compare_op_serde() {
        let op: CompareOp = serde_json::from_str(r#""ge""#).unwrap();
        assert_eq!(op, CompareOp::Ge);
    }
}
