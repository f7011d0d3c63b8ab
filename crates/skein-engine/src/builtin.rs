use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Backend;
use skein_core::types::Payload;

/// Backends that can be named in a workflow definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuiltinBackend {
    /// Return the payload unchanged.
    Identity,
    /// Add a constant to a number.
    Add { value: f64 },
    /// Multiply a number by a constant.
    Multiply { factor: f64 },
    /// Sum an array of numbers.
    Sum,
    /// Length of an array, string, or object.
    Length,
    /// Always fail with the given message.
    Fail { message: String },
    /// Sleep, then return the payload unchanged.
    Delay { millis: u64 },
}

impl Backend for BuiltinBackend {
    fn name(&self) -> &str {
        match self {
            BuiltinBackend::Identity => "identity",
            BuiltinBackend::Add { .. } => "add",
            BuiltinBackend::Multiply { .. } => "multiply",
            BuiltinBackend::Sum => "sum",
            BuiltinBackend::Length => "length",
            BuiltinBackend::Fail { .. } => "fail",
            BuiltinBackend::Delay { .. } => "delay",
        }
    }

    fn invoke(&self, payload: Payload) -> BoxFuture<'_, Result<Payload>> {
        Box::pin(async move {
            match self {
                BuiltinBackend::Identity => Ok(payload),
                BuiltinBackend::Add { value } => {
                    let n = self.number(&payload)?;
                    Ok(number_payload(n + value))
                }
                BuiltinBackend::Multiply { factor } => {
                    let n = self.number(&payload)?;
                    Ok(number_payload(n * factor))
                }
                BuiltinBackend::Sum => {
                    let items = payload.as_array().ok_or_else(|| {
                        SkeinError::backend(self.name(), "expected an array of numbers")
                    })?;
                    let total = items
                        .iter()
                        .map(|item| self.number(item))
                        .sum::<Result<f64>>()?;
                    Ok(number_payload(total))
                }
                BuiltinBackend::Length => {
                    let len = match &payload {
                        Payload::Array(items) => items.len(),
                        Payload::String(s) => s.chars().count(),
                        Payload::Object(map) => map.len(),
                        other => {
                            return Err(SkeinError::backend(
                                self.name(),
                                format!("value has no length: {}", other),
                            ))
                        }
                    };
                    Ok(Payload::from(len))
                }
                BuiltinBackend::Fail { message } => {
                    Err(SkeinError::backend(self.name(), message.clone()))
                }
                BuiltinBackend::Delay { millis } => {
                    tokio::time::sleep(Duration::from_millis(*millis)).await;
                    Ok(payload)
                }
            }
        })
    }
}

impl BuiltinBackend {
    fn number(&self, value: &Payload) -> Result<f64> {
        value
            .as_f64()
            .ok_or_else(|| SkeinError::backend(self.name(), format!("expected a number, got {}", value)))
    }
}

/// Integral results stay integers so `2 * 5` prints as `10`, not `10.0`.
fn number_payload(n: f64) -> Payload {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Payload::from(n as i64)
    } else {
        Payload::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_arithmetic() {
        let double = BuiltinBackend::Multiply { factor: 2.0 };
        assert_eq!(double.invoke(json!(5)).await.unwrap(), json!(10));
        let inc = BuiltinBackend::Add { value: 1.0 };
        assert_eq!(inc.invoke(json!(10)).await.unwrap(), json!(11));
        let half = BuiltinBackend::Multiply { factor: 0.5 };
        assert_eq!(half.invoke(json!(3)).await.unwrap(), json!(1.5));
    }

    #[tokio::test]
    async fn test_sum_and_length() {
        assert_eq!(BuiltinBackend::Sum.invoke(json!([1, 2, 3.5])).await.unwrap(), json!(6.5));
        assert_eq!(BuiltinBackend::Length.invoke(json!([1, 2])).await.unwrap(), json!(2));
        assert_eq!(BuiltinBackend::Length.invoke(json!("héllo")).await.unwrap(), json!(5));
        assert!(BuiltinBackend::Length.invoke(json!(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_type_errors_are_backend_errors() {
        let err = BuiltinBackend::Sum.invoke(json!([1, "x"])).await.unwrap_err();
        assert!(matches!(err, SkeinError::BackendExecution { ref backend, .. } if backend == "sum"));
    }

    #[tokio::test]
    async fn test_fail() {
        let fail = BuiltinBackend::Fail {
            message: "boom".into(),
        };
        let err = fail.invoke(json!(null)).await.unwrap_err();
        assert_eq!(err.to_string(), "Backend execution failed: fail: boom");
    }

    #[test]
    fn test_deserialize_tagged() {
        let backend: BuiltinBackend =
            toml::from_str("type = \"multiply\"\nfactor = 3\n").unwrap();
        assert_eq!(backend, BuiltinBackend::Multiply { factor: 3.0 });
    }
}
