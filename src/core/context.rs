//! Extended state carried alongside the current state.
//!
//! A context is owned by exactly one machine and only changes through the
//! patches returned by actions. Patches are merged shallowly, one action at a
//! time, so later actions observe the updates of earlier ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Record type owned by a machine instance.
///
/// `Patch` is the partial update an action produces; `merge` folds it into
/// the record.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Context;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// struct Order {
///     status: String,
///     paid: bool,
/// }
///
/// #[derive(Default)]
/// struct OrderPatch {
///     status: Option<String>,
///     paid: Option<bool>,
/// }
///
/// impl Context for Order {
///     type Patch = OrderPatch;
///
///     fn merge(&mut self, patch: OrderPatch) {
///         if let Some(status) = patch.status {
///             self.status = status;
///         }
///         if let Some(paid) = patch.paid {
///             self.paid = paid;
///         }
///     }
/// }
///
/// let mut order = Order::default();
/// order.merge(OrderPatch { paid: Some(true), ..Default::default() });
/// assert!(order.paid);
/// assert_eq!(order.status, "");
/// ```
pub trait Context:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Partial update produced by an action.
    type Patch: Send + 'static;

    /// Shallow-merge a patch into this context.
    fn merge(&mut self, patch: Self::Patch);
}

impl Context for () {
    type Patch = ();

    fn merge(&mut self, _patch: ()) {}
}

/// Loosely shaped context backed by a JSON object.
///
/// Patches are JSON values; object patches overwrite the top-level keys they
/// name and leave every other key untouched. `null` is an empty patch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonContext(Map<String, Value>);

impl JsonContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a context from a JSON value. Non-object values yield an empty context.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for JsonContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Context for JsonContext {
    type Patch = Value;

    fn merge(&mut self, patch: Value) {
        match patch {
            Value::Object(entries) => {
                for (key, value) in entries {
                    self.0.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                tracing::warn!(patch = %other, "ignoring non-object context patch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_patch_overwrites_only_named_keys() {
        let mut ctx = JsonContext::from_value(json!({ "attempts": 1, "status": "pending" }));
        ctx.merge(json!({ "attempts": 2 }));

        assert_eq!(ctx.get_u64("attempts"), Some(2));
        assert_eq!(ctx.get_str("status"), Some("pending"));
    }

    #[test]
    fn merge_is_shallow() {
        let mut ctx = JsonContext::from_value(json!({ "order": { "id": 7, "paid": false } }));
        ctx.merge(json!({ "order": { "paid": true } }));

        assert_eq!(ctx.get("order"), Some(&json!({ "paid": true })));
    }

    #[test]
    fn null_and_scalar_patches_are_ignored() {
        let mut ctx = JsonContext::from_value(json!({ "count": 3 }));
        let before = ctx.clone();

        ctx.merge(Value::Null);
        ctx.merge(json!(42));

        assert_eq!(ctx, before);
    }

    #[test]
    fn non_object_value_builds_empty_context() {
        let ctx = JsonContext::from_value(json!([1, 2, 3]));
        assert!(ctx.as_map().is_empty());
    }

    #[test]
    fn json_context_serializes_as_plain_object() {
        let ctx = JsonContext::from_value(json!({ "on": true }));
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"on":true}"#);

        let back: JsonContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
