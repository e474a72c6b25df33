use serde_json::Value;

use crate::registry::{Action, Adapter, Request};

/// Largest fill a diagnostic read will produce, matching a one-byte TLV length
pub const MAX_FILL_LEN: usize = 255;

/// Requested fill length from a payload like `{"len": 16}`, default 1
fn fill_len(payload: &Value) -> usize {
    payload
        .get("len")
        .and_then(|v| v.as_u64())
        .map(|n| (n as usize).min(MAX_FILL_LEN))
        .unwrap_or(1)
}

/// Answers reads with a run of a fixed byte (`zero/byte`, `ones/byte`)
pub struct FillAdapter {
    name: &'static str,
    fill: u8,
}

impl FillAdapter {
    pub fn zeros() -> Self {
        Self {
            name: "diag.zero",
            fill: 0x00,
        }
    }

    pub fn ones() -> Self {
        Self {
            name: "diag.ones",
            fill: 0xff,
        }
    }
}

impl Adapter for FillAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn try_handle(&self, request: &Request) -> Option<Value> {
        match request.action {
            Action::Get => {
                let len = fill_len(&request.payload);
                Some(serde_json::json!({
                    "len": len,
                    "data": hex::encode(vec![self.fill; len]),
                }))
            }
            Action::Head => Some(serde_json::json!({ "max_len": MAX_FILL_LEN })),
            Action::Put => None,
        }
    }
}

/// Returns whatever it is given (`echo/byte`)
pub struct EchoAdapter;

impl Adapter for EchoAdapter {
    fn name(&self) -> &str {
        "diag.echo"
    }

    fn try_handle(&self, request: &Request) -> Option<Value> {
        match request.action {
            Action::Get | Action::Put => Some(request.payload.clone()),
            Action::Head => None,
        }
    }
}

/// Accepts and discards everything (`drop/byte`)
pub struct DropAdapter;

impl Adapter for DropAdapter {
    fn name(&self) -> &str {
        "diag.drop"
    }

    fn try_handle(&self, _request: &Request) -> Option<Value> {
        Some(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(action: Action, payload: Value) -> Request {
        Request::new(31u16, action, payload)
    }

    #[test]
    fn test_zero_fill() {
        let out = FillAdapter::zeros()
            .try_handle(&req(Action::Get, json!({"len": 4})))
            .unwrap();
        assert_eq!(out["len"], 4);
        assert_eq!(out["data"], "00000000");
    }

    #[test]
    fn test_ones_default_len() {
        let out = FillAdapter::ones()
            .try_handle(&req(Action::Get, Value::Null))
            .unwrap();
        assert_eq!(out["data"], "ff");
    }

    #[test]
    fn test_fill_len_capped() {
        let out = FillAdapter::zeros()
            .try_handle(&req(Action::Get, json!({"len": 10_000})))
            .unwrap();
        assert_eq!(out["len"], MAX_FILL_LEN);
        assert_eq!(out["data"].as_str().unwrap().len(), MAX_FILL_LEN * 2);
    }

    #[test]
    fn test_fill_declines_put() {
        assert!(FillAdapter::zeros()
            .try_handle(&req(Action::Put, json!({})))
            .is_none());
    }

    #[test]
    fn test_echo() {
        let payload = json!({"msg": "hello", "n": [1, 2]});
        assert_eq!(
            EchoAdapter.try_handle(&req(Action::Put, payload.clone())),
            Some(payload)
        );
        assert!(EchoAdapter.try_handle(&req(Action::Head, Value::Null)).is_none());
    }

    #[test]
    fn test_drop_claims_everything() {
        for action in [Action::Get, Action::Put, Action::Head] {
            assert_eq!(
                DropAdapter.try_handle(&req(action, json!({"x": 1}))),
                Some(Value::Null)
            );
        }
    }
}
