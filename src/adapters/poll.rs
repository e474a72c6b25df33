use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::registry::{Action, Adapter, Request};

/// Poll state shared by the `poll/ev` and `poll/cnt` adapters
#[derive(Debug, Default)]
pub struct PollState {
    count: AtomicU64,
    last_event: Mutex<Option<Value>>,
}

impl PollState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn post(&self, event: Value) -> u64 {
        *self.last_event.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn last(&self) -> Option<Value> {
        self.last_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// `poll/ev`: `put` posts an event, `get` returns the most recent one
pub struct PollEvents {
    state: Arc<PollState>,
}

impl PollEvents {
    pub fn new(state: Arc<PollState>) -> Self {
        Self { state }
    }
}

impl Adapter for PollEvents {
    fn name(&self) -> &str {
        "poll.ev"
    }

    fn try_handle(&self, request: &Request) -> Option<Value> {
        match request.action {
            Action::Put => {
                let seq = self.state.post(request.payload.clone());
                Some(serde_json::json!({ "seq": seq }))
            }
            Action::Get => Some(self.state.last().unwrap_or(Value::Null)),
            Action::Head => None,
        }
    }
}

/// `poll/cnt`: number of events posted so far
pub struct PollCount {
    state: Arc<PollState>,
}

impl PollCount {
    pub fn new(state: Arc<PollState>) -> Self {
        Self { state }
    }
}

impl Adapter for PollCount {
    fn name(&self) -> &str {
        "poll.cnt"
    }

    fn try_handle(&self, request: &Request) -> Option<Value> {
        match request.action {
            Action::Get | Action::Head => Some(serde_json::json!({ "count": self.state.count() })),
            Action::Put => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_and_count() {
        let state = PollState::new();
        let ev = PollEvents::new(state.clone());
        let cnt = PollCount::new(state.clone());

        let count = |c: &PollCount| c.try_handle(&Request::new(4u16, Action::Get, Value::Null));
        assert_eq!(count(&cnt), Some(json!({"count": 0})));

        let ack = ev
            .try_handle(&Request::new(3u16, Action::Put, json!({"gps": "fix"})))
            .unwrap();
        assert_eq!(ack["seq"], 1);
        ev.try_handle(&Request::new(3u16, Action::Put, json!({"gps": "lost"})));

        assert_eq!(count(&cnt), Some(json!({"count": 2})));
        assert_eq!(state.count(), 2);
    }

    #[test]
    fn test_last_event() {
        let state = PollState::new();
        let ev = PollEvents::new(state);
        let get = Request::new(3u16, Action::Get, Value::Null);
        assert_eq!(ev.try_handle(&get), Some(Value::Null));

        ev.try_handle(&Request::new(3u16, Action::Put, json!("boot")));
        assert_eq!(ev.try_handle(&get), Some(json!("boot")));
    }

    #[test]
    fn test_declines() {
        let state = PollState::new();
        assert!(PollEvents::new(state.clone())
            .try_handle(&Request::new(3u16, Action::Head, Value::Null))
            .is_none());
        assert!(PollCount::new(state)
            .try_handle(&Request::new(4u16, Action::Put, Value::Null))
            .is_none());
    }
}
