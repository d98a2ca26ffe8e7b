use serde::{Deserialize, Serialize};

/// Something that happened in the host page, delivered one at a time to the content script
///
/// The live-tab shim serialises these as `{"kind": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEvent {
    /// The document finished parsing (DOMContentLoaded)
    Ready,

    /// One coalesced batch of child-list mutation records
    Mutations(MutationBatch),

    /// The trigger control was activated; default handling was already suppressed
    ///
    /// `selection` is the window selection captured when the click happened.
    TriggerActivated {
        #[serde(default)]
        selection: Option<String>,
    },

    /// The overlay's close affordance was activated
    CloseRequested,

    /// The overlay frame finished loading its entry document
    FrameLoaded { frame_id: String, generation: u64 },

    /// A `message` event reached the host window
    Message {
        origin: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// Summary of mutation records observed since the last drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationBatch {
    #[serde(default)]
    pub records: usize,
    #[serde(default)]
    pub added_nodes: usize,
    #[serde(default)]
    pub removed_nodes: usize,
}

impl MutationBatch {
    /// Whether this batch may have replaced the subtree holding the trigger
    pub fn qualifies(&self) -> bool {
        self.records > 0 || self.added_nodes > 0
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0 && self.added_nodes == 0 && self.removed_nodes == 0
    }

    pub fn merge(&mut self, other: MutationBatch) {
        self.records += other.records;
        self.added_nodes += other.added_nodes;
        self.removed_nodes += other.removed_nodes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_event_carries_selection() {
        let event: PageEvent =
            serde_json::from_value(json!({"kind": "trigger_activated", "selection": "Lunch?"})).unwrap();
        assert_eq!(event, PageEvent::TriggerActivated { selection: Some("Lunch?".to_string()) });
    }

    #[test]
    fn test_decode_shim_events() {
        let raw = json!([
            {"kind": "ready"},
            {"kind": "mutations", "records": 3, "added_nodes": 5, "removed_nodes": 1},
            {"kind": "trigger_activated"},
            {"kind": "frame_loaded", "frame_id": "smart-email-popup", "generation": 2},
            {"kind": "message", "origin": "http://localhost:4200", "data": {"type": "CLOSE_POPUP"}}
        ]);

        let events: Vec<PageEvent> = serde_json::from_value(raw).unwrap();
        assert_eq!(events[0], PageEvent::Ready);
        assert_eq!(
            events[1],
            PageEvent::Mutations(MutationBatch { records: 3, added_nodes: 5, removed_nodes: 1 })
        );
        assert_eq!(events[2], PageEvent::TriggerActivated { selection: None });
        assert_eq!(
            events[3],
            PageEvent::FrameLoaded { frame_id: "smart-email-popup".to_string(), generation: 2 }
        );
        match &events[4] {
            PageEvent::Message { origin, data } => {
                assert_eq!(origin, "http://localhost:4200");
                assert_eq!(data["type"], "CLOSE_POPUP");
            }
            other => panic!("Expected message event, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_qualification() {
        assert!(!MutationBatch::default().qualifies());
        assert!(MutationBatch { records: 1, ..Default::default() }.qualifies());

        let mut batch = MutationBatch::default();
        batch.merge(MutationBatch { records: 2, added_nodes: 1, removed_nodes: 0 });
        batch.merge(MutationBatch { records: 1, added_nodes: 0, removed_nodes: 4 });
        assert_eq!(batch, MutationBatch { records: 3, added_nodes: 1, removed_nodes: 4 });
    }
}
