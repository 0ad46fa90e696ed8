use super::*;

/// Identity of a checkpoint as handed to the task on trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub checkpoint_id: CheckpointId,
    /// Trigger time at the coordinator, milliseconds since epoch.
    pub timestamp: EventTime,
}

impl CheckpointMetadata {
    pub fn new(checkpoint_id: CheckpointId, timestamp: EventTime) -> Self {
        Self {
            checkpoint_id,
            timestamp,
        }
    }
}
