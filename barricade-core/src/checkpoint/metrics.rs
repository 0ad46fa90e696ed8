use super::*;

/// Measurements reported alongside a completed alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Time between the first and the last barrier of the checkpoint.
    pub alignment_duration_nanos: i64,
    /// Time between the coordinator trigger and the first barrier arrival.
    pub checkpoint_start_delay_nanos: i64,
}

/// Per-event counters kept by the aligner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignerCounters {
    pub buffers: u64,
    pub barriers: u64,
    pub cancel_barriers: u64,
    pub end_of_partitions: u64,
    pub checkpoints_triggered: u64,
    pub checkpoints_aborted: u64,
}
