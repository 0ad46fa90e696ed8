use crate::buffer::Buffer;
use crate::checkpoint::CheckpointOptions;
use serde::{Deserialize, Serialize};

/// Event time in milliseconds since epoch.
pub type EventTime = i64;

/// Unique identifier for checkpoint barriers. Ids are positive and strictly
/// increasing per job; `-1` is the "nothing seen yet" sentinel.
pub type CheckpointId = i64;

/// Channel identifier (index in the input gate).
pub type ChannelIndex = usize;

/// Identifies an input channel across the gates of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputChannelInfo {
    pub gate_index: usize,
    pub channel_index: ChannelIndex,
}

impl InputChannelInfo {
    pub fn new(gate_index: usize, channel_index: ChannelIndex) -> Self {
        Self {
            gate_index,
            channel_index,
        }
    }
}

impl std::fmt::Display for InputChannelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gate_{}_channel_{}", self.gate_index, self.channel_index)
    }
}

/// Checkpoint barrier for Chandy-Lamport snapshots.
///
/// Injected into the source streams by the coordinator; partitions each
/// channel into a pre-snapshot and a post-snapshot prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub checkpoint_id: CheckpointId,
    /// Trigger time at the coordinator, milliseconds since epoch.
    pub timestamp: EventTime,
    pub options: CheckpointOptions,
}

impl Barrier {
    /// Create a barrier for a default-location aligned checkpoint.
    pub fn new(checkpoint_id: CheckpointId) -> Self {
        Self::with_timestamp(checkpoint_id, 0)
    }

    /// Create a barrier with an explicit trigger timestamp.
    pub fn with_timestamp(checkpoint_id: CheckpointId, timestamp: EventTime) -> Self {
        Self {
            checkpoint_id,
            timestamp,
            options: CheckpointOptions::for_checkpoint_with_default_location(),
        }
    }

    /// Create a barrier carrying explicit checkpoint options.
    pub fn with_options(
        checkpoint_id: CheckpointId,
        timestamp: EventTime,
        options: CheckpointOptions,
    ) -> Self {
        Self {
            checkpoint_id,
            timestamp,
            options,
        }
    }
}

/// In-band marker aborting checkpoint `checkpoint_id` on all downstream tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBarrier {
    pub checkpoint_id: CheckpointId,
}

impl CancelBarrier {
    pub fn new(checkpoint_id: CheckpointId) -> Self {
        Self { checkpoint_id }
    }
}

/// The unit delivered by an input channel: data payloads interleaved with
/// checkpoint markers and the terminal end-of-partition marker.
#[derive(Debug)]
pub enum StreamElement {
    /// Opaque data payload, owned until emitted downstream or recycled.
    Buffer(Buffer),
    /// Numbered snapshot marker.
    Barrier(Barrier),
    /// Negative marker aborting a checkpoint.
    CancelBarrier(CancelBarrier),
    /// Terminal marker: the channel produces no further items.
    EndOfPartition,
}

impl StreamElement {
    /// Create a buffer element over unpooled memory.
    pub fn buffer(memory: Vec<u8>) -> Self {
        Self::Buffer(Buffer::from_bytes(memory))
    }

    /// Create a barrier element for a default aligned checkpoint.
    pub fn barrier(checkpoint_id: CheckpointId) -> Self {
        Self::Barrier(Barrier::new(checkpoint_id))
    }

    /// Create a barrier element with an explicit trigger timestamp.
    pub fn barrier_with_timestamp(checkpoint_id: CheckpointId, timestamp: EventTime) -> Self {
        Self::Barrier(Barrier::with_timestamp(checkpoint_id, timestamp))
    }

    /// Create a cancellation marker element.
    pub fn cancel_barrier(checkpoint_id: CheckpointId) -> Self {
        Self::CancelBarrier(CancelBarrier::new(checkpoint_id))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }
}

/// One in-order output item of the checkpointed gate, tagged with the
/// channel it arrived on.
#[derive(Debug)]
pub struct BufferOrEvent {
    pub channel_info: InputChannelInfo,
    pub element: StreamElement,
}

impl BufferOrEvent {
    pub fn new(channel_info: InputChannelInfo, element: StreamElement) -> Self {
        Self {
            channel_info,
            element,
        }
    }

    pub fn is_buffer(&self) -> bool {
        self.element.is_buffer()
    }
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
