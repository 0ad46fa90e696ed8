//! Checkpoint alignment at the task input boundary.
//!
//! Implements the input side of the Chandy-Lamport snapshot protocol: the
//! [`BarrierAligner`] funnels interleaved data buffers, barriers,
//! cancellation markers, and end-of-partition events from N channels into
//! one ordered output, blocking channels that are ahead of the current
//! checkpoint until every open channel has delivered its barrier, then
//! signalling the [`CheckpointNotifier`] to snapshot in a quiesced state.

use crate::input_gate::InputGate;
use crate::types::{
    Barrier, BufferOrEvent, CancelBarrier, ChannelIndex, CheckpointId, EventTime,
    InputChannelInfo, StreamElement,
};
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

mod aligner;
mod gate;
mod metadata;
mod metrics;
mod notifier;
mod options;

pub use aligner::*;
pub use gate::*;
pub use metadata::*;
pub use metrics::*;
pub use notifier::*;
pub use options::*;

/// Wall clock in milliseconds since epoch.
fn unix_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "tests/checkpoint_tests.rs"]
mod tests;
