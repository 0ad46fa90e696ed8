use super::*;

/// Why a pending checkpoint will not complete on this task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointFailureReason {
    /// An explicit cancellation marker arrived for the pending id.
    DeclinedOnCancellationBarrier,
    /// A newer checkpoint id overtook the pending alignment.
    DeclinedSubsumed,
    /// A contributing channel ended before delivering its barrier.
    DeclinedOnCloseOfChannel,
    /// The notifier refused the trigger; surfaced upward, never generated
    /// by the aligner.
    DeclinedTaskNotReady,
    /// Reserved; the aligner never emits this.
    Unknown,
}

impl std::fmt::Display for CheckpointFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::DeclinedOnCancellationBarrier => "declined on cancellation barrier",
            Self::DeclinedSubsumed => "declined, subsumed by a newer checkpoint",
            Self::DeclinedOnCloseOfChannel => "declined on close of an input channel",
            Self::DeclinedTaskNotReady => "declined, task not ready",
            Self::Unknown => "unknown failure",
        };
        f.write_str(message)
    }
}

/// Downstream sink for checkpoint lifecycle signals.
///
/// Both callbacks run synchronously on the task thread, between two gate
/// items. `trigger_on_barrier` observes every contributing channel in a
/// quiesced state: channels are unblocked only after it returns.
pub trait CheckpointNotifier: Send {
    fn trigger_on_barrier(
        &mut self,
        metadata: CheckpointMetadata,
        options: &CheckpointOptions,
        metrics: CheckpointMetrics,
    ) -> Result<()>;

    fn abort_on_barrier(
        &mut self,
        checkpoint_id: CheckpointId,
        reason: CheckpointFailureReason,
    ) -> Result<()>;
}
