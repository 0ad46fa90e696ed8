use super::*;

/// Per-channel bookkeeping.
#[derive(Debug, Clone)]
struct ChannelState {
    /// While true, the gate keeps this channel silent; records queue upstream.
    blocked: bool,
    /// Highest barrier id observed on this channel, `-1` before the first.
    last_barrier_id: CheckpointId,
    closed: bool,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            blocked: false,
            last_barrier_id: -1,
            closed: false,
        }
    }
}

/// State for the checkpoint currently being aligned.
///
/// Created lazily on the first barrier of a fresh id; destroyed by exactly
/// one of completion, subsumption, cancellation, or abort-by-close.
#[derive(Debug)]
struct PendingCheckpoint {
    checkpoint_id: CheckpointId,
    started_at: Instant,
    trigger_timestamp: EventTime,
    options: CheckpointOptions,
    /// Open channels whose barrier has not arrived yet.
    awaiting: BTreeSet<ChannelIndex>,
    /// Channels blocked since delivering their barrier.
    blocked: BTreeSet<ChannelIndex>,
}

/// Barrier alignment state machine for one input gate.
///
/// Consumes `(channel, element)` transitions from the checkpointed gate,
/// decides which elements surface downstream, keeps the per-channel block
/// set, and pushes checkpoint lifecycle signals into the notifier. At most
/// one checkpoint aligns at a time; a newer barrier id subsumes the
/// pending one.
pub struct BarrierAligner<N: CheckpointNotifier> {
    notifier: N,
    channels: Vec<ChannelState>,
    num_open_channels: usize,
    pending: Option<PendingCheckpoint>,
    /// Highest id that became pending or was cancelled outright.
    latest_checkpoint_id: CheckpointId,
    /// Barriers at or below this id were cancelled and drop on sight.
    last_cancelled_id: CheckpointId,
    last_alignment_duration_nanos: i64,
    last_start_delay_nanos: i64,
    /// Channels named by the most recent resume batch, ascending.
    last_resumed: Vec<ChannelIndex>,
    counters: AlignerCounters,
}

impl<N: CheckpointNotifier> BarrierAligner<N> {
    pub fn new(num_channels: usize, notifier: N) -> Self {
        Self {
            notifier,
            channels: vec![ChannelState::new(); num_channels],
            num_open_channels: num_channels,
            pending: None,
            latest_checkpoint_id: 0,
            last_cancelled_id: -1,
            last_alignment_duration_nanos: 0,
            last_start_delay_nanos: 0,
            last_resumed: Vec::new(),
            counters: AlignerCounters::default(),
        }
    }

    /// A buffer is about to be emitted from `channel_idx`.
    ///
    /// Buffers from blocked or closed channels mean the gate broke its
    /// delivery contract; that is fatal to the task.
    pub fn on_buffer(&mut self, channel_idx: ChannelIndex) -> Result<()> {
        self.check_channel_index(channel_idx)?;
        let state = &self.channels[channel_idx];
        if state.closed {
            bail!("buffer received from closed channel {}", channel_idx);
        }
        if state.blocked {
            bail!("buffer received from blocked channel {}", channel_idx);
        }
        self.counters.buffers += 1;
        Ok(())
    }

    /// Process a checkpoint barrier from `channel_idx`.
    ///
    /// Returns whether the barrier is forwarded downstream: accepted
    /// barriers are, late/stale ones are dropped and only release the
    /// in-band pause on their channel.
    pub fn process_barrier(
        &mut self,
        gate: &mut dyn InputGate,
        channel_idx: ChannelIndex,
        barrier: &Barrier,
    ) -> Result<bool> {
        self.check_channel_index(channel_idx)?;
        let barrier_id = barrier.checkpoint_id;
        {
            let state = &self.channels[channel_idx];
            if state.closed {
                bail!(
                    "barrier for checkpoint {} received from closed channel {}",
                    barrier_id,
                    channel_idx
                );
            }
            if state.blocked {
                bail!(
                    "barrier for checkpoint {} received from blocked channel {}",
                    barrier_id,
                    channel_idx
                );
            }
        }
        self.counters.barriers += 1;

        // Single input channel: nothing to align, trigger on arrival.
        if self.channels.len() == 1 {
            return self.trigger_without_alignment(gate, channel_idx, barrier);
        }

        // Late or duplicate barrier, or an id retired by cancellation.
        if barrier_id <= self.channels[channel_idx].last_barrier_id
            || barrier_id <= self.last_cancelled_id
        {
            self.release_dropped_barrier(gate, channel_idx, barrier)?;
            return Ok(false);
        }

        if let Some(pending) = &self.pending {
            if barrier_id < pending.checkpoint_id {
                // A cancellation or subsumption already retired this id.
                self.release_dropped_barrier(gate, channel_idx, barrier)?;
                return Ok(false);
            }
            if barrier_id > pending.checkpoint_id {
                // A newer checkpoint overtakes the pending alignment.
                self.abort_pending(gate, CheckpointFailureReason::DeclinedSubsumed)?;
            }
        }

        if self.pending.is_none() {
            if barrier_id <= self.latest_checkpoint_id {
                // Already completed or aborted; a retired id cannot re-open.
                self.release_dropped_barrier(gate, channel_idx, barrier)?;
                return Ok(false);
            }
            self.begin_alignment(barrier);
        }

        self.channels[channel_idx].last_barrier_id = barrier_id;
        let needs_alignment = barrier.options.needs_alignment();
        let completed = {
            let pending = self
                .pending
                .as_mut()
                .ok_or_else(|| anyhow!("internal aligner state is inconsistent"))?;
            pending.awaiting.remove(&channel_idx);
            if needs_alignment {
                pending.blocked.insert(channel_idx);
            }
            pending.awaiting.is_empty()
        };
        if needs_alignment {
            self.channels[channel_idx].blocked = true;
        }
        if completed {
            self.complete_alignment(gate)?;
        }
        Ok(true)
    }

    /// Process a cancellation marker for checkpoint `marker.checkpoint_id`.
    ///
    /// Duplicate and late cancels are no-ops. A cancel for an id that has
    /// shown no barrier yet is remembered so its barriers drop on arrival.
    pub fn process_cancel_barrier(
        &mut self,
        gate: &mut dyn InputGate,
        channel_idx: ChannelIndex,
        marker: &CancelBarrier,
    ) -> Result<()> {
        self.check_channel_index(channel_idx)?;
        self.counters.cancel_barriers += 1;
        let cancelled_id = marker.checkpoint_id;

        if let Some(pending) = &self.pending {
            let pending_id = pending.checkpoint_id;
            if cancelled_id < pending_id {
                // Trailing cancel from an already retired checkpoint.
                return Ok(());
            }
            if cancelled_id == pending_id {
                self.last_cancelled_id = self.last_cancelled_id.max(cancelled_id);
                return self
                    .abort_pending(gate, CheckpointFailureReason::DeclinedOnCancellationBarrier);
            }
            // A newer cancel subsumes the in-flight alignment. The cancelled
            // id never becomes pending, so this is the only abort emitted.
            self.abort_pending(gate, CheckpointFailureReason::DeclinedSubsumed)?;
            self.last_cancelled_id = cancelled_id;
            self.latest_checkpoint_id = cancelled_id;
            return Ok(());
        }

        if cancelled_id <= self.last_cancelled_id || cancelled_id <= self.latest_checkpoint_id {
            // Duplicate cancel, or one for a checkpoint already resolved.
            return Ok(());
        }

        // No barrier for this id has been observed; remember the
        // cancellation and stay silent towards the notifier.
        self.last_cancelled_id = cancelled_id;
        self.latest_checkpoint_id = cancelled_id;
        self.last_alignment_duration_nanos = 0;
        tracing::debug!(
            "checkpoint {} cancelled before any barrier arrived",
            cancelled_id
        );
        Ok(())
    }

    /// Process the end-of-partition marker of `channel_idx`.
    pub fn process_end_of_partition(
        &mut self,
        gate: &mut dyn InputGate,
        channel_idx: ChannelIndex,
    ) -> Result<()> {
        self.check_channel_index(channel_idx)?;
        if self.channels[channel_idx].closed {
            bail!("duplicate end of partition on channel {}", channel_idx);
        }
        self.counters.end_of_partitions += 1;

        let pending_needs_channel = self.pending.as_ref().is_some_and(|pending| {
            pending.awaiting.contains(&channel_idx) || pending.blocked.contains(&channel_idx)
        });
        if pending_needs_channel {
            self.abort_pending(gate, CheckpointFailureReason::DeclinedOnCloseOfChannel)?;
        }

        self.channels[channel_idx].closed = true;
        self.num_open_channels -= 1;
        Ok(())
    }

    /// Duration of the last completed alignment, 0 for single-channel
    /// triggers and after aborts.
    pub fn alignment_duration_nanos(&self) -> i64 {
        self.last_alignment_duration_nanos
    }

    /// Coordinator-to-first-barrier delay of the most recent pending.
    pub fn checkpoint_start_delay_nanos(&self) -> i64 {
        self.last_start_delay_nanos
    }

    /// Id of the most recent pending checkpoint, completed or not.
    pub fn latest_checkpoint_id(&self) -> CheckpointId {
        self.latest_checkpoint_id
    }

    /// Channels named by the most recent resume batch, ascending.
    pub fn last_resumed_channels(&self) -> &[ChannelIndex] {
        &self.last_resumed
    }

    pub fn counters(&self) -> AlignerCounters {
        self.counters
    }

    pub fn num_open_channels(&self) -> usize {
        self.num_open_channels
    }

    pub fn is_channel_blocked(&self, channel_idx: ChannelIndex) -> bool {
        self.channels
            .get(channel_idx)
            .map(|state| state.blocked)
            .unwrap_or(false)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    fn check_channel_index(&self, channel_idx: ChannelIndex) -> Result<()> {
        if channel_idx >= self.channels.len() {
            bail!("channel index {} out of bounds", channel_idx);
        }
        Ok(())
    }

    /// Single-channel fast path: every fresh barrier triggers immediately
    /// with zero alignment duration.
    fn trigger_without_alignment(
        &mut self,
        gate: &mut dyn InputGate,
        channel_idx: ChannelIndex,
        barrier: &Barrier,
    ) -> Result<bool> {
        let barrier_id = barrier.checkpoint_id;
        if barrier_id <= self.latest_checkpoint_id || barrier_id <= self.last_cancelled_id {
            self.release_dropped_barrier(gate, channel_idx, barrier)?;
            return Ok(false);
        }

        self.channels[channel_idx].last_barrier_id = barrier_id;
        self.latest_checkpoint_id = barrier_id;
        self.record_start_delay(barrier);
        self.last_alignment_duration_nanos = 0;
        self.counters.checkpoints_triggered += 1;
        tracing::debug!(
            "checkpoint {} triggered without alignment on single input",
            barrier_id
        );
        self.notifier.trigger_on_barrier(
            CheckpointMetadata::new(barrier_id, barrier.timestamp),
            &barrier.options,
            CheckpointMetrics {
                alignment_duration_nanos: 0,
                checkpoint_start_delay_nanos: self.last_start_delay_nanos,
            },
        )?;
        if barrier.options.needs_alignment() {
            self.resume_channels(gate, vec![channel_idx])?;
        }
        Ok(true)
    }

    /// Open a new pending checkpoint for `barrier`'s id over all currently
    /// open channels.
    fn begin_alignment(&mut self, barrier: &Barrier) {
        let awaiting: BTreeSet<ChannelIndex> = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, state)| !state.closed)
            .map(|(channel_idx, _)| channel_idx)
            .collect();
        self.latest_checkpoint_id = barrier.checkpoint_id;
        self.record_start_delay(barrier);
        tracing::debug!(
            "starting alignment for checkpoint {} over {} open channels",
            barrier.checkpoint_id,
            awaiting.len()
        );
        self.pending = Some(PendingCheckpoint {
            checkpoint_id: barrier.checkpoint_id,
            started_at: Instant::now(),
            trigger_timestamp: barrier.timestamp,
            options: barrier.options.clone(),
            awaiting,
            blocked: BTreeSet::new(),
        });
    }

    /// Every open channel has delivered its barrier: trigger, then release
    /// the blocked channels.
    fn complete_alignment(&mut self, gate: &mut dyn InputGate) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| anyhow!("internal aligner state is inconsistent"))?;
        let alignment_nanos = pending.started_at.elapsed().as_nanos() as i64;
        self.last_alignment_duration_nanos = alignment_nanos;
        self.counters.checkpoints_triggered += 1;
        tracing::debug!(
            "checkpoint {} aligned after {} ns",
            pending.checkpoint_id,
            alignment_nanos
        );
        // The notifier must observe the checkpoint in a quiesced state:
        // trigger strictly before any channel is unblocked.
        self.notifier.trigger_on_barrier(
            CheckpointMetadata::new(pending.checkpoint_id, pending.trigger_timestamp),
            &pending.options,
            CheckpointMetrics {
                alignment_duration_nanos: alignment_nanos,
                checkpoint_start_delay_nanos: self.last_start_delay_nanos,
            },
        )?;
        let blocked: Vec<ChannelIndex> = pending.blocked.iter().copied().collect();
        self.resume_channels(gate, blocked)
    }

    /// Abort the pending checkpoint, if any, then release its blocked
    /// channels. Exactly one abort is emitted per pending.
    fn abort_pending(
        &mut self,
        gate: &mut dyn InputGate,
        reason: CheckpointFailureReason,
    ) -> Result<()> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Ok(()),
        };
        self.last_alignment_duration_nanos = 0;
        self.counters.checkpoints_aborted += 1;
        tracing::warn!("checkpoint {} aborted: {}", pending.checkpoint_id, reason);
        self.notifier
            .abort_on_barrier(pending.checkpoint_id, reason)?;
        let blocked: Vec<ChannelIndex> = pending.blocked.iter().copied().collect();
        self.resume_channels(gate, blocked)
    }

    /// A dropped barrier still paused its channel in-band; release it.
    fn release_dropped_barrier(
        &mut self,
        gate: &mut dyn InputGate,
        channel_idx: ChannelIndex,
        barrier: &Barrier,
    ) -> Result<()> {
        tracing::debug!(
            "dropping late barrier for checkpoint {} on channel {}",
            barrier.checkpoint_id,
            channel_idx
        );
        if barrier.options.needs_alignment() {
            self.resume_channels(gate, vec![channel_idx])?;
        }
        Ok(())
    }

    /// Unblock a batch of channels in one gate call.
    fn resume_channels(
        &mut self,
        gate: &mut dyn InputGate,
        channels: Vec<ChannelIndex>,
    ) -> Result<()> {
        if channels.is_empty() {
            return Ok(());
        }
        for &channel_idx in &channels {
            self.channels[channel_idx].blocked = false;
        }
        gate.resume_consumption(&channels)?;
        self.last_resumed = channels;
        Ok(())
    }

    fn record_start_delay(&mut self, barrier: &Barrier) {
        if barrier.timestamp > 0 {
            let delay_millis = (unix_time_millis() - barrier.timestamp).max(0);
            self.last_start_delay_nanos = delay_millis.saturating_mul(1_000_000);
        }
    }
}
