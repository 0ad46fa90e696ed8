use super::*;

/// Façade over an [`InputGate`] that runs every delivered element through
/// the [`BarrierAligner`] before handing it to the operator.
///
/// Accepted barriers and end-of-partition markers surface downstream;
/// cancellation markers and dropped barriers are consumed here, so
/// `poll_next` loops until it has something to emit or the gate runs dry.
pub struct CheckpointedInputGate<G: InputGate, N: CheckpointNotifier> {
    gate: G,
    aligner: BarrierAligner<N>,
    gate_index: usize,
    closed: bool,
}

impl<G: InputGate, N: CheckpointNotifier> CheckpointedInputGate<G, N> {
    pub fn new(gate: G, notifier: N) -> Self {
        let aligner = BarrierAligner::new(gate.num_channels(), notifier);
        Self {
            gate,
            aligner,
            gate_index: 0,
            closed: false,
        }
    }

    /// Tag emitted items with a gate index other than 0 (multi-gate tasks).
    pub fn with_gate_index(mut self, gate_index: usize) -> Self {
        self.gate_index = gate_index;
        self
    }

    /// Next in-order item for the operator, or `None` once the underlying
    /// gate is exhausted.
    pub fn poll_next(&mut self) -> Result<Option<BufferOrEvent>> {
        loop {
            let (channel_idx, element) = match self.gate.poll_next()? {
                Some(next) => next,
                None => return Ok(None),
            };
            let channel_info = InputChannelInfo::new(self.gate_index, channel_idx);

            match element {
                StreamElement::Buffer(buffer) => {
                    self.aligner.on_buffer(channel_idx)?;
                    return Ok(Some(BufferOrEvent::new(
                        channel_info,
                        StreamElement::Buffer(buffer),
                    )));
                }
                StreamElement::Barrier(barrier) => {
                    let forwarded =
                        self.aligner
                            .process_barrier(&mut self.gate, channel_idx, &barrier)?;
                    if forwarded {
                        return Ok(Some(BufferOrEvent::new(
                            channel_info,
                            StreamElement::Barrier(barrier),
                        )));
                    }
                    // Dropped barriers are invisible downstream.
                }
                StreamElement::CancelBarrier(marker) => {
                    self.aligner
                        .process_cancel_barrier(&mut self.gate, channel_idx, &marker)?;
                    // Cancellation markers are consumed at this layer.
                }
                StreamElement::EndOfPartition => {
                    self.aligner
                        .process_end_of_partition(&mut self.gate, channel_idx)?;
                    return Ok(Some(BufferOrEvent::new(
                        channel_info,
                        StreamElement::EndOfPartition,
                    )));
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.closed || self.gate.is_finished()
    }

    /// Close the underlying gate, recycling any buffers it still holds.
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.gate.close()
    }

    pub fn alignment_duration_nanos(&self) -> i64 {
        self.aligner.alignment_duration_nanos()
    }

    pub fn checkpoint_start_delay_nanos(&self) -> i64 {
        self.aligner.checkpoint_start_delay_nanos()
    }

    pub fn latest_checkpoint_id(&self) -> CheckpointId {
        self.aligner.latest_checkpoint_id()
    }

    pub fn counters(&self) -> AlignerCounters {
        self.aligner.counters()
    }

    pub fn num_channels(&self) -> usize {
        self.gate.num_channels()
    }

    pub fn aligner(&self) -> &BarrierAligner<N> {
        &self.aligner
    }

    pub fn notifier(&self) -> &N {
        self.aligner.notifier()
    }
}
