//! Input gate: reading from multiple upstream channels.
//!
//! The gate presents the task with a single stream of `(channel, element)`
//! pairs drawn fairly across channels. Channel blocking for barrier
//! alignment is in-band: delivering a barrier that needs alignment pauses
//! its channel, and the channel stays paused (items queue upstream) until a
//! `resume_consumption` batch names it.

use crate::channel::LocalChannelReceiver;
use crate::types::{ChannelIndex, StreamElement};
use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Select;

/// The gate contract consumed by the checkpointed input layer.
///
/// Implementations guarantee that a paused channel contributes nothing
/// between the barrier that paused it and the resume batch that names it.
pub trait InputGate: Send {
    /// Next element from any deliverable channel.
    ///
    /// Blocks cooperatively while all deliverable channels are empty.
    /// Returns `None` once every channel has ended or the gate is closed.
    fn poll_next(&mut self) -> Result<Option<(ChannelIndex, StreamElement)>>;

    /// Unblock a batch of channels. Idempotent on already-unblocked and
    /// already-ended channels.
    fn resume_consumption(&mut self, channels: &[ChannelIndex]) -> Result<()>;

    /// Number of input channels (fixed at construction).
    fn num_channels(&self) -> usize;

    /// True once every channel has delivered its end-of-partition marker.
    fn is_finished(&self) -> bool;

    /// Release queued elements, recycling their buffers. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// In-process input gate over local crossbeam channels.
///
/// Fair selection across deliverable channels via crossbeam's `Select`;
/// ended and paused channels are excluded from selection.
pub struct LocalInputGate {
    channels: Vec<LocalChannelReceiver>,
    paused: Vec<bool>,
    ended: Vec<bool>,
    ended_count: usize,
    closed: bool,
}

impl LocalInputGate {
    /// Create a gate over the given input channels.
    pub fn new(channels: Vec<LocalChannelReceiver>) -> Self {
        let num_channels = channels.len();
        Self {
            channels,
            paused: vec![false; num_channels],
            ended: vec![false; num_channels],
            ended_count: 0,
            closed: false,
        }
    }

    /// Channels currently paused by an in-flight alignment.
    pub fn paused_channels(&self) -> Vec<ChannelIndex> {
        self.paused
            .iter()
            .enumerate()
            .filter_map(|(idx, paused)| paused.then_some(idx))
            .collect()
    }

    fn mark_ended(&mut self, channel_idx: ChannelIndex) {
        if !self.ended[channel_idx] {
            self.ended[channel_idx] = true;
            self.ended_count += 1;
        }
    }
}

impl InputGate for LocalInputGate {
    fn poll_next(&mut self) -> Result<Option<(ChannelIndex, StreamElement)>> {
        if self.closed || self.ended_count == self.channels.len() {
            return Ok(None);
        }

        // Build a selection over deliverable channels.
        let mut select = Select::new();
        let mut active_indices = Vec::new();
        for (idx, receiver) in self.channels.iter().enumerate() {
            if !self.ended[idx] && !self.paused[idx] {
                select.recv(&receiver.receiver);
                active_indices.push(idx);
            }
        }
        if active_indices.is_empty() {
            bail!("all open channels are blocked, gate cannot make progress");
        }

        let oper = select.select();
        let channel_idx = active_indices[oper.index()];
        let element = oper
            .recv(&self.channels[channel_idx].receiver)
            .map_err(|_| anyhow!("channel {} closed unexpectedly", channel_idx))?;

        match &element {
            StreamElement::EndOfPartition => self.mark_ended(channel_idx),
            StreamElement::Barrier(barrier) if barrier.options.needs_alignment() => {
                // The channel stays silent until the aligner resumes it.
                self.paused[channel_idx] = true;
            }
            _ => {}
        }

        Ok(Some((channel_idx, element)))
    }

    fn resume_consumption(&mut self, channels: &[ChannelIndex]) -> Result<()> {
        for &idx in channels {
            if idx >= self.channels.len() {
                bail!("channel index {} out of bounds", idx);
            }
            self.paused[idx] = false;
        }
        Ok(())
    }

    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn is_finished(&self) -> bool {
        self.closed || self.ended_count == self.channels.len()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Drain queued elements so held buffers go back to their recyclers.
        for receiver in &self.channels {
            while let Ok(Some(_element)) = receiver.try_recv() {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, CountingRecycler};
    use crate::channel::local_channel;
    use crate::checkpoint::{CheckpointOptions, CheckpointStorageLocation, CheckpointType};
    use crate::types::Barrier;

    #[test]
    fn test_gate_single_channel_delivery() {
        let (sender, receiver) = local_channel(10);
        let mut gate = LocalInputGate::new(vec![receiver]);

        sender.send(StreamElement::buffer(vec![42])).unwrap();
        sender.send(StreamElement::EndOfPartition).unwrap();

        let (ch, element) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 0);
        assert!(element.is_buffer());

        let (ch, element) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 0);
        assert!(matches!(element, StreamElement::EndOfPartition));

        assert!(gate.is_finished());
        assert!(gate.poll_next().unwrap().is_none());
    }

    #[test]
    fn test_gate_delivers_from_both_channels() {
        let (sender0, receiver0) = local_channel(10);
        let (sender1, receiver1) = local_channel(10);
        let mut gate = LocalInputGate::new(vec![receiver0, receiver1]);

        sender0.send(StreamElement::buffer(vec![1])).unwrap();
        sender1.send(StreamElement::buffer(vec![2])).unwrap();

        let mut seen = vec![];
        for _ in 0..2 {
            let (ch, element) = gate.poll_next().unwrap().unwrap();
            match element {
                StreamElement::Buffer(buffer) => seen.push((ch, buffer.data().to_vec())),
                other => panic!("expected buffer, got {other:?}"),
            }
        }
        seen.sort();
        assert_eq!(seen, vec![(0, vec![1]), (1, vec![2])]);
    }

    #[test]
    fn test_aligned_barrier_pauses_channel_until_resumed() {
        let (sender0, receiver0) = local_channel(10);
        let (sender1, receiver1) = local_channel(10);
        let mut gate = LocalInputGate::new(vec![receiver0, receiver1]);

        sender0.send(StreamElement::barrier(1)).unwrap();
        sender0.send(StreamElement::buffer(vec![10])).unwrap();
        sender1.send(StreamElement::buffer(vec![20])).unwrap();

        let (ch, element) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 0);
        assert!(matches!(element, StreamElement::Barrier(_)));
        assert_eq!(gate.paused_channels(), vec![0]);

        // Channel 0 has data queued but must stay silent.
        let (ch, _) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 1);

        gate.resume_consumption(&[0]).unwrap();
        let (ch, element) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 0);
        match element {
            StreamElement::Buffer(buffer) => assert_eq!(buffer.data(), &[10]),
            other => panic!("expected buffer, got {other:?}"),
        }
    }

    #[test]
    fn test_at_least_once_barrier_does_not_pause() {
        let (sender, receiver) = local_channel(10);
        let (_other_sender, other_receiver) = local_channel(1);
        let mut gate = LocalInputGate::new(vec![receiver, other_receiver]);

        let options = CheckpointOptions::not_exactly_once(
            CheckpointType::Checkpoint,
            CheckpointStorageLocation::default_location(),
        );
        sender
            .send(StreamElement::Barrier(Barrier::with_options(1, 0, options)))
            .unwrap();
        sender.send(StreamElement::buffer(vec![5])).unwrap();

        gate.poll_next().unwrap().unwrap();
        assert!(gate.paused_channels().is_empty());
        let (ch, _) = gate.poll_next().unwrap().unwrap();
        assert_eq!(ch, 0);
    }

    #[test]
    fn test_all_open_channels_blocked_is_an_error() {
        let (sender, receiver) = local_channel(10);
        let mut gate = LocalInputGate::new(vec![receiver]);

        sender.send(StreamElement::barrier(1)).unwrap();
        gate.poll_next().unwrap().unwrap();

        // The only channel is paused and nothing can resume it here.
        assert!(gate.poll_next().is_err());
    }

    #[test]
    fn test_resume_is_idempotent() {
        let (_sender, receiver) = local_channel(4);
        let mut gate = LocalInputGate::new(vec![receiver]);
        gate.resume_consumption(&[0]).unwrap();
        gate.resume_consumption(&[0]).unwrap();
        assert!(gate.resume_consumption(&[3]).is_err());
    }

    #[test]
    fn test_close_recycles_queued_buffers() {
        let recycler = CountingRecycler::new();
        let (sender, receiver) = local_channel(10);
        let mut gate = LocalInputGate::new(vec![receiver]);

        for payload in [vec![1], vec![2, 2]] {
            sender
                .send(StreamElement::Buffer(Buffer::new(
                    payload,
                    recycler.clone(),
                )))
                .unwrap();
        }

        gate.close().unwrap();
        gate.close().unwrap();
        assert_eq!(recycler.recycled_count(), 2);
        assert!(gate.is_finished());
        assert!(gate.poll_next().unwrap().is_none());
    }
}
