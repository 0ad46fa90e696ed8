//! Local channels feeding an input gate.
//!
//! Uses crossbeam-channel for bounded, backpressure-aware delivery from
//! upstream producers into the task's input gate.

use crate::types::StreamElement;
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

/// Default channel buffer size (bounded for backpressure).
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Sender side of a local input channel.
#[derive(Clone)]
pub struct LocalChannelSender {
    sender: Sender<StreamElement>,
}

impl LocalChannelSender {
    /// Send a stream element to the channel.
    ///
    /// Blocks if the channel is full (backpressure).
    pub fn send(&self, element: StreamElement) -> Result<()> {
        self.sender
            .send(element)
            .map_err(|_| anyhow!("channel closed: receiver dropped"))
    }

    /// Try to send without blocking.
    ///
    /// Returns error if the channel is full or closed.
    pub fn try_send(&self, element: StreamElement) -> Result<()> {
        self.sender
            .try_send(element)
            .map_err(|e| anyhow!("failed to send: {:?}", e))
    }
}

/// Receiver side of a local input channel.
pub struct LocalChannelReceiver {
    pub(crate) receiver: Receiver<StreamElement>,
}

impl LocalChannelReceiver {
    /// Receive the next stream element, blocking until one is available.
    pub fn recv(&self) -> Result<StreamElement> {
        self.receiver
            .recv()
            .map_err(|_| anyhow!("channel closed: sender dropped"))
    }

    /// Try to receive without blocking. Returns `None` when empty.
    pub fn try_recv(&self) -> Result<Option<StreamElement>> {
        match self.receiver.try_recv() {
            Ok(element) => Ok(Some(element)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                Err(anyhow!("channel closed: sender dropped"))
            }
        }
    }
}

/// Create a bounded local channel pair.
///
/// When the channel is full, `send()` blocks until space is available,
/// propagating backpressure to the producer.
pub fn local_channel(capacity: usize) -> (LocalChannelSender, LocalChannelReceiver) {
    let (sender, receiver) = bounded(capacity);
    (
        LocalChannelSender { sender },
        LocalChannelReceiver { receiver },
    )
}

/// Create a local channel with default capacity.
pub fn local_channel_default() -> (LocalChannelSender, LocalChannelReceiver) {
    local_channel(DEFAULT_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_channel_send_recv() {
        let (sender, receiver) = local_channel(10);

        sender.send(StreamElement::buffer(vec![42])).unwrap();

        match receiver.recv().unwrap() {
            StreamElement::Buffer(buffer) => assert_eq!(buffer.data(), &[42]),
            other => panic!("expected buffer, got {other:?}"),
        }
    }

    #[test]
    fn test_local_channel_barrier() {
        let (sender, receiver) = local_channel(10);

        sender
            .send(StreamElement::barrier_with_timestamp(3, 1000))
            .unwrap();

        match receiver.recv().unwrap() {
            StreamElement::Barrier(barrier) => {
                assert_eq!(barrier.checkpoint_id, 3);
                assert_eq!(barrier.timestamp, 1000);
            }
            other => panic!("expected barrier, got {other:?}"),
        }
    }

    #[test]
    fn test_local_channel_backpressure() {
        let (sender, receiver) = local_channel(2);

        sender.send(StreamElement::buffer(vec![1])).unwrap();
        sender.send(StreamElement::buffer(vec![2])).unwrap();

        // Channel full: try_send must fail.
        assert!(sender.try_send(StreamElement::buffer(vec![3])).is_err());

        receiver.recv().unwrap();
        sender.try_send(StreamElement::buffer(vec![3])).unwrap();
    }

    #[test]
    fn test_local_channel_closed() {
        let (sender, receiver) = local_channel(10);

        sender.send(StreamElement::EndOfPartition).unwrap();
        drop(sender);

        // Buffered element still deliverable after the sender is gone.
        assert!(matches!(
            receiver.recv().unwrap(),
            StreamElement::EndOfPartition
        ));
        assert!(receiver.recv().is_err());
    }

    #[test]
    fn test_local_channel_try_recv_empty() {
        let (_sender, receiver) = local_channel(4);
        assert!(receiver.try_recv().unwrap().is_none());
    }
}
