use super::*;
use crate::checkpoint::{AlignmentType, CheckpointType};

#[test]
fn test_barrier_defaults_to_aligned_checkpoint() {
    let barrier = Barrier::new(4);
    assert_eq!(barrier.checkpoint_id, 4);
    assert_eq!(barrier.timestamp, 0);
    assert_eq!(barrier.options.checkpoint_type(), CheckpointType::Checkpoint);
    assert_eq!(barrier.options.alignment(), AlignmentType::Aligned);
    assert!(barrier.options.needs_alignment());
}

#[test]
fn test_barrier_with_timestamp() {
    let barrier = Barrier::with_timestamp(9, 1234);
    assert_eq!(barrier.checkpoint_id, 9);
    assert_eq!(barrier.timestamp, 1234);
}

#[test]
fn test_stream_element_constructors() {
    match StreamElement::buffer(vec![1, 2]) {
        StreamElement::Buffer(buffer) => assert_eq!(buffer.data(), &[1, 2]),
        other => panic!("expected buffer element, got {other:?}"),
    }
    match StreamElement::barrier_with_timestamp(3, 77) {
        StreamElement::Barrier(barrier) => {
            assert_eq!(barrier.checkpoint_id, 3);
            assert_eq!(barrier.timestamp, 77);
        }
        other => panic!("expected barrier element, got {other:?}"),
    }
    match StreamElement::cancel_barrier(5) {
        StreamElement::CancelBarrier(marker) => assert_eq!(marker.checkpoint_id, 5),
        other => panic!("expected cancel marker, got {other:?}"),
    }
    assert!(StreamElement::buffer(vec![]).is_buffer());
    assert!(!StreamElement::EndOfPartition.is_buffer());
}

#[test]
fn test_input_channel_info_display() {
    let info = InputChannelInfo::new(0, 2);
    assert_eq!(info.to_string(), "gate_0_channel_2");
}

#[test]
fn test_buffer_or_event_tagging() {
    let boe = BufferOrEvent::new(InputChannelInfo::new(0, 1), StreamElement::buffer(vec![9]));
    assert!(boe.is_buffer());
    assert_eq!(boe.channel_info.channel_index, 1);
}
