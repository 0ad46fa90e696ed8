//! # Barricade Core
//!
//! Task-side checkpoint barrier alignment for the Barricade streaming
//! runtime: the input boundary of the Chandy-Lamport snapshot protocol.
//!
//! - [`types`] — Stream item model: [`StreamElement`](types::StreamElement),
//!   [`Barrier`](types::Barrier), [`CancelBarrier`](types::CancelBarrier),
//!   [`BufferOrEvent`](types::BufferOrEvent) with channel tagging.
//! - [`buffer`] — Data payloads with an explicit recycling contract:
//!   [`Buffer`](buffer::Buffer), [`BufferRecycler`](buffer::BufferRecycler).
//! - [`channel`] — Bounded local channels feeding a gate.
//! - [`input_gate`] — The [`InputGate`](input_gate::InputGate) contract and
//!   the in-process [`LocalInputGate`](input_gate::LocalInputGate).
//! - [`checkpoint`] — Barrier alignment:
//!   [`BarrierAligner`](checkpoint::BarrierAligner),
//!   [`CheckpointedInputGate`](checkpoint::CheckpointedInputGate),
//!   [`CheckpointNotifier`](checkpoint::CheckpointNotifier).

pub mod buffer;
pub mod channel;
pub mod checkpoint;
pub mod input_gate;
pub mod types;
