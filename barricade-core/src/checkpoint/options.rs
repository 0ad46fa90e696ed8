use super::*;

/// Type of snapshot the barrier announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointType {
    Checkpoint,
    Savepoint,
}

impl CheckpointType {
    pub fn is_savepoint(self) -> bool {
        matches!(self, Self::Savepoint)
    }
}

/// How a checkpoint should be aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignmentType {
    AtLeastOnce,
    Aligned,
    Unaligned,
    ForcedAligned,
}

/// Reference to the storage location the snapshot should be written to.
///
/// The default location is resolved by the state backend; a custom
/// reference is an opaque pointer the backend handed out earlier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointStorageLocation(Option<Vec<u8>>);

impl CheckpointStorageLocation {
    pub fn default_location() -> Self {
        Self(None)
    }

    pub fn custom(reference: Vec<u8>) -> Self {
        Self(Some(reference))
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    pub fn reference_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

/// Options for performing the checkpoint, carried by every barrier.
///
/// Only the factory functions construct these, which keeps invalid
/// combinations (an unaligned savepoint) unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointOptions {
    checkpoint_type: CheckpointType,
    target_location: CheckpointStorageLocation,
    alignment: AlignmentType,
}

impl CheckpointOptions {
    /// Exactly-once checkpoint or savepoint with full barrier alignment.
    pub fn aligned(
        checkpoint_type: CheckpointType,
        target_location: CheckpointStorageLocation,
    ) -> Self {
        Self {
            checkpoint_type,
            target_location,
            alignment: AlignmentType::Aligned,
        }
    }

    /// At-least-once checkpoint: barriers pass through without blocking.
    pub fn not_exactly_once(
        checkpoint_type: CheckpointType,
        target_location: CheckpointStorageLocation,
    ) -> Self {
        Self {
            checkpoint_type,
            target_location,
            alignment: AlignmentType::AtLeastOnce,
        }
    }

    /// Unaligned checkpoint. Savepoints can never be unaligned, so the
    /// checkpoint type is fixed.
    pub fn unaligned(target_location: CheckpointStorageLocation) -> Self {
        Self {
            checkpoint_type: CheckpointType::Checkpoint,
            target_location,
            alignment: AlignmentType::Unaligned,
        }
    }

    /// Resolve the alignment mode from the job configuration.
    pub fn for_config(
        checkpoint_type: CheckpointType,
        target_location: CheckpointStorageLocation,
        exactly_once: bool,
        unaligned_enabled: bool,
    ) -> Self {
        if !exactly_once {
            Self::not_exactly_once(checkpoint_type, target_location)
        } else if checkpoint_type.is_savepoint() || !unaligned_enabled {
            Self::aligned(checkpoint_type, target_location)
        } else {
            Self::unaligned(target_location)
        }
    }

    /// Default-location aligned checkpoint.
    pub fn for_checkpoint_with_default_location() -> Self {
        Self::aligned(
            CheckpointType::Checkpoint,
            CheckpointStorageLocation::default_location(),
        )
    }

    pub fn checkpoint_type(&self) -> CheckpointType {
        self.checkpoint_type
    }

    pub fn target_location(&self) -> &CheckpointStorageLocation {
        &self.target_location
    }

    pub fn alignment(&self) -> AlignmentType {
        self.alignment
    }

    pub fn is_exactly_once_mode(&self) -> bool {
        self.alignment != AlignmentType::AtLeastOnce
    }

    pub fn is_unaligned(&self) -> bool {
        self.alignment == AlignmentType::Unaligned
    }

    /// Downgrade an unaligned checkpoint to forced alignment, for runtime
    /// points that cannot take unaligned snapshots.
    pub fn with_unaligned_unsupported(self) -> Self {
        if self.is_unaligned() {
            Self {
                alignment: AlignmentType::ForcedAligned,
                ..self
            }
        } else {
            self
        }
    }

    /// Whether barriers carrying these options block their channel until
    /// the checkpoint aligns.
    pub fn needs_alignment(&self) -> bool {
        self.is_exactly_once_mode()
            && (self.checkpoint_type.is_savepoint() || !self.is_unaligned())
    }
}
