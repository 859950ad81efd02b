//! Long-running client operations.

pub mod recovery;

use uuid::Uuid;

/// Identifier of one operation run.
pub type OperationId = Uuid;

/// Allocates a fresh operation id.
pub fn operation_id() -> OperationId {
    Uuid::new_v4()
}
