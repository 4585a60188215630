//! Recoverable editing errors.

use crate::elements::ElementId;
use thiserror::Error;

/// Why a creation or drop was refused. Nothing is created; callers treat
/// this as a rejected signal, never as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("panel would overlap panel {with}")]
    Overlap { with: ElementId },
    #[error("drop point is not inside any panel")]
    OutsidePanel,
}
