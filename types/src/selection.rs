use crate::frame::Frame;
use crate::graph::SelectionPoint;

/// Emitted when the selector admits a frame for a selection point (§3).
/// Never mutated after emission — downstream stages treat it as a value.
#[derive(Debug, Clone)]
pub struct SelectionInfo {
    pub point: SelectionPoint,
    pub frame: Frame,
    pub angular_distance: f64,
    pub valid: bool,
}
