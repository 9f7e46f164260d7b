/// Recorder graph generation mode (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMode {
    /// Every ring from pole to pole.
    FullSphere,
    /// Only the equatorial (center) ring.
    CenterOnly,
    /// Three rings: center plus one pair, outermost ring pair removed.
    Truncated,
    /// Every ring except the bottom-most.
    NoBottom,
}
