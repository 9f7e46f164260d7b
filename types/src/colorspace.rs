/// Pixel layout of an incoming frame, as handed to `push` (§6).
///
/// `RGBA` is converted to 3-channel `BGR` on ingestion; `RGB`/`BGRA` are
/// accepted directly by the coordinate converter stage. Unknown layouts
/// are a precondition failure ([`crate::error::StitchError::UnsupportedColorspace`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colorspace {
    Rgb,
    Rgba,
    Bgra,
}
