use thiserror::Error;

/// Everything that can stop a collapse before it produces an image.
#[derive(Debug, Error)]
pub enum CollapseError {
    /// Malformed invocation: empty path, non-positive size, or an unknown flag.
    #[error("argument error: {0}")]
    ArgumentError(String),

    /// The input image cannot yield a single N×N window under the chosen wrap flags.
    #[error("input too small for pattern size {pattern_size} (image is {width}x{height})")]
    InputTooSmall {
        pattern_size: usize,
        width: u32,
        height: u32,
    },

    /// Distinct-patch count would exceed the bitset capacity after symmetry expansion.
    #[error("patch capacity exceeded: found more than {capacity} distinct patches")]
    PatchCapacityExceeded { capacity: usize },

    /// A cell's candidate set was reduced to empty during propagation.
    #[error("contradiction at ({x}, {y})")]
    Contradiction { x: usize, y: usize },

    /// Decode/encode failure from the image collaborator.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CollapseError>;
