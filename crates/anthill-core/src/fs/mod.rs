//! Local file primitives: content digests and size formatting.

pub mod digest;
pub mod size;

pub use digest::{md5_file, text_digest};
pub use size::format_size;
