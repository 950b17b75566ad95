//! Markdown rendering of markup subtrees.
//!
//! Paragraph-level and list elements are flattened into Markdown during
//! normalization. This module holds the pieces:
//!
//! - [`escape`]: string helpers for escaping text and sizing code fences
//! - [`render`]: the subtree → Markdown renderer
//!
//! Link and image targets go through an
//! [`AddressResolver`](crate::address::AddressResolver) before they are
//! written, so rendered Markdown never points back into the container.

mod escape;
mod render;

pub use escape::{
    calculate_fence_length, calculate_inline_code_ticks, collapse_whitespace, encode_link_target,
    escape_markdown,
};
pub use render::{MarkdownOptions, MarkdownRenderer};
