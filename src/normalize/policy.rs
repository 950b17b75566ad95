//! Tag classification.

/// Non-content tags whose whole subtree is dropped.
pub const OMITTED_TAGS: &[&str] = &["head", "input", "textarea", "script", "style", "svg"];

/// Grouping tags that contribute their children but no node of their own.
pub const UNWRAP_TAGS: &[&str] = &["body", "html", "div", "span"];

/// Prose blocks whose content is flattened to Markdown.
pub const MARKDOWN_INNER_TAGS: &[&str] = &["p", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Containers rendered to Markdown including their own tag.
pub const MARKDOWN_OUTER_TAGS: &[&str] = &["ol", "ul"];

/// How the normalizer treats an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolicy {
    /// Drop the element and everything under it.
    Omit,
    /// Splice the children into the parent.
    Unwrap,
    /// Keep the element; its content becomes one Markdown text child.
    FlattenInner,
    /// Keep the element; its own markup becomes one Markdown text child.
    FlattenOuter,
    /// Keep the element and normalize its children.
    Structured,
}

impl TagPolicy {
    /// Classify a tag name, case-insensitively.
    pub fn of(tag: &str) -> Self {
        let is = |set: &[&str]| set.iter().any(|t| t.eq_ignore_ascii_case(tag));
        if is(OMITTED_TAGS) {
            TagPolicy::Omit
        } else if is(UNWRAP_TAGS) {
            TagPolicy::Unwrap
        } else if is(MARKDOWN_INNER_TAGS) {
            TagPolicy::FlattenInner
        } else if is(MARKDOWN_OUTER_TAGS) {
            TagPolicy::FlattenOuter
        } else {
            TagPolicy::Structured
        }
    }
}
