//! Pure markdown escaping utilities.

/// Escape characters that would otherwise turn text into Markdown syntax.
///
/// Always escaped: `\`, `*`, `_`, `` ` ``, `[`, `]`. At the start of a line
/// block markers are escaped too: `#`, `>`, `-`/`+` followed by a space,
/// and the dot of an ordered-list number (`1. `).
///
/// # Examples
///
/// ```
/// use epubtree::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("# not a heading"), "\\# not a heading");
/// assert_eq!(escape_markdown("a - b"), "a - b");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut at_line_start = true;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' | '*' | '_' | '`' | '[' | ']' => {
                result.push('\\');
                result.push(c);
            }
            '#' | '>' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            '-' | '+' if at_line_start && chars.peek().is_some_and(|&(_, n)| n == ' ') => {
                result.push('\\');
                result.push(c);
            }
            '0'..='9' if at_line_start => {
                let digits = text[i..].bytes().take_while(u8::is_ascii_digit).count();
                let after = &text[i + digits..];
                result.push_str(&text[i..i + digits]);
                for _ in 1..digits {
                    chars.next();
                }
                if after.starts_with(". ") {
                    result.push_str("\\.");
                    chars.next();
                }
                at_line_start = false;
                continue;
            }
            _ => result.push(c),
        }
        at_line_start = c == '\n';
    }

    result
}

/// Collapse every run of ASCII whitespace to a single space.
///
/// Non-breaking spaces are content and are left alone.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                result.push(' ');
            }
            in_space = true;
        } else {
            result.push(c);
            in_space = false;
        }
    }
    result
}

/// Calculate the minimum fence length needed for a code block.
///
/// Returns the smallest number of fence characters (at least 3) that
/// doesn't appear as a run in the content.
///
/// ```
/// use epubtree::markdown::calculate_fence_length;
///
/// assert_eq!(calculate_fence_length("let x = 1;", '`'), 3);
/// assert_eq!(calculate_fence_length("```rust\ncode\n```", '`'), 4);
/// ```
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Calculate the minimum backtick count needed for inline code.
///
/// ```
/// use epubtree::markdown::calculate_inline_code_ticks;
///
/// assert_eq!(calculate_inline_code_ticks("code"), 1);
/// assert_eq!(calculate_inline_code_ticks("code with ` backtick"), 2);
/// ```
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

fn longest_run(content: &str, target: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;
    for c in content.chars() {
        if c == target {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }
    max_run
}

/// Percent-encode the characters that end or format a Markdown link target.
pub fn encode_link_target(href: &str) -> String {
    let mut encoded = String::with_capacity(href.len());
    for c in href.chars() {
        match c {
            '(' => encoded.push_str("%28"),
            ')' => encoded.push_str("%29"),
            '_' => encoded.push_str("%5F"),
            '*' => encoded.push_str("%2A"),
            _ => encoded.push(c),
        }
    }
    encoded
}
