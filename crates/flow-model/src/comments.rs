//! Comment detection for function bodies

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("block comment pattern is valid"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//.*$").expect("line comment pattern is valid"));

/// Check whether a code body holds nothing but comments and whitespace.
///
/// Block comments are removed first, then line comments. An empty or
/// whitespace-only body also counts as comment-only.
pub fn is_comment_only(code: &str) -> bool {
    if code.trim().is_empty() {
        return true;
    }
    let without_blocks = BLOCK_COMMENT.replace_all(code, "");
    let stripped = LINE_COMMENT.replace_all(&without_blocks, "");
    stripped.trim().is_empty()
}
