//! Edit Target Location
//!
//! A replacement must land on exactly one occurrence of the target. When the
//! raw text occurs several times, the edit still proceeds if exactly one of
//! those occurrences is bounded by line breaks (or the start/end of the file)
//! on both sides. This is a best-effort disambiguation, not a uniqueness proof.

use agent_runtime_core::{CoreError, CoreResult};

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub content: String,
    pub replacements: usize,
}

fn is_line_bounded(content: &str, start: usize, len: usize) -> bool {
    let end = start + len;
    let clean_start = start == 0 || content[..start].ends_with('\n');
    let clean_end = end == content.len() || content[end..].starts_with(['\n', '\r']);
    clean_start && clean_end
}

/// Byte offset of the single occurrence an edit should replace.
pub fn locate_unique(content: &str, target: &str) -> CoreResult<usize> {
    if target.is_empty() {
        return Err(CoreError::validation("old_string must not be empty"));
    }

    let positions: Vec<usize> = content.match_indices(target).map(|(i, _)| i).collect();
    match positions.len() {
        0 => Err(CoreError::invocation(
            "String not found in file. Make sure old_string matches the file contents exactly, including whitespace.",
        )),
        1 => Ok(positions[0]),
        count => {
            let bounded: Vec<usize> = positions
                .into_iter()
                .filter(|&p| is_line_bounded(content, p, target.len()))
                .collect();
            if bounded.len() == 1 {
                Ok(bounded[0])
            } else {
                Err(CoreError::invocation(format!(
                    "old_string appears {} times in the file. Include more surrounding context to identify a single occurrence, or set replace_all to true.",
                    count
                )))
            }
        }
    }
}

/// Replace `old` with `new` in `content`.
///
/// With `replace_all` every occurrence is replaced and at least one must
/// exist; otherwise the target must be located by `locate_unique`.
pub fn apply_edit(content: &str, old: &str, new: &str, replace_all: bool) -> CoreResult<EditOutcome> {
    if old == new {
        return Err(CoreError::validation(
            "old_string and new_string are identical; nothing to change",
        ));
    }

    if replace_all {
        if old.is_empty() {
            return Err(CoreError::validation("old_string must not be empty"));
        }
        let replacements = content.matches(old).count();
        if replacements == 0 {
            return Err(CoreError::invocation("String not found in file."));
        }
        return Ok(EditOutcome {
            content: content.replace(old, new),
            replacements,
        });
    }

    let at = locate_unique(content, old)?;
    let mut updated = String::with_capacity(content.len() + new.len());
    updated.push_str(&content[..at]);
    updated.push_str(new);
    updated.push_str(&content[at + old.len()..]);
    Ok(EditOutcome {
        content: updated,
        replacements: 1,
    })
}
