use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The expression is not numbers and hyphens, e.g. `"a-b"`.
    #[error("invalid page range \"{0}\"; use numbers and hyphens (e.g. 1-3, 5)")]
    Syntax(String),
    /// The expression parsed but selected no page of the document.
    #[error("no valid pages selected")]
    Empty,
}

/// Parses a comma-separated list of 1-based single pages and inclusive
/// `a-b` ranges into 0-based indices, deduplicated and order-preserving.
///
/// Range endpoints are clamped into `[1, page_count]`; single pages outside
/// that interval are skipped. A selection that ends up empty is reported
/// distinctly from malformed syntax.
pub fn parse_page_ranges(expression: &str, page_count: usize) -> Result<Vec<usize>, RangeError> {
    let mut selected = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |index: usize, selected: &mut Vec<usize>| {
        if seen.insert(index) {
            selected.push(index);
        }
    };

    for part in expression.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start
                .trim()
                .parse()
                .map_err(|_| RangeError::Syntax(part.to_string()))?;
            let end: usize = end
                .trim()
                .parse()
                .map_err(|_| RangeError::Syntax(part.to_string()))?;
            let start = start.max(1);
            let end = end.min(page_count);
            for page in start..=end {
                push(page - 1, &mut selected);
            }
        } else {
            let page: usize = part
                .parse()
                .map_err(|_| RangeError::Syntax(part.to_string()))?;
            if (1..=page_count).contains(&page) {
                push(page - 1, &mut selected);
            }
        }
    }

    if selected.is_empty() {
        return Err(RangeError::Empty);
    }
    Ok(selected)
}
