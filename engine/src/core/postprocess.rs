//! Cleanup of raw provider output before it is served or scored

/// Normalize line endings, strip a whole-document code fence, and
/// collapse runs of blank lines. The raw output is kept verbatim on the
/// result; only the processed copy is tidied.
pub fn tidy_output(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let trimmed = normalized.trim();

    // Models often wrap the entire document in a markdown fence
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) if trimmed.ends_with("```") => {
            let body = rest.strip_suffix("```").unwrap_or(rest);
            // Drop a language tag on the opening fence
            match body.split_once('\n') {
                Some((first_line, remainder)) if !first_line.trim().contains(' ') => remainder,
                _ => body,
            }
        }
        _ => trimmed,
    };

    let mut out = String::with_capacity(unfenced.len());
    let mut blank_run = 0usize;
    for line in unfenced.trim().lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim_end().to_string()
}
