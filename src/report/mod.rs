//! Plain-text rendering of fit results.
//!
//! Formatting lives here so the fitting code stays free of layout concerns.

use std::fmt;

use crate::domain::Output;

/// Render an [`Output`] as a parameter table followed by the covariance.
///
/// `names` labels the rows; missing names fall back to `p0`, `p1`, ...
pub fn format_output(out: &Output, names: Option<&[&str]>) -> String {
    let label = |i: usize| -> String {
        names
            .and_then(|n| n.get(i))
            .map_or_else(|| format!("p{i}"), |s| (*s).to_string())
    };

    let mut text = String::new();
    text.push_str(format!("{:<12} {:>14} {:>14}", "param", "value", "error").trim_end());
    text.push('\n');
    text.push_str(format!("{:-<12} {:-<14} {:-<14}", "", "", "").trim_end());
    text.push('\n');
    for (i, (v, e)) in out.values.iter().zip(&out.errors).enumerate() {
        text.push_str(format!("{:<12} {v:>14.6} {e:>14.6}", truncate(&label(i), 12)).trim_end());
        text.push('\n');
    }

    text.push_str("\nCovariance:\n");
    for row in &out.covariance {
        text.push_str(&fmt_row(row));
        text.push('\n');
    }
    text
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_output(self, None))
    }
}

fn fmt_row(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:>13.6e}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
