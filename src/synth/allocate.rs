//! Fitting prioritized sections into a character budget.
//!
//! Under budget, sections are emitted whole. Over budget, each non-empty
//! section gets a share of the budget by priority weight and is cut back to
//! the nearest sentence or line boundary that keeps at least half its share.

use crate::models::DocumentSection;

use super::char_prefix;

/// Budget held back for section headers and the context banner.
pub const HEADER_OVERHEAD: usize = 100;

/// Distance kept between a hard cut and the end of a section's share.
pub const BOUNDARY_MARGIN: usize = 50;

/// Appended to a section that was cut short.
pub const SECTION_TRUNCATION_MARKER: &str = "\n[... section truncated ...]";

/// Percentage of the budget a section of the given priority receives.
pub fn priority_weight(priority: u32) -> usize {
    match priority {
        1 => 40,
        2 => 30,
        3 => 20,
        _ => 10,
    }
}

/// Assemble `sections` into a single context block of at most `total_budget`
/// characters (plus header slack). Sections come out in ascending priority;
/// ties keep their input order. Empty sections produce nothing.
pub fn allocate(sections: &[DocumentSection], total_budget: usize) -> String {
    let mut ordered: Vec<&DocumentSection> = sections
        .iter()
        .filter(|s| !s.content.trim().is_empty())
        .collect();
    ordered.sort_by_key(|s| s.priority);

    let total_length: usize = sections.iter().map(|s| s.content.chars().count()).sum();
    let mut out = String::new();

    if total_length <= total_budget {
        out.push_str(&format!("Context ({} characters):\n\n", total_length));
        for section in ordered {
            push_section(&mut out, &section.title, &section.content);
        }
        return out;
    }

    let available = total_budget.saturating_sub(HEADER_OVERHEAD);
    // Many low-priority sections could be promised more than 100% between them.
    let weight_sum: usize = ordered.iter().map(|s| priority_weight(s.priority)).sum();
    let scale = weight_sum.max(100);

    tracing::debug!(
        total_length,
        total_budget,
        sections = ordered.len(),
        "Context over budget, allocating by priority"
    );

    out.push_str(&format!(
        "Context (fitted from {} characters):\n\n",
        total_length
    ));
    for section in ordered {
        let allocation = available * priority_weight(section.priority) / scale;
        let body = fit_section(&section.content, allocation);
        push_section(&mut out, &section.title, &body);
    }
    out
}

/// Cut `content` down to `allocation` characters.
///
/// The hard cut sits [`BOUNDARY_MARGIN`] characters before the end of the
/// share. If a period or newline occurs before it and past the middle of the
/// share, the cut moves back to that boundary.
pub fn fit_section(content: &str, allocation: usize) -> String {
    if content.chars().count() <= allocation {
        return content.to_string();
    }

    let prefix = char_prefix(content, allocation.saturating_sub(BOUNDARY_MARGIN));
    let cut = match prefix.rfind(|c| c == '.' || c == '\n') {
        Some(idx) if prefix[..idx].chars().count() > allocation / 2 => &prefix[..=idx],
        _ => prefix,
    };

    format!("{}{}", cut.trim_end(), SECTION_TRUNCATION_MARKER)
}

fn push_section(out: &mut String, title: &str, body: &str) {
    out.push_str("## ");
    out.push_str(title);
    out.push('\n');
    out.push_str(body);
    out.push_str("\n\n");
}
