//! Gap analysis — per-target priority weights from level deltas and
//! manager review text.

use std::collections::HashMap;

use crate::models::catalog::{clamp_level, SkillTarget, MAX_LEVEL, MIN_LEVEL};

/// Added to a skill's normalized gap when a performance review names it
/// under a weaknesses section. Captures qualitative signal the numeric
/// levels miss.
pub const WEAKNESS_BOOST: f64 = 0.15;

/// Largest possible level delta on the 1–10 scale.
const LEVEL_SPAN: f64 = (MAX_LEVEL - MIN_LEVEL) as f64;

/// Normalized gap in [0,1] between a current and a target level.
/// Levels are clamped into [1,10] first; a target at or below the current
/// level yields 0.0 rather than an error.
pub fn normalized_gap(current_level: u8, target_level: u8) -> f64 {
    let current = clamp_level(current_level);
    let target = clamp_level(target_level);
    f64::from(target.saturating_sub(current)) / LEVEL_SPAN
}

/// Computes a priority weight in [0,1] per target skill.
///
/// Duplicate targets for the same skill keep the larger gap. `skill_names`
/// maps catalog ids to names for the review-text match.
pub fn analyze_gaps(
    targets: &[SkillTarget],
    performance_reports: &[String],
    skill_names: &HashMap<String, String>,
) -> HashMap<String, f64> {
    let weak_sections: Vec<String> = performance_reports
        .iter()
        .filter_map(|report| weakness_section(report))
        .collect();

    let mut gaps: HashMap<String, f64> = HashMap::new();
    for target in targets {
        let mut gap = normalized_gap(target.current_level, target.target_level);

        if let Some(name) = skill_names.get(&target.skill_id) {
            let name_lower = name.to_lowercase();
            if !name_lower.is_empty()
                && weak_sections.iter().any(|s| s.contains(&name_lower))
            {
                gap = (gap + WEAKNESS_BOOST).min(1.0);
            }
        }

        let entry = gaps.entry(target.skill_id.clone()).or_insert(0.0);
        if gap > *entry {
            *entry = gap;
        }
    }
    gaps
}

/// Extracts the lowercased weaknesses section of a review, if present.
///
/// A section starts at a line whose header mentions "weakness" (e.g.
/// "Weaknesses:") and runs until the next header-looking line (ends with
/// ':' and is not a list item) or the end of the text. Inline text on the
/// header line itself ("Weaknesses: poor fundamentals") belongs to the
/// section too.
fn weakness_section(report: &str) -> Option<String> {
    let mut section = String::new();
    let mut in_weaknesses = false;

    for line in report.lines() {
        let trimmed = trim_line(line);
        let lower = trimmed.to_lowercase();
        let is_list_item = trimmed.starts_with('-');

        if let Some((head, rest)) = lower.split_once(':') {
            let names_weaknesses = head.contains("weakness");
            if !is_list_item && (names_weaknesses || rest.trim().is_empty()) {
                in_weaknesses = names_weaknesses;
                let rest = rest.trim();
                if in_weaknesses && !rest.is_empty() {
                    section.push_str(rest);
                    section.push('\n');
                }
                continue;
            }
        }
        if in_weaknesses {
            section.push_str(&lower);
            section.push('\n');
        }
    }

    if section.trim().is_empty() {
        None
    } else {
        Some(section)
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '#')
}
