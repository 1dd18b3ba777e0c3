//! HTML fragments for analysis outcomes
//!
//! Record fields arrive pre-escaped from the normalizer and are embedded
//! as-is. The one exception is the raw model text carried by a parse-error
//! fallback, which is escaped here.

use std::fmt::Write;

use super::sanitizer::escape_html;
use crate::models::fish_analysis::{DEFAULT_SPECIAL_RULES, NOT_APPLICABLE};
use crate::models::{AnalysisOutcome, Confidence, FishAnalysis, NotFishResult};

/// Regulation value meaning "no such rule"
const NONE_VALUE: &str = "none";

/// Render an analysis outcome (or its absence) as an HTML fragment
pub fn render_analysis(outcome: Option<&AnalysisOutcome>) -> String {
    match outcome {
        None => r#"<p class="text-muted">No analysis available</p>"#.to_string(),
        Some(AnalysisOutcome::ParseError(analysis)) => render_parse_error(analysis),
        Some(AnalysisOutcome::NotFish(result)) => render_not_fish(result),
        Some(AnalysisOutcome::Fish(analysis)) => render_fish(analysis),
    }
}

fn render_parse_error(analysis: &FishAnalysis) -> String {
    format!(
        r#"<div class="alert alert-warning">
  <strong>Note:</strong> Could not parse structured data. Raw AI response:
  <p class="mt-2">{}</p>
</div>"#,
        escape_html(&analysis.additional_info)
    )
}

fn render_not_fish(result: &NotFishResult) -> String {
    format!(
        r#"<div class="alert alert-info">
  <strong>No fish detected:</strong> {}
</div>"#,
        result.reason
    )
}

fn confidence_badge(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "success",
        Confidence::Medium => "warning",
        Confidence::Low => "secondary",
    }
}

fn keep_status_badge(can_keep: &str) -> &'static str {
    match can_keep.to_lowercase().as_str() {
        "yes" => "success",
        "no" => "danger",
        "conditional" => "warning",
        _ => "secondary",
    }
}

fn render_fish(analysis: &FishAnalysis) -> String {
    let regs = &analysis.regulations;
    let mut html = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(html, r#"<div class="fish-analysis">"#);
    let _ = writeln!(
        html,
        r#"  <h6 class="mb-3">{} <span class="badge bg-{}">{} confidence</span></h6>"#,
        analysis.species,
        confidence_badge(analysis.confidence),
        analysis.confidence.as_str()
    );

    if analysis.scientific_name != NOT_APPLICABLE {
        let _ = writeln!(
            html,
            r#"  <p class="text-muted fst-italic mb-2">{}</p>"#,
            analysis.scientific_name
        );
    }

    if !analysis.characteristics.is_empty() {
        let items: String = analysis
            .characteristics
            .iter()
            .map(|c| format!("<li>{}</li>", c))
            .collect();
        let _ = writeln!(
            html,
            r#"  <div class="mb-3"><strong>Characteristics:</strong><ul class="mb-0 mt-1">{}</ul></div>"#,
            items
        );
    }

    if analysis.habitat != NOT_APPLICABLE {
        let _ = writeln!(
            html,
            r#"  <div class="mb-2"><strong>Habitat:</strong> {}</div>"#,
            analysis.habitat
        );
    }

    if analysis.size != NOT_APPLICABLE {
        let _ = writeln!(
            html,
            r#"  <div class="mb-2"><strong>Typical Size:</strong> {}</div>"#,
            analysis.size
        );
    }

    let _ = writeln!(html, r#"  <div class="card mt-3 mb-3 border-info">"#);
    let _ = writeln!(
        html,
        r#"    <div class="card-header bg-info text-white"><strong>US Fishing Regulations</strong></div>"#
    );
    let _ = writeln!(html, r#"    <div class="card-body">"#);
    let _ = writeln!(
        html,
        r#"      <div class="mb-2"><strong>Can Keep:</strong> <span class="badge bg-{}">{}</span></div>"#,
        keep_status_badge(&regs.can_keep),
        regs.can_keep
    );

    for (label, value) in [
        ("Minimum Size", &regs.minimum_size),
        ("Maximum Size", &regs.maximum_size),
        ("Bag Limit", &regs.bag_limit),
        ("Seasonal Restrictions", &regs.seasonal_restrictions),
    ] {
        if value != NONE_VALUE {
            let _ = writeln!(
                html,
                r#"      <div class="mb-2"><strong>{}:</strong> {}</div>"#,
                label, value
            );
        }
    }

    if regs.special_rules != NONE_VALUE && regs.special_rules != DEFAULT_SPECIAL_RULES {
        let _ = writeln!(
            html,
            r#"      <div class="mb-2"><strong>Special Rules:</strong> {}</div>"#,
            regs.special_rules
        );
    }

    let _ = writeln!(
        html,
        r#"      <div class="alert alert-warning mb-0 mt-3"><small><strong>Important:</strong> Always verify current local and state regulations before fishing. Rules vary by location and can change.</small></div>"#
    );
    let _ = writeln!(html, "    </div>");
    let _ = writeln!(html, "  </div>");

    if !analysis.additional_info.is_empty() {
        let _ = writeln!(
            html,
            r#"  <div class="mt-3"><strong>Additional Information:</strong><p class="mb-0">{}</p></div>"#,
            analysis.additional_info
        );
    }

    html.push_str("</div>");
    html
}
