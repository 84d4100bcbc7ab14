//! Human-readable summaries for the terminal.

use std::fmt::Write;

use crate::collector::Collection;
use crate::model::{FileError, MatchReason, PairingResult};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Render pairs, orphans and file errors
pub fn format_result(result: &PairingResult, errors: &[FileError]) -> String {
    let mut out = String::new();

    for pair in &result.pairs {
        let _ = writeln!(out, "🎬 {}", pair.video.full_path);
        if pair.subtitles.is_empty() {
            let _ = writeln!(out, "   (no subtitle yet)");
        }
        for subtitle in &pair.subtitles {
            let decision = result.decision_for(&subtitle.full_path);
            let language = subtitle
                .language_guess
                .as_deref()
                .map(|l| format!(" [{}]", l))
                .unwrap_or_default();
            let marker = if decision.map(|d| d.is_ambiguous()).unwrap_or(false) {
                "⚠️ "
            } else {
                "✓"
            };
            let score = decision.map(|d| d.score).unwrap_or_default();
            let _ = writeln!(
                out,
                "   {} {}{} ({:.2})",
                marker, subtitle.full_path, language, score
            );
            if let Some(ambiguity) = decision.and_then(|d| d.ambiguity.as_ref()) {
                let _ = writeln!(
                    out,
                    "      uncertain: {} scored {:.2}, settled by {:?}",
                    ambiguity.runner_up, ambiguity.runner_up_score, ambiguity.resolved_by
                );
            }
        }
    }

    if !result.orphans.is_empty() {
        let _ = writeln!(out, "\n🧩 Orphaned subtitles");
        for orphan in &result.orphans {
            let _ = write!(out, "   ✗ {}", orphan.full_path);
            if let Some(decision) = result.decision_for(&orphan.full_path) {
                match (&decision.reason, &decision.candidate_video) {
                    (MatchReason::BelowThreshold, Some(video)) => {
                        let _ = write!(
                            out,
                            " (best: {} at {:.2})",
                            video.full_path, decision.score
                        );
                    }
                    (reason, _) => {
                        let _ = write!(out, " ({})", reason);
                    }
                }
                if let Some(ambiguity) = &decision.ambiguity {
                    let _ = write!(
                        out,
                        ", uncertain: {} scored {:.2}",
                        ambiguity.runner_up, ambiguity.runner_up_score
                    );
                }
            }
            out.push('\n');
        }
    }

    if !errors.is_empty() {
        let _ = writeln!(out, "\n⚠️  Files with problems");
        for error in errors {
            let _ = writeln!(out, "   {}: {}", error.path, error.message);
        }
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(
        out,
        "📊 {} videos, {} subtitles matched, {} orphaned",
        result.pairs.len(),
        result.matched_subtitle_count(),
        result.orphans.len()
    );
    out
}

/// Render what a drop contained
pub fn format_collection(collection: &Collection) -> String {
    let mut out = String::new();
    for collected in &collection.files {
        let _ = writeln!(
            out,
            "{:>9}  {:>12}  {}",
            collected.file.kind.to_string(),
            collected.file.size,
            collected.file.full_path
        );
    }
    for error in &collection.errors {
        let _ = writeln!(out, "⚠️  {}: {}", error.path, error.message);
    }
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "📁 {} files, {} errors",
        collection.files.len(),
        collection.errors.len()
    );
    out
}
