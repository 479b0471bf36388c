//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;
use std::path::Path;

use crate::classification::{ClassificationResult, Label};
use crate::core::{CorpusReport, TrainingSummary};

fn colored_label(label: Label) -> String {
    match label {
        Label::Yes => label.name().green().bold().to_string(),
        Label::No => label.name().red().bold().to_string(),
        Label::Background => label.name().light_gray().to_string(),
    }
}

/// `YES=0.912 NO=0.050 BG=0.038`
pub fn format_scores(result: &ClassificationResult) -> String {
    Label::ALL
        .iter()
        .map(|&l| format!("{}={:.3}", l.name(), result.probability(l)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminal rendering of a single prediction
pub fn format_prediction(path: &Path, result: &ClassificationResult) -> String {
    format!(
        "{}\n  Pred: {}\n  Scores: {}\n",
        path.display().to_string().as_str().cyan(),
        colored_label(result.label),
        format_scores(result)
    )
}

#[derive(Serialize)]
struct PredictionJson<'a> {
    file: String,
    model: &'a str,
    label: &'static str,
    confidence: f32,
    scores: ScoresJson,
}

#[derive(Serialize)]
struct ScoresJson {
    yes: f32,
    no: f32,
    bg: f32,
}

pub fn format_json(path: &Path, model: &str, result: &ClassificationResult) -> String {
    let json = PredictionJson {
        file: path.display().to_string(),
        model,
        label: result.label.name(),
        confidence: result.confidence(),
        scores: ScoresJson {
            yes: result.probability(Label::Yes),
            no: result.probability(Label::No),
            bg: result.probability(Label::Background),
        },
    };
    serde_json::to_string_pretty(&json).unwrap_or_default()
}

/// Per-label counts after classifying several clips
pub fn format_summary(results: &[ClassificationResult], failed: usize) -> String {
    let mut output = format!("\n{}\n", "Summary:".bold());
    output.push_str(&format!("  {} clips classified\n", results.len()));
    for label in Label::ALL {
        let n = results.iter().filter(|r| r.label == label).count();
        if n > 0 {
            output.push_str(&format!("  {} {}\n", n, colored_label(label)));
        }
    }
    if failed > 0 {
        output.push_str(&format!("  {}\n", format!("{failed} failed").as_str().red()));
    }
    output
}

pub fn format_corpus_report(report: &CorpusReport, verbose: bool) -> String {
    let mut output = format!(
        "Extracted {} feature vectors, skipped {}\n",
        report.extracted,
        report.skipped.len()
    );
    if verbose {
        for skipped in &report.skipped {
            output.push_str(&format!(
                "  {} {} ({})\n",
                "skip".yellow(),
                skipped.path.display(),
                skipped.reason
            ));
        }
    }
    output
}

pub fn format_training_summary(summary: &TrainingSummary) -> String {
    let t = &summary.training;
    let q = &summary.quantization;
    let gate = if summary.passes_gate {
        "PASS".green().bold().to_string()
    } else {
        "FAIL".red().bold().to_string()
    };
    format!(
        "Trained on {} clips, validated on {}\n  Validation accuracy: {:.3}\n  int8 agreement: {:.3} (disagreement {:.3})\n  float accuracy: {:.3}  int8 accuracy: {:.3}\n  Decision-stability gate: {}\n",
        t.train_size,
        t.validation_size,
        t.validation_accuracy,
        q.agreement,
        q.disagreement_rate,
        q.float_accuracy,
        q.quantized_accuracy,
        gate
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ClassificationResult {
        ClassificationResult::from_probabilities([0.912, 0.05, 0.038])
    }

    #[test]
    fn test_format_prediction() {
        let output = format_prediction(Path::new("clip.wav"), &result());
        assert!(output.contains("clip.wav"));
        assert!(output.contains("Pred: "));
        assert!(output.contains("YES"));
        assert!(output.contains("Scores: YES=0.912 NO=0.050 BG=0.038"));
    }

    #[test]
    fn test_format_json() {
        let json = format_json(Path::new("clip.wav"), "int8", &result());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["label"], "YES");
        assert_eq!(value["model"], "int8");
        assert!((value["scores"]["bg"].as_f64().unwrap() - 0.038).abs() < 1e-6);
    }

    #[test]
    fn test_format_summary() {
        let results = vec![result(), result()];
        let output = format_summary(&results, 1);
        assert!(output.contains("2 clips classified"));
        assert!(output.contains("1 failed"));
    }
}
