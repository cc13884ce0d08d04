//! Ask command handler.
//!
//! Runs one question through the orchestrator and prints frames as they
//! arrive. Ctrl-C drops the frame receiver, which cancels the upstream
//! generation.

use clap::{Args, ValueEnum};
use govbrief_core::{config::AppConfig, AppError, AppResult};
use govbrief_engine::{
    Citation, DecisionReport, Frame, FrameEncoder, NdjsonEncoder, Orchestrator, Query,
    FRAME_BUFFER,
};
use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Readable text with a rendered report and a source list
    Text,
    /// One JSON frame per line
    Ndjson,
}

/// Ask a policy question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Include recent news in the context
    #[arg(long)]
    pub news: bool,

    /// Include public sentiment in the context
    #[arg(long)]
    pub sentiment: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;
        let question = self.get_question()?;
        let query = Query::new(question)
            .with_news(self.news)
            .with_sentiment(self.sentiment);

        let orchestrator = Orchestrator::from_config(config).await?;
        let classification = orchestrator.classify(&query.message)?;

        let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
        let run = orchestrator.run_classified(&query, &classification, tx);
        let printer = async move {
            let stdout = std::io::stdout();
            while let Some(frame) = rx.recv().await {
                let mut out = stdout.lock();
                out.write_all(self.render(&frame)?.as_bytes())?;
                out.flush()?;
            }
            Ok::<_, AppError>(())
        };

        tokio::select! {
            (outcome, printed) = async { tokio::join!(run, printer) } => {
                printed?;
                let outcome = outcome?;
                if self.format == OutputFormat::Text {
                    println!();
                }
                tracing::debug!(
                    kind = %outcome.kind,
                    state = ?outcome.state,
                    degraded = outcome.degraded,
                    fallback = outcome.fallback,
                    frames = outcome.frames,
                    "Request finished"
                );
                Ok(())
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted; generation cancelled");
                Err(AppError::Cancelled)
            }
        }
    }

    fn render(&self, frame: &Frame) -> AppResult<String> {
        match self.format {
            OutputFormat::Ndjson => NdjsonEncoder.encode(frame),
            OutputFormat::Text => Ok(render_text(frame)),
        }
    }

    /// Get the question from the positional argument or a file.
    fn get_question(&self) -> AppResult<String> {
        let question = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(AppError::Validation("No question provided".to_string()))
            }
        };
        Ok(question.trim().to_string())
    }
}

fn render_text(frame: &Frame) -> String {
    match frame {
        Frame::Content(text) => text.clone(),
        Frame::Report(report) => render_report(report),
        Frame::Citations(citations) => render_citations(citations),
    }
}

fn render_report(report: &DecisionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Decision: {}", report.decision_required);
    if !report.timeline.is_empty() || !report.accountable.is_empty() {
        let _ = writeln!(
            out,
            "Timeline: {} | Accountable: {}",
            report.timeline, report.accountable
        );
    }

    if let Some(summary) = &report.executive_summary {
        let _ = writeln!(out, "\n## Recommendation\n{}", summary.recommendation);
        if !summary.rationale.is_empty() {
            let _ = writeln!(out, "{}", summary.rationale);
        }
        if !summary.expected_impact.is_empty() {
            let _ = writeln!(out, "Expected impact: {}", summary.expected_impact);
        }
    }

    let _ = writeln!(out, "\n## Options");
    for (i, option) in report.options.iter().enumerate() {
        let marker = if option.name == report.recommended_option {
            " (recommended)"
        } else {
            ""
        };
        let _ = writeln!(out, "{}. {}{}", i + 1, option.name, marker);
        if !option.description.is_empty() {
            let _ = writeln!(out, "   {}", option.description);
        }
        if !option.cost.is_empty() || !option.impact_score.is_empty() {
            let _ = writeln!(
                out,
                "   Cost: {} | Impact: {}",
                option.cost, option.impact_score
            );
        }
    }
    if !report.recommendation_rationale.is_empty() {
        let _ = writeln!(out, "\n{}", report.recommendation_rationale);
    }

    if !report.risks_mitigations.is_empty() {
        let _ = writeln!(out, "\n## Risks");
        for risk in &report.risks_mitigations {
            let _ = writeln!(out, "- {}: {}", risk.risk, risk.mitigation);
        }
    }

    if !report.next_steps.is_empty() {
        let _ = writeln!(out, "\n## Next steps");
        for step in &report.next_steps {
            let _ = writeln!(out, "- {} ({}, {})", step.action, step.responsible, step.deadline);
        }
    }

    if let Some(limitations) = &report.limitations {
        let _ = writeln!(out, "\n## Limitations\n{}", limitations);
    }
    out
}

fn render_citations(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nSources:\n");
    for (i, citation) in citations.iter().enumerate() {
        let _ = write!(out, "  [{}] {}", i + 1, citation.title);
        if let Some(relevance) = citation.relevance {
            let _ = write!(out, " (relevance {:.2})", relevance);
        }
        if let Some(url) = &citation.url {
            let _ = write!(out, " {}", url);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use govbrief_engine::decode_report;

    fn citation(title: &str, relevance: Option<f32>, url: Option<&str>) -> Citation {
        Citation {
            kind: "document".to_string(),
            title: title.to_string(),
            source: Some(format!("Document: {}", title)),
            url: url.map(str::to_string),
            relevance,
            passage_id: None,
        }
    }

    #[test]
    fn test_content_is_printed_verbatim() {
        assert_eq!(render_text(&Frame::Content("Hello".into())), "Hello");
    }

    #[test]
    fn test_citations_listed_with_relevance() {
        let text = render_citations(&[
            citation("Health Review 2024", Some(0.92), Some("https://health.go.ke")),
            citation("HR Census", None, None),
        ]);
        assert!(text.contains("[1] Health Review 2024 (relevance 0.92) https://health.go.ke"));
        assert!(text.contains("[2] HR Census\n"));
    }

    #[test]
    fn test_no_citations_prints_nothing() {
        assert!(render_citations(&[]).is_empty());
    }

    #[test]
    fn test_report_marks_recommended_option() {
        let report = decode_report(
            r#"{"decision_required": "Fund nurses",
                "executive_summary": {"recommendation": "Phase it"},
                "options": [{"name": "Phased hire"}, {"name": "Status quo"}],
                "recommended_option": "Phased hire"}"#,
        )
        .unwrap();

        let text = render_report(&report);
        assert!(text.starts_with("# Decision: Fund nurses"));
        assert!(text.contains("1. Phased hire (recommended)"));
        assert!(text.contains("2. Status quo\n"));
        assert!(text.contains("## Recommendation\nPhase it"));
    }

    #[test]
    fn test_missing_question_rejected() {
        let cmd = AskCommand {
            question: None,
            file: None,
            news: false,
            sentiment: false,
            format: OutputFormat::Text,
        };
        assert!(matches!(cmd.get_question(), Err(AppError::Validation(_))));
    }
}
