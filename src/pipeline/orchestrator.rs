//! Workflow orchestrator: runs the six analysis stages in order and
//! always returns a well-formed report, even when a stage panics.
//!
//! Step state is call-local and published to a mutex only as an
//! observability snapshot, so concurrent runs on a shared pipeline
//! cannot interleave each other's statuses.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use super::detection::{detect, RiskLevel};
use super::fusion::{fuse, FusedReport, ReportPattern};
use super::insight::{DetectedPatternRef, InsightContext, InsightProvider, NimClient};
use super::preprocess::parse_conversation;
use super::retrieval::retrieve;
use crate::knowledge::{load_pattern_definitions, PatternDefinition};

const STEP_NAMES: [&str; 6] = [
    "preprocessing",
    "rag_retrieval",
    "pattern_detection",
    "ai_analysis",
    "fusion_analysis",
    "report_generation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One stage of a single analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStep {
    pub name: &'static str,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowStep {
    fn pending(name: &'static str) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            result: None,
            error: None,
        }
    }
}

/// Flat step view embedded in reports and status queries.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub step: &'static str,
    pub status: StepStatus,
    pub has_result: bool,
    pub has_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Step-by-step view of the most recent run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub steps: Vec<StepSummary>,
    pub overall_status: OverallStatus,
}

/// How many knowledge-base entries and keywords fed the AI context.
#[derive(Debug, Clone, Serialize)]
pub struct RagContextSummary {
    pub patterns_retrieved: usize,
    pub keywords_analyzed: usize,
}

/// Terminal report returned to callers. Always fully populated; the
/// `error` field is set only by the degraded error path.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub patterns: Vec<ReportPattern>,
    pub summary: String,
    pub red_flags: Vec<String>,
    pub suggestions: Vec<String>,
    pub reasoning: String,
    pub confidence: f64,
    pub workflow_steps: Vec<StepSummary>,
    pub rag_context: RagContextSummary,
    pub analysis_timestamp: String,
    pub safety_concerns: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sequential analysis pipeline over a conversation transcript.
pub struct AnalysisPipeline<P: InsightProvider> {
    insight: P,
    definitions: Vec<PatternDefinition>,
    last_run: Mutex<Vec<WorkflowStep>>,
}

impl AnalysisPipeline<NimClient> {
    /// Pipeline wired to the configured LLM endpoint and the on-disk
    /// knowledge base.
    pub fn from_env() -> Self {
        Self::new(NimClient::from_env(), load_pattern_definitions())
    }
}

impl<P: InsightProvider> AnalysisPipeline<P> {
    pub fn new(insight: P, definitions: Vec<PatternDefinition>) -> Self {
        Self {
            insight,
            definitions,
            last_run: Mutex::new(STEP_NAMES.map(WorkflowStep::pending).to_vec()),
        }
    }

    /// Run the full workflow. Never fails: any panic inside a stage is
    /// converted into a degraded error report.
    pub fn analyze(&self, conversation_text: &str) -> AnalysisReport {
        info!("Starting analysis workflow");
        let mut steps: Vec<WorkflowStep> = STEP_NAMES.map(WorkflowStep::pending).to_vec();
        self.publish(&steps);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_stages(conversation_text, &mut steps)
        }));
        let report = match outcome {
            Ok(report) => {
                info!(risk_level = %report.risk_level, "Analysis workflow completed");
                report
            }
            Err(panic) => {
                let message = panic_message(panic);
                error!(error = %message, "Analysis workflow aborted");
                if let Some(step) = steps.iter_mut().find(|s| s.status == StepStatus::Running) {
                    step.status = StepStatus::Failed;
                    step.error = Some(message.clone());
                }
                error_report(&message, &steps)
            }
        };

        self.publish(&steps);
        report
    }

    fn run_stages(&self, conversation_text: &str, steps: &mut [WorkflowStep]) -> AnalysisReport {
        start_step(steps, "preprocessing");
        let conversation = parse_conversation(conversation_text);
        complete_step(steps, "preprocessing", serde_json::to_value(&conversation).ok());

        start_step(steps, "rag_retrieval");
        let context = retrieve(&self.definitions, conversation_text);
        complete_step(steps, "rag_retrieval", serde_json::to_value(&context).ok());

        start_step(steps, "pattern_detection");
        let detection = detect(conversation_text);
        complete_step(steps, "pattern_detection", serde_json::to_value(&detection).ok());

        start_step(steps, "ai_analysis");
        let insight_context = InsightContext {
            rag_patterns: context.definitions.clone(),
            detected_patterns: detection
                .patterns
                .iter()
                .map(|p| DetectedPatternRef {
                    category: p.category.clone(),
                    description: p.description.clone(),
                })
                .collect(),
        };
        let insight = self.insight.analyze(conversation_text, &insight_context);
        complete_step(steps, "ai_analysis", serde_json::to_value(&insight).ok());

        start_step(steps, "fusion_analysis");
        let fused = fuse(&detection, &insight);
        complete_step(steps, "fusion_analysis", serde_json::to_value(&fused).ok());

        // The report embeds the step summary, so this step completes
        // before the snapshot is taken and its result attaches after.
        start_step(steps, "report_generation");
        complete_step(steps, "report_generation", None);
        let report = build_report(
            fused,
            RagContextSummary {
                patterns_retrieved: context.definitions.len(),
                keywords_analyzed: context.keywords.len(),
            },
            steps,
        );
        if let Some(step) = steps.iter_mut().find(|s| s.name == "report_generation") {
            step.result = serde_json::to_value(&report).ok();
        }
        report
    }

    /// Step-by-step status of the latest run (or the pristine pending
    /// list before the first one).
    pub fn workflow_status(&self) -> WorkflowStatus {
        let steps = self
            .last_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let summaries = summarize(&steps);
        let overall = overall_status(&summaries);
        WorkflowStatus {
            steps: summaries,
            overall_status: overall,
        }
    }

    fn publish(&self, steps: &[WorkflowStep]) {
        let mut snapshot = self
            .last_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *snapshot = steps.to_vec();
    }
}

fn start_step(steps: &mut [WorkflowStep], name: &str) {
    if let Some(step) = steps.iter_mut().find(|s| s.name == name) {
        step.status = StepStatus::Running;
    }
}

fn complete_step(steps: &mut [WorkflowStep], name: &str, result: Option<serde_json::Value>) {
    if let Some(step) = steps.iter_mut().find(|s| s.name == name) {
        step.status = StepStatus::Completed;
        step.result = result;
    }
}

fn summarize(steps: &[WorkflowStep]) -> Vec<StepSummary> {
    steps
        .iter()
        .map(|s| StepSummary {
            step: s.name,
            status: s.status,
            has_result: s.result.is_some(),
            has_error: s.error.is_some(),
        })
        .collect()
}

fn overall_status(steps: &[StepSummary]) -> OverallStatus {
    if steps.iter().any(|s| s.status == StepStatus::Failed) {
        OverallStatus::Failed
    } else if steps.iter().all(|s| s.status == StepStatus::Completed) {
        OverallStatus::Completed
    } else if steps.iter().all(|s| s.status == StepStatus::Pending) {
        OverallStatus::Pending
    } else {
        OverallStatus::Running
    }
}

fn build_report(
    fused: FusedReport,
    rag_context: RagContextSummary,
    steps: &[WorkflowStep],
) -> AnalysisReport {
    let safety_concerns = assess_safety_concerns(fused.risk_level, &fused.patterns);
    AnalysisReport {
        risk_level: fused.risk_level,
        risk_score: fused.risk_score,
        patterns: fused.patterns,
        summary: fused.summary,
        red_flags: fused.red_flags,
        suggestions: fused.suggestions,
        reasoning: fused.reasoning,
        confidence: fused.confidence,
        workflow_steps: summarize(steps),
        rag_context,
        analysis_timestamp: Utc::now().to_rfc3339(),
        safety_concerns,
        error: None,
    }
}

fn assess_safety_concerns(risk_level: RiskLevel, patterns: &[ReportPattern]) -> String {
    match risk_level {
        RiskLevel::Abuse => {
            if patterns.iter().any(|p| p.name == "threats") {
                "Immediate safety concern: Threats detected. Please consider your safety and \
                 reach out for help."
                    .to_string()
            } else if patterns.iter().any(|p| p.name == "intimidation") {
                "Safety concern: Intimidation patterns detected. Consider reaching out to a \
                 crisis hotline."
                    .to_string()
            } else {
                "Safety concern: Multiple abuse patterns detected. Please consider seeking \
                 support."
                    .to_string()
            }
        }
        RiskLevel::Concerning => "Monitor the situation and trust your instincts. Consider \
                                  seeking support if patterns continue."
            .to_string(),
        RiskLevel::Safe => "No immediate safety concerns detected.".to_string(),
    }
}

fn error_report(message: &str, steps: &[WorkflowStep]) -> AnalysisReport {
    AnalysisReport {
        risk_level: RiskLevel::Concerning,
        risk_score: 0.0,
        patterns: vec![],
        summary: format!("Analysis failed due to technical error: {message}"),
        red_flags: vec!["Technical analysis error - please review manually".to_string()],
        suggestions: vec![
            "Please review the conversation carefully".to_string(),
            "Consider seeking support if you feel unsafe".to_string(),
            "Trust your instincts about the relationship dynamics".to_string(),
        ],
        reasoning: "Fallback analysis due to technical error".to_string(),
        confidence: 0.0,
        workflow_steps: summarize(steps),
        rag_context: RagContextSummary {
            patterns_retrieved: 0,
            keywords_analyzed: 0,
        },
        analysis_timestamp: Utc::now().to_rfc3339(),
        safety_concerns: "Unable to assess safety concerns due to technical error".to_string(),
        error: Some(message.to_string()),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown internal error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::insight::AiInsight;

    struct MockInsight {
        insight: AiInsight,
    }

    impl MockInsight {
        fn new(insight: AiInsight) -> Self {
            Self { insight }
        }

        fn safe() -> Self {
            Self::new(AiInsight {
                risk_level: RiskLevel::Safe,
                confidence: 0.9,
                ..Default::default()
            })
        }
    }

    impl InsightProvider for MockInsight {
        fn analyze(&self, _conversation: &str, _context: &InsightContext) -> AiInsight {
            self.insight.clone()
        }
    }

    struct PanickingInsight;

    impl InsightProvider for PanickingInsight {
        fn analyze(&self, _conversation: &str, _context: &InsightContext) -> AiInsight {
            panic!("provider exploded")
        }
    }

    fn definitions() -> Vec<PatternDefinition> {
        vec![PatternDefinition {
            name: "gaslighting".to_string(),
            definition: "Making someone doubt their own memory".to_string(),
            keywords: vec!["never happened".to_string(), "imagining".to_string()],
        }]
    }

    #[test]
    fn healthy_conversation_yields_safe_report() {
        let pipeline = AnalysisPipeline::new(MockInsight::safe(), definitions());
        let report = pipeline.analyze("A: want to grab dinner tonight?\nB: sure, sounds lovely");
        assert_eq!(report.risk_level, RiskLevel::Safe);
        assert!(report.patterns.is_empty());
        assert!(report.error.is_none());
        assert_eq!(report.workflow_steps.len(), 6);
        assert!(report
            .workflow_steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));
    }

    #[test]
    fn gaslighting_scenario_flows_through_all_stages() {
        let pipeline = AnalysisPipeline::new(
            MockInsight::new(AiInsight {
                risk_level: RiskLevel::Concerning,
                confidence: 0.8,
                ..Default::default()
            }),
            definitions(),
        );
        let report = pipeline.analyze(
            "A: That never happened. You're imagining things. You're making that up.\nB: I know what I saw.",
        );
        assert!(report.risk_level >= RiskLevel::Concerning);
        assert!(report.patterns.iter().any(|p| p.name == "gaslighting"));
        assert_eq!(report.rag_context.patterns_retrieved, 1);
        assert!(report.rag_context.keywords_analyzed > 0);
    }

    #[test]
    fn fallback_insight_still_yields_well_formed_report() {
        let pipeline = AnalysisPipeline::new(MockInsight::new(AiInsight::fallback()), vec![]);
        let report = pipeline.analyze("A: hello there");
        assert!(matches!(
            report.risk_level,
            RiskLevel::Safe | RiskLevel::Concerning | RiskLevel::Abuse
        ));
        assert_eq!(report.confidence, 0.3);
        assert!(report.error.is_none());
    }

    #[test]
    fn panicking_provider_degrades_to_error_report() {
        let pipeline = AnalysisPipeline::new(PanickingInsight, definitions());
        let report = pipeline.analyze("A: hello");
        assert_eq!(report.risk_level, RiskLevel::Concerning);
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.error.as_deref(), Some("provider exploded"));
        assert!(report.summary.contains("provider exploded"));

        let status = pipeline.workflow_status();
        assert_eq!(status.overall_status, OverallStatus::Failed);
        let ai_step = status
            .steps
            .iter()
            .find(|s| s.step == "ai_analysis")
            .unwrap();
        assert_eq!(ai_step.status, StepStatus::Failed);
        assert!(ai_step.has_error);
    }

    #[test]
    fn workflow_status_starts_pending_and_resets_per_run() {
        let pipeline = AnalysisPipeline::new(MockInsight::safe(), vec![]);
        let status = pipeline.workflow_status();
        assert_eq!(status.overall_status, OverallStatus::Pending);
        assert_eq!(status.steps.len(), 6);

        pipeline.analyze("A: hi\nB: hi");
        let status = pipeline.workflow_status();
        assert_eq!(status.overall_status, OverallStatus::Completed);
        assert!(status.steps.iter().all(|s| s.has_result));
    }

    #[test]
    fn step_names_follow_the_pipeline_order() {
        let pipeline = AnalysisPipeline::new(MockInsight::safe(), vec![]);
        let names: Vec<&str> = pipeline
            .workflow_status()
            .steps
            .iter()
            .map(|s| s.step)
            .collect();
        assert_eq!(
            names,
            vec![
                "preprocessing",
                "rag_retrieval",
                "pattern_detection",
                "ai_analysis",
                "fusion_analysis",
                "report_generation"
            ]
        );
    }

    #[test]
    fn safety_concerns_name_threats_explicitly() {
        let pipeline = AnalysisPipeline::new(
            MockInsight::new(AiInsight {
                risk_level: RiskLevel::Abuse,
                confidence: 0.95,
                ..Default::default()
            }),
            vec![],
        );
        let report = pipeline.analyze("A: you'll regret this\nA: i'll make you pay");
        assert_eq!(report.risk_level, RiskLevel::Abuse);
        assert!(report.safety_concerns.contains("Threats detected"));
    }

    #[test]
    fn empty_input_yields_safe_report_with_mock_agreement() {
        let pipeline = AnalysisPipeline::new(MockInsight::safe(), vec![]);
        let report = pipeline.analyze("");
        assert_eq!(report.risk_level, RiskLevel::Safe);
        assert_eq!(report.risk_score, 0.0);
        assert!(report.red_flags.is_empty());
    }

    #[test]
    fn report_serializes_without_error_field_on_success() {
        let pipeline = AnalysisPipeline::new(MockInsight::safe(), vec![]);
        let report = pipeline.analyze("A: hi");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("analysis_timestamp").is_some());
    }
}
