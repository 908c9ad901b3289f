use crate::error::{AnalysisError, GenerationError};
use crate::json_block::find_json_object;
use crate::models::CompletionRequest;
use crate::prompt::{analysis_prompt, qa_prompt, ANALYSIS_SYSTEM_PROMPT, QA_SYSTEM_PROMPT};
use crate::schema::{
    FlattenedFields, RequirementSummary, RfpAnalysis, KNOWN_REQUIREMENT_ID_PATTERN,
};
use crate::traits::TextGenerator;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    pub analysis_temperature: f32,
    pub analysis_max_tokens: u32,
    pub qa_temperature: f32,
    pub qa_max_tokens: u32,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            analysis_temperature: 0.3,
            analysis_max_tokens: 2_000,
            qa_temperature: 0.3,
            qa_max_tokens: 1_000,
        }
    }
}

/// Model output as returned, plus its typed view.
///
/// `raw` is kept verbatim for display and QA context. `schema` has missing
/// requirement ids filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredAnalysis {
    pub raw: Value,
    pub schema: RfpAnalysis,
    pub requirements: RequirementSummary,
}

impl StructuredAnalysis {
    pub fn from_value(raw: Value) -> Result<Self, AnalysisError> {
        if !raw.is_object() {
            return Err(AnalysisError::NotAnObject);
        }

        let mut schema: RfpAnalysis = serde_json::from_value(raw.clone())?;
        let synthesized = schema.assign_missing_requirement_ids();
        let id_pattern = Regex::new(KNOWN_REQUIREMENT_ID_PATTERN)?;
        let requirements = RequirementSummary::from_requirements(
            schema.requirement_details(),
            synthesized,
            &id_pattern,
        );

        Ok(Self {
            raw,
            schema,
            requirements,
        })
    }

    pub fn flatten(&self, explicit_title: Option<&str>) -> FlattenedFields {
        self.schema.flatten(explicit_title)
    }
}

/// Locates the JSON object in raw model output and builds the typed view.
pub fn parse_analysis(output: &str) -> Result<StructuredAnalysis, AnalysisError> {
    let value = find_json_object(output)?;
    StructuredAnalysis::from_value(value)
}

pub struct RfpAnalyzer<G> {
    generator: G,
    options: AnalyzerOptions,
}

impl<G> RfpAnalyzer<G>
where
    G: TextGenerator,
{
    pub fn new(generator: G) -> Self {
        Self::with_options(generator, AnalyzerOptions::default())
    }

    pub fn with_options(generator: G, options: AnalyzerOptions) -> Self {
        Self { generator, options }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// One completion request, no retry. The reply must contain a JSON object.
    pub async fn analyze(&self, raw_text: &str) -> Result<StructuredAnalysis, AnalysisError> {
        if raw_text.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt("document text".to_string()).into());
        }

        let request = CompletionRequest {
            system: ANALYSIS_SYSTEM_PROMPT.to_string(),
            user: analysis_prompt(raw_text),
            temperature: self.options.analysis_temperature,
            max_tokens: self.options.analysis_max_tokens,
        };

        let output = self.generator.complete(&request).await?;
        debug!(response_chars = output.chars().count(), "analysis response received");

        let analysis = parse_analysis(&output)?;
        info!(
            requirements = analysis.requirements.total,
            recognized_ids = analysis.requirements.recognized_ids,
            synthesized_ids = analysis.requirements.synthesized_ids,
            "rfp analysis parsed"
        );

        Ok(analysis)
    }

    /// Answers a question about one document, grounded on its first
    /// characters and the analysis.
    pub async fn answer(
        &self,
        question: &str,
        content: &str,
        analysis: Option<&Value>,
    ) -> Result<String, GenerationError> {
        if question.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt("question".to_string()));
        }

        let request = CompletionRequest {
            system: QA_SYSTEM_PROMPT.to_string(),
            user: qa_prompt(question, content, analysis),
            temperature: self.options.qa_temperature,
            max_tokens: self.options.qa_max_tokens,
        };

        let answer = self.generator.complete(&request).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        reply: Option<String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
            self.requests.lock().expect("lock").push(request.clone());
            self.reply.clone().ok_or(GenerationError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn analyze_sends_one_request_and_parses_reply() {
        let reply = r#"다음은 분석 결과입니다:
{
  "1_핵심개요": {"배경목적": "노후 관제시스템 교체", "기대성과": "장애 50% 감소"},
  "3_예산가격": {"추정예산": "30억원"},
  "5_요구사항": {
    "요구사항_상세목록": [
      {"요구사항_고유번호": "SFR-001", "요구사항_명칭": "실시간 모니터링"},
      {"요구사항_명칭": "보고서 출력"}
    ],
    "비기능요구": "load ≥ 1000 rps"
  }
}
감사합니다."#;
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying(reply));

        let analysis = analyzer.analyze("제1장 사업개요").await.expect("analysis");

        let requests = analyzer.generator().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system, ANALYSIS_SYSTEM_PROMPT);
        assert_eq!(requests[0].max_tokens, 2_000);
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
        assert!(requests[0].user.contains("제1장 사업개요"));

        assert_eq!(analysis.requirements.total, 2);
        assert_eq!(analysis.requirements.recognized_ids, 2);
        assert_eq!(analysis.requirements.synthesized_ids, 1);
        assert_eq!(analysis.schema.requirement_details()[1].id, "REQ-GEN-001");
        assert!(analysis.raw["5_요구사항"]["요구사항_상세목록"][1]
            .get("요구사항_고유번호")
            .is_none());

        let flattened = analysis.flatten(None);
        assert_eq!(flattened.title, "노후 관제시스템 교체 장애 50% 감소");
        assert_eq!(flattened.budget_range, "30억원");
        assert_eq!(flattened.requirements, vec!["load ≥ 1000 rps"]);
    }

    #[tokio::test]
    async fn reply_without_json_is_an_error() {
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying("분석할 수 없습니다."));

        let result = analyzer.analyze("본문").await;

        assert!(matches!(result, Err(AnalysisError::NoStructuredBlock)));
    }

    #[tokio::test]
    async fn truncated_reply_fails_instead_of_returning_a_category() {
        let reply = r#"분석 결과: {"1_핵심개요": {"배경목적": "관제 고도화", "기대성과": "단축"}, "5_요구사항": {"요구사항_상세목록": [{"요구사항_명칭": "a"}"#;
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying(reply));

        let result = analyzer.analyze("본문").await;

        assert!(matches!(result, Err(AnalysisError::UnbalancedBlock(_))));
    }

    #[tokio::test]
    async fn generator_failure_is_propagated() {
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::failing());

        let result = analyzer.analyze("본문").await;

        assert!(matches!(
            result,
            Err(AnalysisError::Generation(GenerationError::EmptyResponse))
        ));
    }

    #[tokio::test]
    async fn blank_document_is_not_sent() {
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying("{}"));

        let result = analyzer.analyze("  \n ").await;

        assert!(matches!(
            result,
            Err(AnalysisError::Generation(GenerationError::EmptyPrompt(_)))
        ));
        assert!(analyzer.generator().requests().is_empty());
    }

    #[tokio::test]
    async fn answer_uses_qa_settings() {
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying("  예산은 30억원입니다.\n"));
        let analysis = json!({ "3_예산가격": { "추정예산": "30억원" } });

        let answer = analyzer
            .answer("예산은?", "본문", Some(&analysis))
            .await
            .expect("answer");

        assert_eq!(answer, "예산은 30억원입니다.");
        let requests = analyzer.generator().requests();
        assert_eq!(requests[0].system, QA_SYSTEM_PROMPT);
        assert_eq!(requests[0].max_tokens, 1_000);
        assert!(requests[0].user.contains("30억원"));
    }

    #[tokio::test]
    async fn empty_question_is_rejected_without_a_call() {
        let analyzer = RfpAnalyzer::new(ScriptedGenerator::replying("unused"));

        let result = analyzer.answer("   ", "본문", None).await;

        assert!(matches!(result, Err(GenerationError::EmptyPrompt(_))));
        assert!(analyzer.generator().requests().is_empty());
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert!(matches!(
            StructuredAnalysis::from_value(json!(["not", "an", "object"])),
            Err(AnalysisError::NotAnObject)
        ));
    }
}
