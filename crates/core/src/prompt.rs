//! Instruction templates sent to the chat model.

use crate::chunking::char_len;
use crate::schema::{
    CategorySpec, Requirement, RequirementsSection, CATEGORY_CATALOGUE, KEYWORDS_KEY,
    REQUIREMENT_LIST_KEY, TECHNOLOGY_MAPPING_KEY,
};
use serde_json::Value;

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "당신은 RFP 분석 전문가입니다. 주어진 RFP 문서를 정확하게 분석하여 구조화된 정보를 추출합니다.";

pub const QA_SYSTEM_PROMPT: &str = "당신은 RFP 문서 분석 전문가입니다. RFP 문서의 내용을 정확하게 분석하여 사용자의 질문에 구체적이고 정확한 답변을 제공합니다.";

pub const NO_CLEAR_ANSWER: &str = "문서에서 명확한 정보를 찾을 수 없습니다";

/// Characters of document content included in a QA prompt.
pub const QA_CONTENT_CHARS: usize = 3_000;

/// Requirement count the model is asked to aim for. Never checked.
pub const REQUIREMENT_TARGET: usize = 50;

const REQUIREMENT_EXAMPLES: [(&str, &str, &str); 4] = [
    ("REQ-001", "기능요구", "웹접근성 개선"),
    ("ECR-002", "비기능요구", "성능 최적화"),
    ("DAR-003", "보안요구", "보안 요구사항"),
    ("FUN-004", "호환성표준", "호환성 요구사항"),
];

pub fn analysis_prompt(raw_text: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("RFP 내용을 11개 카테고리별로 분석하세요.\n\n");
    prompt.push_str("**요구사항 추출 지침:**\n");
    prompt.push_str("1. 문서 전체를 처음부터 끝까지 검토하여 모든 요구사항을 추출하세요.\n");
    prompt.push_str(
        "2. 요구사항 고유번호 패턴: ECR-XXX-XXX-XX, REQ-XXX-XXX, RFP-XXX-XXX, REQ-XX-XX-XX, REQ-001 등\n",
    );
    prompt.push_str("3. 각 요구사항마다 분류, 명칭, 세부내용, 산출정보를 포함하세요.\n");
    prompt.push_str(
        "4. 고유번호가 없는 요구사항은 REQ-GEN-001, REQ-GEN-002 형태로 번호를 부여하세요.\n",
    );
    prompt.push_str("5. \"요구사항\", \"기능요구\", \"비기능요구\", \"성능요구\", \"보안요구\", \"웹접근성\" 등의 키워드를 활용하세요.\n");
    prompt.push_str(&format!(
        "6. {REQUIREMENT_LIST_KEY} 배열에는 문서에서 찾은 요구사항을 각각 별도 객체로 담고, 최소 {REQUIREMENT_TARGET}개 이상을 목표로 하세요.\n"
    ));
    prompt.push_str("7. 아래 형식의 예시 값을 그대로 복사하지 말고 실제 문서 내용으로 교체하세요.\n\n");

    prompt.push_str("RFP 내용:\n");
    prompt.push_str(raw_text);
    prompt.push_str("\n\n다음 JSON 형식으로만 응답해주세요:\n");
    prompt.push_str(&response_template());

    prompt
}

/// Renders the expected response object from [`CATEGORY_CATALOGUE`], keeping
/// catalogue order.
pub fn response_template() -> String {
    let mut template = String::from("{\n");

    for category in CATEGORY_CATALOGUE {
        template.push_str(&format!("  {}: {{\n", quoted(category.key)));
        if category.key == RequirementsSection::KEY {
            render_requirement_examples(&mut template);
        }
        render_fields(&mut template, &category);
        template.push_str("  },\n");
    }

    template.push_str(&format!(
        "  {}: {{{}: {}}},\n",
        quoted(TECHNOLOGY_MAPPING_KEY),
        quoted("요구사항"),
        quoted("구체적인 기술 솔루션 명")
    ));
    template.push_str(&format!(
        "  {}: [{}]\n",
        quoted(KEYWORDS_KEY),
        quoted("핵심 키워드들")
    ));
    template.push('}');

    template
}

fn render_fields(template: &mut String, category: &CategorySpec) {
    let last = category.fields.len().saturating_sub(1);
    for (index, field) in category.fields.iter().enumerate() {
        let separator = if index < last { "," } else { "" };
        template.push_str(&format!(
            "    {}: {}{separator}\n",
            quoted(field.key),
            quoted(field.hint)
        ));
    }
}

fn render_requirement_examples(template: &mut String) {
    template.push_str(&format!("    {}: [\n", quoted(REQUIREMENT_LIST_KEY)));

    let last = REQUIREMENT_EXAMPLES.len() - 1;
    for (index, (id, category, name)) in REQUIREMENT_EXAMPLES.iter().enumerate() {
        let values = [
            Value::from(*id),
            Value::from(*category),
            Value::from(*name),
            Value::from("실제 세부내용"),
            Value::from(vec!["실제 산출물"]),
        ];
        let body = Requirement::FIELDS
            .iter()
            .zip(values)
            .map(|(field, value)| format!("{}: {value}", quoted(field.key)))
            .collect::<Vec<_>>()
            .join(", ");
        let separator = if index < last { "," } else { "" };
        template.push_str(&format!("      {{{body}}}{separator}\n"));
    }

    template.push_str("    ],\n");
}

fn quoted(text: &str) -> String {
    Value::from(text).to_string()
}

/// QA prompt: the first [`QA_CONTENT_CHARS`] characters of the document, the
/// full analysis, the question and the answering rules.
pub fn qa_prompt(question: &str, content: &str, analysis: Option<&Value>) -> String {
    let excerpt: String = content.chars().take(QA_CONTENT_CHARS).collect();
    let mut prompt = String::from("RFP 문서 내용을 바탕으로 질문에 답변해주세요.\n\n");

    prompt.push_str("RFP 내용:\n");
    prompt.push_str(&excerpt);
    if char_len(content) > QA_CONTENT_CHARS {
        prompt.push_str("\n(이하 생략)");
    }
    prompt.push_str("\n\n");

    if let Some(analysis) = analysis {
        let rendered =
            serde_json::to_string_pretty(analysis).unwrap_or_else(|_| analysis.to_string());
        prompt.push_str("RFP 분석 결과:\n");
        prompt.push_str(&rendered);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!("사용자 질문: {}\n\n", question.trim()));
    prompt.push_str("답변 지침:\n");
    prompt.push_str("1. RFP 문서에서 직접 찾을 수 있는 정보를 우선 제공\n");
    prompt.push_str("2. 구체적인 수치, 조건, 일정 등을 정확히 명시\n");
    prompt.push_str("3. 관련 조항이나 섹션 참조\n");
    prompt.push_str(&format!(
        "4. 정보가 명확하지 않으면 \"{NO_CLEAR_ANSWER}\"라고 표시\n"
    ));
    prompt.push_str("5. 한국어로 간결하게 답변\n\n답변:");

    prompt
}
