//! Typed view of the 11-category RFP analysis returned by the model.
//!
//! The model is asked for a JSON object keyed by Korean category names. It
//! does not always comply, so parsing is lenient: a category of the wrong
//! shape is treated as absent, scalar sub-fields accept numbers, booleans and
//! arrays, and malformed requirement records are skipped. The same category
//! definitions render the prompt template (see [`CATEGORY_CATALOGUE`]).

use crate::models::EvaluationCriteria;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, VecSkipError};

pub const FALLBACK_TITLE: &str = "RFP Document";
pub const MAX_DERIVED_TITLE_CHARS: usize = 100;
pub const TECHNOLOGY_MAPPING_KEY: &str = "기술솔루션매핑";
pub const KEYWORDS_KEY: &str = "핵심키워드";
pub const REQUIREMENT_LIST_KEY: &str = "요구사항_상세목록";

/// Identifier shapes seen in real RFPs: `REQ-001`, `ECR-HWR-SVR-02`, `SFR-001`.
pub const KNOWN_REQUIREMENT_ID_PATTERN: &str = r"^[A-Z]{2,5}(?:-[A-Z0-9]{1,6}){1,4}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub hint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpec {
    pub key: &'static str,
    pub fields: &'static [FieldSpec],
}

macro_rules! category {
    (
        $(#[$meta:meta])*
        $name:ident = $key:literal {
            $($field:ident => $rename:literal : $hint:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                #[serde(
                    rename = $rename,
                    deserialize_with = "lenient_text",
                    skip_serializing_if = "Option::is_none"
                )]
                pub $field: Option<String>,
            )+
        }

        impl $name {
            pub const KEY: &'static str = $key;
            pub const FIELDS: &'static [FieldSpec] =
                &[$(FieldSpec { key: $rename, hint: $hint }),+];
        }
    };
}

category! {
    /// Category 1: background, scope and expected outcomes.
    CoreOverview = "1_핵심개요" {
        background_purpose => "배경목적": "프로젝트 배경 및 목적",
        scope => "범위": "프로젝트 범위 (포함/제외 사항)",
        expected_outcomes => "기대성과": "비즈니스 목표 및 효과 지표",
        terminology => "용어정의": "주요 용어 및 약어 정의",
        stakeholders => "이해관계자": "발주부서 및 이해관계자",
    }
}

category! {
    ScheduleMilestones = "2_일정마일스톤" {
        project_period => "사업기간": "착수일부터 종료일까지",
        milestones => "주요마일스톤": "착수/중간점검/시범/검수 일정",
        deliverable_schedule => "제출물일정": "요구서/설계/결과보고 등 제출물 일정",
        qa_deadline => "질의응답마감": "Q&A 및 제안서 접수 마감일",
    }
}

category! {
    BudgetPricing = "3_예산가격" {
        estimated_budget => "추정예산": "예산 범위 및 상한가",
        vat_included => "부가세포함": "부가세 포함 여부",
        price_composition => "가격구성": "라이선스/구축/운영/교육/옵션 비용",
        payment_terms => "지불조건": "선급/중도/준공/검수 연동 지불 조건",
        cost_basis => "원가산출근거": "인력단가, 수량, 산식 등",
    }
}

category! {
    EvaluationSelection = "4_평가선정기준" {
        scoring => "정량정성배점": "기술/가격 비율 및 배점표",
        bonus_and_penalty => "가점감점요건": "레퍼런스, 인증, 현장실사 등",
        disqualification => "탈락필수요건": "필수 서류 및 자격 미충족 시 탈락 조건",
    }
}

category! {
    SecurityCompliance = "6_보안준법" {
        access_audit => "인증권한감사": "로그, 분리, 추적성",
        privacy_compliance => "개인정보컴플라이언스": "ISO27001, ISMS, GDPR 등",
        network_encryption => "망구성암호화": "망구성, 암호화, 키관리",
        vulnerability_assessment => "취약점진단": "취약점 진단 및 보안점검 대응",
    }
}

category! {
    ServiceOperations = "7_서비스수준운영" {
        sla => "SLA": "가용성, 응답/복구 시간, 페널티",
        incident_change_release => "장애변경배포": "ITSM, CAB 프로세스",
        monitoring_reporting => "모니터링리포팅": "KPI, 주기, 포맷",
        helpdesk => "헬프데스크": "지원 시간 및 티어",
        training_manuals => "교육매뉴얼": "교육, 매뉴얼, 전환운영, 케어기간",
    }
}

category! {
    QualityAcceptance = "8_품질검수인수" {
        deliverables => "산출물목록": "산출물 목록 및 템플릿",
        test_plan => "테스트계획": "단위/통합/성능/UAT 테스트 계획",
        acceptance_criteria => "인수기준": "인수 기준, 결함 허용치, 재검수 규칙",
        pilot_poc => "파일럿PoC": "파일럿/PoC 조건",
    }
}

category! {
    ContractLegal = "9_계약법무" {
        contract_type => "계약유형": "총액/단가/성과형 계약",
        intellectual_property => "지적재산권": "소스코드 소유 및 사용권",
        confidentiality => "비밀유지": "NDA, 자료반환 조건",
        liability => "손해배상": "손해배상, 지체상금, 보증, 보험",
        warranty => "하자보수": "하자보수 기간 및 범위",
    }
}

category! {
    SupplierQualification = "10_공급사자격역량" {
        participation_limits => "참여제한": "업종, 등급, 실적 등 참여 제한",
        mandatory_qualifications => "필수자격": "필수 자격 요건",
        staffing => "투입인력": "등급, 자격증, 상주 여부",
        references => "레퍼런스": "유사 프로젝트 규모, 기간, 기술스택",
    }
}

category! {
    SubmissionInstructions = "11_제출형식지시" {
        proposal_format => "제안서형식": "제안서 형식, 분량, 언어, 파일 규격",
        mandatory_attachments => "필수첨부": "서약서, 인증서, 재무제표 등",
        submission_channel => "제출채널": "제출 채널, 원본/사본 매수",
        presentation => "프레젠테이션": "데모/샘플/시연 요구 기준",
    }
}

/// A single requirement record from category 5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirement {
    #[serde(rename = "요구사항_고유번호", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "요구사항_분류", deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(rename = "요구사항_명칭", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "요구사항_세부내용", deserialize_with = "lenient_string")]
    pub detail: String,
    #[serde(rename = "산출정보", deserialize_with = "lenient_list")]
    pub outputs: Vec<String>,
}

impl Requirement {
    pub const FIELDS: &'static [FieldSpec] = &[
        FieldSpec {
            key: "요구사항_고유번호",
            hint: "문서의 고유번호 (없으면 REQ-GEN-001 형식으로 부여)",
        },
        FieldSpec {
            key: "요구사항_분류",
            hint: "기능요구/비기능요구/보안요구/호환성표준 등",
        },
        FieldSpec {
            key: "요구사항_명칭",
            hint: "요구사항 요약 명칭",
        },
        FieldSpec {
            key: "요구사항_세부내용",
            hint: "요구사항 세부내용",
        },
        FieldSpec {
            key: "산출정보",
            hint: "산출물 목록 (배열)",
        },
    ];
}

/// Category 5: requirement summaries plus the detailed requirement list.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsSection {
    #[serde(rename = "요구사항_상세목록", skip_serializing_if = "Vec::is_empty")]
    #[serde_as(as = "DefaultOnError<VecSkipError<_>>")]
    pub details: Vec<Requirement>,
    #[serde(
        rename = "기능요구",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub functional: Option<String>,
    #[serde(
        rename = "인터페이스연계",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub interface: Option<String>,
    #[serde(
        rename = "데이터",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<String>,
    #[serde(
        rename = "비기능요구",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub non_functional: Option<String>,
    #[serde(
        rename = "호환성표준",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub compatibility: Option<String>,
}

impl RequirementsSection {
    pub const KEY: &'static str = "5_요구사항";
    pub const FIELDS: &'static [FieldSpec] = &[
        FieldSpec {
            key: "기능요구",
            hint: "요구사항 고유번호별 핵심 기능 요구사항",
        },
        FieldSpec {
            key: "인터페이스연계",
            hint: "시스템 목록, 연계 방식, 주기",
        },
        FieldSpec {
            key: "데이터",
            hint: "요구사항 고유번호별 데이터 관련 요구사항",
        },
        FieldSpec {
            key: "비기능요구",
            hint: "요구사항 고유번호별 성능, 가용성, 확장성, 보안, 접근성 요구사항",
        },
        FieldSpec {
            key: "호환성표준",
            hint: "국가표준, 오픈API, 브라우저/OS 호환성",
        },
    ];

    /// The five summary fields in storage order, blanks dropped.
    pub fn flattened(&self) -> Vec<String> {
        [
            &self.functional,
            &self.non_functional,
            &self.interface,
            &self.data,
            &self.compatibility,
        ]
        .into_iter()
        .flatten()
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .collect()
    }
}

/// Every category in prompt order.
pub const CATEGORY_CATALOGUE: [CategorySpec; 11] = [
    CategorySpec {
        key: CoreOverview::KEY,
        fields: CoreOverview::FIELDS,
    },
    CategorySpec {
        key: ScheduleMilestones::KEY,
        fields: ScheduleMilestones::FIELDS,
    },
    CategorySpec {
        key: BudgetPricing::KEY,
        fields: BudgetPricing::FIELDS,
    },
    CategorySpec {
        key: EvaluationSelection::KEY,
        fields: EvaluationSelection::FIELDS,
    },
    CategorySpec {
        key: RequirementsSection::KEY,
        fields: RequirementsSection::FIELDS,
    },
    CategorySpec {
        key: SecurityCompliance::KEY,
        fields: SecurityCompliance::FIELDS,
    },
    CategorySpec {
        key: ServiceOperations::KEY,
        fields: ServiceOperations::FIELDS,
    },
    CategorySpec {
        key: QualityAcceptance::KEY,
        fields: QualityAcceptance::FIELDS,
    },
    CategorySpec {
        key: ContractLegal::KEY,
        fields: ContractLegal::FIELDS,
    },
    CategorySpec {
        key: SupplierQualification::KEY,
        fields: SupplierQualification::FIELDS,
    },
    CategorySpec {
        key: SubmissionInstructions::KEY,
        fields: SubmissionInstructions::FIELDS,
    },
];

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfpAnalysis {
    #[serde(rename = "1_핵심개요", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub overview: Option<CoreOverview>,
    #[serde(rename = "2_일정마일스톤", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub schedule: Option<ScheduleMilestones>,
    #[serde(rename = "3_예산가격", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub budget: Option<BudgetPricing>,
    #[serde(rename = "4_평가선정기준", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub evaluation: Option<EvaluationSelection>,
    #[serde(rename = "5_요구사항", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub requirements: Option<RequirementsSection>,
    #[serde(rename = "6_보안준법", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub security: Option<SecurityCompliance>,
    #[serde(rename = "7_서비스수준운영", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub operations: Option<ServiceOperations>,
    #[serde(rename = "8_품질검수인수", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub quality: Option<QualityAcceptance>,
    #[serde(rename = "9_계약법무", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub contract: Option<ContractLegal>,
    #[serde(rename = "10_공급사자격역량", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub supplier: Option<SupplierQualification>,
    #[serde(rename = "11_제출형식지시", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError")]
    pub submission: Option<SubmissionInstructions>,
    #[serde(rename = "기술솔루션매핑", skip_serializing_if = "Map::is_empty")]
    #[serde_as(as = "DefaultOnError")]
    pub technology_mapping: Map<String, Value>,
    #[serde(
        rename = "핵심키워드",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient_list"
    )]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
}

/// Flat fields of an index record, before content and vector are attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedFields {
    pub title: String,
    pub requirements: Vec<String>,
    pub project_type: String,
    pub budget_range: String,
    pub submission_deadline: String,
    pub evaluation_criteria: EvaluationCriteria,
}

impl RfpAnalysis {
    pub fn flattened_requirements(&self) -> Vec<String> {
        self.requirements
            .as_ref()
            .map(RequirementsSection::flattened)
            .unwrap_or_default()
    }

    pub fn budget_range(&self) -> String {
        self.budget
            .as_ref()
            .and_then(|budget| budget.estimated_budget.clone())
            .unwrap_or_default()
    }

    pub fn submission_deadline(&self) -> String {
        self.schedule
            .as_ref()
            .and_then(|schedule| schedule.qa_deadline.clone())
            .unwrap_or_default()
    }

    pub fn evaluation_criteria(&self) -> EvaluationCriteria {
        let Some(evaluation) = &self.evaluation else {
            return EvaluationCriteria::default();
        };

        EvaluationCriteria {
            scoring: evaluation.scoring.clone().unwrap_or_default(),
            bonus_and_penalty: evaluation.bonus_and_penalty.clone().unwrap_or_default(),
            disqualification: evaluation.disqualification.clone().unwrap_or_default(),
        }
    }

    /// `"{배경목적} {기대성과}"` cut to 100 characters, if that is not blank.
    pub fn derived_title(&self) -> Option<String> {
        let overview = self.overview.as_ref()?;
        let joined = format!(
            "{} {}",
            overview.background_purpose.as_deref().unwrap_or_default(),
            overview.expected_outcomes.as_deref().unwrap_or_default()
        );
        let trimmed = joined.trim();

        if trimmed.is_empty() {
            return None;
        }

        Some(trimmed.chars().take(MAX_DERIVED_TITLE_CHARS).collect())
    }

    pub fn flatten(&self, explicit_title: Option<&str>) -> FlattenedFields {
        FlattenedFields {
            title: resolve_title(explicit_title, self),
            requirements: self.flattened_requirements(),
            project_type: self.project_type.clone().unwrap_or_default(),
            budget_range: self.budget_range(),
            submission_deadline: self.submission_deadline(),
            evaluation_criteria: self.evaluation_criteria(),
        }
    }

    pub fn requirement_details(&self) -> &[Requirement] {
        self.requirements
            .as_ref()
            .map(|section| section.details.as_slice())
            .unwrap_or_default()
    }

    /// Gives every requirement without an id a sequential `REQ-GEN-NNN` id,
    /// skipping ids the document already uses. Returns how many were assigned.
    pub fn assign_missing_requirement_ids(&mut self) -> usize {
        let Some(section) = self.requirements.as_mut() else {
            return 0;
        };

        let mut taken: Vec<String> = section
            .details
            .iter()
            .map(|requirement| requirement.id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut counter = 0usize;
        let mut assigned = 0usize;
        for requirement in section.details.iter_mut() {
            if !requirement.id.trim().is_empty() {
                continue;
            }

            let id = loop {
                counter += 1;
                let candidate = format!("REQ-GEN-{counter:03}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };

            taken.push(id.clone());
            requirement.id = id;
            assigned += 1;
        }

        assigned
    }
}

/// Title precedence: explicit extractor title, then the overview-derived
/// title, then [`FALLBACK_TITLE`].
pub fn resolve_title(explicit: Option<&str>, analysis: &RfpAnalysis) -> String {
    explicit
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .or_else(|| analysis.derived_title())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSummary {
    pub total: usize,
    pub recognized_ids: usize,
    pub synthesized_ids: usize,
}

impl RequirementSummary {
    pub fn from_requirements(
        requirements: &[Requirement],
        synthesized_ids: usize,
        id_pattern: &Regex,
    ) -> Self {
        Self {
            total: requirements.len(),
            recognized_ids: requirements
                .iter()
                .filter(|requirement| id_pattern.is_match(requirement.id.trim()))
                .count(),
            synthesized_ids,
        }
    }
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(text_from_value)
                .filter(|part| !part.trim().is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(key, value)| {
                    text_from_value(value).map(|text| format!("{key}: {text}"))
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(text_from_value).collect(),
        Some(other) => text_from_value(&other).into_iter().collect(),
        None => Vec::new(),
    };

    Ok(items
        .into_iter()
        .filter(|item| !item.trim().is_empty())
        .collect())
}
