use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::*;

// ---------------------------
// ## Prompt Templates
// ---------------------------

const SYSTEM_INSTRUCTION: &str = "你是一位专业的八字命理分析师，精通传统命理学和现代心理学。
你需要根据用户提供的八字命盘信息，进行专业、详细且个性化的分析。
分析应该客观、理性，避免过于迷信的表述，同时保留传统命理学的专业性。
请确保分析内容积极向上，给予用户实用的建议和指导。";

const HEALTH_GUIDANCE: &str = "
健康分析应考虑以下因素：
1. 五行平衡状况与对应的身体系统
   - 木对应肝胆系统
   - 火对应心脏、小肠、血液循环系统
   - 土对应脾胃、消化系统
   - 金对应肺、大肠、呼吸系统
   - 水对应肾、膀胱、泌尿系统
2. 日主强弱与体质特点
3. 大运流年对健康的影响
4. 具体的养生保健建议

请提供详细的健康状况分析和具体的养生建议，包括饮食、作息、运动等方面。
";

const WEALTH_GUIDANCE: &str = "
财运分析应考虑以下因素：
1. 财星、偏财、正财的状态
2. 财库的位置和状态
3. 大运流年对财运的影响
4. 适合的财富管理和投资策略

请提供详细的财运分析和具体的理财建议，包括适合的职业方向、投资策略、财富管理方法等。
";

const CAREER_GUIDANCE: &str = "
事业分析应考虑以下因素：
1. 官星、印星的状态
2. 日主与事业宫的关系
3. 大运流年对事业的影响
4. 适合的职业方向和发展策略

请提供详细的事业发展分析和具体的职业规划建议，包括适合的行业、职位、发展方向等。
";

const RELATIONSHIP_GUIDANCE: &str = "
婚姻感情分析应考虑以下因素：
1. 日主与配偶宫的关系
2. 桃花星的状态
3. 大运流年对婚姻感情的影响
4. 婚姻和谐的建议

请提供详细的婚姻感情分析和具体的关系经营建议，包括择偶标准、感情经营、沟通技巧等。
";

const CHILDREN_GUIDANCE: &str = "
子女分析应考虑以下因素：
1. 子女宫的状态
2. 日主与子女宫的关系
3. 大运流年对子女的影响
4. 亲子关系和教育方式的建议

请提供详细的子女缘分分析和具体的教育方式建议，包括亲子关系、教育理念、培养方向等。
";

const OVERALL_GUIDANCE: &str = "
综合分析应总结用户八字的整体特点，并提供全面的人生指导建议。
请关注以下几点：
1. 八字的整体格局和特点
2. 用户的性格特点和天赋优势
3. 人生发展的关键时期和机遇
4. 全面的人生规划和发展建议

请提供积极、实用、具体的建议，帮助用户更好地规划人生和把握机遇。
";

const CLOSING_INSTRUCTION: &str = "请按照以上各个方面分别进行分析，每个部分都应该有明确的标题，并提供详细、具体、实用的建议。特别关注未来2-3年的发展趋势和关键时期。";

// Placeholder reply the mock capability produces; the shaping step never
// reads it.
const MOCK_RESPONSE: &str = "模拟的AI响应";

const FALLBACK_ANALYSIS: &str = "由于技术原因，无法生成详细分析。请稍后再试。";

// Canned per-area analysis standing in for parsed generation output.
const HEALTH_ANALYSIS: &str = "您的八字中火土较旺，木水偏弱。从健康角度看，您需要注意心脑血管系统和消化系统的保养。建议平时多喝水，保持规律作息，避免过度劳累和情绪波动。2025-2026年间需特别注意肝胆健康，可适当增加绿色蔬菜的摄入，定期体检。";

const WEALTH_ANALYSIS: &str = "您的财运在2025年有明显上升趋势，特别是在春夏季节。八字中金水相生，适合从事金融、贸易、水利相关行业。投资方面，稳健为主，可考虑分散投资组合。2027年有意外财运，但需谨慎对待，避免投机性强的项目。";

const CAREER_ANALYSIS: &str = "您的事业宫位较为稳定，具有较强的组织能力和执行力。2025-2026年是事业发展的关键期，有升职或转行的机会。建议提升专业技能，扩展人脉关系。您适合在团队中担任协调或管理角色，发挥沟通才能。";

const RELATIONSHIP_ANALYSIS: &str = "您的八字中日柱为戊午，感情态度较为务实。2025年下半年至2026年上半年是感情发展的良好时期。已婚者需注意与伴侣的沟通，避免因工作忙碌而忽略家庭。单身者有机会通过社交活动或朋友介绍认识合适的对象。";

const CHILDREN_ANALYSIS: &str = "您的子女宫位较为温和，与子女关系和谐。教育方面，建议采用引导式而非强制式的方法，尊重子女的兴趣发展。2026-2027年是子女发展的重要阶段，可能需要您更多的关注和支持。";

const OVERALL_ANALYSIS: &str = "综合分析您的八字，2025-2027年是您人生的一个上升期，各方面都有良好发展。建议把握这段时间，在事业上积极进取，在健康上注意保养，在人际关系上广结善缘。您的人生态度积极乐观，具有较强的适应能力和抗压能力，这将帮助您度过人生中的各种挑战。";

impl FocusArea {
    pub fn section_title(self) -> &'static str {
        match self {
            FocusArea::Health => "【健康状况】",
            FocusArea::Wealth => "【财运分析】",
            FocusArea::Career => "【事业发展】",
            FocusArea::Relationship => "【婚姻感情】",
            FocusArea::Children => "【子女缘分】",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            FocusArea::Health => HEALTH_GUIDANCE,
            FocusArea::Wealth => WEALTH_GUIDANCE,
            FocusArea::Career => CAREER_GUIDANCE,
            FocusArea::Relationship => RELATIONSHIP_GUIDANCE,
            FocusArea::Children => CHILDREN_GUIDANCE,
        }
    }

    fn canned_analysis(self) -> &'static str {
        match self {
            FocusArea::Health => HEALTH_ANALYSIS,
            FocusArea::Wealth => WEALTH_ANALYSIS,
            FocusArea::Career => CAREER_ANALYSIS,
            FocusArea::Relationship => RELATIONSHIP_ANALYSIS,
            FocusArea::Children => CHILDREN_ANALYSIS,
        }
    }
}

// ---------------------------
// ## Prompt Assembly
// ---------------------------

/// The two instruction strings handed to a text-generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub system_instruction: String,
    pub user_instruction: String,
}

/// Assembles the generation prompt for a chart and the requested focus
/// areas.
///
/// Focus areas arrive as the raw names stored on the order; names that are
/// not recognized produce no section and no error. Recognized areas are
/// emitted in the fixed declaration order of [`FocusArea::all`] regardless of
/// the input order, and the comprehensive section plus closing instruction
/// are always appended.
pub fn build_prompt<S: AsRef<str>>(chart: &ChartResult, focus_areas: &[S]) -> Prompt {
    let requested: Vec<FocusArea> = focus_areas
        .iter()
        .filter_map(|name| FocusArea::from_name(name.as_ref()))
        .collect();

    let mut user = String::new();
    user.push_str("请根据以下八字命盘信息，进行专业的命理分析：\n\n");
    user.push_str("四柱八字：\n");
    user.push_str(&format!(
        "年柱：{}（{}）\n",
        chart.year_pillar, chart.year_pillar.element
    ));
    user.push_str(&format!(
        "月柱：{}（{}）\n",
        chart.month_pillar, chart.month_pillar.element
    ));
    user.push_str(&format!(
        "日柱：{}（{}）\n",
        chart.day_pillar, chart.day_pillar.element
    ));
    user.push_str(&format!(
        "时柱：{}（{}）\n\n",
        chart.hour_pillar, chart.hour_pillar.element
    ));

    user.push_str("五行分布：\n");
    let tally = &chart.five_element_tally;
    user.push_str(&format!(
        "木：{}，火：{}，土：{}，金：{}，水：{}\n\n",
        tally.wood, tally.fire, tally.earth, tally.metal, tally.water
    ));

    user.push_str("大运流年（未来5年）：\n");
    for entry in chart.forecast.iter().take(5) {
        user.push_str(&format!(
            "{}年：{}{}（{}）\n",
            entry.year, entry.heavenly_stem, entry.earthly_branch, entry.element
        ));
    }

    user.push_str("\n请重点分析以下方面，每个方面至少提供300字的详细分析：\n\n");

    for area in FocusArea::all() {
        if requested.contains(&area) {
            user.push_str(&format!(
                "{}\n{}\n\n",
                area.section_title(),
                area.guidance()
            ));
        }
    }

    user.push_str(&format!("【综合建议】\n{}\n\n", OVERALL_GUIDANCE));
    user.push_str(CLOSING_INSTRUCTION);

    Prompt {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        user_instruction: user,
    }
}

// ---------------------------
// ## Response Shaping
// ---------------------------

/// Narrative text per requested focus area, with the overall section always
/// present. Serializes to the filtered object shape the result records use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wealth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<String>,
    pub overall: String,
}

impl NarrativeBundle {
    fn with_overall(overall: &str) -> NarrativeBundle {
        NarrativeBundle {
            health: None,
            wealth: None,
            career: None,
            relationship: None,
            children: None,
            overall: overall.to_string(),
        }
    }

    /// The bundle substituted when generation fails: the fixed apology text
    /// under the overall key and nothing else.
    pub fn fallback() -> NarrativeBundle {
        NarrativeBundle::with_overall(FALLBACK_ANALYSIS)
    }

    pub fn section(&self, area: FocusArea) -> Option<&str> {
        match area {
            FocusArea::Health => self.health.as_deref(),
            FocusArea::Wealth => self.wealth.as_deref(),
            FocusArea::Career => self.career.as_deref(),
            FocusArea::Relationship => self.relationship.as_deref(),
            FocusArea::Children => self.children.as_deref(),
        }
    }

    fn insert(&mut self, area: FocusArea, text: String) {
        match area {
            FocusArea::Health => self.health = Some(text),
            FocusArea::Wealth => self.wealth = Some(text),
            FocusArea::Career => self.career = Some(text),
            FocusArea::Relationship => self.relationship = Some(text),
            FocusArea::Children => self.children = Some(text),
        }
    }
}

/// Shapes a generation reply into a keyed bundle.
///
/// The generated text is not parsed: the canned analysis table stands in for
/// real output, filtered to the requested areas, and the overall section is
/// included whether requested or not. Unrecognized area names contribute
/// nothing.
pub fn shape_response<S: AsRef<str>>(_raw_text: &str, focus_areas: &[S]) -> NarrativeBundle {
    let mut bundle = NarrativeBundle::with_overall(OVERALL_ANALYSIS);
    for name in focus_areas {
        if let Some(area) = FocusArea::from_name(name.as_ref()) {
            bundle.insert(area, area.canned_analysis().to_string());
        }
    }
    bundle
}

// ---------------------------
// ## Generation Capability
// ---------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("generation request failed: {0}")]
    Generation(String),
}

/// An external text-generation capability. Injected so the assembler is
/// testable without a live service; the shipped implementation is
/// [`MockSource`].
pub trait NarrativeSource {
    fn generate(&self, prompt: &Prompt) -> Result<String, NarrativeError>;
}

/// Stand-in generation capability returning a fixed placeholder reply.
pub struct MockSource;

impl NarrativeSource for MockSource {
    fn generate(&self, _prompt: &Prompt) -> Result<String, NarrativeError> {
        Ok(MOCK_RESPONSE.to_string())
    }
}

/// Generation parameters for a [`NarrativeSource`] implementation backed by a
/// chat-completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Builds the prompt, invokes the generation capability and shapes the reply.
/// A failed generation substitutes the fixed fallback bundle instead of
/// propagating the error.
pub fn generate_analysis<S: AsRef<str>>(
    source: &dyn NarrativeSource,
    chart: &ChartResult,
    focus_areas: &[S],
) -> NarrativeBundle {
    let prompt = build_prompt(chart, focus_areas);
    match source.generate(&prompt) {
        Ok(raw) => shape_response(&raw, focus_areas),
        Err(error) => {
            warn!(%error, "narrative generation failed, substituting fallback");
            NarrativeBundle::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_chart_from, BirthMoment, ChartResult, Gender};

    fn chart_1995() -> ChartResult {
        let birth = BirthMoment::new(1995, 6, 15, 12).unwrap();
        compute_chart_from(birth, false, Gender::Male, 1995)
    }

    struct FailingSource;

    impl NarrativeSource for FailingSource {
        fn generate(&self, _prompt: &Prompt) -> Result<String, NarrativeError> {
            Err(NarrativeError::Generation("service unreachable".to_string()))
        }
    }

    #[test]
    fn test_prompt_always_contains_overall_section() {
        let empty: [&str; 0] = [];
        let prompt = build_prompt(&chart_1995(), &empty);
        assert!(prompt.user_instruction.contains("【综合建议】"));
        assert!(prompt.user_instruction.ends_with(CLOSING_INSTRUCTION));
        assert!(!prompt.user_instruction.contains("【健康状况】"));
    }

    #[test]
    fn test_prompt_sections_follow_declaration_order() {
        let prompt = build_prompt(&chart_1995(), &["children", "health"]);
        let text = &prompt.user_instruction;
        let health = text.find("【健康状况】").unwrap();
        let children = text.find("【子女缘分】").unwrap();
        let overall = text.find("【综合建议】").unwrap();
        assert!(health < children && children < overall);
        assert!(!text.contains("【财运分析】"));
    }

    #[test]
    fn test_prompt_ignores_unrecognized_focus_names() {
        let plain = build_prompt(&chart_1995(), &["wealth"]);
        let noisy = build_prompt(&chart_1995(), &["wealth", "bogus", "Health"]);
        assert_eq!(plain, noisy);
    }

    #[test]
    fn test_prompt_reports_pillars_tally_and_forecast() {
        let prompt = build_prompt(&chart_1995(), &["health"]);
        let text = &prompt.user_instruction;
        assert!(text.contains("年柱：乙亥（wood）"));
        assert!(text.contains("日柱：己酉（earth）"));
        assert!(text.contains("五行分布：\n"));
        // Only the first five forecast years are quoted.
        assert!(text.contains("1999年："));
        assert!(!text.contains("2000年："));
    }

    #[test]
    fn test_prompt_system_instruction_is_fixed() {
        let a = build_prompt(&chart_1995(), &["health"]);
        let b = build_prompt(&chart_1995(), &["children", "wealth"]);
        assert_eq!(a.system_instruction, b.system_instruction);
        assert!(a.system_instruction.contains("八字命理分析师"));
    }

    #[test]
    fn test_shape_response_filters_and_forces_overall() {
        let bundle = shape_response(MOCK_RESPONSE, &["wealth", "bogus"]);
        assert!(bundle.wealth.is_some());
        assert!(bundle.health.is_none());
        assert!(bundle.career.is_none());
        assert!(bundle.relationship.is_none());
        assert!(bundle.children.is_none());
        assert_eq!(bundle.overall, OVERALL_ANALYSIS);

        let value = serde_json::to_value(&bundle).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("wealth"));
        assert!(object.contains_key("overall"));
    }

    #[test]
    fn test_shape_response_with_empty_request_keeps_overall() {
        let empty: [&str; 0] = [];
        let bundle = shape_response("ignored", &empty);
        assert_eq!(bundle, NarrativeBundle::with_overall(OVERALL_ANALYSIS));
    }

    #[test]
    fn test_generate_analysis_shapes_mock_reply() {
        let bundle = generate_analysis(&MockSource, &chart_1995(), &["health"]);
        assert_eq!(bundle.health.as_deref(), Some(HEALTH_ANALYSIS));
        assert_eq!(bundle.overall, OVERALL_ANALYSIS);
    }

    #[test]
    fn test_generate_analysis_substitutes_fallback_on_failure() {
        let bundle = generate_analysis(&FailingSource, &chart_1995(), &["health", "wealth"]);
        assert_eq!(bundle, NarrativeBundle::fallback());
        assert_eq!(bundle.overall, FALLBACK_ANALYSIS);
        assert!(bundle.health.is_none());
    }

    #[test]
    fn test_generator_config_defaults_match_the_service() {
        let config = GeneratorConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 2000);

        let parsed: GeneratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, config);

        let parsed: GeneratorConfig =
            serde_json::from_str(r#"{"model":"deepseek-chat","maxTokens":1024}"#).unwrap();
        assert_eq!(parsed.model, "deepseek-chat");
        assert_eq!(parsed.max_tokens, 1024);
    }
}
