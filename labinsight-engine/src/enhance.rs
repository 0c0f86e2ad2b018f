//! Optional knowledge enhancement of a rule-based analysis.
//!
//! The orchestrator only sees the [`KnowledgeEnhancer`] trait. Failures come
//! back as [`EnhancementError`] and are turned into a fixed fallback text by
//! the caller, never propagated.

use labinsight_core::{
    format_value, AnalysisConfig, AnalysisResult, CategorizedSet, Gender, ReferenceData,
};

use crate::abnormality::detect_abnormalities;

/// Used when no enhancer is configured.
pub const NOT_CONFIGURED_INSIGHT: &str =
    "Knowledge enhancement not initialized - running rule-based analysis only";

/// Used when the enhancer fails at call time.
pub const UNAVAILABLE_INSIGHT: &str = "Knowledge enhancement temporarily unavailable";

/// Returned when no abnormal values feed the query.
pub const ALL_NORMAL_INSIGHT: &str =
    "All parameters within normal limits. No additional insights needed.";

#[derive(Debug, thiserror::Error)]
pub enum EnhancementError {
    #[error("knowledge source unavailable: {0}")]
    Unavailable(String),
    #[error("enhancement failed: {0}")]
    Failed(String),
}

/// Auxiliary narrative produced from categorized values and the rule-based result.
pub trait KnowledgeEnhancer {
    fn enhance(
        &self,
        categorized: &CategorizedSet,
        gender: Gender,
        analysis: &AnalysisResult,
    ) -> Result<String, EnhancementError>;
}

/// One retrievable passage of clinical knowledge.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgePassage {
    pub topic: String,
    pub text: String,
}

impl KnowledgePassage {
    pub fn new(topic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            text: text.into(),
        }
    }
}

/// In-memory knowledge base ranked by keyword overlap.
///
/// Queries are built from every out-of-range value in the panel, including
/// categories without pattern rules.
#[derive(Debug, Clone)]
pub struct KeywordKnowledgeBase {
    passages: Vec<KnowledgePassage>,
    reference: ReferenceData,
    config: AnalysisConfig,
}

impl KeywordKnowledgeBase {
    /// Knowledge base seeded with the built-in interpretation notes.
    pub fn standard(config: AnalysisConfig) -> Self {
        let passages = STANDARD_PASSAGES
            .iter()
            .map(|(topic, text)| KnowledgePassage::new(*topic, *text))
            .collect();
        Self::with_passages(passages, config)
    }

    pub fn with_passages(passages: Vec<KnowledgePassage>, config: AnalysisConfig) -> Self {
        Self {
            passages,
            reference: ReferenceData::standard(),
            config,
        }
    }

    /// Judge abnormal values against `reference` instead of the built-in table.
    pub fn with_reference(mut self, reference: ReferenceData) -> Self {
        self.reference = reference;
        self
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Passages sharing at least one keyword with `question`, best first.
    /// Ties keep corpus order.
    pub fn query(&self, question: &str, top_k: usize) -> Vec<&KnowledgePassage> {
        let keywords = keywords(question);
        let mut scored: Vec<(usize, &KnowledgePassage)> = self
            .passages
            .iter()
            .map(|passage| {
                let words = tokenize(&format!("{} {}", passage.topic, passage.text));
                let score = keywords
                    .iter()
                    .filter(|keyword| words.contains(keyword))
                    .count();
                (score, passage)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, passage)| passage)
            .collect()
    }
}

impl KnowledgeEnhancer for KeywordKnowledgeBase {
    fn enhance(
        &self,
        categorized: &CategorizedSet,
        gender: Gender,
        _analysis: &AnalysisResult,
    ) -> Result<String, EnhancementError> {
        if self.passages.is_empty() {
            return Err(EnhancementError::Unavailable(
                "knowledge base has no passages".to_string(),
            ));
        }

        let findings: Vec<String> = categorized
            .iter()
            .flat_map(|(_, tests)| detect_abnormalities(tests, gender, &self.reference))
            .take(self.config.max_query_findings)
            .map(|abn| format!("{} {} ({})", abn.test, format_value(abn.value), abn.direction))
            .collect();

        if findings.is_empty() {
            return Ok(ALL_NORMAL_INSIGHT.to_string());
        }

        let query = format!("Laboratory abnormalities: {}", findings.join(", "));
        let passages = self.query(&query, self.config.retrieval_top_k);
        let context = passages
            .iter()
            .map(|passage| format!("{}: {}", passage.topic, passage.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let context = if context.is_empty() {
            "No matching reference material found.".to_string()
        } else {
            truncate_chars(&context, self.config.insight_context_chars)
        };

        Ok(format!(
            "**Knowledge-Enhanced Clinical Insights:**\n\n\
             {query}\n\n\
             {context}\n\n\
             **Key Considerations:**\n\
             1. Correlation with clinical presentation is essential\n\
             2. Trend analysis provides more value than single measurements\n\
             3. Consider pre-analytical variables (fasting, medications, hemolysis)\n\
             4. Age, sex, and ethnicity-specific reference ranges may apply\n\n\
             **Literature-Based Recommendations:**\n- {}",
            literature_recommendations(&findings)
        ))
    }
}

fn literature_recommendations(findings: &[String]) -> String {
    let mut recommendations: Vec<&str> = Vec::new();

    for finding in findings {
        let high = finding.ends_with("(high)");
        let low = finding.ends_with("(low)");
        let test = finding.split_whitespace().next().unwrap_or_default();

        let recommendation = match test {
            "HbA1c" if high => Some(
                "HbA1c elevation: Consider continuous glucose monitoring, endocrinology referral if >9%",
            ),
            "Creatinine" if high => Some(
                "Creatinine elevation: Calculate eGFR trend, check for nephrotoxins, consider nephrology if >30% decline",
            ),
            "TSH" => Some(
                "Thyroid dysfunction: Check free T4 to determine severity, anti-TPO if hypothyroidism",
            ),
            "Platelets" if low => Some(
                "Thrombocytopenia: Peripheral smear essential, rule out pseudothrombocytopenia with citrate tube",
            ),
            _ => None,
        };

        if let Some(text) = recommendation {
            if !recommendations.contains(&text) {
                recommendations.push(text);
            }
        }
    }

    if recommendations.is_empty() {
        "Continue routine monitoring".to_string()
    } else {
        recommendations.join("\n- ")
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// Query tokens worth matching: no numbers, no framing words.
fn keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(question) {
        if token.len() < 2 || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if QUERY_STOPWORDS.contains(&token.as_str()) || keywords.contains(&token) {
            continue;
        }
        keywords.push(token);
    }
    keywords
}

const QUERY_STOPWORDS: [&str; 6] = ["laboratory", "abnormalities", "the", "and", "of", "with"];

const STANDARD_PASSAGES: [(&str, &str); 24] = [
    (
        "Iron deficiency anemia",
        "Low hemoglobin with low MCV below 80 fL and high RDW above 14.5%. Ferritin below 15 ng/mL, low iron and high TIBC confirm depleted stores. Look for chronic blood loss, poor intake or malabsorption; stool occult blood and endoscopy when a GI source is suspected.",
    ),
    (
        "Vitamin B12 deficiency",
        "Macrocytic anemia with MCV above 100 fL, hypersegmented neutrophils and vitamin B12 below 200 pg/mL. Pernicious anemia, gastrectomy, ileal disease and strict vegan diet are common causes. Neurological signs may precede anemia; check intrinsic factor antibodies.",
    ),
    (
        "Folate deficiency",
        "Macrocytic anemia with low folate and normal vitamin B12. Seen with alcohol use, pregnancy, hemolysis and methotrexate. Review diet, alcohol history and medications.",
    ),
    (
        "Hemolytic anemia",
        "Low hemoglobin with high reticulocytes, high indirect bilirubin, high LDH and low haptoglobin. Smear may show spherocytes or schistocytes. Next: direct Coombs test, hemoglobin electrophoresis, G6PD screen.",
    ),
    (
        "Acute leukemia",
        "Blasts in peripheral blood, often with pancytopenia: low hemoglobin, low platelets, abnormal WBC. Needs urgent hematology review, bone marrow biopsy, flow cytometry and cytogenetics.",
    ),
    (
        "Immune thrombocytopenia",
        "Isolated low platelets with normal or high MPV and no splenomegaly. Exclude pseudothrombocytopenia with a citrate tube. Steroids first line, IVIG when bleeding.",
    ),
    (
        "Type 2 diabetes mellitus",
        "HbA1c at or above 6.5%, fasting glucose at or above 126 mg/dL, or random glucose at or above 200 with symptoms. Screen for retinopathy, nephropathy with urine microalbumin, and check a lipid panel.",
    ),
    (
        "Diabetic ketoacidosis",
        "Glucose above 250 mg/dL with low bicarbonate below 18 and ketones. Emergency care with insulin infusion, fluid resuscitation and close potassium monitoring.",
    ),
    (
        "Metabolic syndrome",
        "High triglycerides at or above 150, low HDL, elevated fasting glucose, raised blood pressure and central obesity. Lifestyle change, statin therapy and glucose monitoring.",
    ),
    (
        "Acute hepatitis",
        "ALT and AST elevated above ten times the upper limit, ALT usually higher than AST. Viral, drug-induced, autoimmune or ischemic causes. Order viral serologies, autoimmune markers and abdominal ultrasound.",
    ),
    (
        "Alcoholic liver disease",
        "AST to ALT ratio above 2 with high GGT and macrocytosis. Spectrum from fatty liver to cirrhosis; abstinence support and nutrition.",
    ),
    (
        "Cholestatic liver disease",
        "High ALP with high GGT and elevated direct bilirubin points to biliary obstruction or primary biliary cholangitis. Ultrasound, AMA testing, ursodeoxycholic acid.",
    ),
    (
        "Hepatic synthetic failure",
        "High INR above 1.5 with low albumin suggests impaired synthesis. Acute liver failure adds encephalopathy; consider transplant evaluation.",
    ),
    (
        "Acute kidney injury",
        "Creatinine rise of 0.3 mg/dL in 48 hours. High BUN to creatinine ratio above 20 suggests a prerenal cause. Urinalysis, renal ultrasound, stop nephrotoxins.",
    ),
    (
        "Chronic kidney disease",
        "eGFR below 60 for over three months. Low eGFR stages G3a to G5. Control blood pressure, treat anemia, bone disease and acidosis; nephrology referral for G4 and G5. Watch potassium and phosphorus.",
    ),
    (
        "Hyperkalemia",
        "High potassium above 5.0 mEq/L risks arrhythmia. Repeat to exclude hemolysis, obtain ECG, review ACE inhibitors and renal function.",
    ),
    (
        "Hyponatremia",
        "Low sodium below 135 mEq/L. Assess volume status, serum osmolality and urine sodium; correct slowly.",
    ),
    (
        "Hashimoto thyroiditis",
        "High TSH with low or normal free T4 and positive anti-TPO antibodies. Levothyroxine replacement and annual TSH monitoring.",
    ),
    (
        "Graves disease",
        "Low suppressed TSH with high free T4 and free T3, positive TRAb. Methimazole, beta blocker, radioactive iodine on relapse.",
    ),
    (
        "Dyslipidemia",
        "High LDL above 100 mg/dL, high total cholesterol and low HDL raise cardiovascular risk. Severe triglycerides above 500 mg/dL risk pancreatitis.",
    ),
    (
        "Rheumatoid arthritis",
        "Positive RF and anti-CCP with high ESR and CRP. Symmetric polyarthritis with morning stiffness; methotrexate first line.",
    ),
    (
        "Systemic lupus erythematosus",
        "Positive ANA with high anti-dsDNA and low complement. Multi-system disease; hydroxychloroquine and activity assessment.",
    ),
    (
        "Disseminated intravascular coagulation",
        "Prolonged PT and aPTT, low fibrinogen, high D-dimer and low platelets. Treat the underlying cause with blood product support.",
    ),
    (
        "Tumor markers",
        "AFP for hepatocellular carcinoma, CEA for colorectal cancer follow-up, CA-125 for ovarian cancer, PSA for prostate screening. Elevation needs imaging confirmation and is not diagnostic alone.",
    ),
];
