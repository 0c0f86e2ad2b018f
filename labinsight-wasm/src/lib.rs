//! Framework-neutral WASM <-> JavaScript bridge.

use chrono::{NaiveDate, Utc};
use labinsight_core::{AnalysisConfig, CategorizedSet, Gender, LabError, ObservationSet};
use labinsight_engine::{LabAnalyzer, LabReport};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsAnalysisConfig {
    #[serde(default)]
    max_query_findings: Option<usize>,
    #[serde(default)]
    retrieval_top_k: Option<usize>,
    #[serde(default)]
    insight_context_chars: Option<usize>,
    /// Attach the built-in knowledge base.
    #[serde(default)]
    knowledge: Option<bool>,
}

impl From<&JsAnalysisConfig> for AnalysisConfig {
    fn from(cfg: &JsAnalysisConfig) -> Self {
        let mut base = AnalysisConfig::default();
        if let Some(findings) = cfg.max_query_findings {
            base.max_query_findings = findings;
        }
        if let Some(top_k) = cfg.retrieval_top_k {
            base.retrieval_top_k = top_k;
        }
        if let Some(chars) = cfg.insight_context_chars {
            base.insight_context_chars = chars;
        }
        base
    }
}

fn build_analyzer(config: Option<JsValue>) -> Result<LabAnalyzer, JsValue> {
    let Some(js_cfg) = config else {
        return Ok(LabAnalyzer::default());
    };

    let cfg: JsAnalysisConfig = from_value(js_cfg)
        .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
    let analyzer = LabAnalyzer::default().with_config(AnalysisConfig::from(&cfg));

    Ok(if cfg.knowledge.unwrap_or(false) {
        analyzer.with_standard_knowledge()
    } else {
        analyzer
    })
}

fn read_observations(values: JsValue) -> Result<ObservationSet, JsValue> {
    from_value::<ObservationSet>(values)
        .map_err(|err| JsValue::from_str(&format!("Could not read lab values: {err}")))
}

fn read_gender(gender: &str) -> Result<Gender, JsValue> {
    gender
        .parse::<Gender>()
        .map_err(|err| JsValue::from_str(&format_lab_error(err)))
}

/// Maps become plain objects, not `Map`s, so results survive `JSON.stringify`.
fn serialize<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Could not serialize {what}: {err}")))
}

/// `{test: value}` -> `{Category: {test: value}}`.
#[wasm_bindgen]
pub fn categorize(values: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let observations = read_observations(values)?;
    serialize(&labinsight_engine::categorize(&observations), "categories")
}

#[wasm_bindgen]
pub fn check_critical(values: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let observations = read_observations(values)?;
    serialize(&LabAnalyzer::default().check_critical(&observations), "alerts")
}

#[wasm_bindgen]
pub fn classify(test: &str, value: f64, gender: &str) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let gender = read_gender(gender)?;
    let classification = LabAnalyzer::default().classify(test, value, gender);
    serialize(&classification, "classification")
}

/// Analyze a categorized panel, as returned by [`categorize`].
#[wasm_bindgen]
pub fn analyze(
    categorized: JsValue,
    gender: &str,
    age: u32,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let categorized = from_value::<CategorizedSet>(categorized)
        .map_err(|err| JsValue::from_str(&format!("Could not read categories: {err}")))?;
    let gender = read_gender(gender)?;
    let analyzer = build_analyzer(config)?;

    serialize(&analyzer.analyze(&categorized, gender, age), "analysis")
}

/// Analyze a flat panel and return the report document as pretty JSON.
///
/// `date` is `YYYY-MM-DD`; today (UTC) when omitted.
#[wasm_bindgen]
pub fn export_report(
    values: JsValue,
    gender: &str,
    age: u32,
    date: Option<String>,
    config: Option<JsValue>,
) -> Result<String, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let observations = read_observations(values)?;
    let gender = read_gender(gender)?;
    let date = match date {
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|err| JsValue::from_str(&format!("Invalid report date '{text}': {err}")))?,
        None => Utc::now().date_naive(),
    };
    let analyzer = build_analyzer(config)?;

    let analysis = analyzer.analyze_observations(&observations, gender, age);
    LabReport::with_date(gender, age, date, observations, analysis)
        .to_json()
        .map_err(|err| JsValue::from_str(&format_lab_error(err)))
}

fn format_lab_error(err: LabError) -> String {
    format!("Lab analysis error: {err}")
}
