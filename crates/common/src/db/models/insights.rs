//! Insight panel entities: extracted facts, reproducibility card, gaps

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchFacts {
    pub datasets: Vec<String>,
    pub metrics: Vec<ReportedMetric>,
    pub code_repositories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedMetric {
    pub name: String,
    pub value: String,
    /// Citation reference backing the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReproCard {
    pub task: String,
    pub model: String,
    pub data: String,
    pub metrics: Vec<String>,
    pub baselines: Vec<String>,
    pub hardware: String,
    /// String or numeric values, keyed by hyperparameter name
    pub hyperparams: BTreeMap<String, serde_json::Value>,
    pub ablations: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapLabel {
    Grounded,
    Speculative,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapInsight {
    pub id: String,
    pub label: GapLabel,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<u32>,
}
