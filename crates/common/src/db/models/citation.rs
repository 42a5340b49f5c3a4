//! Citation attached to a synthesized answer

use super::paper::PaperId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Reference number (1-based, dense within one answer)
    #[serde(rename = "ref")]
    pub reference: u32,

    /// Paper being cited
    pub paper_id: PaperId,

    pub page: u32,

    pub snippet: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speculative: Option<bool>,
}
