use crate::models::answer::AnswerValue;
use crate::models::page::PageIndex;
use serde::{Deserialize, Serialize};

/// `POST /submit_survey_page/` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSubmission {
    pub user_name: String,
    pub page_number: PageIndex,
    pub answers: Vec<AnswerValue>,
}

/// `POST /submit_survey/` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSubmission {
    pub user_name: String,
    pub answers: Vec<AnswerValue>,
    pub dse_scores: Vec<u8>,
}

/// 非 2xx 响应体；`detail` 可能是字符串，也可能是结构化的校验错误
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// 从原始响应文本中提取 detail，解析失败时返回 None
    pub fn parse_detail(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail_text())
    }
}
