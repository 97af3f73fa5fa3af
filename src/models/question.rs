use crate::models::page::PageIndex;
use serde::{Deserialize, Serialize};

/// 问卷题目（获取后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_kind: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            input_kind: None,
        }
    }
}

/// `GET /get_survey_page/{page}` 的响应体
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
    /// 第 6 页附带的性向代码（如 "RIA / RAI"）
    #[serde(default)]
    pub holland_codes: Option<String>,
}

/// 某一页的题目集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    pub page: PageIndex,
    pub questions: Vec<Question>,
    pub personality_hint: Option<String>,
}

impl QuestionSet {
    pub fn new(page: PageIndex, questions: Vec<Question>) -> Self {
        Self {
            page,
            questions,
            personality_hint: None,
        }
    }

    pub fn from_response(page: PageIndex, response: QuestionsResponse) -> Self {
        Self {
            page,
            questions: response.questions,
            personality_hint: response.holland_codes,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
