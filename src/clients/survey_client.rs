/// 评分服务 HTTP 客户端
///
/// 封装题目获取、逐页提交和最终提交三个接口
use crate::config::Config;
use crate::error::{FetchError, SubmissionError};
use crate::models::{
    ErrorBody, FinalSubmission, PageIndex, PageSubmission, QuestionSet, QuestionsResponse,
};
use crate::services::question_provider::required_identity;
use crate::services::{QuestionProvider, SurveyBackend};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

pub const SUBMIT_PAGE_ENDPOINT: &str = "/submit_survey_page/";
pub const SUBMIT_FINAL_ENDPOINT: &str = "/submit_survey/";

/// 评分服务客户端
#[derive(Debug, Clone)]
pub struct SurveyClient {
    http: Client,
    base_url: String,
}

impl SurveyClient {
    /// 创建新的客户端，超时时间取自配置
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<(), SubmissionError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| SubmissionError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail: ErrorBody::parse_detail(&text),
            });
        }

        Ok(())
    }
}

impl QuestionProvider for SurveyClient {
    async fn fetch(&self, page: PageIndex, identity: Option<&str>) -> Result<QuestionSet, FetchError> {
        let identity = required_identity(page, identity)?;
        let url = format!("{}/get_survey_page/{}", self.base_url, page.number());

        let mut request = self.http.get(&url);
        if let Some(name) = identity {
            request = request.query(&[("user_name", name)]);
        }
        debug!("GET {} (user_name: {:?})", url, identity);

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Request { page, source })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
                detail: ErrorBody::parse_detail(&text),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| FetchError::Request { page, source })?;
        let parsed: QuestionsResponse =
            serde_json::from_str(&text).map_err(|e| FetchError::Malformed {
                page,
                reason: e.to_string(),
            })?;

        Ok(QuestionSet::from_response(page, parsed))
    }
}

impl SurveyBackend for SurveyClient {
    async fn submit_page(&self, submission: &PageSubmission) -> Result<(), SubmissionError> {
        self.post(SUBMIT_PAGE_ENDPOINT, submission).await
    }

    async fn submit_final(&self, submission: &FinalSubmission) -> Result<(), SubmissionError> {
        self.post(SUBMIT_FINAL_ENDPOINT, submission).await
    }
}
