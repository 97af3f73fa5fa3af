//! 提交协调 - 业务能力层
//!
//! 负责组装逐页提交和最终提交的请求体，并按顺序调用评分服务。
//! 逐页提交只带本页答案；最终提交每个会话只允许成功一次。

use crate::error::SubmissionError;
use crate::models::page::SUBJECT_COUNT;
use crate::models::{AnswerValue, FinalSubmission, PageIndex, PageSubmission, CANONICAL_LEN};
use crate::services::answer_store::CanonicalAnswers;
use tracing::{debug, info, warn};

/// 评分服务的提交接口
#[allow(async_fn_in_trait)]
pub trait SurveyBackend {
    async fn submit_page(&self, submission: &PageSubmission) -> Result<(), SubmissionError>;
    async fn submit_final(&self, submission: &FinalSubmission) -> Result<(), SubmissionError>;
}

/// 组装逐页提交请求体
pub fn page_submission(
    identity: &str,
    page: PageIndex,
    answers: Vec<AnswerValue>,
) -> Result<PageSubmission, SubmissionError> {
    if identity.trim().is_empty() {
        return Err(SubmissionError::InvalidPayload("缺少答题者身份".to_string()));
    }
    let expected = page.kind().slot_count();
    if answers.len() != expected {
        return Err(SubmissionError::InvalidPayload(format!(
            "第 {} 页应有 {} 个答案，实际 {} 个",
            page,
            expected,
            answers.len()
        )));
    }
    Ok(PageSubmission {
        user_name: identity.to_string(),
        page_number: page,
        answers,
    })
}

/// 组装最终提交请求体（49 个答案 + 5 个 DSE 分数）
pub fn final_submission(canonical: &CanonicalAnswers) -> Result<FinalSubmission, SubmissionError> {
    if canonical.user_name.trim().is_empty() {
        return Err(SubmissionError::InvalidPayload("缺少答题者身份".to_string()));
    }
    if canonical.answers.len() != CANONICAL_LEN {
        return Err(SubmissionError::InvalidPayload(format!(
            "规范答案应有 {} 项，实际 {} 项",
            CANONICAL_LEN,
            canonical.answers.len()
        )));
    }
    debug_assert_eq!(canonical.dse_scores.len(), SUBJECT_COUNT);
    Ok(FinalSubmission {
        user_name: canonical.user_name.clone(),
        answers: canonical.answers.clone(),
        dse_scores: canonical.dse_scores.to_vec(),
    })
}

/// 提交协调器
pub struct SubmissionCoordinator<B> {
    backend: B,
    finalized_for: Option<String>,
}

impl<B: SurveyBackend> SubmissionCoordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            finalized_for: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 最终提交是否已被确认
    pub fn is_finalized(&self) -> bool {
        self.finalized_for.is_some()
    }

    /// 开始新会话
    pub fn reset(&mut self) {
        self.finalized_for = None;
    }

    pub async fn submit_page(&self, submission: &PageSubmission) -> Result<(), SubmissionError> {
        info!(
            "[问卷 第{}页] 📤 提交本页 {} 个答案...",
            submission.page_number,
            submission.answers.len()
        );
        debug!("逐页提交 Payload: {:?}", submission);

        match self.backend.submit_page(submission).await {
            Ok(()) => {
                info!("[问卷 第{}页] ✓ 本页提交成功", submission.page_number);
                Ok(())
            }
            Err(e) => {
                warn!("[问卷 第{}页] ⚠️ 本页提交失败: {}", submission.page_number, e);
                Err(e)
            }
        }
    }

    pub async fn submit_final(&mut self, submission: &FinalSubmission) -> Result<(), SubmissionError> {
        if self.is_finalized() {
            warn!("⚠️ 问卷已提交过，拒绝重复提交: {}", submission.user_name);
            return Err(SubmissionError::AlreadyFinalized);
        }

        info!("📋 提交整份问卷 ({} 个答案)...", submission.answers.len());
        debug!("最终提交 Payload: {:?}", submission);

        self.backend.submit_final(submission).await.map_err(|e| {
            warn!("⚠️ 整份问卷提交失败: {}", e);
            e
        })?;

        info!("✓ 整份问卷提交成功");
        self.finalized_for = Some(submission.user_name.clone());
        Ok(())
    }
}
