use crate::models::PageIndex;
use crate::services::validator::Violation;
use thiserror::Error;

/// 向答题者展示的通用提交失败提示
pub const GENERIC_SUBMIT_MESSAGE: &str = "submission failed, please try again later";

/// 获取题目失败
#[derive(Debug, Error)]
pub enum FetchError {
    /// 第 6 页必须带身份
    #[error("第 {page} 页需要答题者身份")]
    MissingIdentity { page: PageIndex },
    /// 网络请求失败
    #[error("获取第 {page} 页题目请求失败: {source}")]
    Request {
        page: PageIndex,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端返回非 2xx
    #[error("获取第 {page} 页题目失败 (HTTP {status}): {}", .detail.as_deref().unwrap_or("无详情"))]
    Status {
        page: PageIndex,
        status: u16,
        detail: Option<String>,
    },
    /// 返回数据格式不对或题目数量不符
    #[error("第 {page} 页题目数据无效: {reason}")]
    Malformed { page: PageIndex, reason: String },
}

/// 提交答案失败
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("提交请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端拒绝（非 2xx）
    #[error("服务端拒绝提交 ({endpoint}, HTTP {status}): {}", .detail.as_deref().unwrap_or("无详情"))]
    Rejected {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    /// 本地检查不通过，未发出请求
    #[error("提交数据无效: {0}")]
    InvalidPayload(String),
    /// 本次会话已完成最终提交
    #[error("本次问卷已提交，不能重复提交")]
    AlreadyFinalized,
}

impl SubmissionError {
    /// 展示给答题者的信息：优先使用服务端 detail
    pub fn respondent_message(&self) -> String {
        match self {
            SubmissionError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => GENERIC_SUBMIT_MESSAGE.to_string(),
        }
    }
}

/// 规范答案向量未填满，不能汇总
#[derive(Debug, Error)]
#[error("问卷答案不完整，规范向量缺少 {} 项", .missing.len())]
pub struct IncompleteAnswers {
    /// 缺失项在规范向量中的下标
    pub missing: Vec<usize>,
}

/// 完成标记读写失败
#[derive(Debug, Error)]
pub enum GateError {
    #[error("完成标记文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("完成标记序列化失败: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("完成标记解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 问卷向导的操作错误，均可恢复，不影响宿主进程
#[derive(Debug, Error)]
pub enum WizardError {
    /// 校验未通过，附带全部违规项
    #[error("校验未通过: {}", join_violations(.0))]
    Validation(Vec<Violation>),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Gate(#[from] GateError),
    /// 有请求尚未完成
    #[error("上一个操作仍在进行中")]
    Busy,
    /// 当前状态下不存在该转换
    #[error("第 {page} 页无法{action}")]
    NoTransition { page: PageIndex, action: &'static str },
    /// 问卷已完成
    #[error("问卷已完成")]
    Completed,
    #[error("槽位 {slot} 超出范围（本页共 {size} 个）")]
    SlotOutOfRange { slot: usize, size: usize },
    #[error(transparent)]
    Incomplete(#[from] IncompleteAnswers),
}

impl WizardError {
    /// 展示给答题者的信息
    pub fn respondent_message(&self) -> String {
        match self {
            WizardError::Validation(violations) => join_violations(violations),
            WizardError::Submission(e) => e.respondent_message(),
            WizardError::Fetch(_) => "could not load questions, please retry".to_string(),
            WizardError::Gate(_) => "could not save survey progress, please retry".to_string(),
            WizardError::Busy => "please wait, the previous action is still in progress".to_string(),
            WizardError::NoTransition { page, .. } => {
                format!("this action is not available on page {}", page)
            }
            WizardError::Completed => "the survey has already been completed".to_string(),
            WizardError::SlotOutOfRange { slot, size } => {
                format!("question {} does not exist, this page has {} questions", slot + 1, size)
            }
            WizardError::Incomplete(_) => {
                "some answers are missing, please review the earlier pages".to_string()
            }
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 问卷向导结果类型
pub type WizardResult<T> = Result<T, WizardError>;
