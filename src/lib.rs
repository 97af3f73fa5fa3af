//! # Survey Wizard
//!
//! 六页职业倾向问卷的答题向导
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - 页码、页面规则表、答案值、题目和提交请求体
//!
//! ### ② 业务能力层（Services）
//! - `validator` - 按规则表逐页校验
//! - `AnswerStore` - 当前页缓冲区和 49 项规范答案
//! - `SubmissionCoordinator` - 逐页提交和最终提交（每会话至多成功一次）
//! - `CompletionGate` - 完成标记的写入和清除
//! - `QuestionProvider` / `SurveyBackend` - 与评分服务交互的接口
//!
//! ### ③ 流程层（Workflow）
//! - `Wizard` - 不做 I/O 的状态机，产出带标签的请求
//! - `PageController` - 执行请求并把结果交回状态机
//!
//! ### ④ 客户端与编排层
//! - `clients/SurveyClient` - reqwest 实现的评分服务客户端
//! - `App` - 终端前端
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::SurveyClient;
pub use config::Config;
pub use error::{FetchError, SubmissionError, WizardError, WizardResult};
pub use models::{AnswerValue, PageIndex, PageKind, Question, QuestionSet};
pub use services::{
    CompletionGate, CompletionMarker, FileMarkerStore, MarkerStore, MemoryMarkerStore,
    QuestionProvider, ResultsAccess, SurveyBackend,
};
pub use workflow::{PageController, Stage, Wizard};
