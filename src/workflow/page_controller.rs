//! 页面控制器 - 流程层
//!
//! 把 [`Wizard`] 产出的操作交给题目提供方和提交协调器执行，
//! 并把结果交回状态机，直到需要答题者再次输入为止。
//!
//! 控制器通过 `&mut self` 串行执行，一次只有一个请求在途。

use tracing::{info, warn};

use crate::error::WizardResult;
use crate::models::AnswerValue;
use crate::services::{
    CompletionGate, MarkerStore, QuestionProvider, SubmissionCoordinator, SurveyBackend,
};
use crate::workflow::wizard::{Applied, Effect, Stage, Wizard};

/// 页面控制器
///
/// - 持有状态机、题目提供方和提交协调器
/// - 不做校验，校验全部由状态机完成
/// - 最终提交失败后自动重新载入第 1 页
pub struct PageController<P, B, S> {
    wizard: Wizard<S>,
    provider: P,
    coordinator: SubmissionCoordinator<B>,
}

impl<P, B, S> PageController<P, B, S>
where
    P: QuestionProvider,
    B: SurveyBackend,
    S: MarkerStore,
{
    pub fn new(provider: P, backend: B, gate: CompletionGate<S>) -> Self {
        Self {
            wizard: Wizard::new(gate),
            provider,
            coordinator: SubmissionCoordinator::new(backend),
        }
    }

    pub fn wizard(&self) -> &Wizard<S> {
        &self.wizard
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn coordinator(&self) -> &SubmissionCoordinator<B> {
        &self.coordinator
    }

    /// 以原始输入作答
    pub fn set_answer(&mut self, slot: usize, raw: &str) -> WizardResult<()> {
        self.wizard.set_raw(slot, raw)
    }

    pub fn set_slot(&mut self, slot: usize, value: Option<AnswerValue>) -> WizardResult<()> {
        self.wizard.set_slot(slot, value)
    }

    /// 开始新问卷并载入第 1 页
    pub async fn start(&mut self) -> WizardResult<Stage> {
        let effect = self.wizard.start()?;
        self.coordinator.reset();
        self.run(effect).await
    }

    /// 提交本页并前进；第 6 页之后执行最终提交
    pub async fn next(&mut self) -> WizardResult<Stage> {
        let effect = self.wizard.request_forward()?;
        self.run(effect).await
    }

    /// 返回上一页
    pub async fn back(&mut self) -> WizardResult<Stage> {
        let effect = self.wizard.request_back()?;
        self.run(effect).await
    }

    /// 重新获取当前页题目
    pub async fn reload(&mut self) -> WizardResult<Stage> {
        let effect = self.wizard.reload()?;
        self.run(effect).await
    }

    async fn run(&mut self, mut effect: Effect) -> WizardResult<Stage> {
        loop {
            let applied = match effect {
                Effect::FetchQuestions(tag) => {
                    let result = self.provider.fetch(tag.page(), tag.identity()).await;
                    self.wizard.apply_questions(tag, result)
                }
                Effect::SubmitPage(tag, submission) => {
                    let result = self.coordinator.submit_page(&submission).await;
                    let applied = self.wizard.apply_page_submitted(tag, result);
                    self.recover_if_discarded(applied.is_err()).await;
                    applied
                }
                Effect::SubmitFinal(tag, submission) => {
                    let result = self.coordinator.submit_final(&submission).await;
                    let applied = self.wizard.apply_final_submitted(tag, result);
                    self.recover_if_discarded(applied.is_err()).await;
                    applied
                }
            }?;

            match applied {
                Applied::Next(next) => effect = next,
                Applied::Ready | Applied::Completed | Applied::Stale => {
                    return Ok(self.wizard.stage());
                }
            }
        }
    }

    /// 会话被丢弃后回到第 1 页并重新获取题目
    async fn recover_if_discarded(&mut self, failed: bool) {
        if !failed || !self.wizard.needs_questions() {
            return;
        }

        info!("🔄 会话已丢弃，重新载入第 1 页");
        self.coordinator.reset();

        let Ok(Effect::FetchQuestions(tag)) = self.wizard.reload() else {
            return;
        };
        let result = self.provider.fetch(tag.page(), tag.identity()).await;
        if let Err(e) = self.wizard.apply_questions(tag, result) {
            warn!("⚠️ 重新载入第 1 页失败: {}", e);
        }
    }
}
