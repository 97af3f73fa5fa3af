//! 问卷向导状态机 - 流程层
//!
//! 状态：`P1..P6 → Completed`。状态机本身不做 I/O，只产出带标签的
//! [`Effect`]，由宿主执行后把结果交回 `apply_*`。同一时间最多只有一个
//! 请求在途（`pending` 即加载标志），标签不匹配的响应直接丢弃。
//!
//! 转换规则：
//! 1. 前进 `Pn → Pn+1`：本页校验通过且逐页提交成功
//! 2. 完成 `P6 → Completed`：第 6 页提交成功且最终提交成功
//! 3. 后退 `Pn → Pn-1`：不校验、不提交、不修改已累积的答案
//! 4. 最终提交失败：清除完成标记，丢弃整份答案，回到第 1 页

use tracing::{debug, error, info, warn};

use crate::error::{FetchError, SubmissionError, WizardError, WizardResult};
use crate::models::{
    AnswerValue, FinalSubmission, PageIndex, PageSubmission, Question, QuestionSet,
};
use crate::services::question_provider::check_shape;
use crate::services::submission::{final_submission, page_submission};
use crate::services::{AccessToken, AnswerStore, CompletionGate, MarkerStore, SurveyState};
use crate::workflow::request_tag::RequestTag;

/// 向导所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Page(PageIndex),
    Completed,
}

impl Stage {
    pub fn page(self) -> Option<PageIndex> {
        match self {
            Stage::Page(page) => Some(page),
            Stage::Completed => None,
        }
    }
}

/// 需要宿主执行的异步操作
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchQuestions(RequestTag),
    SubmitPage(RequestTag, PageSubmission),
    SubmitFinal(RequestTag, FinalSubmission),
}

impl Effect {
    pub fn tag(&self) -> &RequestTag {
        match self {
            Effect::FetchQuestions(tag) | Effect::SubmitPage(tag, _) | Effect::SubmitFinal(tag, _) => {
                tag
            }
        }
    }
}

/// 应用一次响应后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// 响应已过期，被丢弃
    Stale,
    /// 题目已载入，等待作答
    Ready,
    /// 还需要继续执行下一个操作
    Next(Effect),
    /// 问卷完成
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Fetch,
    SubmitPage,
    SubmitFinal,
}

/// 问卷向导
#[derive(Debug)]
pub struct Wizard<S> {
    stage: Stage,
    questions: Option<QuestionSet>,
    store: AnswerStore,
    gate: CompletionGate<S>,
    pending: Option<(PendingKind, RequestTag)>,
    next_seq: u64,
    notice: Option<String>,
}

impl<S: MarkerStore> Wizard<S> {
    pub fn new(gate: CompletionGate<S>) -> Self {
        Self {
            stage: Stage::Page(PageIndex::FIRST),
            questions: None,
            store: AnswerStore::new(),
            gate,
            pending: None,
            next_seq: 0,
            notice: None,
        }
    }

    // ========== 只读视图 ==========

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn current_page(&self) -> Option<PageIndex> {
        self.stage.page()
    }

    pub fn questions(&self) -> &[Question] {
        self.questions
            .as_ref()
            .map(|set| set.questions.as_slice())
            .unwrap_or_default()
    }

    pub fn personality_hint(&self) -> Option<&str> {
        self.questions.as_ref()?.personality_hint.as_deref()
    }

    pub fn buffer(&self) -> &[Option<AnswerValue>] {
        self.store.current_buffer()
    }

    pub fn state(&self) -> &SurveyState {
        self.store.state()
    }

    /// 答题者身份（第 1 页提交后才有）
    pub fn identity(&self) -> Option<&str> {
        self.store.state().name()
    }

    /// 是否有请求在途
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// 当前页题目尚未载入且没有在途请求
    pub fn needs_questions(&self) -> bool {
        self.current_page().is_some() && self.questions.is_none() && self.pending.is_none()
    }

    /// 最近一次错误提示，原样展示给答题者
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.gate.token()
    }

    pub fn gate(&self) -> &CompletionGate<S> {
        &self.gate
    }

    // ========== 答题者操作 ==========

    /// 开始新问卷：清除旧的完成标记，从第 1 页开始
    pub fn start(&mut self) -> WizardResult<Effect> {
        self.ensure_idle()?;
        self.gate.clear()?;
        self.discard_session();
        info!("🚀 开始新问卷");
        Ok(self.issue_fetch(PageIndex::FIRST))
    }

    /// 覆盖当前页的一个槽位，同时清除错误提示
    pub fn set_slot(&mut self, index: usize, value: Option<AnswerValue>) -> WizardResult<()> {
        self.ensure_editable()?;
        let size = self.store.current_buffer().len();
        if !self.store.set_slot(index, value) {
            return Err(WizardError::SlotOutOfRange { slot: index, size });
        }
        self.notice = None;
        Ok(())
    }

    /// 以原始输入覆盖槽位，按本页类型转换
    pub fn set_raw(&mut self, index: usize, raw: &str) -> WizardResult<()> {
        self.ensure_editable()?;
        let size = self.store.current_buffer().len();
        if !self.store.set_raw(index, raw) {
            return Err(WizardError::SlotOutOfRange { slot: index, size });
        }
        self.notice = None;
        Ok(())
    }

    /// 请求前进：校验通过后产出本页提交
    ///
    /// 本页题目尚未载入时（上次获取失败）改为重新获取题目。
    pub fn request_forward(&mut self) -> WizardResult<Effect> {
        let page = self.ensure_editable()?;

        if self.questions.is_none() {
            debug!("[问卷 第{}页] 题目未载入，重新获取", page);
            return Ok(self.issue_fetch(page));
        }

        let answers = match self.store.page_answers() {
            Ok(answers) => answers,
            Err(violations) => {
                info!("[问卷 第{}页] ✗ 校验未通过: {} 项", page, violations.len());
                return Err(self.fail_with(WizardError::Validation(violations)));
            }
        };

        let identity = match self.identity() {
            Some(name) => name.to_string(),
            None => answers
                .first()
                .and_then(AnswerValue::as_text)
                .unwrap_or_default()
                .to_string(),
        };

        let submission = match page_submission(&identity, page, answers) {
            Ok(submission) => submission,
            Err(e) => return Err(self.fail_with(e.into())),
        };

        let tag = self.next_tag(page, Some(identity));
        self.pending = Some((PendingKind::SubmitPage, tag.clone()));
        debug!("{} 校验通过，等待提交", tag);
        Ok(Effect::SubmitPage(tag, submission))
    }

    /// 请求后退：纯导航
    pub fn request_back(&mut self) -> WizardResult<Effect> {
        let page = self.ensure_editable()?;
        let prev = page.prev().ok_or(WizardError::NoTransition {
            page,
            action: "后退",
        })?;

        info!("[问卷 第{}页] ⬅️ 返回第 {} 页", page, prev);
        self.stage = Stage::Page(prev);
        self.enter_page(prev);
        Ok(self.issue_fetch(prev))
    }

    /// 重新获取当前页题目
    pub fn reload(&mut self) -> WizardResult<Effect> {
        let page = self.ensure_editable()?;
        Ok(self.issue_fetch(page))
    }

    /// 放弃等待在途请求（不取消请求本身），之后到达的响应会被当作过期丢弃
    pub fn abandon_pending(&mut self) -> Option<RequestTag> {
        let (_, tag) = self.pending.take()?;
        warn!("{} ⏱️ 不再等待该请求", tag);
        Some(tag)
    }

    // ========== 响应处理 ==========

    pub fn apply_questions(
        &mut self,
        tag: RequestTag,
        result: Result<QuestionSet, FetchError>,
    ) -> WizardResult<Applied> {
        if !self.take_pending(PendingKind::Fetch, &tag) {
            return Ok(Applied::Stale);
        }

        let set = match result.and_then(|set| check_shape(tag.page(), &set).map(|()| set)) {
            Ok(set) => set,
            Err(e) => {
                warn!("{} ⚠️ 获取题目失败: {}", tag, e);
                return Err(self.fail_with(e.into()));
            }
        };

        self.store.reset_for(tag.page().kind(), set.len());
        info!("{} ✓ 已载入 {} 道题目", tag, set.len());
        self.questions = Some(set);
        Ok(Applied::Ready)
    }

    pub fn apply_page_submitted(
        &mut self,
        tag: RequestTag,
        result: Result<(), SubmissionError>,
    ) -> WizardResult<Applied> {
        if !self.take_pending(PendingKind::SubmitPage, &tag) {
            return Ok(Applied::Stale);
        }

        if let Err(e) = result {
            return Err(self.fail_with(e.into()));
        }

        let page = tag.page();
        if let Err(violations) = self.store.commit(page) {
            return Err(self.fail_with(WizardError::Validation(violations)));
        }

        match page.next() {
            Some(next) => {
                info!("{} ➡️ 进入第 {} 页", tag, next);
                self.stage = Stage::Page(next);
                self.enter_page(next);
                Ok(Applied::Next(self.issue_fetch(next)))
            }
            None => self.begin_final(&tag),
        }
    }

    pub fn apply_final_submitted(
        &mut self,
        tag: RequestTag,
        result: Result<(), SubmissionError>,
    ) -> WizardResult<Applied> {
        if !self.take_pending(PendingKind::SubmitFinal, &tag) {
            return Ok(Applied::Stale);
        }

        if let Err(e) = result {
            return Err(self.abort_session(e.into()));
        }

        let identity = self.identity().unwrap_or_default().to_string();
        if let Err(e) = self.gate.mark_complete(&identity) {
            return Err(self.abort_session(e.into()));
        }

        self.stage = Stage::Completed;
        self.notice = None;
        info!("🎉 问卷完成: {}", identity);
        Ok(Applied::Completed)
    }

    // ========== 内部辅助 ==========

    fn begin_final(&mut self, tag: &RequestTag) -> WizardResult<Applied> {
        let submission = self
            .store
            .aggregate()
            .map_err(WizardError::from)
            .and_then(|canonical| final_submission(&canonical).map_err(WizardError::from));

        let submission = match submission {
            Ok(submission) => submission,
            Err(e) => return Err(self.abort_session(e)),
        };

        let tag = self.next_tag(tag.page(), tag.identity().map(str::to_string));
        self.pending = Some((PendingKind::SubmitFinal, tag.clone()));
        Ok(Applied::Next(Effect::SubmitFinal(tag, submission)))
    }

    /// 最终提交失败：清除完成标记，丢弃身份和全部答案
    fn abort_session(&mut self, err: WizardError) -> WizardError {
        error!("❌ 最终提交失败，清除完成标记并回到第 1 页: {}", err);
        if let Err(e) = self.gate.clear() {
            error!("清除完成标记失败: {}", e);
        }
        self.discard_session();
        self.fail_with(err)
    }

    fn discard_session(&mut self) {
        self.store = AnswerStore::new();
        self.stage = Stage::Page(PageIndex::FIRST);
        self.enter_page(PageIndex::FIRST);
    }

    fn enter_page(&mut self, page: PageIndex) {
        self.questions = None;
        self.store.reset_for(page.kind(), 0);
        self.notice = None;
    }

    fn issue_fetch(&mut self, page: PageIndex) -> Effect {
        let identity = self.identity().map(str::to_string);
        let tag = self.next_tag(page, identity);
        self.pending = Some((PendingKind::Fetch, tag.clone()));
        debug!("{} 获取题目", tag);
        Effect::FetchQuestions(tag)
    }

    fn next_tag(&mut self, page: PageIndex, identity: Option<String>) -> RequestTag {
        self.next_seq += 1;
        RequestTag::new(self.next_seq, page, identity)
    }

    /// 响应与在途请求、当前页、当前身份都一致时才接受
    fn take_pending(&mut self, kind: PendingKind, tag: &RequestTag) -> bool {
        let is_pending = matches!(&self.pending, Some((k, pending)) if *k == kind && pending == tag);
        let same_page = self.current_page() == Some(tag.page());
        let same_identity = kind != PendingKind::Fetch || tag.identity() == self.identity();

        if is_pending && same_page && same_identity {
            self.pending = None;
            true
        } else {
            warn!("{} 响应已过期，丢弃", tag);
            false
        }
    }

    fn ensure_idle(&self) -> WizardResult<()> {
        if self.pending.is_some() {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn ensure_editable(&self) -> WizardResult<PageIndex> {
        let page = self.current_page().ok_or(WizardError::Completed)?;
        self.ensure_idle()?;
        Ok(page)
    }

    fn fail_with(&mut self, err: WizardError) -> WizardError {
        self.notice = Some(err.respondent_message());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CompletionMarker, MemoryMarkerStore};
    use crate::services::validator::Violation;

    fn page(n: u8) -> PageIndex {
        PageIndex::new(n).unwrap()
    }

    fn questions_for(page: PageIndex) -> QuestionSet {
        let questions = (0..page.kind().slot_count())
            .map(|i| Question::new(format!("第{}页 第{}题", page, i + 1)))
            .collect();
        QuestionSet::new(page, questions)
    }

    fn new_wizard() -> (Wizard<MemoryMarkerStore>, MemoryMarkerStore) {
        let store = MemoryMarkerStore::new();
        (Wizard::new(CompletionGate::new(store.clone())), store)
    }

    /// 执行获取题目并成功载入
    fn serve_fetch(wizard: &mut Wizard<MemoryMarkerStore>, effect: Effect) {
        let Effect::FetchQuestions(tag) = effect else {
            panic!("应为获取题目: {:?}", effect);
        };
        let set = questions_for(tag.page());
        assert_eq!(wizard.apply_questions(tag, Ok(set)).unwrap(), Applied::Ready);
    }

    fn fill_current(wizard: &mut Wizard<MemoryMarkerStore>) {
        match wizard.current_page().unwrap().number() {
            1 => {
                wizard.set_raw(0, "Alice").unwrap();
                for (i, s) in ["5", "6", "4", "5", "7"].iter().enumerate() {
                    wizard.set_raw(i + 1, s).unwrap();
                }
            }
            _ => {
                for i in 0..wizard.buffer().len() {
                    wizard.set_raw(i, "yes").unwrap();
                }
            }
        }
    }

    /// 填写并前进一页（逐页提交成功）
    fn advance(wizard: &mut Wizard<MemoryMarkerStore>) -> Applied {
        fill_current(wizard);
        let Effect::SubmitPage(tag, _) = wizard.request_forward().unwrap() else {
            panic!("应为逐页提交");
        };
        let applied = wizard.apply_page_submitted(tag, Ok(())).unwrap();
        if let Applied::Next(effect @ Effect::FetchQuestions(_)) = applied.clone() {
            serve_fetch(wizard, effect);
        }
        applied
    }

    fn started() -> (Wizard<MemoryMarkerStore>, MemoryMarkerStore) {
        let (mut wizard, store) = new_wizard();
        let effect = wizard.start().unwrap();
        serve_fetch(&mut wizard, effect);
        (wizard, store)
    }

    #[test]
    fn test_start_clears_previous_marker() {
        let store = MemoryMarkerStore::with_marker(CompletionMarker {
            user_name: "Bob".to_string(),
            completed: true,
            completed_at: None,
        });
        let mut wizard = Wizard::new(CompletionGate::new(store.clone()));
        wizard.start().unwrap();
        assert!(store.snapshot().is_none());
        assert!(wizard.is_loading());
    }

    #[test]
    fn test_loading_blocks_every_trigger() {
        let (mut wizard, _) = new_wizard();
        wizard.start().unwrap();

        assert!(matches!(wizard.request_forward(), Err(WizardError::Busy)));
        assert!(matches!(wizard.request_back(), Err(WizardError::Busy)));
        assert!(matches!(wizard.set_raw(0, "Alice"), Err(WizardError::Busy)));
        assert!(matches!(wizard.start(), Err(WizardError::Busy)));
    }

    #[test]
    fn test_repeated_forward_yields_single_submission() {
        let (mut wizard, _) = started();
        fill_current(&mut wizard);
        assert!(matches!(wizard.request_forward(), Ok(Effect::SubmitPage(..))));
        assert!(matches!(wizard.request_forward(), Err(WizardError::Busy)));
    }

    #[test]
    fn test_no_back_from_first_page() {
        let (mut wizard, _) = started();
        assert!(matches!(
            wizard.request_back(),
            Err(WizardError::NoTransition { .. })
        ));
    }

    #[test]
    fn test_validation_failure_sets_notice_and_stays() {
        let (mut wizard, _) = started();
        wizard.set_raw(0, "Alice").unwrap();
        let err = wizard.request_forward().unwrap_err();
        assert!(matches!(err, WizardError::Validation(ref v) if v.len() == 5));
        assert_eq!(wizard.stage(), Stage::Page(page(1)));
        assert!(!wizard.is_loading());
        assert!(wizard.notice().is_some());

        // 修改答案后错误提示清除
        wizard.set_raw(1, "5").unwrap();
        assert!(wizard.notice().is_none());
    }

    #[test]
    fn test_page_one_submission_carries_name_and_scores() {
        let (mut wizard, _) = started();
        fill_current(&mut wizard);
        let Effect::SubmitPage(tag, submission) = wizard.request_forward().unwrap() else {
            panic!("应为逐页提交");
        };
        assert_eq!(tag.identity(), Some("Alice"));
        assert_eq!(submission.user_name, "Alice");
        assert_eq!(submission.answers.len(), 6);
        assert_eq!(submission.answers[3], AnswerValue::Integer(4));
        // 提交确认前身份尚未记录
        assert_eq!(wizard.identity(), None);
    }

    #[test]
    fn test_stale_fetch_for_abandoned_request_is_ignored() {
        let (mut wizard, _) = new_wizard();
        let Effect::FetchQuestions(first) = wizard.start().unwrap() else {
            unreachable!()
        };
        wizard.abandon_pending();
        let Effect::FetchQuestions(second) = wizard.reload().unwrap() else {
            unreachable!()
        };

        let stale = wizard.apply_questions(first, Ok(questions_for(page(1)))).unwrap();
        assert_eq!(stale, Applied::Stale);
        assert!(wizard.is_loading());

        let ready = wizard.apply_questions(second, Ok(questions_for(page(1)))).unwrap();
        assert_eq!(ready, Applied::Ready);
        assert_eq!(wizard.buffer().len(), 6);
    }

    #[test]
    fn test_stale_fetch_for_page_left_behind_is_ignored() {
        let (mut wizard, _) = started();
        advance(&mut wizard);
        fill_current(&mut wizard);
        let Effect::SubmitPage(tag, _) = wizard.request_forward().unwrap() else {
            unreachable!()
        };
        // 第 2 页提交成功，正在获取第 3 页题目
        let Applied::Next(Effect::FetchQuestions(page3_fetch)) =
            wizard.apply_page_submitted(tag, Ok(())).unwrap()
        else {
            unreachable!()
        };
        wizard.abandon_pending();
        let back = wizard.request_back().unwrap();
        assert_eq!(wizard.stage(), Stage::Page(page(2)));

        // 第 3 页的响应迟到
        let late = wizard
            .apply_questions(page3_fetch, Ok(questions_for(page(3))))
            .unwrap();
        assert_eq!(late, Applied::Stale);
        assert_eq!(wizard.stage(), Stage::Page(page(2)));
        assert!(wizard.questions().is_empty());

        serve_fetch(&mut wizard, back);
        assert_eq!(wizard.questions()[0].text, "第2页 第1题");
    }

    #[test]
    fn test_late_submit_ack_after_abandon_is_ignored() {
        let (mut wizard, _) = started();
        fill_current(&mut wizard);
        let Effect::SubmitPage(tag, _) = wizard.request_forward().unwrap() else {
            unreachable!()
        };
        wizard.abandon_pending();
        assert_eq!(wizard.apply_page_submitted(tag, Ok(())).unwrap(), Applied::Stale);
        assert_eq!(wizard.stage(), Stage::Page(page(1)));
        assert_eq!(wizard.identity(), None);
    }

    #[test]
    fn test_back_does_not_submit_or_mutate() {
        let (mut wizard, _) = started();
        advance(&mut wizard);
        advance(&mut wizard);
        assert_eq!(wizard.stage(), Stage::Page(page(3)));
        let before = wizard.state().clone();

        let effect = wizard.request_back().unwrap();
        assert!(matches!(effect, Effect::FetchQuestions(ref tag) if tag.page() == page(2)));
        serve_fetch(&mut wizard, effect);

        assert_eq!(wizard.state(), &before);
        assert!(wizard.buffer().iter().all(Option::is_none));
    }

    #[test]
    fn test_malformed_question_set_keeps_page() {
        let (mut wizard, _) = started();
        fill_current(&mut wizard);
        let Effect::SubmitPage(tag, _) = wizard.request_forward().unwrap() else {
            unreachable!()
        };
        let Applied::Next(Effect::FetchQuestions(fetch)) =
            wizard.apply_page_submitted(tag, Ok(())).unwrap()
        else {
            unreachable!()
        };
        let short = QuestionSet::new(page(2), vec![Question::new("q"); 4]);
        let err = wizard.apply_questions(fetch, Ok(short)).unwrap_err();
        assert!(matches!(err, WizardError::Fetch(FetchError::Malformed { .. })));
        assert_eq!(wizard.stage(), Stage::Page(page(2)));
        assert!(!wizard.is_loading());
        assert!(wizard.needs_questions());

        // 再次前进即重新获取
        let retry = wizard.request_forward().unwrap();
        assert!(matches!(retry, Effect::FetchQuestions(ref t) if t.page() == page(2)));
    }

    #[test]
    fn test_final_failure_discards_session() {
        let (mut wizard, store) = started();
        for _ in 1..6 {
            advance(&mut wizard);
        }
        assert_eq!(wizard.stage(), Stage::Page(page(6)));
        fill_current(&mut wizard);

        let Effect::SubmitPage(tag, _) = wizard.request_forward().unwrap() else {
            unreachable!()
        };
        let Applied::Next(Effect::SubmitFinal(final_tag, submission)) =
            wizard.apply_page_submitted(tag, Ok(())).unwrap()
        else {
            unreachable!()
        };
        assert_eq!(submission.answers.len(), 49);

        let err = wizard
            .apply_final_submitted(
                final_tag,
                Err(SubmissionError::Rejected {
                    endpoint: "/submit_survey/".to_string(),
                    status: 500,
                    detail: Some("server error".to_string()),
                }),
            )
            .unwrap_err();

        assert!(matches!(err, WizardError::Submission(_)));
        assert_eq!(wizard.notice(), Some("server error"));
        assert_eq!(wizard.stage(), Stage::Page(page(1)));
        assert_eq!(wizard.identity(), None);
        assert_eq!(wizard.state(), &SurveyState::default());
        assert!(wizard.access_token().is_none());
        assert!(store.snapshot().is_none());
        assert!(wizard.needs_questions());
    }

    #[test]
    fn test_success_marks_complete_and_is_terminal() {
        let (mut wizard, store) = started();
        for _ in 1..6 {
            advance(&mut wizard);
        }
        let Applied::Next(Effect::SubmitFinal(final_tag, _)) = advance(&mut wizard) else {
            panic!("第 6 页之后应为最终提交");
        };
        assert_eq!(
            wizard.apply_final_submitted(final_tag, Ok(())).unwrap(),
            Applied::Completed
        );

        assert_eq!(wizard.stage(), Stage::Completed);
        assert_eq!(wizard.access_token().unwrap().user_name(), "Alice");
        assert_eq!(store.snapshot().unwrap().user_name, "Alice");
        assert!(matches!(wizard.request_forward(), Err(WizardError::Completed)));
        assert!(matches!(wizard.request_back(), Err(WizardError::Completed)));
    }

    #[test]
    fn test_name_cannot_change_on_revisit() {
        let (mut wizard, _) = started();
        advance(&mut wizard);
        let back = wizard.request_back().unwrap();
        serve_fetch(&mut wizard, back);

        wizard.set_raw(0, "Bob").unwrap();
        for i in 1..6 {
            wizard.set_raw(i, "3").unwrap();
        }
        let err = wizard.request_forward().unwrap_err();
        assert!(matches!(
            err,
            WizardError::Validation(ref v) if v == &vec![Violation::NameLocked { recorded: "Alice".to_string() }]
        ));
    }
}
