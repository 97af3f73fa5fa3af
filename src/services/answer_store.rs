//! 答案存储 - 业务能力层
//!
//! 持有当前页的答案缓冲区，以及已提交页面累积下来的问卷状态。
//! 规范答案向量的顺序在整个生命周期内固定：
//! `[姓名] ++ 5 个分数 ++ 40 个是/否 ++ 3 个最终题`

use crate::error::IncompleteAnswers;
use crate::models::page::{FINAL_COUNT, SUBJECT_COUNT, YES_NO_COUNT};
use crate::models::{AnswerBuffer, AnswerValue, PageIndex, PageKind, SlotConstraint, YesNo};
use crate::services::validator::{self, score_of, Violation};

/// 累积的问卷状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyState {
    name: Option<String>,
    subject_scores: [Option<u8>; SUBJECT_COUNT],
    yes_no_answers: [Option<YesNo>; YES_NO_COUNT],
    final_answers: [Option<YesNo>; FINAL_COUNT],
}

impl Default for SurveyState {
    fn default() -> Self {
        Self {
            name: None,
            subject_scores: [None; SUBJECT_COUNT],
            yes_no_answers: [None; YES_NO_COUNT],
            final_answers: [None; FINAL_COUNT],
        }
    }
}

impl SurveyState {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn subject_scores(&self) -> &[Option<u8>; SUBJECT_COUNT] {
        &self.subject_scores
    }

    pub fn yes_no_answers(&self) -> &[Option<YesNo>; YES_NO_COUNT] {
        &self.yes_no_answers
    }

    pub fn final_answers(&self) -> &[Option<YesNo>; FINAL_COUNT] {
        &self.final_answers
    }
}

/// 最终提交用的规范答案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAnswers {
    pub user_name: String,
    /// 长度恒为 49
    pub answers: Vec<AnswerValue>,
    pub dse_scores: [u8; SUBJECT_COUNT],
}

/// 校验通过后解析出的一页答案
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedPage {
    Personal { name: String, scores: [u8; SUBJECT_COUNT] },
    Block(Vec<YesNo>),
}

impl ParsedPage {
    fn to_answers(&self) -> Vec<AnswerValue> {
        match self {
            ParsedPage::Personal { name, scores } => std::iter::once(AnswerValue::Text(name.clone()))
                .chain(scores.iter().map(|s| AnswerValue::Integer(i64::from(*s))))
                .collect(),
            ParsedPage::Block(values) => values.iter().map(|v| AnswerValue::from(*v)).collect(),
        }
    }
}

/// 答案存储
#[derive(Debug, Clone)]
pub struct AnswerStore {
    kind: PageKind,
    buffer: AnswerBuffer,
    state: SurveyState,
}

impl Default for AnswerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerStore {
    /// 创建空存储，缓冲区按第 1 页大小初始化
    pub fn new() -> Self {
        let kind = PageKind::PersonalInfo;
        Self {
            kind,
            buffer: vec![None; kind.slot_count()],
            state: SurveyState::default(),
        }
    }

    pub fn state(&self) -> &SurveyState {
        &self.state
    }

    /// 当前页缓冲区（只读）
    pub fn current_buffer(&self) -> &[Option<AnswerValue>] {
        &self.buffer
    }

    /// 换页时重置缓冲区为 `size` 个空槽位，已累积的答案不受影响
    pub fn reset_for(&mut self, kind: PageKind, size: usize) {
        self.kind = kind;
        self.buffer = vec![None; size];
    }

    /// 覆盖一个槽位，返回 false 表示下标越界
    pub fn set_slot(&mut self, index: usize, value: Option<AnswerValue>) -> bool {
        match self.buffer.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// 按本页约束把原始输入转换成槽位值后写入
    ///
    /// 分数槽位能解析为整数时存为整数；是/否统一为小写；空输入清空槽位。
    pub fn set_raw(&mut self, index: usize, raw: &str) -> bool {
        let value = coerce(self.kind.rule().constraint_for(index), raw);
        self.set_slot(index, value)
    }

    /// 本页要提交给服务端的答案（仅本页，不是汇总）
    pub fn page_answers(&self) -> Result<Vec<AnswerValue>, Vec<Violation>> {
        self.parse().map(|parsed| parsed.to_answers())
    }

    /// 把当前缓冲区写入 `page` 对应的规范区段
    ///
    /// 重新提交已填写过的页面会整段覆盖，向量长度和顺序不变。
    pub fn commit(&mut self, page: PageIndex) -> Result<(), Vec<Violation>> {
        if page.kind() != self.kind {
            return Err(vec![Violation::SlotCountMismatch {
                expected: page.kind().slot_count(),
                actual: self.buffer.len(),
            }]);
        }

        match self.parse()? {
            ParsedPage::Personal { name, scores } => {
                self.state.name.get_or_insert(name);
                for (slot, score) in self.state.subject_scores.iter_mut().zip(scores) {
                    *slot = Some(score);
                }
            }
            ParsedPage::Block(values) => {
                let target: &mut [Option<YesNo>] = match page.yes_no_offset() {
                    Some(offset) => &mut self.state.yes_no_answers[offset..offset + values.len()],
                    None => &mut self.state.final_answers,
                };
                for (slot, value) in target.iter_mut().zip(values) {
                    *slot = Some(value);
                }
            }
        }
        Ok(())
    }

    /// 汇总成长度 49 的规范答案向量；任一项缺失则报错，不会返回部分结果
    pub fn aggregate(&self) -> Result<CanonicalAnswers, IncompleteAnswers> {
        let mut missing = Vec::new();
        let mut answers = Vec::with_capacity(crate::models::CANONICAL_LEN);

        let mut push = |index: usize, value: Option<AnswerValue>, answers: &mut Vec<AnswerValue>| {
            match value {
                Some(v) => answers.push(v),
                None => missing.push(index),
            }
        };

        push(0, self.state.name.clone().map(AnswerValue::Text), &mut answers);
        for (i, score) in self.state.subject_scores.iter().enumerate() {
            push(1 + i, score.map(|s| AnswerValue::Integer(i64::from(s))), &mut answers);
        }
        let yes_no = self.state.yes_no_answers.iter().chain(&self.state.final_answers);
        for (i, value) in yes_no.enumerate() {
            push(1 + SUBJECT_COUNT + i, value.map(AnswerValue::from), &mut answers);
        }

        if !missing.is_empty() {
            return Err(IncompleteAnswers { missing });
        }

        let mut dse_scores = [0u8; SUBJECT_COUNT];
        for (dst, src) in dse_scores.iter_mut().zip(&self.state.subject_scores) {
            *dst = src.unwrap_or_default();
        }

        Ok(CanonicalAnswers {
            user_name: self.state.name.clone().unwrap_or_default(),
            answers,
            dse_scores,
        })
    }

    fn parse(&self) -> Result<ParsedPage, Vec<Violation>> {
        let mut violations = validator::validate(self.kind, &self.buffer);

        if self.kind == PageKind::PersonalInfo {
            if let (Some(recorded), Some(entered)) = (self.state.name(), self.entered_name()) {
                if recorded != entered {
                    violations.push(Violation::NameLocked {
                        recorded: recorded.to_string(),
                    });
                }
            }
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        // 校验已通过，以下解析不会失败
        let parsed = match self.kind {
            PageKind::PersonalInfo => {
                let mut scores = [0u8; SUBJECT_COUNT];
                for (dst, value) in scores.iter_mut().zip(self.buffer.iter().skip(1).flatten()) {
                    *dst = score_of(value).and_then(|n| u8::try_from(n).ok()).unwrap_or_default();
                }
                ParsedPage::Personal {
                    name: self.entered_name().unwrap_or_default().to_string(),
                    scores,
                }
            }
            PageKind::YesNoBlock | PageKind::FinalBlock => ParsedPage::Block(
                self.buffer
                    .iter()
                    .flatten()
                    .filter_map(|v| v.as_text().and_then(YesNo::parse))
                    .collect(),
            ),
        };
        Ok(parsed)
    }

    fn entered_name(&self) -> Option<&str> {
        self.buffer
            .first()
            .and_then(|v| v.as_ref())
            .and_then(AnswerValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn coerce(constraint: SlotConstraint, raw: &str) -> Option<AnswerValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = match constraint {
        SlotConstraint::FreeText => AnswerValue::Text(raw.to_string()),
        SlotConstraint::Score => match trimmed.parse::<i64>() {
            Ok(n) => AnswerValue::Integer(n),
            Err(_) => AnswerValue::Text(trimmed.to_string()),
        },
        SlotConstraint::YesNo => match YesNo::parse(trimmed) {
            Some(v) => v.into(),
            None => AnswerValue::Text(trimmed.to_string()),
        },
    };
    Some(value)
}
