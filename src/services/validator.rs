//! 校验器 - 业务能力层
//!
//! 纯函数：根据 `PAGE_RULES` 检查一页答案，返回全部违规项。
//! 不发网络请求，不修改任何状态。

use crate::models::page::{SCORE_MAX, SCORE_MIN};
use crate::models::{AnswerValue, PageKind, SlotConstraint, YesNo};
use std::fmt;

/// 校验违规项，`slot` 为 0 起始的槽位下标，展示时按 1 起始
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NameMissing,
    AnswerMissing { slot: usize },
    ScoreNotNumeric { slot: usize },
    ScoreOutOfRange { slot: usize, value: i64 },
    NotYesNo { slot: usize },
    SlotCountMismatch { expected: usize, actual: usize },
    /// 姓名在第 1 页提交后不可更改
    NameLocked { recorded: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NameMissing => write!(f, "please enter your name"),
            Violation::AnswerMissing { slot } => write!(f, "question {}: answer missing", slot + 1),
            Violation::ScoreNotNumeric { slot } => write!(
                f,
                "question {}: score must be a whole number between {} and {}",
                slot + 1,
                SCORE_MIN,
                SCORE_MAX
            ),
            Violation::ScoreOutOfRange { slot, value } => write!(
                f,
                "question {}: score {} is outside {}-{}",
                slot + 1,
                value,
                SCORE_MIN,
                SCORE_MAX
            ),
            Violation::NotYesNo { slot } => {
                write!(f, "question {}: answer must be yes or no", slot + 1)
            }
            Violation::SlotCountMismatch { expected, actual } => {
                write!(f, "expected {} answers, got {}", expected, actual)
            }
            Violation::NameLocked { recorded } => {
                write!(f, "name was already submitted as \"{}\" and cannot be changed", recorded)
            }
        }
    }
}

/// 校验一页答案
pub fn validate(kind: PageKind, buffer: &[Option<AnswerValue>]) -> Vec<Violation> {
    let rule = kind.rule();
    let mut violations = Vec::new();

    if buffer.len() != rule.slot_count {
        violations.push(Violation::SlotCountMismatch {
            expected: rule.slot_count,
            actual: buffer.len(),
        });
    }

    for slot in 0..rule.slot_count {
        let value = buffer.get(slot).and_then(|v| v.as_ref());
        if let Some(violation) = check_slot(rule.constraint_for(slot), slot, value) {
            violations.push(violation);
        }
    }

    violations
}

fn check_slot(
    constraint: SlotConstraint,
    slot: usize,
    value: Option<&AnswerValue>,
) -> Option<Violation> {
    let value = match value {
        Some(AnswerValue::Text(s)) if s.trim().is_empty() => None,
        other => other,
    };

    match (constraint, value) {
        (SlotConstraint::FreeText, None) => Some(Violation::NameMissing),
        (SlotConstraint::FreeText, Some(_)) => None,
        (_, None) => Some(Violation::AnswerMissing { slot }),
        (SlotConstraint::Score, Some(v)) => match score_of(v) {
            None => Some(Violation::ScoreNotNumeric { slot }),
            Some(n) if !(SCORE_MIN..=SCORE_MAX).contains(&n) => {
                Some(Violation::ScoreOutOfRange { slot, value: n })
            }
            Some(_) => None,
        },
        (SlotConstraint::YesNo, Some(AnswerValue::Text(s))) if YesNo::parse(s).is_some() => None,
        (SlotConstraint::YesNo, Some(_)) => Some(Violation::NotYesNo { slot }),
    }
}

/// 分数槽位的整数值；文本形式的整数也接受
pub(crate) fn score_of(value: &AnswerValue) -> Option<i64> {
    match value {
        AnswerValue::Integer(n) => Some(*n),
        AnswerValue::Text(s) => s.trim().parse().ok(),
    }
}
