//! 页面模型
//!
//! 六个页面按类型（PageKind）区分，每种类型在 `PAGE_RULES` 中登记
//! 槽位数量和每个槽位的取值约束。新增页面类型只需要新增一条规则。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 问卷总页数
pub const PAGE_COUNT: u8 = 6;

/// DSE 科目数量（第 1 页的分数槽位数）
pub const SUBJECT_COUNT: usize = 5;

/// 是/否题目总数（第 2-5 页，每页 10 题）
pub const YES_NO_COUNT: usize = 40;

/// 最终页题目数量
pub const FINAL_COUNT: usize = 3;

/// 规范答案向量长度：姓名 + 5 个分数 + 40 个是/否 + 3 个最终题
pub const CANONICAL_LEN: usize = 1 + SUBJECT_COUNT + YES_NO_COUNT + FINAL_COUNT;

/// DSE 分数取值范围
pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 7;

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    /// 基本资料：姓名 + DSE 预测分数
    PersonalInfo,
    /// 是/否题块
    YesNoBlock,
    /// 最终题块（依赖前面答案生成，需要身份）
    FinalBlock,
}

/// 单个槽位的取值约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotConstraint {
    /// 非空自由文本（去除首尾空白后）
    FreeText,
    /// [SCORE_MIN, SCORE_MAX] 之间的整数
    Score,
    /// "yes" 或 "no"
    YesNo,
}

/// 页面规则：槽位数量 + 逐槽约束
#[derive(Debug, Clone, Copy)]
pub struct PageRule {
    pub kind: PageKind,
    pub slot_count: usize,
    /// 前若干个槽位的专门约束
    pub leading: &'static [SlotConstraint],
    /// 其余槽位共用的约束
    pub rest: SlotConstraint,
}

impl PageRule {
    pub fn constraint_for(&self, slot: usize) -> SlotConstraint {
        self.leading.get(slot).copied().unwrap_or(self.rest)
    }
}

pub const PAGE_RULES: [PageRule; 3] = [
    PageRule {
        kind: PageKind::PersonalInfo,
        slot_count: 1 + SUBJECT_COUNT,
        leading: &[SlotConstraint::FreeText],
        rest: SlotConstraint::Score,
    },
    PageRule {
        kind: PageKind::YesNoBlock,
        slot_count: 10,
        leading: &[],
        rest: SlotConstraint::YesNo,
    },
    PageRule {
        kind: PageKind::FinalBlock,
        slot_count: FINAL_COUNT,
        leading: &[],
        rest: SlotConstraint::YesNo,
    },
];

impl PageKind {
    pub fn rule(self) -> &'static PageRule {
        match self {
            PageKind::PersonalInfo => &PAGE_RULES[0],
            PageKind::YesNoBlock => &PAGE_RULES[1],
            PageKind::FinalBlock => &PAGE_RULES[2],
        }
    }

    pub fn slot_count(self) -> usize {
        self.rule().slot_count
    }
}

/// 页码（1..=6）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PageIndex(u8);

impl PageIndex {
    pub const FIRST: PageIndex = PageIndex(1);
    pub const LAST: PageIndex = PageIndex(PAGE_COUNT);

    pub fn new(number: u8) -> Option<Self> {
        (1..=PAGE_COUNT).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> PageKind {
        match self.0 {
            1 => PageKind::PersonalInfo,
            n if n < PAGE_COUNT => PageKind::YesNoBlock,
            _ => PageKind::FinalBlock,
        }
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    pub fn prev(self) -> Option<Self> {
        Self::new(self.0.wrapping_sub(1))
    }

    /// 是/否题块在 40 个是/否答案中的起始偏移
    pub fn yes_no_offset(self) -> Option<usize> {
        match self.kind() {
            PageKind::YesNoBlock => Some((self.0 as usize - 2) * PageKind::YesNoBlock.slot_count()),
            _ => None,
        }
    }

    pub fn all() -> impl Iterator<Item = PageIndex> {
        (1..=PAGE_COUNT).map(PageIndex)
    }
}

impl TryFrom<u8> for PageIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("页码 {} 超出范围 [1, {}]", value, PAGE_COUNT))
    }
}

impl From<PageIndex> for u8 {
    fn from(page: PageIndex) -> Self {
        page.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
