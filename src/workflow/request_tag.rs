//! 请求标签
//!
//! 每个异步请求都带上发起时的页码和身份，响应回来时据此判断是否过期

use crate::models::PageIndex;
use std::fmt::Display;

/// 请求标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    /// 单调递增的请求序号
    seq: u64,

    /// 发起请求时所在页
    page: PageIndex,

    /// 发起请求时的答题者身份
    identity: Option<String>,
}

impl RequestTag {
    pub(crate) fn new(seq: u64, page: PageIndex, identity: Option<String>) -> Self {
        Self {
            seq,
            page,
            identity,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

impl Display for RequestTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[请求#{} 第{}页 答题者#{}]",
            self.seq,
            self.page,
            self.identity.as_deref().unwrap_or("-")
        )
    }
}
