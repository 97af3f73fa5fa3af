//! 题目提供方接口
//!
//! 由 HTTP 客户端实现；测试中使用内存实现。

use crate::error::FetchError;
use crate::models::{PageIndex, PageKind, QuestionSet};

/// 按页获取有序题目
#[allow(async_fn_in_trait)]
pub trait QuestionProvider {
    /// 幂等，除返回题目外没有副作用；第 6 页必须提供非空身份
    async fn fetch(&self, page: PageIndex, identity: Option<&str>) -> Result<QuestionSet, FetchError>;
}

/// 检查该页对身份的要求，返回实际要携带的身份
pub fn required_identity(page: PageIndex, identity: Option<&str>) -> Result<Option<&str>, FetchError> {
    let identity = identity.map(str::trim).filter(|s| !s.is_empty());
    match (page.kind(), identity) {
        (PageKind::FinalBlock, None) => Err(FetchError::MissingIdentity { page }),
        (_, identity) => Ok(identity),
    }
}

/// 题目数量必须与页面规则一致
pub fn check_shape(page: PageIndex, set: &QuestionSet) -> Result<(), FetchError> {
    if set.page != page {
        return Err(FetchError::Malformed {
            page,
            reason: format!("返回的是第 {} 页的题目", set.page),
        });
    }
    let expected = page.kind().slot_count();
    if set.len() != expected {
        return Err(FetchError::Malformed {
            page,
            reason: format!("应有 {} 道题，实际 {} 道", expected, set.len()),
        });
    }
    Ok(())
}
