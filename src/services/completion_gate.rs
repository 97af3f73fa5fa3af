//! 完成门禁 - 业务能力层
//!
//! 最终提交成功后写入完成标记并生成访问令牌，失败时清除。
//! 结果页只通过 [`ResultsAccess`] 读取标记，从不写入。

use crate::error::GateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 持久化的完成标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub user_name: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// 完成标记的存放位置
pub trait MarkerStore {
    fn load(&self) -> Result<Option<CompletionMarker>, GateError>;
    fn save(&self, marker: &CompletionMarker) -> Result<(), GateError>;
    /// 删除标记；不存在时什么也不做
    fn remove(&self) -> Result<(), GateError>;
}

/// TOML 文件存储
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> GateError {
        GateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl MarkerStore for FileMarkerStore {
    fn load(&self) -> Result<Option<CompletionMarker>, GateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let marker = toml::from_str(&content).map_err(|source| GateError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(Some(marker))
    }

    fn save(&self, marker: &CompletionMarker) -> Result<(), GateError> {
        let content = toml::to_string(marker)?;
        std::fs::write(&self.path, content).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), GateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// 内存存储，克隆后共享同一份标记
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkerStore {
    marker: Arc<Mutex<Option<CompletionMarker>>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(marker: CompletionMarker) -> Self {
        Self {
            marker: Arc::new(Mutex::new(Some(marker))),
        }
    }

    pub fn snapshot(&self) -> Option<CompletionMarker> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CompletionMarker>> {
        self.marker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn load(&self) -> Result<Option<CompletionMarker>, GateError> {
        Ok(self.snapshot())
    }

    fn save(&self, marker: &CompletionMarker) -> Result<(), GateError> {
        *self.slot() = Some(marker.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), GateError> {
        *self.slot() = None;
        Ok(())
    }
}

/// 结果访问令牌：最终提交成功时创建，失败或重新开始时销毁
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    marker: CompletionMarker,
}

impl AccessToken {
    pub fn user_name(&self) -> &str {
        &self.marker.user_name
    }

    pub fn marker(&self) -> &CompletionMarker {
        &self.marker
    }
}

/// 完成门禁
#[derive(Debug)]
pub struct CompletionGate<S> {
    store: S,
    token: Option<AccessToken>,
}

impl<S: MarkerStore> CompletionGate<S> {
    pub fn new(store: S) -> Self {
        Self { store, token: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// 写入 `{identity, completed: true}` 并生成访问令牌
    pub fn mark_complete(&mut self, identity: &str) -> Result<&AccessToken, GateError> {
        let marker = CompletionMarker {
            user_name: identity.to_string(),
            completed: true,
            completed_at: Some(Utc::now()),
        };
        self.store.save(&marker)?;
        info!("🔓 已写入完成标记: {}", identity);
        Ok(&*self.token.insert(AccessToken { marker }))
    }

    /// 清除持久化的身份和完成状态，可重复调用
    pub fn clear(&mut self) -> Result<(), GateError> {
        self.token = None;
        self.store.remove()?;
        debug!("完成标记已清除");
        Ok(())
    }
}

/// 结果页的访问检查（只读）
pub struct ResultsAccess;

impl ResultsAccess {
    /// 标记存在、身份非空且已完成时放行
    pub fn authorize<S: MarkerStore>(store: &S) -> Result<Option<CompletionMarker>, GateError> {
        Ok(store
            .load()?
            .filter(|m| m.completed && !m.user_name.trim().is_empty()))
    }
}
