/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use crate::config::Config;
use crate::models::page::PAGE_COUNT;
use crate::models::PageIndex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时按 `verbose` 选择 debug 或 info。
/// 重复初始化会被忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 问卷向导启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 评分服务: {}", config.api_base_url);
    info!("⏱️ 请求超时: {} 秒", config.request_timeout_secs);
    info!("📄 完成标记文件: {}", config.marker_file);
    info!("{}", "=".repeat(60));
}

/// 记录进入某一页
///
/// # 参数
/// - `page`: 当前页
/// - `question_count`: 本页题目数
/// - `hint`: 第 6 页附带的性向代码
pub fn log_page_banner(page: PageIndex, question_count: usize, hint: Option<&str>) {
    info!("\n{}", "─".repeat(60));
    info!("{}", page_banner(page, question_count));
    if let Some(hint) = hint {
        info!("🧭 性向代码: {}", truncate_text(hint, 40));
    }
    info!("{}", "─".repeat(60));
}

fn page_banner(page: PageIndex, question_count: usize) -> String {
    format!("📄 第 {}/{} 页: {} 道题", page, PAGE_COUNT, question_count)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
