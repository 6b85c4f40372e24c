//! 后端命令面：UI 只通过 `BrewBackend` 与 brew 交互

use super::parser::{parse_outdated_json, parse_search_output, parse_tap_list, parse_version_line, parse_versions_list};
use super::streaming::{self, RunningSet};
use super::types::{ApiResponse, BrewStatus, ErrorCode, OperationRequest, Package, PackageKind};
use super::{Brew, EventEmitter};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// 调用本身失败（区别于 brew 返回 `ok=false`）
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("后台任务异常退出: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析 brew 输出失败: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait BrewBackend: Send + Sync {
    async fn status(&self) -> BackendResult<ApiResponse<BrewStatus>>;

    async fn list_installed(&self) -> BackendResult<ApiResponse<Vec<Package>>>;

    async fn outdated(&self) -> BackendResult<ApiResponse<Vec<Package>>>;

    async fn tap_list(&self) -> BackendResult<ApiResponse<Vec<String>>>;

    async fn search(&self, query: &str) -> BackendResult<ApiResponse<Vec<Package>>>;

    /// 流式执行；输出通过 `brew-log` 事件推送，返回值只表示最终成败
    async fn run_stream(&self, request: &OperationRequest) -> BackendResult<ApiResponse<bool>>;

    async fn update_tray(&self, title: &str, count: usize) -> BackendResult<()>;

    /// 修改自定义 brew 路径，`None` 表示自动检测
    fn set_brew_path(&self, path: Option<String>);
}

/// 通过本机 brew 命令行实现的后端
pub struct CliBackend {
    custom_path: RwLock<Option<String>>,
    emitter: Arc<dyn EventEmitter>,
    running: RunningSet,
}

impl CliBackend {
    pub fn new(custom_path: Option<String>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            custom_path: RwLock::new(custom_path),
            emitter,
            running: RunningSet::default(),
        }
    }

    fn custom_path(&self) -> Option<String> {
        self.custom_path
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 在 blocking 线程里检测 brew 并执行 `f`
    async fn with_brew<T, F>(&self, f: F) -> BackendResult<ApiResponse<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Brew) -> BackendResult<ApiResponse<T>> + Send + 'static,
    {
        let custom = self.custom_path();
        tokio::task::spawn_blocking(move || match Brew::detect(custom.as_deref()) {
            Some(brew) => f(&brew),
            None => Ok(ApiResponse::err(
                ErrorCode::BrewNotFound,
                "未找到 brew，请先确认 Homebrew 安装路径",
            )),
        })
        .await?
    }

    /// 终止仍在运行的 brew 子进程
    pub fn shutdown(&self) {
        streaming::cleanup_child_processes(&self.running);
    }
}

#[async_trait]
impl BrewBackend for CliBackend {
    async fn status(&self) -> BackendResult<ApiResponse<BrewStatus>> {
        self.with_brew(|brew| {
            Ok(match brew.output(&["--version"]) {
                Ok(stdout) => ApiResponse::ok(
                    BrewStatus {
                        brew_path: brew.path.clone(),
                        version: parse_version_line(&stdout),
                    },
                    "brew 可用",
                ),
                Err(stderr) => ApiResponse::err(ErrorCode::VersionFailed, stderr),
            })
        })
        .await
    }

    async fn list_installed(&self) -> BackendResult<ApiResponse<Vec<Package>>> {
        self.with_brew(|brew| {
            let formulas = match brew.output(&["list", "--formula", "--versions"]) {
                Ok(v) => v,
                Err(e) => return Ok(ApiResponse::err(ErrorCode::ListFailed, e)),
            };
            let casks = match brew.output(&["list", "--cask", "--versions"]) {
                Ok(v) => v,
                Err(e) => return Ok(ApiResponse::err(ErrorCode::ListFailed, e)),
            };
            let mut out = parse_versions_list(&formulas, PackageKind::Formula);
            out.extend(parse_versions_list(&casks, PackageKind::Cask));
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(ApiResponse::ok(out, "已获取安装列表"))
        })
        .await
    }

    async fn outdated(&self) -> BackendResult<ApiResponse<Vec<Package>>> {
        self.with_brew(|brew| match brew.output(&["outdated", "--json=v2"]) {
            Ok(raw) => Ok(ApiResponse::ok(parse_outdated_json(&raw)?, "已获取可升级列表")),
            Err(e) => Ok(ApiResponse::err(ErrorCode::OutdatedFailed, e)),
        })
        .await
    }

    async fn tap_list(&self) -> BackendResult<ApiResponse<Vec<String>>> {
        self.with_brew(|brew| {
            Ok(match brew.output(&["tap"]) {
                Ok(raw) => ApiResponse::ok(parse_tap_list(&raw), "加载成功"),
                Err(e) => ApiResponse::err(ErrorCode::TapListFailed, e),
            })
        })
        .await
    }

    async fn search(&self, query: &str) -> BackendResult<ApiResponse<Vec<Package>>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Ok(ApiResponse::err(ErrorCode::EmptyQuery, "搜索词不能为空"));
        }
        self.with_brew(move |brew| {
            // 某一类没有结果时 brew 以非零退出，按空结果处理
            let formulas = brew
                .output(&["search", "--formula", query.as_str()])
                .unwrap_or_default();
            let casks = brew
                .output(&["search", "--cask", query.as_str()])
                .unwrap_or_default();
            let mut pkgs = parse_search_output(&formulas, PackageKind::Formula);
            pkgs.extend(parse_search_output(&casks, PackageKind::Cask));
            Ok(if pkgs.is_empty() {
                ApiResponse::err(ErrorCode::NoResults, "未找到匹配的包")
            } else {
                ApiResponse::ok(pkgs, "搜索完成")
            })
        })
        .await
    }

    async fn run_stream(&self, request: &OperationRequest) -> BackendResult<ApiResponse<bool>> {
        let request = request.clone();
        let emitter = Arc::clone(&self.emitter);
        let running = Arc::clone(&self.running);
        self.with_brew(move |brew| Ok(streaming::run_stream(brew, &request, emitter.as_ref(), &running)))
            .await
    }

    async fn update_tray(&self, title: &str, count: usize) -> BackendResult<()> {
        self.emitter.emit_tray(title, count);
        Ok(())
    }

    fn set_brew_path(&self, path: Option<String>) {
        let path = path.filter(|p| !p.trim().is_empty());
        log::info!("brew 路径设置为 {:?}", path);
        *self.custom_path.write().unwrap_or_else(|e| e.into_inner()) = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brew::LogEvent;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        trays: Mutex<Vec<(String, usize)>>,
    }

    impl EventEmitter for Recorder {
        fn emit_log(&self, _event: LogEvent) {}
        fn emit_tray(&self, title: &str, count: usize) {
            self.trays.lock().unwrap().push((title.to_string(), count));
        }
    }

    #[tokio::test]
    async fn empty_search_is_rejected_before_touching_brew() {
        let backend = CliBackend::new(None, Arc::new(Recorder::default()));
        let resp = backend.search("   ").await.unwrap();
        assert_eq!(resp.error_code, Some(ErrorCode::EmptyQuery));
    }

    #[tokio::test]
    async fn tray_updates_are_forwarded_to_emitter() {
        let recorder = Arc::new(Recorder::default());
        let backend = CliBackend::new(None, recorder.clone());
        backend.update_tray("Brew Manager (2)", 2).await.unwrap();
        assert_eq!(
            recorder.trays.lock().unwrap().as_slice(),
            [("Brew Manager (2)".to_string(), 2)]
        );
    }

    #[test]
    fn blank_brew_path_means_auto_detect() {
        let backend = CliBackend::new(Some("/opt/homebrew/bin/brew".into()), Arc::new(Recorder::default()));
        backend.set_brew_path(Some("  ".into()));
        assert_eq!(backend.custom_path(), None);
        backend.set_brew_path(Some("/usr/local/bin/brew".into()));
        assert_eq!(backend.custom_path().as_deref(), Some("/usr/local/bin/brew"));
    }
}
