//! 测试用内存后端

use super::EventSender;
use crate::brew::{
    ApiResponse, BackendError, BackendResult, BrewBackend, BrewStatus, ErrorCode, EventEmitter,
    LogEvent, LogStream, OperationRequest, Package,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakeBackend {
    pub events: Option<EventSender>,
    pub installed: Vec<Package>,
    pub outdated: Vec<Package>,
    pub taps: Vec<String>,
    pub search_results: Vec<Package>,
    pub search_delay: Duration,
    /// run_stream 返回 ok=false 的包名
    pub failing: HashSet<String>,
    /// run_stream 直接返回调用错误的包名
    pub broken: HashSet<String>,
    /// run_stream 不发送任何事件就返回 ok=false 的包名（参数校验失败）
    pub rejected: HashSet<String>,
    pub fail_list: bool,
    pub fail_outdated: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrewBackend for FakeBackend {
    async fn status(&self) -> BackendResult<ApiResponse<BrewStatus>> {
        self.record("status".to_string());
        Ok(ApiResponse::ok(
            BrewStatus {
                brew_path: "/opt/homebrew/bin/brew".to_string(),
                version: "Homebrew 4.4.0".to_string(),
            },
            "brew 可用",
        ))
    }

    async fn list_installed(&self) -> BackendResult<ApiResponse<Vec<Package>>> {
        self.record("list_installed".to_string());
        if self.fail_list {
            return Ok(ApiResponse::err(ErrorCode::ListFailed, "list 失败"));
        }
        Ok(ApiResponse::ok(self.installed.clone(), "已获取安装列表"))
    }

    async fn outdated(&self) -> BackendResult<ApiResponse<Vec<Package>>> {
        self.record("outdated".to_string());
        if self.fail_outdated {
            return Err(BackendError::Io(std::io::Error::other("outdated 超时")));
        }
        Ok(ApiResponse::ok(self.outdated.clone(), "已获取可升级列表"))
    }

    async fn tap_list(&self) -> BackendResult<ApiResponse<Vec<String>>> {
        self.record("tap_list".to_string());
        Ok(ApiResponse::ok(self.taps.clone(), "加载成功"))
    }

    async fn search(&self, query: &str) -> BackendResult<ApiResponse<Vec<Package>>> {
        self.record(format!("search:{query}"));
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        if self.search_results.is_empty() {
            return Ok(ApiResponse::err(ErrorCode::NoResults, "未找到匹配的包"));
        }
        Ok(ApiResponse::ok(self.search_results.clone(), "搜索完成"))
    }

    async fn run_stream(&self, request: &OperationRequest) -> BackendResult<ApiResponse<bool>> {
        let name = request.name.clone().unwrap_or_default();
        self.record(format!("run_stream:{}:{}", request.action, name));
        if self.broken.contains(&name) {
            return Err(BackendError::Io(std::io::Error::other("连接断开")));
        }
        if self.rejected.contains(&name) {
            return Ok(ApiResponse::err(ErrorCode::InvalidName, "包名不合法"));
        }
        let ok = !self.failing.contains(&name);
        if let Some(events) = &self.events {
            let id = request.request_id.as_str();
            events.emit_log(LogEvent::start(id));
            events.emit_log(LogEvent::line(id, LogStream::Stdout, format!("==> {} {}", request.action, name)));
            if !ok {
                events.emit_log(LogEvent::line(id, LogStream::Stderr, "Error: failed"));
            }
            events.emit_log(LogEvent::end(id, ok));
        }
        Ok(if ok {
            ApiResponse::ok(true, "命令执行完成")
        } else {
            ApiResponse::err(ErrorCode::CommandFailed, "命令执行失败，请查看输出")
        })
    }

    async fn update_tray(&self, title: &str, count: usize) -> BackendResult<()> {
        self.record(format!("update_tray:{title}:{count}"));
        if let Some(events) = &self.events {
            events.emit_tray(title, count);
        }
        Ok(())
    }

    fn set_brew_path(&self, path: Option<String>) {
        self.record(format!("set_brew_path:{}", path.unwrap_or_default()));
    }
}
