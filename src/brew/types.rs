//! brew 后端相关数据类型定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 包类型：命令行工具 (formula) 或图形应用 (cask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Formula,
    Cask,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Formula => "formula",
            PackageKind::Cask => "cask",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            PackageKind::Formula => PackageKind::Cask,
            PackageKind::Cask => PackageKind::Formula,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 包快照。后端每次查询返回新的列表，前端整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    pub kind: PackageKind,
}

impl Package {
    pub fn new(name: impl Into<String>, version: Option<String>, kind: PackageKind) -> Self {
        Self {
            name: name.into(),
            version,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrewStatus {
    pub brew_path: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BrewNotFound,
    VersionFailed,
    InvalidName,
    InvalidKind,
    InvalidAction,
    SpawnFailed,
    WaitFailed,
    CommandFailed,
    ListFailed,
    OutdatedFailed,
    TapListFailed,
    EmptyQuery,
    NoResults,
}

/// 后端统一响应：`ok=false` 时 `message` 为后端给出的失败原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error_code: Option<ErrorCode>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error_code: None,
            message: message.into(),
        }
    }

    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error_code: Some(code),
            message: message.into(),
        }
    }

    /// 成功且带数据时取出数据，否则返回失败消息
    pub fn into_result(self) -> Result<T, String> {
        match (self.ok, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message),
        }
    }
}

/// 流式执行支持的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Install,
    Uninstall,
    Upgrade,
    UpgradeAll,
    Tap,
    Untap,
    Info,
    Doctor,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Uninstall => "uninstall",
            Action::Upgrade => "upgrade",
            Action::UpgradeAll => "upgrade_all",
            Action::Tap => "tap",
            Action::Untap => "untap",
            Action::Info => "info",
            Action::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次用户操作对应的后端请求，仅在一次调用期间存在
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub request_id: String,
    pub action: Action,
    pub name: Option<String>,
    pub kind: Option<PackageKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStage {
    Start,
    Line,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// `brew-log` 事件：按 request_id 关联到具体请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub request_id: String,
    pub stage: LogStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<LogStream>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl LogEvent {
    pub fn start(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            stage: LogStage::Start,
            stream: None,
            line: None,
            success: None,
        }
    }

    pub fn line(request_id: &str, stream: LogStream, line: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            stage: LogStage::Line,
            stream: Some(stream),
            line: Some(line.into()),
            success: None,
        }
    }

    pub fn end(request_id: &str, success: bool) -> Self {
        Self {
            request_id: request_id.to_string(),
            stage: LogStage::End,
            stream: None,
            line: None,
            success: Some(success),
        }
    }
}
