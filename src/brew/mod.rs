//! brew 模块 — 对 Homebrew 命令行的封装

pub mod backend;
pub mod parser;
pub mod streaming;
pub mod types;

pub use backend::{BackendError, BackendResult, BrewBackend, CliBackend};
pub use types::{
    Action, ApiResponse, BrewStatus, ErrorCode, LogEvent, LogStage, LogStream, OperationRequest,
    Package, PackageKind,
};

/// 未配置自定义路径时依次尝试的 brew 位置
const CANDIDATES: [&str; 5] = [
    "/home/linuxbrew/.linuxbrew/bin/brew",
    "/linuxbrew/.linuxbrew/bin/brew",
    "/usr/local/bin/brew",
    "/opt/homebrew/bin/brew",
    "brew",
];

/// 后端向 UI 推送的带外事件（`brew-log` 日志流、托盘标题）
pub trait EventEmitter: Send + Sync {
    fn emit_log(&self, event: LogEvent);
    fn emit_tray(&self, title: &str, count: usize);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brew {
    pub path: String,
}

impl Brew {
    /// 按优先级检测可用的 brew：自定义路径 -> 常见安装位置 -> PATH
    pub fn detect(custom_path: Option<&str>) -> Option<Self> {
        let custom = custom_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .into_iter();
        for candidate in custom.chain(CANDIDATES) {
            if probe(candidate) {
                log::debug!("检测到 brew: {}", candidate);
                return Some(Brew {
                    path: candidate.to_string(),
                });
            }
        }
        log::warn!("未找到可用的 brew (custom={:?})", custom_path);
        None
    }

    /// 执行 brew 并捕获输出；失败时返回 stderr 文本
    pub fn output(&self, args: &[&str]) -> Result<String, String> {
        log::debug!("brew {}", args.join(" "));
        let out = duct::cmd(self.path.as_str(), args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| format!("执行 brew 失败: {e}"))?;

        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            log::warn!("brew {} 失败: {}", args.join(" "), stderr);
            Err(stderr)
        }
    }
}

fn probe(path: &str) -> bool {
    duct::cmd(path, ["--version"])
        .stdout_null()
        .stderr_null()
        .unchecked()
        .run()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
