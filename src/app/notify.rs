//! 提示：界面内 toast + 系统通知

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// 系统通知
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// 调用 notify-send / osascript 发送桌面通知，失败静默忽略
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        if !self.enabled {
            return;
        }
        let result = if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(body),
                escape_applescript(title)
            );
            duct::cmd("osascript", ["-e", script.as_str()])
                .stdout_null()
                .stderr_null()
                .unchecked()
                .run()
        } else {
            duct::cmd("notify-send", [title, body])
                .stdout_null()
                .stderr_null()
                .unchecked()
                .run()
        };
        if let Err(e) = result {
            log::debug!("发送系统通知失败: {}", e);
        }
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_expires_after_ttl() {
        let now = Instant::now();
        let toast = Toast::new("安装 wget 成功", now, Duration::from_secs(3));
        assert!(!toast.is_expired(now + Duration::from_millis(2999)));
        assert!(toast.is_expired(now + Duration::from_secs(3)));
    }

    #[test]
    fn applescript_quotes_are_escaped() {
        assert_eq!(escape_applescript(r#"say "hi" \ bye"#), r#"say \"hi\" \\ bye"#);
    }

    #[test]
    fn disabled_notifier_does_nothing() {
        DesktopNotifier::new(false).notify("title", "body");
    }
}
