//! `brew-log` 事件落地到详情视图

use super::correlator::Correlator;
use super::detail::DetailView;
use crate::brew::{LogEvent, LogStage, LogStream};
use tokio::time::Instant;

pub const STDERR_PREFIX: &str = "[err] ";
pub const EMPTY_OUTPUT_PLACEHOLDER: &str = "命令执行结束，但没有输出";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    /// 请求未被路由到当前详情视图
    Discarded,
    Applied,
    Finished { success: bool },
}

/// 应用一条日志事件；只有激活中的请求才能写入详情缓冲区
pub fn apply(
    correlator: &mut Correlator,
    detail: &mut DetailView,
    event: &LogEvent,
    now: Instant,
) -> SinkOutcome {
    if !correlator.is_active(&event.request_id) {
        return SinkOutcome::Discarded;
    }
    let Some(route) = correlator.route_mut(&event.request_id) else {
        return SinkOutcome::Discarded;
    };

    match event.stage {
        LogStage::Start => {
            detail.start_loading(now);
            detail.open = true;
            SinkOutcome::Applied
        }
        LogStage::Line => {
            let Some(line) = event.line.as_deref() else {
                return SinkOutcome::Applied;
            };
            route.lines += 1;
            let prefix = match event.stream {
                Some(LogStream::Stderr) => STDERR_PREFIX,
                _ => "",
            };
            detail.append(&format!("{prefix}{line}\n"));
            SinkOutcome::Applied
        }
        LogStage::End => {
            let success = event.success.unwrap_or(false);
            detail.stop_loading(now);
            if !success && detail.is_blank() {
                detail.replace(EMPTY_OUTPUT_PLACEHOLDER);
            }
            log::debug!(
                "[{}] 输出结束，共 {} 行，耗时 {:?}",
                event.request_id,
                route.lines,
                now.saturating_duration_since(route.opened_at)
            );
            SinkOutcome::Finished { success }
        }
    }
}
