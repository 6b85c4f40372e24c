//! 请求关联：分配 request_id，并维护 id -> 详情视图路由表
//!
//! 后端日志事件按 id 查表路由；表中没有的 id（已被新操作顶替、或详情已关闭）
//! 一律丢弃，旧操作的输出不会混进新的详情视图。

use std::collections::HashMap;
use tokio::time::Instant;

/// 生成进程内唯一的请求 id：`req-<毫秒时间戳>-<8 位随机>`
pub fn allocate_request_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("req-{}-{}", millis, &random[..8])
}

/// 已注册请求的路由信息
#[derive(Debug, Clone)]
pub struct Route {
    pub opened_at: Instant,
    /// 已路由到详情视图的输出行数
    pub lines: usize,
}

#[derive(Debug, Default)]
pub struct Correlator {
    routes: HashMap<String, Route>,
    active: Option<String>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册并激活请求；同一时间只有一个详情视图，旧路由全部作废
    pub fn activate(&mut self, request_id: &str, now: Instant) {
        self.routes.clear();
        self.routes.insert(
            request_id.to_string(),
            Route {
                opened_at: now,
                lines: 0,
            },
        );
        self.active = Some(request_id.to_string());
    }

    pub fn is_active(&self, request_id: &str) -> bool {
        self.active.as_deref() == Some(request_id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// 查表；返回 None 表示该事件应被丢弃
    pub fn route_mut(&mut self, request_id: &str) -> Option<&mut Route> {
        self.routes.get_mut(request_id)
    }

    /// 关闭详情视图时调用，之后到达的事件全部丢弃
    pub fn release(&mut self) {
        self.routes.clear();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn request_ids_are_unique_and_well_formed() {
        let ids: HashSet<String> = (0..1000).map(|_| allocate_request_id()).collect();
        assert_eq!(ids.len(), 1000);
        let sample = ids.iter().next().unwrap();
        let parts: Vec<&str> = sample.split('-').collect();
        assert_eq!(parts[0], "req");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn activating_a_new_request_drops_the_old_route() {
        let now = Instant::now();
        let mut correlator = Correlator::new();
        correlator.activate("req-a", now);
        assert!(correlator.route_mut("req-a").is_some());

        correlator.activate("req-b", now);
        assert!(correlator.route_mut("req-a").is_none());
        assert!(correlator.is_active("req-b"));
        assert!(!correlator.is_active("req-a"));
    }

    #[test]
    fn release_discards_everything() {
        let mut correlator = Correlator::new();
        correlator.activate("req-a", Instant::now());
        correlator.release();
        assert!(correlator.route_mut("req-a").is_none());
        assert_eq!(correlator.active_id(), None);
    }
}
