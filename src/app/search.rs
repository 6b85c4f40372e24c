//! 远程搜索：防抖 + 可取消任务 + 序号校验

use super::{AppEvent, EventSender, QueryResult};
use crate::brew::{BrewBackend, Package};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub open: bool,
    pub query: String,
    pub results: Vec<Package>,
    pub loading: bool,
    pub error: Option<String>,
    /// 每次输入变化递增，结果只在序号一致时生效
    pub seq: u64,
    pub selected: usize,
}

impl SearchState {
    /// 输入变化：清空旧结果；非空时返回需要调度的 (序号, 搜索词)
    pub fn on_query_change(&mut self) -> Option<(u64, String)> {
        self.seq += 1;
        self.results.clear();
        self.error = None;
        self.selected = 0;
        self.loading = false;
        let query = self.query.trim();
        if query.is_empty() {
            return None;
        }
        Some((self.seq, query.to_string()))
    }

    pub fn begin(&mut self, seq: u64) {
        if seq == self.seq {
            self.loading = true;
            self.error = None;
        }
    }

    /// 应用搜索结果；过期结果直接丢弃，返回是否生效
    pub fn finish(&mut self, seq: u64, result: QueryResult<Vec<Package>>) -> bool {
        if seq != self.seq {
            log::debug!("丢弃过期搜索结果 seq={} (当前 {})", seq, self.seq);
            return false;
        }
        self.loading = false;
        self.selected = 0;
        match result {
            Ok(resp) => match resp.into_result() {
                Ok(list) => {
                    self.results = list;
                    self.error = None;
                }
                Err(message) => {
                    self.results.clear();
                    self.error = Some(message);
                }
            },
            Err(e) => {
                self.results.clear();
                self.error = Some(format!("搜索失败: {e}"));
            }
        }
        true
    }

    pub fn selected_package(&self) -> Option<&Package> {
        self.results.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }
}

/// 防抖调度器：新的搜索会中止之前尚未开始或仍在进行的搜索
pub struct SearchDebouncer {
    handle: Option<JoinHandle<()>>,
    delay: Duration,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            handle: None,
            delay,
        }
    }

    pub fn schedule(
        &mut self,
        seq: u64,
        query: String,
        backend: Arc<dyn BrewBackend>,
        events: EventSender,
    ) {
        self.cancel();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::SearchStarted { seq });
            log::debug!("搜索 {:?} (seq={})", query, seq);
            let result = backend.search(&query).await.map_err(|e| e.to_string());
            let _ = events.send(AppEvent::SearchFinished { seq, result });
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::FakeBackend;
    use crate::brew::{ApiResponse, ErrorCode, PackageKind};
    use tokio::sync::mpsc;

    const DEBOUNCE: Duration = Duration::from_millis(600);

    fn wget() -> Package {
        Package::new("wget", None, PackageKind::Formula)
    }

    #[test]
    fn blank_query_schedules_nothing() {
        let mut state = SearchState {
            query: "   ".to_string(),
            results: vec![wget()],
            error: Some("旧错误".to_string()),
            ..SearchState::default()
        };
        assert_eq!(state.on_query_change(), None);
        assert!(state.results.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut state = SearchState {
            query: "wg".to_string(),
            ..SearchState::default()
        };
        let (old_seq, _) = state.on_query_change().unwrap();
        state.query = "wget".to_string();
        let (new_seq, _) = state.on_query_change().unwrap();

        assert!(state.finish(new_seq, Ok(ApiResponse::ok(vec![wget()], "搜索完成"))));
        assert!(!state.finish(old_seq, Ok(ApiResponse::ok(vec![], "搜索完成"))));
        assert_eq!(state.results, vec![wget()]);
    }

    #[test]
    fn backend_failure_and_transport_error_are_reported() {
        let mut state = SearchState {
            query: "zzz".to_string(),
            ..SearchState::default()
        };
        let (seq, _) = state.on_query_change().unwrap();
        state.finish(seq, Ok(ApiResponse::err(ErrorCode::NoResults, "未找到匹配的包")));
        assert_eq!(state.error.as_deref(), Some("未找到匹配的包"));

        let (seq, _) = state.on_query_change().unwrap();
        state.finish(seq, Err("连接断开".to_string()));
        assert_eq!(state.error.as_deref(), Some("搜索失败: 连接断开"));
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_within_debounce_window_searches_once_with_final_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FakeBackend {
            search_results: vec![wget()],
            ..FakeBackend::default()
        });
        let mut debouncer = SearchDebouncer::new(DEBOUNCE);

        debouncer.schedule(1, "wg".to_string(), backend.clone(), tx.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.schedule(2, "wget".to_string(), backend.clone(), tx.clone());
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(backend.calls(), ["search:wget"]);
        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::SearchFinished { seq, .. } = event {
                finished.push(seq);
            }
        }
        assert_eq!(finished, [2]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_query_aborts_in_flight_search() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FakeBackend {
            search_results: vec![wget()],
            search_delay: Duration::from_secs(5),
            ..FakeBackend::default()
        });
        let mut debouncer = SearchDebouncer::new(DEBOUNCE);

        debouncer.schedule(1, "wget".to_string(), backend.clone(), tx.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        debouncer.schedule(2, "curl".to_string(), backend.clone(), tx.clone());
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(backend.calls(), ["search:wget", "search:curl"]);
        let finished: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                AppEvent::SearchFinished { seq, .. } => Some(seq),
                _ => None,
            })
            .collect();
        assert_eq!(finished, [2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_search() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FakeBackend::default());
        let mut debouncer = SearchDebouncer::new(DEBOUNCE);
        debouncer.schedule(1, "wget".to_string(), backend.clone(), tx);
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(backend.calls().is_empty());
    }
}
