//! 详情弹窗：实时显示一次 brew 命令的输出

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DetailView {
    pub open: bool,
    pub title: String,
    pub text: String,
    pub scroll: usize,
    /// 跟随输出自动滚动到底部
    pub follow: bool,
    loading: bool,
    loading_started_at: Option<Instant>,
    loading_until: Option<Instant>,
    min_visible: Duration,
}

impl DetailView {
    pub fn new(min_visible: Duration) -> Self {
        Self {
            open: false,
            title: String::new(),
            text: String::new(),
            scroll: 0,
            follow: true,
            loading: false,
            loading_started_at: None,
            loading_until: None,
            min_visible,
        }
    }

    /// 打开新的详情：清空缓冲区并进入加载状态
    pub fn reset(&mut self, title: &str, now: Instant) {
        self.open = true;
        self.title = title.to_string();
        self.text.clear();
        self.scroll = 0;
        self.follow = true;
        self.start_loading(now);
    }

    pub fn start_loading(&mut self, now: Instant) {
        self.loading = true;
        self.loading_started_at = Some(now);
        self.loading_until = None;
    }

    /// 结束加载；若加载动画显示不足最短时间，则延后到期
    pub fn stop_loading(&mut self, now: Instant) {
        if !self.loading {
            return;
        }
        let shown = self
            .loading_started_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(self.min_visible);
        let rest = self.min_visible.saturating_sub(shown);
        if rest.is_zero() {
            self.loading = false;
            self.loading_until = None;
        } else {
            self.loading_until = Some(now + rest);
        }
    }

    pub fn is_loading(&self, now: Instant) -> bool {
        self.loading && self.loading_until.map_or(true, |until| now < until)
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(until) = self.loading_until {
            if now >= until {
                self.loading = false;
                self.loading_until = None;
            }
        }
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
        if self.follow {
            self.scroll = self.line_count();
        }
    }

    pub fn replace(&mut self, text: &str) {
        self.text = text.to_string();
        if self.follow {
            self.scroll = self.line_count();
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn close(&mut self, now: Instant) {
        self.open = false;
        self.stop_loading(now);
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize, visible_height: usize) {
        let max_scroll = self.line_count().saturating_sub(visible_height);
        self.scroll = self.scroll.saturating_add(n).min(max_scroll);
        if self.scroll >= max_scroll {
            self.follow = true;
        }
    }

    pub fn clamp_scroll(&mut self, visible_height: usize) {
        let max_scroll = self.line_count().saturating_sub(visible_height);
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(500);

    #[test]
    fn loading_stays_visible_for_minimum_time() {
        let t0 = Instant::now();
        let mut detail = DetailView::new(MIN);
        detail.reset("brew doctor", t0);

        detail.stop_loading(t0 + Duration::from_millis(100));
        assert!(detail.is_loading(t0 + Duration::from_millis(300)));
        assert!(!detail.is_loading(t0 + Duration::from_millis(500)));

        detail.tick(t0 + Duration::from_millis(600));
        assert!(!detail.is_loading(t0));
    }

    #[test]
    fn loading_stops_immediately_after_minimum_time() {
        let t0 = Instant::now();
        let mut detail = DetailView::new(MIN);
        detail.reset("x", t0);
        detail.stop_loading(t0 + Duration::from_secs(2));
        assert!(!detail.is_loading(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn restarting_loading_cancels_pending_stop() {
        let t0 = Instant::now();
        let mut detail = DetailView::new(MIN);
        detail.reset("x", t0);
        detail.stop_loading(t0 + Duration::from_millis(100));
        detail.start_loading(t0 + Duration::from_millis(200));
        detail.tick(t0 + Duration::from_secs(1));
        assert!(detail.is_loading(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn reset_clears_previous_output() {
        let t0 = Instant::now();
        let mut detail = DetailView::new(MIN);
        detail.reset("first", t0);
        detail.append("line 1\n");
        detail.reset("second", t0);
        assert!(detail.is_blank());
        assert_eq!(detail.title, "second");
        assert!(detail.open);
    }

    #[test]
    fn manual_scroll_stops_following_until_bottom() {
        let mut detail = DetailView::new(MIN);
        detail.append("a\nb\nc\nd\ne\n");
        detail.scroll_up(3);
        assert!(!detail.follow);
        detail.append("f\n");
        assert_eq!(detail.scroll, 2);
        detail.scroll_down(10, 2);
        assert!(detail.follow);
        assert_eq!(detail.scroll, 4);
    }
}
