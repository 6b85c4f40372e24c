//! 操作工作流：每个用户操作一个异步任务，状态变化全部以事件发回 UI 循环

use super::correlator::allocate_request_id;
use super::notify::Notifier;
use super::{AppEvent, EventSender, InputField, RefreshOutcome};
use crate::brew::{Action, BrewBackend, OperationRequest, Package, PackageKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// 显示全局加载后等待界面渲染
const SETTLE: Duration = Duration::from_millis(80);
const SETTLE_LONG: Duration = Duration::from_millis(100);
/// 详情弹窗打开后等待渲染
const DETAIL_SETTLE: Duration = Duration::from_millis(50);
const REFRESH_SETTLE: Duration = Duration::from_millis(50);

pub const TRAY_TITLE: &str = "Brew Manager";

pub fn tray_title(count: usize) -> String {
    if count > 0 {
        format!("{TRAY_TITLE} ({count})")
    } else {
        TRAY_TITLE.to_string()
    }
}

/// 用户可触发的操作
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Install {
        name: String,
        kind: PackageKind,
        /// 名称来自安装输入框，成功后清空
        from_input: bool,
    },
    Uninstall(Package),
    Upgrade(Package),
    UpgradeAll,
    AddTap(String),
    RemoveTap(String),
    BatchUninstall(Vec<Package>),
    BatchUpgrade(Vec<Package>),
    Info(Package),
    Doctor,
    Refresh { show_loader: bool },
}

/// 单次流式操作的全部参数与提示文本
struct StreamJob {
    action: Action,
    name: Option<String>,
    kind: Option<PackageKind>,
    loading: String,
    title: String,
    settle: Duration,
    verb: &'static str,
    success_log: String,
    notify: Option<(&'static str, String)>,
    clear_input: Option<InputField>,
    /// 成功后重新加载列表
    refresh: bool,
    /// info / doctor：调用出错时用错误信息替换详情内容
    replace_on_error: bool,
}

#[derive(Clone, Copy)]
enum BatchKind {
    Uninstall,
    Upgrade,
}

impl BatchKind {
    fn action(self) -> Action {
        match self {
            BatchKind::Uninstall => Action::Uninstall,
            BatchKind::Upgrade => Action::Upgrade,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            BatchKind::Uninstall => "卸载",
            BatchKind::Upgrade => "升级",
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn BrewBackend>,
    events: EventSender,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn BrewBackend>, events: EventSender, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            events,
            notifier,
        }
    }

    pub fn backend(&self) -> Arc<dyn BrewBackend> {
        Arc::clone(&self.backend)
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn spawn(&self, op: Operation) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run(op).await })
    }

    pub async fn run(&self, op: Operation) {
        log::info!("执行操作 {:?}", op);
        match op {
            Operation::Install {
                name,
                kind,
                from_input,
            } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    self.send(AppEvent::Log("请输入包名".to_string()));
                    return;
                }
                self.stream(StreamJob {
                    action: Action::Install,
                    loading: format!("正在准备安装 {name}..."),
                    title: format!("安装 {name} ({kind})"),
                    settle: SETTLE,
                    verb: "安装",
                    success_log: format!("安装成功: {name}"),
                    notify: Some(("安装完成", name.clone())),
                    clear_input: from_input.then_some(InputField::Install),
                    refresh: true,
                    replace_on_error: false,
                    name: Some(name),
                    kind: Some(kind),
                })
                .await
            }
            Operation::Uninstall(pkg) => {
                self.stream(StreamJob {
                    action: Action::Uninstall,
                    loading: format!("正在准备卸载 {}...", pkg.name),
                    title: format!("卸载 {} ({})", pkg.name, pkg.kind),
                    settle: SETTLE,
                    verb: "卸载",
                    success_log: format!("卸载成功: {}", pkg.name),
                    notify: Some(("卸载完成", pkg.name.clone())),
                    clear_input: None,
                    refresh: true,
                    replace_on_error: false,
                    name: Some(pkg.name),
                    kind: Some(pkg.kind),
                })
                .await
            }
            Operation::Upgrade(pkg) => {
                self.stream(StreamJob {
                    action: Action::Upgrade,
                    loading: format!("正在准备升级 {}...", pkg.name),
                    title: format!("升级 {}", pkg.name),
                    settle: SETTLE,
                    verb: "升级",
                    success_log: format!("升级成功: {}", pkg.name),
                    notify: Some(("升级完成", pkg.name.clone())),
                    clear_input: None,
                    refresh: true,
                    replace_on_error: false,
                    name: Some(pkg.name),
                    kind: Some(pkg.kind),
                })
                .await
            }
            Operation::UpgradeAll => {
                self.stream(StreamJob {
                    action: Action::UpgradeAll,
                    name: None,
                    kind: None,
                    loading: "正在准备升级全部...".to_string(),
                    title: "升级全部包".to_string(),
                    settle: SETTLE,
                    verb: "升级全部",
                    success_log: "全部升级完成".to_string(),
                    notify: Some(("升级完成", "所有可升级的包已升级".to_string())),
                    clear_input: None,
                    refresh: true,
                    replace_on_error: false,
                })
                .await
            }
            Operation::AddTap(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return;
                }
                self.stream(StreamJob {
                    action: Action::Tap,
                    loading: format!("正在添加 tap {name}..."),
                    title: format!("添加 tap {name}"),
                    settle: SETTLE,
                    verb: "添加 tap",
                    success_log: format!("已添加 tap: {name}"),
                    notify: Some(("Tap 已添加", name.clone())),
                    clear_input: Some(InputField::Tap),
                    refresh: true,
                    replace_on_error: false,
                    name: Some(name),
                    kind: None,
                })
                .await
            }
            Operation::RemoveTap(name) => {
                self.stream(StreamJob {
                    action: Action::Untap,
                    loading: format!("正在移除 tap {name}..."),
                    title: format!("移除 tap {name}"),
                    settle: SETTLE,
                    verb: "移除 tap",
                    success_log: format!("已移除 tap: {name}"),
                    notify: Some(("Tap 已移除", name.clone())),
                    clear_input: None,
                    refresh: true,
                    replace_on_error: false,
                    name: Some(name),
                    kind: None,
                })
                .await
            }
            Operation::BatchUninstall(targets) => self.batch(BatchKind::Uninstall, targets).await,
            Operation::BatchUpgrade(targets) => self.batch(BatchKind::Upgrade, targets).await,
            Operation::Info(pkg) => {
                self.stream(StreamJob {
                    action: Action::Info,
                    loading: format!("正在获取 {} 的信息...", pkg.name),
                    title: format!("{} ({})", pkg.name, pkg.kind),
                    settle: SETTLE_LONG,
                    verb: "获取信息",
                    success_log: format!("已获取 {} 的信息", pkg.name),
                    notify: None,
                    clear_input: None,
                    refresh: false,
                    replace_on_error: true,
                    name: Some(pkg.name),
                    kind: Some(pkg.kind),
                })
                .await
            }
            Operation::Doctor => {
                self.stream(StreamJob {
                    action: Action::Doctor,
                    name: None,
                    kind: None,
                    loading: "正在运行 brew doctor...".to_string(),
                    title: "brew doctor".to_string(),
                    settle: SETTLE_LONG,
                    verb: "brew doctor",
                    success_log: "brew doctor 完成".to_string(),
                    notify: None,
                    clear_input: None,
                    refresh: false,
                    replace_on_error: true,
                })
                .await
            }
            Operation::Refresh { show_loader } => self.refresh(show_loader).await,
        }
    }

    fn send(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            log::debug!("UI 已退出，丢弃事件");
        }
    }

    /// 全局加载 -> 分配 id 并打开详情 -> 关闭全局加载
    async fn open_detail(&self, loading: String, title: String, settle: Duration) -> String {
        self.send(AppEvent::GlobalLoading(Some(loading)));
        sleep(settle).await;
        let request_id = allocate_request_id();
        self.send(AppEvent::DetailOpened {
            request_id: request_id.clone(),
            title,
        });
        self.send(AppEvent::GlobalLoading(None));
        sleep(DETAIL_SETTLE).await;
        request_id
    }

    async fn stream(&self, job: StreamJob) {
        let request_id = self.open_detail(job.loading, job.title, job.settle).await;
        let request = OperationRequest {
            request_id: request_id.clone(),
            action: job.action,
            name: job.name,
            kind: job.kind,
        };

        match self.backend.run_stream(&request).await {
            Ok(resp) if resp.ok => {
                self.send(AppEvent::Log(job.success_log));
                if let Some((title, body)) = &job.notify {
                    self.notify(title, body).await;
                }
                if let Some(field) = job.clear_input {
                    self.send(AppEvent::InputCleared(field));
                }
                if job.refresh {
                    self.refresh(false).await;
                }
            }
            Ok(resp) => {
                log::warn!("[{}] {}失败: {}", request_id, job.verb, resp.message);
                let text = format!("{}失败: {}", job.verb, resp.message);
                // 校验失败时后端不会发送 start/end，由这里结束加载
                self.send(AppEvent::DetailFallback {
                    request_id,
                    text: text.clone(),
                });
                self.send(AppEvent::Log(text));
            }
            Err(e) => {
                log::error!("[{}] {}出错: {}", request_id, job.verb, e);
                let text = format!("{}出错: {e}", job.verb);
                self.send(AppEvent::DetailFailed {
                    request_id,
                    text: text.clone(),
                    replace: job.replace_on_error,
                });
                self.send(AppEvent::Log(text));
            }
        }
    }

    /// 批量操作：顺序执行，共用一个请求 id，单项失败不中断
    async fn batch(&self, kind: BatchKind, targets: Vec<Package>) {
        if targets.is_empty() {
            return;
        }
        let total = targets.len();
        let verb = kind.verb();
        let settle = match kind {
            BatchKind::Uninstall => SETTLE_LONG,
            BatchKind::Upgrade => SETTLE,
        };
        let request_id = self
            .open_detail(
                format!("正在准备批量{verb}..."),
                format!("批量{verb} ({total} 个)"),
                settle,
            )
            .await;

        let mut success = 0;
        let mut failed = 0;
        for (i, pkg) in targets.into_iter().enumerate() {
            self.append(&request_id, format!("({}/{}) 正在{verb} {}...\n", i + 1, total, pkg.name));
            let request = OperationRequest {
                request_id: request_id.clone(),
                action: kind.action(),
                name: Some(pkg.name.clone()),
                kind: Some(pkg.kind),
            };
            match self.backend.run_stream(&request).await {
                Ok(resp) if resp.ok => {
                    success += 1;
                    self.append(&request_id, format!("✓ {}\n", pkg.name));
                }
                Ok(resp) => {
                    failed += 1;
                    self.append(&request_id, format!("✗ {}: {}\n", pkg.name, resp.message));
                }
                Err(e) => {
                    failed += 1;
                    log::error!("[{}] 批量{verb} {} 出错: {}", request_id, pkg.name, e);
                    self.send(AppEvent::DetailFailed {
                        request_id: request_id.clone(),
                        text: format!("✗ {}: {e}", pkg.name),
                        replace: false,
                    });
                }
            }
        }

        self.append(&request_id, format!("\n完成：成功 {success} 个，失败 {failed} 个\n"));
        self.send(AppEvent::Log(format!("批量{verb}完成：成功 {success} 个，失败 {failed} 个")));
        self.notify(&format!("批量{verb}完成"), &format!("成功 {success} / {total}"))
            .await;
        self.refresh(false).await;
    }

    fn append(&self, request_id: &str, text: String) {
        self.send(AppEvent::DetailAppend {
            request_id: request_id.to_string(),
            text,
        });
    }

    /// 界面 toast + 系统通知
    async fn notify(&self, title: &str, body: &str) {
        self.send(AppEvent::Toast(format!("{title}: {body}")));
        let notifier = Arc::clone(&self.notifier);
        let (title, body) = (title.to_string(), body.to_string());
        if let Err(e) = tokio::task::spawn_blocking(move || notifier.notify(&title, &body)).await {
            log::debug!("系统通知任务异常: {}", e);
        }
    }

    /// 并发查询状态、已安装、可升级和 tap 列表
    pub async fn refresh(&self, show_loader: bool) {
        self.send(AppEvent::RefreshStarted { show_loader });
        if show_loader {
            sleep(REFRESH_SETTLE).await;
        }
        let backend = self.backend.as_ref();
        let (status, installed, outdated, taps) = tokio::join!(
            backend.status(),
            backend.list_installed(),
            backend.outdated(),
            backend.tap_list()
        );

        if let Ok(resp) = &outdated {
            if let (true, Some(list)) = (resp.ok, resp.data.as_ref()) {
                let count = list.len();
                if let Err(e) = backend.update_tray(&tray_title(count), count).await {
                    log::warn!("更新托盘失败: {}", e);
                }
            }
        }

        self.send(AppEvent::RefreshFinished(Box::new(RefreshOutcome {
            status: status.map_err(|e| e.to_string()),
            installed: installed.map_err(|e| e.to_string()),
            outdated: outdated.map_err(|e| e.to_string()),
            taps: taps.map_err(|e| e.to_string()),
            show_loader,
        })));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::FakeBackend;
    use crate::app::AppState;
    use crate::config::Config;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.sent.lock().unwrap().push((title.to_string(), body.to_string()));
        }
    }

    fn formula(name: &str) -> Package {
        Package::new(name, Some("1.0".to_string()), PackageKind::Formula)
    }

    struct Harness {
        backend: Arc<FakeBackend>,
        notifier: Arc<RecordingNotifier>,
        dispatcher: Dispatcher,
        rx: mpsc::UnboundedReceiver<AppEvent>,
        state: AppState,
    }

    impl Harness {
        fn new(configure: impl FnOnce(&mut FakeBackend)) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut backend = FakeBackend {
                events: Some(tx.clone()),
                ..FakeBackend::default()
            };
            configure(&mut backend);
            let backend = Arc::new(backend);
            let notifier = Arc::new(RecordingNotifier::default());
            let dispatcher = Dispatcher::new(backend.clone(), tx, notifier.clone());
            Self {
                backend,
                notifier,
                dispatcher,
                rx,
                state: AppState::new(Config::default()),
            }
        }

        fn drain(&mut self) -> Vec<String> {
            let mut kinds = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                kinds.push(event.name().to_string());
                self.state.apply(event, Instant::now());
            }
            kinds
        }

        fn stream_calls(&self) -> Vec<String> {
            self.backend
                .calls()
                .into_iter()
                .filter(|c| c.starts_with("run_stream"))
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_uninstall_calls_backend_once_per_target() {
        let mut h = Harness::new(|b| {
            b.failing = HashSet::from(["b".to_string()]);
            b.broken = HashSet::from(["c".to_string()]);
        });
        let targets = vec![formula("a"), formula("b"), formula("c"), formula("d")];
        h.dispatcher.run(Operation::BatchUninstall(targets)).await;
        h.drain();

        assert_eq!(
            h.stream_calls(),
            [
                "run_stream:uninstall:a",
                "run_stream:uninstall:b",
                "run_stream:uninstall:c",
                "run_stream:uninstall:d"
            ]
        );
        let text = &h.state.detail.text;
        assert!(text.contains("(1/4) 正在卸载 a..."));
        assert!(text.contains("✓ a"));
        assert!(text.contains("✗ b: 命令执行失败，请查看输出"));
        assert!(text.contains("✗ c: I/O 错误: 连接断开"));
        assert!(text.ends_with("完成：成功 2 个，失败 2 个\n"));
        assert_eq!(
            h.notifier.sent.lock().unwrap().as_slice(),
            [("批量卸载完成".to_string(), "成功 2 / 4".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_does_nothing() {
        let mut h = Harness::new(|_| {});
        h.dispatcher.run(Operation::BatchUpgrade(Vec::new())).await;
        assert!(h.drain().is_empty());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_install_clears_input_and_refreshes() {
        let mut h = Harness::new(|b| b.installed = vec![formula("wget")]);
        h.state.install_name = "wget".to_string();
        h.dispatcher
            .run(Operation::Install {
                name: "wget".to_string(),
                kind: PackageKind::Formula,
                from_input: true,
            })
            .await;
        let events = h.drain();

        assert_eq!(
            &events[..3],
            ["GlobalLoading", "DetailOpened", "GlobalLoading"]
        );
        assert!(events.contains(&"InputCleared".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("RefreshFinished"));
        assert!(h.state.install_name.is_empty());
        assert_eq!(h.state.packages, vec![formula("wget")]);
        assert_eq!(h.state.detail.text, "==> install wget\n");
        assert_eq!(h.state.toast.as_ref().map(|t| t.message.as_str()), Some("安装完成: wget"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_install_only_logs() {
        let mut h = Harness::new(|_| {});
        h.dispatcher
            .run(Operation::Install {
                name: "  ".to_string(),
                kind: PackageKind::Formula,
                from_input: true,
            })
            .await;
        h.drain();
        assert!(h.backend.calls().is_empty());
        assert!(h.state.logs.back().unwrap().ends_with("请输入包名"));
        assert!(!h.state.detail.open);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_uninstall_logs_without_refresh() {
        let mut h = Harness::new(|b| b.failing = HashSet::from(["wget".to_string()]));
        h.dispatcher.run(Operation::Uninstall(formula("wget"))).await;
        let events = h.drain();
        assert!(!events.contains(&"RefreshStarted".to_string()));
        assert!(h.state.logs.iter().any(|l| l.ends_with("卸载失败: 命令执行失败，请查看输出")));
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_written_to_detail() {
        let mut h = Harness::new(|b| b.broken = HashSet::from(["wget".to_string()]));
        h.dispatcher.run(Operation::Upgrade(formula("wget"))).await;
        h.drain();
        assert_eq!(h.state.detail.text, "升级出错: I/O 错误: 连接断开\n");
        assert!(!h.state.detail.is_loading(Instant::now() + Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_updates_tray_with_outdated_count() {
        let mut h = Harness::new(|b| b.outdated = vec![formula("a"), formula("b")]);
        h.dispatcher.refresh(true).await;
        h.drain();
        assert!(h.backend.calls().contains(&"update_tray:Brew Manager (2):2".to_string()));
        assert_eq!(h.state.tray.title, "Brew Manager (2)");
        assert_eq!(h.state.outdated.len(), 2);
        assert!(h.state.global_loading.is_none());
        assert!(!h.state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_outdated_query_skips_tray_update() {
        let mut h = Harness::new(|b| b.fail_outdated = true);
        h.dispatcher.refresh(false).await;
        h.drain();
        assert!(!h.backend.calls().iter().any(|c| c.starts_with("update_tray")));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_request_stops_loading_and_shows_message() {
        let mut h = Harness::new(|b| b.rejected = HashSet::from(["foo bar".to_string()]));
        h.dispatcher
            .run(Operation::Install {
                name: "foo bar".to_string(),
                kind: PackageKind::Formula,
                from_input: true,
            })
            .await;
        let events = h.drain();

        assert!(!events.contains(&"BrewLog".to_string()));
        assert!(!events.contains(&"RefreshStarted".to_string()));
        let later = Instant::now() + Duration::from_secs(3600);
        h.state.tick(later);
        assert!(h.state.detail.open);
        assert!(!h.state.detail.is_loading(later));
        assert_eq!(h.state.detail.text, "安装失败: 包名不合法");
        assert!(h.state.logs.back().unwrap().ends_with("安装失败: 包名不合法"));
    }

    #[tokio::test(start_paused = true)]
    async fn add_tap_clears_input_and_refreshes() {
        let mut h = Harness::new(|b| b.taps = vec!["homebrew/cask-fonts".to_string()]);
        h.state.new_tap_name = "homebrew/cask-fonts".to_string();
        h.dispatcher
            .run(Operation::AddTap(" homebrew/cask-fonts ".to_string()))
            .await;
        let events = h.drain();

        assert_eq!(h.stream_calls(), ["run_stream:tap:homebrew/cask-fonts"]);
        assert!(events.contains(&"InputCleared".to_string()));
        assert!(h.state.new_tap_name.is_empty());
        assert_eq!(h.state.taps, ["homebrew/cask-fonts"]);
        assert_eq!(
            h.state.toast.as_ref().map(|t| t.message.as_str()),
            Some("Tap 已添加: homebrew/cask-fonts")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blank_tap_name_is_ignored() {
        let mut h = Harness::new(|_| {});
        h.dispatcher.run(Operation::AddTap("   ".to_string())).await;
        assert!(h.drain().is_empty());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn untap_refreshes_without_touching_tap_input() {
        let mut h = Harness::new(|_| {});
        h.state.new_tap_name = "draft".to_string();
        h.dispatcher
            .run(Operation::RemoveTap("homebrew/cask-fonts".to_string()))
            .await;
        let events = h.drain();

        assert_eq!(h.stream_calls(), ["run_stream:untap:homebrew/cask-fonts"]);
        assert!(!events.contains(&"InputCleared".to_string()));
        assert!(events.contains(&"RefreshStarted".to_string()));
        assert_eq!(h.state.new_tap_name, "draft");
        assert!(h.state.logs.iter().any(|l| l.ends_with("已移除 tap: homebrew/cask-fonts")));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_upgrade_tallies_and_refreshes() {
        let mut h = Harness::new(|b| b.failing = HashSet::from(["git".to_string()]));
        let targets = vec![formula("git"), formula("wget")];
        h.dispatcher.run(Operation::BatchUpgrade(targets)).await;
        let events = h.drain();

        assert_eq!(h.stream_calls(), ["run_stream:upgrade:git", "run_stream:upgrade:wget"]);
        let text = &h.state.detail.text;
        assert!(text.contains("(2/2) 正在升级 wget..."));
        assert!(text.contains("✗ git: 命令执行失败，请查看输出"));
        assert!(text.contains("✓ wget"));
        assert!(text.ends_with("完成：成功 1 个，失败 1 个\n"));
        assert_eq!(h.state.detail.title, "批量升级 (2 个)");
        assert_eq!(events.last().map(String::as_str), Some("RefreshFinished"));
        assert_eq!(
            h.notifier.sent.lock().unwrap().as_slice(),
            [("批量升级完成".to_string(), "成功 1 / 2".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn info_success_does_not_refresh() {
        let mut h = Harness::new(|_| {});
        h.dispatcher.run(Operation::Info(formula("wget"))).await;
        let events = h.drain();

        assert!(!events.contains(&"RefreshStarted".to_string()));
        assert!(!h.backend.calls().iter().any(|c| c == "list_installed"));
        assert_eq!(h.state.detail.text, "==> info wget\n");
        assert!(h.state.toast.is_none());
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn doctor_success_does_not_refresh() {
        let mut h = Harness::new(|_| {});
        h.dispatcher.run(Operation::Doctor).await;
        let events = h.drain();

        assert_eq!(h.stream_calls(), ["run_stream:doctor:"]);
        assert!(!events.contains(&"RefreshStarted".to_string()));
        assert!(h.state.logs.back().unwrap().ends_with("brew doctor 完成"));
    }

    #[tokio::test(start_paused = true)]
    async fn info_transport_error_replaces_detail() {
        let mut h = Harness::new(|b| b.broken = HashSet::from(["wget".to_string()]));
        h.dispatcher.run(Operation::Info(formula("wget"))).await;
        let events = h.drain();

        assert_eq!(h.state.detail.text, "获取信息出错: I/O 错误: 连接断开");
        assert!(!h.state.detail.is_loading(Instant::now() + Duration::from_secs(1)));
        assert!(!events.contains(&"RefreshStarted".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_list_query_keeps_previous_packages() {
        let mut h = Harness::new(|b| {
            b.fail_list = true;
            b.outdated = vec![formula("git")];
            b.taps = vec!["homebrew/core".to_string()];
        });
        h.state.packages = vec![formula("old")];
        h.state.toggle_selection("old");
        h.dispatcher.refresh(false).await;
        h.drain();

        assert_eq!(h.state.packages, vec![formula("old")]);
        assert_eq!(h.state.outdated, vec![formula("git")]);
        assert_eq!(h.state.taps, ["homebrew/core"]);
        assert!(h.state.selection.is_empty());
        assert!(h.state.logs.iter().any(|l| l.ends_with("加载失败: list 失败")));
    }

    #[test]
    fn tray_title_shows_count_only_when_positive() {
        assert_eq!(tray_title(0), "Brew Manager");
        assert_eq!(tray_title(3), "Brew Manager (3)");
    }
}
