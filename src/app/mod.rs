//! 应用状态层：UI 循环独占 `AppState`，工作流只通过 `AppEvent` 通知变化

pub mod correlator;
pub mod detail;
pub mod log_sink;
pub mod notify;
pub mod search;
pub mod workflows;

#[cfg(test)]
mod fake;

use crate::brew::{ApiResponse, BrewStatus, EventEmitter, LogEvent, Package, PackageKind};
use crate::config::Config;
use correlator::Correlator;
use detail::DetailView;
use log_sink::SinkOutcome;
use notify::Toast;
use search::SearchState;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use workflows::{Operation, TRAY_TITLE};

/// 后端调用结果；调用本身失败时为错误文本
pub type QueryResult<T> = Result<ApiResponse<T>, String>;

pub type EventSender = mpsc::UnboundedSender<AppEvent>;

impl EventEmitter for EventSender {
    fn emit_log(&self, event: LogEvent) {
        let _ = self.send(AppEvent::BrewLog(event));
    }

    fn emit_tray(&self, title: &str, count: usize) {
        let _ = self.send(AppEvent::TrayUpdated {
            title: title.to_string(),
            count,
        });
    }
}

// ========== 事件 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Install,
    Tap,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub status: QueryResult<BrewStatus>,
    pub installed: QueryResult<Vec<Package>>,
    pub outdated: QueryResult<Vec<Package>>,
    pub taps: QueryResult<Vec<String>>,
    pub show_loader: bool,
}

#[derive(Debug)]
pub enum AppEvent {
    /// 后端 `brew-log` 事件
    BrewLog(LogEvent),
    TrayUpdated { title: String, count: usize },
    GlobalLoading(Option<String>),
    DetailOpened { request_id: String, title: String },
    DetailAppend { request_id: String, text: String },
    /// 调用出错：结束加载，追加或替换为错误信息
    DetailFailed { request_id: String, text: String, replace: bool },
    /// 后端返回失败：结束加载，详情仍为空时用失败信息填充
    DetailFallback { request_id: String, text: String },
    Log(String),
    Toast(String),
    InputCleared(InputField),
    RefreshStarted { show_loader: bool },
    RefreshFinished(Box<RefreshOutcome>),
    SearchStarted { seq: u64 },
    SearchFinished { seq: u64, result: QueryResult<Vec<Package>> },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::BrewLog(_) => "BrewLog",
            AppEvent::TrayUpdated { .. } => "TrayUpdated",
            AppEvent::GlobalLoading(_) => "GlobalLoading",
            AppEvent::DetailOpened { .. } => "DetailOpened",
            AppEvent::DetailAppend { .. } => "DetailAppend",
            AppEvent::DetailFailed { .. } => "DetailFailed",
            AppEvent::DetailFallback { .. } => "DetailFallback",
            AppEvent::Log(_) => "Log",
            AppEvent::Toast(_) => "Toast",
            AppEvent::InputCleared(_) => "InputCleared",
            AppEvent::RefreshStarted { .. } => "RefreshStarted",
            AppEvent::RefreshFinished(_) => "RefreshFinished",
            AppEvent::SearchStarted { .. } => "SearchStarted",
            AppEvent::SearchFinished { .. } => "SearchFinished",
        }
    }
}

// ========== 界面状态 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    All,
    Formula,
    Cask,
}

impl KindFilter {
    pub fn next(self) -> Self {
        match self {
            KindFilter::All => KindFilter::Formula,
            KindFilter::Formula => KindFilter::Cask,
            KindFilter::Cask => KindFilter::All,
        }
    }

    pub fn matches(self, kind: PackageKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Formula => kind == PackageKind::Formula,
            KindFilter::Cask => kind == PackageKind::Cask,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KindFilter::All => "全部",
            KindFilter::Formula => "Formula",
            KindFilter::Cask => "Cask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Installed,
    Outdated,
    Taps,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Installed, Tab::Outdated, Tab::Taps];

    pub fn next(self) -> Self {
        match self {
            Tab::Installed => Tab::Outdated,
            Tab::Outdated => Tab::Taps,
            Tab::Taps => Tab::Installed,
        }
    }
}

/// 当前接收文字输入的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Filter,
    Install,
    Search,
    AddTap,
    BrewPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub action: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayState {
    pub title: String,
    pub count: usize,
}

pub struct AppState {
    pub config: Config,
    config_path: PathBuf,
    pub initial_loading: bool,
    /// 刷新进行中
    pub loading: bool,
    pub status: Option<BrewStatus>,
    pub status_error: Option<String>,
    pub packages: Vec<Package>,
    pub outdated: Vec<Package>,
    pub taps: Vec<String>,
    pub selection: BTreeSet<String>,
    pub filter_kind: KindFilter,
    pub list_filter: String,
    pub install_name: String,
    pub install_kind: PackageKind,
    pub new_tap_name: String,
    pub brew_path_input: String,
    pub logs: VecDeque<String>,
    pub search: SearchState,
    pub detail: DetailView,
    pub correlator: Correlator,
    pub global_loading: Option<String>,
    pub toast: Option<Toast>,
    pub confirm: Option<ConfirmDialog>,
    pub tray: TrayState,
    pub tab: Tab,
    pub cursor: usize,
    pub focus: Focus,
    pub show_logs: bool,
    pub show_add_tap: bool,
    pub show_settings: bool,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let min_visible = Duration::from_millis(config.min_loading_visible_ms);
        let brew_path_input = config.custom_brew_path().unwrap_or_default().to_string();
        Self {
            config,
            config_path: Config::config_path(),
            initial_loading: true,
            loading: false,
            status: None,
            status_error: None,
            packages: Vec::new(),
            outdated: Vec::new(),
            taps: Vec::new(),
            selection: BTreeSet::new(),
            filter_kind: KindFilter::All,
            list_filter: String::new(),
            install_name: String::new(),
            install_kind: PackageKind::Formula,
            new_tap_name: String::new(),
            brew_path_input,
            logs: VecDeque::new(),
            search: SearchState::default(),
            detail: DetailView::new(min_visible),
            correlator: Correlator::new(),
            global_loading: None,
            toast: None,
            confirm: None,
            tray: TrayState {
                title: TRAY_TITLE.to_string(),
                count: 0,
            },
            tab: Tab::Installed,
            cursor: 0,
            focus: Focus::List,
            show_logs: false,
            show_add_tap: false,
            show_settings: false,
            should_quit: false,
        }
    }

    /// 应用一条事件，UI 状态的唯一修改入口
    pub fn apply(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::BrewLog(event) => {
                match log_sink::apply(&mut self.correlator, &mut self.detail, &event, now) {
                    SinkOutcome::Finished { success: true } => self.push_log("命令执行完成"),
                    SinkOutcome::Finished { success: false } => self.push_log("命令执行结束（有警告）"),
                    SinkOutcome::Applied | SinkOutcome::Discarded => {}
                }
            }
            AppEvent::TrayUpdated { title, count } => {
                self.tray = TrayState { title, count };
            }
            AppEvent::GlobalLoading(text) => self.global_loading = text,
            AppEvent::DetailOpened { request_id, title } => {
                self.correlator.activate(&request_id, now);
                self.detail.reset(&title, now);
            }
            AppEvent::DetailAppend { request_id, text } => {
                if self.correlator.is_active(&request_id) {
                    self.detail.append(&text);
                }
            }
            AppEvent::DetailFailed {
                request_id,
                text,
                replace,
            } => {
                if self.correlator.is_active(&request_id) {
                    self.detail.stop_loading(now);
                    if replace {
                        self.detail.replace(&text);
                    } else {
                        self.detail.append(&format!("{text}\n"));
                    }
                }
            }
            AppEvent::DetailFallback { request_id, text } => {
                if self.correlator.is_active(&request_id) {
                    self.detail.stop_loading(now);
                    if self.detail.is_blank() {
                        self.detail.replace(&text);
                    }
                }
            }
            AppEvent::Log(text) => self.push_log(&text),
            AppEvent::Toast(message) => self.show_toast(message, now),
            AppEvent::InputCleared(InputField::Install) => self.install_name.clear(),
            AppEvent::InputCleared(InputField::Tap) => self.new_tap_name.clear(),
            AppEvent::RefreshStarted { show_loader } => {
                self.loading = true;
                self.selection.clear();
                if show_loader {
                    self.global_loading = Some("正在刷新...".to_string());
                }
            }
            AppEvent::RefreshFinished(outcome) => self.apply_refresh(*outcome),
            AppEvent::SearchStarted { seq } => self.search.begin(seq),
            AppEvent::SearchFinished { seq, result } => {
                self.search.finish(seq, result);
            }
        }
    }

    /// 每个字段独立生效：失败只记录日志，保留旧数据
    fn apply_refresh(&mut self, outcome: RefreshOutcome) {
        match outcome.status {
            Ok(resp) => match resp.into_result() {
                Ok(status) => {
                    self.status = Some(status);
                    self.status_error = None;
                }
                Err(message) => {
                    self.push_log(&format!("brew 不可用: {message}"));
                    self.status_error = Some(message);
                }
            },
            Err(e) => self.push_log(&format!("获取 brew 状态出错: {e}")),
        }

        match outcome.installed {
            Ok(resp) => match resp.into_result() {
                Ok(list) => {
                    self.push_log(&format!("已加载 {} 个包", list.len()));
                    self.packages = list;
                }
                Err(message) => self.push_log(&format!("加载失败: {message}")),
            },
            Err(e) => self.push_log(&format!("刷新失败: {e}")),
        }

        match outcome.outdated {
            Ok(resp) => match resp.into_result() {
                Ok(list) => {
                    if !list.is_empty() {
                        self.push_log(&format!("{} 个包可升级", list.len()));
                    }
                    self.outdated = list;
                }
                Err(message) => self.push_log(&format!("获取可升级列表失败: {message}")),
            },
            Err(e) => self.push_log(&format!("获取可升级列表出错: {e}")),
        }

        match outcome.taps {
            Ok(resp) => match resp.into_result() {
                Ok(list) => self.taps = list,
                Err(message) => self.push_log(&format!("获取 tap 列表失败: {message}")),
            },
            Err(e) => self.push_log(&format!("获取 tap 列表出错: {e}")),
        }

        self.loading = false;
        self.initial_loading = false;
        self.selection.clear();
        if outcome.show_loader {
            self.global_loading = None;
        }
        self.clamp_cursor();
    }

    pub fn tick(&mut self, now: Instant) {
        self.detail.tick(now);
        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.toast = None;
        }
    }

    pub fn push_log(&mut self, text: &str) {
        log::info!("{}", text);
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("[{stamp}] {text}"));
        while self.logs.len() > self.config.log_limit.max(1) {
            self.logs.pop_front();
        }
    }

    pub fn show_toast(&mut self, message: String, now: Instant) {
        let ttl = Duration::from_millis(self.config.toast_ms);
        self.toast = Some(Toast::new(message, now, ttl));
    }

    // ===== 列表 =====

    pub fn filtered_packages(&self) -> Vec<&Package> {
        let query = self.list_filter.trim().to_lowercase();
        self.packages
            .iter()
            .filter(|p| self.filter_kind.matches(p.kind))
            .filter(|p| query.is_empty() || p.name.to_lowercase().contains(&query))
            .collect()
    }

    pub fn installed_names(&self) -> BTreeSet<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_selection_mode(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn toggle_selection(&mut self, name: &str) {
        if !self.selection.remove(name) {
            self.selection.insert(name.to_string());
        }
    }

    /// 选中集合解析为当前列表中的包，不存在的名字忽略
    pub fn selected_targets(&self) -> Vec<Package> {
        self.selection
            .iter()
            .filter_map(|name| self.packages.iter().find(|p| &p.name == name))
            .cloned()
            .collect()
    }

    /// 当前标签页的行数
    pub fn row_count(&self) -> usize {
        match self.tab {
            Tab::Installed => self.filtered_packages().len(),
            Tab::Outdated => self.outdated.len(),
            Tab::Taps => self.taps.len(),
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = self.cursor.saturating_add_signed(delta);
        self.clamp_cursor();
    }

    pub fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.row_count().saturating_sub(1));
    }

    pub fn current_package(&self) -> Option<Package> {
        match self.tab {
            Tab::Installed => self.filtered_packages().get(self.cursor).map(|p| (*p).clone()),
            Tab::Outdated => self.outdated.get(self.cursor).cloned(),
            Tab::Taps => None,
        }
    }

    pub fn current_tap(&self) -> Option<&str> {
        match self.tab {
            Tab::Taps => self.taps.get(self.cursor).map(String::as_str),
            _ => None,
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.cursor = 0;
    }

    // ===== 确认框 =====

    fn ask(&mut self, title: &str, message: String, action: Operation) {
        self.confirm = Some(ConfirmDialog {
            title: title.to_string(),
            message,
            action,
        });
    }

    pub fn ask_uninstall(&mut self, pkg: Package) {
        let message = format!("确定要卸载 {} 吗？", pkg.name);
        self.ask("卸载确认", message, Operation::Uninstall(pkg));
    }

    pub fn ask_upgrade_all(&mut self) {
        let message = format!("确定要升级全部 {} 个可升级的包吗？", self.outdated.len());
        self.ask("升级确认", message, Operation::UpgradeAll);
    }

    pub fn ask_remove_tap(&mut self, name: &str) {
        let message = format!("确定要移除 tap {name} 吗？");
        self.ask("移除 tap", message, Operation::RemoveTap(name.to_string()));
    }

    /// 选中为空时不弹出确认
    pub fn ask_batch_uninstall(&mut self) -> bool {
        let targets = self.selected_targets();
        if targets.is_empty() {
            return false;
        }
        let message = format!("确定要卸载选中的 {} 个包吗？", targets.len());
        self.ask("批量卸载", message, Operation::BatchUninstall(targets));
        true
    }

    pub fn ask_batch_upgrade(&mut self) -> bool {
        let targets = self.selected_targets();
        if targets.is_empty() {
            return false;
        }
        let message = format!("确定要升级选中的 {} 个包吗？", targets.len());
        self.ask("批量升级", message, Operation::BatchUpgrade(targets));
        true
    }

    /// 关闭确认框；确认时返回待执行的操作
    pub fn resolve_confirm(&mut self, yes: bool) -> Option<Operation> {
        let dialog = self.confirm.take()?;
        yes.then_some(dialog.action)
    }

    // ===== 输入 =====

    pub fn prepare_install(&mut self) -> Option<Operation> {
        let name = self.install_name.trim();
        if name.is_empty() {
            self.push_log("请输入包名");
            return None;
        }
        Some(Operation::Install {
            name: name.to_string(),
            kind: self.install_kind,
            from_input: true,
        })
    }

    pub fn prepare_add_tap(&mut self) -> Option<Operation> {
        let name = self.new_tap_name.trim();
        if name.is_empty() {
            return None;
        }
        let op = Operation::AddTap(name.to_string());
        self.show_add_tap = false;
        self.focus = Focus::List;
        Some(op)
    }

    /// 保存 brew 路径设置，返回新的自定义路径（`None` 为自动检测）
    pub fn apply_brew_path(&mut self) -> Option<String> {
        let path = self.brew_path_input.trim().to_string();
        if path.is_empty() {
            self.config.brew_path = None;
            self.push_log("已清除自定义 brew 路径");
        } else {
            self.config.brew_path = Some(path.clone());
            self.push_log(&format!("已保存 brew 路径: {path}"));
        }
        if let Err(e) = self.config.save_to(&self.config_path) {
            log::error!("保存配置失败: {}", e);
            self.push_log(&format!("保存配置失败: {e}"));
        }
        self.show_settings = false;
        self.focus = Focus::List;
        self.config.brew_path.clone()
    }

    pub fn close_detail(&mut self, now: Instant) {
        if let Some(id) = self.correlator.active_id() {
            log::debug!("关闭详情 {}，后续输出将被忽略", id);
        }
        self.detail.close(now);
        self.correlator.release();
    }

    pub fn open_search(&mut self) {
        self.search.open = true;
        self.focus = Focus::Search;
    }

    pub fn close_search(&mut self) {
        self.search.open = false;
        if self.focus == Focus::Search {
            self.focus = Focus::List;
        }
    }

    /// Esc：由上到下关闭最上层的面板，返回是否关闭了什么
    pub fn escape(&mut self, now: Instant) -> bool {
        if self.confirm.is_some() {
            self.resolve_confirm(false);
        } else if self.detail.open {
            self.close_detail(now);
        } else if self.show_settings {
            self.show_settings = false;
            self.focus = Focus::List;
        } else if self.show_add_tap {
            self.show_add_tap = false;
            self.focus = Focus::List;
        } else if self.search.open {
            self.close_search();
        } else if self.show_logs {
            self.show_logs = false;
        } else if self.focus != Focus::List {
            self.focus = Focus::List;
        } else {
            return false;
        }
        true
    }

    pub fn is_text_input(&self) -> bool {
        self.focus != Focus::List
    }

    #[cfg(test)]
    fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }
}
