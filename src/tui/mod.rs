mod input;
mod layout;
mod overlays;
mod packages;
mod theme;

use crate::app::notify::DesktopNotifier;
use crate::app::search::SearchDebouncer;
use crate::app::workflows::{Dispatcher, Operation};
use crate::app::{AppEvent, AppState, Focus};
use crate::brew::{CliBackend, EventEmitter};
use crate::config::Config;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run(config: Config) -> Result<()> {
    // 终端初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let emitter: Arc<dyn EventEmitter> = Arc::new(tx.clone());
    let brew = Arc::new(CliBackend::new(
        config.custom_brew_path().map(str::to_string),
        emitter,
    ));
    let notifier = Arc::new(DesktopNotifier::new(config.notifications));
    let dispatcher = Dispatcher::new(brew.clone(), tx, notifier);
    let mut debouncer = SearchDebouncer::new(Duration::from_millis(config.search_debounce_ms));
    let mut app = AppState::new(config);

    let result = event_loop(&mut terminal, &mut app, &dispatcher, &mut debouncer, rx).await;

    // 退出：取消搜索，终止残留 brew 进程
    debouncer.cancel();
    brew.shutdown();

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Term,
    app: &mut AppState,
    dispatcher: &Dispatcher,
    debouncer: &mut SearchDebouncer,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    app.push_log("lian-brew 已启动");
    dispatcher.spawn(Operation::Refresh { show_loader: false });

    loop {
        let now = Instant::now();
        app.tick(now);

        let term_size = terminal.size()?;
        let detail_visible = layout::detail_visible_height(term_size.height);
        if app.detail.open {
            app.detail.clamp_scroll(detail_visible);
        }

        terminal.draw(|f| ui(f, app, now))?;

        // 处理按键
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let page = term_size.height.saturating_sub(10) as usize;
                    handle_key(key, app, dispatcher, debouncer, detail_visible, page.max(1));
                }
            }
        }

        // 处理异步事件
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::TrayUpdated { title, .. } = &event {
                execute!(terminal.backend_mut(), SetTitle(title.as_str()))?;
            }
            app.apply(event, Instant::now());
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn handle_key(
    key: KeyEvent,
    app: &mut AppState,
    dispatcher: &Dispatcher,
    debouncer: &mut SearchDebouncer,
    detail_visible: usize,
    page: usize,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // 全局按键
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.escape(Instant::now());
            return;
        }
        _ => {}
    }

    // 最上层弹窗优先
    if app.confirm.is_some() {
        overlays::handle_confirm_key(key, app, dispatcher);
        return;
    }
    if app.detail.open {
        overlays::handle_detail_key(key, app, detail_visible);
        return;
    }

    if ctrl {
        match key.code {
            KeyCode::Char('r') => {
                if !app.loading && !app.is_text_input() {
                    dispatcher.spawn(Operation::Refresh { show_loader: true });
                }
                return;
            }
            KeyCode::Char('k') => {
                if app.search.open {
                    app.close_search();
                } else {
                    app.open_search();
                }
                return;
            }
            KeyCode::Char('f') => {
                if !app.search.open && !app.show_settings && !app.show_add_tap {
                    app.focus = Focus::Filter;
                }
                return;
            }
            _ => {}
        }
    }

    // 委托给当前焦点处理
    match app.focus {
        Focus::BrewPath => overlays::handle_settings_key(key, app, dispatcher),
        Focus::AddTap => overlays::handle_add_tap_key(key, app, dispatcher),
        Focus::Search => overlays::handle_search_key(key, app, dispatcher, debouncer),
        Focus::Install => packages::handle_install_key(key, app, dispatcher),
        Focus::Filter => packages::handle_filter_key(key, app),
        Focus::List => packages::handle_list_key(key, app, dispatcher, page),
    }
}

fn status_spans(app: &AppState) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            status.version.clone(),
            Style::default().fg(theme::BLUE),
        ));
        spans.push(Span::styled(
            format!("  {}", status.brew_path),
            Style::default().fg(theme::DIM),
        ));
    } else if let Some(err) = &app.status_error {
        spans.push(Span::styled(err.clone(), Style::default().fg(theme::ERR)));
    } else {
        spans.push(Span::styled("正在检测 brew...", Style::default().fg(theme::DIM)));
    }
    if app.tray.count > 0 {
        spans.push(Span::styled(
            format!("  ⬆ {}", app.tray.count),
            Style::default().fg(theme::WARN),
        ));
    }
    if app.loading {
        spans.push(Span::styled(
            format!("  {} 刷新中", theme::spinner()),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans
}

fn ui(f: &mut Frame, app: &AppState, now: Instant) {
    let area = f.area();
    let chunks = layout::main_layout(area);

    layout::render_header(f, "🍺 lian-brew", status_spans(app), chunks[0]);
    packages::render_main(f, app, chunks[1]);

    let footer = if app.confirm.is_some() {
        "y 确认 | n / Esc 取消"
    } else if app.detail.open {
        "↑↓ / PgUp PgDn 滚动 | g/G 顶部/底部 | Esc 关闭（命令继续在后台运行）"
    } else if app.search.open {
        "输入搜索 | ↑↓ 选择 | Enter 安装 | Esc / Ctrl+K 关闭"
    } else if app.show_settings || app.show_add_tap {
        "Enter 确认 | Esc 取消"
    } else {
        packages::footer_hint(app)
    };
    layout::render_footer(f, footer, chunks[2]);

    // 弹层按层级绘制
    if app.search.open {
        overlays::render_search(f, app, area);
    }
    if app.show_add_tap {
        overlays::render_add_tap(f, app, area);
    }
    if app.show_settings {
        overlays::render_settings(f, app, area);
    }
    if app.detail.open {
        overlays::render_detail(f, app, area, now);
    }
    if app.confirm.is_some() {
        overlays::render_confirm(f, app, area);
    }
    if let Some(text) = &app.global_loading {
        overlays::render_global_loading(f, text, area);
    }
    if let Some(toast) = &app.toast {
        overlays::render_toast(f, &toast.message, area);
    }
}
