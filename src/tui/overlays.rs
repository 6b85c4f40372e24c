//! 弹层：搜索、添加 tap、设置、详情、确认框、全局加载与 toast

use super::input::{edit_text, render_input_box};
use super::layout;
use super::theme::{self, BLUE, BRIGHT_WHITE, DIM, PINK, SEL_BG};
use crate::app::search::SearchDebouncer;
use crate::app::workflows::{Dispatcher, Operation};
use crate::app::AppState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph, Wrap};
use ratatui::Frame;
use tokio::time::Instant;

// ===== 按键 =====

pub fn handle_search_key(
    key: KeyEvent,
    app: &mut AppState,
    dispatcher: &Dispatcher,
    debouncer: &mut SearchDebouncer,
) {
    match key.code {
        KeyCode::Up => app.search.move_selection(-1),
        KeyCode::Down => app.search.move_selection(1),
        KeyCode::Enter => {
            let Some(pkg) = app.search.selected_package().cloned() else {
                return;
            };
            if app.installed_names().contains(pkg.name.as_str()) {
                dispatcher.spawn(Operation::Info(pkg));
            } else {
                dispatcher.spawn(Operation::Install {
                    name: pkg.name,
                    kind: pkg.kind,
                    from_input: false,
                });
            }
        }
        _ => {
            if edit_text(&mut app.search.query, key) {
                match app.search.on_query_change() {
                    Some((seq, query)) => {
                        debouncer.schedule(seq, query, dispatcher.backend(), dispatcher.events())
                    }
                    None => debouncer.cancel(),
                }
            }
        }
    }
}

pub fn handle_add_tap_key(key: KeyEvent, app: &mut AppState, dispatcher: &Dispatcher) {
    match key.code {
        KeyCode::Enter => {
            if let Some(op) = app.prepare_add_tap() {
                dispatcher.spawn(op);
            }
        }
        _ => {
            edit_text(&mut app.new_tap_name, key);
        }
    }
}

pub fn handle_settings_key(key: KeyEvent, app: &mut AppState, dispatcher: &Dispatcher) {
    match key.code {
        KeyCode::Enter => {
            let path = app.apply_brew_path();
            dispatcher.backend().set_brew_path(path);
            dispatcher.spawn(Operation::Refresh { show_loader: true });
        }
        _ => {
            edit_text(&mut app.brew_path_input, key);
        }
    }
}

/// 详情弹窗打开时的按键（滚动）
pub fn handle_detail_key(key: KeyEvent, app: &mut AppState, visible: usize) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.detail.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => app.detail.scroll_down(1, visible),
        KeyCode::PageUp => app.detail.scroll_up(visible),
        KeyCode::PageDown | KeyCode::Char(' ') => app.detail.scroll_down(visible, visible),
        KeyCode::Home | KeyCode::Char('g') => app.detail.scroll_up(usize::MAX),
        KeyCode::End | KeyCode::Char('G') => app.detail.scroll_down(usize::MAX, visible),
        KeyCode::Char('q') => app.close_detail(Instant::now()),
        _ => {}
    }
}

/// 确认框：y / Enter 确认，n 取消
pub fn handle_confirm_key(key: KeyEvent, app: &mut AppState, dispatcher: &Dispatcher) {
    let answer = match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
        KeyCode::Char('n') | KeyCode::Char('N') => false,
        _ => return,
    };
    if let Some(op) = app.resolve_confirm(answer) {
        dispatcher.spawn(op);
    }
}

// ===== 渲染 =====

pub fn render_search(f: &mut Frame, app: &AppState, area: Rect) {
    let popup = layout::centered_rect(70, 70, area);
    let inner = layout::render_modal(f, "搜索 Homebrew", BLUE, popup);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    render_input_box(f, &app.search.query, "搜索:", "输入包名", true, chunks[0]);

    let status = if app.search.loading {
        Span::styled(format!("{} 搜索中...", theme::spinner()), Style::default().fg(Color::Yellow))
    } else if let Some(err) = &app.search.error {
        Span::styled(err.clone(), Style::default().fg(theme::ERR))
    } else if !app.search.results.is_empty() {
        Span::styled(
            format!("找到 {} 个结果，Enter 安装（已安装则查看信息）", app.search.results.len()),
            Style::default().fg(DIM),
        )
    } else {
        Span::styled("停止输入后自动搜索", Style::default().fg(DIM))
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[1]);

    let installed = app.installed_names();
    let visible = chunks[2].height as usize;
    let scroll = app.search.selected.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = app
        .search
        .results
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, pkg)| {
            let selected = i == app.search.selected;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::styled(
                    format!("{}{}", if selected { "> " } else { "  " }, pkg.name),
                    base.fg(BRIGHT_WHITE).add_modifier(if selected {
                        Modifier::BOLD
                    } else {
                        Modifier::empty()
                    }),
                ),
                Span::styled(format!("  {}", pkg.kind), base.fg(DIM)),
            ];
            if installed.contains(pkg.name.as_str()) {
                spans.push(Span::styled("  已安装", base.fg(theme::OK)));
            }
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines), chunks[2]);
}

pub fn render_add_tap(f: &mut Frame, app: &AppState, area: Rect) {
    let popup = layout::centered_fixed(60, 7, area);
    let inner = layout::render_modal(f, "添加 tap", PINK, popup);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);
    render_input_box(f, &app.new_tap_name, "名称:", "user/repo", true, chunks[0]);
    f.render_widget(
        Paragraph::new("Enter 添加 | Esc 取消").style(Style::default().fg(DIM)),
        chunks[1],
    );
}

pub fn render_settings(f: &mut Frame, app: &AppState, area: Rect) {
    let popup = layout::centered_fixed(70, 9, area);
    let inner = layout::render_modal(f, "设置", PINK, popup);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);
    render_input_box(
        f,
        &app.brew_path_input,
        "brew 路径:",
        "留空自动检测",
        true,
        chunks[0],
    );
    let current = app
        .status
        .as_ref()
        .map(|s| format!("当前使用: {}", s.brew_path))
        .unwrap_or_else(|| "当前未检测到 brew".to_string());
    let text = vec![
        Line::from(Span::styled(current, Style::default().fg(BLUE))),
        Line::from(Span::styled(
            "Enter 保存并刷新 | 留空保存即恢复自动检测 | Esc 取消",
            Style::default().fg(DIM),
        )),
    ];
    f.render_widget(Paragraph::new(text), chunks[1]);
}

pub fn render_detail(f: &mut Frame, app: &AppState, area: Rect, now: Instant) {
    let popup = layout::centered_rect(80, 80, area);
    let title = if app.detail.is_loading(now) {
        format!("{} {}", theme::spinner(), app.detail.title)
    } else {
        app.detail.title.clone()
    };
    if app.detail.is_blank() && app.detail.is_loading(now) {
        let inner = layout::render_modal(f, &title, Color::Yellow, popup);
        f.render_widget(
            Paragraph::new("等待输出...").style(Style::default().fg(DIM)),
            inner,
        );
        return;
    }
    layout::render_scrollable_content(f, &title, &app.detail.text, app.detail.scroll, popup);
}

pub fn render_confirm(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(dialog) = &app.confirm else {
        return;
    };
    let popup = layout::centered_fixed(56, 7, area);
    let inner = layout::render_modal(f, &dialog.title, theme::WARN, popup);
    let text = vec![
        Line::from(Span::styled(dialog.message.clone(), Style::default().fg(BRIGHT_WHITE))),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y] 确认", Style::default().fg(theme::OK).add_modifier(Modifier::BOLD)),
            Span::raw("    "),
            Span::styled("[n] 取消", Style::default().fg(DIM)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        inner,
    );
}

pub fn render_global_loading(f: &mut Frame, text: &str, area: Rect) {
    let width = (text.chars().count() as u16 + 8).max(24);
    let popup = layout::centered_fixed(width, 3, area);
    let inner = layout::render_modal(f, "请稍候", BLUE, popup);
    f.render_widget(
        Paragraph::new(format!("{} {}", theme::spinner(), text))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center),
        inner,
    );
}

pub fn render_toast(f: &mut Frame, message: &str, area: Rect) {
    let width = (message.chars().count() as u16 * 2 + 4).min(area.width);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y + area.height.saturating_sub(4),
        width,
        height: 1,
    };
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(format!(" {message} "))
            .style(Style::default().fg(Color::Black).bg(PINK).add_modifier(Modifier::BOLD)),
        rect,
    );
}
