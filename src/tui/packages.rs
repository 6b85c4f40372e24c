//! 主界面：安装输入、过滤、三个标签页（已安装 / 可升级 / Tap）与日志面板

use super::input::{edit_text, render_input_box};
use super::theme::{self, BLUE, BRIGHT_WHITE, DIM, PINK, SEL_BG};
use crate::app::workflows::{Dispatcher, Operation};
use crate::app::{AppState, Focus, Tab};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Frame;

const LOG_PANEL_HEIGHT: u16 = 8;

/// 列表焦点下的按键
pub fn handle_list_key(key: KeyEvent, app: &mut AppState, dispatcher: &Dispatcher, page: usize) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-(page as isize)),
        KeyCode::PageDown => app.move_cursor(page as isize),
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.row_count().saturating_sub(1),
        KeyCode::Tab | KeyCode::Right => app.switch_tab(app.tab.next()),
        KeyCode::Char('1') => app.switch_tab(Tab::Installed),
        KeyCode::Char('2') => app.switch_tab(Tab::Outdated),
        KeyCode::Char('3') => app.switch_tab(Tab::Taps),
        KeyCode::Char('f') => {
            app.filter_kind = app.filter_kind.next();
            app.clamp_cursor();
        }
        KeyCode::Char(' ') if app.tab == Tab::Installed => {
            if let Some(pkg) = app.current_package() {
                app.toggle_selection(&pkg.name);
            }
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            if let Some(pkg) = app.current_package() {
                dispatcher.spawn(Operation::Info(pkg));
            }
        }
        KeyCode::Char('x') => match app.tab {
            Tab::Taps => {
                if let Some(tap) = app.current_tap().map(str::to_string) {
                    app.ask_remove_tap(&tap);
                }
            }
            _ => {
                if let Some(pkg) = app.current_package() {
                    app.ask_uninstall(pkg);
                }
            }
        },
        KeyCode::Char('u') => {
            if let Some(pkg) = app.current_package() {
                dispatcher.spawn(Operation::Upgrade(pkg));
            }
        }
        KeyCode::Char('U') => {
            if app.outdated.is_empty() {
                app.push_log("没有可升级的包");
            } else {
                app.ask_upgrade_all();
            }
        }
        KeyCode::Char('X') => {
            app.ask_batch_uninstall();
        }
        KeyCode::Char('G') => {
            app.ask_batch_upgrade();
        }
        KeyCode::Char('d') => {
            dispatcher.spawn(Operation::Doctor);
        }
        KeyCode::Char('a') => app.focus = Focus::Install,
        KeyCode::Char('/') => app.focus = Focus::Filter,
        KeyCode::Char('s') => app.open_search(),
        KeyCode::Char('t') => {
            app.show_add_tap = true;
            app.focus = Focus::AddTap;
        }
        KeyCode::Char('l') => app.show_logs = !app.show_logs,
        KeyCode::Char('c') => {
            app.brew_path_input = app.config.custom_brew_path().unwrap_or_default().to_string();
            app.show_settings = true;
            app.focus = Focus::BrewPath;
        }
        _ => {}
    }
}

/// 安装输入框按键：Tab 切换 formula / cask，Enter 安装
pub fn handle_install_key(key: KeyEvent, app: &mut AppState, dispatcher: &Dispatcher) {
    match key.code {
        KeyCode::Enter => {
            if let Some(op) = app.prepare_install() {
                dispatcher.spawn(op);
            }
        }
        KeyCode::Tab => app.install_kind = app.install_kind.toggled(),
        _ => {
            edit_text(&mut app.install_name, key);
        }
    }
}

pub fn handle_filter_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Enter | KeyCode::Down => app.focus = Focus::List,
        _ => {
            if edit_text(&mut app.list_filter, key) {
                app.cursor = 0;
            }
        }
    }
}

pub fn render_main(f: &mut Frame, app: &AppState, area: Rect) {
    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(3),
    ];
    if app.show_logs {
        constraints.push(Constraint::Length(LOG_PANEL_HEIGHT));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_inputs(f, app, chunks[0]);
    render_tabs(f, app, chunks[1]);
    match app.tab {
        Tab::Installed => render_installed(f, app, chunks[2]),
        Tab::Outdated => render_outdated(f, app, chunks[2]),
        Tab::Taps => render_taps(f, app, chunks[2]),
    }
    if app.show_logs {
        render_logs(f, app, chunks[3]);
    }
}

fn render_inputs(f: &mut Frame, app: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let label = format!("安装 [{}]:", app.install_kind);
    render_input_box(
        f,
        &app.install_name,
        &label,
        "按 a 输入包名",
        app.focus == Focus::Install,
        halves[0],
    );
    render_input_box(
        f,
        &app.list_filter,
        "过滤:",
        "按 / 或 Ctrl+F",
        app.focus == Focus::Filter,
        halves[1],
    );
}

fn render_tabs(f: &mut Frame, app: &AppState, area: Rect) {
    let titles = Tab::ALL.iter().map(|tab| {
        let text = match tab {
            Tab::Installed => format!("已安装 ({})", app.packages.len()),
            Tab::Outdated => format!("可升级 ({})", app.outdated.len()),
            Tab::Taps => format!("Tap ({})", app.taps.len()),
        };
        Line::from(text)
    });
    let selected = Tab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(DIM))
        .highlight_style(Style::default().fg(PINK).add_modifier(Modifier::BOLD))
        .divider("│");

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(36)])
        .split(area);
    f.render_widget(tabs, halves[0]);

    let mut hint = format!("类型: {}", app.filter_kind.label());
    if app.is_selection_mode() {
        hint.push_str(&format!("  已选 {}", app.selection.len()));
    }
    f.render_widget(
        Paragraph::new(hint).style(Style::default().fg(BLUE)),
        halves[1],
    );
}

fn list_block(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
}

/// 光标行始终可见的滚动偏移
fn scroll_for(cursor: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        cursor.saturating_sub(visible - 1)
    }
}

fn render_placeholder(f: &mut Frame, app: &AppState, text: &str, area: Rect) {
    let text = if app.initial_loading {
        format!("{} 正在加载...", theme::spinner())
    } else {
        text.to_string()
    };
    f.render_widget(
        Paragraph::new(format!("  {text}")).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn package_line(
    cursor: bool,
    marked: bool,
    name: &str,
    version: Option<&str>,
    kind: &str,
    name_width: usize,
) -> Line<'static> {
    let marker = if marked { "[✓] " } else { "    " };
    let arrow = if cursor { ">" } else { " " };
    let padding = name_width.saturating_sub(name.chars().count()) + 2;
    let base = if cursor {
        Style::default().bg(SEL_BG)
    } else {
        Style::default()
    };
    let name_style = if cursor {
        base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)
    } else {
        base.fg(Color::White)
    };
    Line::from(vec![
        Span::styled(format!("{arrow}{marker}"), name_style),
        Span::styled(name.to_string(), name_style),
        Span::styled(" ".repeat(padding), base),
        Span::styled(version.unwrap_or("-").to_string(), base.fg(BLUE)),
        Span::styled(format!("  {kind}"), base.fg(DIM)),
    ])
}

fn render_installed(f: &mut Frame, app: &AppState, area: Rect) {
    let block = list_block("已安装");
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    let rows = app.filtered_packages();
    if rows.is_empty() {
        let text = if app.list_filter.trim().is_empty() {
            "没有已安装的包"
        } else {
            "未找到匹配的包"
        };
        render_placeholder(f, app, text, inner);
        return;
    }

    let visible = inner.height as usize;
    let scroll = scroll_for(app.cursor, visible);
    let name_width = rows
        .iter()
        .skip(scroll)
        .take(visible)
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(20);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, pkg)| {
            package_line(
                i == app.cursor && app.focus == Focus::List,
                app.selection.contains(&pkg.name),
                &pkg.name,
                pkg.version.as_deref(),
                pkg.kind.as_str(),
                name_width,
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_outdated(f: &mut Frame, app: &AppState, area: Rect) {
    let block = list_block("可升级");
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    if app.outdated.is_empty() {
        render_placeholder(f, app, "所有包都是最新的", inner);
        return;
    }

    let visible = inner.height as usize;
    let scroll = scroll_for(app.cursor, visible);
    let name_width = app
        .outdated
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(20);
    let lines: Vec<Line> = app
        .outdated
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, pkg)| {
            package_line(
                i == app.cursor && app.focus == Focus::List,
                false,
                &pkg.name,
                pkg.version.as_deref(),
                pkg.kind.as_str(),
                name_width,
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_taps(f: &mut Frame, app: &AppState, area: Rect) {
    let block = list_block("Tap");
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    if app.taps.is_empty() {
        render_placeholder(f, app, "没有 tap", inner);
        return;
    }

    let visible = inner.height as usize;
    let scroll = scroll_for(app.cursor, visible);
    let lines: Vec<Line> = app
        .taps
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, tap)| {
            if i == app.cursor && app.focus == Focus::List {
                Line::from(Span::styled(
                    format!("> {tap}"),
                    Style::default()
                        .bg(SEL_BG)
                        .fg(BRIGHT_WHITE)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(format!("  {tap}"), Style::default().fg(Color::White)))
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_logs(f: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default()
        .title(" 日志 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    let lines: Vec<Line> = app
        .logs
        .iter()
        .skip(app.logs.len().saturating_sub(visible))
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(DIM))))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

pub fn footer_hint(app: &AppState) -> &'static str {
    match app.focus {
        Focus::Install => "Enter 安装 | Tab 切换 formula/cask | Esc 返回列表",
        Focus::Filter => "输入过滤 | Enter 返回列表 | Esc 返回",
        _ if app.is_selection_mode() => {
            "Space 选择/取消 | X 批量卸载 | G 批量升级 | q 退出"
        }
        _ => match app.tab {
            Tab::Taps => "t 添加 tap | x 移除 | Tab 切换 | s 搜索 | Ctrl+R 刷新 | c 设置 | l 日志 | q 退出",
            Tab::Outdated => {
                "u 升级 | U 全部升级 | i 信息 | Tab 切换 | Ctrl+R 刷新 | d doctor | l 日志 | q 退出"
            }
            Tab::Installed => {
                "a 安装 | x 卸载 | u 升级 | i 信息 | Space 选择 | f 类型 | s 搜索 | d doctor | q 退出"
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_keeps_cursor_visible() {
        assert_eq!(scroll_for(0, 10), 0);
        assert_eq!(scroll_for(9, 10), 0);
        assert_eq!(scroll_for(10, 10), 1);
        assert_eq!(scroll_for(5, 0), 0);
    }
}
