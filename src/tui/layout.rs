use super::theme;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

/// 标准三段式布局：Header(3) + Content(弹性) + Footer(3)
pub fn main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

/// 渲染 header：左侧标题，右侧状态
pub fn render_header(f: &mut Frame, title: &str, status: Vec<Span<'static>>, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {title} "),
        Style::default().fg(theme::PINK).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    spans.extend(status);
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

/// 渲染通用 footer
pub fn render_footer(f: &mut Frame, text: &str, area: Rect) {
    let footer = Paragraph::new(format!(" {}", text))
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(footer, area);
}

/// 居中弹窗区域（按百分比）
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// 居中弹窗区域（固定高度）
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// 清空弹窗区域并画边框，返回内部区域
pub fn render_modal(f: &mut Frame, title: &str, border: Color, area: Rect) -> Rect {
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    })
}

/// 渲染带滚动条的内容区域
pub fn render_scrollable_content(
    f: &mut Frame,
    title: &str,
    text: &str,
    scroll_offset: usize,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    // 内部水平边距
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    let total_lines = text.lines().count();
    let visible_height = padded.height as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);
    let actual_scroll = scroll_offset.min(max_scroll);

    let visible_content: Vec<Line> = text
        .lines()
        .skip(actual_scroll)
        .take(visible_height)
        .map(styled_output_line)
        .collect();

    let paragraph = Paragraph::new(visible_content).wrap(Wrap { trim: false });
    f.render_widget(paragraph, padded);

    // 滚动条
    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_lines).position(actual_scroll);

        f.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                horizontal: 0,
                vertical: 1,
            }),
            &mut scrollbar_state,
        );
    }
}

/// 命令输出行着色：stderr、批量结果、brew 标题行
fn styled_output_line(line: &str) -> Line<'static> {
    let color = if line.starts_with("[err] ") || line.starts_with('✗') {
        theme::ERR
    } else if line.starts_with('✓') {
        theme::OK
    } else if line.starts_with("==>") {
        theme::BLUE
    } else if line.starts_with("Warning") {
        theme::WARN
    } else {
        Color::White
    };
    Line::from(Span::styled(line.to_string(), Style::default().fg(color)))
}

/// 详情弹窗内容可见行数（弹窗 80% 高度减去边框）
pub fn detail_visible_height(term_height: u16) -> usize {
    (term_height as usize * 80 / 100).saturating_sub(2)
}
