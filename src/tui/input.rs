use super::theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 单行文本编辑：字符追加与退格，返回内容是否变化
pub fn edit_text(s: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            s.push(c);
            true
        }
        KeyCode::Backspace => s.pop().is_some(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let changed = !s.is_empty();
            s.clear();
            changed
        }
        _ => false,
    }
}

/// 渲染输入框，聚焦时在末尾显示光标
pub fn render_input_box(
    f: &mut Frame,
    content: &str,
    label: &str,
    placeholder: &str,
    focused: bool,
    area: Rect,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let mut spans = vec![Span::styled(
        format!("{label} "),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    if content.is_empty() && !focused {
        spans.push(Span::styled(placeholder.to_string(), Style::default().fg(theme::DIM)));
    } else {
        spans.push(Span::styled(content.to_string(), Style::default().fg(Color::White)));
    }

    if focused {
        spans.push(Span::styled(" ", Style::default().fg(Color::Black).bg(Color::White)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(paragraph, area);
}
