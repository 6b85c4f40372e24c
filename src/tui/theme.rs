//! MTF flag 主题色定义，全局统一使用

use ratatui::style::Color;

/// 粉色 (MTF flag)
pub const PINK: Color = Color::Rgb(245, 169, 184);
/// 蓝色 (MTF flag)
pub const BLUE: Color = Color::Rgb(91, 206, 250);
/// 选中行背景色
pub const SEL_BG: Color = Color::Rgb(45, 35, 55);
pub const BRIGHT_WHITE: Color = Color::Rgb(255, 255, 255);
/// 暗灰色（次要信息）
pub const DIM: Color = Color::Rgb(130, 130, 140);
pub const OK: Color = Color::Rgb(140, 220, 140);
pub const WARN: Color = Color::Rgb(250, 200, 90);
pub const ERR: Color = Color::Rgb(240, 110, 110);

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// 按当前时间取加载动画帧
pub fn spinner() -> &'static str {
    let millis = chrono::Local::now().timestamp_subsec_millis() as usize;
    SPINNER[(millis / 100) % SPINNER.len()]
}
