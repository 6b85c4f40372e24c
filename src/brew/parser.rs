//! brew 输出解析函数

use super::types::{Package, PackageKind};
use serde::Deserialize;

/// 清理终端输出中的 ANSI 转义序列和特殊字符
pub fn clean_terminal_output(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            '\r' => {
                if chars.peek() != Some(&'\n') && !result.ends_with('\n') {
                    result.push('\n');
                }
            }
            c if c.is_control() && c != '\n' && c != '\t' => {}
            _ => result.push(c),
        }
    }

    let mut cleaned_lines = Vec::new();
    let mut prev_empty = false;
    for line in result.lines() {
        let is_empty = line.trim().is_empty();
        if is_empty && prev_empty {
            continue;
        }
        cleaned_lines.push(line);
        prev_empty = is_empty;
    }

    cleaned_lines.join("\n")
}

/// 包名只允许 brew 会用到的字符，防止参数注入
pub fn is_valid_pkg_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '+' | '.' | '-' | '@' | '_'))
}

/// 解析 `brew list --formula|--cask --versions`，每行 `name version [version...]`
pub fn parse_versions_list(raw: &str, kind: PackageKind) -> Vec<Package> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.next().map(|v| v.to_string());
            Some(Package::new(name, version, kind))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OutdatedReport {
    #[serde(default)]
    formulae: Vec<OutdatedEntry>,
    #[serde(default)]
    casks: Vec<OutdatedEntry>,
}

#[derive(Debug, Deserialize)]
struct OutdatedEntry {
    name: String,
    #[serde(default)]
    current_version: Option<String>,
}

/// 解析 `brew outdated --json=v2`，version 为可升级到的版本
pub fn parse_outdated_json(raw: &str) -> Result<Vec<Package>, serde_json::Error> {
    let report: OutdatedReport = serde_json::from_str(raw)?;
    let mut out: Vec<Package> = report
        .formulae
        .into_iter()
        .map(|e| Package::new(e.name, e.current_version, PackageKind::Formula))
        .chain(
            report
                .casks
                .into_iter()
                .map(|e| Package::new(e.name, e.current_version, PackageKind::Cask)),
        )
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// 解析 `brew search`，跳过 `==> Formulae` 之类的分组标题
pub fn parse_search_output(raw: &str, kind: PackageKind) -> Vec<Package> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('='))
        .map(|name| Package::new(name, None, kind))
        .collect()
}

/// 解析 `brew tap`
pub fn parse_tap_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// `brew --version` 的首行
pub fn parse_version_line(raw: &str) -> String {
    raw.lines().next().unwrap_or_default().trim().to_string()
}
