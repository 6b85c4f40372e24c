//! 流式命令执行（install / uninstall / upgrade / tap / info / doctor）
//!
//! 输出逐行以 `brew-log` 事件推送，事件携带请求的 request_id，
//! 由前端按 id 关联到对应的详情视图。

use super::parser::{clean_terminal_output, is_valid_pkg_name};
use super::types::{Action, ApiResponse, ErrorCode, LogEvent, LogStream, OperationRequest, PackageKind};
use super::{Brew, EventEmitter};
use std::collections::HashSet;
use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

/// 当前仍在运行的 brew 子进程（进程组 id），退出应用时统一清理
pub type RunningSet = Arc<Mutex<HashSet<u32>>>;

/// 把请求转换为 brew 参数
pub fn stream_args(request: &OperationRequest) -> Result<Vec<String>, ApiResponse<bool>> {
    let mut args: Vec<String> = Vec::new();
    match request.action {
        Action::Doctor => args.push("doctor".to_string()),
        Action::UpgradeAll => args.push("upgrade".to_string()),
        Action::Tap | Action::Untap => {
            let tap_name = request.name.as_deref().map(str::trim).unwrap_or_default();
            if tap_name.is_empty() {
                return Err(ApiResponse::err(ErrorCode::InvalidName, "tap 名称不能为空"));
            }
            if !is_valid_pkg_name(tap_name) {
                return Err(ApiResponse::err(ErrorCode::InvalidName, "tap 名称不合法"));
            }
            args.push(request.action.as_str().to_string());
            args.push(tap_name.to_string());
        }
        Action::Info | Action::Install | Action::Uninstall | Action::Upgrade => {
            let Some(pkg_name) = request.name.as_deref() else {
                return Err(ApiResponse::err(ErrorCode::InvalidName, "缺少包名"));
            };
            if !is_valid_pkg_name(pkg_name) {
                return Err(ApiResponse::err(ErrorCode::InvalidName, "包名不合法"));
            }
            args.push(request.action.as_str().to_string());
            if request.kind.unwrap_or(PackageKind::Formula) == PackageKind::Cask {
                args.push("--cask".to_string());
            }
            args.push(pkg_name.to_string());
        }
    }
    Ok(args)
}

/// 从流中读取行并以日志事件发送，返回发送的行数
///
/// 按字节切行，整行再解码，多字节字符跨两次 read 也不会被截断。
/// `\r` 就地刷新的进度条只保留最后一次刷新的内容，`\r\n` 视为普通换行。
fn read_stream_lines(
    stream: Option<impl Read>,
    emitter: &dyn EventEmitter,
    request_id: &str,
    kind: LogStream,
) -> usize {
    let Some(mut reader) = stream else {
        return 0;
    };
    let mut sent = 0;
    let mut buffer = [0u8; 1024];
    let mut line_buffer: Vec<u8> = Vec::new();
    let mut pending_cr = false;

    let flush = |line: &mut Vec<u8>, sent: &mut usize| {
        let cleaned = clean_terminal_output(&String::from_utf8_lossy(line));
        if !cleaned.trim().is_empty() {
            emitter.emit_log(LogEvent::line(request_id, kind, cleaned));
            *sent += 1;
        }
        line.clear();
    };

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("[{}] 读取 {:?} 输出失败: {}", request_id, kind, e);
                break;
            }
        };
        for &b in &buffer[..n] {
            match b {
                b'\n' => {
                    pending_cr = false;
                    flush(&mut line_buffer, &mut sent);
                }
                b'\r' => pending_cr = true,
                _ => {
                    if pending_cr {
                        // 进度条刷新：丢弃上一帧
                        line_buffer.clear();
                        pending_cr = false;
                    }
                    line_buffer.push(b);
                }
            }
        }
    }
    if !line_buffer.is_empty() {
        flush(&mut line_buffer, &mut sent);
    }
    sent
}

fn spawn_brew(brew: &Brew, args: &[String]) -> std::io::Result<std::process::Child> {
    let mut cmd = Command::new(&brew.path);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                // 独立进程组，方便退出时统一终止 brew 及其子进程
                libc::setpgid(0, 0);
                #[cfg(target_os = "linux")]
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }
    }
    cmd.spawn()
}

/// 执行一次流式 brew 命令（阻塞，需在 blocking 线程中调用）
///
/// 事件顺序固定为 start -> line* -> end；参数校验失败时不发送任何事件。
pub fn run_stream(
    brew: &Brew,
    request: &OperationRequest,
    emitter: &dyn EventEmitter,
    running: &RunningSet,
) -> ApiResponse<bool> {
    let args = match stream_args(request) {
        Ok(args) => args,
        Err(resp) => return resp,
    };
    let request_id = request.request_id.as_str();
    log::info!("[{}] brew {}", request_id, args.join(" "));

    emitter.emit_log(LogEvent::start(request_id));

    let mut child = match spawn_brew(brew, &args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("[{}] 启动 brew 失败: {}", request_id, e);
            emitter.emit_log(LogEvent::end(request_id, false));
            return ApiResponse::err(ErrorCode::SpawnFailed, format!("启动 brew 失败: {e}"));
        }
    };

    let pid = child.id();
    if let Ok(mut set) = running.lock() {
        set.insert(pid);
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let had_output = std::thread::scope(|s| {
        let out = s.spawn(|| read_stream_lines(stdout, emitter, request_id, LogStream::Stdout));
        let err = s.spawn(|| read_stream_lines(stderr, emitter, request_id, LogStream::Stderr));
        let out_lines = out.join().unwrap_or_default();
        let err_lines = err.join().unwrap_or_default();
        out_lines + err_lines > 0
    });

    let status = child.wait();
    if let Ok(mut set) = running.lock() {
        set.remove(&pid);
    }

    let status = match status {
        Ok(s) => s,
        Err(e) => {
            log::error!("[{}] 等待命令结束失败: {}", request_id, e);
            emitter.emit_log(LogEvent::end(request_id, false));
            return ApiResponse::err(ErrorCode::WaitFailed, format!("等待命令结束失败: {e}"));
        }
    };

    if !status.success() && !had_output {
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        emitter.emit_log(LogEvent::line(
            request_id,
            LogStream::Stderr,
            format!("命令退出但没有输出（exit code: {code}）"),
        ));
    }

    emitter.emit_log(LogEvent::end(request_id, status.success()));
    log::info!("[{}] 结束, success={}", request_id, status.success());

    if status.success() {
        ApiResponse::ok(true, "命令执行完成")
    } else {
        ApiResponse::err(ErrorCode::CommandFailed, "命令执行失败，请查看输出")
    }
}

/// 终止仍在运行的 brew 进程组（退出应用时调用）
pub fn cleanup_child_processes(running: &RunningSet) {
    let pids: Vec<u32> = match running.lock() {
        Ok(mut set) => set.drain().collect(),
        Err(_) => return,
    };
    for pid in pids {
        log::info!("终止残留 brew 进程组 {}", pid);
        #[cfg(unix)]
        unsafe {
            libc::kill(-(pid as i32), libc::SIGTERM);
        }
    }
}
