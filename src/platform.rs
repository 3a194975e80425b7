use crate::paths::{self, PlatformKind};
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use crossterm::{execute, style::Print};
use std::env;
use std::io::{self, Write};
use std::process::Command;
use std::thread;

/// Opens the platform file manager with `absolute_path` selected where supported.
pub fn reveal_in_file_manager(absolute_path: &str) -> Result<()> {
    let native = paths::to_native(absolute_path);
    let platform = PlatformKind::current();
    let command = match platform {
        PlatformKind::Mac => {
            let mut c = Command::new("open");
            c.arg("-R").arg(&native);
            c
        }
        PlatformKind::Windows => {
            let mut c = Command::new("explorer");
            c.arg(format!("/select,{}", native.display()));
            c
        }
        PlatformKind::Linux | PlatformKind::Unknown => {
            // xdg-open has no "select" mode, open the containing directory.
            let target = native.parent().map(|p| p.to_path_buf()).unwrap_or(native);
            let mut c = Command::new("xdg-open");
            c.arg(target);
            c
        }
    };

    tracing::info!(event = "platform.reveal", path = %absolute_path);
    spawn_reaped(command)
        .with_context(|| format!("Failed to launch {}", platform.file_manager_name()))?;
    Ok(())
}

/// Starts `command` and waits for it on a background thread so the finished
/// launcher does not linger as a zombie.
fn spawn_reaped(mut command: Command) -> io::Result<thread::JoinHandle<()>> {
    let mut child = command.spawn()?;
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            tracing::debug!(event = "platform.launcher_exit", %status);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(event = "platform.launcher_wait_failed", error = %e),
    }))
}

pub fn osc52_sequence(text: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x07", encoded)
}

fn in_tmux() -> bool {
    env::var_os("TMUX").is_some()
        || env::var_os("TERM").is_some_and(|t| t.to_string_lossy().starts_with("tmux"))
}

fn tmux_passthrough(seq: &str) -> String {
    let escaped = seq.replace('\x1b', "\x1b\x1b");
    format!("\x1bPtmux;{}\x1b\\", escaped)
}

/// Writes `text` to the terminal clipboard with an OSC 52 escape.
pub fn copy_to_clipboard<W: Write>(w: &mut W, text: &str) -> Result<()> {
    if text.is_empty() {
        bail!("Nothing to copy");
    }
    let seq = osc52_sequence(text);
    let out = if in_tmux() { tmux_passthrough(&seq) } else { seq };
    execute!(w, Print(out))?;
    w.flush()?;
    Ok(())
}

pub fn copy_to_terminal_clipboard(text: &str) -> Result<()> {
    copy_to_clipboard(&mut io::stdout(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn launcher_is_waited_for() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("exit 0");
        let reaper = spawn_reaped(command).unwrap();
        reaper.join().unwrap();
    }

    #[test]
    fn missing_launcher_is_an_error() {
        assert!(spawn_reaped(Command::new("change-review-no-such-launcher")).is_err());
    }

    #[test]
    fn osc52_encodes_payload() {
        assert_eq!(osc52_sequence("a.rs"), "\x1b]52;c;YS5ycw==\x07");
    }

    #[test]
    fn tmux_passthrough_doubles_escapes() {
        let wrapped = tmux_passthrough("\x1b]52;c;YQ==\x07");
        assert_eq!(wrapped, "\x1bPtmux;\x1b\x1b]52;c;YQ==\x07\x1b\\");
    }

    #[test]
    fn copy_rejects_empty_text() {
        let mut out = Vec::new();
        assert!(copy_to_clipboard(&mut out, "").is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn copy_writes_sequence() {
        let mut out = Vec::new();
        copy_to_clipboard(&mut out, "src/a.rs").unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains(&general_purpose::STANDARD.encode("src/a.rs")));
    }
}
