//! Optional version-control collaborator: `git status`/`git add` shelling.
//!
//! Grounded in `cortex-engine/src/git_info.rs`'s `git_command`/
//! `find_git_root` pattern of shelling to `git` and trimming stdout, and in
//! the original `patcher_core.py`'s `check_git_status`/`stage_files`
//! (short timeout, any failure degrades to `{is_repo: false}`).

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of `vcs_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct VcsStatus {
    pub is_repo: bool,
    pub is_dirty: bool,
    pub dirty_paths: Vec<String>,
}

impl VcsStatus {
    fn not_a_repo() -> Self {
        Self {
            is_repo: false,
            is_dirty: false,
            dirty_paths: Vec::new(),
        }
    }
}

const SHORT_TIMEOUT: Duration = Duration::from_secs(2);

/// Shell out to `git status --porcelain` in `cwd` with a short timeout.
/// Any error (not a repo, `git` missing, timeout) degrades to
/// `{is_repo: false}`, never propagated as an `Err`.
pub fn vcs_status(cwd: &Path) -> VcsStatus {
    let Some(output) = run_git(cwd, &["status", "--porcelain"]) else {
        return VcsStatus::not_a_repo();
    };

    let dirty_paths: Vec<String> = output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l[3.min(l.len())..].to_string())
        .collect();

    VcsStatus {
        is_repo: true,
        is_dirty: !dirty_paths.is_empty(),
        dirty_paths,
    }
}

/// Best-effort `git add` of `paths`; returns whether staging succeeded.
/// Never turns a successful apply into a failure; the caller ignores a
/// `false` result beyond surfacing an informational message.
pub fn stage_files(cwd: &Path, paths: &[String]) -> bool {
    if paths.is_empty() {
        return false;
    }
    let mut args = vec!["add".to_string()];
    args.extend(paths.iter().cloned());
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_git(cwd, &arg_refs).is_some()
}

/// Run `git <args>` in `cwd`, bounded by [`SHORT_TIMEOUT`] via a poll loop
/// on the child process so a hung `git` can never block the caller
/// indefinitely. Returns trimmed stdout on success, `None` on any error,
/// non-zero exit, or timeout.
fn run_git(cwd: &Path, args: &[&str]) -> Option<String> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + SHORT_TIMEOUT;
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            if !status.success() {
                return None;
            }
            let output = child.wait_with_output().ok()?;
            return Some(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
