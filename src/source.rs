use std::path::Path;
use std::process::Command;

use crate::config::SourceOverride;
use crate::graph::Repository;

/// Resolves the workspace's source-control metadata. An explicit override
/// wins; otherwise the repository is probed with `git` when requested. Runs
/// before the first project walk, never inside one.
pub fn resolve_repository(
    workspace_root: &Path,
    source: Option<&SourceOverride>,
    probe: bool,
) -> Option<Repository> {
    if let Some(source) = source {
        return Some(Repository {
            kind: source.kind.clone(),
            url: source.url.clone(),
            commit_id: source.commit_id.clone(),
            branch: source.branch.clone(),
        });
    }
    if probe {
        return probe_git(workspace_root);
    }
    None
}

fn probe_git(workspace_root: &Path) -> Option<Repository> {
    let url = git_output(workspace_root, &["remote", "get-url", "origin"])?;
    let commit_id = git_output(workspace_root, &["rev-parse", "HEAD"]);
    let branch = git_output(workspace_root, &["branch", "--show-current"]);
    Some(Repository {
        kind: "git".to_string(),
        url,
        commit_id,
        branch,
    })
}

fn git_output(workspace_root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(workspace_root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
