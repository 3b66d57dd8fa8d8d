//! Thin wrapper over the `git` command line.
//!
//! Repository maintenance (clone, pull, history queries, identity) is
//! public. Branch and commit plumbing is only used by the snapshot manager
//! and stays crate-private.

use std::path::{Path, PathBuf};

use bt_cache::RevisionSet;
use bt_exec::{CommandOutput, CommandRunner, ExternalCommand};

use crate::error::VcsError;

/// Identity used when the user has not configured one.
pub const DEFAULT_NAME: &str = "BuildTools";
/// Email used when the user has not configured one.
pub const DEFAULT_EMAIL: &str = "unconfigured@null.spigotmc.org";

/// A git working tree driven through a [`CommandRunner`].
pub struct Git<'r> {
    runner: &'r dyn CommandRunner,
    dir: PathBuf,
}

impl<'r> Git<'r> {
    /// Opens the working tree at `dir`.
    pub fn open(runner: &'r dyn CommandRunner, dir: &Path) -> Result<Self, VcsError> {
        if !dir.join(".git").exists() {
            return Err(VcsError::NotARepository {
                path: dir.to_path_buf(),
            });
        }
        Ok(Self {
            runner,
            dir: dir.to_path_buf(),
        })
    }

    /// Clones `url` into `dir` and logs the resulting HEAD.
    pub fn clone_repo(runner: &'r dyn CommandRunner, url: &str, dir: &Path) -> Result<Self, VcsError> {
        tracing::info!("Starting clone of {url} to {}", dir.display());
        let mut clone = ExternalCommand::new("git")
            .arg("clone")
            .arg(url)
            .arg(dir.to_string_lossy());
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            bt_common::fs::ensure_dir(parent)?;
        }
        if let Ok(cwd) = std::env::current_dir() {
            clone = clone.current_dir(cwd);
        }
        runner.run(&clone)?;

        let git = Self::open(runner, dir)?;
        let head = git.head()?;
        tracing::info!("Cloned git repository {url} to {}. Current HEAD: {head}", dir.display());
        Ok(git)
    }

    /// Returns the working tree directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command(&self) -> ExternalCommand {
        ExternalCommand::new("git").current_dir(&self.dir)
    }

    fn run<I, S>(&self, args: I) -> Result<CommandOutput, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.runner.run(&self.command().args(args))?)
    }

    /// Runs a query whose output is parsed rather than shown.
    fn query<I, S>(&self, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self.runner.run(&self.command().args(args).quiet())?;
        Ok(output.stdout.trim().to_string())
    }

    /// Returns the commit id of HEAD.
    pub fn head(&self) -> Result<String, VcsError> {
        self.rev_parse("HEAD")
    }

    /// Resolves a revision expression to an object id.
    pub fn rev_parse(&self, rev: &str) -> Result<String, VcsError> {
        self.query(["rev-parse", rev])
    }

    /// Returns the tree id of `rev`.
    pub fn tree_of(&self, rev: &str) -> Result<String, VcsError> {
        self.rev_parse(&format!("{rev}^{{tree}}"))
    }

    /// Discards local changes to tracked files, then pulls `branch` from
    /// `origin`.
    pub fn pull(&self, branch: &str) -> Result<(), VcsError> {
        tracing::info!("Pulling updates for {}", self.dir.display());
        self.run(["reset", "--hard", &format!("origin/{branch}")])?;
        self.run(["pull", "origin", branch])?;
        tracing::info!("Successfully pulled updates!");
        Ok(())
    }

    /// Returns the ids of the newest `max_count` commits touching any of
    /// `paths`, newest first.
    pub fn log_revisions(&self, paths: &[String], max_count: usize) -> Result<RevisionSet, VcsError> {
        let mut args = vec![
            "log".to_string(),
            format!("--max-count={max_count}"),
            "--format=%H".to_string(),
            "--".to_string(),
        ];
        args.extend(paths.iter().cloned());
        let stdout = self.query(args)?;
        let revisions: RevisionSet = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        tracing::debug!(count = revisions.len(), "mapping revisions");
        Ok(revisions)
    }

    /// Sets the global commit identity to the defaults when the user has
    /// none configured.
    pub fn ensure_identity(runner: &dyn CommandRunner) -> Result<(), VcsError> {
        for (key, default, what) in [
            ("user.name", DEFAULT_NAME, "name"),
            ("user.email", DEFAULT_EMAIL, "email"),
        ] {
            let check = ExternalCommand::new("git")
                .args(["config", "--global", key])
                .quiet();
            if runner.execute(&check)?.success() {
                continue;
            }
            tracing::info!("Git {what} not set, setting it to default value.");
            runner.run(&ExternalCommand::new("git").args(["config", "--global", key, default]))?;
        }
        Ok(())
    }

    /// Returns the checked-out branch name.
    pub(crate) fn current_branch(&self) -> Result<String, VcsError> {
        let output = self
            .runner
            .execute(&self.command().args(["symbolic-ref", "--quiet", "--short", "HEAD"]).quiet())?;
        if !output.success() {
            return Err(VcsError::DetachedHead {
                repo: self.dir.clone(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    pub(crate) fn branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        let check = self
            .command()
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("refs/heads/{branch}"))
            .quiet();
        Ok(self.runner.execute(&check)?.success())
    }

    pub(crate) fn delete_branch_force(&self, branch: &str) -> Result<(), VcsError> {
        self.run(["branch", "-D", branch])?;
        Ok(())
    }

    /// Creates or resets `branch` at HEAD and switches to it, discarding
    /// local changes to tracked files.
    pub(crate) fn checkout_new_force(&self, branch: &str) -> Result<(), VcsError> {
        self.run(["checkout", "-f", "-B", branch])?;
        Ok(())
    }

    pub(crate) fn checkout_force(&self, branch: &str) -> Result<(), VcsError> {
        self.run(["checkout", "-f", branch])?;
        Ok(())
    }

    pub(crate) fn add_all(&self, path: &str) -> Result<(), VcsError> {
        self.run(["add", "-A", "--", path])?;
        Ok(())
    }

    pub(crate) fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.run(["commit", "--quiet", "--allow-empty", "-m", message])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_exec::ExecError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records commands and replies with canned outputs (exit 0 and empty
    /// output once the queue runs dry).
    #[derive(Default)]
    struct ScriptedRunner {
        calls: RefCell<Vec<ExternalCommand>>,
        replies: RefCell<VecDeque<CommandOutput>>,
    }

    impl ScriptedRunner {
        fn reply(self, code: i32, stdout: &str) -> Self {
            self.replies.borrow_mut().push_back(CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            });
            self
        }

        fn lines(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|c| c.get_args().join(" "))
                .collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn execute(&self, command: &ExternalCommand) -> Result<CommandOutput, ExecError> {
            self.calls.borrow_mut().push(command.clone());
            Ok(self.replies.borrow_mut().pop_front().unwrap_or(CommandOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }))
        }
    }

    fn fake_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[test]
    fn open_requires_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        assert!(matches!(
            Git::open(&runner, dir.path()),
            Err(VcsError::NotARepository { .. })
        ));
    }

    #[test]
    fn pull_resets_then_pulls() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default();
        Git::open(&runner, dir.path()).unwrap().pull("master").unwrap();
        assert_eq!(runner.lines(), ["reset --hard origin/master", "pull origin master"]);
        assert!(runner
            .calls
            .borrow()
            .iter()
            .all(|c| c.cwd() == Some(dir.path())));
    }

    #[test]
    fn log_revisions_parses_newest_first() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default().reply(0, "c0ffee\nbadf00d\n");
        let paths = vec!["mappings/bukkit-1.8.at".to_string(), "mappings/package.srg".to_string()];
        let revs = Git::open(&runner, dir.path())
            .unwrap()
            .log_revisions(&paths, 1)
            .unwrap();
        assert_eq!(revs.as_slice(), ["c0ffee", "badf00d"]);
        assert_eq!(
            runner.lines(),
            ["log --max-count=1 --format=%H -- mappings/bukkit-1.8.at mappings/package.srg"]
        );
    }

    #[test]
    fn log_revisions_empty_history() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default().reply(0, "");
        let revs = Git::open(&runner, dir.path())
            .unwrap()
            .log_revisions(&["missing".to_string()], 1)
            .unwrap();
        assert!(revs.is_empty());
    }

    #[test]
    fn identity_set_only_when_missing() {
        // user.name is configured, user.email is not
        let runner = ScriptedRunner::default().reply(0, "Alex\n").reply(1, "");
        Git::ensure_identity(&runner).unwrap();
        assert_eq!(
            runner.lines(),
            [
                "config --global user.name",
                "config --global user.email",
                "config --global user.email unconfigured@null.spigotmc.org",
            ]
        );
    }

    #[test]
    fn detached_head_is_reported() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default().reply(1, "");
        let err = Git::open(&runner, dir.path())
            .unwrap()
            .current_branch()
            .unwrap_err();
        assert!(matches!(err, VcsError::DetachedHead { .. }));
    }

    #[test]
    fn branch_check_uses_exit_status() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default().reply(1, "").reply(0, "abc\n");
        let git = Git::open(&runner, dir.path()).unwrap();
        assert!(!git.branch_exists("patched").unwrap());
        assert!(git.branch_exists("patched").unwrap());
        assert_eq!(
            runner.lines()[0],
            "rev-parse --verify --quiet refs/heads/patched"
        );
    }

    #[test]
    fn failing_command_surfaces_exec_error() {
        let dir = fake_repo();
        let runner = ScriptedRunner::default().reply(128, "");
        let err = Git::open(&runner, dir.path())
            .unwrap()
            .pull("master")
            .unwrap_err();
        assert!(matches!(err, VcsError::Exec(ExecError::NonZero { code: Some(128), .. })));
    }
}
