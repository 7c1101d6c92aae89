//! Headless reminder host.
//!
//! Loads a JSON array of tasks, arms their reminders and shows them through
//! the desktop notifier (or the log when none is installed) until every
//! reminder has fired or Ctrl-C is pressed.
//!
//! All tracing output goes to stderr.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskminder::auth::{AuthProvider, MemoryAuthProvider};
use taskminder::clock::SystemClock;
use taskminder::notify::{self, LogNotifier, Notifier};
use taskminder::store::MemoryTaskStore;
use taskminder::{ReminderScheduler, Task, TaskSession, TaskminderConfig, watch_auth_events};

#[derive(Debug, Default)]
struct Args {
    tasks: PathBuf,
    config: Option<PathBuf>,
    user: Option<String>,
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    run(args).await.map_err(|e| {
        tracing::error!(error = %e, "taskminder-remind exited with error");
        e
    })
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut tasks = None;
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--config" => {
                let path = raw.next().context("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--user" => {
                args.user = Some(raw.next().context("--user requires an id")?);
            }
            "--check" => args.check = true,
            "help" | "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => anyhow::bail!("unknown option `{other}`"),
            other => {
                if tasks.replace(PathBuf::from(other)).is_some() {
                    anyhow::bail!("only one task file may be given");
                }
            }
        }
    }
    match tasks {
        Some(path) => args.tasks = path,
        None if args.check => {}
        None => return Ok(None),
    }
    Ok(Some(args))
}

fn print_usage() {
    println!("usage: taskminder-remind <tasks.json> [--config <path>] [--user <id>]");
    println!("       taskminder-remind --check [--config <path>]");
}

fn load_tasks(path: &Path) -> anyhow::Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse tasks from {}", path.display()))?;
    Ok(tasks)
}

/// The single owner of `tasks`, unless `explicit` picks one.
fn resolve_owner(tasks: &[Task], explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(owner) = explicit {
        return Ok(owner);
    }
    let mut owners = tasks.iter().map(|t| t.user_id.as_str());
    let Some(first) = owners.next() else {
        anyhow::bail!("task file is empty; pass --user to run anyway");
    };
    if owners.any(|o| o != first) {
        anyhow::bail!("task file has several owners; pick one with --user");
    }
    Ok(first.to_owned())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(TaskminderConfig::default_config_path);
    let config = TaskminderConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let platform = notify::create_notifier();
    let notifier: Arc<dyn Notifier> = if platform.is_supported() {
        platform
    } else {
        tracing::info!("no desktop notifier available, reminders go to the log");
        Arc::new(LogNotifier::new())
    };
    if !ReminderScheduler::init_global(ReminderScheduler::new(
        notifier,
        Arc::new(SystemClock),
        config.notifications.clone(),
    )) {
        tracing::warn!("global reminder scheduler was already initialized");
    }
    let scheduler = ReminderScheduler::global().clone();

    if args.check {
        let capabilities = scheduler.capabilities();
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
        return Ok(());
    }

    let tasks = load_tasks(&args.tasks)?;
    let owner = resolve_owner(&tasks, args.user)?;

    let auth = Arc::new(MemoryAuthProvider::new(&config.auth)?);
    let watcher = watch_auth_events(
        auth.subscribe(),
        scheduler.clone(),
        config.notifications.request_permission_on_sign_in,
    );

    if !scheduler.request_permission().await {
        tracing::warn!("notification permission not granted, reminders will not be shown");
    }

    let store = Arc::new(MemoryTaskStore::with_tasks(tasks));
    let mut session = TaskSession::new(
        owner,
        store,
        auth,
        scheduler.clone(),
        config.reminders.clone(),
    );
    let armed = session.load_tasks().await?;
    tracing::info!(owner_id = session.owner_id(), armed, "taskminder-remind started");

    // Idle also covers the last reminder's display, which finishes after
    // its timer has left the pending map.
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("interrupted, cancelling pending reminders");
        }
        () = scheduler.wait_until_idle() => {}
    }

    session.logout().await?;
    watcher.abort();
    tracing::info!("taskminder-remind shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn args(raw: &[&str]) -> anyhow::Result<Option<Args>> {
        parse_args(raw.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_task_file_and_options() {
        let parsed = args(&["tasks.json", "--config", "c.toml", "--user", "u1"])
            .unwrap()
            .unwrap();
        assert_eq!(parsed.tasks, PathBuf::from("tasks.json"));
        assert_eq!(parsed.config, Some(PathBuf::from("c.toml")));
        assert_eq!(parsed.user.as_deref(), Some("u1"));
        assert!(!parsed.check);
    }

    #[test]
    fn missing_task_file_prints_usage() {
        assert!(args(&[]).unwrap().is_none());
        assert!(args(&["--help"]).unwrap().is_none());
        assert!(args(&["--check"]).unwrap().unwrap().check);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn owner_is_inferred_from_single_owner_file() {
        let tasks = vec![Task::new("1", "alice", "a"), Task::new("2", "alice", "b")];
        assert_eq!(resolve_owner(&tasks, None).unwrap(), "alice");

        let mixed = vec![Task::new("1", "alice", "a"), Task::new("2", "bob", "b")];
        assert!(resolve_owner(&mixed, None).is_err());
        assert_eq!(resolve_owner(&mixed, Some("bob".to_owned())).unwrap(), "bob");
        assert!(resolve_owner(&[], None).is_err());
    }

    #[test]
    fn loads_tasks_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id":"t1","user_id":"alice","title":"Call","due_date":"2025-03-10",
                "due_time":"09:00","reminder_minutes":15,"priority":null,"tags":null}]"#,
        )
        .unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].reminder_minutes, Some(15));
        assert!(load_tasks(&dir.path().join("missing.json")).is_err());
    }
}
