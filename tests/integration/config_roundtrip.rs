//! Config persistence through the public API.

use taskminder::TaskminderConfig;

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = TaskminderConfig::default();
    config.notifications.completed_dismiss_secs = 12;
    config.notifications.icon = Some("/usr/share/icons/taskminder.png".to_owned());
    config.reminders.default_reminder_minutes = Some(10);
    config.save_to_file(&path).unwrap();

    let loaded = TaskminderConfig::from_file(&path).unwrap();
    assert_eq!(loaded.notifications.completed_dismiss_secs, 12);
    assert_eq!(
        loaded.notifications.icon.as_deref(),
        Some("/usr/share/icons/taskminder.png")
    );
    assert_eq!(loaded.reminders.default_reminder_minutes, Some(10));
}

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[reminders]\nschedule_completed = true\n").unwrap();

    let loaded = TaskminderConfig::load_or_default(&path).unwrap();
    assert!(loaded.reminders.schedule_completed);
    assert!(loaded.notifications.enabled);
    assert_eq!(loaded.notifications.completed_dismiss_secs, 5);
}

#[test]
fn missing_file_yields_defaults_and_garbage_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = TaskminderConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert!(missing.notifications.request_permission_on_sign_in);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "notifications = 3").unwrap();
    assert!(TaskminderConfig::load_or_default(&bad).is_err());
}
