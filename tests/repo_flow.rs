use chrono::{NaiveDateTime, NaiveTime};
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;
use delivery::engine::repo::{RunRepo, TaskRepo};
use delivery::engine::schedule::compute_next_run;
use delivery::engine::state::{derive_state, DerivedStatus};
use delivery::engine::types::{Frequency, Recurrence, RunStatus, ScheduleRule, TaskStatus};
use tempfile::TempDir;

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn setup() -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let config = Config::new(dir.path().join("data"));
    Db::init(&config).unwrap();
    (dir, config)
}

#[test]
fn connect_requires_init() {
    let dir = TempDir::new().unwrap();
    let config = Config::new(dir.path().join("missing"));
    let err = Db::connect(&config).unwrap_err();
    assert!(err.to_string().contains("delivery init"));
}

#[test]
fn schedule_rule_round_trips_through_sqlite() {
    let (_dir, config) = setup();
    let conn = Db::connect(&config).unwrap();
    let repo = TaskRepo::new(&conn);

    let rule = ScheduleRule::recurring(Recurrence {
        time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        frequency: Frequency::Monthly,
        start_date: None,
        end_date: None,
    });
    let id = repo.add("Monthly report", Some("for partners"), &rule).unwrap();

    let task = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(task.schedule, rule);
    assert_eq!(task.status, TaskStatus::Draft);
    assert_eq!(task.run_count, 0);
    assert!(task.latest_run.is_none());
}

#[test]
fn enabling_recurring_task_caches_next_run() {
    let (_dir, config) = setup();
    let conn = Db::connect(&config).unwrap();
    let repo = TaskRepo::new(&conn);
    let now = at("2026-03-10 10:00");

    let rule = ScheduleRule::recurring(Recurrence {
        time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        frequency: Frequency::Daily,
        start_date: None,
        end_date: None,
    });
    let id = repo.add("Daily leads", None, &rule).unwrap();

    let task = repo.find_by_id(id).unwrap().unwrap();
    assert!(derive_state(&task, now).can_enable);

    let next = compute_next_run(&task.schedule, TaskStatus::Active, now);
    repo.update_status(id, TaskStatus::Active, next).unwrap();

    let task = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(task.next_run_at, Some(at("2026-03-11 09:00")));
    let state = derive_state(&task, now);
    assert_eq!(state.status, DerivedStatus::Active);
    assert!(!state.can_enable);

    repo.update_status(id, TaskStatus::Paused, None).unwrap();
    let task = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(task.next_run_at, None);
    assert_eq!(derive_state(&task, now).status, DerivedStatus::Paused);
}

#[test]
fn one_time_run_locks_task_until_duplicated() {
    let (_dir, config) = setup();
    let mut conn = Db::connect(&config).unwrap();
    let started = at("2026-03-10 10:00");

    let id = TaskRepo::new(&conn)
        .add("Launch email", None, &ScheduleRule::immediate())
        .unwrap();

    let (_, run_id) = ops::start_run(&mut conn, "Launch email", true, started).unwrap();

    let task = TaskRepo::new(&conn).find_by_id(id).unwrap().unwrap();
    let state = derive_state(&task, at("2026-03-10 10:02"));
    assert_eq!(state.status, DerivedStatus::Running);
    assert!(!state.can_run_now);

    let finished = ops::finish_run(
        &mut conn,
        run_id,
        RunStatus::Success,
        None,
        at("2026-03-10 10:03"),
    )
    .unwrap();
    assert_eq!(finished.task.status, TaskStatus::Completed);
    assert_eq!(finished.next_run_at, None);

    let repo = TaskRepo::new(&conn);
    let runs = RunRepo::new(&conn);
    let task = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(task.run_count, 1);
    let state = derive_state(&task, at("2026-03-10 11:00"));
    assert_eq!(state.status, DerivedStatus::Completed);
    assert!(!state.can_enable && !state.can_run_now);

    assert!(runs
        .finish(run_id, RunStatus::Failed, at("2026-03-10 11:00"), None)
        .is_err());

    let copy_id = repo.duplicate(&task).unwrap();
    let copy = repo.find_by_id(copy_id).unwrap().unwrap();
    assert_eq!(copy.name, "Launch email (copy)");
    assert_eq!(copy.run_count, 0);
    assert_eq!(copy.status, TaskStatus::Draft);
    assert!(derive_state(&copy, at("2026-03-10 11:00")).can_run_now);

    let second = repo.duplicate(&task).unwrap();
    assert_eq!(
        repo.find_by_id(second).unwrap().unwrap().name,
        "Launch email (copy 2)"
    );
}

#[test]
fn abandoned_run_is_treated_as_failed() {
    let (_dir, config) = setup();
    let conn = Db::connect(&config).unwrap();
    let repo = TaskRepo::new(&conn);
    let started = at("2026-03-10 10:00");

    let id = repo
        .add("Reminder", None, &ScheduleRule::immediate())
        .unwrap();
    RunRepo::new(&conn).start(id, started).unwrap();
    repo.record_run_start(id, started).unwrap();

    let task = repo.find_by_id(id).unwrap().unwrap();
    let now = at("2026-03-10 10:10");
    assert_eq!(task.observed_run_status(now), Some(RunStatus::Failed));

    let state = derive_state(&task, now);
    assert_eq!(state.status, DerivedStatus::Failed);
    assert!(!state.can_run_now);
}

#[test]
fn global_history_is_newest_first_and_remove_cascades() {
    let (_dir, config) = setup();
    let conn = Db::connect(&config).unwrap();
    let repo = TaskRepo::new(&conn);
    let runs = RunRepo::new(&conn);

    let a = repo.add("A", None, &ScheduleRule::immediate()).unwrap();
    let b = repo.add("B", None, &ScheduleRule::immediate()).unwrap();
    runs.start(a, at("2026-03-01 09:00")).unwrap();
    runs.start(b, at("2026-03-02 09:00")).unwrap();

    let history = runs.get_global_history(10).unwrap();
    let names: Vec<_> = history.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["B", "A"]);

    repo.remove(b).unwrap();
    assert!(repo.find_by_id(b).unwrap().is_none());
    assert!(runs.get_history(b).unwrap().is_empty());
    assert_eq!(runs.get_global_history(10).unwrap().len(), 1);
}
