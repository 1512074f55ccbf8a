//! End-to-end lifecycle tests: init, run, teardown.

use std::time::{Duration, Instant};

use stagehand::lifecycle::{Application, CleanupTask, DaemonTask, InitTask, Lifetime, Phase};
use tokio::sync::mpsc;

mod common;
use common::*;

fn assert_send<T: Send>(_: T) {}

#[test]
fn test_start_future_is_send() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("one", [init_with_cleanup(&log, "a")])
        .add_daemons([daemon_until_cancelled(&log, "d")])
        .with_config_changed(mpsc::unbounded_channel::<u32>().1, |_| {});

    assert_send(app.start());
}

#[tokio::test]
async fn test_cleanup_runs_in_reverse_stage_order() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("first", [init_with_cleanup(&log, "a")])
        .add_init_stage("second", [init_with_cleanup(&log, "b")])
        .add_init_stage("third", [init_with_cleanup(&log, "c")]);
    let phase = app.phase();

    app.start().await.unwrap();

    assert_eq!(
        log.events(),
        vec!["init:a", "init:b", "init:c", "clean:c", "clean:b", "clean:a"]
    );
    assert_eq!(phase.get(), Phase::Terminated);
    assert!(!phase.failed());
}

#[tokio::test]
async fn test_stages_run_strictly_in_order() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("slow", [init_slow(&log, "slow", Duration::from_millis(100))])
        .add_init_stage("fast", [init_ok(&log, "fast")]);

    app.start().await.unwrap();

    assert_eq!(log.events(), vec!["init:slow", "init:fast"]);
}

#[tokio::test]
async fn test_panic_in_second_stage_cleans_first_once_and_skips_daemons() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_init_stage("two", [init_panicking("exploder", "boom")])
        .add_daemons([daemon_until_cancelled(&log, "d")]);
    let phase = app.phase();

    let err = app.start().await.unwrap_err();

    assert!(err.is_panic());
    assert_eq!(err.task_name(), Some("exploder"));
    assert_eq!(err.to_string(), "exploder() panic: boom");
    assert_eq!(log.count("clean:c1"), 1);
    assert!(!log.contains("start:d"));
    assert_eq!(phase.get(), Phase::Terminated);
    assert!(phase.failed());
}

#[tokio::test]
async fn test_init_failure_names_task_and_cleans_successful_siblings() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("mixed", [init_with_cleanup(&log, "ok"), init_failing("bad", "broken")])
        .add_init_stage("never", [init_ok(&log, "later")]);

    let err = app.start().await.unwrap_err();

    assert_eq!(err.to_string(), "bad(): broken");
    assert_eq!(log.count("clean:ok"), 1);
    assert!(!log.contains("init:later"));
}

#[tokio::test]
async fn test_init_timeout_stops_later_stages() {
    let log = EventLog::new();
    let mut config = test_config();
    config.init_timeout_ms = 100;

    let app = Application::new("flow", config)
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_init_stage(
            "two",
            [init_with_cleanup(&log, "fast"), init_slow(&log, "stuck", Duration::from_secs(5))],
        )
        .add_init_stage("three", [init_with_cleanup(&log, "c3")]);

    let started = Instant::now();
    let err = app.start().await.unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(2));
    // The stage that timed out is cleaned too, before the one entered earlier.
    assert_eq!(
        log.events(),
        vec!["init:c1", "init:fast", "clean:fast", "clean:c1"]
    );
}

#[tokio::test]
async fn test_cleanup_timeout_skips_remaining_stages() {
    let log = EventLog::new();
    let mut config = test_config();
    config.cleanup_timeout_ms = 100;

    let slow_log = log.clone();
    let slow_cleanup = InitTask::new("slow-cleanup", move |_lifetime: Lifetime| async move {
        Ok::<_, std::io::Error>(Some(CleanupTask::new(move |_| async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            slow_log.push("clean:slow");
        })))
    });

    let app = Application::new("flow", config)
        .add_init_stage("one", [init_with_cleanup(&log, "a")])
        .add_init_stage("two", [slow_cleanup]);

    let started = Instant::now();
    app.start().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!log.contains("clean:slow"));
    assert!(!log.contains("clean:a"));
}

#[tokio::test]
async fn test_stop_request_is_clean_exit() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_daemons([daemon_until_cancelled(&log, "d1"), daemon_until_cancelled(&log, "d2")]);
    let stop = app.stop_handle();

    let run = tokio::spawn(app.start());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(stop.request_stop("test"));

    run.await.unwrap().unwrap();

    assert!(log.contains("stop:d1"));
    assert!(log.contains("stop:d2"));
    let stopped = log.position("stop:d1").unwrap();
    assert!(log.position("clean:c1").unwrap() > stopped);
}

#[tokio::test]
async fn test_daemons_completing_ends_run() {
    let log = EventLog::new();
    let app = Application::new("flow", test_config())
        .add_init_stage("one", [init_with_cleanup(&log, "c1")])
        .add_daemons([DaemonTask::new("brief", |_lifetime: Lifetime| async {
            Ok::<_, std::io::Error>(())
        })]);

    app.start().await.unwrap();

    assert_eq!(log.count("clean:c1"), 1);
}

#[tokio::test]
async fn test_config_changes_reach_listener() {
    let log = EventLog::new();
    let (tx, rx) = mpsc::unbounded_channel::<u32>();
    tx.send(1).unwrap();
    tx.send(2).unwrap();

    let listener_log = log.clone();
    let app = Application::new("flow", test_config())
        .add_daemons([DaemonTask::new("wait", |_lifetime: Lifetime| async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok::<_, std::io::Error>(())
        })])
        .with_config_changed(rx, move |version| listener_log.push(format!("config:{version}")));

    app.start().await.unwrap();

    assert_eq!(log.events(), vec!["config:1", "config:2"]);
    drop(tx);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_config_listener_does_not_delay_shutdown() {
    let log = EventLog::new();
    let (tx, rx) = mpsc::unbounded_channel::<u32>();

    let listener_log = log.clone();
    let app = Application::new("flow", test_config())
        .add_daemons([daemon_until_cancelled(&log, "d")])
        .with_config_changed(rx, move |version| {
            listener_log.push(format!("config:{version}"));
            std::thread::sleep(Duration::from_secs(2));
        });
    let stop = app.stop_handle();

    let run = tokio::spawn(app.start());
    tx.send(1).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(log.contains("config:1"));

    let stopped = Instant::now();
    stop.request_stop("test");
    run.await.unwrap().unwrap();

    // forced close is 200ms in the test config
    assert!(stopped.elapsed() < Duration::from_secs(1));
    assert!(log.contains("stop:d"));
}
