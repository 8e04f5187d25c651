use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use xcron::{watch, Job, Schedule, ScheduleError, SearchState};

fn schedule(expr: &str) -> Arc<Schedule> {
    Arc::new(Schedule::parse(expr).unwrap())
}

#[tokio::test]
async fn test_watch_emits_found() {
    let mut rx = watch(schedule("* * * * * * *"), CancellationToken::new());
    let next = timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("no notification within 3s")
        .expect("channel closed");
    assert_eq!(next.state, SearchState::Found);
    assert!(next.time.is_some());
}

#[tokio::test]
async fn test_watch_emits_increasing_times() {
    let mut rx = watch(schedule("* * * * * * *"), CancellationToken::new());
    let first = timeout(Duration::from_secs(3), rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(3), rx.recv()).await.unwrap().unwrap();
    assert!(second.time.unwrap() > first.time.unwrap());
}

#[tokio::test]
async fn test_watch_once() {
    let mut rx = watch(schedule("@reboot"), CancellationToken::new());
    let next = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(next.state, SearchState::OnceExec);
    assert!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_watch_no_matches() {
    let mut rx = watch(schedule("0 0 0 1 1 ? 1970"), CancellationToken::new());
    let next = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(next.state, SearchState::NoMatches);
    assert!(next.time.is_none());
    assert!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_watch_cancelled() {
    let shutdown = CancellationToken::new();
    let mut rx = watch(schedule("0 0 0 1 1 ? 2099"), shutdown.clone());
    shutdown.cancel();
    let closed = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_job_stops_on_cancel() {
    let job = Job::new(schedule("0 0 0 1 1 ? 2099"), "true").unwrap();
    let shutdown = CancellationToken::new();
    let handle = job.spawn(shutdown.clone());
    shutdown.cancel();
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("job did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_job_returns_when_schedule_exhausted() {
    let job = Job::new(schedule("0 0 0 1 1 ? 1970"), "true").unwrap();
    timeout(Duration::from_secs(1), job.run(CancellationToken::new()))
        .await
        .expect("job did not finish");
}

#[cfg(unix)]
#[tokio::test]
async fn test_once_job_stops_on_cancel() {
    let job = Job::new(schedule("@reboot"), "sleep 5").unwrap();
    let shutdown = CancellationToken::new();
    let handle = job.spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("run-once job kept waiting after cancel")
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_once_job_runs_command_and_returns() {
    let marker = std::env::temp_dir().join(format!("xcron-once-{}", std::process::id()));
    let _ = std::fs::remove_file(&marker);

    let job = Job::new(schedule("@reboot"), &format!("touch {}", marker.display())).unwrap();
    timeout(Duration::from_secs(3), job.run(CancellationToken::new()))
        .await
        .expect("run-once job did not return");

    assert!(marker.exists());
    let _ = std::fs::remove_file(&marker);
}

#[test]
fn test_bind_empty_command() {
    let err = Schedule::parse("@daily").unwrap().bind("").unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidCommand { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_job_fires_command() {
    let marker = std::env::temp_dir().join(format!("xcron-job-{}", std::process::id()));
    let _ = std::fs::remove_file(&marker);

    let job = Job::new(
        schedule("* * * * * * *"),
        &format!("touch {}", marker.display()),
    )
    .unwrap();
    let shutdown = CancellationToken::new();
    let handle = job.spawn(shutdown.clone());

    let mut fired = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if marker.exists() {
            fired = true;
            break;
        }
    }
    shutdown.cancel();
    handle.await.unwrap();
    let _ = std::fs::remove_file(&marker);
    assert!(fired, "command never ran");
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_command_keeps_job_running() {
    let job = Job::new(schedule("* * * * * * *"), "false").unwrap();
    let shutdown = CancellationToken::new();
    let handle = job.spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!handle.is_finished());
    shutdown.cancel();
    handle.await.unwrap();
}
