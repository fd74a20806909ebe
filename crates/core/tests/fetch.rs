use std::sync::Arc;
use std::time::{Duration, Instant};

use symbind_core::services::fetch::{
    fetch_with_timeout, CommandFetcher, DatasetFetcher, FetchError, MirrorFetcher,
};
use tempfile::tempdir;

fn sh(script: &str) -> CommandFetcher {
    CommandFetcher::new("sh", vec!["-c".into(), script.into()])
}

#[test]
fn command_output_is_the_description() {
    let fetcher = sh("printf 'version: \"%s\"\\n' {version}");
    let body = fetcher.fetch("2021.12.01.0000.0000", Duration::from_secs(5)).expect("fetch");
    assert_eq!(body, "version: \"2021.12.01.0000.0000\"\n");
}

#[test]
fn failing_or_silent_commands_are_errors() {
    let err = sh("exit 3").fetch("v1", Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, FetchError::Exit(_)));
    let err = sh("true").fetch("v1", Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, FetchError::Empty));
    let err = CommandFetcher::new("symbind-no-such-program", Vec::new())
        .fetch("v1", Duration::from_secs(5))
        .unwrap_err();
    assert!(matches!(err, FetchError::Spawn { .. }));
}

#[cfg(target_os = "linux")]
#[test]
fn command_outliving_the_timeout_is_killed() {
    let dir = tempdir().expect("tempdir");
    let pid_file = dir.path().join("child.pid");
    let fetcher = sh(&format!("echo $$ > '{}'; exec sleep 30", pid_file.display()));

    let started = Instant::now();
    let err = fetcher.fetch("v1", Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid = std::fs::read_to_string(&pid_file).expect("pid written");
    let proc_entry = std::path::Path::new("/proc").join(pid.trim());
    assert!(!proc_entry.exists(), "child {} still running", pid.trim());
}

#[cfg(target_os = "linux")]
#[test]
fn timed_out_worker_does_not_leave_the_command_running() {
    let dir = tempdir().expect("tempdir");
    let pid_file = dir.path().join("child.pid");
    let fetcher: Arc<dyn DatasetFetcher> =
        Arc::new(sh(&format!("echo $$ > '{}'; exec sleep 30", pid_file.display())));

    let err = fetch_with_timeout(fetcher, "v1", Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)));

    // The worker kills the child shortly after the caller gives up.
    let deadline = Instant::now() + Duration::from_secs(5);
    let pid = loop {
        if let Ok(pid) = std::fs::read_to_string(&pid_file) {
            let proc_entry = std::path::Path::new("/proc").join(pid.trim());
            if !proc_entry.exists() {
                break None;
            }
            if Instant::now() > deadline {
                break Some(pid);
            }
        }
        assert!(Instant::now() <= deadline, "child never started");
        std::thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(pid, None);
}

#[test]
fn mirror_prefers_yml_then_yaml() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("v1.yaml"), "version: v1\n").unwrap();
    std::fs::write(dir.path().join("v2.yml"), "version: v2\n").unwrap();
    std::fs::write(dir.path().join("v2.yaml"), "version: other\n").unwrap();
    std::fs::write(dir.path().join("v3.yml"), "  \n").unwrap();

    let mirror = MirrorFetcher::new(dir.path());
    let timeout = Duration::from_secs(1);
    assert_eq!(mirror.fetch("v1", timeout).unwrap(), "version: v1\n");
    assert_eq!(mirror.fetch("v2", timeout).unwrap(), "version: v2\n");
    assert!(matches!(mirror.fetch("v3", timeout), Err(FetchError::Empty)));
    assert!(matches!(mirror.fetch("v4", timeout), Err(FetchError::NotFound(v)) if v == "v4"));
}
