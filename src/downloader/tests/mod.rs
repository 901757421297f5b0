use super::*;
use crate::config::Config;
use crate::error::Error;
use crate::scheduler::TaskScheduler;


fn started_scheduler(workers: usize) -> TaskScheduler {
    let mut scheduler = TaskScheduler::new();
    scheduler.start(workers).unwrap();
    scheduler
}

#[test]
fn test_from_config_selects_backend() {
    let scheduler = TaskScheduler::new();
    let handle = scheduler.handle();

    let mut config = Config::default().download;
    assert_eq!(Downloader::from_config(&handle, &config).backend().name(), "builtin");

    config.backend = BackendKind::Curl;
    assert_eq!(Downloader::from_config(&handle, &config).backend().name(), "curl");

    config.backend = BackendKind::Aria2;
    assert_eq!(Downloader::from_config(&handle, &config).backend().name(), "aria2");
}

#[test]
fn test_download_uses_configured_ttl() {
    let scheduler = TaskScheduler::new();
    let config = DownloadConfig {
        ttl: 5,
        ..Default::default()
    };
    let downloader = Downloader::from_config(&scheduler.handle(), &config);
    assert_eq!(downloader.dl.options().ttl_value(), 5);
    assert_eq!(downloader.dl.options().priority_value().as_str(), "A");
}

#[test]
fn test_unusable_backend_submits_nothing() {
    let scheduler = started_scheduler(1);
    let config = DownloadConfig {
        backend: BackendKind::Curl,
        curl_path: None,
        search_path: false,
        ..Default::default()
    };
    let downloader = Downloader::from_config(&scheduler.handle(), &config);

    let err = downloader
        .download(&[DlTask::new("https://example.com/a", "a")])
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_empty_download_list() {
    let scheduler = started_scheduler(2);
    let downloader = Downloader::new(
        &scheduler.handle(),
        Arc::new(BuiltinBackend::default()),
        3,
    );
    assert!(downloader.download(&[]).unwrap().is_empty());
}

#[test]
fn test_dl_task_serializes_as_url_and_filename() {
    let task = DlTask::new("https://example.com/x.pdf", "out/x.pdf");
    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"url": "https://example.com/x.pdf", "filename": "out/x.pdf"})
    );
}

#[cfg(unix)]
#[test]
fn test_non_utf8_target_is_rejected_before_submitting() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let scheduler = started_scheduler(1);
    let downloader = Downloader::new(
        &scheduler.handle(),
        Arc::new(BuiltinBackend::default()),
        1,
    );
    let dir = tempfile::tempdir().unwrap();
    let bad_target = dir.path().join(OsStr::from_bytes(b"bad\xff.bin"));
    let tasks = [
        DlTask::new("http://127.0.0.1:1/ok", dir.path().join("ok.bin")),
        DlTask::new("http://127.0.0.1:1/x", &bad_target),
    ];

    let err = downloader.download(&tasks).unwrap_err();
    match err {
        Error::InvalidTarget(path) => assert_eq!(path, bad_target),
        other => panic!("expected invalid target error, got {other:?}"),
    }
    assert_eq!(scheduler.pending(), 0);
    assert!(scheduler.wait().is_empty());
}
