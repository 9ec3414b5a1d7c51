//! Preview sink ownership across threads and sessions.

use camera_session::testing::{FakeBackend, RecordingSink, ReleaseLog};
use camera_session::{CameraSession, Handoff, PreviewSink, ReleaseContext, SessionConfig};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_shared_release_context_serves_several_sessions() {
    let release = ReleaseContext::spawn("shared-preview-release").unwrap();
    let log = ReleaseLog::new();

    for _ in 0..2 {
        let (backend, probe) = FakeBackend::new();
        probe.fail_session_creation(true);
        let session = CameraSession::builder(SessionConfig::standard(), backend)
            .release_context(release.clone())
            .spawn()
            .unwrap();
        session.attach_preview_view(RecordingSink::tracked(&log));
    }

    assert!(log.wait_for(2, WAIT).await);
    for thread in log.releases() {
        assert_eq!(thread.as_deref(), Some("shared-preview-release"));
    }
}

#[tokio::test]
async fn test_replaced_sink_is_released_once() {
    let (backend, _probe) = FakeBackend::new();
    let session = CameraSession::new(SessionConfig::standard(), backend).unwrap();
    let log = ReleaseLog::new();

    session.attach_preview_node(RecordingSink::tracked(&log));
    session.attach_preview_node(RecordingSink::new());
    assert_eq!(session.flush().await, Some(()));

    assert_eq!(log.count(), 1);
}

#[test]
fn test_handoff_dropped_on_foreign_thread_is_released_on_fallback() {
    let release = ReleaseContext::spawn("handoff-fallback").unwrap();
    let log = ReleaseLog::new();
    let sink: Arc<dyn PreviewSink> = RecordingSink::tracked(&log);
    let handoff = Handoff::new(sink, release.clone());

    std::thread::Builder::new()
        .name("unrelated-worker".to_string())
        .spawn(move || drop(handoff))
        .unwrap()
        .join()
        .unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    assert!(runtime.block_on(log.wait_for(1, WAIT)));
    assert_eq!(log.releases(), vec![Some(release.thread_name().to_string())]);
}
