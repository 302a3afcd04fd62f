//! Integration tests for the process-wide blob endpoint notice.
//!
//! Lives in its own test binary so no other test touches
//! [`BLOB_ENDPOINT_NOTICE`] before these run.

use std::sync::{Arc, Barrier};
use std::thread;

use logging::LogLevel;
use test_support::{RecordingLog, RecordingNotifier};
use transfer::{
    BLOB_ENDPOINT_NOTICE, BLOB_ENDPOINT_NOTICE_TEXT, FromTo, Location, PlanFactory, RemoteUrlSource,
    RouteConfig, RouteResolver, TransferDescriptor,
};

#[test]
fn racing_workers_deliver_one_notice() {
    const WORKERS: usize = 16;

    let notifier = Arc::new(RecordingNotifier::new());
    let resolver = Arc::new(RouteResolver::with_config(
        PlanFactory,
        &RouteConfig::default(),
        notifier.clone(),
    ));
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let descriptor = TransferDescriptor::new(
                    Arc::new(RemoteUrlSource::new(format!("s3://bucket/{worker}.txt"))),
                    format!("https://acct.dfs.core.windows.net/fs/{worker}.txt"),
                    FromTo::new(Location::OtherRemote, Location::BlobFs),
                );
                barrier.wait();
                let plan = resolver
                    .resolve(descriptor, &RecordingLog::new(LogLevel::None))
                    .expect("resolve");
                // The notice is visible as delivered to every caller on return.
                assert!(BLOB_ENDPOINT_NOTICE.has_fired());
                plan.destination
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let destination = handle.join().expect("worker thread");
        assert_eq!(
            destination,
            format!("https://acct.blob.core.windows.net/fs/{worker}.txt")
        );
    }

    assert_eq!(notifier.messages(), [BLOB_ENDPOINT_NOTICE_TEXT]);
}
