//! Tests for the job registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use job_pool::core::{job_fn, BoxedJob, JobRegistry};

fn unit_job(_: ()) -> BoxedJob<()> {
    Box::new(job_fn(|_ctx| async { Ok::<_, anyhow::Error>(()) }))
}

#[test]
fn test_concurrent_register_and_lookup() {
    let registry: Arc<JobRegistry<(), ()>> = Arc::new(JobRegistry::new());
    let mut handles = vec![];

    for i in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            registry.register(format!("job-{i}"), unit_job);
            assert!(registry.contains(&format!("job-{i}")));
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 8);
}

#[test]
fn test_factory_builds_fresh_job_per_call() {
    let registry: JobRegistry<(), ()> = JobRegistry::new();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    registry.register("counted", move |()| -> BoxedJob<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        unit_job(())
    });

    let factory = registry.get("counted").unwrap();
    let _first = factory(());
    let _second = factory(());
    assert_eq!(built.load(Ordering::SeqCst), 2);
}
