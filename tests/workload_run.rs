// tests/workload_run.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, JobConfigBuilder};
use crate::common::{init_tracing, TIMEOUT};

use std::time::Duration;

use taskweave::errors::TaskweaveError;
use taskweave::{TaskScheduler, Workload};

#[test]
fn workload_respects_after_and_waits_for_children() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_threads(3)
        .with_job("read", JobConfigBuilder::new().work_ms(5).build())
        .with_job(
            "parse",
            JobConfigBuilder::new().children(3, 5).after("read").build(),
        )
        .with_job("upload", JobConfigBuilder::new().after("read").build())
        .with_job(
            "link",
            JobConfigBuilder::new().after("parse").after("upload").build(),
        )
        .build();

    let sched = TaskScheduler::new(cfg.scheduler.to_scheduler_config()).unwrap();
    let workload = Workload::from_config(&cfg).unwrap();
    assert_eq!(workload.sinks(), ["link".to_string()]);

    let report = workload.run(&sched, Some(TIMEOUT)).unwrap();

    let seq = |job: &str| {
        let j = report.job(job).unwrap();
        (j.start_seq.unwrap(), j.complete_seq.unwrap())
    };
    let (_, read_done) = seq("read");
    let (parse_start, parse_done) = seq("parse");
    let (upload_start, upload_done) = seq("upload");
    let (link_start, _) = seq("link");

    assert!(read_done < parse_start);
    assert!(read_done < upload_start);
    assert!(parse_done < link_start);
    assert!(upload_done < link_start);
    assert_eq!(report.job("parse").unwrap().children, 3);
    assert_eq!(report.stats.completed, 4 + 3);

    let text = report.to_string();
    assert!(text.contains("jobs (4):"));
    assert!(text.contains("link"));
}

#[test]
fn workload_fails_when_scheduler_is_stopped() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("slow", JobConfigBuilder::new().work_ms(10).build())
        .build();
    let sched = TaskScheduler::with_threads(1).unwrap();
    sched.prepare_quit();

    let workload = Workload::from_config(&cfg).unwrap();
    let err = workload.run(&sched, Some(Duration::from_secs(5))).unwrap_err();
    assert!(matches!(err, TaskweaveError::ShuttingDown));
}

#[test]
fn workload_times_out() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("slow", JobConfigBuilder::new().work_ms(500).build())
        .build();
    let sched = TaskScheduler::with_threads(1).unwrap();

    let workload = Workload::from_config(&cfg).unwrap();
    let err = workload
        .run(&sched, Some(Duration::from_millis(60)))
        .unwrap_err();
    assert!(err.to_string().contains("did not complete"));
}
