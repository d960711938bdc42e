// tests/scheduler.rs

//! Dependency scheduling of pod members.

mod common;

use common::{FakeEngine, batch_prompter, container, test_config};
use podshift::engine::ContainerRecord;
use podshift::{
    ContainerDescriptor, DependencyScheduler, Error, MigrationPipeline, MigrationSession, Status,
};

fn abc() -> Vec<ContainerRecord> {
    vec![
        container("a", "img-a", &[]),
        container("b", "img-b", &["--requires", "a"]),
        container("c", "img-c", &["--requires=a,b"]),
    ]
}

fn schedule(
    engine: &mut FakeEngine,
    records: Vec<ContainerRecord>,
) -> podshift::Result<podshift::migrate::ScheduleReport> {
    let (_dir, config) = test_config();
    let mut prompter = batch_prompter();
    for record in &records {
        engine.add_container(record.clone());
    }

    let descriptors: Vec<ContainerDescriptor> = records.into_iter().map(Into::into).collect();
    let mut session = MigrationSession::new();
    let mut pipeline = MigrationPipeline::new(engine, &mut prompter, &config);
    DependencyScheduler::new().run(&mut pipeline, &mut session, descriptors)
}

#[test]
fn test_dependency_order_for_every_input_order() {
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let records = abc();
        let input: Vec<ContainerRecord> = order.iter().map(|&i| records[i].clone()).collect();

        let mut engine = FakeEngine::new();
        let report = schedule(&mut engine, input).unwrap();

        assert_eq!(report.order, vec!["a", "b", "c"], "input order {:?}", order);
        assert_eq!(engine.created, vec!["a", "b", "c"], "input order {:?}", order);
    }
}

#[test]
fn test_cycle_reports_no_progress() {
    let mut engine = FakeEngine::new();
    let err = schedule(
        &mut engine,
        vec![
            container("x", "img", &["--requires", "y"]),
            container("y", "img", &["--requires", "x"]),
        ],
    )
    .unwrap_err();

    match err {
        Error::NoProgressError(msg) => {
            assert!(msg.contains("x (requires y)"), "{}", msg);
            assert!(msg.contains("y (requires x)"), "{}", msg);
        }
        other => panic!("expected NoProgressError, got {:?}", other),
    }
    assert!(engine.created.is_empty());
}

#[test]
fn test_container_without_requires_migrated_once() {
    let mut engine = FakeEngine::new();
    let report = schedule(&mut engine, vec![container("solo", "img", &[])]).unwrap();

    assert_eq!(report.order, vec!["solo"]);
    assert_eq!(report.passes, 1);
    assert_eq!(engine.create_attempts, vec!["solo"]);
}

#[test]
fn test_requirement_outside_pod_is_fatal_unless_present() {
    let mut engine = FakeEngine::new();
    let err = schedule(
        &mut engine,
        vec![container("web", "img", &["--requires", "external"])],
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoProgressError(_)));

    let mut engine = FakeEngine::new();
    engine.remote_containers.push("external".to_string());
    let report = schedule(
        &mut engine,
        vec![container("web", "img", &["--requires", "external"])],
    )
    .unwrap();
    assert_eq!(report.order, vec!["web"]);
}

#[test]
fn test_removal_is_by_exact_name() {
    let mut engine = FakeEngine::new();
    let report = schedule(
        &mut engine,
        vec![
            container("web", "img", &["--requires", "db"]),
            container("db2", "img", &[]),
            container("db", "img", &[]),
        ],
    )
    .unwrap();

    assert_eq!(report.order, vec!["db", "web", "db2"]);
    assert_eq!(engine.created.len(), 3);
}

#[test]
fn test_blocked_container_resumes_at_create() {
    let mut engine = FakeEngine::new();
    let report = schedule(
        &mut engine,
        vec![
            container("c", "img-c", &["--requires", "b"]),
            container("b", "img-b", &["--requires", "a"]),
            container("a", "img-a", &[]),
        ],
    )
    .unwrap();

    assert_eq!(report.order, vec!["a", "b", "c"]);
    // b was tried before a existed, then retried
    assert_eq!(
        engine.create_attempts.iter().filter(|n| *n == "b").count(),
        2
    );
    // but its image was only synced on the first attempt
    assert_eq!(
        engine.image_queries.iter().filter(|i| *i == "img-b").count(),
        1
    );
}

#[test]
fn test_pipeline_marks_descriptor_status() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    let record = container("db", "postgres", &[]);
    engine.add_container(record.clone());

    let mut prompter = batch_prompter();
    let mut session = MigrationSession::new();
    let mut descriptor = ContainerDescriptor::from(record);
    assert_eq!(descriptor.status, Status::Pending);

    let mut pipeline = MigrationPipeline::new(&mut engine, &mut prompter, &config);
    pipeline
        .migrate(
            &mut session,
            &mut descriptor,
            podshift::migrate::Invocation::Standalone,
        )
        .unwrap();
    assert_eq!(descriptor.status, Status::Migrated);

    // a migrated container is never migrated again
    assert!(
        pipeline
            .migrate(
                &mut session,
                &mut descriptor,
                podshift::migrate::Invocation::Standalone
            )
            .is_err()
    );
    drop(pipeline);
    assert_eq!(engine.created, vec!["db"]);
}
