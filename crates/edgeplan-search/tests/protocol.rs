//! Coordination protocol integration tests.
//!
//! These run the real tasks in-process: the barrier scenario (the
//! coordinator must not merge before both lanes publish), the forced
//! handoff scenario (a worker retires before its next search step and the
//! flag resets on consumption), seeded monotonicity, and the end-to-end
//! convergence scenario on the two-node reference cluster.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use edgeplan_fitness::Evaluator;
use edgeplan_model::{ClusterModel, NodeSpec, ServiceSpec};
use edgeplan_search::{
    Algorithm, CoordinationContext, Coordinator, Driver, Lane, ParetoFront, PsoWorker,
    SearchConfig, Transform, WorkerEvent, WorkerLinks,
};
use edgeplan_trace::{Span, Trace, TraceSet};

/// Two nodes (edge, cloud), one service, one single-span trace:
/// edge time 100µs, cloud time 50µs, no network delay.
fn reference_evaluator() -> Arc<Evaluator> {
    let model = Arc::new(
        ClusterModel::new(
            vec![
                NodeSpec {
                    id: "edge".into(),
                    cpu: 5,
                    memory: 100,
                },
                NodeSpec {
                    id: "cloud".into(),
                    cpu: 5,
                    memory: 100,
                },
            ],
            vec![ServiceSpec {
                id: "svc".into(),
                cpu: 1,
                memory: 1,
            }],
            "cloud",
            &[],
        )
        .unwrap(),
    );
    let traces = TraceSet {
        data: vec![Trace {
            trace_id: "t1".into(),
            duration: 100,
            spans: vec![Span {
                span_id: "s1".into(),
                operation_name: "op".into(),
                service_name: "svc".into(),
                parent_service: None,
                start_time: 0,
                duration: 100,
            }],
        }],
    };
    let edge = HashMap::from([(
        "svc".to_string(),
        HashMap::from([("op".to_string(), 100u64)]),
    )]);
    let cloud = HashMap::from([(
        "svc".to_string(),
        HashMap::from([("op".to_string(), 50u64)]),
    )]);
    Arc::new(Evaluator::new(model, &traces, &edge, &cloud).with_network_delay(0.0))
}

fn config(population: usize, iterations: u64, seed: u64) -> SearchConfig {
    SearchConfig {
        population,
        max_iterations: iterations,
        seed: Some(seed),
        ..SearchConfig::default()
    }
}

#[tokio::test]
async fn coordinator_blocks_until_both_lanes_publish() {
    let ctx = Arc::new(CoordinationContext::new());
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let (next_tx, next_rx) = watch::channel(0u64);
    let cfg = config(4, 3, 1);

    let coordinator = Coordinator::new(ctx.clone(), &cfg, events_tx, next_rx);
    let handle = tokio::spawn(coordinator.run());

    let mut merge_rx = ctx.subscribe_merge();

    // One lane publishes; the other is deliberately delayed. No merged
    // front may appear for the iteration.
    ctx.publish_front(Lane::Pso, ParetoFront::new(), 1).await;
    let blocked = timeout(Duration::from_millis(100), merge_rx.wait_for(|v| *v >= 1)).await;
    assert!(blocked.is_err(), "coordinator merged before both lanes published");
    drop(blocked);
    assert!(!ctx.is_ready().await);

    // The delayed lane publishes; the merge must now happen.
    ctx.publish_front(Lane::Gwo, ParetoFront::new(), 1).await;
    timeout(Duration::from_secs(2), merge_rx.wait_for(|v| *v >= 1))
        .await
        .expect("merge did not happen after both publishes")
        .unwrap();
    assert!(ctx.is_ready().await);

    // Let the coordinator run out its budget and shut down cleanly.
    for iteration in 1..=3u64 {
        ctx.publish_front(Lane::Pso, ParetoFront::new(), iteration).await;
        ctx.publish_front(Lane::Gwo, ParetoFront::new(), iteration).await;
        next_tx.send_replace(iteration);
    }
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("coordinator did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn forced_transform_retires_the_pso_worker() {
    let ctx = Arc::new(CoordinationContext::new());
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (_next_tx, next_rx) = watch::channel(0u64);
    let population = 8;
    let cfg = Arc::new(config(population, 10, 7));

    let links = WorkerLinks {
        ctx: ctx.clone(),
        merge_rx: ctx.subscribe_merge(),
        next_rx,
        events: events_tx,
    };
    let worker = PsoWorker::new(
        Lane::Pso,
        cfg,
        reference_evaluator(),
        links,
        ChaCha8Rng::seed_from_u64(7),
    );
    let handle = tokio::spawn(worker.run());

    // Play the coordinator: wait for the publish, force the flag, merge.
    let mut publish_rx = ctx.subscribe_publish(Lane::Pso);
    timeout(Duration::from_secs(2), publish_rx.wait_for(|v| *v >= 1))
        .await
        .expect("worker did not publish")
        .unwrap();

    assert!(ctx.request_transform(Algorithm::Gwo).await);
    let (pso_front, _) = ctx.lane_fronts().await;
    ctx.complete_merge(pso_front, 1).await;

    // The worker must emit a handoff with half its population and stop —
    // no search step, no publish for the next iteration.
    let event = timeout(Duration::from_secs(2), events_rx.recv())
        .await
        .expect("no event from the worker")
        .expect("event channel closed");
    match event {
        WorkerEvent::Handoff {
            lane,
            iteration,
            target,
            particles,
        } => {
            assert_eq!(lane, Lane::Pso);
            assert_eq!(iteration, 1);
            assert_eq!(target, Algorithm::Gwo);
            assert_eq!(particles.len(), population / 2);
        }
        other => panic!("expected a handoff, got {other:?}"),
    }

    // The flag reads none immediately after being consumed.
    assert_eq!(ctx.transform().await, Transform::None);

    // Retired: the worker completed and never published iteration 2.
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker did not stop after the handoff")
        .unwrap()
        .unwrap();
    assert!(*publish_rx.borrow() < 2);
    assert!(events_rx.try_recv().is_err());
}

#[tokio::test]
async fn seeded_run_reports_monotone_best_scores() {
    let evaluator = reference_evaluator();
    let outcome = Driver::new(evaluator, config(6, 15, 11))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.history.len(), 15);
    for pair in outcome.history.windows(2) {
        assert!(
            pair[1].best_score <= pair[0].best_score,
            "best score rose between iterations: {pair:?}"
        );
    }
}

#[tokio::test]
async fn converges_to_the_all_cloud_placement() {
    let evaluator = reference_evaluator();
    let outcome = Driver::new(evaluator.clone(), config(10, 40, 23))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.score, 50.0);
    let cloud = evaluator.model().cloud_node_index();
    let total = outcome.solution.service_total(0);
    assert!(total > 0);
    assert_eq!(outcome.solution.get(cloud, 0), total);
}

#[tokio::test]
async fn run_writes_progress_and_artifact() {
    let dir = std::env::temp_dir();
    let progress = dir.join(format!("edgeplan-test-progress-{}.csv", std::process::id()));
    let artifact = dir.join(format!("edgeplan-test-plan-{}.json", std::process::id()));
    std::fs::remove_file(&progress).ok();
    std::fs::remove_file(&artifact).ok();

    let evaluator = reference_evaluator();
    let outcome = Driver::new(evaluator.clone(), config(6, 8, 3))
        .with_progress_log(&progress)
        .with_artifact(&artifact)
        .run()
        .await
        .unwrap();

    let log = std::fs::read_to_string(&progress).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "iteration,bestScore");
    assert_eq!(lines.len(), 1 + 8);

    let plan: std::collections::BTreeMap<String, std::collections::BTreeMap<String, u32>> =
        serde_json::from_str(&std::fs::read_to_string(&artifact).unwrap()).unwrap();
    let from_artifact: u32 = plan.values().flat_map(|row| row.values()).sum();
    assert_eq!(from_artifact, outcome.solution.total());

    std::fs::remove_file(&progress).ok();
    std::fs::remove_file(&artifact).ok();
}

#[tokio::test]
async fn handoff_mid_run_completes_the_budget() {
    // A one-iteration threshold makes the coordinator request a handoff as
    // soon as the displacement imbalance leans one way; the run must still
    // finish its budget and produce a plan.
    let evaluator = reference_evaluator();
    let cfg = SearchConfig {
        switch_threshold: Some(1),
        ..config(8, 25, 13)
    };
    let outcome = Driver::new(evaluator, cfg).run().await.unwrap();

    assert_eq!(outcome.history.len(), 25);
    assert!(outcome.score <= 100.0);
}
