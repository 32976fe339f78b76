//! End-to-end run scenarios against scripted nodes.
//!
//! Time is paused, so minutes of cluster behaviour run instantly.

use std::sync::Arc;
use std::time::Duration;

use finality_core::{NodeRegistry, RunReport};
use finality_types::{BlockId, StatusValue, TrxLocation, Verdict};
use finality_watcher::{spawn_run, MockNodeApi, MockSubmitter, Resolution, RunParams, Schedule};
use tokio::sync::oneshot;
use tokio::time::Instant;

const NODES: [&str; 4] = [
    "http://10.0.0.1:8888",
    "http://10.0.0.2:8888",
    "http://10.0.0.3:8888",
    "http://10.0.0.4:8888",
];

fn params(nodes: &[&str], amount: u32, freq_secs: u64) -> RunParams {
    RunParams {
        nodes: NodeRegistry::new(nodes.iter().copied()).unwrap(),
        amount,
        freq: Duration::from_secs(freq_secs),
        submit_url: "http://127.0.0.1:8888".into(),
        users: None,
        debug: None,
    }
}

fn start(
    api: &MockNodeApi,
    submitter: &MockSubmitter,
    params: RunParams,
) -> oneshot::Receiver<RunReport> {
    let (_handle, rx) = spawn_run(
        Arc::new(api.clone()),
        Arc::new(submitter.clone()),
        Schedule::default(),
        params,
    );
    rx
}

fn located(block_num: u64, block_id: &str) -> Resolution {
    Resolution::Located(TrxLocation {
        block_num,
        block_id: BlockId::new(block_id),
        trx_id: "trx".into(),
    })
}

#[tokio::test(start_paused = true)]
async fn four_nodes_agree_and_finalize() {
    let api = MockNodeApi::new();
    for node in NODES {
        api.set_chain_info(node, 105);
        api.locate_all(node, 100, "0064");
    }
    let submitter = MockSubmitter::new();
    let started = Instant::now();

    let report = start(&api, &submitter, params(&NODES, 1, 1)).await.unwrap();

    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(report.diagnosis, None);
    assert_eq!(report.progress.finalized, 1);
    // Within two polling cycles.
    assert!(started.elapsed() <= Duration::from_secs(2));
    assert_eq!(submitter.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn never_packed_with_one_silent_node() {
    let api = MockNodeApi::new();
    for node in &NODES[..3] {
        api.set_chain_info(node, 105);
        api.reject_all(node);
    }
    api.set_unreachable(NODES[3], true);
    let started = Instant::now();

    let report = start(&api, &MockSubmitter::new(), params(&NODES, 1, 1))
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::NeverPacked);
    assert!(started.elapsed() > Duration::from_secs(20));

    let diagnosis = report.diagnosis.unwrap();
    assert!(diagnosis.age_secs > 20);
    assert_eq!(diagnosis.nodes.len(), 4);
    assert!(diagnosis.nodes[..3]
        .iter()
        .all(|n| n.status == StatusValue::Rejected));
    assert_eq!(diagnosis.nodes[3].status, StatusValue::Unknown);
}

#[tokio::test(start_paused = true)]
async fn fork_is_reported_immediately() {
    let nodes = &NODES[..3];
    let api = MockNodeApi::new();
    for node in nodes {
        api.set_chain_info(node, 40);
        api.locate_all(node, 50, "a");
    }
    let submitter = MockSubmitter::new();
    let rx = start(&api, &submitter, params(nodes, 1, 1));

    tokio::time::sleep(Duration::from_secs(3)).await;
    let id = submitter.correlation_ids()[0];
    api.set_resolution(nodes[2], id, located(51, "b"));
    let switched = Instant::now();

    let report = rx.await.unwrap();
    assert_eq!(report.verdict, Verdict::Forked);
    // Well before the soft deadline.
    assert!(switched.elapsed() <= Duration::from_secs(2));

    let diagnosis = report.diagnosis.unwrap();
    assert_eq!(diagnosis.correlation_id, id);
    assert_eq!(
        diagnosis.nodes[2].status.location().map(|(n, _)| n),
        Some(51)
    );
}

#[tokio::test(start_paused = true)]
async fn fork_past_frontier_is_not_success() {
    let nodes = &NODES[..2];
    let api = MockNodeApi::new();
    api.set_chain_info(nodes[0], 100);
    api.set_chain_info(nodes[1], 100);
    api.locate_all(nodes[0], 50, "aaaa");
    api.locate_all(nodes[1], 50, "bbbb");
    let started = Instant::now();

    let report = start(&api, &MockSubmitter::new(), params(nodes, 1, 1))
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::Forked);
    assert_eq!(report.progress.finalized, 0);
    assert!(started.elapsed() <= Duration::from_secs(2));
    assert_eq!(report.diagnosis.unwrap().nodes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rolled_back_after_everyone_forgets() {
    let nodes = &NODES[..3];
    let api = MockNodeApi::new();
    for node in nodes {
        api.set_chain_info(node, 40);
        api.locate_all(node, 50, "a");
    }
    let rx = start(&api, &MockSubmitter::new(), params(nodes, 1, 1));

    tokio::time::sleep(Duration::from_secs(3)).await;
    for node in nodes {
        api.reject_all(node);
    }

    let report = rx.await.unwrap();
    assert_eq!(report.verdict, Verdict::RolledBack);
    assert!(report.diagnosis.unwrap().nodes.iter().all(|n| n.ever_located));
}

#[tokio::test(start_paused = true)]
async fn stuck_below_frontier_times_out() {
    let nodes = &NODES[..2];
    let api = MockNodeApi::new();
    for node in nodes {
        api.set_chain_info(node, 10);
        api.locate_all(node, 50, "a");
    }
    let started = Instant::now();

    let report = start(&api, &MockSubmitter::new(), params(nodes, 1, 1))
        .await
        .unwrap();

    assert_eq!(report.verdict, Verdict::TimedOut);
    assert!(started.elapsed() > Duration::from_secs(200));
}

#[tokio::test(start_paused = true)]
async fn frontier_catching_up_finalizes() {
    let nodes = &NODES[..2];
    let api = MockNodeApi::new();
    for node in nodes {
        api.set_chain_info(node, 10);
        api.locate_all(node, 50, "a");
    }
    let rx = start(&api, &MockSubmitter::new(), params(nodes, 1, 1));

    tokio::time::sleep(Duration::from_secs(30)).await;
    for node in nodes {
        api.set_chain_info(node, 60);
    }

    let report = rx.await.unwrap();
    assert_eq!(report.verdict, Verdict::Success);
}

#[tokio::test(start_paused = true)]
async fn flapping_node_does_not_lose_status() {
    let api = MockNodeApi::new();
    for node in NODES {
        api.set_chain_info(node, 105);
        api.locate_all(node, 100, "0064");
    }
    api.set_unreachable(NODES[1], true);
    let rx = start(&api, &MockSubmitter::new(), params(&NODES, 1, 1));

    tokio::time::sleep(Duration::from_secs(8)).await;
    api.set_unreachable(NODES[1], false);

    let report = rx.await.unwrap();
    assert_eq!(report.verdict, Verdict::Success);
    assert!(api.resolve_requests() > NODES.len());
}

#[tokio::test(start_paused = true)]
async fn several_transactions_are_paced() {
    let nodes = &NODES[..2];
    let api = MockNodeApi::new();
    for node in nodes {
        api.set_chain_info(node, 500);
        api.locate_all(node, 400, "blk");
    }
    let submitter = MockSubmitter::new();
    let started = Instant::now();

    let report = start(&api, &submitter, params(nodes, 3, 2)).await.unwrap();

    assert_eq!(report.verdict, Verdict::Success);
    assert_eq!(report.progress.submitted, 3);
    assert_eq!(report.progress.finalized, 3);
    // Third submission goes out two gaps after the first.
    assert!(started.elapsed() >= Duration::from_secs(4));

    let mut ids = submitter.correlation_ids();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
