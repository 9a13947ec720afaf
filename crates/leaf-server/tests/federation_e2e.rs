//! Federation over real HTTP: three leaf nodes on ephemeral ports driven by
//! `HttpTransport` and the `Federation` facade.

use std::sync::Arc;
use std::time::Duration;

use leaf_core::{
    CorrelationId, NetworkIdentity, NodeId, NodeRegistry, Panel, PanelItem, UniversalId,
};
use leaf_federation::{
    Decision, DeleteOutcome, Federation, FederationContext, HttpTransport, NodeStatus, QueryRef,
    RejectionKind, SaveOutcome, Session,
};
use leaf_server::router::build_router;
use leaf_server::state::AppState;

async fn spawn_node() -> (AppState, String) {
    let state = AppState::in_memory();
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("http://{addr}"))
}

/// An address nothing listens on.
async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn identity(id: u32, address: String, home: bool) -> NetworkIdentity {
    NetworkIdentity {
        id: NodeId(id),
        name: format!("node-{id}"),
        address,
        enabled: true,
        is_home_node: home,
    }
}

fn federation(user: &str, nodes: Vec<NetworkIdentity>) -> Federation {
    let transport = HttpTransport::new(user, Duration::from_secs(5)).unwrap();
    let registry = NodeRegistry::new(nodes).unwrap();
    Federation::new(FederationContext::new(registry, Arc::new(transport)))
}

fn with_cohorts(mut session: Session, nodes: &[u32]) -> Session {
    for id in nodes {
        session
            .network_cohorts
            .insert(NodeId(*id), CorrelationId(format!("cohort-{id}")));
    }
    session
}

async fn save_new(
    federation: &Federation,
    session: Session,
    name: &str,
    panels: Vec<Panel>,
) -> (Session, SaveOutcome) {
    let mut session = session;
    session.reset_current();
    session = with_cohorts(session, &[1, 2]);
    session.current.name = name.to_string();
    session.panels = panels;
    let transition = federation.save(session).await;
    (transition.session, transition.outcome)
}

fn concept_panel() -> Vec<Panel> {
    vec![Panel::with_items(0, vec![PanelItem::concept(0, "concept:asthma")])]
}

fn saved_id(outcome: SaveOutcome) -> UniversalId {
    match outcome {
        SaveOutcome::Saved(report) => report.universal_id,
        SaveOutcome::Rejected(err) => panic!("save rejected: {err}"),
    }
}

async fn count(state: &AppState) -> usize {
    state.service.lock().await.list(None).unwrap().len()
}

#[tokio::test]
async fn save_and_cascading_delete_across_three_nodes() {
    let (home, home_addr) = spawn_node().await;
    let (net1, net1_addr) = spawn_node().await;
    let (net2, net2_addr) = spawn_node().await;
    let federation = federation(
        "alice",
        vec![
            identity(0, home_addr, true),
            identity(1, net1_addr, false),
            identity(2, net2_addr, false),
        ],
    );

    let session = federation.bootstrap("alice").await.unwrap();
    assert!(session.saved.is_empty());

    let (session, outcome) = save_new(&federation, session, "A", concept_panel()).await;
    let a = saved_id(outcome);
    let embed_a = vec![Panel::with_items(0, vec![PanelItem::query(0, a.clone(), "A")])];
    let (session, outcome) = save_new(&federation, session, "B", embed_a).await;
    let b = saved_id(outcome);

    for state in [&home, &net1, &net2] {
        assert_eq!(count(state).await, 2);
    }

    let transition = federation.delete(session, &QueryRef::new(a.clone(), "A")).await;
    let DeleteOutcome::NeedsConfirmation(pending) = transition.outcome else {
        panic!("expected confirmation for self-owned dependent");
    };
    assert_eq!(pending.dependents[0].universal_id, b);

    let transition = federation
        .confirm(transition.session, pending, Decision::Yes)
        .await;
    let DeleteOutcome::Deleted(report) = transition.outcome else {
        panic!("expected cascading delete to succeed");
    };
    assert_eq!(report.deleted, vec![a, b]);
    assert!(report.propagation.is_complete());
    assert!(transition.session.saved.is_empty());

    for state in [&home, &net1, &net2] {
        assert_eq!(count(state).await, 0);
    }
}

#[tokio::test]
async fn unreachable_network_node_does_not_fail_save() {
    let (home, home_addr) = spawn_node().await;
    let (net1, net1_addr) = spawn_node().await;
    let federation = federation(
        "alice",
        vec![
            identity(0, home_addr, true),
            identity(1, net1_addr, false),
            identity(2, dead_address().await, false),
        ],
    );

    let (session, outcome) = save_new(&federation, Session::new("alice"), "A", concept_panel()).await;
    let SaveOutcome::Saved(report) = outcome else {
        panic!("save should succeed with one node down");
    };
    assert_eq!(report.propagation.status_of(NodeId(1)), Some(&NodeStatus::Propagated));
    assert!(matches!(
        report.propagation.status_of(NodeId(2)),
        Some(NodeStatus::Failed(_))
    ));
    assert_eq!(session.saved.len(), 1);
    assert_eq!(count(&home).await, 1);
    assert_eq!(count(&net1).await, 1);
}

#[tokio::test]
async fn foreign_dependent_blocks_delete_over_http() {
    let (home, home_addr) = spawn_node().await;
    let alice = federation("alice", vec![identity(0, home_addr.clone(), true)]);
    let bob = federation("bob", vec![identity(0, home_addr, true)]);

    let (session, outcome) = save_new(&alice, Session::new("alice"), "A", concept_panel()).await;
    let a = saved_id(outcome);

    let embed_a = vec![Panel::with_items(0, vec![PanelItem::query(0, a.clone(), "A")])];
    let (_, outcome) = save_new(&bob, Session::new("bob"), "C", embed_a).await;
    saved_id(outcome);

    let transition = alice.delete(session, &QueryRef::new(a.clone(), "A")).await;
    let err = transition.outcome.rejection().unwrap();
    assert_eq!(err.kind(), RejectionKind::ForeignDependents);
    let msg = err.to_string();
    assert!(msg.contains("bob") && msg.contains("\"C\""), "{msg}");
    assert!(transition.session.saved.contains_key(&a));
    assert_eq!(count(&home).await, 2);
}

#[tokio::test]
async fn cycle_through_another_users_query_is_reported_as_recursive() {
    let (_home, home_addr) = spawn_node().await;
    let alice = federation("alice", vec![identity(0, home_addr.clone(), true)]);
    let bob = federation("bob", vec![identity(0, home_addr, true)]);

    let (mut session, outcome) =
        save_new(&alice, Session::new("alice"), "A", concept_panel()).await;
    let a = saved_id(outcome);

    let embed_a = vec![Panel::with_items(0, vec![PanelItem::query(0, a.clone(), "A")])];
    let (_, outcome) = save_new(&bob, Session::new("bob"), "C", embed_a).await;
    let c = saved_id(outcome);

    session
        .panels
        .push(Panel::with_items(1, vec![PanelItem::query(0, c, "C")]));
    let transition = alice.save(session).await;
    let err = transition.outcome.rejection().unwrap();
    assert_eq!(err.kind(), RejectionKind::Validation);
    assert_eq!(err.header(), "Recursive query error");
    assert_eq!(transition.session.saved[&a].ver, Some(1));
}
