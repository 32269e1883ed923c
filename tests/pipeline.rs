mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{created_at, lead};
use leadflow::models::{ActivityNote, ActivityType, Lead, Priority, Stage};
use leadflow::pipeline::HealthThresholds;
use leadflow::transition::LogSink;
use leadflow::{
    aggregate, partition, HealthTier, LeadSnapshot, PipelineView, TransitionRequest,
    WindowMode, WindowingStrategy, Workspace,
};

fn book() -> Vec<Lead> {
    let mut leads = Vec::new();
    for i in 0..25 {
        let priority = match i % 4 {
            0 => Priority::Urgent,
            1 => Priority::High,
            2 => Priority::Medium,
            _ => Priority::Low,
        };
        leads.push(lead(
            &format!("Q{i:02}"),
            Stage::Qualified,
            priority,
            Some(1_000.0 * f64::from(i)),
        ));
    }
    let mut won = lead("W1", Stage::ClosedWon, Priority::High, Some(80_000.0));
    won.updated_at = created_at() + Duration::days(12);
    leads.push(won);
    leads.push(lead("N1", Stage::New, Priority::Low, None));
    leads.push(lead("X1", Stage::ClosedLost, Priority::Medium, Some(5_000.0)));
    leads
}

#[test]
fn read_path_accounts_for_every_lead() {
    let snapshot = LeadSnapshot::new(book()).unwrap();
    let buckets = partition(snapshot.leads());
    let metrics = aggregate(&buckets);

    let counted: usize = metrics.stage_metrics.values().map(|m| m.count).sum();
    assert_eq!(counted, snapshot.len());
    assert_eq!(metrics.total_leads, snapshot.len());
    assert_eq!(metrics.stage_metrics.len(), Stage::COUNT);

    let qualified = buckets.bucket(Stage::Qualified);
    assert_eq!(qualified.len(), 25);
    // Urgent first, highest revenue first within it.
    assert_eq!(qualified[0].id, "Q24");
    assert!(qualified
        .windows(2)
        .all(|pair| pair[0].priority.weight() >= pair[1].priority.weight()));

    assert_eq!(metrics.conversion_rate, 1.0 / snapshot.len() as f64 * 100.0);
    assert_eq!(metrics.average_cycle_time, 12.0);
    assert_eq!(metrics.stage(Stage::Proposal).count, 0);
}

#[test]
fn large_buckets_are_virtualized() {
    let leads = book();
    let strategy = WindowingStrategy::default();
    let view = PipelineView::build(&leads, created_at(), &HealthThresholds::default());

    let qualified = view.window(Stage::Qualified, &strategy);
    assert_eq!(qualified.mode(), WindowMode::Virtual);
    let slice = qualified.visible_slice(10, 5);
    assert_eq!((slice.start, slice.end), (7, 18));

    let won = view.window(Stage::ClosedWon, &strategy);
    assert_eq!(won.mode(), WindowMode::Full);
    assert_eq!(won.visible_slice(0, 0).len(), 1);
}

#[test]
fn health_is_derived_from_age_and_activity() {
    let leads = book();
    let now = created_at() + Duration::days(31);
    let view = PipelineView::build(&leads, now, &HealthThresholds::default());

    assert_eq!(view.health_of("N1"), Some(HealthTier::Poor));
    assert_eq!(view.health_breakdown.total(), leads.len());
    assert_eq!(view.health_of("missing"), None);
}

#[tokio::test]
async fn workspace_persists_transitions_to_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::open(dir.path(), Arc::new(LogSink)).await.unwrap();
    assert!(workspace.controller().snapshot().await.is_empty());

    for lead in book() {
        workspace.db().insert_lead(&lead).await.unwrap();
    }
    let snapshot = workspace.controller().refresh().await.unwrap();
    assert_eq!(snapshot.len(), 28);

    let ack = workspace
        .controller()
        .request_transition(
            TransitionRequest::new("N1", Stage::New, Stage::Contacted).with_note(ActivityNote {
                activity_type: ActivityType::Email,
                description: "Intro email sent".into(),
            }),
        )
        .await
        .unwrap();
    assert!(ack.changed);

    let stored = workspace.db().get_lead("N1").await.unwrap().unwrap();
    assert_eq!(stored.stage, Stage::Contacted);
    assert_eq!(stored.activities.len(), 1);
    assert_eq!(stored.activities[0].description, "Intro email sent");

    let current = workspace.controller().snapshot().await;
    let view = PipelineView::build(current.leads(), ack.applied_at, &workspace.health_thresholds());
    assert_eq!(view.bucket(Stage::Contacted).len(), 1);
    assert_eq!(view.bucket(Stage::New).len(), 0);

    // Moving it back with the old source stage is stale now.
    let err = workspace
        .controller()
        .request_transition(TransitionRequest::new("N1", Stage::New, Stage::Qualified))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    workspace.close().await;
}

#[tokio::test]
async fn workspace_reads_settings_from_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"store_timeout_ms":2500,"windowing":{"full_threshold":4}}"#,
    )
    .unwrap();

    let workspace = Workspace::open(dir.path(), Arc::new(LogSink)).await.unwrap();

    assert_eq!(workspace.windowing().config().full_threshold, 4);
    assert_eq!(
        workspace.controller().config().store_timeout,
        std::time::Duration::from_millis(2500)
    );
    workspace.close().await;
}
