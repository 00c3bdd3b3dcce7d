mod common;

use chrono::{Duration, Utc};
use common::{config, issue, pipeline, tracker, RecordingIndex, ScriptedModel};
use simili_triage::pending::{LABEL_PENDING_CLOSE, LABEL_PENDING_TRANSFER};
use simili_triage::transfer::REVERT_MARKER;
use simili_triage::{
    format_pending_action_metadata, ActionType, Command, InMemoryTracker, PendingAction,
    PendingActionStore, ProcessingResult, RepoRef, Runner, RunnerError,
};
use std::sync::Arc;

fn schedule_expired_transfer(tracker: &InMemoryTracker, number: u64, target: &str) -> u64 {
    let issue = issue("frontend", number, "Save fails", &[LABEL_PENDING_TRANSFER]);
    tracker.add_issue(issue.clone());
    let action = PendingAction::new(
        ActionType::Transfer,
        &issue,
        target,
        0,
        24,
        Utc::now() - Duration::hours(48),
    );
    let marker = format_pending_action_metadata(&action).unwrap();
    tracker
        .add_comment(
            "acme",
            "frontend",
            number,
            "simili-bot",
            &format!("⏳ This issue will be transferred.\n\n{marker}"),
            Duration::hours(48),
        )
        .unwrap()
}

#[tokio::test]
async fn rule_match_transfers_immediately() {
    let tracker = tracker();
    let reported = issue("frontend", 12, "Button misaligned", &["bug-ui"]);
    tracker.add_issue(reported.clone());
    let index = Arc::new(RecordingIndex::default());
    let pipeline = pipeline(config(false, false, false), &tracker, false).with_index(index.clone());

    let result = pipeline.process_issue("acme", "frontend", 12).await;

    assert_eq!(
        result,
        ProcessingResult::Transferred {
            issue: "acme/frontend#12".to_string(),
            destination: "acme/ui-kit#1".to_string(),
        }
    );
    let comments = tracker.comments("acme", "ui-kit", 1);
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains("`labels: [bug-ui]`"));
    assert!(!comments[0].body.contains("moved back"));
    assert_eq!(
        *index.deleted.lock().unwrap(),
        vec![("simili_acme".to_string(), reported.index_key())]
    );
}

#[tokio::test]
async fn ai_route_is_scheduled_as_pending_transfer() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 20, "Server error when saving", &[]));
    let model = ScriptedModel::routing("acme/backend", 0.95);
    let pipeline = pipeline(config(true, false, true), &tracker, false).with_model(model.clone());

    let result = pipeline.process_issue("acme", "frontend", 20).await;

    assert_eq!(
        result,
        ProcessingResult::Scheduled {
            issue: "acme/frontend#20".to_string(),
            action: "transfer".to_string(),
            target: "acme/backend".to_string(),
        }
    );
    assert!(tracker.transfers().is_empty());
    assert!(tracker
        .issue("acme", "frontend", 20)
        .unwrap()
        .has_label(LABEL_PENDING_TRANSFER));

    let notice = tracker.comments("acme", "frontend", 20).remove(0);
    assert!(notice.body.contains("AI routing (95% confidence)"));

    let store = PendingActionStore::new(tracker.clone());
    let actions = store.find_pending_actions("acme", "frontend").await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].comment_id, notice.id);
    assert_eq!(actions[0].target, "acme/backend");
    assert_eq!(actions[0].expires_at - actions[0].scheduled_at, Duration::hours(24));

    let again = pipeline.process_issue("acme", "frontend", 20).await;
    assert!(matches!(again, ProcessingResult::Skipped { ref reason, .. } if reason == "transfer already pending"));
    assert_eq!(tracker.comments("acme", "frontend", 20).len(), 1);

    let waiting = pipeline.process_pending("acme", "frontend").await.unwrap();
    assert!(matches!(&waiting[..], [ProcessingResult::Skipped { reason, .. }] if reason.starts_with("waiting until")));
}

#[tokio::test]
async fn expired_pending_transfer_executes_and_clears_label() {
    let tracker = tracker();
    schedule_expired_transfer(&tracker, 30, "acme/backend");
    let pipeline = pipeline(config(true, false, false), &tracker, false);

    let results = pipeline.process_pending("acme", "frontend").await.unwrap();

    assert_eq!(
        results,
        vec![ProcessingResult::Transferred {
            issue: "acme/frontend#30".to_string(),
            destination: "acme/backend#1".to_string(),
        }]
    );
    let moved = tracker.issue("acme", "backend", 1).unwrap();
    assert!(!moved.has_label(LABEL_PENDING_TRANSFER));

    let rerun = pipeline.process_pending("acme", "frontend").await.unwrap();
    assert!(rerun.is_empty());
    assert_eq!(tracker.transfers().len(), 1);
}

#[tokio::test]
async fn cancel_reaction_wins_over_approve() {
    let tracker = tracker();
    let comment_id = schedule_expired_transfer(&tracker, 31, "acme/backend");
    tracker.add_reaction(comment_id, "+1", "maintainer");
    tracker.add_reaction(comment_id, "-1", "reporter");
    let pipeline = pipeline(config(true, false, false), &tracker, false);

    let results = pipeline.process_pending("acme", "frontend").await.unwrap();

    assert_eq!(
        results,
        vec![ProcessingResult::Cancelled {
            issue: "acme/frontend#31".to_string(),
            action: "transfer".to_string(),
        }]
    );
    assert!(tracker.transfers().is_empty());
    let issue = tracker.issue("acme", "frontend", 31).unwrap();
    assert!(!issue.has_label(LABEL_PENDING_TRANSFER));
    let comments = tracker.comments("acme", "frontend", 31);
    assert!(comments.last().unwrap().body.contains("cancelled"));
}

#[tokio::test]
async fn approve_reaction_executes_before_expiry() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 32, "Button misaligned", &["bug-ui"]));
    let pipeline = pipeline(config(true, false, false), &tracker, false);

    let scheduled = pipeline.process_issue("acme", "frontend", 32).await;
    assert!(matches!(scheduled, ProcessingResult::Scheduled { .. }));
    let notice = tracker.comments("acme", "frontend", 32).remove(0);
    tracker.add_reaction(notice.id, "+1", "maintainer");

    let results = pipeline.process_pending("acme", "frontend").await.unwrap();

    assert!(matches!(&results[..], [ProcessingResult::Transferred { destination, .. }] if destination == "acme/ui-kit#1"));
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 33, "Button misaligned", &["bug-ui"]));
    let comment_id = schedule_expired_transfer(&tracker, 34, "acme/backend");

    let immediate = pipeline(config(false, false, false), &tracker, true);
    let delayed = pipeline(config(true, false, false), &tracker, true);

    let result = immediate.process_issue("acme", "frontend", 33).await;
    assert!(matches!(result, ProcessingResult::Skipped { ref reason, .. } if reason.starts_with("dry run")));

    let result = delayed.process_issue("acme", "frontend", 33).await;
    assert!(matches!(result, ProcessingResult::Skipped { ref reason, .. } if reason.starts_with("dry run")));

    let results = delayed.process_pending("acme", "frontend").await.unwrap();
    assert!(matches!(&results[..], [ProcessingResult::Skipped { reason, .. }] if reason.starts_with("dry run")));

    assert!(tracker.transfers().is_empty());
    assert!(tracker.comments("acme", "frontend", 33).is_empty());
    assert_eq!(tracker.comments("acme", "frontend", 34).len(), 1);
    assert_eq!(tracker.comments("acme", "frontend", 34)[0].id, comment_id);
}

#[tokio::test]
async fn revert_moves_issue_back_and_blocks_retransfer() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 12, "Button misaligned", &["bug-ui"]));
    let pipeline = pipeline(config(true, true, false), &tracker, false);

    let first = pipeline.process_issue("acme", "frontend", 12).await;
    assert!(matches!(first, ProcessingResult::Transferred { ref destination, .. } if destination == "acme/ui-kit#1"));

    let notice = tracker.comments("acme", "ui-kit", 1).remove(0);
    assert!(notice.body.contains("react with 👎"));
    tracker.add_reaction(notice.id, "-1", "reporter");

    let reverted = pipeline.check_revert("acme", "ui-kit", 1).await;
    assert_eq!(
        reverted,
        ProcessingResult::Reverted {
            issue: "acme/ui-kit#1".to_string(),
            source: "acme/frontend".to_string(),
        }
    );

    let transfers = tracker.transfers();
    assert_eq!(transfers.len(), 2);
    let home = transfers[1].to.clone();
    assert_eq!((home.org.as_str(), home.repo.as_str()), ("acme", "frontend"));
    let comments = tracker.comments("acme", "frontend", home.number);
    assert!(comments.last().unwrap().body.starts_with(REVERT_MARKER));

    let again = pipeline.process_issue("acme", "frontend", home.number).await;
    assert!(matches!(again, ProcessingResult::Skipped { ref reason, .. } if reason == "no transfer target"));

    let no_loop = pipeline.check_revert("acme", "frontend", home.number).await;
    assert!(matches!(no_loop, ProcessingResult::Skipped { ref reason, .. } if reason == "no revert requested"));
    assert_eq!(tracker.transfers().len(), 2);
}

#[tokio::test]
async fn check_revert_is_inert_without_optimistic_transfers() {
    let tracker = tracker();
    tracker.add_issue(issue("ui-kit", 1, "Button misaligned", &[]));
    let pipeline = pipeline(config(true, false, false), &tracker, false);

    let result = pipeline.check_revert("acme", "ui-kit", 1).await;
    assert!(matches!(result, ProcessingResult::Skipped { .. }));
}

#[tokio::test]
async fn router_pointing_at_current_repository_leaves_issue_alone() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 40, "Colors are off", &[]));
    let model = ScriptedModel::routing("ACME/Frontend", 0.97);
    let pipeline = pipeline(config(false, false, true), &tracker, false).with_model(model.clone());

    let result = pipeline.process_issue("acme", "frontend", 40).await;

    assert!(matches!(result, ProcessingResult::Skipped { ref reason, .. } if reason == "no transfer target"));
    assert_eq!(*model.calls.lock().unwrap(), 1);
    assert!(tracker.transfers().is_empty());
    assert!(tracker.comments("acme", "frontend", 40).is_empty());
}

#[tokio::test]
async fn scheduled_close_executes_on_approval() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 50, "Same crash again", &[]));
    let pipeline = pipeline(config(true, false, false), &tracker, false);
    let original = "https://github.com/acme/frontend/issues/3";

    let scheduled = pipeline
        .schedule_close("acme", "frontend", 50, original)
        .await
        .unwrap();
    assert_eq!(
        scheduled,
        ProcessingResult::Scheduled {
            issue: "acme/frontend#50".to_string(),
            action: "close".to_string(),
            target: original.to_string(),
        }
    );
    assert!(tracker
        .issue("acme", "frontend", 50)
        .unwrap()
        .has_label(LABEL_PENDING_CLOSE));

    let notice = tracker.comments("acme", "frontend", 50).remove(0);
    tracker.add_reaction(notice.id, "+1", "maintainer");

    let results = pipeline.process_pending("acme", "frontend").await.unwrap();

    assert_eq!(
        results,
        vec![ProcessingResult::Closed {
            issue: "acme/frontend#50".to_string(),
            original: original.to_string(),
        }]
    );
    assert!(tracker.is_closed("acme", "frontend", 50));
    assert!(!tracker
        .issue("acme", "frontend", 50)
        .unwrap()
        .has_label(LABEL_PENDING_CLOSE));
}

#[tokio::test]
async fn schedule_close_rejects_non_url() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 51, "Same crash again", &[]));
    let pipeline = pipeline(config(true, false, false), &tracker, false);

    let result = pipeline
        .schedule_close("acme", "frontend", 51, "acme/frontend#3")
        .await;

    assert!(matches!(result, Err(RunnerError::InvalidOriginalUrl { .. })));
    assert!(tracker.comments("acme", "frontend", 51).is_empty());
}

#[tokio::test]
async fn failed_transfer_is_reported_per_issue() {
    let tracker = tracker();
    tracker.add_issue(issue("frontend", 60, "Button misaligned", &["bug-ui"]));
    tracker.fail_on("transfer_issue");
    let pipeline = pipeline(config(false, false, false), &tracker, false);

    let result = pipeline.process_issue("acme", "frontend", 60).await;

    assert!(result.is_failure());
}

#[tokio::test]
async fn runner_reconciles_every_configured_repository() {
    let tracker = tracker();
    schedule_expired_transfer(&tracker, 70, "acme/backend");
    tracker.add_issue(issue("backend", 5, "Slow query", &[]));
    let runner = Runner::from_pipeline(pipeline(config(true, false, false), &tracker, false));

    let summary = runner
        .run(&Command::ProcessPending { repository: None })
        .await
        .unwrap();

    assert_eq!(summary.issues_processed, 1);
    assert_eq!(summary.transferred, 1);
    assert!(summary.all_success());

    let summary = runner
        .run(&Command::ProcessIssue {
            repository: RepoRef::new("acme", "backend"),
            number: 5,
        })
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn listing_failure_is_critical() {
    let tracker = tracker();
    tracker.fail_on("list_issues_by_label");
    let runner = Runner::from_pipeline(pipeline(config(true, false, false), &tracker, false));

    let result = runner
        .run(&Command::ProcessPending {
            repository: Some(RepoRef::new("acme", "frontend")),
        })
        .await;

    assert!(matches!(result, Err(RunnerError::Pending(_))));
}
