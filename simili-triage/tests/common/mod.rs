#![allow(dead_code)]

use async_trait::async_trait;
use simili_triage::config::{DelayedActionsConfig, RepositoryConfig, RuleMatch, TransferRule};
use simili_triage::{
    Config, IndexError, InMemoryTracker, Issue, LanguageModel, LlmError, Pipeline,
    SimilarityIndex,
};
use std::sync::{Arc, Mutex};

/// Model answering every prompt with the same text.
pub struct ScriptedModel {
    response: String,
    pub calls: Mutex<usize>,
}

impl ScriptedModel {
    pub fn routing(target: &str, confidence: f64) -> Arc<Self> {
        Arc::new(Self {
            response: format!(
                "```json\n{{\"target_repo\":\"{target}\",\"confidence\":{confidence},\"reason\":\"Mentions the REST API\"}}\n```"
            ),
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.response.clone())
    }
}

/// Index remembering deletions.
#[derive(Default)]
pub struct RecordingIndex {
    pub deleted: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SimilarityIndex for RecordingIndex {
    async fn delete(&self, collection: &str, key: &str) -> Result<(), IndexError> {
        self.deleted
            .lock()
            .unwrap()
            .push((collection.to_string(), key.to_string()));
        Ok(())
    }
}

pub fn issue(repo: &str, number: u64, title: &str, labels: &[&str]) -> Issue {
    Issue {
        org: "acme".to_string(),
        repo: repo.to_string(),
        number,
        title: title.to_string(),
        body: "Steps to reproduce: open the page.".to_string(),
        author: "reporter".to_string(),
        labels: labels.iter().map(ToString::to_string).collect(),
    }
}

/// frontend (with a `bug-ui` rule), backend and ui-kit.
pub fn config(delayed: bool, optimistic: bool, router: bool) -> Config {
    let mut config = Config::default();
    config.defaults.delayed_actions = DelayedActionsConfig {
        enabled: delayed,
        optimistic_transfers: optimistic,
        ..DelayedActionsConfig::default()
    };
    config.triage.router.enabled = router;
    config.repositories = vec![
        RepositoryConfig {
            org: "acme".to_string(),
            repo: "frontend".to_string(),
            enabled: true,
            description: "Web UI".to_string(),
            transfer_rules: vec![TransferRule {
                target: "acme/ui-kit".to_string(),
                predicate: RuleMatch {
                    labels: vec!["bug-ui".to_string()],
                    ..RuleMatch::default()
                },
            }],
        },
        RepositoryConfig {
            org: "acme".to_string(),
            repo: "backend".to_string(),
            enabled: true,
            description: "REST API and database".to_string(),
            transfer_rules: Vec::new(),
        },
        RepositoryConfig {
            org: "acme".to_string(),
            repo: "ui-kit".to_string(),
            enabled: true,
            description: "Shared UI components".to_string(),
            transfer_rules: Vec::new(),
        },
    ];
    config
}

pub fn tracker() -> Arc<InMemoryTracker> {
    let tracker = Arc::new(InMemoryTracker::new());
    for repo in ["frontend", "backend", "ui-kit"] {
        tracker.add_repository("acme", repo);
    }
    tracker
}

pub fn pipeline(config: Config, tracker: &Arc<InMemoryTracker>, dry_run: bool) -> Pipeline {
    Pipeline::new(config, tracker.clone(), tracker.clone(), dry_run)
}
