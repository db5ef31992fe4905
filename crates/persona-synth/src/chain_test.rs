use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use persona_core::WeightedLabel;

use super::*;
use crate::provider::{ProviderFuture, RawProviderOutput};

const VALID: &str = r#"{"traits": ["Curious"], "motivations": {"learning": 80}}"#;

type Reply = Result<RawProviderOutput, ProviderError>;

/// Replays a fixed script of replies, optionally sleeping before each one.
struct Scripted {
    id: &'static str,
    script: Mutex<VecDeque<(Option<Duration>, Reply)>>,
    calls: AtomicU32,
}

impl Scripted {
    fn new(id: &'static str, script: Vec<(Option<Duration>, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            id,
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PersonaProvider for Scripted {
    fn id(&self) -> &str {
        self.id
    }

    fn model(&self) -> Option<&str> {
        Some("scripted-1")
    }

    fn generate<'a>(&'a self, _prompt: &'a str) -> ProviderFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            match next {
                Some((delay, reply)) => {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    reply
                }
                None => Err(ProviderError::EmptyResponse),
            }
        })
    }
}

fn text(s: &str) -> Reply {
    Ok(RawProviderOutput::Text(s.to_string()))
}

fn policy(max_attempts: u32) -> ProviderPolicy {
    ProviderPolicy {
        max_attempts,
        backoff: BackoffKind::Fixed,
        backoff_base: Duration::from_millis(1),
        timeout: Duration::from_millis(100),
    }
}

fn profile() -> FeatureProfile {
    let mut profile = FeatureProfile::insufficient();
    profile.insufficient_data = false;
    profile.item_count = 50;
    profile.post_count = 20;
    profile.comment_count = 30;
    profile.community_affinity = vec![WeightedLabel {
        label: "rust".to_string(),
        weight: 1.0,
    }];
    profile
}

fn outcomes(synthesis: &Synthesis) -> Vec<(&str, AttemptOutcome)> {
    synthesis
        .attempts
        .iter()
        .map(|a| (a.provider_id.as_str(), a.outcome))
        .collect()
}

#[tokio::test]
async fn unparseable_output_falls_back_to_template() {
    let groq = Scripted::new(
        "groq",
        vec![
            (None, text("I'm sorry, I can't do that.")),
            (None, text("still not json")),
        ],
    );
    let chain = ProviderChain::new(ConfidencePolicy::default()).with_stage(groq.clone(), policy(2));

    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert!(synthesis.record.metadata.is_template());
    assert_eq!(synthesis.record.metadata.source, "template");
    // invalid output advances without retrying
    assert_eq!(groq.calls(), 1);
    assert_eq!(
        outcomes(&synthesis),
        vec![
            ("groq", AttemptOutcome::InvalidOutput),
            ("template", AttemptOutcome::Success),
        ]
    );
    assert!(synthesis.attempts[0].raw_output.is_some());
}

#[tokio::test]
async fn timeout_is_retried_on_same_provider() {
    let groq = Scripted::new(
        "groq",
        vec![
            (Some(Duration::from_millis(500)), text(VALID)),
            (None, text(VALID)),
        ],
    );
    let chain = ProviderChain::new(ConfidencePolicy::default()).with_stage(groq.clone(), policy(2));

    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert_eq!(groq.calls(), 2);
    assert_eq!(
        outcomes(&synthesis),
        vec![("groq", AttemptOutcome::Timeout), ("groq", AttemptOutcome::Success)]
    );
    assert_eq!(synthesis.record.metadata.source, "groq");
    assert_eq!(synthesis.record.metadata.model.as_deref(), Some("scripted-1"));
    assert_eq!(synthesis.record.motivations.get("learning"), Some(80));
    assert_eq!(synthesis.attempts[1].attempt, 2);
}

#[tokio::test]
async fn exhausted_rate_limits_advance_to_next_provider() {
    let groq = Scripted::new(
        "groq",
        vec![
            (
                None,
                Err(ProviderError::RateLimited {
                    retry_after_secs: Some(0),
                }),
            ),
            (
                None,
                Err(ProviderError::RateLimited {
                    retry_after_secs: None,
                }),
            ),
        ],
    );
    let gemini = Scripted::new("gemini", vec![(None, text(VALID))]);
    let chain = ProviderChain::new(ConfidencePolicy::default())
        .with_stage(groq.clone(), policy(2))
        .with_stage(gemini.clone(), policy(2));

    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert_eq!(
        outcomes(&synthesis),
        vec![
            ("groq", AttemptOutcome::RateLimited),
            ("groq", AttemptOutcome::RateLimited),
            ("gemini", AttemptOutcome::Success),
        ]
    );
    assert_eq!(synthesis.record.metadata.source, "gemini");
    // second stage: 0.9 - 0.2, full coverage
    assert!((synthesis.record.metadata.confidence() - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn non_retriable_error_advances_immediately() {
    let groq = Scripted::new(
        "groq",
        vec![(
            None,
            Err(ProviderError::UnexpectedStatus {
                status: 401,
                body: "invalid api key".to_string(),
            }),
        )],
    );
    let gemini = Scripted::new("gemini", vec![(None, text(VALID))]);
    let chain = ProviderChain::new(ConfidencePolicy::default())
        .with_stage(groq.clone(), policy(3))
        .with_stage(gemini, policy(1));

    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert_eq!(groq.calls(), 1);
    assert_eq!(synthesis.attempts[0].outcome, AttemptOutcome::Error);
    assert!(synthesis.attempts[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("401")));
    assert_eq!(synthesis.record.metadata.source, "gemini");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let groq = Scripted::new(
        "groq",
        vec![
            (
                None,
                Err(ProviderError::UnexpectedStatus {
                    status: 503,
                    body: String::new(),
                }),
            ),
            (None, text(VALID)),
        ],
    );
    let chain = ProviderChain::new(ConfidencePolicy::default()).with_stage(groq.clone(), policy(2));

    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert_eq!(groq.calls(), 2);
    assert_eq!(synthesis.record.metadata.source, "groq");
}

#[tokio::test]
async fn provider_citations_are_resolved_against_samples() {
    let reply = r#"{"traits": ["Helpful"], "citations": [
        {"trait": "Helpful", "evidence": "Explains borrowing", "source": "c9"},
        {"trait": "Helpful", "evidence": "Made up", "source": "t1_nope"}
    ]}"#;
    let groq = Scripted::new("groq", vec![(None, text(reply))]);
    let chain = ProviderChain::new(ConfidencePolicy::default()).with_stage(groq, policy(1));
    let samples = vec![persona_core::ActivityItem {
        id: "t1_c9".to_string(),
        kind: persona_core::ActivityKind::Comment,
        community: "learnrust".to_string(),
        text: "You can borrow it immutably here.".to_string(),
        score: 7,
        created_at: chrono::Utc::now(),
        permalink: "https://www.reddit.com/r/learnrust/comments/x/y/c9/".to_string(),
    }];

    let synthesis = chain.synthesize("alice", &profile(), &samples).await;

    assert_eq!(synthesis.record.metadata.source, "groq");
    assert_eq!(synthesis.record.citations.len(), 1);
    let citation = &synthesis.record.citations[0];
    assert_eq!(citation.source_id, "t1_c9");
    assert_eq!(citation.community.as_deref(), Some("learnrust"));
    assert_eq!(citation.score, Some(7));
    assert_eq!(citation.quote, "You can borrow it immutably here.");
}

#[tokio::test]
async fn empty_chain_uses_template_with_counts() {
    let chain = ProviderChain::new(ConfidencePolicy::default());
    let synthesis = chain.synthesize("alice", &profile(), &[]).await;

    assert!(synthesis.record.metadata.is_template());
    assert_eq!(synthesis.record.metadata.posts_analyzed, 20);
    assert_eq!(synthesis.record.metadata.comments_analyzed, 30);
    assert!((synthesis.record.metadata.confidence() - 0.3).abs() < 1e-9);
    assert_eq!(synthesis.attempts.len(), 1);
}

#[test]
fn confidence_scales_with_stage_and_coverage() {
    let policy = ConfidencePolicy::default();
    assert!((policy.score(Some(0), 50) - 0.9).abs() < 1e-9);
    assert!((policy.score(Some(0), 500) - 0.9).abs() < 1e-9);
    assert!((policy.score(Some(0), 0) - 0.45).abs() < 1e-9);
    assert!((policy.score(Some(1), 25) - 0.7 * 0.75).abs() < 1e-9);
    assert!((policy.score(Some(10), 50) - 0.1).abs() < 1e-9);
    assert!((policy.score(None, 50) - 0.3).abs() < 1e-9);
}

#[test]
fn exponential_backoff_honors_retry_after_cap() {
    let policy = ProviderPolicy {
        max_attempts: 4,
        backoff: BackoffKind::Exponential,
        backoff_base: Duration::from_millis(100),
        timeout: Duration::from_secs(1),
    };
    assert_eq!(policy.delay(1, None), Duration::from_millis(100));
    assert_eq!(policy.delay(3, None), Duration::from_millis(400));
    assert_eq!(policy.delay(1, Some(3)), Duration::from_secs(3));
    assert_eq!(policy.delay(1, Some(600)), MAX_RETRY_AFTER);
}
