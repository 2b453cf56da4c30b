/*!
 * Tests for the content client on top of mock providers
 */

use std::sync::Arc;
use std::time::Duration;

use bookwash::bookwash::{Level, Rating, Targets};
use bookwash::errors::ServiceError;
use bookwash::pipeline::{BookwashPipeline, ChapterState, PipelineConfig, PipelineMode};
use bookwash::providers::mock::MockProvider;
use bookwash::service::prompts::{CLASSIFIER_SYSTEM, REVISER_SYSTEM};
use bookwash::service::{Aggression, ContentClient, ContentService, ManualClock, RetryPolicy};

use crate::common;

fn test_policy() -> RetryPolicy {
    RetryPolicy {
        min_interval: Duration::from_millis(500),
        retry_count: 1,
        base_backoff: Duration::from_millis(40),
        max_backoff: Duration::from_millis(200),
        fallback_after: 2,
        reset_after: 2,
    }
}

fn test_client(provider: &MockProvider, clock: &ManualClock) -> ContentClient {
    ContentClient::new(Box::new(provider.clone()), test_policy(), "main-model", Some("spare-model".to_string()))
        .with_clock(Arc::new(clock.clone()))
        .with_temperature(0.2)
}

#[tokio::test]
async fn test_revise_shouldSendTargetsAggressionAndSystemPrompt() {
    let provider = MockProvider::scripted(vec![Ok("```\nHere is the revised text:\nA calm day.\n```".to_string())]);
    let clock = ManualClock::new();
    let mut client = test_client(&provider, &clock);
    let targets = Targets::new(Level::G, Level::PG, Level::PG13);

    let revised = client.revise("A damned day.", &targets, Aggression::Moderate).await.unwrap();

    assert_eq!(revised, "A calm day.");
    let request = &provider.requests()[0];
    assert_eq!(request.model, "main-model");
    assert_eq!(request.system.as_deref(), Some(REVISER_SYSTEM));
    assert_eq!(request.temperature, Some(0.2));
    assert!(request.prompt.contains("Intensity 2 of 3"));
    assert!(request.prompt.contains("language: at most G"));
    assert!(request.prompt.contains("<text>\nA damned day.\n</text>"));
}

#[tokio::test]
async fn test_classify_unparseableThenValid_shouldRetryParseFailure() {
    let provider = MockProvider::scripted(vec![
        Ok("I cannot rate this.".to_string()),
        Ok("Language: PG-13\nSexual Content: G\nViolence: R".to_string()),
    ]);
    let clock = ManualClock::new();
    let mut client = test_client(&provider, &clock);

    let rating = client.classify("Some chapter.").await.unwrap();

    assert_eq!(rating, Rating::new(Level::PG13, Level::G, Level::R));
    assert_eq!(provider.requests()[0].system.as_deref(), Some(CLASSIFIER_SYSTEM));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_fallbackModel_afterSuccessStreak_shouldReturnToPrimary() {
    let provider = MockProvider::rate_limited(2);
    let clock = ManualClock::new();
    let mut client = test_client(&provider, &clock);
    let targets = Targets::default();

    // Two rejections on the primary exhaust the single retry
    assert!(matches!(
        client.revise("text", &targets, Aggression::Light).await,
        Err(ServiceError::ReviserUnavailable(_))
    ));
    assert!(client.state().is_on_fallback());

    client.revise("text", &targets, Aggression::Light).await.unwrap();
    client.revise("text", &targets, Aggression::Light).await.unwrap();
    client.revise("text", &targets, Aggression::Light).await.unwrap();

    assert_eq!(
        provider.models_used(),
        vec!["main-model", "main-model", "spare-model", "spare-model", "main-model"]
    );
    assert!(!client.state().is_on_fallback());
}

#[tokio::test]
async fn test_everyRequest_shouldRespectMinimumInterval() {
    let provider = MockProvider::scripted(vec![
        Ok("language: G\nsexual: G\nviolence: G".to_string()),
        Ok("language: G\nsexual: G\nviolence: G".to_string()),
        Ok("language: G\nsexual: G\nviolence: G".to_string()),
    ]);
    let clock = ManualClock::new();
    let mut client = test_client(&provider, &clock);

    for _ in 0..3 {
        client.classify("text").await.unwrap();
    }

    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500), Duration::from_millis(500)]);
    assert_eq!(clock.elapsed(), Duration::from_millis(1000));
}

#[tokio::test]
async fn test_pipeline_overContentClient_shouldCleanChapterEndToEnd() {
    let provider = MockProvider::scripted(vec![
        // Rating pass, chapter 1 then chapter 2
        Ok("language: G\nsexual: G\nviolence: G".to_string()),
        Ok("language: R\nsexual: G\nviolence: PG".to_string()),
        // Cleaning pass: one revision and its verification
        Ok("He walked into the tavern.\n\n\"Blast it all,\" he shouted at the barkeep.\n\nThe room went quiet."
            .to_string()),
        Ok("language: PG\nsexual: G\nviolence: PG".to_string()),
    ]);
    let clock = ManualClock::new();
    let mut client = test_client(&provider, &clock);
    let mut doc = common::sample_document();

    let mut pipeline = BookwashPipeline::new(&mut client, PipelineConfig::default());
    let result = pipeline.run(&mut doc, PipelineMode::Process).await.unwrap();

    assert_eq!(result.outcome(2).map(|o| o.state), Some(ChapterState::Converged));
    assert_eq!(provider.request_count(), 4);

    let chapter = &doc.chapters[1];
    assert_eq!(chapter.needs_cleaning, Some(false));
    assert_eq!(chapter.rating, Some(Rating::new(Level::PG, Level::G, Level::PG)));
    let changes: Vec<_> = chapter.changes().collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, 1);
    assert!(changes[0].cleaned.contains("Blast it all"));
    assert_eq!(doc.chapters[0].needs_cleaning, Some(false));
}
