// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the testable properties that hold regardless of
//! which `Translator` implementation backs the engine: this suite runs
//! them against [`StubTranslator`], which is exactly the point of the
//! capability-trait split — these assertions also hold for the Candle
//! engine by construction since both satisfy the same trait contract.

use lexibridge_core::{Error, Language};
use lexibridge_engine::{BatchItem, StubTranslator, Translator};

fn lang(code: &str) -> Language {
    Language::parse(code).unwrap()
}

#[tokio::test]
async fn batch_unary_equivalence_for_singleton_batch() {
    let translator = StubTranslator::new();
    let source = lang("eng_Latn");
    let target = lang("spa_Latn");

    let unary = translator
        .translate("Hello, world!", &source, &target, 0.8)
        .await
        .unwrap();

    let batch = translator
        .translate_batch(vec![BatchItem {
            text: "Hello, world!".to_string(),
            source: source.clone(),
            target: target.clone(),
            min_length_percentage: 0.8,
        }])
        .await
        .unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0], unary);
}

#[tokio::test]
async fn batch_preserves_order_and_length() {
    let translator = StubTranslator::new();
    let items: Vec<BatchItem> = (0..5)
        .map(|i| BatchItem {
            text: format!("item {i}"),
            source: lang("eng_Latn"),
            target: lang("spa_Latn"),
            min_length_percentage: 0.8,
        })
        .collect();

    let results = translator.translate_batch(items).await.unwrap();
    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert!(result.contains(&format!("item {i}")));
    }
}

#[tokio::test]
async fn count_tokens_is_always_at_least_one() {
    let translator = StubTranslator::new();
    assert!(translator.count_tokens("a").await.unwrap() >= 1);
    assert!(translator.count_tokens("a whole sentence here").await.unwrap() >= 1);
}

#[tokio::test]
async fn count_tokens_rejects_empty_text() {
    let translator = StubTranslator::new();
    assert!(matches!(
        translator.count_tokens("").await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn unload_load_idempotence_yields_changed_then_unchanged() {
    use lexibridge_engine::TransitionOutcome;

    let translator = StubTranslator::new();
    assert_eq!(translator.unload(false).await.unwrap(), TransitionOutcome::Changed);
    assert_eq!(translator.unload(false).await.unwrap(), TransitionOutcome::Unchanged);
    assert_eq!(translator.load(false).await.unwrap(), TransitionOutcome::Changed);
    assert_eq!(translator.load(false).await.unwrap(), TransitionOutcome::Unchanged);
}

#[tokio::test]
async fn stream_concatenation_matches_unary_translation() {
    let translator = StubTranslator::new();
    let source = lang("eng_Latn");
    let target = lang("spa_Latn");

    let unary = translator
        .translate("a few words in here", &source, &target, 0.8)
        .await
        .unwrap();

    let (mut chunks, done) = translator
        .translate_stream("a few words in here", &source, &target, 0.8)
        .await
        .unwrap();

    let mut collected = String::new();
    while let Some(chunk) = chunks.recv().await {
        collected.push_str(&chunk);
    }
    done.await.unwrap().unwrap();

    assert_eq!(collected, unary);
}
