//! Service adapters against mock HTTP servers.

use kosei::config::{
    DocumentCredentials, DocumentSettings, GenerationSettings, Prompts, TranscriptionSettings,
};
use kosei::corpus::{Corpus, ExtractedUnit, Fragment, FragmentTag};
use kosei::document::{AzureLayoutAnalyzer, LayoutAnalyzer};
use kosei::outline::{OpenAiGenerator, StructureGenerator};
use kosei::retry::RetryPolicy;
use kosei::source::{SourceFile, SourceKind};
use kosei::transcription::{DeepgramTranscriber, Transcriber};
use kosei::KoseiError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5))
}

fn source(dir: &TempDir, name: &str, kind: SourceKind, content: &[u8]) -> SourceFile {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    SourceFile::new(0, path, name.to_string(), kind)
}

fn analyzer(server: &MockServer) -> AzureLayoutAnalyzer {
    AzureLayoutAnalyzer::new(
        &DocumentSettings::default(),
        &DocumentCredentials {
            endpoint: server.uri(),
            key: "azure-key".to_string(),
        },
        fast_retry(),
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(5))
}

async fn mount_submit(server: &MockServer, model: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/formrecognizer/documentModels/{}:analyze", model)))
        .and(query_param("api-version", "2023-07-31"))
        .and(header("Ocp-Apim-Subscription-Key", "azure-key"))
        .respond_with(
            ResponseTemplate::new(202).insert_header(
                "Operation-Location",
                format!("{}/operations/1", server.uri()).as_str(),
            ),
        )
        .mount(server)
        .await;
}

fn succeeded() -> serde_json::Value {
    json!({
        "status": "succeeded",
        "analyzeResult": {
            "paragraphs": [
                {"content": "新薬の手引き", "role": "title"},
                {"content": "1", "role": "pageNumber"},
                {"content": "投与方法", "role": "sectionHeading"},
                {"content": "1日1回経口投与する。"}
            ],
            "tables": [{
                "rowCount": 2,
                "columnCount": 2,
                "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "用量"},
                    {"rowIndex": 0, "columnIndex": 1, "content": "回数"},
                    {"rowIndex": 1, "columnIndex": 0, "content": "10mg"},
                    {"rowIndex": 1, "columnIndex": 1, "content": "1回"}
                ]
            }],
            "keyValuePairs": [
                {"key": {"content": "対象"}, "value": {"content": "薬剤師"}},
                {"key": {"content": "空欄"}}
            ]
        }
    })
}

#[tokio::test]
async fn test_analysis_polls_until_succeeded() {
    let server = MockServer::start().await;
    mount_submit(&server, "prebuilt-layout").await;

    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "guide.pdf", SourceKind::Document, b"%PDF-1.7");
    let unit = analyzer(&server).analyze(&file).await.unwrap();

    let tags: Vec<&FragmentTag> = unit.fragments.iter().map(|f| &f.tag).collect();
    assert_eq!(
        tags,
        vec![
            &FragmentTag::Heading { level: 1 },
            &FragmentTag::Heading { level: 2 },
            &FragmentTag::Text,
            &FragmentTag::Table,
            &FragmentTag::KeyValue {
                key: "対象".to_string()
            },
        ]
    );
    assert_eq!(unit.fragments[3].text, "用量 | 回数\n10mg | 1回");
    assert_eq!(unit.source_name, "guide.pdf");
}

#[tokio::test]
async fn test_office_files_use_the_read_model() {
    let server = MockServer::start().await;
    mount_submit(&server, "prebuilt-read").await;
    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "analyzeResult": {
                "pages": [{"pageNumber": 1, "lines": [{"content": "スライド1"}, {"content": "要点"}]}]
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "deck.pptx", SourceKind::Presentation, b"PK");
    let unit = analyzer(&server).analyze(&file).await.unwrap();

    assert_eq!(unit.fragments.len(), 1);
    assert_eq!(unit.fragments[0].text, "スライド1\n要点");
}

#[tokio::test]
async fn test_submit_is_retried_on_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_submit(&server, "prebuilt-layout").await;
    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "guide.pdf", SourceKind::Document, b"%PDF-1.7");
    let unit = analyzer(&server).analyze(&file).await.unwrap();

    assert!(unit.has_content());
    let posts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid subscription key"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "guide.pdf", SourceKind::Document, b"%PDF-1.7");
    let err = analyzer(&server).analyze(&file).await.unwrap_err();

    match err {
        KoseiError::Extraction { file, cause } => {
            assert_eq!(file, "guide.pdf");
            assert!(cause.contains("401"));
            assert!(cause.contains("invalid subscription key"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_operation_is_an_extraction_error() {
    let server = MockServer::start().await;
    mount_submit(&server, "prebuilt-layout").await;
    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "error": {"code": "InvalidContent", "message": "The file is corrupted"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "broken.pdf", SourceKind::Document, b"not a pdf");
    let err = analyzer(&server).analyze(&file).await.unwrap_err();

    match err {
        KoseiError::Extraction { cause, .. } => {
            assert!(cause.contains("InvalidContent: The file is corrupted"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_analysis_deadline() {
    let server = MockServer::start().await;
    mount_submit(&server, "prebuilt-layout").await;
    Mock::given(method("GET"))
        .and(path("/operations/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "slow.pdf", SourceKind::Document, b"%PDF-1.7");
    let err = analyzer(&server)
        .with_deadline(Duration::from_millis(100))
        .analyze(&file)
        .await
        .unwrap_err();

    assert!(matches!(err, KoseiError::Extraction { .. }));
    assert!(err.to_string().contains("did not finish"));
}

fn transcriber(server: &MockServer) -> DeepgramTranscriber {
    let settings = TranscriptionSettings {
        base_url: server.uri(),
        ..TranscriptionSettings::default()
    };
    DeepgramTranscriber::new(&settings, "dg-key", fast_retry()).unwrap()
}

#[tokio::test]
async fn test_transcription_with_speakers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/listen"))
        .and(query_param("language", "ja"))
        .and(query_param("diarize", "true"))
        .and(query_param("utterances", "true"))
        .and(header("Authorization", "Token dg-key"))
        .and(header("Content-Type", "audio/mpeg"))
        .and(body_bytes(b"ID3audio".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"duration": 75.5},
            "results": {
                "channels": [{"alternatives": [{"transcript": "こんにちは。質問があります。", "confidence": 0.93}]}],
                "utterances": [
                    {"start": 0.0, "end": 2.1, "transcript": "こんにちは。", "speaker": 0},
                    {"start": 62.0, "end": 65.0, "transcript": "質問があります。", "speaker": 1}
                ]
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "talk.mp3", SourceKind::Audio, b"ID3audio");
    let unit = transcriber(&server).transcribe(&file).await.unwrap();

    assert_eq!(unit.duration_seconds, Some(75.5));
    assert_eq!(unit.utterance_count(), 2);
    assert_eq!(unit.fragments[1].text, "質問があります。");
    assert_eq!(
        unit.fragments[1].tag,
        FragmentTag::Utterance {
            start_seconds: 62.0,
            end_seconds: 65.0,
            speaker: Some(1)
        }
    );
}

#[tokio::test]
async fn test_transcription_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/listen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {"channels": [{"alternatives": [{"transcript": "短い録音です。"}]}]}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "memo.mp3", SourceKind::Audio, b"ID3");
    let unit = transcriber(&server).transcribe(&file).await.unwrap();

    assert_eq!(unit.fragments.len(), 1);
    assert_eq!(unit.fragments[0].text, "短い録音です。");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_transcription_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = source(&dir, "long.mp3", SourceKind::Audio, b"ID3");
    let err = transcriber(&server)
        .with_deadline(Duration::from_millis(100))
        .transcribe(&file)
        .await
        .unwrap_err();

    match err {
        KoseiError::TranscriptionTimeout { file, .. } => assert_eq!(file, "long.mp3"),
        other => panic!("unexpected error: {:?}", other),
    }
}

const OUTLINE: &str = "#大構成\n1. 概要（約300字）\n2. 投与方法（約500字）\n";

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn rate_limited() -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_json(json!({
        "error": {
            "message": "Rate limit reached",
            "type": "rate_limit_error",
            "code": "rate_limit_exceeded",
            "param": null
        }
    }))
}

fn structure_generator(server: &MockServer) -> StructureGenerator {
    let settings = GenerationSettings {
        base_url: server.uri(),
        ..GenerationSettings::default()
    };
    let generator = OpenAiGenerator::new(&settings, "test-model", "gen-key").unwrap();
    StructureGenerator::new(Arc::new(generator), Prompts::default(), fast_retry())
}

fn talk_corpus(dir: &TempDir) -> Corpus {
    let file = source(dir, "plan.docx", SourceKind::Document, b"PK");
    let unit = ExtractedUnit::new(&file, vec![Fragment::text("高血圧の管理")]);
    Corpus::assemble(vec![unit], None).unwrap()
}

fn chat_completions() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer gen-key"))
        .and(body_partial_json(json!({"model": "test-model"})))
}

#[tokio::test]
async fn test_generation_parses_completion() {
    let server = MockServer::start().await;
    chat_completions()
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(OUTLINE)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generated = structure_generator(&server)
        .generate(&talk_corpus(&dir))
        .await
        .unwrap();

    let titles: Vec<&str> = generated
        .outline
        .sections()
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(titles, vec!["概要", "投与方法"]);
    assert_eq!(generated.raw, OUTLINE);

    let request = &server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("高血圧の管理"));
}

#[tokio::test]
async fn test_generation_rate_limit_is_retried() {
    let server = MockServer::start().await;
    chat_completions()
        .respond_with(rate_limited())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    chat_completions()
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(OUTLINE)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generated = structure_generator(&server)
        .generate(&talk_corpus(&dir))
        .await
        .unwrap();

    assert_eq!(generated.outline.len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_generation_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    chat_completions()
        .respond_with(rate_limited())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generator = structure_generator(&server);
    let corpus = talk_corpus(&dir);
    let err = tokio::time::timeout(Duration::from_secs(10), generator.generate(&corpus))
        .await
        .expect("generation should not keep retrying")
        .unwrap_err();

    assert!(matches!(err, KoseiError::GenerationFailed(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
