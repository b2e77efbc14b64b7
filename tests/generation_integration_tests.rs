//! Integration tests for generation ordering
//!
//! These tests verify that:
//! - Overlapping requests completing out of order display only the latest
//! - A session's listener issues requests as the user types
//! - Manual mode renders only on demand
//! - A failed render keeps the previous preview
//! - An invalid edit issues nothing and leaves the in-flight request displayable
//! - A stalled template store does not hold back generation

mod support;

use barcode_studio::models::{BarcodeConfig, StudioSettings};
use barcode_studio::services::{
    GenerationError, GenerationOrchestrator, GenerationOutcome, GenerationPhase,
    JsonFileTemplateStore, ManualTriggerRejected, NoticeLevel, Notifier, StaticLayout, is_png,
};
use barcode_studio::state::ConfigurationStore;
use barcode_studio::{Collaborators, Session};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{GatedRenderer, StallingTemplateStore, png_for, wait_for};
use tokio::time::{Duration, timeout};

fn session_settings(auto_generate: bool) -> StudioSettings {
    StudioSettings {
        auto_generate,
        ..StudioSettings::default()
    }
}

fn blank_layout() -> Arc<StaticLayout> {
    Arc::new(StaticLayout::new(BarcodeConfig {
        payload: String::new(),
        ..BarcodeConfig::default()
    }))
}

fn collaborators(renderer: Arc<GatedRenderer>, dir: &tempfile::TempDir) -> Collaborators {
    let path = dir.path().join("templates.json");
    Collaborators {
        renderer,
        templates: Arc::new(JsonFileTemplateStore::new(path.to_str().unwrap())),
        layout: blank_layout(),
    }
}

#[tokio::test]
async fn test_out_of_order_completions_display_latest() {
    let renderer = Arc::new(GatedRenderer::default());
    let store = ConfigurationStore::new();
    let orchestrator = Arc::new(GenerationOrchestrator::new(
        renderer.clone(),
        store.clone(),
        Notifier::default(),
        true,
    ));

    let mut handles = Vec::new();
    let mut gates = Vec::new();
    for payload in ["A", "AB", "ABC"] {
        gates.push(renderer.gate(payload));
        store.set_payload(payload);
        let ticket = orchestrator.on_config_changed(&store.current()).unwrap();
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move { orchestrator.execute(ticket).await }));
    }
    wait_for(|| renderer.calls() == 3).await;

    // Release newest first
    let [a, ab, abc]: [_; 3] = gates.try_into().unwrap();
    abc.send(Ok(png_for("ABC"))).unwrap();
    ab.send(Ok(png_for("AB"))).unwrap();
    a.send(Ok(png_for("A"))).unwrap();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            GenerationOutcome::Stale { sequence: 1, latest: 3 },
            GenerationOutcome::Stale { sequence: 2, latest: 3 },
            GenerationOutcome::Displayed { sequence: 3 },
        ]
    );
    let preview = store.preview().unwrap();
    assert_eq!(preview.sequence, 3);
    assert_eq!(preview.png, png_for("ABC"));
    assert_eq!(orchestrator.phase(), GenerationPhase::Succeeded);
}

#[tokio::test]
async fn test_session_typing_displays_final_payload() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(GatedRenderer::default());
    let a = renderer.gate("A");
    let ab = renderer.gate("AB");
    let abc = renderer.gate("ABC");

    let session = Session::start(&session_settings(true), collaborators(renderer.clone(), &dir)).await;
    let mut outcomes = session.orchestrator().subscribe_outcomes();

    session.store().set_payload("A");
    session.store().set_payload("AB");
    session.store().set_payload("ABC");
    wait_for(|| renderer.calls() == 3).await;

    abc.send(Ok(png_for("ABC"))).unwrap();
    a.send(Ok(png_for("A"))).unwrap();
    ab.send(Ok(png_for("AB"))).unwrap();

    let mut displayed = Vec::new();
    for _ in 0..3 {
        let outcome = timeout(Duration::from_millis(100), outcomes.recv())
            .await
            .expect("Timeout waiting for outcome")
            .expect("Channel closed");
        if let GenerationOutcome::Displayed { sequence } = outcome {
            displayed.push(sequence);
        }
    }

    assert_eq!(displayed, vec![3]);
    let preview = session.store().preview().unwrap();
    assert_eq!(preview.config.payload, "ABC");
    assert!(is_png(&preview.png));
    assert_eq!(session.metrics().generations_stale.load(Ordering::Relaxed), 2);
    session.shutdown();
}

#[tokio::test]
async fn test_manual_mode_renders_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(GatedRenderer::default());
    let session = Session::start(&session_settings(false), collaborators(renderer.clone(), &dir)).await;

    session.store().set_payload("MANUAL");
    tokio::task::yield_now().await;
    assert_eq!(renderer.calls(), 0);

    let gate = renderer.gate("MANUAL");
    let handle = session.generate_now().unwrap();
    assert!(!session.orchestrator().manual_trigger_enabled());
    assert_eq!(
        session.generate_now().unwrap_err(),
        ManualTriggerRejected::InProgress
    );

    gate.send(Ok(png_for("MANUAL"))).unwrap();
    let outcome = timeout(Duration::from_millis(100), handle)
        .await
        .expect("Timeout waiting for generation")
        .unwrap();

    assert_eq!(outcome, GenerationOutcome::Displayed { sequence: 1 });
    assert!(session.orchestrator().manual_trigger_enabled());
    assert_eq!(session.store().preview().unwrap().config.payload, "MANUAL");
}

#[tokio::test]
async fn test_failed_render_keeps_previous_preview() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(GatedRenderer::default());
    let session = Session::start(&session_settings(true), collaborators(renderer.clone(), &dir)).await;
    let mut notices = session.subscribe_notices();
    let mut outcomes = session.orchestrator().subscribe_outcomes();

    session.store().set_payload("GOOD");
    let first = timeout(Duration::from_millis(100), outcomes.recv())
        .await
        .expect("Timeout waiting for outcome")
        .expect("Channel closed");
    assert_eq!(first, GenerationOutcome::Displayed { sequence: 1 });

    let gate = renderer.gate("BAD");
    session.store().set_payload("BAD");
    wait_for(|| renderer.calls() == 2).await;
    gate.send(Err(GenerationError::InvalidImage)).unwrap();

    let second = timeout(Duration::from_millis(100), outcomes.recv())
        .await
        .expect("Timeout waiting for outcome")
        .expect("Channel closed");
    assert!(matches!(second, GenerationOutcome::Failed { sequence: 2, .. }));
    assert_eq!(session.orchestrator().phase(), GenerationPhase::Failed);
    assert_eq!(session.store().preview().unwrap().config.payload, "GOOD");

    let notice = timeout(Duration::from_millis(100), notices.recv())
        .await
        .expect("Timeout waiting for notice")
        .expect("Channel closed");
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_invalid_payload_blocks_auto_generation() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(GatedRenderer::default());
    let session = Session::start(&session_settings(true), collaborators(renderer.clone(), &dir)).await;
    let mut notices = session.subscribe_notices();

    session.store().set_symbology("EAN13");
    session.store().set_payload("12345");

    let notice = timeout(Duration::from_millis(100), notices.recv())
        .await
        .expect("Timeout waiting for notice")
        .expect("Channel closed");
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "EAN13 requires at least 13 characters");
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_invalid_edit_keeps_in_flight_result() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(GatedRenderer::default());
    let session = Session::start(&session_settings(true), collaborators(renderer.clone(), &dir)).await;
    let mut notices = session.subscribe_notices();
    let mut outcomes = session.orchestrator().subscribe_outcomes();

    session.store().set_symbology("Code39");
    let gate = renderer.gate("ABC");
    session.store().set_payload("ABC");
    wait_for(|| renderer.calls() == 1).await;

    session.store().set_payload("ab");
    let notice = timeout(Duration::from_millis(100), notices.recv())
        .await
        .expect("Timeout waiting for notice")
        .expect("Channel closed");
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(session.orchestrator().latest_sequence(), 1);

    gate.send(Ok(png_for("ABC"))).unwrap();
    let outcome = timeout(Duration::from_millis(100), outcomes.recv())
        .await
        .expect("Timeout waiting for outcome")
        .expect("Channel closed");

    assert_eq!(outcome, GenerationOutcome::Displayed { sequence: 1 });
    assert_eq!(session.store().preview().unwrap().config.payload, "ABC");
    assert_eq!(session.store().current().payload, "ab");
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn test_stalled_template_reload_does_not_block_generation() {
    let renderer = Arc::new(GatedRenderer::default());
    let templates = Arc::new(StallingTemplateStore::default());
    let collaborators = Collaborators {
        renderer: renderer.clone(),
        templates: templates.clone(),
        layout: blank_layout(),
    };
    let session = Session::start(&session_settings(true), collaborators).await;

    session.store().set_symbology("Code39");
    wait_for(|| templates.listings() == 2).await;

    session.store().set_payload("HELLO");
    wait_for(|| renderer.calls() == 1).await;
    wait_for(|| session.store().preview().is_some()).await;
    assert_eq!(session.store().preview().unwrap().config.payload, "HELLO");

    session.store().set_symbology("Code93");
    session.store().set_payload("HELLO 93");
    wait_for(|| renderer.calls() == 2).await;
}
