//! Shared fakes for the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use barcode_studio::models::{BarcodeConfig, Envelope, Layout, Template};
use barcode_studio::services::{
    GenerationError, LayoutSource, PNG_SIGNATURE, Renderer, TemplateStore,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep, timeout};

pub type RenderResult = Result<Vec<u8>, GenerationError>;

/// A PNG-signed image whose body identifies the payload it was made for.
pub fn png_for(payload: &str) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

/// Renderer whose calls for a given payload block until the test releases them.
///
/// Payloads without a gate render immediately.
#[derive(Default)]
pub struct GatedRenderer {
    gates: Mutex<HashMap<String, oneshot::Receiver<RenderResult>>>,
    calls: AtomicUsize,
}

impl GatedRenderer {
    pub fn gate(&self, payload: &str) -> oneshot::Sender<RenderResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(payload.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for GatedRenderer {
    async fn generate(&self, config: &BarcodeConfig) -> RenderResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(&config.payload);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(GenerationError::Process("gate dropped".to_string()))),
            None => Ok(png_for(&config.payload)),
        }
    }
}

pub struct FailingLayout;

#[async_trait]
impl LayoutSource for FailingLayout {
    async fn get_layout(&self) -> Result<Envelope<Layout>> {
        Ok(Envelope::failure("layout service unavailable"))
    }
}

/// Template store that answers the first listing and never answers again.
#[derive(Default)]
pub struct StallingTemplateStore {
    listings: AtomicUsize,
}

impl StallingTemplateStore {
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateStore for StallingTemplateStore {
    async fn save_template(&self, _template: Template) -> Result<Envelope<Template>> {
        std::future::pending().await
    }

    async fn get_templates(&self) -> Result<Envelope<Vec<Template>>> {
        if self.listings.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(Envelope::ok("Templates retrieved successfully", Vec::new()));
        }
        std::future::pending().await
    }

    async fn get_template(&self, _id: &str) -> Result<Envelope<Template>> {
        std::future::pending().await
    }

    async fn delete_template(&self, _id: &str) -> Result<Envelope<()>> {
        std::future::pending().await
    }
}

/// Poll `condition` until it holds, panicking after one second.
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(1), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Timeout waiting for condition");
}
