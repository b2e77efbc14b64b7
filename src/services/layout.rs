use anyhow::Result;
use async_trait::async_trait;

use crate::models::{BarcodeConfig, Envelope, Layout};

/// Supplies the configuration a session starts from
#[async_trait]
pub trait LayoutSource: Send + Sync {
    async fn get_layout(&self) -> Result<Envelope<Layout>>;
}

/// Always answers with the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLayout {
    layout: Layout,
}

impl StaticLayout {
    pub fn new(config: BarcodeConfig) -> Self {
        Self {
            layout: Layout { config },
        }
    }
}

impl Default for StaticLayout {
    fn default() -> Self {
        Self::new(BarcodeConfig::default())
    }
}

#[async_trait]
impl LayoutSource for StaticLayout {
    async fn get_layout(&self) -> Result<Envelope<Layout>> {
        Ok(Envelope::ok("Layout retrieved successfully", self.layout.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_layout_answers_its_config() {
        let config = BarcodeConfig {
            symbology: "QRCode".to_string(),
            ..BarcodeConfig::default()
        };
        let source = StaticLayout::new(config.clone());

        let envelope = tokio_test::block_on(source.get_layout()).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().config, config);
    }
}
