//! 影像分析

use async_trait::async_trait;
use xray_core::{AnalysisResult, Result};

/// 占位分析器的固定结论
pub const STUB_RESULT: &str = "No abnormalities detected";
/// 占位分析器的固定置信度
pub const STUB_CONFIDENCE: f64 = 0.95;

/// 影像分析能力
///
/// 接收一个可读取的影像位置，返回结论和 [0, 1] 区间的置信度。
/// 替换实现时调用方无需改动。
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image_location: &str) -> Result<AnalysisResult>;
}

/// 占位分析器，忽略输入，总是返回固定结果
#[derive(Debug, Clone, Default)]
pub struct StubAnalyzer;

impl StubAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageAnalyzer for StubAnalyzer {
    async fn analyze(&self, image_location: &str) -> Result<AnalysisResult> {
        tracing::debug!("Stub analysis for {}", image_location);
        Ok(AnalysisResult {
            result: STUB_RESULT.to_string(),
            confidence: STUB_CONFIDENCE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_ignores_input() {
        let analyzer = StubAnalyzer::new();
        let a = analyzer.analyze("uploads/1_a.png").await.unwrap();
        let b = analyzer.analyze("https://example.com/b.jpg").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.result, "No abnormalities detected");
        assert_eq!(a.confidence, 0.95);
    }
}
