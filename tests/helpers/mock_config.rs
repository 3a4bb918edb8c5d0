// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use decoupling_policy::config::{ConfigResult, PolicyConfigReader};

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockPolicyConfig {
    pub auto_designate_threshold: f64,
    pub review_threshold: f64,
    pub default_buffer_profile_id: String,
    pub batch_size: usize,
}

impl Default for MockPolicyConfig {
    fn default() -> Self {
        Self {
            auto_designate_threshold: 70.0,
            review_threshold: 50.0,
            default_buffer_profile_id: "BP_MOCK".to_string(),
            batch_size: 500,
        }
    }
}

impl MockPolicyConfig {
    /// 指定批量大小
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PolicyConfigReader for MockPolicyConfig {
    async fn get_default_auto_designate_threshold(&self) -> ConfigResult<f64> {
        Ok(self.auto_designate_threshold)
    }

    async fn get_default_review_threshold(&self) -> ConfigResult<f64> {
        Ok(self.review_threshold)
    }

    async fn get_default_buffer_profile_id(&self) -> ConfigResult<String> {
        Ok(self.default_buffer_profile_id.clone())
    }

    async fn get_auto_designation_batch_size(&self) -> ConfigResult<usize> {
        Ok(self.batch_size)
    }
}
