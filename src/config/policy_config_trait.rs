// ==========================================
// 解耦点策略引擎 - 策略配置读取 Trait
// ==========================================
// 职责: 定义方案/自动指定所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// PolicyConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PolicyConfigReader: Send + Sync {
    /// 新建方案的默认自动指定阈值
    ///
    /// # 默认值
    /// - 70
    async fn get_default_auto_designate_threshold(&self) -> ConfigResult<f64>;

    /// 新建方案的默认复核阈值
    ///
    /// # 默认值
    /// - 50
    async fn get_default_review_threshold(&self) -> ConfigResult<f64>;

    /// 目录未给出缓冲配置时使用的缓冲配置ID
    ///
    /// # 默认值
    /// - BP_DEFAULT
    async fn get_default_buffer_profile_id(&self) -> ConfigResult<String>;

    /// 单次自动指定最多处理的产品-地点对数量
    ///
    /// # 默认值
    /// - 500
    async fn get_auto_designation_batch_size(&self) -> ConfigResult<usize>;
}
