// ==========================================
// 解耦点策略引擎 - 配置层
// ==========================================
// 职责: 策略参数管理（默认阈值、默认缓冲配置、批量大小）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod policy_config_trait;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, get_default_db_path, ConfigManager, DEFAULT_AUTO_DESIGNATION_BATCH_SIZE,
    DEFAULT_BUFFER_PROFILE_ID,
};
pub use policy_config_trait::{ConfigResult, PolicyConfigReader};
