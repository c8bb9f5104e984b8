// ==========================================
// 库存与采购预测系统 - 配置层
// ==========================================
// 职责: 预测参数等系统配置管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ForecastConfigReader};
