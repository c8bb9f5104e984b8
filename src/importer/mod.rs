// ==========================================
// 库存与采购预测系统 - 数据导入模块
// ==========================================
// 职责: CSV 移动记录批量导入
// ==========================================

pub mod error;
pub mod movement_csv;

// 重导出核心类型
pub use error::ImportError;
pub use movement_csv::{ImportReport, MovementCsvImporter, RowError};
