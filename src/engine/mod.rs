// ==========================================
// 库存与采购预测系统 - 引擎层
// ==========================================
// 职责: 采购预测核心算法
// 红线: Engine 不拼 SQL, 取数只经过快照读取接口
// ==========================================

pub mod forecast;
pub mod snapshot;

// 重导出核心引擎
pub use forecast::{ForecastEngine, ForecastParams, PurchaseSuggestion};
pub use snapshot::{ForecastDataSource, MovementRecord, ProductSnapshot, SqliteForecastDataSource};
