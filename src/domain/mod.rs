// ==========================================
// 库存与采购预测系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、字段清洗规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod movement;
pub mod product;
pub mod types;

// 重导出核心类型
pub use movement::{coerce_str_to_utc, Movement, MovementPatch};
pub use product::{quantize_money, NewProduct, Product, ProductPatch};
pub use types::MovementType;
