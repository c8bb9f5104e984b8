// ==========================================
// 库存与采购预测系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod movement_repo;
pub mod product_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use movement_repo::MovementRepository;
pub use product_repo::ProductRepository;
