// ==========================================
// 库存与采购预测系统 - API 层
// ==========================================
// 职责: 校验输入、编排存储与引擎调用、产出面向用户的 DTO 与消息
// ==========================================

pub mod error;
pub mod forecast_api;
pub mod movement_api;
pub mod product_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use forecast_api::ForecastApi;
pub use movement_api::{CreateMovementRequest, MovementApi, MovementDto, MovementUpdateRequest};
pub use product_api::{CreateProductRequest, ProductApi, ProductDto, ProductUpdateRequest};
