// ==========================================
// 库存与采购预测系统 - 库存移动 API
// ==========================================
// 职责: 移动记录的校验、CRUD、DTO 变换
// 契约: 所有面向用户的消息取自西语消息目录
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::movement::{coerce_str_to_utc, Movement, MovementPatch};
use crate::domain::types::MovementType;
use crate::i18n::{t, t_with_args};
use crate::perf::PerfGuard;
use crate::repository::MovementRepository;

// ==========================================
// DTO 定义
// ==========================================

/// 创建移动记录的请求体
///
/// 必填字段用 Option 承载，以便缺失校验能一次性报出全部缺失项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMovementRequest {
    pub movement_id: Option<String>,
    pub date: Option<String>,
    pub product_id: Option<String>,
    pub movement_type: Option<String>,
    pub quantity: Option<i64>,
    pub order_id: Option<String>,
    pub notes: Option<String>,
}

/// 部分更新请求（编译期白名单，主键不可改）
///
/// order_id/notes 用双层 Option 区分"不改"与"置空"
#[derive(Debug, Clone, Default)]
pub struct MovementUpdateRequest {
    pub date: Option<String>,
    pub product_id: Option<String>,
    pub movement_type: Option<String>,
    pub quantity: Option<i64>,
    pub order_id: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// 对外移动记录 DTO（日期输出为 RFC 3339 UTC 文本）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementDto {
    pub movement_id: String,
    pub date: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub order_id: Option<String>,
    pub notes: Option<String>,
}

impl From<Movement> for MovementDto {
    fn from(m: Movement) -> Self {
        Self {
            movement_id: m.movement_id,
            date: m.date.to_rfc3339(),
            product_id: m.product_id,
            movement_type: m.movement_type,
            quantity: m.quantity,
            order_id: m.order_id,
            notes: m.notes,
        }
    }
}

// ==========================================
// MovementApi - 库存移动 API
// ==========================================

/// 库存移动 API
///
/// 职责：
/// 1. 必填字段/日期格式/数量校验
/// 2. 存储层完整性错误 → 用户可读冲突消息（原始错误不外泄）
/// 3. DTO 变换
pub struct MovementApi {
    movement_repo: Arc<MovementRepository>,
}

impl MovementApi {
    pub fn new(movement_repo: Arc<MovementRepository>) -> Self {
        Self { movement_repo }
    }

    // ==========================================
    // 写接口
    // ==========================================

    /// 创建移动记录
    ///
    /// 校验顺序（与参考契约一致）:
    /// 1. 必填字段齐全（缺失项按字母序逗号连接报出）
    /// 2. 日期清洗为 UTC
    /// 3. 移动类型 IN/OUT
    /// 4. 数量为正整数
    pub fn create_movement(&self, request: CreateMovementRequest) -> ApiResult<MovementDto> {
        let _perf = PerfGuard::new("create_movement");

        // 必填字段校验
        let mut missing: Vec<&str> = Vec::new();
        if request.movement_id.is_none() {
            missing.push("movement_id");
        }
        if request.date.is_none() {
            missing.push("date");
        }
        if request.product_id.is_none() {
            missing.push("product_id");
        }
        if request.movement_type.is_none() {
            missing.push("movement_type");
        }
        if request.quantity.is_none() {
            missing.push("quantity");
        }
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(ApiError::Validation(t_with_args(
                "movement.missing_fields",
                &[("fields", &missing.join(", "))],
            )));
        }

        // 上面已保证必填字段存在
        let movement_id = request.movement_id.unwrap_or_default();
        let raw_date = request.date.unwrap_or_default();
        let product_id = request.product_id.unwrap_or_default();
        let raw_type = request.movement_type.unwrap_or_default();
        let quantity = request.quantity.unwrap_or_default();

        let date = coerce_str_to_utc(&raw_date).map_err(ApiError::Validation)?;

        let movement_type = MovementType::from_str(&raw_type)
            .ok_or_else(|| ApiError::Validation(t("movement.invalid_type")))?;

        if quantity <= 0 {
            return Err(ApiError::Validation(t("movement.quantity_positive")));
        }

        let movement = Movement {
            movement_id,
            date,
            product_id,
            movement_type,
            quantity,
            order_id: request.order_id,
            notes: request.notes,
        };

        self.movement_repo.insert(&movement).map_err(|e| {
            if e.is_constraint_violation() {
                error!(movement_id = %movement.movement_id, cause = %e, "移动记录创建冲突");
                ApiError::Conflict(t("movement.duplicate_or_invalid"))
            } else {
                ApiError::from(e)
            }
        })?;

        info!(
            movement_id = %movement.movement_id,
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "移动记录已创建"
        );

        Ok(MovementDto::from(movement))
    }

    /// 按白名单部分更新
    ///
    /// date 若出现则重新清洗；主键不可变
    pub fn update_movement(
        &self,
        movement_id: &str,
        request: MovementUpdateRequest,
    ) -> ApiResult<MovementDto> {
        let _perf = PerfGuard::new("update_movement");

        let date = match request.date {
            Some(ref raw) => Some(coerce_str_to_utc(raw).map_err(ApiError::Validation)?),
            None => None,
        };

        let movement_type = match request.movement_type {
            Some(ref raw) => Some(
                MovementType::from_str(raw)
                    .ok_or_else(|| ApiError::Validation(t("movement.invalid_type")))?,
            ),
            None => None,
        };

        if let Some(quantity) = request.quantity {
            if quantity <= 0 {
                return Err(ApiError::Validation(t("movement.quantity_positive")));
            }
        }

        let patch = MovementPatch {
            date,
            product_id: request.product_id,
            movement_type,
            quantity: request.quantity,
            order_id: request.order_id,
            notes: request.notes,
        };

        let updated = self.movement_repo.update(movement_id, &patch).map_err(|e| match e {
            crate::repository::RepositoryError::NotFound { .. } => {
                ApiError::NotFound(t("movement.not_found"))
            }
            e if e.is_constraint_violation() => {
                error!(movement_id, cause = %e, "移动记录更新冲突");
                ApiError::Conflict(t("movement.duplicate_or_invalid"))
            }
            e => ApiError::from(e),
        })?;

        info!(movement_id, "移动记录已更新");
        Ok(MovementDto::from(updated))
    }

    /// 删除移动记录
    pub fn delete_movement(&self, movement_id: &str) -> ApiResult<()> {
        let _perf = PerfGuard::new("delete_movement");

        self.movement_repo.delete(movement_id).map_err(|e| match e {
            crate::repository::RepositoryError::NotFound { .. } => {
                ApiError::NotFound(t("movement.not_found"))
            }
            e => ApiError::from(e),
        })?;

        info!(movement_id, "移动记录已删除");
        Ok(())
    }

    // ==========================================
    // 读接口
    // ==========================================

    /// 查询移动记录（按日期倒序）
    ///
    /// page/per_page 同时给定时分页（越界返回空页），否则全量
    pub fn list_movements(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> ApiResult<Vec<MovementDto>> {
        let _perf = PerfGuard::new("list_movements");

        let movements = self.movement_repo.list_all(page, per_page)?;
        Ok(movements.into_iter().map(MovementDto::from).collect())
    }

    /// 按主键查询（不存在返回 None，由调用方决策）
    pub fn get_movement(&self, movement_id: &str) -> ApiResult<Option<MovementDto>> {
        let movement = self.movement_repo.get_by_id(movement_id)?;
        Ok(movement.map(MovementDto::from))
    }
}
