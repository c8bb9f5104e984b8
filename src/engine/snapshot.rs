// ==========================================
// 库存与采购预测系统 - 预测快照读取接口
// ==========================================
// 职责: 为预测引擎提供"移动历史 + 产品库存"的两段式快照读
// 说明: 两次读取之间不持锁，允许轻微陈旧（弱一致性权衡）。
//       接口收口在这里，后续若升级为一致性多读事务，算法形态不变。
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::{MovementRepository, ProductRepository};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::domain::types::MovementType;

// ==========================================
// 快照记录
// ==========================================

/// 预测引擎消费的移动记录投影
#[derive(Debug, Clone)]
pub struct MovementRecord {
    pub product_id: String,
    pub date: DateTime<Utc>,
    pub movement_type: MovementType,
    pub quantity: i64,
}

/// 预测引擎消费的产品投影（库存在预测时刻读取一次）
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub product_name: String,
    pub stk_qty: i64,
}

// ==========================================
// ForecastDataSource - 快照读取接口
// ==========================================

/// 预测数据源
///
/// 两个方法对应两次独立的快照读取：
/// - query_movements: since 为 None 时返回全量历史（扩窗用）
/// - list_products: 返回全部产品（含逻辑删除），缺失产品按库存 0 处理
pub trait ForecastDataSource: Send + Sync {
    fn query_movements(&self, since: Option<NaiveDate>) -> RepositoryResult<Vec<MovementRecord>>;

    fn list_products(&self) -> RepositoryResult<Vec<ProductSnapshot>>;
}

// ==========================================
// SqliteForecastDataSource - SQLite 实现
// ==========================================

/// 基于两个仓储的快照读取实现
pub struct SqliteForecastDataSource {
    movement_repo: Arc<MovementRepository>,
    product_repo: Arc<ProductRepository>,
}

impl SqliteForecastDataSource {
    pub fn new(
        movement_repo: Arc<MovementRepository>,
        product_repo: Arc<ProductRepository>,
    ) -> Self {
        Self {
            movement_repo,
            product_repo,
        }
    }
}

impl ForecastDataSource for SqliteForecastDataSource {
    fn query_movements(&self, since: Option<NaiveDate>) -> RepositoryResult<Vec<MovementRecord>> {
        let movements = self.movement_repo.query_since(since)?;

        Ok(movements
            .into_iter()
            .map(|m| MovementRecord {
                product_id: m.product_id,
                date: m.date,
                movement_type: m.movement_type,
                quantity: m.quantity,
            })
            .collect())
    }

    fn list_products(&self) -> RepositoryResult<Vec<ProductSnapshot>> {
        // 含逻辑删除的产品：历史移动仍可能引用它们
        let products = self.product_repo.list(false)?;

        Ok(products
            .into_iter()
            .map(|p| ProductSnapshot {
                product_id: p.product_id,
                product_name: p.product_name,
                stk_qty: p.stk_qty,
            })
            .collect())
    }
}
