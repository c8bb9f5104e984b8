// ==========================================
// 库存与采购预测系统 - 采购预测引擎
// ==========================================
// 模型: 活跃日净变动移动平均 + 覆盖天数安全缓冲
// 红线: 预测本身不产生领域错误，数据不足按产品降级跳过
// ==========================================
// 输入: 移动历史快照 + 产品库存快照 + 预测参数
// 输出: product_id → 建议采购数量（仅保留正数项）
// ==========================================

use crate::engine::snapshot::ForecastDataSource;
use crate::repository::error::RepositoryResult;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

// ==========================================
// ForecastParams - 预测参数
// ==========================================

/// 预测参数
///
/// - horizon_days: 需求外推天数
/// - window_days: 回看移动历史的窗口天数
/// - cover_days: 以"日均需求天数"表达的安全缓冲
/// - min_records: 信任主窗口所需的最少移动记录数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastParams {
    pub horizon_days: i64,
    pub window_days: i64,
    pub cover_days: i64,
    pub min_records: i64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            window_days: 180,
            cover_days: 30,
            min_records: 30,
        }
    }
}

// ==========================================
// PurchaseSuggestion - 展示用预测条目
// ==========================================

/// 面向前端的预测条目（JSON 键名为对外契约，不可改）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseSuggestion {
    pub producto: String,
    pub prediccion: i64,
}

// ==========================================
// ForecastEngine - 预测引擎
// ==========================================

/// 采购预测引擎（无状态）
///
/// 算法步骤:
/// 1. 窗口起点 = today − window_days，查询窗口内移动
/// 2. 记录数 < min_records 时放弃窗口过滤，改查全量历史并扩窗到最早记录
/// 3. 按产品、按日历日聚合带符号数量为日净变动
/// 4. 从窗口起点构造逐日稠密序列，无移动的日子补 0
/// 5. 非零日数 < max(1, min_records / 3) 的产品直接跳过（稀疏保护）
/// 6. qty = max(round(avg_daily·horizon + avg_daily·cover − stock), 0)，0 省略
pub struct ForecastEngine;

impl ForecastEngine {
    pub fn new() -> Self {
        Self
    }

    /// 计算各产品的建议采购数量
    ///
    /// today 显式传入以保证可复现；结果为 BTreeMap，迭代顺序确定
    #[instrument(skip(self, source), fields(window_days = params.window_days))]
    pub fn compute_purchase_needs(
        &self,
        source: &dyn ForecastDataSource,
        today: NaiveDate,
        params: &ForecastParams,
    ) -> RepositoryResult<BTreeMap<String, i64>> {
        let mut window_days = params.window_days;
        let mut start = today - Duration::days(window_days);

        // 步骤1: 主窗口查询
        let mut rows = source.query_movements(Some(start))?;

        // 步骤2: 自适应扩窗
        if (rows.len() as i64) < params.min_records {
            rows = source.query_movements(None)?;
            if let Some(earliest) = rows.iter().map(|r| r.date.date_naive()).min() {
                window_days = (today - earliest).num_days() + 1;
                start = earliest;
            }
        }

        // 步骤3: 日净变动聚合（产品 → 日历日 → 净变动）
        let mut daily_net: BTreeMap<String, BTreeMap<NaiveDate, i64>> = BTreeMap::new();
        for record in &rows {
            let day = record.date.date_naive();
            let signed = record.movement_type.signed_quantity(record.quantity);
            *daily_net
                .entry(record.product_id.clone())
                .or_default()
                .entry(day)
                .or_insert(0) += signed;
        }

        // 库存快照：预测时刻读取一次，与移动查询之间不持锁
        let mut stock: BTreeMap<String, i64> = BTreeMap::new();
        for product in source.list_products()? {
            stock.insert(product.product_id, product.stk_qty);
        }

        let guard_threshold = std::cmp::max(1, params.min_records / 3);
        let mut needs: BTreeMap<String, i64> = BTreeMap::new();

        for (product_id, by_day) in &daily_net {
            // 步骤4: 稠密序列（仅未来记录导致 window_days < 0 时序列为空）
            let series_len = window_days.max(0);
            let non_zero: Vec<i64> = (0..series_len)
                .map(|offset| {
                    by_day
                        .get(&(start + Duration::days(offset)))
                        .copied()
                        .unwrap_or(0)
                })
                .filter(|net| *net != 0)
                .collect();

            // 步骤5: 稀疏保护
            if (non_zero.len() as i64) < guard_threshold {
                tracing::debug!(
                    product_id = %product_id,
                    non_zero_days = non_zero.len(),
                    guard_threshold,
                    "产品信号不足，跳过预测"
                );
                continue;
            }

            // 步骤6: 活跃日均值外推 + 截断
            let avg_daily = non_zero.iter().sum::<i64>() as f64 / non_zero.len() as f64;
            let demand = avg_daily * params.horizon_days as f64;
            let buffer = avg_daily * params.cover_days as f64;
            let current_stock = stock.get(product_id).copied().unwrap_or(0);

            let qty = round_ties_even(demand + buffer - current_stock as f64).max(0);
            if qty > 0 {
                needs.insert(product_id.clone(), qty);
            }
        }

        tracing::info!(
            movements = rows.len(),
            products_forecasted = needs.len(),
            window_days,
            "采购预测完成"
        );

        Ok(needs)
    }

    /// 展示形式: 关联产品名称（缺失产品回退为原始 id）
    pub fn purchase_report(
        &self,
        source: &dyn ForecastDataSource,
        today: NaiveDate,
        params: &ForecastParams,
    ) -> RepositoryResult<Vec<PurchaseSuggestion>> {
        let needs = self.compute_purchase_needs(source, today, params)?;

        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for product in source.list_products()? {
            names.insert(product.product_id, product.product_name);
        }

        Ok(needs
            .into_iter()
            .map(|(product_id, qty)| PurchaseSuggestion {
                producto: names.get(&product_id).cloned().unwrap_or(product_id),
                prediccion: qty,
            })
            .collect())
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 四舍六入五成双（与参考输出对齐）
fn round_ties_even(value: f64) -> i64 {
    let floor = value.floor();
    let diff = value - floor;
    if (diff - 0.5).abs() < f64::EPSILON {
        let below = floor as i64;
        if below % 2 == 0 {
            below
        } else {
            below + 1
        }
    } else {
        value.round() as i64
    }
}
