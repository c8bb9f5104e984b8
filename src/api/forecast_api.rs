// ==========================================
// 库存与采购预测系统 - 预测 API
// ==========================================
// 职责: 组合配置参数 + 快照数据源 + 预测引擎
// 契约: 预测不报领域错误，数据不足的产品静默缺席
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ForecastConfigReader;
use crate::engine::forecast::{ForecastEngine, PurchaseSuggestion};
use crate::engine::snapshot::ForecastDataSource;
use crate::perf::PerfGuard;

// ==========================================
// ForecastApi - 预测 API
// ==========================================

/// 预测 API
///
/// 参数取值链: config_kv 覆写 → 引擎默认值（90/180/30/30）
pub struct ForecastApi {
    engine: Arc<ForecastEngine>,
    source: Arc<dyn ForecastDataSource>,
    config_reader: Arc<dyn ForecastConfigReader>,
}

impl ForecastApi {
    pub fn new(
        engine: Arc<ForecastEngine>,
        source: Arc<dyn ForecastDataSource>,
        config_reader: Arc<dyn ForecastConfigReader>,
    ) -> Self {
        Self {
            engine,
            source,
            config_reader,
        }
    }

    /// 建议采购数量（product_id → qty，升序、仅正数）
    pub async fn purchase_needs(&self) -> ApiResult<BTreeMap<String, i64>> {
        let _perf = PerfGuard::new("forecast_purchase_needs");

        let params = self.config_reader.get_forecast_params().await.map_err(|e| {
            error!(cause = %e, "预测参数读取失败");
            ApiError::Internal(crate::i18n::t("common.internal_error"))
        })?;

        let today = Utc::now().date_naive();
        let needs = self
            .engine
            .compute_purchase_needs(self.source.as_ref(), today, &params)?;

        info!(products = needs.len(), "采购需求计算完成");
        Ok(needs)
    }

    /// 展示形式的采购建议（产品名 + 数量，按 product_id 升序）
    pub async fn purchase_report(&self) -> ApiResult<Vec<PurchaseSuggestion>> {
        let _perf = PerfGuard::new("forecast_purchase_report");

        let params = self.config_reader.get_forecast_params().await.map_err(|e| {
            error!(cause = %e, "预测参数读取失败");
            ApiError::Internal(crate::i18n::t("common.internal_error"))
        })?;

        let today = Utc::now().date_naive();
        let report = self
            .engine
            .purchase_report(self.source.as_ref(), today, &params)?;

        info!(suggestions = report.len(), "采购建议报表生成完成");
        Ok(report)
    }
}
