// ==========================================
// 库存与采购预测系统 - 产品 API
// ==========================================
// 职责: 产品目录的校验、CRUD、逻辑删除、库存调整
// 红线: stk_qty 永不为负; SKU 唯一性由存储层约束兜底
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::product::{quantize_money, NewProduct, Product, ProductPatch};
use crate::i18n::{t, t_with_args};
use crate::perf::PerfGuard;
use crate::repository::{ProductRepository, RepositoryError};

// ==========================================
// DTO 定义
// ==========================================

/// 创建产品的请求体
///
/// 必填五项(name/sku/unit/cost/sale_price)缺失时按声明顺序报出第一项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub unit_of_measure: Option<String>,
    pub cost: Option<f64>,
    pub sale_price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub stk_qty: Option<i64>,
}

/// 部分更新请求（仅描述性字段; stk_qty/active 走专用操作）
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateRequest {
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub unit_of_measure: Option<String>,
    pub cost: Option<f64>,
    pub sale_price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,
}

/// 对外产品 DTO（审计时间输出为 RFC 3339 UTC 文本）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDto {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_of_measure: String,
    pub cost: f64,
    pub sale_price: f64,
    pub category: String,
    pub location: String,
    pub stk_qty: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            product_name: p.product_name,
            sku: p.sku,
            unit_of_measure: p.unit_of_measure,
            cost: p.cost,
            sale_price: p.sale_price,
            category: p.category,
            location: p.location,
            stk_qty: p.stk_qty,
            active: p.active,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

// ==========================================
// ProductApi - 产品 API
// ==========================================

/// 产品 API
///
/// 职责：
/// 1. 必填字段校验 + product_id 缺省生成 UUIDv4
/// 2. 金额 2 位小数归一
/// 3. 库存调整的数量/下限校验（事务内，失败不留痕）
/// 4. 存储层完整性错误 → 用户可读消息
pub struct ProductApi {
    product_repo: Arc<ProductRepository>,
}

impl ProductApi {
    pub fn new(product_repo: Arc<ProductRepository>) -> Self {
        Self { product_repo }
    }

    // ==========================================
    // 写接口
    // ==========================================

    /// 创建产品
    pub fn create_product(&self, request: CreateProductRequest) -> ApiResult<ProductDto> {
        let _perf = PerfGuard::new("create_product");

        // 必填字段按声明顺序校验，报出第一个缺失项
        let required: [(&str, bool); 5] = [
            ("product_name", request.product_name.is_some()),
            ("sku", request.sku.is_some()),
            ("unit_of_measure", request.unit_of_measure.is_some()),
            ("cost", request.cost.is_some()),
            ("sale_price", request.sale_price.is_some()),
        ];
        for (field, present) in required {
            if !present {
                return Err(ApiError::Validation(t_with_args(
                    "product.missing_field",
                    &[("field", field)],
                )));
            }
        }

        let new = NewProduct {
            product_id: request
                .product_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            product_name: request.product_name.unwrap_or_default(),
            sku: request.sku.unwrap_or_default(),
            unit_of_measure: request.unit_of_measure.unwrap_or_default(),
            cost: quantize_money(request.cost.unwrap_or_default()),
            sale_price: quantize_money(request.sale_price.unwrap_or_default()),
            category: request.category,
            location: request.location,
            stk_qty: request.stk_qty,
            active: true,
        };

        let product = self.product_repo.insert(&new).map_err(|e| {
            if e.is_constraint_violation() {
                error!(sku = %new.sku, cause = %e, "产品创建冲突");
                ApiError::Conflict(t("product.sku_conflict"))
            } else {
                ApiError::from(e)
            }
        })?;

        info!(product_id = %product.product_id, sku = %product.sku, "产品已创建");
        Ok(ProductDto::from(product))
    }

    /// 按白名单部分更新（仅描述性字段）
    pub fn update_product(
        &self,
        product_id: &str,
        request: ProductUpdateRequest,
    ) -> ApiResult<ProductDto> {
        let _perf = PerfGuard::new("update_product");

        let patch = ProductPatch {
            product_name: request.product_name,
            sku: request.sku,
            unit_of_measure: request.unit_of_measure,
            cost: request.cost,
            sale_price: request.sale_price,
            category: request.category,
            location: request.location,
        };

        let updated = self.product_repo.update(product_id, &patch).map_err(|e| match e {
            RepositoryError::NotFound { .. } => ApiError::NotFound(t("product.not_found")),
            e if e.is_constraint_violation() => {
                error!(product_id, cause = %e, "产品更新失败");
                ApiError::Validation(t("product.update_invalid"))
            }
            e => ApiError::from(e),
        })?;

        info!(product_id, "产品已更新");
        Ok(ProductDto::from(updated))
    }

    /// 重新激活逻辑删除的产品
    pub fn activate_product(&self, product_id: &str) -> ApiResult<ProductDto> {
        self.set_active(product_id, true)
    }

    /// 逻辑删除（active=false，保留历史移动可引用）
    pub fn deactivate_product(&self, product_id: &str) -> ApiResult<ProductDto> {
        self.set_active(product_id, false)
    }

    fn set_active(&self, product_id: &str, active: bool) -> ApiResult<ProductDto> {
        let product = self
            .product_repo
            .set_active(product_id, active)
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => ApiError::NotFound(t("product.not_found")),
                e => ApiError::from(e),
            })?;

        info!(product_id, active, "产品激活标志已变更");
        Ok(ProductDto::from(product))
    }

    /// 增加库存
    ///
    /// qty <= 0 或产品不存在 → Validation（与参考契约一致）
    pub fn add_stock(&self, product_id: &str, qty: i64) -> ApiResult<ProductDto> {
        let _perf = PerfGuard::new("add_stock");

        if qty <= 0 {
            return Err(ApiError::Validation(t("product.add_qty_positive")));
        }

        let product = self
            .product_repo
            .adjust_stock(product_id, qty)
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => {
                    ApiError::Validation(t("product.not_found"))
                }
                e => ApiError::from(e),
            })?;

        info!(product_id, qty, stk_qty = product.stk_qty, "库存已增加");
        Ok(ProductDto::from(product))
    }

    /// 扣减库存
    ///
    /// qty <= 0 / 产品不存在 / 余额不足 → Validation，且库存保持不变
    /// （下限由 CHECK 约束兜底，违反时整条语句回滚）
    pub fn subtract_stock(&self, product_id: &str, qty: i64) -> ApiResult<ProductDto> {
        let _perf = PerfGuard::new("subtract_stock");

        if qty <= 0 {
            return Err(ApiError::Validation(t("product.subtract_qty_positive")));
        }

        let product = self
            .product_repo
            .adjust_stock(product_id, -qty)
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => {
                    ApiError::Validation(t("product.not_found"))
                }
                RepositoryError::ConstraintViolation(_) => {
                    ApiError::Validation(t("product.stock_insufficient"))
                }
                e => ApiError::from(e),
            })?;

        info!(product_id, qty, stk_qty = product.stk_qty, "库存已扣减");
        Ok(ProductDto::from(product))
    }

    // ==========================================
    // 读接口
    // ==========================================

    /// 查询产品列表（默认仅激活产品）
    pub fn list_products(&self, active_only: bool) -> ApiResult<Vec<ProductDto>> {
        let _perf = PerfGuard::new("list_products");

        let products = self.product_repo.list(active_only)?;
        Ok(products.into_iter().map(ProductDto::from).collect())
    }

    /// 按主键查询（不存在返回 None，由调用方决策）
    pub fn get_product(&self, product_id: &str) -> ApiResult<Option<ProductDto>> {
        let product = self.product_repo.get_by_id(product_id)?;
        Ok(product.map(ProductDto::from))
    }

    /// 按 SKU 查询
    pub fn get_product_by_sku(&self, sku: &str) -> ApiResult<Option<ProductDto>> {
        let product = self.product_repo.get_by_sku(sku)?;
        Ok(product.map(ProductDto::from))
    }
}
