// ==========================================
// 库存与采购预测系统 - 产品领域模型
// ==========================================
// 对齐: product 表
// 职责: 产品目录实体 + 新建草稿 + 部分更新白名单
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品目录条目
// ==========================================
// active = false 即逻辑删除，历史移动记录保持可引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    // ===== 主键 =====
    pub product_id: String, // 产品唯一标识（缺省时生成 UUIDv4）

    // ===== 基础信息 =====
    pub product_name: String,    // 产品名称
    pub sku: String,             // SKU（唯一）
    pub unit_of_measure: String, // 计量单位
    pub category: String,        // 分类
    pub location: String,        // 库位

    // ===== 价格（2 位小数） =====
    pub cost: f64,       // 成本价
    pub sale_price: f64, // 销售价

    // ===== 库存与状态 =====
    pub stk_qty: i64, // 当前库存数量（恒 >= 0）
    pub active: bool, // 逻辑删除标志

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// NewProduct - 新建草稿
// ==========================================
// 必填五项(name/sku/unit/cost/sale_price)在 API 层校验；
// 其余列保持可空直插，让存储层约束兜底（与参考后端一致）
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_of_measure: String,
    pub cost: f64,
    pub sale_price: f64,
    pub category: Option<String>,
    pub location: Option<String>,
    pub stk_qty: Option<i64>,
    pub active: bool,
}

// ==========================================
// ProductPatch - 部分更新白名单
// ==========================================
// 仅描述性字段可改；stk_qty/active 走专用操作，主键不可改
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub unit_of_measure: Option<String>,
    pub cost: Option<f64>,
    pub sale_price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,
}

impl ProductPatch {
    /// 是否为空补丁
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.sku.is_none()
            && self.unit_of_measure.is_none()
            && self.cost.is_none()
            && self.sale_price.is_none()
            && self.category.is_none()
            && self.location.is_none()
    }
}

impl Product {
    /// 按白名单应用补丁（价格按 2 位小数归一）
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(ref product_name) = patch.product_name {
            self.product_name = product_name.clone();
        }
        if let Some(ref sku) = patch.sku {
            self.sku = sku.clone();
        }
        if let Some(ref unit_of_measure) = patch.unit_of_measure {
            self.unit_of_measure = unit_of_measure.clone();
        }
        if let Some(cost) = patch.cost {
            self.cost = quantize_money(cost);
        }
        if let Some(sale_price) = patch.sale_price {
            self.sale_price = quantize_money(sale_price);
        }
        if let Some(ref category) = patch.category {
            self.category = category.clone();
        }
        if let Some(ref location) = patch.location {
            self.location = location.clone();
        }
    }
}

/// 金额归一到 2 位小数
pub fn quantize_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
