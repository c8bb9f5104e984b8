// ==========================================
// 库存与采购预测系统 - 库存移动领域模型
// ==========================================
// 对齐: inventory_movement 表
// 职责: 移动记录实体 + 日期清洗/归一化规则
// ==========================================

use crate::domain::types::MovementType;
use crate::i18n::t;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Movement - 库存移动记录
// ==========================================
// 每一条代表一次影响库存的实际出入库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    // ===== 主键 =====
    pub movement_id: String, // 移动记录唯一标识（调用方提供）

    // ===== 业务字段 =====
    pub date: DateTime<Utc>,             // 发生时刻（统一 UTC）
    pub product_id: String,              // 关联 product（FK）
    pub movement_type: MovementType,     // IN / OUT
    pub quantity: i64,                   // 数量（> 0）
    pub order_id: Option<String>,        // 关联订单号
    pub notes: Option<String>,           // 备注
}

impl Movement {
    /// 带符号数量: OUT 为负, IN 为正
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed_quantity(self.quantity)
    }
}

// ==========================================
// MovementPatch - 部分更新白名单
// ==========================================
// 可变字段在编译期固定，主键不可改
// order_id/notes 用双层 Option 区分“不改”与“置空”
#[derive(Debug, Clone, Default)]
pub struct MovementPatch {
    pub date: Option<DateTime<Utc>>,
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub quantity: Option<i64>,
    pub order_id: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl MovementPatch {
    /// 是否为空补丁（所有字段均未指定）
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.product_id.is_none()
            && self.movement_type.is_none()
            && self.quantity.is_none()
            && self.order_id.is_none()
            && self.notes.is_none()
    }
}

impl Movement {
    /// 按白名单应用补丁
    pub fn apply_patch(&mut self, patch: &MovementPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(ref product_id) = patch.product_id {
            self.product_id = product_id.clone();
        }
        if let Some(movement_type) = patch.movement_type {
            self.movement_type = movement_type;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(ref order_id) = patch.order_id {
            self.order_id = order_id.clone();
        }
        if let Some(ref notes) = patch.notes {
            self.notes = notes.clone();
        }
    }
}

// ==========================================
// 日期清洗
// ==========================================
// 规则（与参考后端逐条对齐）:
// 1. 去首尾空白
// 2. Unicode 横线变体(U+2010..U+2015, U+2212) 归一为 ASCII '-'
// 3. 字面 "Z" 替换为 "+00:00"
// 4. 按 ISO-8601 解析: 日期+时间，秒可选，偏移可选，分隔符空格或 'T'
// 5. 无偏移按 UTC 处理；带偏移的时刻不改变其绝对时间
// ==========================================

/// 把外部输入的日期字符串清洗为 UTC 时刻
///
/// # 返回
/// - Ok(DateTime<Utc>): 清洗成功
/// - Err(String): 本地化的格式错误消息
pub fn coerce_str_to_utc(value: &str) -> Result<DateTime<Utc>, String> {
    let clean = normalize_dashes(value.trim()).replace('Z', "+00:00");

    // 带偏移: 秒可选
    const AWARE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%:z",
    ];
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&clean, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    // 无偏移: 附加 UTC
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&clean, fmt) {
            return Ok(dt.and_utc());
        }
    }

    // 仅日期: 按当日零点 UTC 处理（参考实现接受纯日期）
    if let Ok(d) = NaiveDate::parse_from_str(&clean, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(t("movement.invalid_date"))
}

/// Unicode 横线变体归一为 ASCII '-'
fn normalize_dashes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            _ => c,
        })
        .collect()
}
