// ==========================================
// 库存与采购预测系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 移动类型 (Movement Type)
// ==========================================
// IN = 入库(增加库存), OUT = 出库(减少库存)
// 预测引擎按 OUT 取负号聚合日净变动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,  // 入库
    Out, // 出库
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementType::In => write!(f, "IN"),
            MovementType::Out => write!(f, "OUT"),
        }
    }
}

impl MovementType {
    /// 从字符串解析移动类型（仅接受 IN / OUT）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IN" => Some(MovementType::In),
            "OUT" => Some(MovementType::Out),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }

    /// 带符号数量: OUT 为负, IN 为正
    pub fn signed_quantity(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }
}
