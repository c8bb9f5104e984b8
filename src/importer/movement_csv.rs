// ==========================================
// 库存与采购预测系统 - 移动记录 CSV 导入器
// ==========================================
// 输入: 表头寻址的 CSV (movement_id,date,product_id,movement_type,quantity,order_id,notes)
// 规则: 行级校验与在线创建同口径; 合法行在单一事务内整体落库
// 输出: ImportReport (总行数/入库数/拒绝数/逐行错误)
// ==========================================

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use csv::ReaderBuilder;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::movement::{coerce_str_to_utc, Movement};
use crate::domain::types::MovementType;
use crate::i18n::{t, t_with_args};
use crate::importer::error::ImportError;
use crate::perf::PerfGuard;
use crate::repository::{MovementRepository, ProductRepository};

// ==========================================
// ImportReport - 导入结果
// ==========================================

/// 逐行错误（line 为文件物理行号，表头为第 1 行）
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// 导入结果汇总
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported: usize,
    pub rejected: usize,
    pub errors: Vec<RowError>,
}

// ==========================================
// MovementCsvImporter - CSV 导入器
// ==========================================

/// 移动记录 CSV 导入器
///
/// 流程:
/// 1. 文件存在性/扩展名检查
/// 2. 逐行解析（全空行跳过）
/// 3. 行级校验: 必填/日期/类型/数量 + 产品存在 + 主键去重（文件内与库内）
/// 4. 全部合法行在单一事务内插入; 任一插入失败则整体回滚
pub struct MovementCsvImporter {
    conn: Arc<Mutex<Connection>>,
    movement_repo: Arc<MovementRepository>,
    product_repo: Arc<ProductRepository>,
}

impl MovementCsvImporter {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        movement_repo: Arc<MovementRepository>,
        product_repo: Arc<ProductRepository>,
    ) -> Self {
        Self {
            conn,
            movement_repo,
            product_repo,
        }
    }

    /// 导入一个 CSV 文件
    pub fn import_file(&self, file_path: &Path) -> Result<ImportReport, ImportError> {
        let _perf = PerfGuard::new("import_movements_csv");

        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        match file_path.extension() {
            Some(ext) if ext == "csv" => {}
            Some(ext) => {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
            None => {
                return Err(ImportError::UnsupportedFormat(
                    file_path.display().to_string(),
                ));
            }
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        // 产品主键集合一次性预载，避免逐行查询
        let known_products: HashSet<String> = self
            .product_repo
            .list(false)?
            .into_iter()
            .map(|p| p.product_id)
            .collect();

        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut valid: Vec<Movement> = Vec::new();
        let mut errors: Vec<RowError> = Vec::new();
        let mut total_rows = 0usize;

        for (row_idx, result) in reader.records().enumerate() {
            // 物理行号: 表头占第 1 行
            let line = row_idx + 2;
            let record = result?;

            // 表头寻址 + 去空白
            let mut fields: HashMap<&str, String> = HashMap::new();
            for (col, header) in headers.iter().enumerate() {
                if let Some(value) = record.get(col) {
                    let value = value.trim();
                    if !value.is_empty() {
                        fields.insert(header.as_str(), value.to_string());
                    }
                }
            }

            // 全空行跳过，不计入总行数
            if fields.is_empty() {
                continue;
            }
            total_rows += 1;

            match self.validate_row(&fields, &known_products, &mut seen_ids) {
                Ok(movement) => valid.push(movement),
                Err(message) => {
                    warn!(line, %message, "导入行被拒绝");
                    errors.push(RowError { line, message });
                }
            }
        }

        // 全部合法行在单一事务内插入
        let imported = valid.len();
        if !valid.is_empty() {
            let conn = self
                .conn
                .lock()
                .map_err(|e| ImportError::LockError(e.to_string()))?;
            let tx = conn.unchecked_transaction()?;

            for movement in &valid {
                tx.execute(
                    r#"
                    INSERT INTO inventory_movement (
                        movement_id, date, product_id, movement_type, quantity, order_id, notes
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        movement.movement_id,
                        movement.date.to_rfc3339(),
                        movement.product_id,
                        movement.movement_type.to_db_str(),
                        movement.quantity,
                        movement.order_id,
                        movement.notes,
                    ],
                )?;
            }

            tx.commit()?;
        }

        let report = ImportReport {
            total_rows,
            imported,
            rejected: errors.len(),
            errors,
        };

        info!(
            total_rows = report.total_rows,
            imported = report.imported,
            rejected = report.rejected,
            "CSV 导入完成"
        );

        Ok(report)
    }

    /// 行级校验（与在线创建同口径）
    ///
    /// 返回 Err(用户可读消息) 时该行被拒绝，不影响其他行
    fn validate_row(
        &self,
        fields: &HashMap<&str, String>,
        known_products: &HashSet<String>,
        seen_ids: &mut HashSet<String>,
    ) -> Result<Movement, String> {
        // 必填字段（缺失项按字母序报出）
        let mut missing: Vec<&str> = Vec::new();
        for field in ["movement_id", "date", "product_id", "movement_type", "quantity"] {
            if !fields.contains_key(field) {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(t_with_args(
                "movement.missing_fields",
                &[("fields", &missing.join(", "))],
            ));
        }

        let movement_id = fields["movement_id"].clone();
        let product_id = fields["product_id"].clone();

        let date = coerce_str_to_utc(&fields["date"])?;

        let movement_type = MovementType::from_str(&fields["movement_type"])
            .ok_or_else(|| t("movement.invalid_type"))?;

        let quantity: i64 = fields["quantity"]
            .parse()
            .map_err(|_| t("movement.quantity_integer"))?;
        if quantity <= 0 {
            return Err(t("movement.quantity_positive"));
        }

        if !known_products.contains(&product_id) {
            return Err(t_with_args(
                "import.product_missing",
                &[("product_id", &product_id)],
            ));
        }

        if seen_ids.contains(&movement_id) {
            return Err(t_with_args(
                "import.duplicate_in_file",
                &[("movement_id", &movement_id)],
            ));
        }

        let in_store = self
            .movement_repo
            .exists(&movement_id)
            .map_err(|e| e.to_string())?;
        if in_store {
            return Err(t_with_args(
                "import.duplicate_in_store",
                &[("movement_id", &movement_id)],
            ));
        }

        seen_ids.insert(movement_id.clone());

        Ok(Movement {
            movement_id,
            date,
            product_id,
            movement_type,
            quantity,
            order_id: fields.get("order_id").cloned(),
            notes: fields.get("notes").cloned(),
        })
    }
}
