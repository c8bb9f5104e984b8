// ==========================================
// 库存与采购预测系统 - 库存移动数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 日期列统一存 RFC 3339 UTC 文本，保证按字典序可比较
// ==========================================

use crate::domain::movement::{Movement, MovementPatch};
use crate::domain::types::MovementType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// MovementRepository - 库存移动仓储
// ==========================================

/// 库存移动仓储
/// 职责: 管理 inventory_movement 表的 CRUD 操作
pub struct MovementRepository {
    conn: Arc<Mutex<Connection>>,
}

const MOVEMENT_COLUMNS: &str =
    "movement_id, date, product_id, movement_type, quantity, order_id, notes";

impl MovementRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入一条移动记录
    ///
    /// 唯一约束/外键约束violation由错误分类器转换后上抛
    pub fn insert(&self, movement: &Movement) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
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

        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(Movement)): 找到记录
    /// - Ok(None): 未找到
    pub fn get_by_id(&self, movement_id: &str) -> RepositoryResult<Option<Movement>> {
        let conn = self.get_conn()?;

        let movement = conn
            .query_row(
                &format!(
                    "SELECT {} FROM inventory_movement WHERE movement_id = ?1",
                    MOVEMENT_COLUMNS
                ),
                params![movement_id],
                row_to_movement,
            )
            .optional()?;

        Ok(movement)
    }

    /// 是否已存在指定主键的记录
    pub fn exists(&self, movement_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM inventory_movement WHERE movement_id = ?1",
                params![movement_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// 查询全部移动记录，按日期倒序
    ///
    /// # 参数
    /// - page / per_page: 两者同时给定时启用分页（页码从 1 起，越界返回空页）
    pub fn list_all(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> RepositoryResult<Vec<Movement>> {
        let conn = self.get_conn()?;

        let mut movements = Vec::new();

        match (page, per_page) {
            (Some(page), Some(per_page)) => {
                let page = page.max(1);
                let per_page = per_page.max(0);
                let offset = (page - 1) * per_page;

                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory_movement ORDER BY date DESC LIMIT ?1 OFFSET ?2",
                    MOVEMENT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![per_page, offset], row_to_movement)?;
                for row in rows {
                    movements.push(row?);
                }
            }
            _ => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory_movement ORDER BY date DESC",
                    MOVEMENT_COLUMNS
                ))?;
                let rows = stmt.query_map([], row_to_movement)?;
                for row in rows {
                    movements.push(row?);
                }
            }
        }

        Ok(movements)
    }

    /// 查询自指定日期（含当日零点 UTC）以来的移动记录
    ///
    /// since 为 None 时返回全量历史，供预测引擎扩窗使用
    pub fn query_since(&self, since: Option<NaiveDate>) -> RepositoryResult<Vec<Movement>> {
        let conn = self.get_conn()?;

        let mut movements = Vec::new();

        match since {
            Some(date) => {
                let threshold = format!("{}T00:00:00+00:00", date.format("%Y-%m-%d"));
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory_movement WHERE date >= ?1",
                    MOVEMENT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![threshold], row_to_movement)?;
                for row in rows {
                    movements.push(row?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("SELECT {} FROM inventory_movement", MOVEMENT_COLUMNS))?;
                let rows = stmt.query_map([], row_to_movement)?;
                for row in rows {
                    movements.push(row?);
                }
            }
        }

        Ok(movements)
    }

    /// 按白名单补丁更新记录
    ///
    /// 读-改-写在同一事务内完成，失败自动回滚
    ///
    /// # 返回
    /// - Ok(Movement): 更新后的记录
    /// - Err(NotFound): 主键不存在
    pub fn update(&self, movement_id: &str, patch: &MovementPatch) -> RepositoryResult<Movement> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut movement = tx
            .query_row(
                &format!(
                    "SELECT {} FROM inventory_movement WHERE movement_id = ?1",
                    MOVEMENT_COLUMNS
                ),
                params![movement_id],
                row_to_movement,
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Movement".to_string(),
                id: movement_id.to_string(),
            })?;

        movement.apply_patch(patch);

        tx.execute(
            r#"
            UPDATE inventory_movement
            SET date = ?1, product_id = ?2, movement_type = ?3,
                quantity = ?4, order_id = ?5, notes = ?6
            WHERE movement_id = ?7
            "#,
            params![
                movement.date.to_rfc3339(),
                movement.product_id,
                movement.movement_type.to_db_str(),
                movement.quantity,
                movement.order_id,
                movement.notes,
                movement_id,
            ],
        )?;

        tx.commit()?;
        Ok(movement)
    }

    /// 删除记录
    ///
    /// # 返回
    /// - Err(NotFound): 主键不存在
    pub fn delete(&self, movement_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "DELETE FROM inventory_movement WHERE movement_id = ?1",
            params![movement_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Movement".to_string(),
                id: movement_id.to_string(),
            });
        }

        Ok(())
    }
}

/// 行映射: inventory_movement → Movement
fn row_to_movement(row: &rusqlite::Row<'_>) -> rusqlite::Result<Movement> {
    let date_str: String = row.get(1)?;
    let type_str: String = row.get(3)?;

    Ok(Movement {
        movement_id: row.get(0)?,
        date: parse_rfc3339_col(1, &date_str)?,
        product_id: row.get(2)?,
        movement_type: MovementType::from_str(&type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("移动类型非法: {}", type_str).into(),
            )
        })?,
        quantity: row.get(4)?,
        order_id: row.get(5)?,
        notes: row.get(6)?,
    })
}

/// 解析 RFC 3339 文本列为 UTC 时刻
pub(crate) fn parse_rfc3339_col(col: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                col,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
