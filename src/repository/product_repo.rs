// ==========================================
// 库存与采购预测系统 - 产品数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 库存非负由 stk_qty 的 CHECK 约束兜底，调整操作单语句原子完成
// ==========================================

use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::movement_repo::parse_rfc3339_col;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ProductRepository - 产品仓储
// ==========================================

/// 产品仓储
/// 职责: 管理 product 表的 CRUD、逻辑删除与库存调整
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

const PRODUCT_COLUMNS: &str = "product_id, product_name, sku, unit_of_measure, cost, \
     sale_price, category, location, stk_qty, active, created_at, updated_at";

impl ProductRepository {
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

    /// 插入产品
    ///
    /// 可空字段保持原样直插，NOT NULL/UNIQUE 由存储层约束兜底
    ///
    /// # 返回
    /// - Ok(Product): 落库后的完整记录
    pub fn insert(&self, new: &NewProduct) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO product (
                product_id, product_name, sku, unit_of_measure, cost, sale_price,
                category, location, stk_qty, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                new.product_id,
                new.product_name,
                new.sku,
                new.unit_of_measure,
                new.cost,
                new.sale_price,
                new.category,
                new.location,
                new.stk_qty,
                new.active,
                now,
                now,
            ],
        )?;

        fetch_product(&conn, &new.product_id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("insert 后未读到产品 {}", new.product_id))
        })
    }

    /// 按主键查询
    pub fn get_by_id(&self, product_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        Ok(fetch_product(&conn, product_id)?)
    }

    /// 按 SKU 查询
    pub fn get_by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;

        let product = conn
            .query_row(
                &format!("SELECT {} FROM product WHERE sku = ?1", PRODUCT_COLUMNS),
                params![sku],
                row_to_product,
            )
            .optional()?;

        Ok(product)
    }

    /// 查询产品列表
    ///
    /// # 参数
    /// - active_only: true 时仅返回未逻辑删除的产品
    pub fn list(&self, active_only: bool) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;

        let sql = if active_only {
            format!(
                "SELECT {} FROM product WHERE active = 1 ORDER BY product_id",
                PRODUCT_COLUMNS
            )
        } else {
            format!("SELECT {} FROM product ORDER BY product_id", PRODUCT_COLUMNS)
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_product)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }

        Ok(products)
    }

    /// 按白名单补丁更新产品
    ///
    /// 读-改-写在同一事务内完成，updated_at 自动刷新
    pub fn update(&self, product_id: &str, patch: &ProductPatch) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut product = tx
            .query_row(
                &format!(
                    "SELECT {} FROM product WHERE product_id = ?1",
                    PRODUCT_COLUMNS
                ),
                params![product_id],
                row_to_product,
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            })?;

        product.apply_patch(patch);
        product.updated_at = Utc::now();

        tx.execute(
            r#"
            UPDATE product
            SET product_name = ?1, sku = ?2, unit_of_measure = ?3, cost = ?4,
                sale_price = ?5, category = ?6, location = ?7, updated_at = ?8
            WHERE product_id = ?9
            "#,
            params![
                product.product_name,
                product.sku,
                product.unit_of_measure,
                product.cost,
                product.sale_price,
                product.category,
                product.location,
                product.updated_at.to_rfc3339(),
                product_id,
            ],
        )?;

        tx.commit()?;
        Ok(product)
    }

    /// 设置逻辑删除标志
    pub fn set_active(&self, product_id: &str, active: bool) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE product SET active = ?1, updated_at = ?2 WHERE product_id = ?3",
            params![active, Utc::now().to_rfc3339(), product_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }

        fetch_product(&conn, product_id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("update 后未读到产品 {}", product_id))
        })
    }

    /// 原子调整库存（delta 可为负）
    ///
    /// stk_qty 的 CHECK 约束保证扣减不会越过 0，违反时整条语句回滚
    pub fn adjust_stock(&self, product_id: &str, delta: i64) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE product SET stk_qty = stk_qty + ?1, updated_at = ?2 WHERE product_id = ?3",
            params![delta, Utc::now().to_rfc3339(), product_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }

        fetch_product(&conn, product_id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("update 后未读到产品 {}", product_id))
        })
    }
}

fn fetch_product(conn: &Connection, product_id: &str) -> rusqlite::Result<Option<Product>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM product WHERE product_id = ?1",
            PRODUCT_COLUMNS
        ),
        params![product_id],
        row_to_product,
    )
    .optional()
}

/// 行映射: product → Product
fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Product {
        product_id: row.get(0)?,
        product_name: row.get(1)?,
        sku: row.get(2)?,
        unit_of_measure: row.get(3)?,
        cost: row.get(4)?,
        sale_price: row.get(5)?,
        category: row.get(6)?,
        location: row.get(7)?,
        stk_qty: row.get(8)?,
        active: row.get(9)?,
        created_at: parse_rfc3339_col(10, &created_at)?,
        updated_at: parse_rfc3339_col(11, &updated_at)?,
    })
}
