// ==========================================
// 库存与采购预测系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 预测参数键缺失时回退到引擎默认值 (90/180/30/30)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::forecast::ForecastParams;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取整型配置；缺失或格式错误时回退默认值
    fn get_i64_config(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<i64>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = key,
                raw_value = %value,
                default,
                "配置值非整数，使用默认值"
            );
            default
        }))
    }

    /// 写入/覆写 global scope 的配置值（UPSERT）
    pub fn update_config(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 运维巡检：一次性查看预测参数当前生效值
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// ForecastConfigReader Trait
// ==========================================

/// 预测参数读取接口（API 层经由此口径取参数，便于测试替身）
#[async_trait]
pub trait ForecastConfigReader: Send + Sync {
    async fn get_forecast_params(&self) -> Result<ForecastParams, Box<dyn Error>>;
}

#[async_trait]
impl ForecastConfigReader for ConfigManager {
    async fn get_forecast_params(&self) -> Result<ForecastParams, Box<dyn Error>> {
        let defaults = ForecastParams::default();

        Ok(ForecastParams {
            horizon_days: self
                .get_i64_config(config_keys::FORECAST_HORIZON_DAYS, defaults.horizon_days)?,
            window_days: self
                .get_i64_config(config_keys::FORECAST_WINDOW_DAYS, defaults.window_days)?,
            cover_days: self
                .get_i64_config(config_keys::FORECAST_COVER_DAYS, defaults.cover_days)?,
            min_records: self
                .get_i64_config(config_keys::FORECAST_MIN_RECORDS, defaults.min_records)?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 预测参数
    pub const FORECAST_HORIZON_DAYS: &str = "forecast_horizon_days";
    pub const FORECAST_WINDOW_DAYS: &str = "forecast_window_days";
    pub const FORECAST_COVER_DAYS: &str = "forecast_cover_days";
    pub const FORECAST_MIN_RECORDS: &str = "forecast_min_records";
}
