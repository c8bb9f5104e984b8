// ==========================================
// 库存与采购预测系统 - 应用状态
// ==========================================
// 职责: 装配共享连接、仓储、配置、引擎与API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ForecastApi, MovementApi, ProductApi};
use crate::config::ConfigManager;
use crate::engine::forecast::ForecastEngine;
use crate::engine::snapshot::SqliteForecastDataSource;
use crate::importer::MovementCsvImporter;
use crate::repository::{MovementRepository, ProductRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 库存移动API
    pub movement_api: Arc<MovementApi>,

    /// 产品API
    pub product_api: Arc<ProductApi>,

    /// 采购预测API
    pub forecast_api: Arc<ForecastApi>,

    /// CSV导入器
    pub importer: Arc<MovementCsvImporter>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享数据库连接（统一 PRAGMA + SQL 观测）
    /// 2. 幂等初始化 schema
    /// 3. 初始化 Repository / 配置 / 引擎
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let mut conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);

        crate::db::init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let movement_repo = Arc::new(MovementRepository::from_connection(Arc::clone(&conn)));
        let product_repo = Arc::new(ProductRepository::from_connection(Arc::clone(&conn)));

        // ==========================================
        // 初始化配置与引擎
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(Arc::clone(&conn))
                .map_err(|e| format!("配置管理器初始化失败: {}", e))?,
        );

        let engine = Arc::new(ForecastEngine::new());
        let source = Arc::new(SqliteForecastDataSource::new(
            Arc::clone(&movement_repo),
            Arc::clone(&product_repo),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let movement_api = Arc::new(MovementApi::new(Arc::clone(&movement_repo)));
        let product_api = Arc::new(ProductApi::new(Arc::clone(&product_repo)));
        let forecast_api = Arc::new(ForecastApi::new(
            engine,
            source,
            Arc::clone(&config_manager) as Arc<dyn crate::config::ForecastConfigReader>,
        ));

        let importer = Arc::new(MovementCsvImporter::new(
            Arc::clone(&conn),
            Arc::clone(&movement_repo),
            Arc::clone(&product_repo),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            movement_api,
            product_api,
            forecast_api,
            importer,
            config_manager,
        })
    }
}

/// 解析默认数据库路径
///
/// 优先级: INVENTARIO_DB_PATH 环境变量 → 平台数据目录 → 当前目录回退
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("INVENTARIO_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let dir_name = if cfg!(debug_assertions) {
        "inventario-dev"
    } else {
        "inventario"
    };

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join(dir_name);
        // 目录创建尽力而为，失败时回退当前目录
        if std::fs::create_dir_all(&app_dir).is_ok() {
            return app_dir.join("inventario.db").to_string_lossy().to_string();
        }
    }

    "./inventario.db".to_string()
}
