// ==========================================
// 库存与采购预测系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 库存后端 + 采购预测决策支持
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 预测算法
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测（慢 SQL / 操作耗时）
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::MovementType;

// 领域实体
pub use domain::{Movement, MovementPatch, Product, ProductPatch};

// 引擎
pub use engine::{ForecastDataSource, ForecastEngine, ForecastParams, PurchaseSuggestion};

// API
pub use api::{ForecastApi, MovementApi, ProductApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Sistema de Inventario y Pronóstico de Compras";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
