// ==========================================
// 库存与采购预测系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 库存后端 + 采购预测决策支持
// ==========================================

use inventario::app::{get_default_db_path, AppState};
use inventario::logging;

/// 命令行参数
///
/// 用法: inventario [init-db|stocks|products|forecast] [--db <path>]
struct CliArgs {
    command: String,
    db_path: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut command: Option<String> = None;
    let mut db_path: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--db 需要一个路径参数".to_string())?;
                db_path = Some(value);
            }
            "init-db" | "stocks" | "products" | "forecast" => {
                if let Some(previous) = &command {
                    return Err(format!("命令重复: {} 与 {}", previous, arg));
                }
                command = Some(arg);
            }
            other => {
                return Err(format!(
                    "未知参数: {}（支持 init-db|stocks|products|forecast [--db <path>]）",
                    other
                ));
            }
        }
    }

    Ok(CliArgs {
        command: command.unwrap_or_else(|| "forecast".to_string()),
        db_path,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", inventario::APP_NAME);
    tracing::info!("系统版本: {}", inventario::VERSION);
    tracing::info!("==================================================");

    let args = parse_args().map_err(|e| anyhow::anyhow!(e))?;

    // 获取数据库路径
    let db_path = args.db_path.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState（含幂等建表）
    let state = AppState::new(db_path).map_err(|e| anyhow::anyhow!(e))?;

    match args.command.as_str() {
        "init-db" => {
            // AppState::new 已完成建表
            println!("{}", serde_json::json!({ "status": "ok", "db": state.db_path }));
        }
        "stocks" => {
            let movements = state
                .movement_api
                .list_movements(None, None)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&movements)?);
        }
        "products" => {
            let products = state
                .product_api
                .list_products(true)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        "forecast" => {
            let report = state
                .forecast_api
                .purchase_report()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => {
            anyhow::bail!("未知命令: {}", other);
        }
    }

    Ok(())
}
