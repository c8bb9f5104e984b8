// ==========================================
// API 层集成测试
// ==========================================
// 覆盖: 契约消息（西语）、日期清洗、库存操作、预测端到端
// ==========================================


use std::sync::Arc;

use inventario::api::{
    ApiError, CreateMovementRequest, CreateProductRequest, ForecastApi, MovementApi,
    MovementUpdateRequest, ProductApi,
};
use inventario::config::ConfigManager;
use inventario::engine::forecast::ForecastEngine;
use inventario::engine::snapshot::SqliteForecastDataSource;
use inventario::repository::{MovementRepository, ProductRepository};
use test_helpers::{create_test_db, open_test_connection, rfc3339_days_ago};

struct Fixture {
    _temp_file: tempfile::NamedTempFile,
    movement_api: MovementApi,
    product_api: ProductApi,
    forecast_api: ForecastApi,
    config: Arc<ConfigManager>,
}

fn setup() -> Fixture {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");

    let movement_repo = Arc::new(MovementRepository::from_connection(Arc::clone(&conn)));
    let product_repo = Arc::new(ProductRepository::from_connection(Arc::clone(&conn)));
    let config = Arc::new(ConfigManager::from_connection(Arc::clone(&conn)).unwrap());

    let forecast_api = ForecastApi::new(
        Arc::new(ForecastEngine::new()),
        Arc::new(SqliteForecastDataSource::new(
            Arc::clone(&movement_repo),
            Arc::clone(&product_repo),
        )),
        Arc::clone(&config) as Arc<dyn inventario::config::ForecastConfigReader>,
    );

    Fixture {
        _temp_file: temp_file,
        movement_api: MovementApi::new(movement_repo),
        product_api: ProductApi::new(product_repo),
        forecast_api,
        config,
    }
}

fn product_request(product_id: &str, sku: &str, stk_qty: i64) -> CreateProductRequest {
    CreateProductRequest {
        product_id: Some(product_id.to_string()),
        product_name: Some(format!("Producto {}", product_id)),
        sku: Some(sku.to_string()),
        unit_of_measure: Some("pz".to_string()),
        cost: Some(1.5),
        sale_price: Some(2.75),
        category: Some("general".to_string()),
        location: Some("A-01".to_string()),
        stk_qty: Some(stk_qty),
    }
}

fn movement_request(movement_id: &str, product_id: &str, qty: i64) -> CreateMovementRequest {
    CreateMovementRequest {
        movement_id: Some(movement_id.to_string()),
        date: Some("2025-06-01T12:00:00+00:00".to_string()),
        product_id: Some(product_id.to_string()),
        movement_type: Some("OUT".to_string()),
        quantity: Some(qty),
        order_id: None,
        notes: None,
    }
}

fn validation_message(err: ApiError) -> String {
    match err {
        ApiError::Validation(msg) => msg,
        other => panic!("预期 Validation，实际 {:?}", other),
    }
}

// ==========================================
// 移动记录
// ==========================================

#[test]
fn test_create_movement_missing_fields_message() {
    let fx = setup();

    let err = fx
        .movement_api
        .create_movement(CreateMovementRequest::default())
        .unwrap_err();
    assert_eq!(
        validation_message(err),
        "Campos requeridos faltantes: date, movement_id, movement_type, product_id, quantity"
    );

    // 部分缺失只报缺失项
    let mut request = movement_request("m1", "p1", 3);
    request.date = None;
    request.quantity = None;
    let err = fx.movement_api.create_movement(request).unwrap_err();
    assert_eq!(
        validation_message(err),
        "Campos requeridos faltantes: date, quantity"
    );
}

#[test]
fn test_create_movement_date_coercion_variants() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 100))
        .unwrap();

    // 空格分隔 + 无秒 + Unicode 连字符
    let mut request = movement_request("m1", "p1", 3);
    request.date = Some("2025‑06‑01 14:30".to_string());
    let dto = fx.movement_api.create_movement(request).unwrap();
    assert_eq!(dto.date, "2025-06-01T14:30:00+00:00");

    // 仅日期
    let mut request = movement_request("m2", "p1", 3);
    request.date = Some("2025-06-02".to_string());
    let dto = fx.movement_api.create_movement(request).unwrap();
    assert_eq!(dto.date, "2025-06-02T00:00:00+00:00");

    // 带时区偏移归一到 UTC
    let mut request = movement_request("m3", "p1", 3);
    request.date = Some("2025-06-03T10:00:00-05:00".to_string());
    let dto = fx.movement_api.create_movement(request).unwrap();
    assert_eq!(dto.date, "2025-06-03T15:00:00+00:00");

    // 非法日期
    let mut request = movement_request("m4", "p1", 3);
    request.date = Some("junio 1".to_string());
    let err = fx.movement_api.create_movement(request).unwrap_err();
    assert_eq!(
        validation_message(err),
        "Formato de fecha inválido. Se esperaba ISO 8601 'YYYY-MM-DD[ T]HH:MM[:SS[±HH:MM]]'."
    );
}

#[test]
fn test_create_movement_type_and_quantity_rules() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 100))
        .unwrap();

    let mut request = movement_request("m1", "p1", 3);
    request.movement_type = Some("TRANSFER".to_string());
    let err = fx.movement_api.create_movement(request).unwrap_err();
    assert_eq!(
        validation_message(err),
        "Tipo de movimiento inválido: se esperaba IN u OUT"
    );

    let err = fx
        .movement_api
        .create_movement(movement_request("m1", "p1", 0))
        .unwrap_err();
    assert_eq!(
        validation_message(err),
        "La cantidad debe ser un entero positivo"
    );

    // 类型大小写不敏感
    let mut request = movement_request("m1", "p1", 3);
    request.movement_type = Some("in".to_string());
    let dto = fx.movement_api.create_movement(request).unwrap();
    assert_eq!(dto.movement_type.to_db_str(), "IN");
}

#[test]
fn test_create_movement_conflicts() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 100))
        .unwrap();

    fx.movement_api
        .create_movement(movement_request("m1", "p1", 3))
        .unwrap();

    // 主键重复
    let err = fx
        .movement_api
        .create_movement(movement_request("m1", "p1", 3))
        .unwrap_err();
    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, "Datos duplicados o inválidos"),
        other => panic!("预期 Conflict，实际 {:?}", other),
    }

    // 引用不存在的产品
    let err = fx
        .movement_api
        .create_movement(movement_request("m2", "ghost", 3))
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn test_update_and_delete_movement() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 100))
        .unwrap();
    fx.movement_api
        .create_movement(movement_request("m1", "p1", 3))
        .unwrap();

    let updated = fx
        .movement_api
        .update_movement(
            "m1",
            MovementUpdateRequest {
                quantity: Some(7),
                notes: Some(Some("ajuste".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.quantity, 7);
    assert_eq!(updated.notes.as_deref(), Some("ajuste"));

    let err = fx
        .movement_api
        .update_movement("ghost", MovementUpdateRequest::default())
        .unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert_eq!(msg, "Movimiento no encontrado"),
        other => panic!("预期 NotFound，实际 {:?}", other),
    }

    fx.movement_api.delete_movement("m1").unwrap();
    assert!(fx.movement_api.get_movement("m1").unwrap().is_none());

    let err = fx.movement_api.delete_movement("m1").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_list_movements_pagination() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 100))
        .unwrap();
    for i in 1..=5 {
        let mut request = movement_request(&format!("m{}", i), "p1", 1);
        request.date = Some(format!("2025-06-0{}T12:00:00+00:00", i));
        fx.movement_api.create_movement(request).unwrap();
    }

    let all = fx.movement_api.list_movements(None, None).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].movement_id, "m5", "默认按日期倒序");

    let page2 = fx.movement_api.list_movements(Some(2), Some(2)).unwrap();
    assert_eq!(page2.len(), 2);
    assert_eq!(page2[0].movement_id, "m3");
}

// ==========================================
// 产品
// ==========================================

#[test]
fn test_create_product_missing_field_and_defaults() {
    let fx = setup();

    let mut request = product_request("p1", "SKU-1", 0);
    request.product_name = None;
    let err = fx.product_api.create_product(request).unwrap_err();
    assert_eq!(
        validation_message(err),
        "Campo requerido faltante: product_name"
    );

    // 缺省 product_id 生成 UUIDv4，金额归一 2 位小数
    let mut request = product_request("", "SKU-2", 0);
    request.product_id = None;
    request.cost = Some(1.005);
    let dto = fx.product_api.create_product(request).unwrap();
    assert_eq!(dto.product_id.len(), 36);
    assert!(dto.active);
}

#[test]
fn test_create_product_sku_conflict() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 0))
        .unwrap();

    let err = fx
        .product_api
        .create_product(product_request("p2", "SKU-1", 0))
        .unwrap_err();
    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, "SKU ya existe o datos inválidos"),
        other => panic!("预期 Conflict，实际 {:?}", other),
    }
}

#[test]
fn test_update_product_constraint_maps_to_validation() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 0))
        .unwrap();
    fx.product_api
        .create_product(product_request("p2", "SKU-2", 0))
        .unwrap();

    // 与另一产品 SKU 撞车 → 参考契约归为校验错误
    let err = fx
        .product_api
        .update_product(
            "p2",
            inventario::api::ProductUpdateRequest {
                sku: Some("SKU-1".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(validation_message(err), "Datos de actualización inválidos");

    let err = fx
        .product_api
        .update_product("ghost", inventario::api::ProductUpdateRequest::default())
        .unwrap_err();
    match err {
        ApiError::NotFound(msg) => assert_eq!(msg, "Producto no encontrado"),
        other => panic!("预期 NotFound，实际 {:?}", other),
    }
}

#[test]
fn test_deactivate_filters_listing() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 0))
        .unwrap();
    fx.product_api
        .create_product(product_request("p2", "SKU-2", 0))
        .unwrap();

    fx.product_api.deactivate_product("p2").unwrap();

    let active = fx.product_api.list_products(true).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].product_id, "p1");

    let all = fx.product_api.list_products(false).unwrap();
    assert_eq!(all.len(), 2);

    fx.product_api.activate_product("p2").unwrap();
    assert_eq!(fx.product_api.list_products(true).unwrap().len(), 2);
}

#[test]
fn test_stock_operations_contract_messages() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("p1", "SKU-1", 10))
        .unwrap();

    let err = fx.product_api.add_stock("p1", 0).unwrap_err();
    assert_eq!(
        validation_message(err),
        "La cantidad a agregar debe ser mayor que cero"
    );

    let err = fx.product_api.subtract_stock("p1", -2).unwrap_err();
    assert_eq!(
        validation_message(err),
        "La cantidad a descontar debe ser mayor que cero"
    );

    // 产品不存在归为校验错误（与参考契约一致）
    let err = fx.product_api.add_stock("ghost", 1).unwrap_err();
    assert_eq!(validation_message(err), "Producto no encontrado");

    let dto = fx.product_api.add_stock("p1", 5).unwrap();
    assert_eq!(dto.stk_qty, 15);

    let dto = fx.product_api.subtract_stock("p1", 15).unwrap();
    assert_eq!(dto.stk_qty, 0);

    let err = fx.product_api.subtract_stock("p1", 1).unwrap_err();
    assert_eq!(validation_message(err), "Stock insuficiente");

    // 失败的扣减不留痕
    let dto = fx.product_api.get_product("p1").unwrap().unwrap();
    assert_eq!(dto.stk_qty, 0);
}

// ==========================================
// 预测
// ==========================================

#[tokio::test]
async fn test_forecast_end_to_end_with_config_override() {
    let fx = setup();
    fx.product_api
        .create_product(product_request("Q", "SKU-Q", 0))
        .unwrap();

    for d in 1..=20 {
        let mut request = movement_request(&format!("q{}", d), "Q", 3);
        request.movement_type = Some("IN".to_string());
        request.date = Some(rfc3339_days_ago(d));
        fx.movement_api.create_movement(request).unwrap();
    }

    // 覆写预测参数: horizon=10, cover=5, min_records=3
    fx.config.update_config("forecast_horizon_days", "10").unwrap();
    fx.config.update_config("forecast_cover_days", "5").unwrap();
    fx.config.update_config("forecast_min_records", "3").unwrap();

    let needs = fx.forecast_api.purchase_needs().await.unwrap();
    assert_eq!(needs.get("Q"), Some(&45));

    let report = fx.forecast_api.purchase_report().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].producto, "Producto Q");
    assert_eq!(report[0].prediccion, 45);
}

#[tokio::test]
async fn test_forecast_empty_store_returns_empty() {
    let fx = setup();

    let needs = fx.forecast_api.purchase_needs().await.unwrap();
    assert!(needs.is_empty(), "空库预测应返回空集而非错误");
}
