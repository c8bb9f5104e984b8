// ==========================================
// 库存移动仓储集成测试
// ==========================================
// 覆盖: CRUD、分页、日期阈值查询、约束分类
// ==========================================


use chrono::{TimeZone, Utc};
use inventario::domain::movement::{Movement, MovementPatch};
use inventario::domain::types::MovementType;
use inventario::repository::{MovementRepository, RepositoryError};
use test_helpers::{create_test_db, open_test_connection, seed_product};

fn sample_movement(movement_id: &str, day: u32, qty: i64) -> Movement {
    Movement {
        movement_id: movement_id.to_string(),
        date: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
        product_id: "p1".to_string(),
        movement_type: MovementType::Out,
        quantity: qty,
        order_id: None,
        notes: None,
    }
}

fn setup() -> (tempfile::NamedTempFile, MovementRepository) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    {
        let guard = conn.lock().unwrap();
        seed_product(&guard, "p1", "Tornillo", "TOR-001", 100);
        seed_product(&guard, "p2", "Tuerca", "TUE-001", 50);
    }
    (temp_file, MovementRepository::from_connection(conn))
}

#[test]
fn test_insert_and_get_by_id() {
    let (_tmp, repo) = setup();

    let movement = sample_movement("m1", 1, 5);
    repo.insert(&movement).expect("插入失败");

    let loaded = repo.get_by_id("m1").unwrap().expect("应找到记录");
    assert_eq!(loaded.movement_id, "m1");
    assert_eq!(loaded.product_id, "p1");
    assert_eq!(loaded.movement_type, MovementType::Out);
    assert_eq!(loaded.quantity, 5);
    assert_eq!(loaded.date, movement.date);

    assert!(repo.get_by_id("missing").unwrap().is_none());
}

#[test]
fn test_exists() {
    let (_tmp, repo) = setup();
    repo.insert(&sample_movement("m1", 1, 5)).unwrap();

    assert!(repo.exists("m1").unwrap());
    assert!(!repo.exists("m2").unwrap());
}

#[test]
fn test_duplicate_primary_key_is_constraint_violation() {
    let (_tmp, repo) = setup();
    repo.insert(&sample_movement("m1", 1, 5)).unwrap();

    let err = repo.insert(&sample_movement("m1", 2, 3)).unwrap_err();
    assert!(err.is_constraint_violation(), "重复主键应归类为约束冲突");
}

#[test]
fn test_missing_product_is_foreign_key_violation() {
    let (_tmp, repo) = setup();

    let mut movement = sample_movement("m1", 1, 5);
    movement.product_id = "ghost".to_string();

    let err = repo.insert(&movement).unwrap_err();
    assert!(err.is_constraint_violation(), "外键缺失应归类为约束冲突");
}

#[test]
fn test_list_all_newest_first() {
    let (_tmp, repo) = setup();
    repo.insert(&sample_movement("m1", 1, 5)).unwrap();
    repo.insert(&sample_movement("m2", 3, 5)).unwrap();
    repo.insert(&sample_movement("m3", 2, 5)).unwrap();

    let all = repo.list_all(None, None).unwrap();
    let ids: Vec<&str> = all.iter().map(|m| m.movement_id.as_str()).collect();
    assert_eq!(ids, vec!["m2", "m3", "m1"], "应按日期倒序");
}

#[test]
fn test_list_all_pagination() {
    let (_tmp, repo) = setup();
    for day in 1..=5 {
        repo.insert(&sample_movement(&format!("m{}", day), day, 5))
            .unwrap();
    }

    let page1 = repo.list_all(Some(1), Some(2)).unwrap();
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].movement_id, "m5");

    let page3 = repo.list_all(Some(3), Some(2)).unwrap();
    assert_eq!(page3.len(), 1);
    assert_eq!(page3[0].movement_id, "m1");

    // 越界页返回空页而非错误
    let page9 = repo.list_all(Some(9), Some(2)).unwrap();
    assert!(page9.is_empty());
}

#[test]
fn test_query_since_threshold_inclusive() {
    let (_tmp, repo) = setup();
    repo.insert(&sample_movement("m1", 1, 5)).unwrap();
    repo.insert(&sample_movement("m2", 10, 5)).unwrap();
    repo.insert(&sample_movement("m3", 20, 5)).unwrap();

    let since = chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
    let rows = repo.query_since(Some(since)).unwrap();
    let mut ids: Vec<&str> = rows.iter().map(|m| m.movement_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["m2", "m3"], "阈值日当天的记录应包含在内");

    let all = repo.query_since(None).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_update_patch_and_null_out_notes() {
    let (_tmp, repo) = setup();
    let mut movement = sample_movement("m1", 1, 5);
    movement.notes = Some("original".to_string());
    repo.insert(&movement).unwrap();

    let patch = MovementPatch {
        quantity: Some(9),
        product_id: Some("p2".to_string()),
        notes: Some(None),
        ..Default::default()
    };
    let updated = repo.update("m1", &patch).unwrap();

    assert_eq!(updated.quantity, 9);
    assert_eq!(updated.product_id, "p2");
    assert!(updated.notes.is_none(), "双层 Option 置空应落库为 NULL");
    // 未出现的字段保持不变
    assert_eq!(updated.movement_type, MovementType::Out);

    let reloaded = repo.get_by_id("m1").unwrap().unwrap();
    assert_eq!(reloaded.quantity, 9);
    assert!(reloaded.notes.is_none());
}

#[test]
fn test_update_missing_returns_not_found() {
    let (_tmp, repo) = setup();

    let err = repo.update("ghost", &MovementPatch::default()).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_delete() {
    let (_tmp, repo) = setup();
    repo.insert(&sample_movement("m1", 1, 5)).unwrap();

    repo.delete("m1").expect("删除应成功");
    assert!(!repo.exists("m1").unwrap());

    let err = repo.delete("m1").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}
