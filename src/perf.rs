// ==========================================
// 性能观测: 操作耗时 + SQL 计数 + 慢查询日志
// ==========================================
// 开关经由环境变量控制，Release 默认关闭 SQL 级观测
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SQL_TRACING_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

// 线程内统计: 仅当某个 PerfGuard 在栈上时累计
thread_local! {
    static GUARD_DEPTH: Cell<u32> = Cell::new(0);
    static SQL_SEEN: Cell<u64> = Cell::new(0);
    static SLOW_SQL_SEEN: Cell<u64> = Cell::new(0);
}

const SQL_LOG_MAX_LEN: usize = 420;

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    Some(matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    ))
}

fn one_line_sql(sql: &str) -> String {
    let flat = sql.trim().replace('\n', " ");
    match flat.char_indices().nth(SQL_LOG_MAX_LEN) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// 安装 SQLite 语句 trace/profile 回调
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `INVENTARIO_PERF_SQL=1` 强制开启
/// - `INVENTARIO_SLOW_SQL_MS=50` 配置慢 SQL 阈值（毫秒）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag("INVENTARIO_PERF_SQL").unwrap_or(cfg!(debug_assertions));
    SQL_TRACING_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        // 复用连接时清掉残留 callback
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("INVENTARIO_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_sql_statement));
    conn.profile(Some(on_sql_profiled));
}

fn on_sql_statement(_sql: &str) {
    if !SQL_TRACING_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    if GUARD_DEPTH.with(|d| d.get()) > 0 {
        SQL_SEEN.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_sql_profiled(sql: &str, duration: Duration) {
    if !SQL_TRACING_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = ms,
        sql = %one_line_sql(sql),
        "slow sql"
    );
    if GUARD_DEPTH.with(|d| d.get()) > 0 {
        SLOW_SQL_SEEN.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 操作级统计 Guard：Drop 时记录 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// 使用方式：
/// ```ignore
/// let _perf = inventario::perf::PerfGuard::new("purchase_report");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_baseline: u64,
    slow_sql_baseline: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            sql_baseline: SQL_SEEN.with(|c| c.get()),
            slow_sql_baseline: SLOW_SQL_SEEN.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = SQL_SEEN.with(|c| c.get()).saturating_sub(self.sql_baseline);
        let slow_sql_count = SLOW_SQL_SEEN
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_baseline);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            sql_count,
            slow_sql_count,
            "done"
        );

        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
