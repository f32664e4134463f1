//! 测试记录存储
//!
//! 基于 SQLite 的完成测试记录仓库。连接由互斥锁保护，
//! 独立会话的并发追加在这里串行化。

use crate::models::{NewSpeedTest, SpeedTestResult, SpeedTestRow};
use crate::streaming::{ResultStore, StreamError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 速度测试数据库
pub struct SpeedTestDb {
    conn: Arc<Mutex<Connection>>,
}

impl SpeedTestDb {
    /// 打开（必要时创建）数据库文件并初始化表结构
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        info!(path = %path.display(), "已连接 SQLite 数据库");
        Ok(db)
    }

    /// 打开内存数据库（测试使用）
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let db = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.lock().execute(
            "CREATE TABLE IF NOT EXISTS speed_tests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model_name TEXT NOT NULL,
                prompt_length INTEGER NOT NULL,
                response_length INTEGER NOT NULL,
                time_taken_ms INTEGER NOT NULL,
                tokens_per_second REAL NOT NULL,
                provider TEXT NOT NULL,
                test_timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    /// 插入一条测试记录，返回自增 id
    pub fn insert(&self, test: &NewSpeedTest) -> Result<i64, rusqlite::Error> {
        insert_record(&self.conn.lock(), test)
    }

    /// 按时间倒序返回全部记录
    pub fn list_all(&self) -> Result<Vec<SpeedTestRow>, rusqlite::Error> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, model_name, prompt_length, response_length, time_taken_ms,
                    tokens_per_second, provider, test_timestamp
             FROM speed_tests
             ORDER BY test_timestamp DESC, id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SpeedTestRow {
                id: row.get(0)?,
                model_name: row.get(1)?,
                prompt_length: row.get::<_, i64>(2)? as u64,
                response_length: row.get::<_, i64>(3)? as u64,
                time_taken_ms: row.get::<_, i64>(4)? as u64,
                tokens_per_second: row.get(5)?,
                provider: row.get(6)?,
                test_timestamp: row.get(7)?,
            })
        })?;

        let mut tests = Vec::new();
        for row in rows.flatten() {
            tests.push(row);
        }
        Ok(tests)
    }
}

fn insert_record(conn: &Connection, test: &NewSpeedTest) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO speed_tests
            (model_name, prompt_length, response_length, time_taken_ms,
             tokens_per_second, provider, test_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            test.model_name,
            test.prompt_length,
            test.response_length,
            test.time_taken_ms,
            test.tokens_per_second,
            test.provider,
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[async_trait]
impl ResultStore for SpeedTestDb {
    /// 会话结束后写入一条结果记录
    ///
    /// SQLite 写入是同步操作，放到阻塞线程池执行，不占用异步工作线程。
    async fn record(&self, result: &SpeedTestResult) -> Result<(), StreamError> {
        let conn = Arc::clone(&self.conn);
        let test = NewSpeedTest::from(result);
        tokio::task::spawn_blocking(move || insert_record(&conn.lock(), &test))
            .await
            .map_err(|e| StreamError::internal(e.to_string()))??;
        Ok(())
    }
}
