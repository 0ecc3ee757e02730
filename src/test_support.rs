//! 테스트용 DB 풀과 토큰 헬퍼

use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::PageLimits;
use crate::models::{CreateCertificateRequest, NewCertificate, TagInput};

/// 마이그레이션이 적용된 인메모리 SQLite 풀.
///
/// 인메모리 DB는 연결마다 따로 생기므로 연결을 하나로 고정하고,
/// 그 연결이 유휴 시간으로 닫히지 않게 합니다.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

/// 여러 연결이 동시에 붙는 임시 파일 DB. 동시성 테스트용.
pub struct FileDb {
    pub pool: SqlitePool,
    path: PathBuf,
}

impl FileDb {
    pub async fn new(connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("giftcert-{}.db", uuid::Uuid::now_v7()));
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .max_connections(connections)
            .connect_with(options)
            .await
            .expect("file sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        Self { pool, path }
    }

    pub async fn close(self) {
        self.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub fn limits() -> PageLimits {
    PageLimits::default()
}

/// 검증을 통과한 생성 요청을 만듭니다.
pub fn new_certificate(name: &str, tags: &[&str]) -> NewCertificate {
    CreateCertificateRequest {
        name: Some(name.to_string()),
        description: Some(format!("{} description", name)),
        price: Some(10.0),
        duration: Some(30),
        tags: tags
            .iter()
            .map(|t| TagInput {
                name: t.to_string(),
            })
            .collect(),
    }
    .validate()
    .expect("valid certificate")
}

pub async fn tag_rows_named(pool: &SqlitePool, name: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("count tags");
    count
}
