//! Postgres full-text [`KeywordIndexProvider`].
//!
//! Uses the same `r2d2`/`r2d2_postgres` pairing as the Postgres catalog store: synchronous
//! `postgres` queries bridged into the async pipeline via `tokio::task::spawn_blocking`. A
//! `tsvector` column plus a GIN index gives Postgres-native ranking (`ts_rank`) without standing
//! up a separate search engine; `plainto_tsquery` treats the caller's query as a bag of words
//! rather than `tsquery` operator syntax, since queries here come straight from end users.

use crate::domain::error::{Error, Result};
use crate::domain::ports::keyword_index::{KeywordIndexProvider, KeywordSearchHit};
use crate::domain::types::SearchFilters;
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_postgres::postgres::NoTls;
use r2d2_postgres::PostgresConnectionManager;
use uuid::Uuid;

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Connection settings for the Postgres full-text keyword index backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PostgresKeywordIndexConfig {
    /// A `postgres://` connection string. Typically the same database as the catalog, but kept
    /// independently configurable since a deployment may point full-text search at a replica.
    pub connection_string: String,
    /// Maximum pooled connections.
    pub max_pool_size: u32,
    /// The `regconfig` text-search configuration `to_tsvector`/`plainto_tsquery` use, e.g.
    /// `"english"`.
    pub language: String,
}

impl Default for PostgresKeywordIndexConfig {
    fn default() -> Self {
        Self {
            connection_string: "postgres://localhost/kbcore".to_string(),
            max_pool_size: 10,
            language: "english".to_string(),
        }
    }
}

/// A [`KeywordIndexProvider`] backed by a Postgres `tsvector` column and GIN index, ranked with
/// `ts_rank`.
pub struct PostgresKeywordIndexProvider {
    pool: PgPool,
    language: String,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS keyword_index_chunks (
    chunk_id UUID PRIMARY KEY,
    kb_id UUID NOT NULL,
    document_id UUID NOT NULL,
    content TEXT NOT NULL,
    content_tsv tsvector NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_keyword_index_chunks_tsv ON keyword_index_chunks USING GIN (content_tsv);
CREATE INDEX IF NOT EXISTS idx_keyword_index_chunks_kb ON keyword_index_chunks (kb_id);
";

impl PostgresKeywordIndexProvider {
    /// Builds a connection pool and ensures the schema exists.
    pub fn connect(config: &PostgresKeywordIndexConfig) -> Result<Self> {
        let manager = PostgresConnectionManager::new(
            config
                .connection_string
                .parse()
                .map_err(|e| Error::config(format!("invalid postgres connection string: {e}")))?,
            NoTls,
        );
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .build(manager)
            .map_err(|e| Error::config(format!("failed to build postgres pool: {e}")))?;

        let mut conn = pool.get().map_err(|e| Error::internal(format!("postgres connection failed: {e}")))?;
        conn.batch_execute(SCHEMA).map_err(|e| Error::internal(format!("schema migration failed: {e}")))?;
        Ok(Self { pool, language: config.language.clone() })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut r2d2_postgres::postgres::Client) -> std::result::Result<T, r2d2_postgres::postgres::Error> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::internal(format!("postgres connection failed: {e}")))?;
            f(&mut conn).map_err(|e| Error::internal(format!("postgres query failed: {e}")))
        })
        .await
        .map_err(|e| Error::internal(format!("postgres task panicked: {e}")))?
    }
}

#[async_trait]
impl KeywordIndexProvider for PostgresKeywordIndexProvider {
    async fn index_chunk(&self, kb_id: Uuid, chunk_id: Uuid, document_id: Uuid, content: &str) -> Result<()> {
        let content = content.to_string();
        let language = self.language.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO keyword_index_chunks (chunk_id, kb_id, document_id, content, content_tsv) \
                 VALUES ($1, $2, $3, $4, to_tsvector($5::regconfig, $4)) \
                 ON CONFLICT (chunk_id) DO UPDATE SET \
                 kb_id = EXCLUDED.kb_id, document_id = EXCLUDED.document_id, content = EXCLUDED.content, \
                 content_tsv = EXCLUDED.content_tsv",
                &[&chunk_id, &kb_id, &document_id, &content, &language],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_chunk(&self, _kb_id: Uuid, chunk_id: Uuid) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM keyword_index_chunks WHERE chunk_id = $1", &[&chunk_id])?;
            Ok(())
        })
        .await
    }

    async fn drop_kb(&self, kb_id: Uuid) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM keyword_index_chunks WHERE kb_id = $1", &[&kb_id])?;
            Ok(())
        })
        .await
    }

    async fn search(&self, kb_id: Uuid, query: &str, top_k: usize, filters: &SearchFilters) -> Result<Vec<KeywordSearchHit>> {
        let query = query.to_string();
        let language = self.language.clone();
        let document_ids = filters.document_ids.clone();
        let limit = top_k as i64;

        self.with_conn(move |conn| {
            let rows = if let Some(document_ids) = &document_ids {
                conn.query(
                    "SELECT chunk_id, document_id, content, \
                     ts_rank(content_tsv, plainto_tsquery($2::regconfig, $3)) AS rank, \
                     ts_headline($2::regconfig, content, plainto_tsquery($2::regconfig, $3)) AS headline \
                     FROM keyword_index_chunks \
                     WHERE kb_id = $1 AND document_id = ANY($4) \
                     AND content_tsv @@ plainto_tsquery($2::regconfig, $3) \
                     ORDER BY rank DESC LIMIT $5",
                    &[&kb_id, &language, &query, document_ids, &limit],
                )?
            } else {
                conn.query(
                    "SELECT chunk_id, document_id, content, \
                     ts_rank(content_tsv, plainto_tsquery($2::regconfig, $3)) AS rank, \
                     ts_headline($2::regconfig, content, plainto_tsquery($2::regconfig, $3)) AS headline \
                     FROM keyword_index_chunks \
                     WHERE kb_id = $1 \
                     AND content_tsv @@ plainto_tsquery($2::regconfig, $3) \
                     ORDER BY rank DESC LIMIT $4",
                    &[&kb_id, &language, &query, &limit],
                )?
            };

            Ok(rows
                .into_iter()
                .map(|row| {
                    let headline: String = row.get("headline");
                    KeywordSearchHit {
                        chunk_id: row.get("chunk_id"),
                        document_id: row.get("document_id"),
                        score: row.get::<_, f32>("rank"),
                        content: row.get("content"),
                        highlights: if headline.is_empty() { None } else { Some(vec![headline]) },
                    }
                })
                .collect())
        })
        .await
    }

    fn provider_name(&self) -> &str {
        "postgres_fts"
    }
}
