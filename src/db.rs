//! Database module - PostgreSQL connection, migrations and row conversion

use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row, TypeInfo, ValueRef};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Users (identity collaborator; role assigned at registration, never updated)
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(64) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(20) NOT NULL DEFAULT 'guest',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Login audit (append-only; user_id is NULL for unknown-username attempts)
CREATE TABLE IF NOT EXISTS login_audit (
    id BIGSERIAL PRIMARY KEY,
    user_id UUID REFERENCES users(id) ON DELETE SET NULL,
    success BOOLEAN NOT NULL,
    ip_address VARCHAR(45) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Known devices (one row per (user, fingerprint) pair)
CREATE TABLE IF NOT EXISTS known_devices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    device_hash VARCHAR(64) NOT NULL,
    first_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, device_hash)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_login_audit_user ON login_audit(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_login_audit_success ON login_audit(user_id, success, created_at);
CREATE INDEX IF NOT EXISTS idx_known_devices_user ON known_devices(user_id);
"#;

/// Convert a Postgres row to a schema-less JSON map.
///
/// The masking pipeline works on arbitrary query results, so values are
/// decoded by runtime column type into tagged scalars. Types without a JSON
/// scalar mapping come back as null rather than failing the request.
pub fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut out = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let is_null = row
            .try_get_raw(idx)
            .map(|raw| raw.is_null())
            .unwrap_or(true);

        let value = if is_null {
            Value::Null
        } else {
            decode_column(row, idx, col.type_info().name())
        };
        out.insert(col.name().to_string(), value);
    }
    out
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool).unwrap_or(Value::Null),
        "INT2" => row.try_get::<i16, _>(idx).map(|v| Value::from(v as i64)).unwrap_or(Value::Null),
        "INT4" => row.try_get::<i32, _>(idx).map(|v| Value::from(v as i64)).unwrap_or(Value::Null),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from).unwrap_or(Value::Null),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::from(v as f64)).unwrap_or(Value::Null),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::from).unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx).unwrap_or(Value::Null),
        other => {
            tracing::debug!("Unsupported column type '{}', emitting null", other);
            Value::Null
        }
    }
}
