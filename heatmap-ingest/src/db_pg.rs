//! PostgreSQL backend — staging-table COPY loads plus the SQL finalize
//! step.
//!
//! Rows land in `adsb_temp` via `COPY ... FROM STDIN` (CSV payload, empty
//! fields for NULL). Finalization runs entirely in SQL: the geometry and
//! the per-aircraft bearing are computed by PostGIS, never in Rust, and
//! the joined result is promoted into the canonical `adsb` table. The
//! `adsb` and `modes` tables are owned by the database, not created here.

use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions, PgPoolCopyExt};

use heatmap_core::EmittedRecord;

use crate::db::{LoadError, RecordSink};

/// Peer-auth socket connection used when no connection string is given.
pub const DEFAULT_CONNECTION_STRING: &str =
    "postgresql://root:postgresql@/adsb?host=/var/run/postgresql";

/// Staging table matching the emitted-record tuple. Idempotent.
const STAGING_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS adsb_temp (
    t DOUBLE PRECISION,
    hex TEXT,
    flight TEXT,
    squawk TEXT,
    lat DOUBLE PRECISION,
    lon DOUBLE PRECISION,
    alt BIGINT,
    gs DOUBLE PRECISION,
    "type" SMALLINT
);
"#;

const STAGING_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS adsb_temp_t_idx ON adsb_temp (t);
CREATE INDEX IF NOT EXISTS adsb_temp_hex_idx ON adsb_temp (hex);
"#;

/// Promote staged rows into `adsb`: build the point geometry, compute the
/// bearing from each aircraft's previous position, and join static
/// aircraft metadata.
const FINALIZE_INSERT: &str = r#"
INSERT INTO adsb SELECT
    to_timestamp(a.t) AS t,
    a.hex, a.flight, a.alt, a.gs,
    ST_SetSRID(ST_MakePoint(a.lon, a.lat), 4326) AS geom,
    ST_Azimuth(
        ST_SetSRID(ST_MakePoint(
            LAG(a.lon) OVER (PARTITION BY a.hex ORDER BY t),
            LAG(a.lat) OVER (PARTITION BY a.hex ORDER BY t)
        ), 4326),
        ST_SetSRID(ST_MakePoint(a.lon, a.lat), 4326)
    ) AS bearing,
    m.registration,
    m.typecode,
    m.category,
    m.military
FROM adsb_temp a
LEFT JOIN modes m ON a.hex = m.hex;
"#;

const COPY_STATEMENT: &str =
    r#"COPY adsb_temp (t, hex, flight, squawk, lat, lon, alt, gs, "type") FROM STDIN WITH (FORMAT CSV)"#;

/// Connection-pooled PostgreSQL loader.
pub struct PgLoader {
    pool: PgPool,
}

impl PgLoader {
    /// Connect and ensure the staging table exists.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        sqlx::raw_sql(STAGING_SCHEMA).execute(&pool).await?;
        Ok(PgLoader { pool })
    }

    /// Index the staging table and promote its rows into `adsb`.
    /// Returns the number of promoted rows.
    pub async fn finalize(&self) -> Result<u64, sqlx::Error> {
        info!("creating staging indexes");
        sqlx::raw_sql(STAGING_INDEXES).execute(&self.pool).await?;

        info!("inserting staged rows into main adsb table");
        let result = sqlx::raw_sql(FINALIZE_INSERT).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Drop the staging table after a finalized run.
    pub async fn drop_staging(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql("DROP TABLE IF EXISTS adsb_temp")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordSink for PgLoader {
    async fn append_rows(&self, batch: &[EmittedRecord]) -> Result<(), LoadError> {
        if batch.is_empty() {
            return Ok(());
        }
        let payload = encode_csv(batch)?;
        let mut copy = self.pool.copy_in_raw(COPY_STATEMENT).await?;
        copy.send(payload.as_slice()).await?;
        copy.finish().await?;
        Ok(())
    }
}

/// Serialize a batch as the COPY payload. Absent `flight`/`squawk`/`gs`
/// become empty CSV fields, which COPY reads as NULL.
fn encode_csv(batch: &[EmittedRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut payload = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut payload);
        for row in batch {
            writer.serialize(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }
    Ok(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
