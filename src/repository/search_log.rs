//! Search log: one row per job, plus the records of successful searches.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use super::{connect, format_datetime, parse_datetime, to_option, Result};
use crate::models::{CaseRecord, JobId, SearchQuery};

/// Tables the log creates on first use.
pub const EXPECTED_TABLES: [&str; 3] = ["searches", "case_results", "search_statistics"];

/// Final (or initial) status of a logged search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchOutcome {
    Started,
    Success,
    SuccessWithWarning,
    NoData,
    Failed,
}

impl SearchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Success => "SUCCESS",
            Self::SuccessWithWarning => "SUCCESS_WITH_WARNING",
            Self::NoData => "NO_DATA",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STARTED" => Some(Self::Started),
            "SUCCESS" => Some(Self::Success),
            "SUCCESS_WITH_WARNING" => Some(Self::SuccessWithWarning),
            "NO_DATA" => Some(Self::NoData),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Outcomes whose record is stored in `case_results`.
    pub fn stores_record(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessWithWarning)
    }
}

/// One row of the `searches` table.
#[derive(Debug, Clone, Serialize)]
pub struct SearchLogEntry {
    pub job_id: String,
    pub case_type: String,
    pub case_number: i64,
    pub filing_year: i32,
    pub searched_at: DateTime<Utc>,
    pub status: String,
    pub processing_time: Option<f64>,
    pub error_message: Option<String>,
}

impl SearchLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            job_id: row.get("job_id")?,
            case_type: row.get("case_type")?,
            case_number: row.get("case_number")?,
            filing_year: row.get("filing_year")?,
            searched_at: parse_datetime(&row.get::<_, String>("searched_at")?),
            status: row.get("status")?,
            processing_time: row.get("processing_time")?,
            error_message: row.get("error_message")?,
        })
    }
}

/// A past search for one case, joined with its stored result if any.
#[derive(Debug, Clone, Serialize)]
pub struct CaseHistoryEntry {
    #[serde(flatten)]
    pub search: SearchLogEntry,
    pub case_info: Option<String>,
    pub parties: Option<String>,
    pub filing_date: Option<String>,
    pub next_hearing: Option<String>,
}

/// Aggregates over the whole log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStatistics {
    pub total_searches: i64,
    pub successful_searches: i64,
    pub failed_searches: i64,
    pub no_data_searches: i64,
    /// Percentage, two decimals.
    pub success_rate: f64,
    /// Seconds, two decimals.
    pub avg_processing_time: f64,
    pub recent_searches_24h: i64,
}

/// One row of the per-day roll-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistics {
    pub date: String,
    pub total_searches: i64,
    pub successful_searches: i64,
    pub failed_searches: i64,
    pub avg_processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub connection: bool,
    pub tables_created: bool,
    pub existing_tables: Vec<String>,
    pub database_path: PathBuf,
    pub database_exists: bool,
    pub database_size: u64,
}

/// SQLite-backed search log.
#[derive(Debug, Clone)]
pub struct SearchLog {
    db_path: PathBuf,
}

impl SearchLog {
    /// Open (creating if needed) the log at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let log = Self {
            db_path: db_path.to_path_buf(),
        };
        log.init_schema()?;
        info!("Search log ready at {}", db_path.display());
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT UNIQUE NOT NULL,
                case_type TEXT NOT NULL,
                case_number INTEGER NOT NULL,
                filing_year INTEGER NOT NULL,
                searched_at TEXT NOT NULL,
                status TEXT NOT NULL,
                processing_time REAL,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_searches_case
                ON searches(case_type, case_number, filing_year);
            CREATE INDEX IF NOT EXISTS idx_searches_searched_at
                ON searches(searched_at);

            CREATE TABLE IF NOT EXISTS case_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL REFERENCES searches(job_id),
                result_data TEXT NOT NULL,
                case_info TEXT,
                parties TEXT,
                filing_date TEXT,
                next_hearing TEXT,
                pdf_link TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_case_results_job
                ON case_results(job_id);

            CREATE TABLE IF NOT EXISTS search_statistics (
                date TEXT PRIMARY KEY,
                total_searches INTEGER NOT NULL DEFAULT 0,
                successful_searches INTEGER NOT NULL DEFAULT 0,
                failed_searches INTEGER NOT NULL DEFAULT 0,
                total_processing_time REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Record that a search was accepted. Re-logging a job id replaces it.
    pub fn log_search_start(&self, job_id: &JobId, query: &SearchQuery) -> Result<()> {
        self.log_search_start_at(job_id, query, Utc::now())
    }

    pub fn log_search_start_at(
        &self,
        job_id: &JobId,
        query: &SearchQuery,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO searches
                (job_id, case_type, case_number, filing_year, searched_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                job_id.as_str(),
                query.case_type(),
                query.case_number() as i64,
                query.filing_year(),
                format_datetime(at),
                SearchOutcome::Started.as_str(),
            ],
        )?;
        debug!("Logged search start: {}", job_id);
        Ok(())
    }

    /// Record how a search ended. The record is stored only for successful
    /// outcomes.
    pub fn log_search_result(
        &self,
        job_id: &JobId,
        outcome: SearchOutcome,
        record: Option<&CaseRecord>,
        duration: Option<Duration>,
        error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        let seconds = duration.map(|d| d.as_secs_f64());

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            UPDATE searches
            SET status = ?1, processing_time = ?2, error_message = ?3
            WHERE job_id = ?4
            "#,
            params![outcome.as_str(), seconds, error, job_id.as_str()],
        )?;

        if let Some(record) = record.filter(|_| outcome.stores_record()) {
            tx.execute(
                r#"
                INSERT INTO case_results
                    (job_id, result_data, case_info, parties, filing_date, next_hearing,
                     pdf_link, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    job_id.as_str(),
                    serde_json::to_string(record)?,
                    record.case_info,
                    record.parties,
                    record.filing_date,
                    record.next_hearing,
                    record.pdf_link,
                    format_datetime(now),
                ],
            )?;
        }

        let (succeeded, failed) = match outcome {
            SearchOutcome::Success | SearchOutcome::SuccessWithWarning => (1, 0),
            SearchOutcome::Failed | SearchOutcome::NoData => (0, 1),
            SearchOutcome::Started => (0, 0),
        };
        tx.execute(
            r#"
            INSERT INTO search_statistics
                (date, total_searches, successful_searches, failed_searches,
                 total_processing_time, updated_at)
            VALUES (?1, 1, ?2, ?3, ?4, ?5)
            ON CONFLICT(date) DO UPDATE SET
                total_searches = total_searches + 1,
                successful_searches = successful_searches + excluded.successful_searches,
                failed_searches = failed_searches + excluded.failed_searches,
                total_processing_time = total_processing_time + excluded.total_processing_time,
                updated_at = excluded.updated_at
            "#,
            params![
                now.format("%Y-%m-%d").to_string(),
                succeeded,
                failed,
                seconds.unwrap_or(0.0),
                format_datetime(now),
            ],
        )?;

        tx.commit()?;
        debug!("Logged search result: {} - {}", job_id, outcome.as_str());
        Ok(())
    }

    /// Most recent searches first.
    pub fn recent_searches(&self, limit: usize) -> Result<Vec<SearchLogEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM searches ORDER BY searched_at DESC, id DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], SearchLogEntry::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn statistics(&self) -> Result<SearchStatistics> {
        self.statistics_at(Utc::now())
    }

    pub fn statistics_at(&self, now: DateTime<Utc>) -> Result<SearchStatistics> {
        let conn = self.connect()?;
        let count = |sql: &str, p: &[&dyn rusqlite::ToSql]| -> rusqlite::Result<i64> {
            conn.query_row(sql, p, |row| row.get(0))
        };

        let total = count("SELECT COUNT(*) FROM searches", &[])?;
        let successful = count(
            "SELECT COUNT(*) FROM searches WHERE status IN ('SUCCESS', 'SUCCESS_WITH_WARNING')",
            &[],
        )?;
        let failed = count("SELECT COUNT(*) FROM searches WHERE status = 'FAILED'", &[])?;
        let no_data = count("SELECT COUNT(*) FROM searches WHERE status = 'NO_DATA'", &[])?;
        let cutoff = format_datetime(now - chrono::Duration::days(1));
        let recent = count(
            "SELECT COUNT(*) FROM searches WHERE searched_at > ?",
            &[&cutoff],
        )?;
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(processing_time) FROM searches WHERE processing_time > 0",
            [],
            |row| row.get(0),
        )?;

        let success_rate = if total > 0 {
            round2(successful as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        Ok(SearchStatistics {
            total_searches: total,
            successful_searches: successful,
            failed_searches: failed,
            no_data_searches: no_data,
            success_rate,
            avg_processing_time: round2(avg.unwrap_or(0.0)),
            recent_searches_24h: recent,
        })
    }

    /// Per-day roll-up, newest day first.
    pub fn daily_statistics(&self, days: usize) -> Result<Vec<DailyStatistics>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT date, total_searches, successful_searches, failed_searches,
                   total_processing_time
            FROM search_statistics
            ORDER BY date DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt
            .query_map(params![days as i64], |row| {
                let total: i64 = row.get(1)?;
                let time: f64 = row.get(4)?;
                Ok(DailyStatistics {
                    date: row.get(0)?,
                    total_searches: total,
                    successful_searches: row.get(2)?,
                    failed_searches: row.get(3)?,
                    avg_processing_time: if total > 0 {
                        round2(time / total as f64)
                    } else {
                        0.0
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every logged search for one case, newest first.
    pub fn case_history(&self, query: &SearchQuery) -> Result<Vec<CaseHistoryEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.*, r.case_info, r.parties, r.filing_date, r.next_hearing
            FROM searches s
            LEFT JOIN case_results r ON s.job_id = r.job_id
            WHERE s.case_type = ?1 AND s.case_number = ?2 AND s.filing_year = ?3
            ORDER BY s.searched_at DESC, s.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    query.case_type(),
                    query.case_number() as i64,
                    query.filing_year()
                ],
                |row| {
                    Ok(CaseHistoryEntry {
                        search: SearchLogEntry::from_row(row)?,
                        case_info: row.get("case_info")?,
                        parties: row.get("parties")?,
                        filing_date: row.get("filing_date")?,
                        next_hearing: row.get("next_hearing")?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The stored record of a job, if one was kept.
    pub fn latest_result(&self, job_id: &JobId) -> Result<Option<CaseRecord>> {
        let conn = self.connect()?;
        let data = to_option(conn.query_row(
            "SELECT result_data FROM case_results WHERE job_id = ? ORDER BY id DESC LIMIT 1",
            params![job_id.as_str()],
            |row| row.get::<_, String>(0),
        ))?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Status of one logged job.
    pub fn search_status(&self, job_id: &JobId) -> Result<Option<SearchOutcome>> {
        let conn = self.connect()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM searches WHERE job_id = ?",
                params![job_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.as_deref().and_then(SearchOutcome::from_str))
    }

    /// Delete searches (and their results) older than `days`. Returns the
    /// number of searches removed.
    pub fn cleanup_old_records(&self, days: u32) -> Result<usize> {
        self.cleanup_before(Utc::now() - chrono::Duration::days(days as i64))
    }

    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = format_datetime(cutoff);
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            DELETE FROM case_results
            WHERE job_id IN (SELECT job_id FROM searches WHERE searched_at < ?1)
            "#,
            params![cutoff],
        )?;
        let deleted = tx.execute(
            "DELETE FROM searches WHERE searched_at < ?1",
            params![cutoff],
        )?;

        tx.commit()?;
        info!("Cleaned up {} old search records", deleted);
        Ok(deleted)
    }

    /// Connection and schema diagnostics.
    pub fn health(&self) -> DatabaseHealth {
        let database_exists = self.db_path.exists();
        let database_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        let tables = self.connect().and_then(|conn| {
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        });

        match tables {
            Ok(existing_tables) => DatabaseHealth {
                connection: true,
                tables_created: EXPECTED_TABLES
                    .iter()
                    .all(|t| existing_tables.iter().any(|e| e == t)),
                existing_tables,
                database_path: self.db_path.clone(),
                database_exists,
                database_size,
            },
            Err(e) => {
                debug!("Search log health check failed: {}", e);
                DatabaseHealth {
                    connection: false,
                    tables_created: false,
                    existing_tables: Vec::new(),
                    database_path: self.db_path.clone(),
                    database_exists,
                    database_size,
                }
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
