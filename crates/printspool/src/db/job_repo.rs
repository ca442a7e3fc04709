//! Job repository — row-level operations for the `print_jobs` table.
//!
//! Status transitions go through [`update_status_cas`], a compare-and-set
//! that only applies when the stored status still matches the caller's
//! expectation. Everything above this layer relies on that primitive
//! instead of external locking.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub job_id: String,
    pub filename: String,
    pub storage_ref: String,
    pub file_size: i64,
    pub paper_size: String,
    pub color_mode: String,
    pub page_range: String,
    pub copies: i64,
    pub printer_name: String,
    pub status: String,
    pub error_message: Option<String>,
    pub uploaded_at: String,
    pub processed_at: Option<String>,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_id: row.get("job_id")?,
            filename: row.get("filename")?,
            storage_ref: row.get("storage_ref")?,
            file_size: row.get("file_size")?,
            paper_size: row.get("paper_size")?,
            color_mode: row.get("color_mode")?,
            page_range: row.get("page_range")?,
            copies: row.get("copies")?,
            printer_name: row.get("printer_name")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            uploaded_at: row.get("uploaded_at")?,
            processed_at: row.get("processed_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Which timestamp column a status transition stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampColumn {
    ProcessedAt,
    CompletedAt,
}

/// Inserts a new job row. A `job_id` collision maps to
/// [`DatabaseError::Duplicate`].
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.execute(
            "INSERT INTO print_jobs (job_id, filename, storage_ref, file_size, paper_size,
             color_mode, page_range, copies, printer_name, status, error_message,
             uploaded_at, processed_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.job_id,
                job.filename,
                job.storage_ref,
                job.file_size,
                job.paper_size,
                job.color_mode,
                job.page_range,
                job.copies,
                job.printer_name,
                job.status,
                job.error_message,
                job.uploaded_at,
                job.processed_at,
                job.completed_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DatabaseError::Duplicate {
                    job_id: job.job_id.clone(),
                })
            }
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, job_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM print_jobs WHERE job_id = ?1")?;
        let mut rows = stmt.query_map(params![job_id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns whether a row with the given ID exists.
pub fn exists(db: &Database, job_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM print_jobs WHERE job_id = ?1",
            params![job_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

/// Queries jobs with filters, newest first, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM print_jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch bounded results.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM print_jobs {} ORDER BY uploaded_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Compare-and-set status update. Applies `new_status` and stamps the
/// transition timestamp only when the stored status equals
/// `expected_status`. Returns the number of rows changed (0 when the
/// row is missing or the status has moved on).
pub fn update_status_cas(
    db: &Database,
    job_id: &str,
    expected_status: &str,
    new_status: &str,
    stamp: StampColumn,
    stamped_at: &str,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let sql = match stamp {
            StampColumn::ProcessedAt => {
                "UPDATE print_jobs SET status = ?2, processed_at = ?3
                 WHERE job_id = ?1 AND status = ?4"
            }
            StampColumn::CompletedAt => {
                "UPDATE print_jobs SET status = ?2, completed_at = ?3
                 WHERE job_id = ?1 AND status = ?4"
            }
        };
        let changed = conn.execute(sql, params![job_id, new_status, stamped_at, expected_status])?;
        Ok(changed)
    })
}

/// Sets the error message on a job without touching its status.
/// Returns the number of rows changed.
pub fn set_error(db: &Database, job_id: &str, message: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE print_jobs SET error_message = ?2 WHERE job_id = ?1",
            params![job_id, message],
        )?;
        Ok(changed)
    })
}

/// Deletes a job row. Returns the number of rows removed.
pub fn delete(db: &Database, job_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM print_jobs WHERE job_id = ?1",
            params![job_id],
        )?;
        Ok(changed)
    })
}

/// Selects printed jobs whose `completed_at` is strictly before `cutoff`
/// (RFC 3339). Pending and processing jobs are never selected.
pub fn select_expired(db: &Database, cutoff: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM print_jobs
             WHERE status = 'printed' AND completed_at IS NOT NULL AND completed_at < ?1
             ORDER BY completed_at ASC",
        )?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![cutoff], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
