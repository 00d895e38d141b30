//! SQLite voting store
//!
//! Durable implementation of `VotingStore` on sqlx. Uniqueness is enforced
//! by the schema; the vote write is a single guarded UPDATE so the
//! unvoted → cast transition happens at most once per token no matter how
//! many connections race on it.

use crate::voting::error::{StoreError, StoreResult};
use crate::voting::traits::VotingStore;
use crate::voting::types::*;
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::schema::SCHEMA;

/// Connections kept by a file-backed store
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// How long a writer waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// sqlx-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the schema
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "cannot create database directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "voting database opened");
        Ok(store)
    }

    /// Private in-memory database (single connection)
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to :memory: is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Close the pool, waiting for in-flight queries
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn ts(value: i64) -> Timestamp {
    Timestamp(value.max(0) as u64)
}

fn secs(value: Timestamp) -> i64 {
    i64::try_from(value.as_secs()).unwrap_or(i64::MAX)
}

fn member_from_row(row: &SqliteRow) -> StoreResult<VotingMember> {
    Ok(VotingMember {
        id: MemberId(row.try_get("id")?),
        name: row.try_get("name")?,
        position: row.try_get("position")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
        created_at: ts(row.try_get("created_at")?),
    })
}

fn application_from_row(row: &SqliteRow) -> StoreResult<GrantApplication> {
    let grant_type: String = row.try_get("grant_type")?;
    Ok(GrantApplication {
        id: ApplicationId(row.try_get("id")?),
        reference_code: row.try_get("reference_code")?,
        submitter_name: row.try_get("submitter_name")?,
        candidate_full_name: row.try_get("candidate_full_name")?,
        grant_type: grant_type
            .parse()
            .map_err(|e: ParseError| StoreError::Corrupt(e.to_string()))?,
        date: row.try_get("event_date")?,
        place: row.try_get("place")?,
        amount_requested: row.try_get("amount_requested")?,
        currency: row.try_get("currency")?,
        description: row.try_get("description")?,
        voting_deadline: ts(row.try_get("voting_deadline")?),
        is_active: row.try_get("is_active")?,
        created_at: ts(row.try_get("created_at")?),
    })
}

fn token_from_row(row: &SqliteRow) -> StoreResult<VoteToken> {
    let value: String = row.try_get("vote_value")?;
    let reason: Option<String> = row.try_get("rejection_reason")?;
    let cast_at: Option<i64> = row.try_get("cast_at")?;
    let state =
        VoteState::from_columns(&value, reason, cast_at.map(ts)).map_err(StoreError::Corrupt)?;

    Ok(VoteToken {
        token: VotingToken::new(row.try_get::<String, _>("token")?),
        application_id: ApplicationId(row.try_get("application_id")?),
        member_id: MemberId(row.try_get("member_id")?),
        state,
        issued_at: ts(row.try_get("issued_at")?),
    })
}

fn comment_from_row(row: &SqliteRow) -> StoreResult<Comment> {
    let stance: String = row.try_get("stance")?;
    let parent: Option<i64> = row.try_get("parent_comment_id")?;
    Ok(Comment {
        id: CommentId(row.try_get("id")?),
        application_id: ApplicationId(row.try_get("application_id")?),
        member_id: MemberId(row.try_get("member_id")?),
        parent_id: parent.map(CommentId),
        content: row.try_get("content")?,
        stance: stance
            .parse()
            .map_err(|e: ParseError| StoreError::Corrupt(e.to_string()))?,
        created_at: ts(row.try_get("created_at")?),
    })
}

const MEMBER_COLUMNS: &str = "id, name, position, email, is_active, created_at";
const APPLICATION_COLUMNS: &str = "id, reference_code, submitter_name, candidate_full_name, \
     grant_type, event_date, place, amount_requested, currency, description, \
     voting_deadline, is_active, created_at";
const TOKEN_COLUMNS: &str =
    "token, application_id, member_id, vote_value, rejection_reason, cast_at, issued_at";
const COMMENT_COLUMNS: &str =
    "id, application_id, member_id, parent_comment_id, content, stance, created_at";

#[async_trait]
impl VotingStore for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_member(
        &self,
        member: &NewMember,
        created_at: Timestamp,
    ) -> StoreResult<VotingMember> {
        let id = sqlx::query(
            "INSERT INTO voting_members (name, position, email, is_active, created_at) \
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&member.name)
        .bind(&member.position)
        .bind(&member.email)
        .bind(secs(created_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(VotingMember {
            id: MemberId(id),
            name: member.name.clone(),
            position: member.position.clone(),
            email: member.email.clone(),
            is_active: true,
            created_at,
        })
    }

    async fn update_member(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StoreResult<Option<VotingMember>> {
        let changed = sqlx::query(
            "UPDATE voting_members SET \
               name = COALESCE(?, name), \
               position = COALESCE(?, position), \
               email = COALESCE(?, email), \
               is_active = COALESCE(?, is_active) \
             WHERE id = ?",
        )
        .bind(update.name.as_deref())
        .bind(update.position.as_deref())
        .bind(update.email.as_deref())
        .bind(update.is_active)
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if changed == 0 {
            return Ok(None);
        }
        self.get_member(id).await
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<VotingMember>> {
        let sql = format!("SELECT {} FROM voting_members WHERE id = ?", MEMBER_COLUMNS);
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(member_from_row)
            .transpose()
    }

    async fn list_members(&self) -> StoreResult<Vec<VotingMember>> {
        let sql = format!("SELECT {} FROM voting_members ORDER BY id", MEMBER_COLUMNS);
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(member_from_row)
            .collect()
    }

    async fn active_members(&self) -> StoreResult<Vec<VotingMember>> {
        let sql = format!(
            "SELECT {} FROM voting_members WHERE is_active = 1 ORDER BY id",
            MEMBER_COLUMNS
        );
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(member_from_row)
            .collect()
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
        reference_code: &str,
        grants: &[TokenGrant],
        created_at: Timestamp,
    ) -> StoreResult<(GrantApplication, Vec<VoteToken>)> {
        // Dropping the transaction on any error rolls every row back
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO grant_applications (reference_code, submitter_name, \
               candidate_full_name, grant_type, event_date, place, amount_requested, \
               currency, description, voting_deadline, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(reference_code)
        .bind(&application.submitter_name)
        .bind(&application.candidate_full_name)
        .bind(application.grant_type.code())
        .bind(&application.date)
        .bind(&application.place)
        .bind(application.amount_requested)
        .bind(&application.currency)
        .bind(&application.description)
        .bind(secs(application.voting_deadline))
        .bind(secs(created_at))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let application_id = ApplicationId(id);

        let mut tokens = Vec::with_capacity(grants.len());
        for grant in grants {
            sqlx::query(
                "INSERT INTO vote_tokens (token, application_id, member_id, vote_value, issued_at) \
                 VALUES (?, ?, ?, 'unvoted', ?)",
            )
            .bind(grant.token.as_str())
            .bind(application_id.0)
            .bind(grant.member_id.0)
            .bind(secs(created_at))
            .execute(&mut *tx)
            .await?;

            tokens.push(VoteToken {
                token: grant.token.clone(),
                application_id,
                member_id: grant.member_id,
                state: VoteState::Unvoted,
                issued_at: created_at,
            });
        }

        tx.commit().await?;

        let record = GrantApplication {
            id: application_id,
            reference_code: reference_code.to_string(),
            submitter_name: application.submitter_name.clone(),
            candidate_full_name: application.candidate_full_name.clone(),
            grant_type: application.grant_type,
            date: application.date.clone(),
            place: application.place.clone(),
            amount_requested: application.amount_requested,
            currency: application.currency.clone(),
            description: application.description.clone(),
            voting_deadline: application.voting_deadline,
            is_active: true,
            created_at,
        };
        Ok((record, tokens))
    }

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<GrantApplication>> {
        let sql = format!(
            "SELECT {} FROM grant_applications WHERE id = ?",
            APPLICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(application_from_row)
            .transpose()
    }

    async fn get_application_by_reference(
        &self,
        reference_code: &str,
    ) -> StoreResult<Option<GrantApplication>> {
        let sql = format!(
            "SELECT {} FROM grant_applications WHERE reference_code = ?",
            APPLICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(reference_code)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(application_from_row)
            .transpose()
    }

    async fn list_applications(&self) -> StoreResult<Vec<GrantApplication>> {
        let sql = format!(
            "SELECT {} FROM grant_applications ORDER BY created_at DESC, id DESC",
            APPLICATION_COLUMNS
        );
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(application_from_row)
            .collect()
    }

    async fn set_application_active(&self, id: ApplicationId, active: bool) -> StoreResult<bool> {
        let changed = sqlx::query("UPDATE grant_applications SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed == 1)
    }

    async fn get_token(&self, token: &VotingToken) -> StoreResult<Option<VoteToken>> {
        let sql = format!("SELECT {} FROM vote_tokens WHERE token = ?", TOKEN_COLUMNS);
        sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(token_from_row)
            .transpose()
    }

    async fn tokens_for_application(&self, id: ApplicationId) -> StoreResult<Vec<VoteToken>> {
        let sql = format!(
            "SELECT {} FROM vote_tokens WHERE application_id = ? ORDER BY id",
            TOKEN_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(token_from_row)
            .collect()
    }

    async fn record_vote(&self, token: &VotingToken, state: &VoteState) -> StoreResult<bool> {
        let changed = sqlx::query(
            "UPDATE vote_tokens SET vote_value = ?, rejection_reason = ?, cast_at = ? \
             WHERE token = ? AND vote_value = 'unvoted'",
        )
        .bind(state.value().as_str())
        .bind(state.rejection_reason())
        .bind(state.cast_at().map(secs))
        .bind(token.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(changed == 1)
    }

    async fn append_comment(
        &self,
        comment: &NewComment,
        created_at: Timestamp,
    ) -> StoreResult<Comment> {
        let id = sqlx::query(
            "INSERT INTO comments (application_id, member_id, parent_comment_id, content, \
               stance, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.application_id.0)
        .bind(comment.member_id.0)
        .bind(comment.parent_id.map(|p| p.0))
        .bind(&comment.content)
        .bind(comment.stance.as_str())
        .bind(secs(created_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Comment {
            id: CommentId(id),
            application_id: comment.application_id,
            member_id: comment.member_id,
            parent_id: comment.parent_id,
            content: comment.content.clone(),
            stance: comment.stance,
            created_at,
        })
    }

    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(comment_from_row)
            .transpose()
    }

    async fn comments_for_application(&self, id: ApplicationId) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE application_id = ? ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(comment_from_row)
            .collect()
    }
}
