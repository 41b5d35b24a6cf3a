use crate::models::all_models::{NewUser, UserInDb, UserRow};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    /// A unique constraint was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return DbError::Conflict(db_err.message().to_string());
            }
        }
        DbError::Sqlx(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Persistence collaborator for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserInDb>>;

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserInDb>>;

    async fn list(&self, skip: usize, limit: usize) -> DbResult<Vec<UserInDb>>;

    async fn email_exists(&self, email: &str) -> DbResult<bool>;

    async fn username_exists(&self, username: &str) -> DbResult<bool>;

    async fn create(&self, user: NewUser) -> DbResult<UserInDb>;

    /// Inserts every user or none of them. Returns the number inserted.
    async fn create_bulk(&self, users: Vec<NewUser>) -> DbResult<usize>;

    /// Writes back every field of `user`. `None` when the id is unknown.
    async fn update(&self, user: &UserInDb) -> DbResult<Option<UserInDb>>;

    /// Removes the user with its name and login. Returns what was removed.
    async fn delete(&self, id: Uuid) -> DbResult<Option<UserInDb>>;
}

const SELECT_USER: &str = "
    SELECT u.id, u.dob, u.city, u.email, u.created_at,
           n.title, n.first_name, n.last_name,
           l.username, l.password, l.role
    FROM users u
    JOIN logins l ON l.uuid = u.id
    JOIN names n ON n.user_id = u.id";

fn into_user(row: UserRow) -> DbResult<UserInDb> {
    UserInDb::try_from(row).map_err(|e| DbError::Corrupt(e.to_string()))
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(tx: &mut Transaction<'_, Postgres>, user: &NewUser) -> DbResult<()> {
        sqlx::query("INSERT INTO users (id, dob, city, email) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(user.dob)
            .bind(&user.city)
            .bind(&user.email)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            "INSERT INTO names (user_id, title, first_name, last_name) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.name.title)
        .bind(&user.name.first_name)
        .bind(&user.name.last_name)
        .execute(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO logins (uuid, username, password, role) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.to_string())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserInDb>> {
        let query = format!("{} WHERE l.username = $1", SELECT_USER);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserInDb>> {
        let query = format!("{} WHERE u.id = $1", SELECT_USER);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_user).transpose()
    }

    async fn list(&self, skip: usize, limit: usize) -> DbResult<Vec<UserInDb>> {
        let query = format!(
            "{} ORDER BY u.created_at, u.id OFFSET $1 LIMIT $2",
            SELECT_USER
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(into_user).collect()
    }

    async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM logins WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> DbResult<UserInDb> {
        let mut tx = self.pool.begin().await?;
        Self::insert(&mut tx, &user).await?;
        tx.commit().await?;

        self.find_by_id(user.id)
            .await?
            .ok_or_else(|| DbError::Corrupt(format!("user {} vanished after insert", user.id)))
    }

    async fn create_bulk(&self, users: Vec<NewUser>) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        for user in &users {
            Self::insert(&mut tx, user).await?;
        }
        tx.commit().await?;
        Ok(users.len())
    }

    async fn update(&self, user: &UserInDb) -> DbResult<Option<UserInDb>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET dob = $1, city = $2, email = $3 WHERE id = $4")
            .bind(user.dob)
            .bind(&user.city)
            .bind(&user.email)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE names SET title = $1, first_name = $2, last_name = $3 WHERE user_id = $4",
        )
        .bind(&user.name.title)
        .bind(&user.name.first_name)
        .bind(&user.name.last_name)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE logins SET username = $1, password = $2, role = $3 WHERE uuid = $4")
            .bind(&user.login.username)
            .bind(&user.login.password)
            .bind(user.login.role.to_string())
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.find_by_id(user.id).await
    }

    async fn delete(&self, id: Uuid) -> DbResult<Option<UserInDb>> {
        let existing = match self.find_by_id(id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        // names and logins go with it through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok((deleted.rows_affected() > 0).then_some(existing))
    }
}
