use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    entities::user::User,
    errors::AppError,
    repositories::{memory_repo::MemoryUserRepo, sqlx_repo::SqlxUserRepo},
};

/// Outcome of tracking an image name on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Added,
    AlreadyPresent,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    async fn create_user(&self, user: &User) -> Result<(), AppError>;
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn get_all_users(&self) -> Result<Vec<User>, AppError>;
    async fn update_user(&self, user: &User) -> Result<(), AppError>;
    async fn delete_user(&self, id: &str) -> Result<(), AppError>;
    /// Appends `file_name` unless present; fails when the list already holds `limit` names.
    async fn add_image(&self, id: &str, file_name: &str, limit: usize) -> Result<ImageSlot, AppError>;
    /// Returns whether the name was tracked.
    async fn remove_image(&self, id: &str, file_name: &str) -> Result<bool, AppError>;
}

fn image_limit_error(limit: usize) -> AppError {
    AppError::invalid("images", format!("A user may hold at most {limit} images"))
}

fn user_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

impl SqlxUserRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxUserRepo { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AppError::dependency("users.check_connection", e))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, images) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(&user.images)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("User {} already exists", user.id)),
            AppError::Dependency { message, .. } => AppError::Dependency { operation: "users.create", message },
            other => other,
        })?;

        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT id, name, email, role, images FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::dependency("users.get", e))
    }

    async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT id, name, email, role, images FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::dependency("users.get_all", e))
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, role = $4, images = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(&user.images)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("users.update", e))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(&user.id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::dependency("users.delete", e))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    async fn add_image(&self, id: &str, file_name: &str, limit: usize) -> Result<ImageSlot, AppError> {
        let mut tx = self.pool
            .begin()
            .await
            .map_err(|e| AppError::dependency("users.add_image", e))?;

        let images: Option<Vec<String>> = sqlx::query_scalar("SELECT images FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::dependency("users.add_image", e))?;

        let mut images = images.ok_or_else(|| user_not_found(id))?;
        if images.iter().any(|name| name == file_name) {
            return Ok(ImageSlot::AlreadyPresent);
        }
        if images.len() >= limit {
            return Err(image_limit_error(limit));
        }
        images.push(file_name.to_string());

        sqlx::query("UPDATE users SET images = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(&images)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::dependency("users.add_image", e))?;

        tx.commit().await.map_err(|e| AppError::dependency("users.add_image", e))?;
        Ok(ImageSlot::Added)
    }

    async fn remove_image(&self, id: &str, file_name: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET images = array_remove(images, $2), updated_at = NOW() WHERE id = $1 AND $2 = ANY(images)",
        )
        .bind(id)
        .bind(file_name)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("users.remove_image", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.get_user(id).await? {
            Some(_) => Ok(false),
            None => Err(user_not_found(id)),
        }
    }
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AppError::Conflict(format!("User {} already exists", user.id)))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(user_not_found(&user.id)),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| user_not_found(id))
    }

    async fn add_image(&self, id: &str, file_name: &str, limit: usize) -> Result<ImageSlot, AppError> {
        let mut user = self.users.get_mut(id).ok_or_else(|| user_not_found(id))?;
        if user.has_image(file_name) {
            return Ok(ImageSlot::AlreadyPresent);
        }
        if user.images.len() >= limit {
            return Err(image_limit_error(limit));
        }
        user.images.push(file_name.to_string());
        Ok(ImageSlot::Added)
    }

    async fn remove_image(&self, id: &str, file_name: &str) -> Result<bool, AppError> {
        let mut user = self.users.get_mut(id).ok_or_else(|| user_not_found(id))?;
        let before = user.images.len();
        user.images.retain(|name| name != file_name);
        Ok(user.images.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_twice_conflicts() {
        let repo = MemoryUserRepo::new();
        let user = User::new("u1", "Ada", "ada@example.com", "user");

        repo.create_user(&user).await.unwrap();
        let err = repo.create_user(&user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn add_image_honours_the_limit() {
        let repo = MemoryUserRepo::new();
        repo.create_user(&User::new("u1", "Ada", "ada@example.com", "user")).await.unwrap();

        for name in ["a.png", "b.png", "c.png"] {
            assert_eq!(repo.add_image("u1", name, 3).await.unwrap(), ImageSlot::Added);
        }
        assert_eq!(repo.add_image("u1", "b.png", 3).await.unwrap(), ImageSlot::AlreadyPresent);
        assert!(matches!(
            repo.add_image("u1", "d.png", 3).await.unwrap_err(),
            AppError::InvalidArgument(_)
        ));

        let user = repo.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.images, vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let repo = MemoryUserRepo::new();
        assert!(matches!(repo.delete_user("ghost").await.unwrap_err(), AppError::NotFound(_)));
    }
}
