//! 用户表操作

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_user, user_to_active_model};
use super::retry;
use crate::errors::{Result, SkafolioError};
use crate::storage::models::User;

use migration::entities::user;

impl SeaOrmStorage {
    /// 新建用户，邮箱重复返回 Conflict
    pub async fn insert_user(&self, u: &User) -> Result<()> {
        user::Entity::insert(user_to_active_model(u))
            .exec(&self.db)
            .await
            .map_err(|e| {
                super::map_write_error(e, "An account with this email already exists")
            })?;

        info!("User created: {}", u.id);
        Ok(())
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_user({})", id), self.retry_config, || {
            user::Entity::find_by_id(id.to_string()).one(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询用户失败: {}", e)))?;

        model.map(model_to_user).transpose()
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_email", self.retry_config, || {
            user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询用户失败: {}", e)))?;

        model.map(model_to_user).transpose()
    }
}
