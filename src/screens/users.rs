use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::context::AppContext;
use crate::models::{Role, RoleInput, User, UserInput, UserUpdate};
use crate::notice::{Notice, Operation};

use super::{delete_prompt, load, mutate, Confirm, DeleteOutcome};

const USERS: &str = "/api/users/";
const ROLES: &str = "/api/users/roles/";
const ME: &str = "/api/auth/me";

/// The backend caps user and role listings at this page size
pub const MAX_PAGE: u32 = 12;

pub struct UsersScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> UsersScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>, Notice> {
        let page = Page::new(page.skip, page.limit.min(MAX_PAGE));
        let query = Query::new().page(page);
        let key = CacheKey::with_query(EntityKind::Users, &query);
        load(self.ctx, key, USERS.to_string(), query).await
    }

    pub async fn detail(&self, selected: Option<i64>) -> Result<Option<User>, Notice> {
        let Some(id) = selected else {
            return Ok(None);
        };
        load(self.ctx, detail_key(id), format!("{}{}", USERS, id), Query::new())
            .await
            .map(Some)
    }

    pub async fn current(&self) -> Result<User, Notice> {
        load(self.ctx, EntityKind::CurrentUser.into(), ME.to_string(), Query::new()).await
    }

    pub async fn create(&self, input: &UserInput) -> Result<User, Notice> {
        let request = self.ctx.api().post::<_, User>(USERS, input);
        mutate(self.ctx, Operation::CreateUser, request, &[EntityKind::Users.into()]).await
    }

    /// Editing may touch the signed-in user, so the current-user view is refreshed as well
    pub async fn update(&self, id: i64, input: &UserUpdate) -> Result<User, Notice> {
        let path = format!("{}{}", USERS, id);
        let request = self.ctx.api().put::<_, User>(&path, input);
        mutate(
            self.ctx,
            Operation::UpdateUser,
            request,
            &[EntityKind::Users.into(), detail_key(id), EntityKind::CurrentUser.into()],
        )
        .await
    }

    pub async fn delete(&self, user: &User, confirm: &dyn Confirm) -> Result<DeleteOutcome<User>, Notice> {
        self.delete_by_id(user.id, &user.username, confirm).await
    }

    pub async fn delete_by_id(&self, id: i64, label: &str, confirm: &dyn Confirm) -> Result<DeleteOutcome<User>, Notice> {
        if !confirm.confirm(&delete_prompt(self.ctx.locale(), label)) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let path = format!("{}{}", USERS, id);
        let request = self.ctx.api().delete::<User>(&path);
        mutate(
            self.ctx,
            Operation::DeleteUser,
            request,
            &[EntityKind::Users.into(), detail_key(id)],
        )
        .await
        .map(DeleteOutcome::Deleted)
    }

    pub async fn roles(&self) -> Result<Vec<Role>, Notice> {
        let query = Query::new().page(Page::first(MAX_PAGE));
        let key = CacheKey::with_query(EntityKind::Roles, &query);
        load(self.ctx, key, ROLES.to_string(), query).await
    }

    pub async fn create_role(&self, input: &RoleInput) -> Result<Role, Notice> {
        let request = self.ctx.api().post::<_, Role>(ROLES, input);
        mutate(self.ctx, Operation::CreateRole, request, &[EntityKind::Roles.into()]).await
    }
}

fn detail_key(id: i64) -> CacheKey {
    CacheKey::new(EntityKind::UserDetails).param("id", id)
}
