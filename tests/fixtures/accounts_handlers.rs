// Account handlers
use crate::models::*;

/// Fetch a single user
pub async fn get_user(ctx: &RequestContext, req: GetUserRequest) -> Result<Json<User>, ApiError> {
    ctx.users().get(req.id).await
}

/// List users of a tenant
pub async fn list_users(ctx: &RequestContext, req: ListUsersRequest) -> Result<Vec<User>, ApiError> {
    ctx.users().list(req.limit).await
}

pub async fn create_user(ctx: &RequestContext, req: CreateUserRequest) -> Result<User, ApiError> {
    ctx.users().create(req).await
}

pub async fn update_user(ctx: &RequestContext, req: UpdateUserRequest) -> Result<User, ApiError> {
    ctx.users().update(req).await
}

pub async fn delete_user(ctx: &RequestContext, req: GetUserRequest) -> Result<(), ApiError> {
    ctx.users().delete(req.id).await
}

// Not a handler: no context parameter
pub fn helper(req: GetUserRequest) -> Result<User, ApiError> {
    unimplemented!()
}
