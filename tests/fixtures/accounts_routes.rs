// Account routes
use axum::routing::get;
use axum::Router;

pub fn router() -> Router {
    Router::new()
        .route(
            "/users",
            get(list_users).post(build_handler(
                create_user,
                with_tags(["users"]),
                with_bearer_auth(["users:write"]),
            )),
        )
        .route(
            "/users/:id",
            get(build_handler(get_user, with_tags(["users"])))
                .put(update_user)
                .delete(build_handler(delete_user, with_tags(["admin"]), with_basic_auth())),
        )
        .route("/legacy", get(legacy_handler))
}
