use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/videos", video_routes(config))
        .nest("/categories", category_routes())
        .nest("/livestreams", live_stream_routes())
        .nest("/admin", admin_routes())
}

fn video_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(handlers::video::list_videos))
        .routes(routes!(handlers::video::list_my_videos))
        .routes(routes!(
            handlers::video::get_video,
            handlers::video::update_video,
            handlers::video::delete_video
        ))
        .routes(routes!(handlers::content::stream_video))
        .routes(routes!(handlers::content::get_thumbnail))
        .merge(engagement_routes())
        .merge(comment_routes());

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::video::upload_video))
        .layer(handlers::video::upload_body_limit(
            config.server.max_upload_size,
        ));

    crud.merge(upload)
}

fn engagement_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::engagement::like_video,
            handlers::engagement::unlike_video
        ))
        .routes(routes!(
            handlers::engagement::dislike_video,
            handlers::engagement::undislike_video
        ))
        .routes(routes!(
            handlers::engagement::get_engagement,
            handlers::engagement::rate_video,
            handlers::engagement::remove_rating
        ))
}

fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::comment::list_comments,
            handlers::comment::create_comment
        ))
        .routes(routes!(handlers::comment::delete_comment))
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::category::list_tree,
            handlers::category::create_category
        ))
        .routes(routes!(handlers::category::list_children))
        .routes(routes!(
            handlers::category::rename_category,
            handlers::category::delete_category
        ))
        .routes(routes!(handlers::category::move_category))
        .routes(routes!(handlers::category::reorder_category))
        .routes(routes!(handlers::category::category_counts))
}

fn live_stream_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::livestream::list_live_streams,
            handlers::livestream::create_live_stream
        ))
        .routes(routes!(handlers::livestream::list_my_live_streams))
        .routes(routes!(
            handlers::livestream::get_live_stream,
            handlers::livestream::update_live_stream,
            handlers::livestream::delete_live_stream
        ))
        .routes(routes!(handlers::livestream::set_live_stream_status))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::list_moderation_queue))
        .routes(routes!(handlers::admin::moderate_video))
}
