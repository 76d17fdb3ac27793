use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{ExprTrait, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{category, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::category::*;
use crate::models::shared::validate_name;
use crate::state::AppState;
use crate::utils::category_tree::{Forest, TreeError, TreeNode};

#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategoryTree",
    summary = "List the full category tree",
    description = "Returns every category with its depth (1 for roots) and its path of ancestor names. Parents always precede their descendants and siblings follow their stored position. Categories whose parent no longer exists are listed as roots.",
    responses(
        (status = 200, description = "All categories in tree order", body = Vec<CategoryTreeItem>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryTreeItem>>, AppError> {
    let forest = load_forest(&state.db).await?;

    let items = forest
        .listing_order()
        .into_iter()
        .filter_map(|id| {
            let node = forest.get(id)?;
            Some(CategoryTreeItem {
                id,
                name: node.name.clone(),
                parent_id: node.parent_id,
                position: node.position,
                depth: forest.depth(id).ok()?,
                path: forest.path(id).ok()?,
            })
        })
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/children",
    tag = "Categories",
    operation_id = "listCategoryChildren",
    summary = "List direct children of a category",
    description = "Returns the direct children of `parent_id` (or the root categories when omitted), ordered by position then name, each with its own child count. `limit` defaults to 500 and is capped at 2000.",
    params(ChildrenQuery),
    responses(
        (status = 200, description = "Direct children", body = Vec<CategoryChildItem>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_children(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ChildrenQuery>,
) -> Result<Json<Vec<CategoryChildItem>>, AppError> {
    let children = category::Entity::find()
        .filter(parent_is(query.parent_id))
        .order_by_asc(category::Column::Position)
        .order_by_asc(category::Column::Name)
        .order_by_asc(category::Column::Id)
        .limit(Some(query.effective_limit()))
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = children.iter().map(|c| c.id).collect();
    let counts: HashMap<i32, u64> = if ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .select_only()
            .column(category::Column::ParentId)
            .column_as(category::Column::Id.count(), "child_count")
            .filter(category::Column::ParentId.is_in(ids))
            .group_by(category::Column::ParentId)
            .into_tuple::<(Option<i32>, i64)>()
            .all(&state.db)
            .await?
            .into_iter()
            .filter_map(|(parent, n)| Some((parent?, std::cmp::Ord::max(n, 0) as u64)))
            .collect()
    };

    let items = children
        .into_iter()
        .map(|c| CategoryChildItem {
            child_count: counts.get(&c.id).copied().unwrap_or(0),
            id: c.id,
            name: c.name,
            parent_id: c.parent_id,
            position: c.position,
        })
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a category",
    description = "Creates a category at the end of its sibling list. Requires the admin role. The parent, if given, must exist and sit above the maximum depth of 5. Names are globally unique.",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error or depth exceeded (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Parent not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    validate_create_category(&payload)?;

    let txn = state.db.begin().await?;
    let forest = load_forest_for_update(&txn).await?;
    forest.depth_for_new_child(payload.parent_id)?;

    let position = next_position(&txn, payload.parent_id, None).await?;
    let new_category = category::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        parent_id: Set(payload.parent_id),
        position: Set(position),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = match new_category.insert(&txn).await {
        Ok(m) => m,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Category name already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    info!(category_id = model.id, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Categories",
    operation_id = "renameCategory",
    summary = "Rename a category",
    description = "Changes the name only; parent, depth and position are untouched. Requires the admin role. Renaming to the current name is a no-op.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = RenameCategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn rename_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RenameCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_admin()?;
    validate_name(&payload.name)?;
    let name = payload.name.trim().to_string();

    let existing = find_category(&state.db, id).await?;
    if existing.name == name {
        return Ok(Json(existing.into()));
    }

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name);
    let model = match active.update(&state.db).await {
        Ok(m) => m,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Category name already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete a category",
    description = "Removes the category. Its direct children become roots and videos attached to it lose their category; nothing is cascade-deleted. Requires the admin role.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;

    let txn = state.db.begin().await?;
    find_category_for_update(&txn, id).await?;

    let detached = category::Entity::update_many()
        .col_expr(category::Column::ParentId, Expr::value(Option::<i32>::None))
        .filter(category::Column::ParentId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;
    let unlinked = video::Entity::update_many()
        .col_expr(video::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(video::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;
    category::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    info!(
        category_id = id,
        detached_children = detached,
        unlinked_videos = unlinked,
        "Category deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{id}/move",
    tag = "Categories",
    operation_id = "moveCategory",
    summary = "Move a category under a new parent",
    description = "Reparents the category together with its subtree and appends it to the new sibling list. `parent_id: null` promotes it to a root. Rejected if the target is the category itself or one of its descendants, or if the target depth plus the subtree height would exceed 5. Requires the admin role.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = MoveCategoryRequest,
    responses(
        (status = 200, description = "Category moved", body = CategoryResponse),
        (status = 400, description = "Cycle or depth exceeded (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category or target not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, parent_id = ?payload.parent_id))]
pub async fn move_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<MoveCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_admin()?;

    let txn = state.db.begin().await?;
    let forest = load_forest_for_update(&txn).await?;
    forest.check_move(id, payload.parent_id)?;

    let existing = find_category(&txn, id).await?;
    let position = next_position(&txn, payload.parent_id, Some(id)).await?;

    let mut active: category::ActiveModel = existing.into();
    active.parent_id = Set(payload.parent_id);
    active.position = Set(position);
    let model = active.update(&txn).await?;

    txn.commit().await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/{id}/reorder",
    tag = "Categories",
    operation_id = "reorderCategory",
    summary = "Change a category's position among its siblings",
    description = "With `before_id`, the category takes that sibling's position and every sibling at or after it shifts down by one. Without it, the category moves to the end. `before_id` must share the category's parent. Requires the admin role.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = ReorderCategoryRequest,
    responses(
        (status = 200, description = "Category repositioned", body = CategoryResponse),
        (status = 400, description = "Not a sibling (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn reorder_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReorderCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_admin()?;

    let txn = state.db.begin().await?;
    let existing = find_category_for_update(&txn, id).await?;
    let parent_id = existing.parent_id;

    let position = match payload.before() {
        Some(before_id) => {
            let before = find_category(&txn, before_id).await?;
            if before.id == id || before.parent_id != parent_id {
                return Err(AppError::Validation(
                    "before_id must be another category with the same parent".into(),
                ));
            }
            category::Entity::update_many()
                .col_expr(
                    category::Column::Position,
                    Expr::col(category::Column::Position).add(1),
                )
                .filter(parent_is(parent_id))
                .filter(category::Column::Id.ne(id))
                .filter(category::Column::Position.gte(before.position))
                .exec(&txn)
                .await?;
            before.position
        }
        None => next_position(&txn, parent_id, Some(id)).await?,
    };

    let mut active: category::ActiveModel = existing.into();
    active.position = Set(position);
    let model = active.update(&txn).await?;

    txn.commit().await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/counts",
    tag = "Categories",
    operation_id = "getCategoryCounts",
    summary = "Count what a category holds",
    description = "Direct children, all descendants (excluding the category itself) and directly attached videos. Used for delete confirmation prompts.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Counts", body = CategoryCountsResponse),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn category_counts(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryCountsResponse>, AppError> {
    let forest = load_forest(&state.db).await?;
    if forest.get(id).is_none() {
        return Err(TreeError::NotFound(id).into());
    }

    let child_count = category::Entity::find()
        .filter(category::Column::ParentId.eq(id))
        .count(&state.db)
        .await?;
    let video_count = video::Entity::find()
        .filter(video::Column::CategoryId.eq(id))
        .count(&state.db)
        .await?;

    Ok(Json(CategoryCountsResponse {
        child_count,
        descendant_count: forest.descendant_count(id) as u64,
        video_count,
    }))
}

fn parent_is(parent_id: Option<i32>) -> Condition {
    match parent_id {
        Some(p) => Condition::all().add(category::Column::ParentId.eq(p)),
        None => Condition::all().add(category::Column::ParentId.is_null()),
    }
}

async fn load_forest<C: ConnectionTrait>(db: &C) -> Result<Forest, AppError> {
    let rows = category::Entity::find().all(db).await?;
    Ok(Forest::new(rows.iter().map(TreeNode::from)))
}

/// Snapshot of the whole tree with every row locked until the transaction
/// ends, so concurrent structural edits are serialized.
async fn load_forest_for_update(txn: &DatabaseTransaction) -> Result<Forest, AppError> {
    let rows = category::Entity::find()
        .order_by_asc(category::Column::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?;
    Ok(Forest::new(rows.iter().map(TreeNode::from)))
}

async fn find_category<C: ConnectionTrait>(db: &C, id: i32) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

async fn find_category_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

/// Position one past the last sibling under `parent_id`, ignoring `exclude`.
async fn next_position<C: ConnectionTrait>(
    db: &C,
    parent_id: Option<i32>,
    exclude: Option<i32>,
) -> Result<i32, AppError> {
    let mut select = category::Entity::find().filter(parent_is(parent_id));
    if let Some(id) = exclude {
        select = select.filter(category::Column::Id.ne(id));
    }
    let max_pos: Option<i32> = select
        .select_only()
        .column_as(category::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_pos
        .unwrap_or(-1)
        .checked_add(1)
        .ok_or_else(|| AppError::Validation("Position overflow".into()))
}
