use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use smartchef_core::detect::{Detection, DEFAULT_MIN_CONFIDENCE};
use smartchef_core::nutrition::NutritionSummary;
use smartchef_core::persist::{load_corpus, load_index, save_index, IndexPaths};
use smartchef_core::store::{InteractionStore, ShoppingListStore, SledStore};
use smartchef_core::{
    consolidate_with_multipliers, Category, ConsolidatedItem, EngineConfig, Interaction, InteractionRanker, Recipe,
    ScoredRecipe, SearchEngine, SearchFilters, ShoppingList,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

pub const MAX_LIMIT: usize = 100;

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    pub engine: Arc<SearchEngine>,
    pub store: Arc<SledStore>,
    pub admin_token: Option<String>,
    /// Serializes index rebuilds so two of them never write the index directory at once.
    pub rebuild_lock: Arc<Mutex<()>>,
}

pub fn build_app(index_dir: String, store: SledStore, config: EngineConfig) -> Result<Router> {
    let snapshot = load_index(&IndexPaths::new(&index_dir))?;
    tracing::info!(num_docs = snapshot.len(), num_terms = snapshot.num_terms(), index_dir, "loaded index");
    let state = AppState {
        index_paths_root: PathBuf::from(&index_dir),
        engine: Arc::new(SearchEngine::from_snapshot(config, snapshot)),
        store: Arc::new(store),
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
        rebuild_lock: Arc::new(Mutex::new(())),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Ok(router(state).layer(cors).layer(TraceLayer::new_for_http()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/recipes/search", post(search_handler))
        .route("/recipes/by-ingredients", post(by_ingredients_handler))
        .route("/recipes/by-detections", post(by_detections_handler))
        .route("/recipes/:recipe_id", get(recipe_handler))
        .route("/users/:user_id/interactions", post(record_interaction))
        .route("/users/:user_id/recommendations", get(recommendations_handler))
        .route("/shopping-lists", post(create_shopping_list))
        .route("/users/:user_id/shopping-lists", get(user_shopping_lists))
        .route("/shopping-lists/:list_id", get(get_shopping_list).delete(delete_shopping_list))
        .route("/shopping-lists/:list_id/toggle", post(toggle_item))
        .route("/index/rebuild", post(rebuild_index))
        .with_state(state)
}

fn default_limit() -> usize { 15 }
fn default_recommendation_limit() -> usize { 10 }
fn default_min_confidence() -> f32 { DEFAULT_MIN_CONFIDENCE }

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Deserialize)]
pub struct IngredientsRequest {
    pub ingredients: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Deserialize)]
pub struct DetectionsRequest {
    pub detections: Vec<Detection>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub hit: ScoredRecipe,
    pub nutrition_info: NutritionSummary,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub took_s: f64,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct DetectionSearchResponse {
    pub detected_ingredients: Vec<String>,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

fn bad_request(msg: impl ToString) -> ApiError { (StatusCode::BAD_REQUEST, msg.to_string()) }

fn not_found(msg: impl ToString) -> ApiError { (StatusCode::NOT_FOUND, msg.to_string()) }

fn internal(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn check_limit(limit: usize) -> Result<(), ApiError> {
    if limit > MAX_LIMIT {
        return Err(bad_request(format!("limit must be at most {MAX_LIMIT}")));
    }
    Ok(())
}

fn with_nutrition(hits: Vec<ScoredRecipe>) -> Vec<SearchHit> {
    hits.into_iter()
        .map(|hit| {
            let nutrition_info = NutritionSummary::for_recipe(&hit.recipe);
            SearchHit { hit, nutrition_info }
        })
        .collect()
}

pub async fn search_handler(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    if req.query.trim().is_empty() {
        return Err(bad_request("query is required"));
    }
    check_limit(req.limit)?;
    let hits = state.engine.search(&req.query, req.limit, Some(&req.filters)).map_err(bad_request)?;
    let results = with_nutrition(hits);
    Ok(Json(SearchResponse { took_s: start.elapsed().as_secs_f64(), count: results.len(), results }))
}

pub async fn by_ingredients_handler(State(state): State<AppState>, Json(req): Json<IngredientsRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let ingredients: Vec<&str> = req.ingredients.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if ingredients.is_empty() {
        return Err(bad_request("ingredients list is required"));
    }
    check_limit(req.limit)?;
    let hits = state.engine.search_by_ingredients(&ingredients, req.limit).map_err(bad_request)?;
    let results = with_nutrition(hits);
    Ok(Json(SearchResponse { took_s: start.elapsed().as_secs_f64(), count: results.len(), results }))
}

pub async fn by_detections_handler(State(state): State<AppState>, Json(req): Json<DetectionsRequest>) -> Result<Json<DetectionSearchResponse>, ApiError> {
    check_limit(req.limit)?;
    let (detected_ingredients, hits) = state
        .engine
        .search_by_detections(&req.detections, req.min_confidence, req.limit)
        .map_err(bad_request)?;
    if detected_ingredients.is_empty() {
        return Err(bad_request("no ingredients detected above the confidence threshold"));
    }
    let results = with_nutrition(hits);
    Ok(Json(DetectionSearchResponse { detected_ingredients, count: results.len(), results }))
}

#[derive(Serialize)]
pub struct RecipeResponse {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub nutrition_info: NutritionSummary,
}

pub async fn recipe_handler(State(state): State<AppState>, Path(recipe_id): Path<String>) -> Result<Json<RecipeResponse>, ApiError> {
    let recipe = state.engine.get(&recipe_id).ok_or_else(|| not_found("recipe not found"))?;
    let nutrition_info = NutritionSummary::for_recipe(&recipe);
    Ok(Json(RecipeResponse { recipe, nutrition_info }))
}

#[derive(Deserialize)]
pub struct InteractionRequest {
    pub recipe_id: String,
    pub rating: i32,
}

pub async fn record_interaction(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<InteractionRequest>,
) -> Result<(StatusCode, Json<Interaction>), ApiError> {
    if !(1..=5).contains(&req.rating) {
        return Err(bad_request("rating must be between 1 and 5"));
    }
    if state.engine.get(&req.recipe_id).is_none() {
        return Err(not_found("recipe not found"));
    }
    let interaction = Interaction {
        user_id,
        recipe_id: req.recipe_id,
        rating: req.rating,
        timestamp: time::OffsetDateTime::now_utc(),
    };
    state.store.record(&interaction).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

#[derive(Deserialize)]
pub struct RecommendationParams {
    #[serde(default = "default_recommendation_limit")]
    pub limit: usize,
}

#[derive(Serialize)]
pub struct RecommendationResponse {
    pub count: usize,
    pub recommendations: Vec<Recipe>,
}

pub async fn recommendations_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    check_limit(params.limit)?;
    let history = state.store.interactions_for(&user_id).map_err(internal)?;
    let recommendations = InteractionRanker::new(&state.engine)
        .recommend(&user_id, &history, params.limit)
        .map_err(bad_request)?;
    Ok(Json(RecommendationResponse { count: recommendations.len(), recommendations }))
}

#[derive(Deserialize)]
pub struct ShoppingListRequest {
    pub user_id: String,
    pub recipe_ids: Vec<String>,
    #[serde(default)]
    pub servings_multipliers: HashMap<String, f64>,
}

#[derive(Serialize)]
pub struct ShoppingListView {
    pub id: u64,
    pub user_id: Option<String>,
    pub items: Vec<ConsolidatedItem>,
    pub by_category: BTreeMap<Category, Vec<ConsolidatedItem>>,
    pub total_items: usize,
    pub recipes: Vec<String>,
}

impl ShoppingListView {
    fn new(id: u64, list: ShoppingList) -> Self {
        let by_category = list
            .by_category()
            .into_iter()
            .map(|(category, items)| (category, items.into_iter().cloned().collect()))
            .collect();
        let total_items = list.total_items();
        Self {
            id,
            user_id: list.user_id,
            total_items,
            items: list.items,
            by_category,
            recipes: list.recipe_ids,
        }
    }
}

pub async fn create_shopping_list(
    State(state): State<AppState>,
    Json(req): Json<ShoppingListRequest>,
) -> Result<(StatusCode, Json<ShoppingListView>), ApiError> {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(bad_request("user_id is required"));
    }
    let snapshot = state.engine.snapshot();
    let recipes: Vec<Recipe> = req.recipe_ids.iter().filter_map(|id| snapshot.get(id).cloned()).collect();
    if recipes.is_empty() {
        return Err(bad_request("no valid recipes provided"));
    }
    let mut list = consolidate_with_multipliers(&recipes, &req.servings_multipliers).map_err(bad_request)?;
    list.user_id = Some(user_id.to_string());
    let id = state.store.save_list(&list).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(ShoppingListView::new(id, list))))
}

pub async fn get_shopping_list(State(state): State<AppState>, Path(list_id): Path<u64>) -> Result<Json<ShoppingListView>, ApiError> {
    let list = state.store.get_list(list_id).map_err(internal)?.ok_or_else(|| not_found("shopping list not found"))?;
    Ok(Json(ShoppingListView::new(list_id, list)))
}

#[derive(Serialize)]
pub struct UserListsResponse {
    pub count: usize,
    pub lists: Vec<ShoppingListView>,
}

pub async fn user_shopping_lists(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Json<UserListsResponse>, ApiError> {
    let lists: Vec<ShoppingListView> = state
        .store
        .lists_for_user(&user_id)
        .map_err(internal)?
        .into_iter()
        .map(|(id, list)| ShoppingListView::new(id, list))
        .collect();
    Ok(Json(UserListsResponse { count: lists.len(), lists }))
}

pub async fn delete_shopping_list(State(state): State<AppState>, Path(list_id): Path<u64>) -> Result<StatusCode, ApiError> {
    if state.store.delete_list(list_id).map_err(internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("shopping list not found"))
    }
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub item_name: String,
}

pub async fn toggle_item(
    State(state): State<AppState>,
    Path(list_id): Path<u64>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ShoppingListView>, ApiError> {
    let mut list = state.store.get_list(list_id).map_err(internal)?.ok_or_else(|| not_found("shopping list not found"))?;
    if list.toggle(&req.item_name).is_none() {
        return Err(not_found("item not on this list"));
    }
    state.store.update_list(list_id, &list).map_err(internal)?;
    Ok(Json(ShoppingListView::new(list_id, list)))
}

// --- Admin endpoints ---
async fn rebuild_index(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let _guard = state.rebuild_lock.lock().await;
    let paths = IndexPaths::new(&state.index_paths_root);
    let corpus = load_corpus(&paths).map_err(internal)?;
    state.engine.rebuild(&corpus);
    let snapshot = state.engine.snapshot();
    save_index(&paths, &snapshot).map_err(internal)?;
    Ok(Json(serde_json::json!({ "num_docs": snapshot.len(), "num_terms": snapshot.num_terms() })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
