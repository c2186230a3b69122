//! Catalogue and product administration handlers.
//!
//! ```text
//! GET    /api/v1/products?search=&category=&page=
//! GET    /api/v1/products/categories
//! GET    /api/v1/products/stats
//! GET    /api/v1/products/{id}
//! POST   /api/v1/products
//! PUT    /api/v1/products/{id}
//! DELETE /api/v1/products/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use uuid::Uuid;

use crate::domain::{
    CatalogueQuery, CatalogueStats, Error, Product, ProductDraft, ProductId, ProductPage,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::CurrentUser;
use crate::inbound::http::state::HttpState;

/// Search and page through the catalogue.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(CatalogueQuery),
    responses(
        (status = 200, description = "Page of products", body = ProductPage),
        (status = 401, description = "Sign in required", body = Error),
        (status = 403, description = "Account awaiting approval", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["products"],
    operation_id = "listProducts"
)]
#[get("/products")]
pub async fn list_products(
    state: web::Data<HttpState>,
    user: CurrentUser,
    query: web::Query<CatalogueQuery>,
) -> ApiResult<web::Json<ProductPage>> {
    let page = state.catalogue.search(&user.actor, &query).await?;
    Ok(web::Json(page))
}

/// Distinct categories, sorted.
#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    responses(
        (status = 200, description = "Category names", body = [String]),
        (status = 401, description = "Sign in required", body = Error),
        (status = 403, description = "Account awaiting approval", body = Error)
    ),
    tags = ["products"],
    operation_id = "listCategories"
)]
#[get("/products/categories")]
pub async fn list_categories(
    state: web::Data<HttpState>,
    user: CurrentUser,
) -> ApiResult<web::Json<Vec<String>>> {
    Ok(web::Json(state.catalogue.categories(&user.actor).await?))
}

/// Dashboard totals.
#[utoipa::path(
    get,
    path = "/api/v1/products/stats",
    responses(
        (status = 200, description = "Catalogue totals", body = CatalogueStats),
        (status = 401, description = "Sign in required", body = Error),
        (status = 403, description = "Account awaiting approval", body = Error)
    ),
    tags = ["products"],
    operation_id = "catalogueStats"
)]
#[get("/products/stats")]
pub async fn catalogue_stats(
    state: web::Data<HttpState>,
    user: CurrentUser,
) -> ApiResult<web::Json<CatalogueStats>> {
    Ok(web::Json(state.catalogue.stats(&user.actor).await?))
}

/// Fetch one product.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found", body = Error)
    ),
    tags = ["products"],
    operation_id = "getProduct"
)]
#[get("/products/{id}")]
pub async fn get_product(
    state: web::Data<HttpState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Product>> {
    let id = ProductId::from_uuid(path.into_inner());
    Ok(web::Json(state.products.get(&user.actor, &id).await?))
}

/// Create a product. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductDraft,
    responses(
        (status = 201, description = "Created", body = Product),
        (status = 400, description = "Validation failed", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 409, description = "New code already in use", body = Error)
    ),
    tags = ["products"],
    operation_id = "createProduct"
)]
#[post("/products")]
pub async fn create_product(
    state: web::Data<HttpState>,
    user: CurrentUser,
    payload: web::Json<ProductDraft>,
) -> ApiResult<HttpResponse> {
    let product = state
        .products
        .create(&user.actor, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(product))
}

/// Replace a product's editable fields. Admin only.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product identifier")),
    request_body = ProductDraft,
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 400, description = "Validation failed", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Product not found", body = Error),
        (status = 409, description = "New code already in use", body = Error)
    ),
    tags = ["products"],
    operation_id = "updateProduct"
)]
#[put("/products/{id}")]
pub async fn update_product(
    state: web::Data<HttpState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<ProductDraft>,
) -> ApiResult<web::Json<Product>> {
    let id = ProductId::from_uuid(path.into_inner());
    let product = state
        .products
        .update(&user.actor, &id, payload.into_inner())
        .await?;
    Ok(web::Json(product))
}

/// Delete a product. Admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product identifier")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Product not found", body = Error)
    ),
    tags = ["products"],
    operation_id = "deleteProduct"
)]
#[delete("/products/{id}")]
pub async fn delete_product(
    state: web::Data<HttpState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = ProductId::from_uuid(path.into_inner());
    state.products.delete(&user.actor, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "products_tests.rs"]
mod tests;
