use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::features::libraries::{dtos as libraries_dtos, handlers as libraries_handlers};
use crate::features::products::{
    dtos as products_dtos, handlers as products_handlers, models as products_models,
};
use crate::features::taxonomy::{
    dtos as taxonomy_dtos, handlers as taxonomy_handlers, models as taxonomy_models,
};
use crate::features::users::{dtos as users_dtos, handlers::user_handler};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Users
        user_handler::get_current_user,
        // Taxonomy
        taxonomy_handlers::list_items,
        taxonomy_handlers::get_item,
        taxonomy_handlers::create_item,
        taxonomy_handlers::update_item,
        taxonomy_handlers::delete_item,
        // Products
        products_handlers::list_products,
        products_handlers::list_my_products,
        products_handlers::get_product,
        products_handlers::create_product,
        products_handlers::update_product,
        products_handlers::delete_product,
        products_handlers::change_status,
        // Libraries
        libraries_handlers::create_library,
        libraries_handlers::list_libraries,
        libraries_handlers::get_library,
        libraries_handlers::update_library,
        libraries_handlers::delete_library,
        libraries_handlers::add_product,
        libraries_handlers::remove_product,
        libraries_handlers::list_library_products,
        // Files
        files_handlers::upload_temp_image,
        files_handlers::upload_temp_model,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Users
            users_dtos::UserDto,
            ApiResponse<users_dtos::UserDto>,
            // Taxonomy
            taxonomy_models::TaxonomyKind,
            taxonomy_dtos::TaxonomyItemDto,
            taxonomy_dtos::UpsertTaxonomyItemDto,
            ApiResponse<taxonomy_dtos::TaxonomyItemDto>,
            ApiResponse<Vec<taxonomy_dtos::TaxonomyItemDto>>,
            // Products
            products_models::ProductStatus,
            products_dtos::CreateProductDto,
            products_dtos::UpdateProductDto,
            products_dtos::ChangeStatusDto,
            products_dtos::ProductDto,
            products_dtos::ProductSummaryDto,
            products_dtos::ProductDetailDto,
            ApiResponse<products_dtos::ProductDto>,
            ApiResponse<products_dtos::ProductDetailDto>,
            ApiResponse<Vec<products_dtos::ProductSummaryDto>>,
            // Libraries
            libraries_dtos::CreateLibraryDto,
            libraries_dtos::UpdateLibraryDto,
            libraries_dtos::AddProductDto,
            libraries_dtos::LibraryDto,
            ApiResponse<libraries_dtos::LibraryDto>,
            ApiResponse<Vec<libraries_dtos::LibraryDto>>,
            // Files
            files_dtos::TempUploadDto,
            files_dtos::TempUploadResponseDto,
            files_dtos::FileDto,
            ApiResponse<files_dtos::TempUploadResponseDto>,
        )
    ),
    tags(
        (name = "users", description = "The authenticated caller"),
        (name = "taxonomy", description = "Tags, categories, platforms, renders, materials and colors"),
        (name = "products", description = "3D asset catalog entries and their review workflow"),
        (name = "libraries", description = "Caller-owned product collections"),
        (name = "files", description = "Temporary uploads referenced when creating products"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Asset Catalog API",
        version = "0.1.0",
        description = "API documentation for the 3D asset catalog",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
