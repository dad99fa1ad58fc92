mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::auth;
use crate::features::files::workers::{
    MinioTransfer, PgFileLedger, RetryPolicy, SizeLimits, UploadWorker,
};
use crate::features::files::{
    routes as files_routes, FileIngestion, FileService, FilesState, UploadQueue,
};
use crate::features::libraries::{routes as libraries_routes, LibraryService};
use crate::features::products::{
    routes as products_routes, ProductCreationWorkflow, ProductService,
};
use crate::features::taxonomy::{routes as taxonomy_routes, TaxonomyService};
use crate::features::users::{routes as users_routes, UserService};
use crate::modules::catalog_store::PgCatalogStore;
use axum::extract::DefaultBodyLimit;
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.jwks_url,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized (issuer: {})", config.auth.issuer);

    // Object storage
    let minio_client = Arc::new(
        modules::storage::MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    tracing::info!("MinIO client initialized for bucket: {}", config.minio.bucket);

    // Upload worker; the queue's receiver lives as long as the worker task
    let (upload_queue, upload_receiver) = UploadQueue::channel();
    let upload_worker = Arc::new(UploadWorker::new(
        Arc::new(PgFileLedger::new(pool.clone())),
        Arc::new(MinioTransfer::new(Arc::clone(&minio_client))),
        RetryPolicy::from_config(&config.upload),
        SizeLimits::from_config(&config.upload),
        config.upload.worker_concurrency,
    ));
    tokio::spawn(upload_worker.run(upload_receiver, config.upload.sweep_interval));
    tracing::info!("Upload worker spawned");

    // Services
    let user_service = Arc::new(UserService::new(pool.clone()));
    let file_service = Arc::new(FileService::new(Arc::clone(&minio_client)));
    let taxonomy_service = Arc::new(TaxonomyService::new(pool.clone()));

    let catalog_store = PgCatalogStore::new(pool.clone());
    let creation_workflow = ProductCreationWorkflow::new(
        catalog_store.clone(),
        FileIngestion::new(
            config.upload.file_path.clone(),
            minio_client.staging_urls(),
            upload_queue,
        ),
    );
    let product_service = Arc::new(ProductService::new(
        catalog_store,
        creation_workflow,
        Arc::clone(&user_service),
        Arc::clone(&file_service),
    ));
    let library_service = Arc::new(LibraryService::new(
        pool.clone(),
        Arc::clone(&user_service),
        Arc::clone(&product_service),
    ));
    tracing::info!("Services initialized");

    // Swagger
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // JSON routes share the global body limit; upload routes carry their own
    let json_routes = Router::new()
        .merge(users_routes(Arc::clone(&user_service)))
        .merge(taxonomy_routes(taxonomy_service))
        .merge(products_routes(product_service))
        .merge(libraries_routes(library_service))
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size));

    let upload_routes = files_routes(FilesState {
        service: file_service,
        max_image_size: config.upload.max_image_size,
        max_model_size: config.upload.max_model_size,
    });

    // A bearer token is validated when present; handlers decide whether a caller is required
    let api_routes = Router::new()
        .merge(json_routes)
        .merge(upload_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator,
            middleware::auth_middleware,
        ));

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(api_routes)
        .merge(health_route)
        .layer(
            ServiceBuilder::new()
                // Generate X-Request-Id using UUID v7 (or use client-provided one)
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors_layer(
                    config.app.cors_allowed_origins.clone(),
                )),
        );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
