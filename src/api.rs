mod admin;
mod blog;
mod execute;
mod portfolio;
mod seo;
mod vitals;

use axum::{Router, ServiceExt, extract::Request};
use tower::Layer;
use tower_http::{services::ServeFile, trace::TraceLayer};
use tracing::instrument;

use crate::{gateway::Gateway, state::AppState};

/// 设置应用的路由。
///
/// `/api` 下聚合博客、作品集、后台、代码执行和指标接口；
/// 站点地图和 robots 挂在根路径；头像资源由 [`ServeFile`] 提供，
/// 供网关把图标路径改写到这里。
pub fn setup_route(app: AppState) -> Router {
    let profile_image = ServeFile::new(app.site().profile_image());

    Router::new()
        .nest(
            "/api",
            blog::setup_route()
                .merge(portfolio::setup_route())
                .merge(admin::setup_route())
                .merge(execute::setup_route())
                .merge(vitals::setup_route()),
        )
        .merge(seo::setup_route())
        .route_service("/assets/profile.jpg", profile_image)
        .with_state(app)
}

/// 启动 HTTP 服务。
///
/// 网关中间件必须包在整个路由外层，URI 改写才能影响路由匹配，
/// 因此这里用 [`ServiceExt::into_make_service`] 而不是 `Router` 自带的。
#[instrument(name = "http server", skip_all)]
pub async fn run_server(app: AppState, gateway: Gateway) {
    let router = add_middlewares(setup_route(app));
    let service =
        axum::middleware::from_fn_with_state(gateway, crate::gateway::rewrite).layer(router);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind TCP listener on 0.0.0.0:3000");

    tracing::info!("listening on :3000");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(service))
        .await
        .expect("Failed to start Axum server");
}

/// 为路由添加中间件，包括请求追踪和失败日志记录。
pub fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 空实现，关闭请求日志
            }),
    )
}
