use actix_web::HttpResponse;

/// Endpoint used by clients and load balancers to know if the server is working
#[tracing::instrument(name = "Health Check handler")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
