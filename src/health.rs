use std::time::Instant;

use actix_web::{HttpResponse, Responder, get, web};
use chrono::Utc;
use serde_json::json;

/// Process start, shared with the health handler.
#[derive(Clone, Copy)]
pub struct StartedAt(pub Instant);

#[get("/health")]
pub async fn health(started: web::Data<StartedAt>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "uptimeSecs": started.0.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;

    #[actix_web::test]
    async fn reports_ok() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(StartedAt(Instant::now())))
                .service(health),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "OK");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptimeSecs"].as_u64().is_some());
    }
}
