use crate::{
    api::{attendance, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiters. Built once at startup and shared by every worker so the
/// quotas are process-wide.
#[derive(Clone)]
pub struct RateLimiters {
    login: Arc<Limiter>,
    register: Arc<Limiter>,
    protected: Arc<Limiter>,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Limiter {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

impl RateLimiters {
    pub fn new(config: &Config) -> Self {
        Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)),
            register: Arc::new(build_limiter(config.rate_register_per_min)),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    cfg.service(
        web::scope(&config.api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(limiters.login.clone())
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/register")
                            .wrap(limiters.register.clone())
                            .route(web::post().to(handlers::register)),
                    ),
            )
            // Protected routes
            .service(
                web::scope("/attendance")
                    .wrap(from_fn(auth_middleware)) // authentication
                    .wrap(limiters.protected.clone()) // rate limiting
                    .service(web::resource("/clock").route(web::post().to(attendance::clock)))
                    .service(
                        web::resource("/today").route(web::get().to(attendance::today_attendance)),
                    )
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/date/{date}").route(web::get().to(attendance::by_date)),
                    )
                    .service(web::resource("/export").route(web::get().to(attendance::export))),
            )
            .service(
                web::scope("/user")
                    .wrap(from_fn(auth_middleware))
                    .wrap(limiters.protected.clone())
                    // /user/profile
                    .service(
                        web::resource("/profile")
                            .route(web::get().to(user::get_profile))
                            .route(web::put().to(user::update_profile)),
                    )
                    .service(
                        web::resource("/password").route(web::put().to(user::change_password)),
                    )
                    .service(web::resource("/stats").route(web::get().to(user::stats))),
            ),
    );
}
