use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use serde_json::json;
use std::future::{ready, Ready};

use crate::services::auth_service::verify_token;
use crate::state::AppState;

/// Bearer token check. Verified claims are stored in the request extensions.
///
/// In optional mode a missing or invalid token lets the request through
/// anonymously and the handler decides.
#[derive(Clone, Copy)]
pub struct AuthMiddleware {
    optional: bool,
}

impl AuthMiddleware {
    pub fn required() -> Self {
        Self { optional: false }
    }

    pub fn optional() -> Self {
        Self { optional: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            optional: self.optional,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    optional: bool,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    from_header
        .or_else(|| req.cookie("accessToken").map(|c| c.value().to_string()))
        .filter(|token| !token.is_empty())
}

fn unauthorized(message: &str) -> Error {
    InternalError::from_response(
        message.to_string(),
        HttpResponse::Unauthorized().json(json!({ "success": false, "error": message })),
    )
    .into()
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = match (bearer_token(&req), req.app_data::<web::Data<AppState>>()) {
            (Some(token), Some(state)) => verify_token(&state.config.jwt, &token),
            (Some(_), None) => Err("Authentication is not configured".to_string()),
            (None, _) => Err("Missing authorization token".to_string()),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(reason) if self.optional => {
                log::debug!("🔓 Continuing without identity on {}: {}", req.path(), reason);
            }
            Err(reason) => {
                log::warn!("🔒 Rejected request to {}: {}", req.path(), reason);
                return Box::pin(async move { Err(unauthorized(&reason)) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::{issue_token, Claims};
    use crate::state::testing::test_state;
    use actix_web::{http::StatusCode, test, App};

    async fn whoami(claims: Option<web::ReqData<Claims>>) -> HttpResponse {
        match claims {
            Some(c) => HttpResponse::Ok().body(c.sub.clone()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    #[actix_web::test]
    async fn test_required_and_optional_modes() {
        let t = test_state();
        let token = issue_token(&t.state.config.jwt, "u1", 3600);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .service(web::resource("/private").wrap(AuthMiddleware::required()).to(whoami))
                .service(web::resource("/open").wrap(AuthMiddleware::optional()).to(whoami)),
        )
        .await;

        let ok = test::TestRequest::get()
            .uri("/private")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        assert_eq!(test::call_and_read_body(&app, ok).await, "u1");

        let missing = test::TestRequest::get().uri("/private").to_request();
        let res = test::try_call_service(&app, missing).await;
        let status = match res {
            Ok(res) => res.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let bad = test::TestRequest::get()
            .uri("/open")
            .insert_header(("Authorization", "Bearer garbage"))
            .to_request();
        assert_eq!(test::call_and_read_body(&app, bad).await, "anonymous");
    }
}
