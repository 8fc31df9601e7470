use crate::errors::AppError;
use crate::utils::auth::{TokenError, TokenService};
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use tracing::warn;

/// Rejects requests without a valid bearer token and stores the
/// verified [`Claims`](crate::models::user::Claims) in the request extensions.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok());

        let verified = match (bearer_token(header), req.app_data::<web::Data<TokenService>>()) {
            (None, _) => Err(AppError::Unauthorized(
                "Authorization token required".to_string(),
            )),
            (Some(_), None) => Err(AppError::Internal(
                "token service not registered".to_string(),
            )),
            (Some(token), Some(tokens)) => tokens.verify(token).map_err(|e| {
                warn!(path = %req.path(), error = %e, "Rejected bearer token");
                match e {
                    TokenError::Expired => AppError::Unauthorized("Token has expired".to_string()),
                    _ => AppError::Unauthorized("Invalid token".to_string()),
                }
            }),
        };

        let claims = match verified {
            Ok(claims) => claims,
            Err(err) => {
                let (req, _pl) = req.into_parts();
                let res = err.error_response();
                return Box::pin(async move {
                    Ok(ServiceResponse::new(req, res).map_into_right_body())
                });
            }
        };

        req.extensions_mut().insert(claims);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
