use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::auth::jwt;
use crate::auth::principal::{AdminAccess, Principal, ProjectManagerAccess};
use crate::db;
use crate::error::AppError;
use crate::models::Role;
use crate::state::SharedState;

impl FromRequestParts<SharedState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Unauthorized("Missing authentication token".to_string())
                })?;

        let claims = jwt::decode_token(bearer.token(), &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        // The store is authoritative: deleted users lose access and role
        // edits apply to tokens issued before them.
        let user = db::users::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

        let principal = match user.role {
            Role::Admin => Principal::Admin(AdminAccess {
                user_id: user.id,
                entry_override: state.config.admin_entry_override,
            }),
            Role::ProjectManager => {
                let assigned_projects =
                    db::assignments::project_ids_for_user(&state.pool, user.id)
                        .await?
                        .into_iter()
                        .collect();
                Principal::ProjectManager(ProjectManagerAccess {
                    user_id: user.id,
                    assigned_projects,
                })
            }
        };

        Ok(principal)
    }
}
