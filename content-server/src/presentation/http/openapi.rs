use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::presentation::http::app_error::ErrorBody;
use crate::presentation::http::handlers::auth::{
    CheckTokenDto, CredentialsDto, MessageDto, RefreshDto, TokenDetailsDto,
};
use crate::presentation::http::handlers::health::HealthDto;
use crate::presentation::http::handlers::posts::{
    ListPostsResponseDto, PostDto, PostRequestDto, TagDto, TagRequestDto,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "content-server", description = "Posts with JWT authentication"),
    paths(
        crate::presentation::http::handlers::health::healthz,
        crate::presentation::http::handlers::auth::sign_up,
        crate::presentation::http::handlers::auth::sign_in,
        crate::presentation::http::handlers::auth::refresh,
        crate::presentation::http::handlers::auth::check,
        crate::presentation::http::handlers::posts::list_posts,
        crate::presentation::http::handlers::posts::get_post,
        crate::presentation::http::handlers::posts::create_post,
        crate::presentation::http::handlers::posts::update_post,
        crate::presentation::http::handlers::posts::delete_post
    ),
    components(
        schemas(
            ErrorBody,
            HealthDto,
            CredentialsDto,
            RefreshDto,
            TokenDetailsDto,
            MessageDto,
            CheckTokenDto,
            TagRequestDto,
            PostRequestDto,
            TagDto,
            PostDto,
            ListPostsResponseDto
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Sign-up, sign-in and token endpoints"),
        (name = "posts", description = "Post endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub(crate) struct ApiDoc;

pub(crate) struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.take().unwrap_or_default();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        openapi.components = Some(components);
    }
}
