use crate::{
    auth::{self, ACCESS_TOKEN_COOKIE, CODE_VERIFIER_COOKIE},
    error::{Result, StudioError},
    gallery::{
        COLLECTION_DEFAULT_LIMIT, COLLECTION_MAX_LIMIT, FEED_DEFAULT_LIMIT, FEED_MAX_LIMIT,
        HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT,
    },
    models::{GenerationRequest, Identity, PageRange, SaveOutcome},
    storage::validate_object_path,
    studio::Studio,
};
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    http::header,
    web, HttpRequest, HttpResponse,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

const DEFAULT_REDIRECT: &str = "/generate";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub q: Option<String>,
}

impl ListParams {
    fn range(&self, default_limit: usize, max_limit: usize) -> PageRange {
        PageRange::from_params(
            self.page.as_deref(),
            self.limit.as_deref(),
            default_limit,
            max_limit,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct IdsParams {
    pub ids: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SaveBody {
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// Bearer header first, then the session cookie.
fn access_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::bearer_token)
        .map(str::to_string);

    from_header.or_else(|| {
        req.cookie(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    })
}

async fn caller(studio: &Studio, req: &HttpRequest) -> Result<Option<Identity>> {
    let token = access_token(req);
    auth::resolve(studio.auth(), token.as_deref()).await
}

/// For read-only routes: an unreachable auth backend reads as anonymous.
async fn caller_or_anonymous(studio: &Studio, req: &HttpRequest) -> Result<Option<Identity>> {
    match caller(studio, req).await {
        Err(StudioError::RequestError(e)) => {
            log::warn!("Auth lookup failed, treating caller as anonymous: {}", e);
            Ok(None)
        }
        other => other,
    }
}

/// An empty body is the default value; anything else must be valid JSON.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| StudioError::InvalidInput(format!("Invalid JSON body: {}", e)))
}

/// Only same-origin paths; `//host` would leave the site.
fn redirect_target(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path
        }
        _ => DEFAULT_REDIRECT,
    }
}

pub async fn generate(
    studio: web::Data<Studio>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    // Auth before parsing, so anonymous callers get 401 whatever they send.
    let identity = caller(&studio, &req)
        .await?
        .ok_or(StudioError::Unauthenticated)?;
    let request: GenerationRequest = parse_body(&body)?;

    let image = studio.pipeline().generate(Some(&identity), request).await?;
    Ok(HttpResponse::Ok().json(json!({ "image": image })))
}

pub async fn feed(
    studio: web::Data<Studio>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let range = params.range(FEED_DEFAULT_LIMIT, FEED_MAX_LIMIT);
    let page = studio.gallery().feed(params.q.as_deref(), range).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn saved_ids(
    studio: web::Data<Studio>,
    req: HttpRequest,
    params: web::Query<IdsParams>,
) -> Result<HttpResponse> {
    let ids: Vec<String> = params
        .ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();

    let identity = caller_or_anonymous(&studio, &req).await?;
    let saved = studio.gallery().saved_ids(identity.as_ref(), &ids).await?;
    Ok(HttpResponse::Ok().json(json!({ "saved": saved })))
}

pub async fn save(
    studio: web::Data<Studio>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let identity = caller(&studio, &req)
        .await?
        .ok_or(StudioError::Unauthenticated)?;
    let body: SaveBody = parse_body(&body)?;

    let (outcome, state) = studio
        .gallery()
        .save(Some(&identity), body.image_id.as_deref().unwrap_or_default())
        .await?;

    Ok(match outcome {
        SaveOutcome::Created => HttpResponse::Created().json(state),
        SaveOutcome::AlreadySaved => HttpResponse::Ok().json(state),
    })
}

pub async fn unsave(
    studio: web::Data<Studio>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let identity = caller(&studio, &req)
        .await?
        .ok_or(StudioError::Unauthenticated)?;
    let body: SaveBody = parse_body(&body)?;

    let state = studio
        .gallery()
        .unsave(Some(&identity), body.image_id.as_deref().unwrap_or_default())
        .await?;
    Ok(HttpResponse::Ok().json(state))
}

pub async fn collection(
    studio: web::Data<Studio>,
    req: HttpRequest,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let identity = caller(&studio, &req).await?;
    let range = params.range(COLLECTION_DEFAULT_LIMIT, COLLECTION_MAX_LIMIT);
    let page = studio.gallery().collection(identity.as_ref(), range).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn history(
    studio: web::Data<Studio>,
    req: HttpRequest,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let identity = caller(&studio, &req).await?;
    let range = params.range(HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT);
    let page = studio.gallery().history(identity.as_ref(), range).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn me(studio: web::Data<Studio>, req: HttpRequest) -> Result<HttpResponse> {
    let identity = caller_or_anonymous(&studio, &req).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": identity })))
}

pub async fn health(studio: web::Data<Studio>) -> Result<HttpResponse> {
    let healthy = studio.storage().health_check().await?;
    let body = json!({ "ok": healthy, "providers": studio.pipeline().chain().names() });
    Ok(if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    })
}

pub async fn get_image(studio: web::Data<Studio>, id: web::Path<String>) -> Result<HttpResponse> {
    let image = studio.gallery().get_image(&id).await?;
    Ok(HttpResponse::Ok().json(json!({ "image": image })))
}

pub async fn delete_image(
    studio: web::Data<Studio>,
    req: HttpRequest,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = caller(&studio, &req).await?;
    studio.gallery().delete_image(identity.as_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn auth_callback(
    studio: web::Data<Studio>,
    req: HttpRequest,
    params: web::Query<CallbackParams>,
) -> HttpResponse {
    let mut response = HttpResponse::Found();
    response.insert_header((header::LOCATION, redirect_target(params.next.as_deref())));

    if let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) {
        let verifier = req.cookie(CODE_VERIFIER_COOKIE);
        match studio
            .auth()
            .exchange_code(code, verifier.as_ref().map(|c| c.value()))
            .await
        {
            Ok(session) => {
                let mut cookie = Cookie::build(ACCESS_TOKEN_COOKIE, session.access_token)
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .finish();
                if let Some(seconds) = session.expires_in {
                    cookie.set_max_age(CookieDuration::seconds(seconds as i64));
                }
                response.cookie(cookie);
            }
            Err(e) => log::warn!("Auth code exchange failed: {}", e),
        }
    }

    response.finish()
}

/// Serves objects for backends that have no public host of their own.
pub async fn public_object(
    studio: web::Data<Studio>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (bucket, object_path) = path.into_inner();
    if bucket != studio.bucket() || validate_object_path(&object_path).is_err() {
        return Err(StudioError::NotFound);
    }

    let blob = studio
        .blobs()
        .fetch(&object_path)
        .await?
        .ok_or(StudioError::NotFound)?;

    Ok(HttpResponse::Ok()
        .content_type(blob.content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(blob.bytes))
}
