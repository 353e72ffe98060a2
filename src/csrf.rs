use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use rocket::http::{Cookie, SameSite};
use rocket::request::{FromRequest, Outcome, Request};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token lifetime in seconds. Long enough to fill in a form slowly,
/// short enough that a leaked token goes stale.
const CSRF_TOKEN_EXPIRY: u64 = 3600;

/// Anti-forgery token carried both in a cookie and in a hidden form
/// field; POST handlers compare the two.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generates a fresh token: big-endian issue timestamp followed by
    /// 32 random bytes, URL-safe base64 encoded.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; 32] = rng.gen();

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut token_data = timestamp.to_be_bytes().to_vec();
        token_data.extend_from_slice(&random_bytes);

        CsrfToken(URL_SAFE_NO_PAD.encode(&token_data))
    }

    /// True when the submitted form value matches this token and the
    /// embedded timestamp has not expired.
    pub fn verify(&self, submitted: &str) -> bool {
        if self.0 != submitted {
            return false;
        }

        let Ok(decoded) = URL_SAFE_NO_PAD.decode(&self.0) else {
            return false;
        };
        if decoded.len() < 8 {
            return false;
        }

        let timestamp_bytes: [u8; 8] = decoded[..8].try_into().unwrap_or([0; 8]);
        let token_time = u64::from_be_bytes(timestamp_bytes);
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        current_time.saturating_sub(token_time) < CSRF_TOKEN_EXPIRY
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Request guard: reuses the token already in the cookie jar, or mints
/// one and sets the cookie. Never fails, so every page render has a
/// token to embed in its forms.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for CsrfToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookies = request.cookies();

        let token = if let Some(cookie) = cookies.get("csrf_token") {
            CsrfToken(cookie.value().to_string())
        } else {
            let new_token = CsrfToken::generate();

            let cookie = Cookie::build(("csrf_token", new_token.0.clone()))
                .path("/")
                .same_site(SameSite::Strict)
                .http_only(false)
                .secure(false); // dev default; serve behind TLS in production

            cookies.add(cookie);
            new_token
        };

        Outcome::Success(token)
    }
}
