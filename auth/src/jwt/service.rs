use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::PartialClaims;
use super::claims::TokenClaims;
use super::claims::TokenSubject;
use super::errors::TokenError;
use crate::clock::Clock;
use crate::clock::SystemClock;

/// Issues and validates HS256 access tokens.
///
/// Key material, TTL and clock are fixed at construction.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    validation: Validation,
    inspection: Validation,
}

impl TokenService {
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Create a token service signing with `secret`.
    ///
    /// # Arguments
    /// * `secret` - HMAC key, at least 32 bytes for HS256
    /// * `ttl` - Lifetime of every issued token
    ///
    /// # Returns
    /// TokenService reading time from the system clock
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Self::ALGORITHM);
        // Expiry is checked against `self.clock`, strictly, in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let mut inspection = Validation::new(Self::ALGORITHM);
        inspection.insecure_disable_signature_validation();
        inspection.validate_exp = false;
        inspection.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            clock: Arc::new(SystemClock),
            validation,
            inspection,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `subject`, expiring `ttl` from now.
    ///
    /// # Errors
    /// * `EncodingFailed` - Claims could not be serialized or signed
    pub fn generate<S: TokenSubject + ?Sized>(&self, subject: &S) -> Result<String, TokenError> {
        let claims = TokenClaims::for_subject(subject, self.clock.now(), self.ttl);

        encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify signature, algorithm, structure and expiry.
    ///
    /// # Returns
    /// The token's claims, only when every check passed
    ///
    /// # Errors
    /// * `Malformed` - Not a compact JWS, or required claims missing
    /// * `InvalidSignature` - Signature mismatch or non-HS256 header
    /// * `Expired` - `exp` is not after the current time
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(classify)?
            .claims;

        if claims.is_expired(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// True iff the token verifies and has not expired. Fails closed.
    pub fn validate(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    /// Read the `userId` claim.
    ///
    /// Does NOT verify the signature or expiry; call [`TokenService::verify`]
    /// first, claims from an unverified token carry no meaning.
    ///
    /// # Errors
    /// * `Malformed` - Token structure invalid or claim absent
    pub fn extract_user_id(&self, token: &str) -> Result<String, TokenError> {
        self.inspect(token)?
            .user_id
            .ok_or_else(|| TokenError::Malformed("missing claim: userId".to_string()))
    }

    /// Read the username (`username`, falling back to `sub`).
    ///
    /// Same trust caveat as [`TokenService::extract_user_id`].
    ///
    /// # Errors
    /// * `Malformed` - Token structure invalid or claim absent
    pub fn extract_username(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.inspect(token)?;

        claims
            .username
            .or(claims.sub)
            .ok_or_else(|| TokenError::Malformed("missing claim: username".to_string()))
    }

    fn inspect(&self, token: &str) -> Result<PartialClaims, TokenError> {
        decode::<PartialClaims>(token, &self.decoding_key, &self.inspection)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

fn classify(error: jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(error.to_string()),
    }
}
