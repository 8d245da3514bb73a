//! Auth endpoint paths, relative to the API base URL (`<origin>/api`).

/// Exchanges [`Credentials`](crate::Credentials) for a session.
pub const LOGIN: &str = "/auth/login";

/// Mints a new access token. Sent without a body: the server relies on
/// the transport-level credential (the refresh cookie).
pub const REFRESH: &str = "/auth/refresh";

/// Ends the server-side session. Fire-and-forget.
pub const LOGOUT: &str = "/auth/logout";

/// Suffix appended to the server origin to form the API base URL.
pub const API_PREFIX: &str = "/api";

/// Returns `true` if `path` targets the refresh endpoint.
///
/// Matches on containment rather than equality so that a path carrying a
/// query string (`/auth/refresh?source=timer`) is still recognized.
pub fn is_refresh(path: &str) -> bool {
    path.contains(REFRESH)
}
