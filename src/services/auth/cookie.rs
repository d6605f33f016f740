//! Session token extraction from `Cookie` request headers.
//!
//! Each `Cookie` header line is treated as one cookie-set entry: besides the
//! `name=value` pairs it may carry attributes (`expires`, `path`, ...) that
//! apply to the whole line. Entries whose `expires` is already in the past, or
//! whose `max-age` is zero or negative, are ignored before the token cookie is
//! looked up.

use std::fmt;

use axum::http::{HeaderMap, header};
use chrono::{DateTime, NaiveDateTime, Utc};
use cookie::Cookie;

/// Name of the cookie carrying the session token. Matched case-sensitively.
pub const SESSION_COOKIE_NAME: &str = "X-Session-Token";

/// Attribute names that may appear inside a cookie-set entry and are never
/// cookies themselves.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "expires", "max-age", "domain", "path", "secure", "httponly", "samesite",
];

/// Opaque session credential presented by the client.
///
/// Always non-empty. `Debug` never prints the raw value so a token cannot
/// leak into logs through `?token` fields.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Pick the session token out of the request's cookie headers.
///
/// Returns `None` when no live entry carries `X-Session-Token`, or when the
/// first matching cookie has an empty value.
pub fn extract_session_token(headers: &HeaderMap, now: DateTime<Utc>) -> Option<SessionToken> {
    let value = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(CookieEntry::parse)
        .filter(|entry| entry.is_live(now))
        .find_map(|entry| entry.find(SESSION_COOKIE_NAME))?;

    SessionToken::new(value)
}

/// One parsed `Cookie` header line.
struct CookieEntry {
    cookies: Vec<(String, String)>,
    expiry: Expiry,
    max_age: MaxAge,
}

enum Expiry {
    Absent,
    At(DateTime<Utc>),
    Unparseable,
}

/// `max-age` in seconds relative to now; `<= 0` means already expired.
enum MaxAge {
    Absent,
    Seconds(i64),
    Unparseable,
}

impl CookieEntry {
    fn parse(raw: &str) -> Self {
        let mut cookies = Vec::new();
        let mut expiry = Expiry::Absent;
        let mut max_age = MaxAge::Absent;

        for cookie in Cookie::split_parse(raw).filter_map(Result::ok) {
            let name = cookie.name();
            if name.eq_ignore_ascii_case("expires") {
                expiry = match parse_http_date(cookie.value()) {
                    Some(at) => Expiry::At(at),
                    None => Expiry::Unparseable,
                };
            } else if name.eq_ignore_ascii_case("max-age") {
                max_age = match cookie.value().trim().parse() {
                    Ok(secs) => MaxAge::Seconds(secs),
                    Err(_) => MaxAge::Unparseable,
                };
            } else if !is_reserved(name) {
                cookies.push((name.to_string(), unquote(cookie.value()).to_string()));
            }
        }

        Self {
            cookies,
            expiry,
            max_age,
        }
    }

    /// Live only if neither attribute says otherwise.
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        let expires_ok = match self.expiry {
            Expiry::Absent => true,
            Expiry::At(at) => at > now,
            Expiry::Unparseable => false,
        };
        let max_age_ok = match self.max_age {
            MaxAge::Absent => true,
            MaxAge::Seconds(secs) => secs > 0,
            MaxAge::Unparseable => false,
        };
        expires_ok && max_age_ok
    }

    fn find(self, name: &str) -> Option<String> {
        self.cookies
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_ATTRIBUTES
        .iter()
        .any(|attr| name.eq_ignore_ascii_case(attr))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse an HTTP date: RFC 1123 first, then the two legacy Netscape forms.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%A, %d-%b-%y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn headers(lines: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for line in lines {
            map.append(header::COOKIE, HeaderValue::from_str(line).unwrap());
        }
        map
    }

    fn token(lines: &[&str]) -> Option<String> {
        extract_session_token(&headers(lines), now()).map(SessionToken::into_string)
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(token(&[]), None);
        assert_eq!(token(&["theme=dark; lang=en"]), None);
    }

    #[test]
    fn picks_token_among_other_cookies() {
        assert_eq!(
            token(&["theme=dark; X-Session-Token=abc123; lang=en"]),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn empty_value_is_treated_as_missing() {
        assert_eq!(token(&["X-Session-Token="]), None);
        assert_eq!(token(&["X-Session-Token=\"\""]), None);
    }

    #[test]
    fn name_match_is_case_sensitive() {
        assert_eq!(token(&["x-session-token=abc123"]), None);
    }

    #[test]
    fn quoted_value_is_unwrapped() {
        assert_eq!(
            token(&["X-Session-Token=\"abc123\""]),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn expired_entry_is_skipped_even_on_exact_name_match() {
        assert_eq!(
            token(&["X-Session-Token=old; expires=Wed, 21 Oct 2015 07:28:00 GMT"]),
            None
        );
    }

    #[test]
    fn first_live_entry_wins() {
        let lines = [
            "X-Session-Token=stale; expires=Wed, 21 Oct 2015 07:28:00 GMT",
            "X-Session-Token=fresh; expires=Fri, 01 Jan 2100 00:00:00 GMT",
            "X-Session-Token=later",
        ];
        assert_eq!(token(&lines), Some("fresh".to_string()));
    }

    #[test]
    fn unparseable_expiry_drops_the_entry() {
        let lines = ["X-Session-Token=a; expires=not-a-date", "X-Session-Token=b"];
        assert_eq!(token(&lines), Some("b".to_string()));
    }

    #[test]
    fn legacy_netscape_date_is_understood() {
        assert_eq!(
            token(&["X-Session-Token=a; expires=Wednesday, 21-Oct-15 07:28:00 GMT"]),
            None
        );
    }

    #[test]
    fn non_positive_max_age_expires_the_entry() {
        for attr in ["Max-Age=0", "max-age=-1"] {
            let lines = [format!("X-Session-Token=gone; {attr}")];
            let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
            assert_eq!(token(&lines), None, "{attr}");
        }

        let lines = ["X-Session-Token=gone; Max-Age=0", "X-Session-Token=next"];
        assert_eq!(token(&lines), Some("next".to_string()));
    }

    #[test]
    fn positive_max_age_keeps_the_entry() {
        assert_eq!(
            token(&["X-Session-Token=abc; Max-Age=3600"]),
            Some("abc".to_string())
        );
    }

    #[test]
    fn max_age_and_expires_must_both_allow_the_entry() {
        assert_eq!(
            token(&["X-Session-Token=a; Max-Age=3600; expires=Wed, 21 Oct 2015 07:28:00 GMT"]),
            None
        );
        assert_eq!(
            token(&["X-Session-Token=a; Max-Age=soon", "X-Session-Token=b"]),
            Some("b".to_string())
        );
    }

    #[test]
    fn attributes_are_not_cookies() {
        assert_eq!(token(&["path=/; X-Session-Token=abc"]), Some("abc".to_string()));
    }

    #[test]
    fn debug_redacts_token() {
        let t = SessionToken::new("secret").unwrap();
        assert_eq!(format!("{t:?}"), "SessionToken(***)");
    }
}
