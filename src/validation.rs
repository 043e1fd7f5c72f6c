use once_cell::sync::Lazy;
use regex::Regex;

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]{1,2048}$").unwrap());
static RE_SAFE_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\s\-,.&/()'_#\n]{1,2000}$").unwrap());

pub fn url(s: &str) -> bool {
    RE_URL.is_match(s) && s.len() <= 2048
}

pub fn safe_text(s: &str) -> bool {
    // For names, notes fields - allows newlines but limits length and charset
    RE_SAFE_TEXT.is_match(s) && s.len() <= 2000
}

/// Image-relative label coordinates are percentages.
pub fn percent(v: f64) -> bool {
    (0.0..=100.0).contains(&v)
}

/// Known status codes: 0=Archived, 1=Open, 50=In Progress, 99=Complete.
pub fn status_code(v: i16) -> bool {
    matches!(v, 0 | 1 | 50 | 99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(url("https://example.com/item?id=12"));
        assert!(url("http://localhost:3231/uploads/x.png"));
        assert!(!url("ftp://example.com"));
        assert!(!url("javascript:alert(1)"));
    }

    #[test]
    fn test_safe_text() {
        assert!(safe_text("Living Room - North Wall"));
        assert!(safe_text("Samsung 55\n(cracked screen)".replace('\"', "").as_str()));
        assert!(!safe_text("<script>alert(1)</script>"));
        assert!(!safe_text(""));
    }

    #[test]
    fn test_percent_bounds() {
        assert!(percent(0.0));
        assert!(percent(100.0));
        assert!(percent(42.5));
        assert!(!percent(-0.1));
        assert!(!percent(100.1));
    }

    #[test]
    fn test_status_codes() {
        for s in [0, 1, 50, 99] {
            assert!(status_code(s));
        }
        assert!(!status_code(2));
        assert!(!status_code(-1));
    }
}
