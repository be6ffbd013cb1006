//! Offline account token checks.
//!
//! Tokens are only inspected locally: shape, embedded user id, and a masked
//! form that is safe to print or log.

use std::fmt;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use regex::Regex;

const MIN_TOKEN_LEN: usize = 50;
const MASK_PREFIX: usize = 6;
const MASK_SUFFIX: usize = 4;

/// The recognised token shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    /// `<user id>.<timestamp>.<hmac>`
    Standard,
    /// A single 59+ character segment.
    Legacy,
    /// `mfa.` followed by 84+ characters.
    Mfa,
}

/// Accepted shapes, tried in order.
static TOKEN_PATTERNS: LazyLock<[(TokenFormat, Regex); 3]> = LazyLock::new(|| {
    [
        (
            TokenFormat::Standard,
            pattern(r"^[A-Za-z0-9_-]{23,28}\.[A-Za-z0-9_-]{6,7}\.[A-Za-z0-9_-]{27,}$"),
        ),
        (TokenFormat::Legacy, pattern(r"^[A-Za-z0-9_-]{59,}$")),
        (TokenFormat::Mfa, pattern(r"^mfa\.[A-Za-z0-9_-]{84,}$")),
    ]
});

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("Invalid token regex")
}

impl TokenFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Legacy => "legacy",
            Self::Mfa => "mfa",
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`TokenValidator::validate`]. Never holds the full token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReport {
    pub masked: String,
    pub format: Option<TokenFormat>,
    pub user_id: Option<String>,
    pub error: Option<String>,
}

impl TokenReport {
    pub fn is_valid(&self) -> bool {
        self.format.is_some()
    }
}

impl fmt::Display for TokenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Token: {}", self.masked)?;
        write!(
            f,
            "Format Valid: {}",
            if self.is_valid() { "✅" } else { "❌" }
        )?;
        if let Some(format) = self.format {
            write!(f, " ({format})")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "\nUser ID: {user_id}")?;
        }
        if let Some(error) = &self.error {
            write!(f, "\nError: {error}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenValidator;

impl TokenValidator {
    pub fn validate(token: &str) -> TokenReport {
        let token = token.trim();
        let masked = Self::mask(token);

        match Self::check_format(token) {
            Some(format) => {
                tracing::debug!(token = %masked, %format, "Token format validation passed");
                TokenReport {
                    masked,
                    format: Some(format),
                    user_id: Self::extract_user_id(token),
                    error: None,
                }
            }
            None => {
                tracing::debug!(token = %masked, "Token format validation failed");
                TokenReport {
                    masked,
                    format: None,
                    user_id: None,
                    error: Some("Invalid token format".to_string()),
                }
            }
        }
    }

    /// Matches `token` against the accepted shapes.
    pub fn check_format(token: &str) -> Option<TokenFormat> {
        let token = token.trim();
        if token.len() < MIN_TOKEN_LEN {
            return None;
        }

        TOKEN_PATTERNS
            .iter()
            .find(|(_, regex)| regex.is_match(token))
            .map(|(format, _)| *format)
    }

    /// Decodes the user id carried in the first segment of a dotted token.
    pub fn extract_user_id(token: &str) -> Option<String> {
        let (first, _) = token.trim().split_once('.')?;

        let mut encoded = first.to_string();
        while encoded.len() % 4 != 0 {
            encoded.push('=');
        }

        let bytes = URL_SAFE.decode(encoded).ok()?;
        let id = String::from_utf8(bytes).ok()?;
        (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
    }

    /// `abcdef...wxyz`; tokens too short to mask safely become `***`.
    pub fn mask(token: &str) -> String {
        let chars: Vec<char> = token.trim().chars().collect();
        if chars.len() <= MASK_PREFIX + MASK_SUFFIX {
            return "***".to_string();
        }

        let head: String = chars[..MASK_PREFIX].iter().collect();
        let tail: String = chars[chars.len() - MASK_SUFFIX..].iter().collect();
        format!("{head}...{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARD: &str = "ODAzNTExMTAyMjQ2Nzg5MTI.GZjJ8A.abcdefghijklmnopqrstuvwxyz0123_-";

    #[test]
    fn test_standard_token() {
        let report = TokenValidator::validate(STANDARD);

        assert!(report.is_valid());
        assert_eq!(report.format, Some(TokenFormat::Standard));
        assert_eq!(report.user_id.as_deref(), Some("80351110224678912"));
        assert_eq!(report.masked, "ODAzNT...23_-");
        assert!(report.error.is_none());
    }

    #[test]
    fn test_user_id_without_padding() {
        let token = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GZjJ8A.abcdefghijklmnopqrstuvwxyz0123_-";
        assert_eq!(
            TokenValidator::extract_user_id(token).as_deref(),
            Some("123456789012345678")
        );
        assert_eq!(TokenValidator::extract_user_id("no-dots-here"), None);
        assert_eq!(TokenValidator::extract_user_id("!!!!.x.y"), None);
    }

    #[test]
    fn test_legacy_and_mfa_tokens() {
        let legacy = "a".repeat(59);
        assert_eq!(
            TokenValidator::check_format(&legacy),
            Some(TokenFormat::Legacy)
        );

        let mfa = format!("mfa.{}", "B".repeat(84));
        assert_eq!(TokenValidator::check_format(&mfa), Some(TokenFormat::Mfa));
        assert_eq!(TokenValidator::check_format(&format!("mfa.{}", "B".repeat(83))), None);
    }

    #[test]
    fn test_rejected_shapes() {
        // Too short overall.
        assert_eq!(TokenValidator::check_format("abc.def.ghi"), None);
        // Middle segment too long.
        let bad = "ODAzNTExMTAyMjQ2Nzg5MTI.GZjJ8AAA.abcdefghijklmnopqrstuvwxyz0123_-";
        assert_eq!(TokenValidator::check_format(bad), None);
        // Characters outside the URL-safe alphabet.
        let bad = format!("{}+", "a".repeat(60));
        assert_eq!(TokenValidator::check_format(&bad), None);

        let report = TokenValidator::validate("not-a-token");
        assert!(!report.is_valid());
        assert_eq!(report.error.as_deref(), Some("Invalid token format"));
        assert_eq!(report.masked, "not-a-...oken");
    }

    #[test]
    fn test_patterns_match_whole_token() {
        assert_eq!(TokenValidator::check_format(&format!("{STANDARD}!")), None);
        assert_eq!(TokenValidator::check_format(&format!("+{STANDARD}")), None);
        // First segment one character over the limit.
        let long_id = format!("A{}", "B".repeat(28));
        let token = format!("{long_id}.GZjJ8A.abcdefghijklmnopqrstuvwxyz0123_-");
        assert_eq!(TokenValidator::check_format(&token), None);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let padded = format!("  {STANDARD}\n");
        assert_eq!(
            TokenValidator::check_format(&padded),
            Some(TokenFormat::Standard)
        );
    }

    #[test]
    fn test_mask_short_tokens() {
        assert_eq!(TokenValidator::mask("short"), "***");
        assert_eq!(TokenValidator::mask("0123456789"), "***");
        assert_eq!(TokenValidator::mask("0123456789a"), "012345...789a");
    }

    #[test]
    fn test_report_display_hides_token() {
        let text = TokenValidator::validate(STANDARD).to_string();

        assert!(!text.contains(STANDARD));
        assert!(text.contains("Format Valid: ✅ (standard)"));
        assert!(text.contains("User ID: 80351110224678912"));
    }
}
