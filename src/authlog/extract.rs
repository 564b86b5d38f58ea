use regex::Regex;

use super::AuthLogError;

pub const DEFAULT_PATTERN: &str = r"Failed password for (?P<user>.+?) from (?P<addr>\S+) port\b";

const ADDR_GROUP: &str = "addr";

/// Pulls the source address out of a single log line.
pub trait LineMatcher {
    fn source_address<'a>(&self, line: &'a str) -> Option<&'a str>;
}

#[derive(Debug, Clone)]
pub struct RegexLineMatcher {
    re: Regex,
}

impl RegexLineMatcher {
    /// Builds a matcher from a pattern that carries a named `addr` group.
    pub fn new(pattern: &str) -> Result<Self, AuthLogError> {
        let re = Regex::new(pattern)?;
        if !re.capture_names().flatten().any(|name| name == ADDR_GROUP) {
            return Err(AuthLogError::MissingAddrGroup {
                pattern: pattern.to_string(),
            });
        }
        Ok(Self { re })
    }

    pub fn failed_password() -> Result<Self, AuthLogError> {
        Self::new(DEFAULT_PATTERN)
    }
}

impl LineMatcher for RegexLineMatcher {
    fn source_address<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.re
            .captures(line)
            .and_then(|caps| caps.name(ADDR_GROUP))
            .map(|m| m.as_str())
            .filter(|addr| !addr.is_empty())
    }
}

/// Lazily yields one source address per matching line; other lines are skipped.
pub fn extract_addresses<'a, M>(
    text: &'a str,
    matcher: &'a M,
) -> impl Iterator<Item = &'a str> + 'a
where
    M: LineMatcher + ?Sized + 'a,
{
    text.lines().filter_map(move |line| matcher.source_address(line))
}
