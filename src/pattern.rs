//! Registration pattern parsing.
//!
//! A pattern is an optional host region followed by a path region
//! (`{sub}.example.com/users/{id}`). The parser splits it into ordered
//! tokens — static literal runs, `{name}` parameters and `*{name}`
//! wildcards, each optionally gated by a `{name:regex}` constraint — and
//! compiles every constraint eagerly so that a bad regex fails the
//! registration instead of a later lookup.

use crate::error::RouterError;
use regex::Regex;

/// A compiled `{name:regex}` constraint.
///
/// The source text is kept verbatim: it doubles as the edge key in the
/// tree, and it is what `render` emits for the round-trip law. The
/// compiled form is anchored so the gate must cover the whole captured
/// text.
#[derive(Debug, Clone)]
pub(crate) struct Gate {
    pub(crate) source: String,
    pub(crate) re: Regex,
}

impl Gate {
    fn compile(source: &str) -> Result<Self, RouterError> {
        let re = Regex::new(&format!(r"\A(?:{source})\z")).map_err(|error| {
            RouterError::RegexCompile {
                pattern: source.to_string(),
                error,
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            re,
        })
    }
}

/// One parsed pattern token.
#[derive(Debug, Clone)]
pub(crate) enum Token {
    /// A literal run. `host` is true for text left of the first `/`.
    Static { text: String, host: bool },
    /// `{name}` or `{name:regex}` — consumes one path segment or one host
    /// label.
    Param {
        name: String,
        gate: Option<Gate>,
        host: bool,
    },
    /// `*{name}` or `*{name:regex}` — consumes one or more path segments.
    /// Never legal in the host region.
    Wildcard { name: String, gate: Option<Gate> },
}

/// A fully parsed registration pattern.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    pub(crate) tokens: Vec<Token>,
    /// Parameter names in declaration order, host region first.
    pub(crate) param_names: Vec<String>,
}

impl Pattern {
    /// Parses `pattern` into tokens.
    ///
    /// Rejected as [`RouterError::PatternInvalid`]: an empty pattern, a
    /// host region with no path, unbalanced braces, an empty parameter
    /// name, a duplicate parameter name, a wildcard in the host region, a
    /// wildcard not ending at a segment boundary, and an empty interior
    /// path segment (`//`). A constraint that fails to compile is
    /// rejected as [`RouterError::RegexCompile`].
    pub(crate) fn parse(pattern: &str) -> Result<Self, RouterError> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "pattern must not be empty"));
        }

        let bytes = pattern.as_bytes();
        let mut tokens = Vec::new();
        let mut param_names: Vec<String> = Vec::new();
        let mut host = !pattern.starts_with('/');
        let mut lit_start = 0;
        let mut i = 0;

        let declare = |name: &str, param_names: &mut Vec<String>| {
            if param_names.iter().any(|n| n == name) {
                return Err(invalid(pattern, "duplicate parameter name"));
            }
            param_names.push(name.to_string());
            Ok(())
        };

        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    flush_static(pattern, lit_start, i, host, &mut tokens)?;
                    let (name, gate, next) = parse_brace(pattern, i)?;
                    declare(&name, &mut param_names)?;
                    let gate = gate.as_deref().map(Gate::compile).transpose()?;
                    tokens.push(Token::Param { name, gate, host });
                    lit_start = next;
                    i = next;
                }
                b'*' if bytes.get(i + 1) == Some(&b'{') => {
                    if host {
                        return Err(invalid(pattern, "wildcards are not allowed in the host"));
                    }
                    flush_static(pattern, lit_start, i, host, &mut tokens)?;
                    let (name, gate, next) = parse_brace(pattern, i + 1)?;
                    if next < bytes.len() && bytes[next] != b'/' {
                        return Err(invalid(pattern, "wildcard must end at a segment boundary"));
                    }
                    declare(&name, &mut param_names)?;
                    let gate = gate.as_deref().map(Gate::compile).transpose()?;
                    tokens.push(Token::Wildcard { name, gate });
                    lit_start = next;
                    i = next;
                }
                b'}' => return Err(invalid(pattern, "unmatched '}'")),
                b'/' => {
                    if bytes.get(i + 1) == Some(&b'/') {
                        return Err(invalid(pattern, "empty path segment"));
                    }
                    if host {
                        flush_static(pattern, lit_start, i, true, &mut tokens)?;
                        host = false;
                        lit_start = i;
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        if host {
            return Err(invalid(pattern, "pattern must contain a path"));
        }
        flush_static(pattern, lit_start, bytes.len(), false, &mut tokens)?;

        Ok(Self {
            tokens,
            param_names,
        })
    }

    /// Renders the tokens back into the canonical pattern string. The
    /// tokenizer is lossless, so this equals the registered pattern.
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Static { text, .. } => out.push_str(text),
                Token::Param { name, gate, .. } => {
                    out.push('{');
                    out.push_str(name);
                    if let Some(gate) = gate {
                        out.push(':');
                        out.push_str(&gate.source);
                    }
                    out.push('}');
                }
                Token::Wildcard { name, gate } => {
                    out.push_str("*{");
                    out.push_str(name);
                    if let Some(gate) = gate {
                        out.push(':');
                        out.push_str(&gate.source);
                    }
                    out.push('}');
                }
            }
        }
        out
    }
}

fn invalid(pattern: &str, reason: &str) -> RouterError {
    RouterError::PatternInvalid {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// Hostnames are matched case-insensitively, so host literals are kept to
/// the alphabet that comparison is defined over.
fn is_host_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

fn flush_static(
    pattern: &str,
    start: usize,
    end: usize,
    host: bool,
    tokens: &mut Vec<Token>,
) -> Result<(), RouterError> {
    if start < end {
        let text = &pattern[start..end];
        if host && !text.bytes().all(is_host_byte) {
            return Err(invalid(pattern, "invalid character in host"));
        }
        tokens.push(Token::Static {
            text: text.to_string(),
            host,
        });
    }
    Ok(())
}

/// Parses `{name}` or `{name:regex}` starting at the `{` at `open`.
/// Returns the name, the optional regex source, and the index just past
/// the closing `}`. Brace depth is tracked so regex repetition counts
/// (`\d{2}`) survive intact.
fn parse_brace(
    pattern: &str,
    open: usize,
) -> Result<(String, Option<String>, usize), RouterError> {
    let bytes = pattern.as_bytes();
    let name_start = open + 1;
    let mut i = name_start;

    while i < bytes.len() && bytes[i] != b':' && bytes[i] != b'}' {
        if bytes[i] == b'{' || bytes[i] == b'/' {
            return Err(invalid(pattern, "invalid character in parameter name"));
        }
        i += 1;
    }
    if i == bytes.len() {
        return Err(invalid(pattern, "unterminated '{'"));
    }
    let name = &pattern[name_start..i];
    if name.is_empty() {
        return Err(invalid(pattern, "parameter name must not be empty"));
    }
    if bytes[i] == b'}' {
        return Ok((name.to_string(), None, i + 1));
    }

    let re_start = i + 1;
    let mut depth = 1usize;
    i = re_start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(invalid(pattern, "unterminated '{'"));
    }
    let source = &pattern[re_start..i];
    if source.is_empty() {
        return Err(invalid(pattern, "empty regex constraint"));
    }
    Ok((name.to_string(), Some(source.to_string()), i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(p: &str) -> Pattern {
        Pattern::parse(p).unwrap()
    }

    #[test]
    fn test_static_only() {
        let pat = parse("/users/all");
        assert_eq!(pat.tokens.len(), 1);
        assert!(pat.param_names.is_empty());
        assert!(
            matches!(&pat.tokens[0], Token::Static { text, host } if text == "/users/all" && !host)
        );
    }

    #[test]
    fn test_params_and_wildcards() {
        let pat = parse("/users/{id}/files/*{rest}");
        assert_eq!(pat.param_names, vec!["id", "rest"]);
        assert_eq!(pat.tokens.len(), 4);
        assert!(matches!(&pat.tokens[1], Token::Param { name, gate, host }
            if name == "id" && gate.is_none() && !host));
        assert!(matches!(&pat.tokens[3], Token::Wildcard { name, gate }
            if name == "rest" && gate.is_none()));
    }

    #[test]
    fn test_host_region() {
        let pat = parse("{sub}.example.com/x");
        assert_eq!(pat.param_names, vec!["sub"]);
        assert!(matches!(&pat.tokens[0], Token::Param { host: true, .. }));
        assert!(matches!(&pat.tokens[1], Token::Static { text, host: true } if text == ".example.com"));
        assert!(matches!(&pat.tokens[2], Token::Static { text, host: false } if text == "/x"));
    }

    #[test]
    fn test_regex_gate_keeps_source() {
        let pat = parse(r"/users/{id:^\d+$}");
        match &pat.tokens[1] {
            Token::Param {
                gate: Some(gate), ..
            } => {
                assert_eq!(gate.source, r"^\d+$");
                assert!(gate.re.is_match("42"));
                assert!(!gate.re.is_match("42x"));
            }
            other => panic!("expected gated param, got {other:?}"),
        }
    }

    #[test]
    fn test_gate_must_cover_whole_segment() {
        let pat = parse(r"/v/{n:\d{2}}");
        match &pat.tokens[1] {
            Token::Param {
                gate: Some(gate), ..
            } => {
                assert!(gate.re.is_match("42"));
                // A bare `\d{2}` would also find a match inside "421";
                // the anchoring added at compile time rejects it.
                assert!(!gate.re.is_match("421"));
            }
            other => panic!("expected gated param, got {other:?}"),
        }
    }

    #[test]
    fn test_render_round_trip() {
        for p in [
            "/",
            "/users/{id}",
            r"/users/{id:^\d+$}/posts",
            "/files/*{rest}",
            r"/a/*{mid:[a-z/]+}/z",
            "{sub}.example.com/x/{y}",
            "/file-{name}.txt",
        ] {
            assert_eq!(parse(p).render(), p, "round trip of {p}");
        }
    }

    #[test]
    fn test_invalid_patterns() {
        for p in [
            "",
            "example.com",       // no path
            "/a//b",             // empty interior segment
            "example.com//x",    // empty leading path segment
            "/a/{",              // unterminated
            "/a/{}",             // empty name
            "/a/{x}/{x}",        // duplicate name
            "/a/}b",             // unmatched close
            "/a/*{x}b",          // wildcard not at boundary
            "*{x}.example.com/", // wildcard in host
            "exam ple.com/x",    // outside the hostname alphabet
            "/a/{x:}",           // empty regex
        ] {
            assert!(
                matches!(
                    Pattern::parse(p),
                    Err(RouterError::PatternInvalid { .. })
                ),
                "expected PatternInvalid for {p:?}"
            );
        }
    }

    #[test]
    fn test_bad_regex_fails_eagerly() {
        assert!(matches!(
            Pattern::parse("/a/{x:[}"),
            Err(RouterError::RegexCompile { .. })
        ));
    }

    #[test]
    fn test_literal_star_is_static() {
        let pat = parse("/a/*.json");
        assert!(pat.param_names.is_empty());
        assert!(matches!(&pat.tokens[0], Token::Static { text, .. } if text == "/a/*.json"));
    }
}
