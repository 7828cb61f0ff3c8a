// pattern.rs
//! The compiled pattern token type and the immutable cursor over a token
//! sequence that the planner walks.

use crate::error::GlobError;
use crate::patterns::segment::SegmentMatcher;
use crate::platform::{is_drive_token, Platform};
use once_cell::sync::OnceCell;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// One compiled path portion of a glob pattern
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A literal segment, matched by name. `""` marks a separator boundary
    /// at the root or a trailing slash; `"."` and `".."` keep their
    /// filesystem meaning.
    Lit(String),
    /// A wildcard segment compiled to a name matcher
    Rx(SegmentMatcher),
    /// The `**` sentinel
    GlobStar,
}

impl Token {
    pub fn as_lit(&self) -> Option<&str> {
        match self {
            Token::Lit(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_globstar(&self) -> bool {
        matches!(self, Token::GlobStar)
    }
}

/// An immutable cursor over a compiled token sequence.
///
/// Sibling cursors derived from the same pattern share the token list;
/// `rest()` is memoized so repeated projection returns the same cursor.
/// The only mutable state is the one-shot `follow_globstar` bit, which
/// models the rule that a non-leading `**` may traverse at most one
/// symbolic link unless `follow` is configured globally.
pub struct Pattern {
    tokens: Arc<Vec<Token>>,
    glob_parts: Arc<Vec<String>>,
    index: usize,
    platform: Platform,
    is_absolute: bool,
    is_drive: bool,
    is_unc: bool,
    rest: OnceCell<Option<Arc<Pattern>>>,
    follow_globstar: AtomicBool,
    glob_string: OnceCell<String>,
}

impl Pattern {
    /// Wraps a compiled token list, normalizing any absolute root head.
    ///
    /// After normalization the root, if any, is the sole token at position
    /// zero and carries a trailing `/`: a POSIX head `["", ...]` becomes
    /// `["/", ...]`, a drive head `["C:", ...]` becomes `["C:/", ...]`, and
    /// a UNC head `["", "", host, share, ...]` collapses into
    /// `["//host/share/", ...]`.
    pub fn new(
        mut tokens: Vec<Token>,
        mut glob_parts: Vec<String>,
        platform: Platform,
    ) -> Result<Arc<Pattern>, GlobError> {
        if tokens.is_empty() {
            return Err(GlobError::InvalidPattern("empty pattern".into()));
        }
        if tokens.len() != glob_parts.len() {
            return Err(GlobError::InvalidPattern(
                "token and glob part lists differ in length".into(),
            ));
        }

        let is_unc = platform.is_windows()
            && tokens.len() >= 4
            && tokens[0].as_lit() == Some("")
            && tokens[1].as_lit() == Some("")
            && tokens[2].as_lit().is_some_and(|s| !s.is_empty())
            && tokens[3].as_lit().is_some_and(|s| !s.is_empty());
        let is_drive = platform.is_windows()
            && tokens[0].as_lit().is_some_and(is_drive_token);
        let is_absolute =
            (tokens[0].as_lit() == Some("") && tokens.len() > 1) || is_drive || is_unc;

        if is_unc {
            let host = tokens[2].as_lit().unwrap_or_default().to_string();
            let share = tokens[3].as_lit().unwrap_or_default().to_string();
            let root = format!("//{}/{}/", host, share);
            let groot = format!("//{}/{}/", glob_parts[2], glob_parts[3]);
            tokens.splice(0..4, [Token::Lit(root)]);
            glob_parts.splice(0..4, [groot]);
            if tokens.get(1).and_then(Token::as_lit) == Some("") {
                tokens.remove(1);
                glob_parts.remove(1);
            }
        } else if is_drive || is_absolute {
            let root = if is_drive {
                format!("{}/", tokens[0].as_lit().unwrap_or_default())
            } else {
                "/".to_string()
            };
            let groot = if is_drive {
                format!("{}/", glob_parts[0])
            } else {
                "/".to_string()
            };
            tokens[0] = Token::Lit(root);
            glob_parts[0] = groot;
            if tokens.get(1).and_then(Token::as_lit) == Some("") {
                tokens.remove(1);
                glob_parts.remove(1);
            }
        }

        Ok(Arc::new(Pattern {
            tokens: Arc::new(tokens),
            glob_parts: Arc::new(glob_parts),
            index: 0,
            platform,
            is_absolute,
            is_drive,
            is_unc,
            rest: OnceCell::new(),
            follow_globstar: AtomicBool::new(true),
            glob_string: OnceCell::new(),
        }))
    }

    /// The current token
    pub fn pattern(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// The cursor at the next index, or `None` at the last token.
    /// Memoized; absoluteness flags propagate from the parent.
    pub fn rest(&self) -> Option<Arc<Pattern>> {
        self.rest
            .get_or_init(|| {
                if self.index + 1 >= self.tokens.len() {
                    return None;
                }
                Some(Arc::new(Pattern {
                    tokens: Arc::clone(&self.tokens),
                    glob_parts: Arc::clone(&self.glob_parts),
                    index: self.index + 1,
                    platform: self.platform,
                    is_absolute: self.is_absolute,
                    is_drive: self.is_drive,
                    is_unc: self.is_unc,
                    rest: OnceCell::new(),
                    follow_globstar: AtomicBool::new(true),
                    glob_string: OnceCell::new(),
                }))
            })
            .clone()
    }

    pub fn has_more(&self) -> bool {
        self.index + 1 < self.tokens.len()
    }

    /// Whether any remaining token is non-literal
    pub fn has_magic(&self) -> bool {
        self.tokens[self.index..]
            .iter()
            .any(|t| !matches!(t, Token::Lit(_)))
    }

    /// The root literal when this cursor sits at index zero of an absolute
    /// pattern
    pub fn root(&self) -> Option<&str> {
        if self.index == 0 && self.is_absolute {
            self.tokens[0].as_lit()
        } else {
            None
        }
    }

    /// The `/`-joined textual tail, used as a stable fingerprint
    pub fn glob_string(&self) -> &str {
        self.glob_string.get_or_init(|| {
            if self.index == 0 && self.is_absolute {
                // the root part already ends in `/`
                format!("{}{}", self.glob_parts[0], self.glob_parts[1..].join("/"))
            } else {
                self.glob_parts[self.index..].join("/")
            }
        })
    }

    /// True iff this cursor is non-leading, sits on `**`, and the one-shot
    /// follow bit is still set
    pub fn check_follow_globstar(&self) -> bool {
        self.index != 0
            && self.pattern().is_globstar()
            && self.follow_globstar.load(Ordering::SeqCst)
    }

    /// Consumes the one-shot follow bit, returning whether it was set
    pub fn mark_follow_globstar(&self) -> bool {
        if self.index == 0 || !self.pattern().is_globstar() {
            return false;
        }
        self.follow_globstar.swap(false, Ordering::SeqCst)
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    pub fn is_drive(&self) -> bool {
        self.is_drive
    }

    pub fn is_unc(&self) -> bool {
        self.is_unc
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The remaining tokens from the cursor position onward
    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens[self.index..]
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("glob", &self.glob_string())
            .field("index", &self.index)
            .field("is_absolute", &self.is_absolute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(parts: &[&str]) -> (Vec<Token>, Vec<String>) {
        (
            parts.iter().map(|s| Token::Lit(s.to_string())).collect(),
            parts.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_posix_root_normalization() {
        let (t, g) = lits(&["", "a", "b"]);
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        assert!(p.is_absolute());
        assert_eq!(p.root(), Some("/"));
        assert_eq!(p.glob_string(), "/a/b");
    }

    #[test]
    fn test_trailing_empty_after_root_removed() {
        // `//` parses to ["", ""]: root plus a trailing slash marker
        let (t, g) = lits(&["", "", "a"]);
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        assert_eq!(p.root(), Some("/"));
        assert_eq!(p.pattern().as_lit(), Some("/"));
        assert_eq!(p.rest().unwrap().pattern().as_lit(), Some("a"));
        assert!(!p.rest().unwrap().has_more());
    }

    #[test]
    fn test_drive_root_normalization() {
        let (t, g) = lits(&["C:", "x"]);
        let p = Pattern::new(t, g, Platform::Win32).unwrap();
        assert!(p.is_absolute());
        assert!(p.is_drive());
        assert_eq!(p.root(), Some("C:/"));
    }

    #[test]
    fn test_unc_root_normalization() {
        let (t, g) = lits(&["", "", "host", "share", "x"]);
        let p = Pattern::new(t, g, Platform::Win32).unwrap();
        assert!(p.is_unc());
        assert_eq!(p.root(), Some("//host/share/"));
        assert_eq!(p.rest().unwrap().pattern().as_lit(), Some("x"));
    }

    #[test]
    fn test_not_absolute_on_posix_drive_shape() {
        let (t, g) = lits(&["C:", "x"]);
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        assert!(!p.is_absolute());
        assert_eq!(p.root(), None);
    }

    #[test]
    fn test_rest_memoized_and_propagates() {
        let (t, g) = lits(&["", "a", "b"]);
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        let r1 = p.rest().unwrap();
        let r2 = p.rest().unwrap();
        assert!(Arc::ptr_eq(&r1, &r2));
        assert!(r1.is_absolute());
        assert_eq!(r1.root(), None);
        assert_eq!(r1.glob_string(), "a/b");
    }

    #[test]
    fn test_follow_globstar_one_shot() {
        let t = vec![
            Token::Lit("a".into()),
            Token::GlobStar,
            Token::Lit("b".into()),
        ];
        let g = vec!["a".to_string(), "**".to_string(), "b".to_string()];
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        // leading cursor is not a globstar at all
        assert!(!p.check_follow_globstar());
        assert!(!p.mark_follow_globstar());

        let gs = p.rest().unwrap();
        assert!(gs.pattern().is_globstar());
        assert!(gs.check_follow_globstar());
        assert!(gs.mark_follow_globstar());
        assert!(!gs.check_follow_globstar());
        assert!(!gs.mark_follow_globstar());
    }

    #[test]
    fn test_leading_globstar_never_follows() {
        let t = vec![Token::GlobStar, Token::Lit("x".into())];
        let g = vec!["**".to_string(), "x".to_string()];
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        assert!(!p.check_follow_globstar());
        assert!(!p.mark_follow_globstar());
    }

    #[test]
    fn test_has_magic_remaining() {
        let t = vec![Token::Lit("a".into()), Token::GlobStar];
        let g = vec!["a".to_string(), "**".to_string()];
        let p = Pattern::new(t, g, Platform::Posix).unwrap();
        assert!(p.has_magic());
        let r = p.rest().unwrap();
        assert!(r.has_magic());
    }
}
