//! Glob-like filters over dotted type names and free-text author names.
//!
//! Type name filters understand three shapes:
//!
//! - `/regex/` is used verbatim with the slashes stripped,
//! - a filter containing a dot is matched against the whole dotted name,
//!   where `?` is one non-dot character, `*` is any run of non-dot characters
//!   and `**` is anything at all,
//! - a filter without a dot is a short name, matching either the bare name or
//!   any fully qualified name ending in it.
//!
//! Author filters only know `?` (any character) and `*` (any run) and match
//! anywhere inside the candidate.

use regex::Regex;

use crate::error::{Result, TaggerError};

#[derive(Debug, Clone)]
pub struct TypeNameFilter {
    filter: String,
    regex: Regex,
}

impl TypeNameFilter {
    pub fn new(filter: &str) -> Result<Self> {
        let pattern = type_name_regex(filter);
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            TaggerError::InvalidFilter {
                filter: filter.to_string(),
                source,
            }
        })?;
        Ok(Self {
            filter: filter.to_string(),
            regex,
        })
    }

    pub fn accept(&self, type_name: Option<&str>) -> bool {
        if self.filter.trim().is_empty() {
            return false;
        }
        type_name.is_some_and(|name| self.regex.is_match(name))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }
}

#[derive(Debug, Clone)]
pub struct AuthorFilter {
    filter: String,
    regex: Regex,
}

impl AuthorFilter {
    pub fn new(filter: &str) -> Result<Self> {
        let regex =
            Regex::new(&author_regex(filter)).map_err(|source| TaggerError::InvalidFilter {
                filter: filter.to_string(),
                source,
            })?;
        Ok(Self {
            filter: filter.to_string(),
            regex,
        })
    }

    pub fn accept(&self, author: Option<&str>) -> bool {
        author.is_some_and(|name| self.regex.is_match(name))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Translates a type name filter into the regular expression it stands for.
pub fn type_name_regex(filter: &str) -> String {
    if let Some(raw) = strip_slashes(filter) {
        return raw.to_string();
    }

    if filter.contains('.') {
        let mut regex = String::from("^");
        let mut chars = filter.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '.' => regex.push_str("\\."),
                '?' => regex.push_str("[^.]"),
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    regex.push_str(".*");
                }
                '*' => regex.push_str("[^.]*"),
                other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        regex.push('$');
        regex
    } else {
        let mut regex = String::from("(.*\\.)?");
        for c in filter.chars() {
            match c {
                '?' => regex.push_str("[^.]"),
                '*' => regex.push_str("[^.]*"),
                other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        regex.push('$');
        regex
    }
}

/// Translates an author filter into an unanchored regular expression.
pub fn author_regex(filter: &str) -> String {
    if let Some(raw) = strip_slashes(filter) {
        return raw.to_string();
    }

    let mut regex = String::with_capacity(filter.len() * 2);
    for c in filter.chars() {
        match c {
            '?' => regex.push('.'),
            '*' => regex.push_str(".*"),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    regex
}

fn strip_slashes(filter: &str) -> Option<&str> {
    if filter.len() >= 2 {
        filter.strip_prefix('/')?.strip_suffix('/')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(filter: &str, name: &str) -> bool {
        TypeNameFilter::new(filter).unwrap().accept(Some(name))
    }

    #[test]
    fn short_name_filter_translates_jokers() {
        assert_eq!(type_name_regex("Cla??Name*"), "(.*\\.)?Cla[^.][^.]Name[^.]*$");
    }

    #[test]
    fn dotted_filter_translates_double_star_before_single_star() {
        assert_eq!(
            type_name_regex("package*.name?.**ClassName"),
            "^package[^.]*\\.name[^.]\\..*ClassName$"
        );
    }

    #[test]
    fn slash_enclosed_filter_is_passed_through() {
        assert_eq!(type_name_regex("/^a\\.b\\..*$/"), "^a\\.b\\..*$");
        assert_eq!(author_regex("/Will this remain?/"), "Will this remain?");
    }

    #[test]
    fn author_filter_translates_jokers() {
        assert_eq!(
            author_regex("Search? Term* With Multiple J*kers"),
            "Search. Term.* With Multiple J.*kers"
        );
    }

    #[test]
    fn null_input_is_never_accepted() {
        assert!(!TypeNameFilter::new("*").unwrap().accept(None));
        assert!(!AuthorFilter::new("*").unwrap().accept(None));
    }

    #[test]
    fn short_name_matches_bare_and_qualified_names() {
        assert!(accepts("Foo", "Foo"));
        assert!(accepts("Foo", "a.b.Foo"));
        assert!(!accepts("Foo", "a.b.BarFoo"));
        assert!(!accepts("Foo", "a.Foo.Bar"));
        assert!(accepts("Cla??Name*", "x.ClassNameTest"));
        assert!(!accepts("Cla??Name*", "x.Cla.sNameTest"));
    }

    #[test]
    fn dotted_filter_is_anchored_on_both_ends() {
        assert!(accepts("p.*", "p.C"));
        assert!(!accepts("p.*", "p.q.C"));
        assert!(accepts("p.**", "p.q.C"));
        assert!(!accepts("p.C", "q.p.C"));
        assert!(!accepts("p.C", "p.Cx"));
    }

    #[test]
    fn literal_dollar_in_nested_type_name_is_escaped() {
        assert!(accepts("a.Outer$Inner", "a.Outer$Inner"));
    }

    #[test]
    fn blank_type_filter_matches_nothing() {
        assert!(!accepts("", "p.C"));
        assert!(!accepts("   ", "C"));
    }

    #[test]
    fn author_filter_matches_anywhere() {
        let filter = AuthorFilter::new("Old*").unwrap();
        assert!(filter.accept(Some("Old Name")));
        assert!(filter.accept(Some("The Old One")));
        assert!(!filter.accept(Some("old name")));
    }

    #[test]
    fn invalid_raw_regex_is_reported() {
        let err = TypeNameFilter::new("/(unclosed/").unwrap_err();
        assert!(matches!(err, TaggerError::InvalidFilter { .. }));
    }
}
