//! Pre-scan of a user template for the data a caller must load.

use crate::directive::{directives, Directive, Field};

/// Optional data a template reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    pub notes: bool,
    pub source: bool,
    pub decorate: bool,
}

/// Reports which optional data `template` needs without expanding it.
/// Directives that fail to parse are skipped.
///
/// ```rust
/// use commitfmt::userformat_find_requirements;
///
/// let found = userformat_find_requirements("%h%d %s%n%N");
/// assert!(found.notes && found.decorate && !found.source);
/// ```
pub fn userformat_find_requirements(template: &str) -> Requirements {
    let mut found = Requirements::default();
    for parsed in directives(template.as_bytes()) {
        match parsed.directive {
            Directive::Field(Field::Notes) => found.notes = true,
            Directive::Field(Field::Source) => found.source = true,
            Directive::Field(Field::Decorations { .. }) => found.decorate = true,
            _ => {}
        }
    }
    found
}
