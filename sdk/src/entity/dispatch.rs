//! Naming-convention resolution for name-based calls.
//!
//! `get_<attr>` / `set_<attr>` map onto attribute access and
//! `find_by_<attr>` / `find_first_by_<attr>` onto finders. Each call site
//! resolves the name once and matches on the result.

const GET_PREFIX: &str = "get_";
const SET_PREFIX: &str = "set_";
const FIND_BY_PREFIX: &str = "find_by_";
const FIND_FIRST_BY_PREFIX: &str = "find_first_by_";

/// Resolution of an instance method name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor<'a> {
    Get(&'a str),
    Set(&'a str),
    /// Not an accessor; try the record's own methods
    Method(&'a str),
}

/// Resolution of a finder method name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderCall<'a> {
    FindBy(&'a str),
    FindFirstBy(&'a str),
    Unmatched,
}

fn attribute_after<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix).filter(|attr| !attr.is_empty())
}

pub fn resolve_accessor(name: &str) -> Accessor<'_> {
    if let Some(attr) = attribute_after(name, GET_PREFIX) {
        Accessor::Get(attr)
    } else if let Some(attr) = attribute_after(name, SET_PREFIX) {
        Accessor::Set(attr)
    } else {
        Accessor::Method(name)
    }
}

pub fn resolve_finder(name: &str) -> FinderCall<'_> {
    if let Some(attr) = attribute_after(name, FIND_FIRST_BY_PREFIX) {
        FinderCall::FindFirstBy(attr)
    } else if let Some(attr) = attribute_after(name, FIND_BY_PREFIX) {
        FinderCall::FindBy(attr)
    } else {
        FinderCall::Unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert_eq!(resolve_accessor("get_title"), Accessor::Get("title"));
        assert_eq!(resolve_accessor("set_field_tags"), Accessor::Set("field_tags"));
        assert_eq!(resolve_accessor("label"), Accessor::Method("label"));
        assert_eq!(resolve_accessor("get_"), Accessor::Method("get_"));
        assert_eq!(resolve_accessor("getter"), Accessor::Method("getter"));
    }

    #[test]
    fn finders() {
        assert_eq!(resolve_finder("find_by_status"), FinderCall::FindBy("status"));
        assert_eq!(
            resolve_finder("find_first_by_title"),
            FinderCall::FindFirstBy("title")
        );
        assert_eq!(resolve_finder("find_by_"), FinderCall::Unmatched);
        assert_eq!(resolve_finder("find_all"), FinderCall::Unmatched);
    }
}
