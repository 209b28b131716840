//! Element attributes: charset, collation, comments, checks, and
//! dialect-specific extensions.

/// A CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Constraint name.
    pub name: String,
    /// Boolean clause text.
    pub clause: String,
    /// Whether the constraint is enforced.
    pub enforced: bool,
}

impl Check {
    /// Create an unenforced check constraint.
    pub fn new(name: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clause: clause.into(),
            enforced: false,
        }
    }

    /// Mark the constraint as enforced.
    pub fn enforced(mut self) -> Self {
        self.enforced = true;
        self
    }
}

/// An attribute attached to a realm, schema, table or column.
///
/// Recognized kinds are diffed by the generic engine; `Custom` attributes
/// pass through to the dialect comparator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr {
    /// Character set.
    Charset(String),
    /// Collation.
    Collation(String),
    /// Free-text comment.
    Comment(String),
    /// CHECK constraint.
    Check(Check),
    /// Dialect-specific attribute, compared only by the dialect.
    Custom {
        /// Attribute key, unique per element and dialect.
        key: String,
        /// Attribute value.
        value: String,
    },
}

/// Attribute kind discriminator used by the diff protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// Character set.
    Charset,
    /// Collation.
    Collation,
    /// Comment.
    Comment,
    /// CHECK constraint.
    Check,
    /// Dialect-specific attribute.
    Custom,
}

impl Attr {
    /// The kind of this attribute.
    pub fn kind(&self) -> AttrKind {
        match self {
            Attr::Charset(_) => AttrKind::Charset,
            Attr::Collation(_) => AttrKind::Collation,
            Attr::Comment(_) => AttrKind::Comment,
            Attr::Check(_) => AttrKind::Check,
            Attr::Custom { .. } => AttrKind::Custom,
        }
    }
}

/// Find the charset attribute, if present.
pub fn charset(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Charset(v) => Some(v.as_str()),
        _ => None,
    })
}

/// Find the collation attribute, if present.
pub fn collation(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Collation(v) => Some(v.as_str()),
        _ => None,
    })
}

/// Find the comment attribute, if present.
pub fn comment(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Comment(v) => Some(v.as_str()),
        _ => None,
    })
}

/// All check constraints, in declaration order.
pub fn checks(attrs: &[Attr]) -> impl Iterator<Item = &Check> {
    attrs.iter().filter_map(|a| match a {
        Attr::Check(c) => Some(c),
        _ => None,
    })
}

/// All dialect-specific attributes, in declaration order.
pub fn customs(attrs: &[Attr]) -> impl Iterator<Item = &Attr> {
    attrs.iter().filter(|a| matches!(a, Attr::Custom { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_kinds() {
        assert_eq!(Attr::Charset("utf8".into()).kind(), AttrKind::Charset);
        assert_eq!(Attr::Collation("latin1".into()).kind(), AttrKind::Collation);
        assert_eq!(Attr::Comment("c".into()).kind(), AttrKind::Comment);
        assert_eq!(Attr::Check(Check::new("c", "x > 0")).kind(), AttrKind::Check);
        assert_eq!(
            Attr::Custom {
                key: "engine".into(),
                value: "InnoDB".into()
            }
            .kind(),
            AttrKind::Custom
        );
    }

    #[test]
    fn test_attr_lookup() {
        let attrs = vec![
            Attr::Charset("utf8".into()),
            Attr::Comment("users table".into()),
            Attr::Check(Check::new("chk", "c1 > 0").enforced()),
        ];

        assert_eq!(charset(&attrs), Some("utf8"));
        assert_eq!(collation(&attrs), None);
        assert_eq!(comment(&attrs), Some("users table"));
        assert_eq!(checks(&attrs).count(), 1);
        assert!(checks(&attrs).next().unwrap().enforced);
    }
}
