use std::fmt;

/// How a cached object is materialized in the workspace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CheckoutStrategy {
    /// The workspace path becomes a link to the immutable cache object.
    /// Repeated checkouts of the same checksum share storage.
    #[default]
    Link,
    /// The workspace path becomes an independent, writable duplicate of
    /// the cache object's bytes.
    Copy,
}

impl fmt::Display for CheckoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_link() {
        assert_eq!(CheckoutStrategy::default(), CheckoutStrategy::Link);
    }

    #[test]
    fn display() {
        assert_eq!(CheckoutStrategy::Link.to_string(), "link");
        assert_eq!(CheckoutStrategy::Copy.to_string(), "copy");
    }
}
