use std::fmt;

use serde::{Deserialize, Serialize};

/// Globally unique zone identifier: source prefix plus source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// `PREFIX_part1_part2`, whitespace inside parts replaced by `_`.
    pub fn new<S: AsRef<str>>(prefix: &str, parts: &[S]) -> Self {
        let mut id = prefix.to_string();
        for part in parts {
            id.push('_');
            id.extend(part.as_ref().trim().chars().map(|c| if c.is_whitespace() { '_' } else { c }));
        }
        Self(id)
    }

    /// Like [`ZoneId::new`], dropping a trailing "0" part when more than one
    /// part is given, so a main campus is `UNI_<inst>` and a branch is
    /// `UNI_<inst>_<camp>`.
    pub fn without_zero_suffix<S: AsRef<str>>(prefix: &str, parts: &[S]) -> Self {
        match parts.split_last() {
            Some((last, rest)) if !rest.is_empty() && last.as_ref().trim() == "0" => Self::new(prefix, rest),
            _ => Self::new(prefix, parts),
        }
    }

    /// Wrap an id read back from an output file.
    pub fn from_raw(id: impl Into<String>) -> Self { Self(id.into()) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_underscores() {
        assert_eq!(ZoneId::new("IAL", &["DR 10-42"]).as_str(), "IAL_DR_10-42");
        assert_eq!(ZoneId::new("GOV", &["17"]).to_string(), "GOV_17");
    }

    #[test]
    fn zero_suffix_marks_main_campus() {
        assert_eq!(ZoneId::without_zero_suffix("UNI", &["141574", "0"]).as_str(), "UNI_141574");
        assert_eq!(ZoneId::without_zero_suffix("UNI", &["141574", "2"]).as_str(), "UNI_141574_2");
        assert_eq!(ZoneId::without_zero_suffix("UNI", &["0"]).as_str(), "UNI_0");
    }
}
