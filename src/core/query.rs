//! 查询文本：去除首尾空白后必须非空，构造后不可变

use std::fmt;

use crate::core::FailureReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(text: &str) -> Result<Self, FailureReason> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FailureReason::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims() {
        let q = Query::new("  Imagine \n").unwrap();
        assert_eq!(q.as_str(), "Imagine");
    }

    #[test]
    fn test_query_rejects_blank() {
        assert_eq!(Query::new("   "), Err(FailureReason::EmptyQuery));
        assert_eq!(Query::new(""), Err(FailureReason::EmptyQuery));
    }
}
