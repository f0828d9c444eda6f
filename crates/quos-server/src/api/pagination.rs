use serde::Deserialize;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Common `limit`/`offset` query parameters with clamping: a limit that is
/// missing, non-positive, or above [`MAX_LIMIT`] becomes the default; a
/// negative offset becomes zero.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> u64 {
        match self.limit {
            Some(l) if l > 0 && l <= MAX_LIMIT as i64 => l as u64,
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> u64 {
        match self.offset {
            Some(o) if o >= 0 => o as u64,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>) -> PaginationParams {
        PaginationParams { limit, offset }
    }

    #[test]
    fn limit_is_clamped_to_default() {
        assert_eq!(params(None, None).limit(), DEFAULT_LIMIT);
        assert_eq!(params(Some(0), None).limit(), DEFAULT_LIMIT);
        assert_eq!(params(Some(-5), None).limit(), DEFAULT_LIMIT);
        assert_eq!(params(Some(101), None).limit(), DEFAULT_LIMIT);
        assert_eq!(params(Some(100), None).limit(), 100);
        assert_eq!(params(Some(1), None).limit(), 1);
    }

    #[test]
    fn negative_offset_becomes_zero() {
        assert_eq!(params(None, Some(-1)).offset(), 0);
        assert_eq!(params(None, None).offset(), 0);
        assert_eq!(params(None, Some(40)).offset(), 40);
    }
}
