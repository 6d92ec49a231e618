// src/common/pagination.rs

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Maior página cujo OFFSET ainda cabe em i64.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// `page` começa em 1 e vai até `MAX_PAGE`; `page_size` é limitado a [1, 100].
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            0
        } else {
            (total_count + self.page_size - 1) / self.page_size
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: ToSchema> {
    pub records: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    /// Cursor para a próxima página (estável sob inserções concorrentes).
    pub next_cursor: Option<String>,
}

impl<T: ToSchema> Page<T> {
    pub fn new(records: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            records,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages: request.total_pages(total_count),
            next_cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.next_cursor = cursor;
        self
    }
}

/// Posição na ordenação `(data_referencia DESC, id DESC)` do histórico.
/// Formato: `YYYY-MM-DD_<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub date: NaiveDate,
    pub id: Uuid,
}

impl HistoryCursor {
    pub fn encode(&self) -> String {
        format!("{}_{}", self.date.format("%Y-%m-%d"), self.id)
    }

    pub fn decode(raw: &str) -> Result<Self, AppError> {
        let invalid = || AppError::field("cursor", "Cursor inválido.");

        let (date, id) = raw.split_once('_').ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;

        Ok(Self { date, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        let default = PageRequest::new(None, None);
        assert_eq!(default, PageRequest { page: 1, page_size: 20 });
        assert_eq!(default.offset(), 0);

        let clamped = PageRequest::new(Some(0), Some(1000));
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, MAX_PAGE_SIZE);

        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let req = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert_eq!(req.page, MAX_PAGE);
        assert!(req.offset() > 0);

        let req = PageRequest::new(Some(i64::MIN), None);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::new(Some(1), Some(20));
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(20), 1);
        assert_eq!(req.total_pages(21), 2);
    }

    #[test]
    fn cursor_encodes_and_rejects_garbage() {
        let cursor = HistoryCursor {
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            id: Uuid::new_v4(),
        };
        assert_eq!(HistoryCursor::decode(&cursor.encode()).unwrap(), cursor);

        assert!(HistoryCursor::decode("2025-02-30_00000000-0000-0000-0000-000000000000").is_err());
        assert!(HistoryCursor::decode("lixo").is_err());
    }
}
