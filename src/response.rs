use actix_web::HttpResponse;
use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Uniform `{success, message, data}` envelope.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
    })
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
    })
}

pub fn message(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> {
        success: true,
        message: message.into(),
        data: None,
    })
}

/// Resolved page window; always `page >= 1` and `1 <= limit <= MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: Page, total: i64) -> Self {
        let total = total.max(0);
        PaginationMeta {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: (total + page.limit - 1) / page.limit,
        }
    }
}

#[derive(Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Paginated {
            items,
            pagination: PaginationMeta::new(page, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        let page = Page::new(None, None);
        assert_eq!(page, Page { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, limit: 1 });
        assert_eq!(Page::new(Some(-3), Some(500)), Page { page: 1, limit: 100 });
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let page = Page::new(Some(i64::MAX), Some(10));
        assert_eq!(page.offset(), i64::MAX);
        assert!(page.offset() >= 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(Some(1), Some(10));
        assert_eq!(PaginationMeta::new(page, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(page, 1).total_pages, 1);
        assert_eq!(PaginationMeta::new(page, 10).total_pages, 1);
        assert_eq!(PaginationMeta::new(page, 11).total_pages, 2);
    }

    #[test]
    fn envelope_uses_camel_case_meta() {
        let body = Paginated::new(vec![1, 2], Page::new(Some(2), Some(2)), 5);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["pagination"]["totalPages"], 3);
        assert_eq!(json["items"], serde_json::json!([1, 2]));
    }
}
