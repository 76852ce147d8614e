//! Single-page fetch against a directly paginated listing endpoint

use serde::Deserialize;

use restline_core::{Credential, HttpRequest, Transport};

use crate::page::{CallCounter, PageOutcome, PageRequest, PageResult, Record};

#[derive(Deserialize)]
struct ListingEnvelope {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    items: Vec<Record>,
    #[serde(default)]
    has_more_data: bool,
}

/// Stateless per call; safe to share across page workers.
pub struct PagedResourceFetcher<'a> {
    transport: &'a dyn Transport,
    endpoint: String,
}

impl<'a> PagedResourceFetcher<'a> {
    pub fn new(transport: &'a dyn Transport, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one page. Never fails: any transport error, non-2xx status or
    /// malformed body becomes `PageOutcome::Skipped`.
    pub fn fetch(
        &self,
        request: &PageRequest,
        credential: &Credential,
        calls: &CallCounter,
    ) -> PageOutcome {
        let page = request.page;
        let http = HttpRequest::get(&self.endpoint)
            .query("page_size", request.page_size)
            .query("page", page)
            .bearer(credential.bearer());

        calls.incr();
        let worker = rayon::current_thread_index().map_or("main".to_string(), |i| i.to_string());
        let skipped = |reason: String| {
            log::error!("[worker {worker}] Failed to retrieve page {page}: {reason}");
            PageOutcome::Skipped { page, reason }
        };

        let reply = match self.transport.execute(&http) {
            Ok(r) => r,
            Err(e) => return skipped(e.to_string()),
        };
        if !reply.is_success() {
            return skipped(format!("HTTP {}", reply.status));
        }
        match reply.json::<ListingEnvelope>() {
            Ok(body) => {
                log::debug!(
                    "[worker {worker}] Page {page}: {} items, has_more_data={}",
                    body.data.items.len(),
                    body.data.has_more_data
                );
                PageOutcome::Success(PageResult {
                    page,
                    records: body.data.items,
                    has_more: body.data.has_more_data,
                })
            }
            Err(e) => skipped(e.to_string()),
        }
    }
}
