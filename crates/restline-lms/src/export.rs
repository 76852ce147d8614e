//! Asynchronous report export: discovery, job start, token-paged results

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use restline_core::{Credential, HttpRequest, Transport, retry_transient};

use crate::error::ExtractError;
use crate::page::{CallCounter, PageRequest, Record};

/// Report listing is a single page of at most this many entries
const REPORT_LIST_COUNT: usize = 500;

/// A started export and where its result paging currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub report_id: String,
    pub execution_id: String,
    pub next_token: Option<String>,
}

#[derive(Deserialize)]
struct ReportList {
    #[serde(default)]
    data: Vec<ReportEntry>,
}

#[derive(Deserialize)]
struct ReportEntry {
    #[serde(rename = "idReport")]
    id_report: Option<Value>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct ExportStarted {
    data: ExportStartedData,
}

#[derive(Deserialize)]
struct ExportStartedData {
    #[serde(rename = "executionId")]
    execution_id: Value,
}

#[derive(Deserialize)]
struct ResultsPage {
    #[serde(default)]
    data: Vec<Record>,
    #[serde(rename = "nextToken", default)]
    next_token: Option<String>,
}

/// Identifiers arrive as strings or numbers depending on the tenant
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct ExportJobClient<'a> {
    transport: &'a dyn Transport,
    base_url: String,
    page_size: usize,
    retry_backoff: Duration,
}

impl<'a> ExportJobClient<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        base_url: &str,
        page_size: usize,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            retry_backoff,
        }
    }

    fn reports_url(&self) -> String {
        format!("{}/analytics/v1/reports", self.base_url)
    }

    /// Identifier of the report whose name matches exactly
    pub fn find_report_id(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<String, ExtractError> {
        let request = HttpRequest::get(self.reports_url())
            .query("count", REPORT_LIST_COUNT)
            .bearer(credential.bearer());
        let reply = self.transport.execute(&request)?;
        if !reply.is_success() {
            return Err(reply.error().into());
        }
        let list: ReportList = reply.json()?;
        log::debug!("Report listing returned {} entries", list.data.len());
        list.data
            .iter()
            .filter(|r| r.name.as_deref() == Some(name))
            .find_map(|r| r.id_report.as_ref().and_then(id_string))
            .ok_or_else(|| ExtractError::ReportNotFound(name.to_string()))
    }

    /// Trigger CSV export generation; returns the execution identifier
    pub fn start_export(
        &self,
        credential: &Credential,
        report_id: &str,
    ) -> Result<String, ExtractError> {
        let url = format!("{}/{report_id}/export/csv", self.reports_url());
        let reply = self
            .transport
            .execute(&HttpRequest::get(url).bearer(credential.bearer()))?;
        if !reply.is_success() {
            return Err(reply.error().into());
        }
        let started: ExportStarted = reply.json()?;
        id_string(&started.data.execution_id).ok_or_else(|| {
            ExtractError::Protocol(format!(
                "export start for report {report_id} returned no executionId"
            ))
        })
    }

    /// Find the named report and start its export
    pub fn start(&self, credential: &Credential, report_name: &str) -> Result<ExportJob, ExtractError> {
        let report_id = self.find_report_id(credential, report_name)?;
        let execution_id = self.start_export(credential, &report_id)?;
        log::info!("Report ID: {report_id}, Export ID: {execution_id}");
        Ok(ExportJob {
            report_id,
            execution_id,
            next_token: None,
        })
    }

    /// One page of export results, returning its records and the token for
    /// the next page (absent once results are exhausted).
    ///
    /// A 400 means the results are not ready: the same page and token are
    /// requested again after the backoff, with no cap on attempts.
    pub fn fetch_page(
        &self,
        credential: &Credential,
        calls: &CallCounter,
        job: &ExportJob,
        request: &PageRequest,
    ) -> Result<(Vec<Record>, Option<String>), ExtractError> {
        let url = format!(
            "{}/{}/exports/{}/results",
            self.reports_url(),
            job.report_id,
            job.execution_id
        );
        let label = format!("export page {}", request.page);

        retry_transient(
            &label,
            self.retry_backoff,
            || {
                let mut http = HttpRequest::get(&url)
                    .query("pageSize", request.page_size)
                    .query("page", request.page)
                    .bearer(credential.bearer());
                if let Some(token) = &request.continuation {
                    http = http.query("nextToken", token);
                }
                calls.incr();
                let reply = self.transport.execute(&http)?;
                if !reply.is_success() {
                    return Err(ExtractError::ExportFetch {
                        page: request.page,
                        source: reply.error(),
                    });
                }
                let page: ResultsPage = reply.json()?;
                let next = page.next_token.filter(|t| !t.is_empty());
                Ok((page.data, next))
            },
            ExtractError::is_transient,
        )
    }

    /// Page through all results, appending to `dataset`. Returns pages read.
    pub fn collect(
        &self,
        credential: &Credential,
        calls: &CallCounter,
        job: &mut ExportJob,
        dataset: &mut Vec<Record>,
    ) -> Result<usize, ExtractError> {
        let mut page = 1usize;
        loop {
            let request = PageRequest::token(page, self.page_size, job.next_token.clone());
            let (records, next) = self.fetch_page(credential, calls, job, &request)?;
            log::info!("Fetched {} records for page {page}", records.len());
            dataset.extend(records);
            job.next_token = next;
            if job.next_token.is_none() {
                return Ok(page);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restline_core::HttpReply;
    use restline_core::http::testing::MockTransport;
    use serde_json::json;

    const BASE: &str = "https://lms.example.com";

    fn client(transport: &MockTransport) -> ExportJobClient<'_> {
        ExportJobClient::new(transport, BASE, 1000, Duration::ZERO)
    }

    fn job() -> ExportJob {
        ExportJob {
            report_id: "r-1".into(),
            execution_id: "e-9".into(),
            next_token: None,
        }
    }

    fn records(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"user": i})).collect()
    }

    #[test]
    fn find_report_by_exact_name() {
        let body = json!({"data": [
            {"idReport": "a", "name": "User_Awards"},
            {"idReport": "b", "name": "User_Awards_API"},
        ]});
        let transport = MockTransport::sequence(vec![HttpReply::new(200, body.to_string())]);
        let id = client(&transport)
            .find_report_id(&Credential::new("t"), "User_Awards_API")
            .unwrap();
        assert_eq!(id, "b");
        let req = &transport.calls()[0];
        assert_eq!(req.url, "https://lms.example.com/analytics/v1/reports");
        assert_eq!(req.query_value("count"), Some("500"));
    }

    #[test]
    fn numeric_report_id_is_stringified() {
        let body = json!({"data": [{"idReport": 17, "name": "R"}]});
        let transport = MockTransport::sequence(vec![HttpReply::new(200, body.to_string())]);
        let id = client(&transport).find_report_id(&Credential::new("t"), "R").unwrap();
        assert_eq!(id, "17");
    }

    #[test]
    fn missing_report_is_fatal() {
        let body = json!({"data": [{"idReport": "a", "name": "Other"}]});
        let transport = MockTransport::sequence(vec![HttpReply::new(200, body.to_string())]);
        let err = client(&transport)
            .find_report_id(&Credential::new("t"), "User_Awards_API")
            .unwrap_err();
        assert!(matches!(err, ExtractError::ReportNotFound(n) if n == "User_Awards_API"));
    }

    #[test]
    fn start_export_reads_execution_id() {
        let transport = MockTransport::sequence(vec![HttpReply::new(
            200,
            r#"{"data":{"executionId":"exec-42"}}"#,
        )]);
        let exec = client(&transport)
            .start_export(&Credential::new("t"), "r-1")
            .unwrap();
        assert_eq!(exec, "exec-42");
        assert_eq!(
            transport.calls()[0].url,
            "https://lms.example.com/analytics/v1/reports/r-1/export/csv"
        );
    }

    #[test]
    fn two_pages_then_exhausted() {
        let transport = MockTransport::sequence(vec![
            HttpReply::new(200, json!({"data": records(10), "nextToken": "abc"}).to_string()),
            HttpReply::new(200, json!({"data": records(5)}).to_string()),
        ]);
        let calls = CallCounter::new();
        let mut job = job();
        let mut dataset = Vec::new();
        let pages = client(&transport)
            .collect(&Credential::new("t"), &calls, &mut job, &mut dataset)
            .unwrap();

        assert_eq!(pages, 2);
        assert_eq!(dataset.len(), 15);
        assert_eq!(calls.get(), 2);
        assert_eq!(transport.call_count(), 2);
        assert_eq!(job.next_token, None);

        let reqs = transport.calls();
        assert_eq!(
            reqs[0].url,
            "https://lms.example.com/analytics/v1/reports/r-1/exports/e-9/results"
        );
        assert_eq!(reqs[0].query_value("page"), Some("1"));
        assert_eq!(reqs[0].query_value("pageSize"), Some("1000"));
        assert_eq!(reqs[0].query_value("nextToken"), None);
        assert_eq!(reqs[1].query_value("page"), Some("2"));
        assert_eq!(reqs[1].query_value("nextToken"), Some("abc"));
    }

    #[test]
    fn repeated_400_retries_same_page_and_token() {
        let transport = MockTransport::sequence(vec![
            HttpReply::new(200, json!({"data": records(1), "nextToken": "t1"}).to_string()),
            HttpReply::new(400, "not ready"),
            HttpReply::new(400, "not ready"),
            HttpReply::new(400, "not ready"),
            HttpReply::new(200, json!({"data": records(2)}).to_string()),
        ]);
        let calls = CallCounter::new();
        let mut job = job();
        let mut dataset = Vec::new();
        let pages = client(&transport)
            .collect(&Credential::new("t"), &calls, &mut job, &mut dataset)
            .unwrap();

        assert_eq!(pages, 2);
        assert_eq!(dataset.len(), 3);
        assert_eq!(calls.get(), 5);
        for req in &transport.calls()[1..] {
            assert_eq!(req.query_value("page"), Some("2"));
            assert_eq!(req.query_value("nextToken"), Some("t1"));
        }
    }

    #[test]
    fn non_400_failure_is_fatal() {
        let transport = MockTransport::sequence(vec![HttpReply::new(503, "down")]);
        let calls = CallCounter::new();
        let mut dataset = Vec::new();
        let err = client(&transport)
            .collect(&Credential::new("t"), &calls, &mut job(), &mut dataset)
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExportFetch { page: 1, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn empty_token_means_exhausted() {
        let transport = MockTransport::sequence(vec![HttpReply::new(
            200,
            json!({"data": records(3), "nextToken": ""}).to_string(),
        )]);
        let calls = CallCounter::new();
        let mut dataset = Vec::new();
        let pages = client(&transport)
            .collect(&Credential::new("t"), &calls, &mut job(), &mut dataset)
            .unwrap();
        assert_eq!(pages, 1);
        assert_eq!(dataset.len(), 3);
    }
}
