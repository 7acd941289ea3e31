//! `GET /api/v1/packets`: the paged, filtered read path over
//! whatever `Store` the app was wired with.

use super::dto::PacketDto;
use super::AppState;
use crate::error::{Error, Result};
use crate::store::{SearchFilter, Store};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::instrument;

static CALLSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,6}(-[0-9]{1,2})?$").unwrap());

#[derive(Debug, Deserialize)]
pub struct PacketsQuery {
    pub sender: Option<String>,
    #[serde(rename = "type")]
    pub packet_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PacketsResponse {
    pub items: Vec<PacketDto>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Validate query parameters against the documented rules, returning the
/// normalized filter the store expects.
fn validate(params: PacketsQuery) -> Result<SearchFilter> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(Error::validation("page", "must be >= 1"));
    }
    let page_size = params.page_size.unwrap_or(100);
    if !(1..=1000).contains(&page_size) {
        return Err(Error::validation("pageSize", "must be between 1 and 1000"));
    }
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(Error::validation("from", "must be <= to"));
        }
    }

    let sender = match params.sender {
        Some(sender) => {
            if sender.len() > 15 {
                return Err(Error::validation("sender", "must be at most 15 characters"));
            }
            // The 15-char cap above keeps this pattern's backtracking
            // bounded regardless of input.
            if !CALLSIGN_RE.is_match(&sender) {
                return Err(Error::validation(
                    "sender",
                    "must match ^[A-Z0-9]{1,6}(-[0-9]{1,2})?$",
                ));
            }
            Some(sender)
        }
        None => None,
    };

    let packet_type = params
        .packet_type
        .map(|s| s.parse())
        .transpose()
        .map_err(|_: Error| Error::validation("type", "unrecognized packet type"))?;

    Ok(SearchFilter {
        sender,
        packet_type,
        from: params.from,
        to: params.to,
        page,
        page_size,
    }
    .normalized())
}

#[instrument(skip(state))]
pub async fn search_packets(
    State(state): State<AppState>,
    Query(params): Query<PacketsQuery>,
) -> impl IntoResponse {
    match validate(params) {
        Ok(filter) => {
            let page = filter.page;
            let page_size = filter.page_size;
            match state.store.search(filter).await {
                Ok(result) => {
                    let total_pages = (result.total_count + page_size as i64 - 1) / page_size as i64;
                    let response = PacketsResponse {
                        items: result.items.iter().map(PacketDto::from).collect(),
                        page,
                        page_size,
                        total_count: result.total_count,
                        total_pages,
                        has_next: (page as i64) < total_pages,
                        has_prev: page > 1,
                    };
                    Json(response).into_response()
                }
                Err(e) => e.into_response(),
            }
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PacketsQuery {
        PacketsQuery {
            sender: None,
            packet_type: None,
            from: None,
            to: None,
            page: None,
            page_size: None,
        }
    }

    #[test]
    fn defaults_to_page_one_and_size_100() {
        let filter = validate(params()).unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 100);
    }

    #[test]
    fn rejects_page_size_out_of_range() {
        let mut p = params();
        p.page_size = Some(0);
        assert!(validate(p).is_err());
        let mut p = params();
        p.page_size = Some(1001);
        assert!(validate(p).is_err());
    }

    #[test]
    fn rejects_from_after_to() {
        let mut p = params();
        p.from = Some(Utc::now());
        p.to = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(validate(p).is_err());
    }

    #[test]
    fn rejects_sender_not_matching_callsign_shape() {
        let mut p = params();
        p.sender = Some("not a callsign!!".to_string());
        assert!(validate(p).is_err());
    }

    #[test]
    fn accepts_sender_with_ssid() {
        let mut p = params();
        p.sender = Some("KF6ABC-9".to_string());
        assert!(validate(p).is_ok());
    }

    #[test]
    fn rejects_unrecognized_packet_type() {
        let mut p = params();
        p.packet_type = Some("not_a_type".to_string());
        assert!(validate(p).is_err());
    }
}
