//! Notice endpoints used by the bell and the unread badge.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use notice_core::error::NoticeResult;

use crate::client::ApiClient;
use crate::response::ApiResponse;

/// A notice as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: i64,
    pub title: String,
    /// 1 = notice, 2 = announcement.
    #[serde(rename = "type", default)]
    pub notice_type: Option<i32>,
    #[serde(default)]
    pub content: Option<String>,
    /// 0 = closed, 1 = published.
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub create_by: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    /// Whether the current user has read it. Only set by `latest`.
    #[serde(default)]
    pub read: Option<bool>,
}

impl Notice {
    pub fn category_label(&self) -> &'static str {
        match self.notice_type {
            Some(1) => "notice",
            _ => "announcement",
        }
    }

    pub fn is_read(&self) -> bool {
        self.read.unwrap_or(false)
    }

    /// Parse `createTime`, which the server sends as a local timestamp.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        let raw = self.create_time.as_deref()?;
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

impl ApiClient {
    /// Most recent published notices, with the caller's read state.
    pub async fn latest_notices(&self) -> NoticeResult<Vec<Notice>> {
        let resp: ApiResponse<Vec<Notice>> = self.get_json("/system/notice/latest").await?;
        Ok(resp.into_result()?.unwrap_or_default())
    }

    /// Number of published notices the caller has not read.
    pub async fn unread_count(&self) -> NoticeResult<u64> {
        let resp: ApiResponse<u64> = self.get_json("/system/notice/unread-count").await?;
        Ok(resp.into_result()?.unwrap_or(0))
    }

    /// Mark a notice as read for the caller.
    pub async fn mark_notice_read(&self, id: i64) -> NoticeResult<()> {
        let resp: ApiResponse = self
            .post_json(&format!("/system/notice/{id}/read"), None)
            .await?;
        resp.into_result()?;
        Ok(())
    }

    /// Fetch one notice by id.
    pub async fn get_notice(&self, id: i64) -> NoticeResult<Notice> {
        let resp: ApiResponse<Notice> = self.get_json(&format!("/system/notice/{id}")).await?;
        resp.into_data()
    }
}
