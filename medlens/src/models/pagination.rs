use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub skip: u32,
}

impl Page {
    /// Clamp caller-supplied values: `limit` to `1..=100` (default 50),
    /// `skip` defaults to 0.
    pub fn new(limit: Option<u32>, skip: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
            skip: skip.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosisFilter {
    pub patient_id: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct ChatHistoryFilter {
    pub session_id: Option<String>,
    pub patient_id: Option<String>,
    pub page: Page,
}
