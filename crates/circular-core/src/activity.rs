//! Activities: the camps and outings a circular is attached to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event (campamento, salida) that may require a signed circular.
///
/// Each activity is a single occurrence; attendance confirmations are keyed
/// by `activity_id` directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id:       Uuid,
  pub title:             String,
  pub starts_at:         DateTime<Utc>,
  pub ends_at:           DateTime<Utc>,
  pub location:          Option<String>,
  /// Scout sections whose participants make up the roster.
  pub sections:          Vec<String>,
  pub requires_circular: bool,
}

impl Activity {
  /// Whether `section` is one of the sections taking part.
  pub fn includes_section(&self, section: &str) -> bool {
    self.sections.iter().any(|s| s == section)
  }
}
