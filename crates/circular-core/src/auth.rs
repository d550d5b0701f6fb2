//! The authenticated caller, passed explicitly into every operation.
//!
//! Token validation happens upstream; this crate only consumes the result.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
  Guardian(Uuid),
  Staff(Uuid),
}

impl Actor {
  /// The guardian id, or [`Error::Unauthorized`] for staff callers.
  pub fn guardian(&self) -> Result<Uuid> {
    match self {
      Self::Guardian(id) => Ok(*id),
      Self::Staff(_) => Err(Error::Unauthorized),
    }
  }

  /// The staff id, or [`Error::Unauthorized`] for guardian callers.
  pub fn staff(&self) -> Result<Uuid> {
    match self {
      Self::Staff(id) => Ok(*id),
      Self::Guardian(_) => Err(Error::Unauthorized),
    }
  }

  pub fn is_staff(&self) -> bool { matches!(self, Self::Staff(_)) }
}
