//! Activity and circular-definition authoring.

use chrono::{DateTime, Utc};
use circular_core::{
  Error, Result,
  activity::Activity,
  auth::Actor,
  definition::{Acknowledgement, CircularDefinition, CustomField},
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  store::CircularStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Portal, store_err};

/// Staff input for a circular definition; the activity id comes from the
/// path and `updated_at` is stamped on write.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionDraft {
  pub template_ref:       String,
  #[serde(default)]
  pub fields:             Vec<CustomField>,
  #[serde(default)]
  pub acknowledgements:   Vec<Acknowledgement>,
  pub signature_deadline: Option<DateTime<Utc>>,
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  pub async fn get_definition(&self, activity_id: Uuid) -> Result<CircularDefinition> {
    self.definition(activity_id).await
  }

  /// A definition is frozen once any response exists for its activity.
  pub async fn is_frozen(&self, activity_id: Uuid) -> Result<bool> {
    self.store.has_responses(activity_id).await.map_err(store_err)
  }

  /// Create or update an activity. After the first signature only the
  /// title and location can change; anything else is `ActivityFrozen`.
  pub async fn put_activity(&self, actor: &Actor, activity: Activity) -> Result<Activity> {
    let staff_id = actor.staff()?;
    let written = self
      .store
      .put_activity(activity.clone())
      .await
      .map_err(store_err)?;
    if !written {
      return Err(Error::ActivityFrozen(activity.activity_id));
    }
    tracing::info!(activity_id = %activity.activity_id, %staff_id, "activity saved");
    Ok(activity)
  }

  pub async fn put_definition(
    &self,
    actor: &Actor,
    activity_id: Uuid,
    draft: DefinitionDraft,
  ) -> Result<CircularDefinition> {
    let staff_id = actor.staff()?;
    self.activity(activity_id).await?;

    let definition = CircularDefinition {
      activity_id,
      template_ref: draft.template_ref,
      fields: draft.fields,
      acknowledgements: draft.acknowledgements,
      signature_deadline: draft.signature_deadline,
      updated_at: Utc::now(),
    };

    let written = self
      .store
      .put_definition(definition.clone())
      .await
      .map_err(store_err)?;
    if !written {
      return Err(Error::DefinitionFrozen(activity_id));
    }

    tracing::info!(%activity_id, %staff_id, "circular definition saved");
    Ok(definition)
  }
}
