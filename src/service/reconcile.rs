//! Sub-element reconciliation: soft delete, update detection, append.

use crate::core::{
    canon_eq, Alias, AliasUpdate, CanonError, CoreError, Edge, EdgeUpdate, EpochMs, InvalidId,
    Resource, ResourceUpdate,
};

/// Reconciliation contract for one sub-element kind.
pub(crate) trait Reconcile: Sized {
    type Update;

    fn validate(update: &Self::Update) -> Result<(), CoreError>;
    fn id(&self) -> &str;
    fn update_id(update: &Self::Update) -> &str;
    fn is_active(&self) -> bool;
    fn tombstone(&mut self, now: EpochMs);
    /// Content comparison through the canonical encoder.
    fn differs(&self, update: &Self::Update) -> Result<bool, CanonError>;
    fn overwrite(&mut self, update: &Self::Update, now: EpochMs);
    fn fresh(update: &Self::Update, now: EpochMs) -> Self;
}

/// Apply an update list to a collection.
///
/// An absent list leaves the collection untouched; an empty list tombstones
/// every active element. Tombstones are retained forever, and re-using a
/// tombstoned id appends a new element with a fresh `created` stamp.
/// Elements whose requested content is identical are left untouched, with no
/// `updated` bump.
pub(crate) fn reconcile<E: Reconcile>(
    collection: &mut Option<Vec<E>>,
    updates: Option<&[E::Update]>,
    now: EpochMs,
) -> Result<(), CoreError> {
    let Some(updates) = updates else {
        return Ok(());
    };
    for update in updates {
        E::validate(update)?;
    }

    let list = collection.get_or_insert_with(Vec::new);
    for element in list.iter_mut() {
        if element.is_active()
            && !updates
                .iter()
                .any(|update| E::update_id(update) == element.id())
        {
            element.tombstone(now);
        }
    }
    for update in updates {
        let live = list
            .iter_mut()
            .find(|element| element.is_active() && element.id() == E::update_id(update));
        match live {
            Some(element) => {
                if element.differs(update)? {
                    element.overwrite(update, now);
                }
            }
            None => list.push(E::fresh(update, now)),
        }
    }
    if list.is_empty() {
        *collection = None;
    }
    Ok(())
}

impl Reconcile for Alias {
    type Update = AliasUpdate;

    fn validate(update: &AliasUpdate) -> Result<(), CoreError> {
        if update.id.is_empty() {
            return Err(InvalidId::EmptyElementId.into());
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn update_id(update: &AliasUpdate) -> &str {
        &update.id
    }

    fn is_active(&self) -> bool {
        Alias::is_active(self)
    }

    fn tombstone(&mut self, now: EpochMs) {
        self.deleted = Some(now);
    }

    fn differs(&self, update: &AliasUpdate) -> Result<bool, CanonError> {
        Ok(self.metadata_schema != update.metadata_schema
            || !canon_eq(&self.metadata, &update.metadata)?)
    }

    fn overwrite(&mut self, update: &AliasUpdate, now: EpochMs) {
        self.metadata_schema = update.metadata_schema.clone();
        self.metadata = update.metadata.clone();
        self.updated = Some(now);
    }

    fn fresh(update: &AliasUpdate, now: EpochMs) -> Self {
        Alias {
            id: update.id.clone(),
            created: now,
            updated: None,
            deleted: None,
            metadata_schema: update.metadata_schema.clone(),
            metadata: update.metadata.clone(),
        }
    }
}

impl Reconcile for Resource {
    type Update = ResourceUpdate;

    fn validate(update: &ResourceUpdate) -> Result<(), CoreError> {
        if update.id.is_empty() {
            return Err(InvalidId::EmptyElementId.into());
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn update_id(update: &ResourceUpdate) -> &str {
        &update.id
    }

    fn is_active(&self) -> bool {
        Resource::is_active(self)
    }

    fn tombstone(&mut self, now: EpochMs) {
        self.deleted = Some(now);
    }

    fn differs(&self, update: &ResourceUpdate) -> Result<bool, CanonError> {
        Ok(self.metadata_schema != update.metadata_schema
            || !canon_eq(&self.metadata, &update.metadata)?)
    }

    fn overwrite(&mut self, update: &ResourceUpdate, now: EpochMs) {
        self.metadata_schema = update.metadata_schema.clone();
        self.metadata = update.metadata.clone();
        self.updated = Some(now);
    }

    fn fresh(update: &ResourceUpdate, now: EpochMs) -> Self {
        Resource {
            id: update.id.clone(),
            created: now,
            updated: None,
            deleted: None,
            metadata_schema: update.metadata_schema.clone(),
            metadata: update.metadata.clone(),
        }
    }
}

impl Reconcile for Edge {
    type Update = EdgeUpdate;

    fn validate(update: &EdgeUpdate) -> Result<(), CoreError> {
        if update.id.is_empty() {
            return Err(InvalidId::EmptyElementId.into());
        }
        if update.relationship.is_empty() {
            return Err(InvalidId::EmptyRelationship.into());
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn update_id(update: &EdgeUpdate) -> &str {
        &update.id
    }

    fn is_active(&self) -> bool {
        Edge::is_active(self)
    }

    fn tombstone(&mut self, now: EpochMs) {
        self.deleted = Some(now);
    }

    fn differs(&self, update: &EdgeUpdate) -> Result<bool, CanonError> {
        Ok(self.relationship != update.relationship
            || self.metadata_schema != update.metadata_schema
            || !canon_eq(&self.metadata, &update.metadata)?)
    }

    fn overwrite(&mut self, update: &EdgeUpdate, now: EpochMs) {
        self.relationship = update.relationship.clone();
        self.metadata_schema = update.metadata_schema.clone();
        self.metadata = update.metadata.clone();
        self.updated = Some(now);
    }

    fn fresh(update: &EdgeUpdate, now: EpochMs) -> Self {
        Edge {
            id: update.id.clone(),
            relationship: update.relationship.clone(),
            created: now,
            updated: None,
            deleted: None,
            metadata_schema: update.metadata_schema.clone(),
            metadata: update.metadata.clone(),
        }
    }
}
