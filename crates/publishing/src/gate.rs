//! Asset Gate: minimum media required before a manual publish.
//!
//! An owner passes when its assets of the owner's asset type in its primary
//! language include both a `portrait` and a `landscape` variant. `square`
//! and `banner` are optional and never checked.

use std::collections::BTreeSet;

use sy_domain::model::{AssetOwner, AssetType, AssetVariant, PublishTarget};
use sy_domain::status::EntityKind;
use sy_store::{Catalog, StoreError};

/// Variants every gated owner must carry, in report order.
pub const REQUIRED_VARIANTS: [AssetVariant; 2] = [AssetVariant::Portrait, AssetVariant::Landscape];

/// Required variants absent for `owner` in `primary_language`.
pub fn missing_variants(
    catalog: &Catalog,
    owner: AssetOwner,
    primary_language: &str,
    asset_type: AssetType,
) -> Vec<AssetVariant> {
    let present: BTreeSet<AssetVariant> = catalog
        .assets_for(owner)
        .into_iter()
        .filter(|a| a.asset_type == asset_type && a.language == primary_language)
        .map(|a| a.variant)
        .collect();

    REQUIRED_VARIANTS
        .into_iter()
        .filter(|v| !present.contains(v))
        .collect()
}

pub fn has_required_variants(
    catalog: &Catalog,
    owner: AssetOwner,
    primary_language: &str,
    asset_type: AssetType,
) -> bool {
    missing_variants(catalog, owner, primary_language, asset_type).is_empty()
}

/// Evaluate the gate for a publish target, resolving its primary language
/// and asset type from the catalog.
pub fn missing_for_target(
    catalog: &Catalog,
    target: PublishTarget,
) -> Result<Vec<AssetVariant>, StoreError> {
    let owner = AssetOwner::from(target);
    let language = match target {
        PublishTarget::Program(id) => catalog
            .program(&id)
            .map(|p| p.language_primary.as_str())
            .ok_or_else(|| StoreError::not_found(EntityKind::Program, id))?,
        PublishTarget::Lesson(id) => catalog
            .lesson(&id)
            .map(|l| l.content_language_primary.as_str())
            .ok_or_else(|| StoreError::not_found(EntityKind::Lesson, id))?,
    };
    Ok(missing_variants(catalog, owner, language, owner.asset_type()))
}
