//! Accommodation records and the auditor allow-list.
//!
//! The registry is the leaf component: it depends on nothing else and every
//! other component consults it for existence and authorization.

use serde::{Deserialize, Serialize};

use crate::store::{Counter, StoreKey, Transaction};
use crate::types::{AccommodationId, CallContext, Height, Principal};
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
    pub id: AccommodationId,
    pub name: String,
    pub location: String,
    pub category: String,
    pub capacity: u32,
    pub owner: Principal,
    pub is_active: bool,
    pub registered_at: Height,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccommodation {
    pub name: String,
    pub location: String,
    pub category: String,
    pub capacity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditorInfo {
    pub is_authorized: bool,
    pub specialization: String,
    pub certification_count: u64,
    pub authorized_at: Height,
}

pub fn get_accommodation(tx: &Transaction<'_>, id: AccommodationId) -> Result<Option<Accommodation>> {
    tx.read(&StoreKey::Accommodation(id))
}

pub fn get_auditor(tx: &Transaction<'_>, principal: &Principal) -> Result<Option<AuditorInfo>> {
    tx.read(&StoreKey::Auditor(principal.clone()))
}

/// False for unknown accommodations.
pub fn is_owner(tx: &Transaction<'_>, id: AccommodationId, principal: &Principal) -> Result<bool> {
    Ok(get_accommodation(tx, id)?.is_some_and(|a| &a.owner == principal))
}

/// False for principals that were never authorized.
pub fn is_authorized_auditor(tx: &Transaction<'_>, principal: &Principal) -> Result<bool> {
    Ok(get_auditor(tx, principal)?.is_some_and(|a| a.is_authorized))
}

pub(crate) fn require_auditor(tx: &Transaction<'_>, principal: &Principal) -> Result<()> {
    if !is_authorized_auditor(tx, principal)? {
        return Err(Error::NotAuthorized(format!(
            "{principal} is not an authorized auditor"
        )));
    }
    Ok(())
}

/// Load an accommodation or fail with `AccommodationNotFound`.
pub(crate) fn require_accommodation(
    tx: &Transaction<'_>,
    id: AccommodationId,
) -> Result<Accommodation> {
    get_accommodation(tx, id)?
        .ok_or_else(|| Error::AccommodationNotFound(format!("accommodation {id}")))
}

pub(crate) fn require_active(accommodation: &Accommodation) -> Result<()> {
    if !accommodation.is_active {
        return Err(Error::InvalidInput(format!(
            "accommodation {} is inactive",
            accommodation.id
        )));
    }
    Ok(())
}

pub(crate) fn register(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    input: NewAccommodation,
) -> Result<AccommodationId> {
    if input.name.is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()));
    }
    if input.capacity == 0 {
        return Err(Error::InvalidInput(
            "capacity must be greater than 0".to_string(),
        ));
    }

    let id = tx.allocate(Counter::NextAccommodationId)?;
    let accommodation = Accommodation {
        id,
        name: input.name,
        location: input.location,
        category: input.category,
        capacity: input.capacity,
        owner: ctx.caller.clone(),
        is_active: true,
        registered_at: ctx.height,
    };
    tx.write(&StoreKey::Accommodation(id), &accommodation)?;
    Ok(id)
}

pub(crate) fn authorize_auditor(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    registry_owner: &Principal,
    auditor: &Principal,
    specialization: String,
) -> Result<()> {
    if &ctx.caller != registry_owner {
        return Err(Error::NotAuthorized(format!(
            "{} is not the registry owner",
            ctx.caller
        )));
    }
    if specialization.is_empty() {
        return Err(Error::InvalidInput(
            "specialization must not be empty".to_string(),
        ));
    }

    let info = AuditorInfo {
        is_authorized: true,
        specialization,
        certification_count: 0,
        authorized_at: ctx.height,
    };
    tx.write(&StoreKey::Auditor(auditor.clone()), &info)
}

/// Suspension hook: the only writer of `is_active` after registration.
pub(crate) fn set_active(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    registry_owner: &Principal,
    id: AccommodationId,
    active: bool,
) -> Result<Accommodation> {
    if &ctx.caller != registry_owner {
        return Err(Error::NotAuthorized(format!(
            "{} is not the registry owner",
            ctx.caller
        )));
    }
    let mut accommodation = require_accommodation(tx, id)?;
    accommodation.is_active = active;
    tx.write(&StoreKey::Accommodation(id), &accommodation)?;
    Ok(accommodation)
}

/// Bump an auditor's cumulative action count after a successful audit.
pub(crate) fn record_certification_action(
    tx: &mut Transaction<'_>,
    auditor: &Principal,
) -> Result<u64> {
    let mut info = get_auditor(tx, auditor)?.ok_or_else(|| {
        Error::NotAuthorized(format!("{auditor} is not an authorized auditor"))
    })?;
    info.certification_count = info.certification_count.saturating_add(1);
    tx.write(&StoreKey::Auditor(auditor.clone()), &info)?;
    Ok(info.certification_count)
}
