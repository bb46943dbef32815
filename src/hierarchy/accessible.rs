//! Accessible-set queries: the subset of countries, regions and events a
//! manager may view or administer. Each query is a deduplicated union across
//! independent derivation paths (direct ownership, via-region, via-area,
//! via-event), never a plain ownership filter.

use std::collections::HashSet;
use uuid::Uuid;

use crate::hierarchy::scopes::{CountryScope, EventScope, ManagerScopes, RegionScope};
use crate::hierarchy::store::{DelegationError, DelegationStore};

fn dedup_by_id<T>(items: impl IntoIterator<Item = T>, id: impl Fn(&T) -> Uuid) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item)))
        .collect()
}

fn dedup_strings(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values.dedup();
    values
}

/// Countries visible to a manager. Administrators (or the explicit area-level
/// breadth flag) see the unrestricted set; everyone else sees the union of
/// directly-owned countries and countries reached via owned regions, areas
/// and events.
pub async fn accessible_countries<S>(
    store: &S,
    scopes: &ManagerScopes,
    area_breadth: bool,
) -> Result<Vec<CountryScope>, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    if scopes.administrator || area_breadth {
        return store.all_countries().await;
    }

    let codes = dedup_strings(
        scopes
            .regions
            .iter()
            .map(|r| r.country_code.clone())
            .chain(scopes.areas.iter().map(|a| a.country_code.clone()))
            .chain(scopes.events.iter().filter_map(|e| e.country_code.clone()))
            .collect(),
    );

    let via_containment = if codes.is_empty() {
        Vec::new()
    } else {
        store.countries_by_codes(&codes).await?
    };

    Ok(dedup_by_id(
        scopes.countries.iter().cloned().chain(via_containment),
        |c| c.id,
    ))
}

/// Regions visible to a manager, optionally filtered by country. The
/// via-country path only applies to countries that opt into region-level
/// drill-down (`enable_regions`).
pub async fn accessible_regions<S>(
    store: &S,
    scopes: &ManagerScopes,
    country_code: Option<&str>,
    area_breadth: bool,
) -> Result<Vec<RegionScope>, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    if scopes.administrator || area_breadth {
        return store.regions(country_code).await;
    }

    if let Some(code) = country_code {
        return Ok(scopes
            .regions
            .iter()
            .filter(|r| r.country_code == code)
            .cloned()
            .collect());
    }

    let enabled_country_codes = dedup_strings(
        scopes
            .countries
            .iter()
            .filter(|c| c.enable_regions)
            .map(|c| c.country_code.clone())
            .collect(),
    );
    let area_region_codes = dedup_strings(
        scopes
            .areas
            .iter()
            .filter_map(|a| a.region_code.clone())
            .collect(),
    );

    let via_country = if enabled_country_codes.is_empty() {
        Vec::new()
    } else {
        store.regions_in_countries(&enabled_country_codes).await?
    };
    let via_area = if area_region_codes.is_empty() {
        Vec::new()
    } else {
        store.regions_by_codes(&area_region_codes).await?
    };

    Ok(dedup_by_id(
        scopes
            .regions
            .iter()
            .cloned()
            .chain(via_country)
            .chain(via_area),
        |r| r.id,
    ))
}

/// Events visible to a manager: the four-path union over direct ownership,
/// owned countries, owned regions, and owned areas (offline events through
/// their venue, online events through their own area).
pub async fn accessible_events<S>(
    store: &S,
    scopes: &ManagerScopes,
) -> Result<Vec<EventScope>, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    if scopes.administrator {
        return store.all_events().await;
    }

    let country_codes = dedup_strings(
        scopes
            .countries
            .iter()
            .map(|c| c.country_code.clone())
            .collect(),
    );
    let region_codes = dedup_strings(
        scopes
            .regions
            .iter()
            .map(|r| r.region_code.clone())
            .collect(),
    );
    let area_ids: Vec<Uuid> = scopes.areas.iter().map(|a| a.id).collect();

    let via_country = if country_codes.is_empty() {
        Vec::new()
    } else {
        store.events_in_countries(&country_codes).await?
    };
    let via_region = if region_codes.is_empty() {
        Vec::new()
    } else {
        store.events_in_regions(&region_codes).await?
    };
    let via_area = if area_ids.is_empty() {
        Vec::new()
    } else {
        store.events_in_areas(&area_ids).await?
    };

    Ok(dedup_by_id(
        scopes
            .events
            .iter()
            .cloned()
            .chain(via_country)
            .chain(via_region)
            .chain(via_area),
        |e| e.id,
    ))
}
