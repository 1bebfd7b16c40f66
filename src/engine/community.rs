use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{haversine_km, round_km};
use crate::models::community::{Community, Member};
use crate::models::user::User;
use crate::state::AppState;
use crate::store::Collection;

/// Farmers within this great-circle distance of a vendor join its community.
pub const COMMUNITY_RADIUS_KM: f64 = 50.0;

/// Distance from `vendor` to `farmer` if the farmer is close enough to join.
fn membership_distance(vendor: &User, farmer: &User) -> Option<f64> {
    let distance = haversine_km(&vendor.location(), &farmer.location());
    (distance <= COMMUNITY_RADIUS_KM).then(|| round_km(distance))
}

pub fn on_vendor_registered(state: &AppState, vendor: &User) -> Result<Community, AppError> {
    let farmers: Vec<User> = state.store.load(Collection::Farmers)?;

    let mut members = vec![Member::vendor(vendor)];
    members.extend(farmers.iter().filter_map(|farmer| {
        membership_distance(vendor, farmer).map(|distance| Member::farmer(farmer, distance))
    }));

    let community = Community {
        id: Uuid::new_v4(),
        name: format!("{}'s Community", vendor.name),
        vendor_id: vendor.id,
        vendor_name: vendor.name.clone(),
        members,
        messages: Vec::new(),
        created_at: Utc::now(),
    };

    let mut communities: Vec<Community> = state.store.load(Collection::Communities)?;
    communities.push(community.clone());
    state.store.save(Collection::Communities, &communities)?;

    let farmer_members = community.members.len() - 1;
    state
        .metrics
        .community_memberships_total
        .inc_by(farmer_members as u64);

    info!(
        community_id = %community.id,
        vendor_id = %vendor.id,
        farmers = farmer_members,
        "community created"
    );

    Ok(community)
}

/// Adds `farmer` to every community whose vendor is in range and returns how
/// many communities it joined.
pub fn on_farmer_registered(state: &AppState, farmer: &User) -> Result<usize, AppError> {
    let mut communities: Vec<Community> = state.store.load(Collection::Communities)?;
    let vendors: Vec<User> = state.store.load(Collection::Vendors)?;
    let vendors_by_id: HashMap<Uuid, &User> =
        vendors.iter().map(|vendor| (vendor.id, vendor)).collect();

    let mut joined = 0;
    for community in communities.iter_mut() {
        let Some(vendor) = vendors_by_id.get(&community.vendor_id) else {
            warn!(
                community_id = %community.id,
                vendor_id = %community.vendor_id,
                "community vendor missing; skipping"
            );
            continue;
        };

        if let Some(distance) = membership_distance(vendor, farmer) {
            community.members.push(Member::farmer(farmer, distance));
            joined += 1;
        }
    }

    if joined > 0 {
        state.store.save(Collection::Communities, &communities)?;
        state
            .metrics
            .community_memberships_total
            .inc_by(joined as u64);
    }

    info!(farmer_id = %farmer.id, communities = joined, "farmer placed in communities");
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{on_farmer_registered, on_vendor_registered, COMMUNITY_RADIUS_KM};
    use crate::models::community::Community;
    use crate::models::user::{Role, User};
    use crate::state::AppState;
    use crate::store::Collection;

    fn user(id_seed: u128, name: &str, latitude: f64, longitude: f64) -> User {
        User {
            id: Uuid::from_u128(id_seed),
            name: name.to_string(),
            latitude,
            longitude,
            created_at: Utc::now(),
        }
    }

    fn seed(state: &AppState, collection: Collection, users: &[User]) {
        state.store.save(collection, users).unwrap();
    }

    fn communities(state: &AppState) -> Vec<Community> {
        state.store.load(Collection::Communities).unwrap()
    }

    #[test]
    fn vendor_community_includes_only_farmers_in_range() {
        let state = AppState::in_memory();
        let near = user(1, "near", 28.7, 77.1);
        let far = user(2, "far", 0.0, 0.0);
        seed(&state, Collection::Farmers, &[near.clone(), far]);

        let vendor = user(10, "Ravi", 28.6139, 77.2090);
        let community = on_vendor_registered(&state, &vendor).unwrap();

        assert_eq!(community.name, "Ravi's Community");
        assert_eq!(community.vendor_id, vendor.id);
        assert_eq!(community.members.len(), 2);
        assert_eq!(community.members[0].id, vendor.id);
        assert_eq!(community.members[0].role, Role::Vendor);
        assert_eq!(community.members[0].distance_km, None);
        assert_eq!(community.members[1].id, near.id);
        assert_eq!(community.members[1].distance_km, Some(14.31));

        assert_eq!(communities(&state), vec![community]);
    }

    #[test]
    fn farmer_on_the_radius_boundary_is_included() {
        let state = AppState::in_memory();
        // One degree of latitude is ~111.19 km on a 6371 km sphere.
        let degrees = COMMUNITY_RADIUS_KM / 111.2;
        let farmer = user(1, "edge", degrees, 0.0);
        let outside = user(2, "outside", 0.46, 0.0);
        seed(&state, Collection::Farmers, &[farmer.clone(), outside]);

        let vendor = user(10, "v", 0.0, 0.0);
        let community = on_vendor_registered(&state, &vendor).unwrap();

        assert_eq!(community.members.len(), 2);
        assert_eq!(community.members[1].id, farmer.id);
    }

    #[test]
    fn farmer_joins_every_nearby_community() {
        let state = AppState::in_memory();
        let delhi = user(10, "Delhi", 28.6139, 77.2090);
        let noida = user(11, "Noida", 28.5355, 77.3910);
        let mumbai = user(12, "Mumbai", 19.0760, 72.8777);
        seed(
            &state,
            Collection::Vendors,
            &[delhi.clone(), noida.clone(), mumbai.clone()],
        );
        for vendor in [&delhi, &noida, &mumbai] {
            on_vendor_registered(&state, vendor).unwrap();
        }

        let farmer = user(1, "farmer", 28.6, 77.25);
        let joined = on_farmer_registered(&state, &farmer).unwrap();

        assert_eq!(joined, 2);
        let stored = communities(&state);
        let with_farmer: Vec<_> = stored
            .iter()
            .filter(|community| community.has_member(farmer.id))
            .map(|community| community.vendor_id)
            .collect();
        assert_eq!(with_farmer, vec![delhi.id, noida.id]);
    }

    #[test]
    fn community_with_missing_vendor_is_skipped() {
        let state = AppState::in_memory();
        let vendor = user(10, "ghost", 28.6139, 77.2090);
        on_vendor_registered(&state, &vendor).unwrap();

        let farmer = user(1, "farmer", 28.6139, 77.2090);
        let joined = on_farmer_registered(&state, &farmer).unwrap();

        assert_eq!(joined, 0);
        assert_eq!(communities(&state)[0].members.len(), 1);
    }

    #[test]
    fn exactly_one_vendor_member_however_many_farmers_join() {
        let state = AppState::in_memory();
        let vendor = user(10, "v", 10.0, 10.0);
        seed(&state, Collection::Vendors, &[vendor.clone()]);
        on_vendor_registered(&state, &vendor).unwrap();

        for seed_id in 1..=5 {
            let farmer = user(seed_id, "same name", 10.0 + seed_id as f64 * 0.01, 10.0);
            on_farmer_registered(&state, &farmer).unwrap();
        }

        let community = &communities(&state)[0];
        assert_eq!(community.members.len(), 6);
        let vendors: Vec<_> = community
            .members
            .iter()
            .filter(|member| member.role == Role::Vendor)
            .collect();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].id, community.vendor_id);
    }

    #[test]
    fn out_of_range_farmer_leaves_communities_untouched() {
        let state = AppState::in_memory();
        let vendor = user(10, "Ravi", 28.6139, 77.2090);
        seed(&state, Collection::Vendors, &[vendor.clone()]);
        on_vendor_registered(&state, &vendor).unwrap();
        let before = state.store.raw(Collection::Communities).unwrap();
        assert!(before.is_some());
        let saves = || {
            state
                .metrics
                .store_operation_seconds
                .with_label_values(&["communities", "save"])
                .get_sample_count()
        };
        let saves_before = saves();

        let distant = user(1, "Kofi", 0.0, 0.0);
        let joined = on_farmer_registered(&state, &distant).unwrap();

        assert_eq!(joined, 0);
        assert_eq!(state.store.raw(Collection::Communities).unwrap(), before);
        assert_eq!(saves(), saves_before);
    }
}
