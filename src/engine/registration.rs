use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::community::{on_farmer_registered, on_vendor_registered};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// Stores a new farmer or vendor and updates community membership for it.
///
/// Either both collections change or neither does: if the community step
/// fails, the user collection is written back as it was before the call.
pub fn register(
    state: &AppState,
    role: Role,
    name: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Uuid, AppError> {
    let name = validate_name(name)?;
    validate_coordinates(latitude, longitude)?;

    let user = User {
        id: Uuid::new_v4(),
        name,
        latitude,
        longitude,
        created_at: Utc::now(),
    };

    let collection = role.collection();
    let previous: Vec<User> = state.store.load(collection)?;
    let mut users = previous.clone();
    users.push(user.clone());
    state.store.save(collection, &users)?;

    let placed = match role {
        Role::Vendor => on_vendor_registered(state, &user).map(|_| ()),
        Role::Farmer => on_farmer_registered(state, &user).map(|_| ()),
    };

    if let Err(err) = placed {
        if let Err(restore_err) = state.store.save(collection, &previous) {
            error!(
                user_id = %user.id,
                error = %restore_err,
                "failed to roll back user after community update error"
            );
        }
        warn!(user_id = %user.id, role = %role, error = %err, "registration rolled back");
        return Err(err);
    }

    state
        .metrics
        .registrations_total
        .with_label_values(&[role.as_str()])
        .inc();

    info!(user_id = %user.id, role = %role, "user registered");
    Ok(user.id)
}

/// First user of `role` whose name matches exactly.
pub fn login_lookup(state: &AppState, role: Role, name: &str) -> Result<Uuid, AppError> {
    let users: Vec<User> = state.store.load(role.collection())?;

    users
        .iter()
        .find(|user| user.name == name)
        .map(|user| user.id)
        .ok_or_else(|| AppError::NotFound(format!("{role} named {name:?} not found")))
}

pub fn get_user(state: &AppState, user_id: Uuid, role: Role) -> Result<User, AppError> {
    let users: Vec<User> = state.store.load(role.collection())?;

    users
        .into_iter()
        .find(|user| user.id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("{role} {user_id} not found")))
}

pub fn list_users(state: &AppState, role: Role) -> Result<Vec<User>, AppError> {
    state.store.load(role.collection())
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name cannot be empty".to_string()));
    }

    Ok(name.to_string())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::InvalidInput(format!(
            "latitude must be within [-90, 90], got {latitude}"
        )));
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::InvalidInput(format!(
            "longitude must be within [-180, 180], got {longitude}"
        )));
    }

    Ok(())
}
