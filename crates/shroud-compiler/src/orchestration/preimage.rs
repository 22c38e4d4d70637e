//! Preimage and identifier resolution
//!
//! Derives the anonymised storage identifier and store location of every state, and decides
//! where the owner public key of each new commitment comes from.

use super::ir::{OwnerResolution, PreimageInit, PreimageRead, StorageId, StorePath};
use shroud_runtime::{MappingKey, MappingOwnership, Ownership, StateVariableDescriptor};
use tracing::debug;

/// One identifier per (state, resolved key): keyed states hash the slot id with their key.
pub fn storage_id(state: &StateVariableDescriptor) -> StorageId {
    match state.mapping_key() {
        Some(key) => {
            StorageId::Mapped { state: state.name.clone(), slot_id: state.slot_id, key: key.clone() }
        }
        None => StorageId::Fixed { state: state.name.clone(), slot_id: state.slot_id },
    }
}

pub fn store_path(state: &StateVariableDescriptor) -> StorePath {
    StorePath {
        root: state.mapping_name().to_string(),
        keyed_by: state.mapping.as_ref().map(|_| state.name.clone()),
    }
}

/// Resolves the new owner key source of a modified state.
///
/// Sender-keyed states always stay with the caller. Combinations the classifier leaves open
/// fall back to [`OwnerResolution::CallerOrSelf`].
pub fn resolve_owner(state: &StateVariableDescriptor) -> OwnerResolution {
    match &state.owner {
        Ownership::Unowned => OwnerResolution::CallerOrSelf,
        Ownership::Sender { .. } if state.mapping_key() == Some(&MappingKey::Sender) => {
            OwnerResolution::SelfKey
        }
        Ownership::Sender { mode: Some(MappingOwnership::Key) } => {
            match state.mapping_key().and_then(MappingKey::identifier) {
                Some(key) => OwnerResolution::RegistryByKey { key: key.to_string() },
                None => OwnerResolution::CallerOrSelf,
            }
        }
        Ownership::Sender { mode: Some(MappingOwnership::Value) } => {
            OwnerResolution::RegistryByValue
        }
        Ownership::Sender { mode: None } => OwnerResolution::CallerOrSelf,
        Ownership::Named { identifier, parameter: true, .. } => {
            OwnerResolution::Parameter { name: identifier.clone() }
        }
        Ownership::Named { identifier, secret: false, .. } => {
            OwnerResolution::RegistryByIdentifier { identifier: identifier.clone() }
        }
        Ownership::Named { identifier, secret: true, .. } => {
            debug!(state = %state.name, owner = %identifier, "Secret owner, using caller override");
            OwnerResolution::CallerOrSelf
        }
    }
}

pub fn init(state: &StateVariableDescriptor) -> PreimageInit {
    PreimageInit {
        state: state.name.clone(),
        kind: state.update_kind(),
        storage_id: storage_id(state),
        path: store_path(state),
        accessed_only: state.accessed_only,
    }
}

pub fn read(state: &StateVariableDescriptor) -> PreimageRead {
    PreimageRead {
        state: state.name.clone(),
        kind: state.update_kind(),
        owner: state.is_modified().then(|| resolve_owner(state)),
        operands: state.operands.clone(),
        accessed_only: state.accessed_only,
        reinitialised_only: state.reinitialised_only,
        initialised: state.initialised,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender_owned(mode: Option<MappingOwnership>) -> Ownership {
        Ownership::Sender { mode }
    }

    #[test]
    fn test_fixed_storage_id() {
        let state = StateVariableDescriptor::whole("admin", 7);
        assert_eq!(storage_id(&state), StorageId::Fixed { state: "admin".to_string(), slot_id: 7 });
    }

    #[test]
    fn test_mapped_storage_id_uses_key() {
        let state = StateVariableDescriptor::whole("votes_msg", 4).mapped("votes", MappingKey::Sender);
        assert_eq!(
            storage_id(&state),
            StorageId::Mapped { state: "votes_msg".to_string(), slot_id: 4, key: MappingKey::Sender }
        );
    }

    #[test]
    fn test_store_path() {
        let plain = StateVariableDescriptor::whole("admin", 1);
        assert_eq!(store_path(&plain), StorePath { root: "admin".to_string(), keyed_by: None });

        let keyed = StateVariableDescriptor::whole("votes_msg", 4).mapped("votes", MappingKey::Sender);
        assert_eq!(
            store_path(&keyed),
            StorePath { root: "votes".to_string(), keyed_by: Some("votes_msg".to_string()) }
        );
    }

    #[test]
    fn test_owner_none() {
        let state = StateVariableDescriptor::whole("x", 1);
        assert_eq!(resolve_owner(&state), OwnerResolution::CallerOrSelf);
    }

    #[test]
    fn test_owner_sender_keyed_by_sender() {
        let state = StateVariableDescriptor::whole("x_msg", 1)
            .mapped("x", MappingKey::Sender)
            .owned_by(sender_owned(Some(MappingOwnership::Value)));
        assert_eq!(resolve_owner(&state), OwnerResolution::SelfKey);
    }

    #[test]
    fn test_owner_sender_by_key() {
        let state = StateVariableDescriptor::whole("x_user", 1)
            .mapped("x", MappingKey::Parameter("user".to_string()))
            .owned_by(sender_owned(Some(MappingOwnership::Key)));
        assert_eq!(resolve_owner(&state), OwnerResolution::RegistryByKey { key: "user".to_string() });
    }

    #[test]
    fn test_owner_sender_by_key_without_mapping_falls_back() {
        let state = StateVariableDescriptor::whole("x", 1)
            .owned_by(sender_owned(Some(MappingOwnership::Key)));
        assert_eq!(resolve_owner(&state), OwnerResolution::CallerOrSelf);
    }

    #[test]
    fn test_owner_sender_by_value() {
        let state = StateVariableDescriptor::whole("x_user", 1)
            .mapped("x", MappingKey::Parameter("user".to_string()))
            .owned_by(sender_owned(Some(MappingOwnership::Value)));
        assert_eq!(resolve_owner(&state), OwnerResolution::RegistryByValue);
    }

    #[test]
    fn test_owner_named_identifier() {
        let owner = Ownership::Named { identifier: "admin".to_string(), secret: false, parameter: false };
        let state = StateVariableDescriptor::whole("x", 1).owned_by(owner);
        assert_eq!(
            resolve_owner(&state),
            OwnerResolution::RegistryByIdentifier { identifier: "admin".to_string() }
        );
    }

    #[test]
    fn test_owner_named_parameter() {
        let owner = Ownership::Named { identifier: "to".to_string(), secret: true, parameter: true };
        let state = StateVariableDescriptor::whole("x", 1).owned_by(owner);
        assert_eq!(resolve_owner(&state), OwnerResolution::Parameter { name: "to".to_string() });
    }

    #[test]
    fn test_owner_named_secret_falls_back() {
        let owner = Ownership::Named { identifier: "boss".to_string(), secret: true, parameter: false };
        let state = StateVariableDescriptor::whole("x", 1).owned_by(owner);
        assert_eq!(resolve_owner(&state), OwnerResolution::CallerOrSelf);
    }

    #[test]
    fn test_accessed_read_has_no_owner() {
        let state = StateVariableDescriptor::whole("x", 1).accessed_only();
        let read = read(&state);
        assert!(read.accessed_only);
        assert!(read.owner.is_none());
    }
}
