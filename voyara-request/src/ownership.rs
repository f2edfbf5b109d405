use std::sync::Arc;
use uuid::Uuid;
use voyara_core::repository::PackageDirectory;
use voyara_core::{CoreError, CoreResult, ValidationErrors};

/// An agent booking inventory they own themselves skips the approval queue.
pub fn is_self_owned(owner_id: Uuid, provider_id: Uuid) -> bool {
    owner_id == provider_id
}

pub struct OwnershipCheck {
    packages: Arc<dyn PackageDirectory>,
}

impl OwnershipCheck {
    pub fn new(packages: Arc<dyn PackageDirectory>) -> Self {
        Self { packages }
    }

    /// Owner of the package the request is for, or the agent when there is none.
    pub async fn owner_of(&self, agent_id: Uuid, package_id: Option<Uuid>) -> CoreResult<Uuid> {
        let Some(package_id) = package_id else {
            return Ok(agent_id);
        };

        self.packages.package_owner(package_id).await?.ok_or_else(|| {
            CoreError::Validation(ValidationErrors::single(
                "package_id",
                "The selected package id is invalid.",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyara_store::MemoryStore;

    #[tokio::test]
    async fn test_owner_resolution() {
        let store = Arc::new(MemoryStore::new());
        let agent = Uuid::new_v4();
        let agency = Uuid::new_v4();
        let package = Uuid::new_v4();
        store.add_package(package, agency).await;
        let check = OwnershipCheck::new(store);

        assert_eq!(check.owner_of(agent, None).await.unwrap(), agent);
        assert_eq!(check.owner_of(agent, Some(package)).await.unwrap(), agency);
        assert!(matches!(
            check.owner_of(agent, Some(Uuid::new_v4())).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_self_owned() {
        let user = Uuid::new_v4();
        assert!(is_self_owned(user, user));
        assert!(!is_self_owned(user, Uuid::new_v4()));
    }
}
