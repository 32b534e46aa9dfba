use tracing::warn;

use authstream_core::{AppError, AppResult};
use authstream_domain::{AuthActivityEvent, ProfileBootstrapSeed};

use crate::CreateProfileInput;

use super::{BootstrapOutcome, ProfileBootstrapService};

impl ProfileBootstrapService {
    /// Ensures a profile exists for the principal of a login activity event.
    pub async fn bootstrap_from_activity(
        &self,
        event: &AuthActivityEvent,
    ) -> AppResult<BootstrapOutcome> {
        let Some(seed) = ProfileBootstrapSeed::from_activity(event) else {
            return Ok(BootstrapOutcome::MissingPrincipal);
        };

        self.ensure_profile(seed).await
    }

    /// Ensures a profile exists for the seed's subject.
    ///
    /// The existence check is an optimisation only; the store's uniqueness
    /// constraint decides, and a `Conflict` from it counts as already existing.
    pub async fn ensure_profile(&self, seed: ProfileBootstrapSeed) -> AppResult<BootstrapOutcome> {
        match self.profile_store.profile_exists(seed.subject.as_str()).await {
            Ok(true) => return Ok(BootstrapOutcome::AlreadyExists),
            Ok(false) => {}
            Err(error) => {
                warn!(
                    subject = %seed.subject,
                    error = %error,
                    "profile existence check failed, attempting create"
                );
            }
        }

        let input = CreateProfileInput {
            subject: seed.subject,
            user_id: seed.user_id,
            preferred_name: seed.preferred_name,
            email: seed.email,
            picture_url: seed.picture_url,
        };

        match self.profile_store.create_profile(input).await {
            Ok(profile) => Ok(BootstrapOutcome::Created(profile)),
            Err(AppError::Conflict(_)) => Ok(BootstrapOutcome::AlreadyExists),
            Err(error) => Err(error),
        }
    }
}
