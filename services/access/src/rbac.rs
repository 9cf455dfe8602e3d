//! Company/facility-scoped authorization (spec §4.K).
//!
//! Every company-scoped or facility-scoped operation resolves a `Member`
//! first; its absence is a 403, never a 404 (which would leak whether the
//! company exists to someone who isn't on it).

use carbonledger_core::entities::{Facility, Member, Role};
use carbonledger_core::error::{AppError, AppResult};
use carbonledger_storage::repositories::core::{FacilityRepository, MemberRepository};
use uuid::Uuid;

/// Company/facility-scoped authorization, backed by the membership and
/// facility repositories.
#[derive(Clone)]
pub struct AccessControl {
    members: MemberRepository,
    facilities: FacilityRepository,
}

impl AccessControl {
    pub fn new(members: MemberRepository, facilities: FacilityRepository) -> Self {
        Self { members, facilities }
    }

    /// Resolve the caller's membership in a company. Absence is 403.
    pub async fn resolve_member(&self, user_id: Uuid, company_id: Uuid) -> AppResult<Member> {
        self.members
            .find(user_id, company_id)
            .await
            .map_err(|_| AppError::Authorization("caller is not a member of this company".into()))
    }

    /// Require at least the given role (roles are totally ordered:
    /// viewer < data_entry < admin < owner).
    pub fn require_role(member: &Member, minimum: Role) -> AppResult<()> {
        if member.role >= minimum {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "role {:?} does not meet the required {:?}",
                member.role, minimum
            )))
        }
    }

    /// Only the owner may delete the company or invite new members (spec
    /// §4.K: "owner — ... sole inviter of new members").
    pub fn require_owner(member: &Member) -> AppResult<()> {
        Self::require_role(member, Role::Owner)
    }

    /// `data_entry` and above may mutate `ActivityData`/`Invoice` rows.
    pub fn require_data_entry(member: &Member) -> AppResult<()> {
        Self::require_role(member, Role::DataEntry)
    }

    /// `admin` and above may mutate company metadata, facilities, and
    /// non-owner members.
    pub fn require_admin(member: &Member) -> AppResult<()> {
        Self::require_role(member, Role::Admin)
    }

    /// Resolve facility access at the data-access boundary: if the member
    /// has a facility restriction, only that facility resolves; otherwise
    /// any facility in the company resolves (spec §4.K).
    pub async fn check_facility_access(
        &self,
        facility_id: Uuid,
        member: &Member,
    ) -> AppResult<Facility> {
        if let Some(restricted_to) = member.facility_id {
            if restricted_to != facility_id {
                return Err(AppError::Authorization(
                    "member is restricted to a different facility".into(),
                ));
            }
        }

        let facility = self
            .facilities
            .find_by_id(facility_id)
            .await
            .map_err(|_| AppError::NotFound("facility not found".into()))?;

        if facility.company_id != member.company_id {
            return Err(AppError::Authorization(
                "facility does not belong to the member's company".into(),
            ));
        }

        Ok(facility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role, facility_id: Option<Uuid>) -> Member {
        Member {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role,
            facility_id,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn role_ordering_lets_owner_satisfy_every_requirement() {
        let owner = member(Role::Owner, None);
        assert!(AccessControl::require_owner(&owner).is_ok());
        assert!(AccessControl::require_admin(&owner).is_ok());
        assert!(AccessControl::require_data_entry(&owner).is_ok());
    }

    #[test]
    fn viewer_fails_every_mutation_requirement() {
        let viewer = member(Role::Viewer, None);
        assert!(AccessControl::require_data_entry(&viewer).is_err());
        assert!(AccessControl::require_admin(&viewer).is_err());
        assert!(AccessControl::require_owner(&viewer).is_err());
    }

    #[test]
    fn data_entry_passes_its_own_floor_but_not_admin() {
        let data_entry = member(Role::DataEntry, None);
        assert!(AccessControl::require_data_entry(&data_entry).is_ok());
        assert!(AccessControl::require_admin(&data_entry).is_err());
    }
}
