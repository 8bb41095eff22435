//! PostgreSQL-backed `SwapRepository` implementation using Diesel ORM.
//!
//! Proposal inserts and lifecycle transitions run in SERIALIZABLE
//! transactions that re-run the duplicate and capacity checks; a counter
//! re-checks duplicates against the new skill pair. Postgres
//! aborts one side of a conflicting pair; that abort is reported as
//! [`SwapRepositoryError::Contention`] so callers can retry.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{Allocation, SwapRepository, SwapRepositoryError};
use crate::domain::{
    CapacityCheck, HOURS_EPSILON, NewSwapProposal, SkillId, SkillRole, Swap, SwapId, SwapStatus,
    SwapTransition, UserId,
};

use super::diesel_basic_error_mapping::{
    is_serialization_failure, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{
    NewProfileCreditRow, NewSwapRow, ParticipantRow, ParticipantUpdate, SwapRow, SwapUpdate,
    fairness_column, participant_rows, swap_from_rows,
};
use super::pool::{DbPool, PoolError};
use super::schema::{swap_participants, swaps, user_profiles, user_skills};

/// Diesel-backed implementation of the swap repository port.
#[derive(Clone)]
pub struct DieselSwapRepository {
    pool: DbPool,
}

impl DieselSwapRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a swap transaction.
#[derive(Debug)]
enum StoreError {
    Diesel(diesel::result::Error),
    Rejected(SwapRepositoryError),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<SwapRepositoryError> for StoreError {
    fn from(error: SwapRepositoryError) -> Self {
        Self::Rejected(error)
    }
}

fn map_pool_error(error: PoolError) -> SwapRepositoryError {
    map_basic_pool_error(error, SwapRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SwapRepositoryError {
    if is_serialization_failure(&error) {
        debug!("serializable transaction aborted");
        return SwapRepositoryError::contention("concurrent swap write");
    }
    map_basic_diesel_error(
        error,
        SwapRepositoryError::query,
        SwapRepositoryError::connection,
    )
}

fn map_store_error(error: StoreError) -> SwapRepositoryError {
    match error {
        StoreError::Diesel(error) => map_diesel_error(error),
        StoreError::Rejected(error) => error,
    }
}

async fn load_swap(
    conn: &mut AsyncPgConnection,
    swap_id: Uuid,
) -> Result<Option<Swap>, StoreError> {
    let Some(row) = swaps::table
        .find(swap_id)
        .select(SwapRow::as_select())
        .first(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };
    let participants = swap_participants::table
        .filter(swap_participants::swap_id.eq(swap_id))
        .order(swap_participants::seat.asc())
        .select(ParticipantRow::as_select())
        .load(conn)
        .await?;
    swap_from_rows(row, participants)
        .map(Some)
        .map_err(|message| SwapRepositoryError::query(message).into())
}

async fn allocations(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    skill_id: Uuid,
    role: SkillRole,
) -> Result<Vec<Allocation>, diesel::result::Error> {
    let active = swap_participants::table.inner_join(swaps::table).filter(
        swaps::status
            .eq(SwapStatus::Active.as_str())
            .and(swap_participants::user_id.eq(user_id)),
    );
    let rows: Vec<(Uuid, f64)> = match role {
        SkillRole::Teach => {
            active
                .filter(swap_participants::teaching_skill_id.eq(skill_id))
                .select((
                    swap_participants::swap_id,
                    swap_participants::teaching_hours_per_week,
                ))
                .load(conn)
                .await?
        }
        SkillRole::Learn => {
            active
                .filter(swap_participants::learning_skill_id.eq(skill_id))
                .select((
                    swap_participants::swap_id,
                    swap_participants::learning_hours_per_week,
                ))
                .load(conn)
                .await?
        }
    };
    Ok(rows
        .into_iter()
        .map(|(swap_id, hours)| Allocation {
            swap_id: SwapId::from_uuid(swap_id),
            hours,
        })
        .collect())
}

async fn open_swap_id(
    conn: &mut AsyncPgConnection,
    excluded: Option<Uuid>,
    first: (Uuid, Uuid),
    second: (Uuid, Uuid),
) -> Result<Option<Uuid>, diesel::result::Error> {
    let open: Vec<&str> = SwapStatus::OPEN.iter().map(|status| status.as_str()).collect();
    let mut candidates: Vec<Uuid> = swap_participants::table
        .inner_join(swaps::table)
        .filter(
            swaps::status
                .eq_any(open)
                .and(swap_participants::user_id.eq(first.0))
                .and(swap_participants::teaching_skill_id.eq(first.1)),
        )
        .select(swap_participants::swap_id)
        .load(conn)
        .await?;
    candidates.retain(|swap_id| Some(*swap_id) != excluded);
    if candidates.is_empty() {
        return Ok(None);
    }
    swap_participants::table
        .filter(
            swap_participants::swap_id
                .eq_any(candidates)
                .and(swap_participants::user_id.eq(second.0))
                .and(swap_participants::teaching_skill_id.eq(second.1)),
        )
        .select(swap_participants::swap_id)
        .first(conn)
        .await
        .optional()
}

async fn check_capacity(
    conn: &mut AsyncPgConnection,
    checks: &[CapacityCheck],
) -> Result<(), StoreError> {
    for check in checks {
        let user_id = *check.user_id.as_uuid();
        let skill_id = *check.skill_id.as_uuid();
        let declared: Option<Option<f64>> = user_skills::table
            .filter(
                user_skills::user_id
                    .eq(user_id)
                    .and(user_skills::skill_id.eq(skill_id))
                    .and(user_skills::role.eq(SkillRole::Teach.as_str()))
                    .and(user_skills::active.eq(true)),
            )
            .select(user_skills::weekly_hours_available)
            .first(conn)
            .await
            .optional()?;
        // No declaration, no cap or a zero cap all mean unlimited.
        let Some(cap) = declared
            .flatten()
            .filter(|hours| hours.is_finite() && *hours > 0.0)
        else {
            continue;
        };
        let allocated: f64 = allocations(conn, user_id, skill_id, SkillRole::Teach)
            .await?
            .iter()
            .map(|allocation| allocation.hours)
            .sum();
        let remaining = (cap - allocated).max(0.0);
        if check.requested_hours > remaining + HOURS_EPSILON {
            return Err(SwapRepositoryError::capacity_exceeded(
                check.user_id.to_string(),
                check.skill_id.to_string(),
                check.requested_hours,
                remaining,
            )
            .into());
        }
    }
    Ok(())
}

#[async_trait]
impl SwapRepository for DieselSwapRepository {
    async fn active_allocations(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Vec<Allocation>, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        allocations(&mut conn, *user_id.as_uuid(), *skill_id.as_uuid(), role)
            .await
            .map_err(map_diesel_error)
    }

    async fn skills_actively_learning(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SkillId>, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let skill_ids: Vec<Uuid> = swap_participants::table
            .inner_join(swaps::table)
            .filter(
                swaps::status
                    .eq(SwapStatus::Active.as_str())
                    .and(swap_participants::user_id.eq(user_id.as_uuid())),
            )
            .select(swap_participants::learning_skill_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(skill_ids.into_iter().map(SkillId::from_uuid).collect())
    }

    async fn find_open_swap(
        &self,
        first: &UserId,
        first_teaches: &SkillId,
        second: &UserId,
        second_teaches: &SkillId,
    ) -> Result<Option<SwapId>, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let found = open_swap_id(
            &mut conn,
            None,
            (*first.as_uuid(), *first_teaches.as_uuid()),
            (*second.as_uuid(), *second_teaches.as_uuid()),
        )
        .await
        .map_err(map_diesel_error)?;
        Ok(found.map(SwapId::from_uuid))
    }

    async fn create_proposal(
        &self,
        proposal: &NewSwapProposal,
    ) -> Result<Swap, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let swap = &proposal.swap;
        let [proposer, partner] = &swap.participants;

        conn.build_transaction()
            .serializable()
            .run(|conn| {
                async move {
                    if let Some(existing) = open_swap_id(
                        conn,
                        None,
                        (*proposer.user_id.as_uuid(), *proposer.teaching_skill_id.as_uuid()),
                        (*partner.user_id.as_uuid(), *partner.teaching_skill_id.as_uuid()),
                    )
                    .await?
                    {
                        return Err(SwapRepositoryError::duplicate_proposal(existing).into());
                    }
                    check_capacity(conn, &proposal.capacity_checks).await?;

                    diesel::insert_into(swaps::table)
                        .values(&NewSwapRow {
                            id: *swap.id.as_uuid(),
                            status: swap.status.as_str(),
                            fairness_score: fairness_column(swap.fairness),
                            rationale: swap.rationale.as_str(),
                            created_at: swap.created_at,
                            updated_at: swap.updated_at,
                        })
                        .execute(conn)
                        .await?;
                    diesel::insert_into(swap_participants::table)
                        .values(&participant_rows(swap))
                        .execute(conn)
                        .await?;
                    Ok::<(), StoreError>(())
                }
                .scope_boxed()
            })
            .await
            .map_err(map_store_error)?;

        Ok(swap.clone())
    }

    async fn find_swap(&self, swap_id: &SwapId) -> Result<Option<Swap>, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_swap(&mut conn, *swap_id.as_uuid())
            .await
            .map_err(map_store_error)
    }

    async fn apply_transition(
        &self,
        transition: &SwapTransition,
    ) -> Result<Swap, SwapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let swap = &transition.swap;
        let swap_id = *swap.id.as_uuid();
        let expected = transition.expected_status.as_str();

        conn.build_transaction()
            .serializable()
            .run(|conn| {
                async move {
                    let current: Option<String> = swaps::table
                        .find(swap_id)
                        .select(swaps::status)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(current) = current else {
                        return Err(SwapRepositoryError::not_found(swap_id).into());
                    };
                    if current != expected {
                        return Err(SwapRepositoryError::status_conflict(expected, current).into());
                    }
                    if transition.recheck_open_duplicates {
                        let [first, second] = &swap.participants;
                        if let Some(existing) = open_swap_id(
                            conn,
                            Some(swap_id),
                            (*first.user_id.as_uuid(), *first.teaching_skill_id.as_uuid()),
                            (*second.user_id.as_uuid(), *second.teaching_skill_id.as_uuid()),
                        )
                        .await?
                        {
                            return Err(SwapRepositoryError::duplicate_proposal(existing).into());
                        }
                    }
                    check_capacity(conn, &transition.capacity_checks).await?;

                    let updated = diesel::update(swaps::table)
                        .filter(swaps::id.eq(swap_id).and(swaps::status.eq(expected)))
                        .set(&SwapUpdate {
                            status: swap.status.as_str(),
                            fairness_score: fairness_column(swap.fairness),
                            rationale: swap.rationale.as_str(),
                            updated_at: swap.updated_at,
                        })
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        return Err(SwapRepositoryError::contention("status changed mid-update").into());
                    }
                    for (seat, participant) in (0_i16..).zip(&swap.participants) {
                        diesel::update(swap_participants::table.find((swap_id, seat)))
                            .set(&ParticipantUpdate::from(participant))
                            .execute(conn)
                            .await?;
                    }
                    for credit in &transition.completion_credits {
                        diesel::insert_into(user_profiles::table)
                            .values(&NewProfileCreditRow {
                                user_id: *credit.user_id.as_uuid(),
                                total_swaps_completed: 1,
                                hours_taught: credit.hours_taught,
                                hours_learned: credit.hours_learned,
                            })
                            .on_conflict(user_profiles::user_id)
                            .do_update()
                            .set((
                                user_profiles::total_swaps_completed
                                    .eq(user_profiles::total_swaps_completed + 1),
                                user_profiles::hours_taught
                                    .eq(user_profiles::hours_taught + credit.hours_taught),
                                user_profiles::hours_learned
                                    .eq(user_profiles::hours_learned + credit.hours_learned),
                                user_profiles::updated_at.eq(swap.updated_at),
                            ))
                            .execute(conn)
                            .await?;
                    }
                    Ok::<(), StoreError>(())
                }
                .scope_boxed()
            })
            .await
            .map_err(map_store_error)?;

        Ok(swap.clone())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for transaction error mapping.

    use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    use super::*;

    struct Message(&'static str);

    impl DatabaseErrorInformation for Message {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[rstest]
    fn serialization_failures_become_contention() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            Box::new(Message("could not serialize access")),
        );

        let mapped = map_diesel_error(error);

        assert!(matches!(mapped, SwapRepositoryError::Contention { .. }));
    }

    #[rstest]
    fn closed_connections_become_connection_errors() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new(Message("server closed the connection")),
        );

        let mapped = map_diesel_error(error);

        assert!(matches!(mapped, SwapRepositoryError::Connection { .. }));
        assert!(!mapped.to_string().contains("server closed"));
    }

    #[rstest]
    fn rejections_pass_through_unchanged() {
        let rejection = SwapRepositoryError::status_conflict("accepted", "cancelled");

        let mapped = map_store_error(StoreError::from(rejection.clone()));

        assert_eq!(mapped, rejection);
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let mapped = map_pool_error(PoolError::checkout("timed out"));

        assert!(matches!(mapped, SwapRepositoryError::Connection { .. }));
    }
}
