//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Shared skill reference data.
    skills (id) {
        id -> Uuid,
        /// Unique case-insensitively via `skills_name_lower_key`.
        name -> Varchar,
        category -> Varchar,
        demand_score -> Nullable<Float8>,
        base_difficulty -> Nullable<Float8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reputation and completion counters per user.
    user_profiles (user_id) {
        user_id -> Uuid,
        display_name -> Varchar,
        reputation -> Nullable<Float8>,
        total_swaps_completed -> Int4,
        hours_taught -> Float8,
        hours_learned -> Float8,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// A user's declaration that they teach or want to learn a skill.
    user_skills (id) {
        id -> Uuid,
        user_id -> Uuid,
        skill_id -> Uuid,
        role -> Varchar,
        level -> Nullable<Varchar>,
        difficulty_score -> Nullable<Float8>,
        weekly_hours_available -> Nullable<Float8>,
        active -> Bool,
    }
}

diesel::table! {
    swaps (id) {
        id -> Uuid,
        status -> Varchar,
        fairness_score -> Int2,
        rationale -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Exactly two rows per swap; seat 0 is the proposer.
    swap_participants (swap_id, seat) {
        swap_id -> Uuid,
        seat -> Int2,
        user_id -> Uuid,
        teaching_skill_id -> Uuid,
        learning_skill_id -> Uuid,
        teaching_hours_per_week -> Float8,
        learning_hours_per_week -> Float8,
        accepted -> Bool,
    }
}

diesel::joinable!(user_skills -> skills (skill_id));
diesel::joinable!(swap_participants -> swaps (swap_id));

diesel::allow_tables_to_appear_in_same_query!(
    skills,
    user_profiles,
    user_skills,
    swaps,
    swap_participants,
);
