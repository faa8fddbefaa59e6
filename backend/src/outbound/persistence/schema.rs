//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts.
    users (id) {
        id -> Int8,
        created_at -> Timestamptz,
        /// Unique, `[A-Za-z0-9_.-]{1,64}`.
        login -> Varchar,
        /// Unique case-insensitively through `users_email_lower_key`.
        email -> Varchar,
        /// bcrypt encoding, cost 12.
        password_hash -> Varchar,
        activated -> Bool,
        version -> Int4,
    }
}

diesel::table! {
    /// SHA-256 digests of issued bearer tokens.
    tokens (hash) {
        hash -> Bytea,
        user_id -> Int8,
        expiry -> Timestamptz,
        /// `activation` or `authentication`.
        scope -> Varchar,
    }
}

diesel::table! {
    /// Short-lived text pastes.
    pastes (id) {
        id -> Int8,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
        title -> Varchar,
        /// 1 = sport, 2 = home, 3 = work.
        category -> Int2,
        text -> Text,
        version -> Int4,
    }
}

diesel::table! {
    /// Write grants; one row per `(user, paste)` pair.
    permissions (user_id, paste_id) {
        user_id -> Int8,
        paste_id -> Int8,
    }
}

diesel::joinable!(tokens -> users (user_id));
diesel::joinable!(permissions -> users (user_id));
diesel::joinable!(permissions -> pastes (paste_id));

diesel::allow_tables_to_appear_in_same_query!(users, tokens, pastes, permissions);
