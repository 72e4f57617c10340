table! {
    use crate::models::invitations::InvitationStatusMapping;
    use diesel::sql_types::{BigInt, Text, Nullable, Timestamptz};
    origin_invitations (id) {
        id -> BigInt,
        origin_id -> BigInt,
        origin -> Text,
        account_id -> BigInt,
        account_name -> Text,
        owner_id -> BigInt,
        status -> InvitationStatusMapping,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}
