table! {
    origin_members (origin_id, account_id) {
        origin_id -> BigInt,
        account_id -> BigInt,
        origin_name -> Text,
        account_name -> Text,
        created_at -> Nullable<Timestamptz>,
    }
}
