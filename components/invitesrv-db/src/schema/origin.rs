table! {
    origins (id) {
        id -> BigInt,
        name -> Text,
        owner_id -> BigInt,
        created_at -> Nullable<Timestamptz>,
    }
}
