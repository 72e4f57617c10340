table! {
    accounts (id) {
        id -> BigInt,
        name -> Text,
        email -> Text,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    account_tokens (id) {
        id -> BigInt,
        account_id -> BigInt,
        token -> Text,
        created_at -> Nullable<Timestamptz>,
    }
}

joinable!(account_tokens -> accounts (account_id));
allow_tables_to_appear_in_same_query!(account_tokens, accounts);
