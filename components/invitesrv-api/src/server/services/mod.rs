pub mod account_sync;
