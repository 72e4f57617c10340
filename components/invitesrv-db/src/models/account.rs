use super::db_id_format;
use chrono::NaiveDateTime;
use diesel::{self,
             pg::PgConnection,
             result::{DatabaseErrorKind,
                      Error as Dre},
             ExpressionMethods,
             QueryDsl,
             RunQueryDsl};
use rand::{distributions::Alphanumeric,
           Rng};

use crate::{data_store::DataStore,
            error::Result,
            metrics::{Counter,
                      CounterMetric},
            schema::account::{account_tokens,
                              accounts}};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
pub struct Account {
    #[serde(with = "db_id_format")]
    pub id:         i64,
    pub name:       String,
    pub email:      String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "accounts"]
pub struct NewAccount<'a> {
    pub name:  &'a str,
    pub email: &'a str,
}

impl Account {
    pub fn find_or_create(req: &NewAccount, db: &DataStore) -> Result<Account> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        match diesel::insert_into(accounts::table).values(req)
                                                  .get_result(&*conn)
        {
            Ok(account) => Ok(account),
            Err(Dre::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Self::get(req.name, db)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(name: &str, db: &DataStore) -> Result<Account> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        accounts::table.filter(accounts::name.eq(name))
                       .first(&*conn)
                       .map_err(Into::into)
    }

    pub fn get_by_id(id: i64, db: &DataStore) -> Result<Account> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        accounts::table.find(id).first(&*conn).map_err(Into::into)
    }
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct AccountToken {
    pub id:         i64,
    #[serde(with = "db_id_format")]
    pub account_id: i64,
    pub token:      String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "account_tokens"]
pub struct NewAccountToken<'a> {
    pub account_id: i64,
    pub token:      &'a str,
}

impl AccountToken {
    /// Mint a bearer token for an account. Token issuance proper belongs
    /// to the external identity system; this gives tests and local
    /// deployments something the authentication layer can resolve.
    pub fn generate(account_id: i64, db: &DataStore) -> Result<AccountToken> {
        Counter::DBCall.increment();
        let token: String = rand::thread_rng().sample_iter(&Alphanumeric)
                                              .take(32)
                                              .map(char::from)
                                              .collect();
        let conn = db.get_conn()?;
        let req = NewAccountToken { account_id,
                                    token: &token, };
        diesel::insert_into(account_tokens::table).values(&req)
                                                  .get_result(&*conn)
                                                  .map_err(Into::into)
    }
}

/// Verified identity attached to a request by the authentication layer.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(with = "db_id_format")]
    pub id:    i64,
    pub name:  String,
    pub email: String,
}

impl Session {
    pub fn from_token(token: &str, db: &DataStore) -> Result<Session> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        let (id, name, email) = Self::lookup(token, &*conn)?;
        Ok(Session { id, name, email })
    }

    fn lookup(token: &str, conn: &PgConnection) -> Result<(i64, String, String)> {
        account_tokens::table.inner_join(accounts::table)
                             .filter(account_tokens::token.eq(token))
                             .select((accounts::id, accounts::name, accounts::email))
                             .first(conn)
                             .map_err(Into::into)
    }
}
