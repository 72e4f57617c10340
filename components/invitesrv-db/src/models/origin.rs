use super::db_id_format;
use chrono::NaiveDateTime;
use diesel::{self,
             dsl::count_star,
             Connection,
             ExpressionMethods,
             QueryDsl,
             RunQueryDsl};

use crate::{data_store::DataStore,
            error::{Error,
                    Result},
            metrics::{Counter,
                      CounterMetric},
            models::account::Account,
            schema::{member::origin_members,
                     origin::origins}};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[table_name = "origins"]
pub struct Origin {
    #[serde(with = "db_id_format")]
    pub id:         i64,
    pub name:       String,
    #[serde(with = "db_id_format")]
    pub owner_id:   i64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "origins"]
pub struct NewOrigin<'a> {
    pub name:     &'a str,
    pub owner_id: i64,
}

impl Origin {
    pub fn create(req: &NewOrigin, db: &DataStore) -> Result<Origin> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        let owner = Account::get_by_id(req.owner_id, db)?;
        conn.transaction::<_, Error, _>(|| {
            let origin: Origin = diesel::insert_into(origins::table).values(req)
                                                                    .get_result(&*conn)?;
            // The owner is implicitly a member from day one
            let member = NewOriginMember { origin_id:    origin.id,
                                           account_id:   owner.id,
                                           origin_name:  &origin.name,
                                           account_name: &owner.name, };
            diesel::insert_into(origin_members::table).values(&member)
                                                      .execute(&*conn)?;
            Ok(origin)
        })
    }

    pub fn get(origin: &str, db: &DataStore) -> Result<Origin> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        origins::table.filter(origins::name.eq(origin))
                      .first(&*conn)
                      .map_err(Into::into)
    }

    pub fn check_membership(origin: &str, account_id: i64, db: &DataStore) -> Result<bool> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        let total: i64 = origin_members::table.filter(origin_members::origin_name.eq(origin))
                                              .filter(origin_members::account_id.eq(account_id))
                                              .select(count_star())
                                              .first(&*conn)?;
        Ok(total > 0)
    }
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct OriginMember {
    #[serde(with = "db_id_format")]
    pub origin_id:    i64,
    #[serde(with = "db_id_format")]
    pub account_id:   i64,
    pub origin_name:  String,
    pub account_name: String,
    pub created_at:   Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "origin_members"]
pub struct NewOriginMember<'a> {
    pub origin_id:    i64,
    pub account_id:   i64,
    pub origin_name:  &'a str,
    pub account_name: &'a str,
}

impl OriginMember {
    pub fn list(origin: &str, db: &DataStore) -> Result<Vec<OriginMember>> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        let list = origin_members::table.filter(origin_members::origin_name.eq(origin))
                                        .order(origin_members::account_name.asc())
                                        .get_results(&*conn)?;
        if list.is_empty() {
            // Distinguish an empty membership from a missing origin
            Origin::get(origin, db)?;
        }
        Ok(list)
    }
}
