use super::db_id_format;
use chrono::{NaiveDateTime,
             Utc};
use diesel::{self,
             pg::PgConnection,
             result::{DatabaseErrorKind,
                      Error as Dre},
             Connection,
             ExpressionMethods,
             OptionalExtension,
             QueryDsl,
             RunQueryDsl};
use std::fmt;

use crate::{data_store::DataStore,
            error::{Error,
                    Result},
            metrics::{Counter,
                      CounterMetric},
            models::origin::{NewOriginMember,
                             Origin},
            schema::{invitation::origin_invitations,
                     member::origin_members}};

#[derive(DbEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[PgType = "invitation_status"]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Ignored,
    Rescinded,
}

impl InvitationStatus {
    /// Terminal states never transition again; records are kept for audit.
    pub fn is_terminal(self) -> bool { self != InvitationStatus::Pending }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match *self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Ignored => "ignored",
            InvitationStatus::Rescinded => "rescinded",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[table_name = "origin_invitations"]
pub struct OriginInvitation {
    #[serde(with = "db_id_format")]
    pub id:           i64,
    #[serde(with = "db_id_format")]
    pub origin_id:    i64,
    pub origin:       String,
    #[serde(with = "db_id_format")]
    pub account_id:   i64,
    pub account_name: String,
    #[serde(with = "db_id_format")]
    pub owner_id:     i64,
    pub status:       InvitationStatus,
    pub created_at:   Option<NaiveDateTime>,
    pub updated_at:   Option<NaiveDateTime>,
}

pub struct NewOriginInvitation<'a> {
    pub origin:       &'a str,
    pub account_id:   i64,
    pub account_name: &'a str,
    pub owner_id:     i64,
}

// Status is omitted so the column default ('pending') applies.
#[derive(Insertable)]
#[table_name = "origin_invitations"]
struct NewInvitationRow<'a> {
    origin_id:    i64,
    origin:       &'a str,
    account_id:   i64,
    account_name: &'a str,
    owner_id:     i64,
}

impl OriginInvitation {
    /// Create a pending invitation for (origin, invitee). Idempotent: if a
    /// pending record already exists for the pair it is returned unchanged,
    /// so re-inviting never produces a second live invitation. The partial
    /// unique index on pending rows enforces this across every running
    /// instance of the service.
    pub fn create(req: &NewOriginInvitation, db: &DataStore) -> Result<OriginInvitation> {
        Counter::DBCall.increment();
        Counter::InvitationCreate.increment();
        let origin = Origin::get(req.origin, db)?;
        let row = NewInvitationRow { origin_id:    origin.id,
                                     origin:       &origin.name,
                                     account_id:   req.account_id,
                                     account_name: req.account_name,
                                     owner_id:     req.owner_id, };
        let conn = db.get_conn()?;
        match diesel::insert_into(origin_invitations::table).values(&row)
                                                            .get_result(&*conn)
        {
            Ok(invitation) => Ok(invitation),
            Err(Dre::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                debug!("Found existing pending invitation for {}/{}",
                       req.origin, req.account_name);
                origin_invitations::table.filter(origin_invitations::origin_id.eq(origin.id))
                                         .filter(origin_invitations::account_id.eq(req.account_id))
                                         .filter(origin_invitations::status
                                                      .eq(InvitationStatus::Pending))
                                         .first(&*conn)
                                         .map_err(Into::into)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(invite_id: i64, db: &DataStore) -> Result<OriginInvitation> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        origin_invitations::table.find(invite_id)
                                 .first(&*conn)
                                 .map_err(Into::into)
    }

    pub fn list_by_origin(origin: &str, db: &DataStore) -> Result<Vec<OriginInvitation>> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        origin_invitations::table.filter(origin_invitations::origin.eq(origin))
                                 .order(origin_invitations::id.asc())
                                 .get_results(&*conn)
                                 .map_err(Into::into)
    }

    /// Pending invitations addressed to an account.
    pub fn list_by_account(account_id: i64, db: &DataStore) -> Result<Vec<OriginInvitation>> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        origin_invitations::table.filter(origin_invitations::account_id.eq(account_id))
                                 .filter(origin_invitations::status
                                              .eq(InvitationStatus::Pending))
                                 .order(origin_invitations::id.asc())
                                 .get_results(&*conn)
                                 .map_err(Into::into)
    }

    /// Move an invitation through the state machine. Only
    /// Pending -> {Accepted, Ignored, Rescinded} is legal; everything else
    /// is an `InvalidTransition`. The update is guarded on the current row
    /// status, so concurrent transitions race in the database and exactly
    /// one wins.
    pub fn transition(invite_id: i64,
                      to: InvitationStatus,
                      db: &DataStore)
                      -> Result<OriginInvitation> {
        Counter::DBCall.increment();
        let conn = db.get_conn()?;
        Self::transition_on(invite_id, to, &*conn)
    }

    fn transition_on(invite_id: i64,
                     to: InvitationStatus,
                     conn: &PgConnection)
                     -> Result<OriginInvitation> {
        if to == InvitationStatus::Pending {
            let current: OriginInvitation =
                origin_invitations::table.find(invite_id).first(conn)?;
            return Err(Error::InvalidTransition(current.status, to));
        }
        let updated: Option<OriginInvitation> =
            diesel::update(origin_invitations::table.find(invite_id)
                                                    .filter(origin_invitations::status
                                                                 .eq(InvitationStatus::Pending)))
                .set((origin_invitations::status.eq(to),
                      origin_invitations::updated_at.eq(Some(Utc::now().naive_utc()))))
                .get_result(conn)
                .optional()?;
        match updated {
            Some(invitation) => Ok(invitation),
            None => {
                let current: OriginInvitation =
                    origin_invitations::table.find(invite_id).first(conn)?;
                Err(Error::InvalidTransition(current.status, to))
            }
        }
    }

    /// Accept the invitation and add the invitee to the origin's
    /// membership, in one transaction. If the membership insert fails the
    /// transition rolls back and the record stays Pending, so the invitee
    /// can retry. The record is retained as Accepted.
    pub fn accept(invite_id: i64, db: &DataStore) -> Result<OriginInvitation> {
        Counter::DBCall.increment();
        Counter::InvitationAccept.increment();
        let conn = db.get_conn()?;
        conn.transaction::<_, Error, _>(|| {
            let invitation =
                Self::transition_on(invite_id, InvitationStatus::Accepted, &*conn)?;
            let member = NewOriginMember { origin_id:    invitation.origin_id,
                                           account_id:   invitation.account_id,
                                           origin_name:  &invitation.origin,
                                           account_name: &invitation.account_name, };
            diesel::insert_into(origin_members::table).values(&member)
                                                      .on_conflict_do_nothing()
                                                      .execute(&*conn)?;
            Ok(invitation)
        })
    }

    pub fn ignore(invite_id: i64, db: &DataStore) -> Result<OriginInvitation> {
        Self::transition(invite_id, InvitationStatus::Ignored, db)
    }

    pub fn rescind(invite_id: i64, db: &DataStore) -> Result<OriginInvitation> {
        Self::transition(invite_id, InvitationStatus::Rescinded, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::{account::{Account,
                                   NewAccount},
                         origin::NewOrigin},
                test};
    use std::thread;

    // These need a reachable Postgres (POSTGRES_* env); run with
    // `cargo test -- --ignored`.

    struct Fixture {
        db:      DataStore,
        owner:   Account,
        invitee: Account,
        origin:  Origin,
    }

    fn fixture() -> Fixture {
        let db = test::datastore();
        fixture_on(db)
    }

    fn fixture_on(db: DataStore) -> Fixture {
        let owner = Account::find_or_create(&NewAccount { name:  "logan",
                                                          email: "logan@example.com", },
                                            &db).unwrap();
        let invitee = Account::find_or_create(&NewAccount { name:  "bobo",
                                                            email: "bobo@example.com", },
                                              &db).unwrap();
        let origin = Origin::create(&NewOrigin { name:     "xmen",
                                                 owner_id: owner.id, },
                                    &db).unwrap();
        Fixture { db,
                  owner,
                  invitee,
                  origin }
    }

    fn invite(fix: &Fixture) -> OriginInvitation {
        OriginInvitation::create(&NewOriginInvitation { origin:       &fix.origin.name,
                                                        account_id:   fix.invitee.id,
                                                        account_name: &fix.invitee.name,
                                                        owner_id:     fix.owner.id, },
                                 &fix.db).unwrap()
    }

    #[test]
    #[ignore]
    fn create_populates_the_record() {
        let fix = fixture();
        let invitation = invite(&fix);
        assert_eq!(invitation.origin_id, fix.origin.id);
        assert_eq!(invitation.account_id, fix.invitee.id);
        assert_eq!(invitation.owner_id, fix.owner.id);
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[test]
    #[ignore]
    fn create_for_unknown_origin_is_not_found() {
        let fix = fixture();
        let err = OriginInvitation::create(&NewOriginInvitation { origin:       "avengers",
                                                                  account_id:   fix.invitee.id,
                                                                  account_name: "bobo",
                                                                  owner_id:     fix.owner.id, },
                                           &fix.db).unwrap_err();
        assert_eq!(err, Error::NotFound);
    }

    #[test]
    #[ignore]
    fn create_is_idempotent_while_pending() {
        let fix = fixture();
        let first = invite(&fix);
        let second = invite(&fix);
        assert_eq!(first.id, second.id);
        let pending: Vec<_> =
            OriginInvitation::list_by_origin("xmen", &fix.db).unwrap()
                                                             .into_iter()
                                                             .filter(|i| {
                                                                 i.status
                                                                 == InvitationStatus::Pending
                                                             })
                                                             .collect();
        assert_eq!(pending.len(), 1);
    }

    // Two service instances with separate pools against one database must
    // agree on the live invitation for a pair.
    #[test]
    #[ignore]
    fn create_is_idempotent_across_instances() {
        let config = test::scratch_config();
        let fix = fixture_on(test::datastore_for(&config));
        let other = test::datastore_for(&config);
        let duplicate =
            OriginInvitation::create(&NewOriginInvitation { origin:       &fix.origin.name,
                                                            account_id:   fix.invitee.id,
                                                            account_name: &fix.invitee.name,
                                                            owner_id:     fix.owner.id, },
                                     &other).unwrap();
        let first = invite(&fix);
        assert_eq!(first.id, duplicate.id);
        assert_eq!(OriginInvitation::list_by_account(fix.invitee.id, &fix.db).unwrap()
                                                                             .len(),
                   1);
    }

    #[test]
    #[ignore]
    fn terminal_invitation_allows_a_fresh_pending() {
        let fix = fixture();
        let first = invite(&fix);
        OriginInvitation::ignore(first.id, &fix.db).unwrap();
        let second = invite(&fix);
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, InvitationStatus::Pending);
    }

    #[test]
    #[ignore]
    fn concurrent_creates_yield_a_single_pending() {
        let fix = fixture();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = fix.db.clone();
            let origin = fix.origin.name.clone();
            let account_id = fix.invitee.id;
            let owner_id = fix.owner.id;
            handles.push(thread::spawn(move || {
                             OriginInvitation::create(&NewOriginInvitation { origin: &origin,
                                                                             account_id,
                                                                             account_name: "bobo",
                                                                             owner_id },
                                                      &db).unwrap()
                                                          .id
                         }));
        }
        let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        let pending = OriginInvitation::list_by_account(fix.invitee.id, &fix.db).unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    #[ignore]
    fn exactly_one_transition_succeeds_on_a_pending_invitation() {
        let fix = fixture();
        let invitation = invite(&fix);
        OriginInvitation::accept(invitation.id, &fix.db).unwrap();

        let err = OriginInvitation::ignore(invitation.id, &fix.db).unwrap_err();
        assert_eq!(err,
                   Error::InvalidTransition(InvitationStatus::Accepted,
                                            InvitationStatus::Ignored));
        let err = OriginInvitation::rescind(invitation.id, &fix.db).unwrap_err();
        assert_eq!(err,
                   Error::InvalidTransition(InvitationStatus::Accepted,
                                            InvitationStatus::Rescinded));
    }

    #[test]
    #[ignore]
    fn accept_adds_the_invitee_to_the_membership_set() {
        let fix = fixture();
        let invitation = invite(&fix);
        assert!(!Origin::check_membership("xmen", fix.invitee.id, &fix.db).unwrap());
        OriginInvitation::accept(invitation.id, &fix.db).unwrap();
        assert!(Origin::check_membership("xmen", fix.invitee.id, &fix.db).unwrap());
        let accepted = OriginInvitation::get(invitation.id, &fix.db).unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
    }

    // If the membership insert fails the whole accept must roll back: the
    // record stays Pending and a later accept can still succeed. A
    // mid-flight table rename stands in for a database fault.
    #[test]
    #[ignore]
    fn failed_accept_leaves_the_invitation_pending() {
        let fix = fixture();
        let invitation = invite(&fix);

        let conn = fix.db.get_conn().unwrap();
        diesel::sql_query("ALTER TABLE origin_members RENAME TO origin_members_offline")
            .execute(&*conn)
            .unwrap();
        assert!(OriginInvitation::accept(invitation.id, &fix.db).is_err());
        assert_eq!(OriginInvitation::get(invitation.id, &fix.db).unwrap().status,
                   InvitationStatus::Pending);

        diesel::sql_query("ALTER TABLE origin_members_offline RENAME TO origin_members")
            .execute(&*conn)
            .unwrap();
        OriginInvitation::accept(invitation.id, &fix.db).unwrap();
        assert!(Origin::check_membership("xmen", fix.invitee.id, &fix.db).unwrap());
    }

    #[test]
    #[ignore]
    fn ignore_and_rescind_do_not_touch_membership() {
        let fix = fixture();
        let first = invite(&fix);
        OriginInvitation::ignore(first.id, &fix.db).unwrap();
        let second = invite(&fix);
        OriginInvitation::rescind(second.id, &fix.db).unwrap();
        assert!(!Origin::check_membership("xmen", fix.invitee.id, &fix.db).unwrap());
    }

    #[test]
    #[ignore]
    fn list_by_account_only_returns_pending() {
        let fix = fixture();
        let first = invite(&fix);
        OriginInvitation::ignore(first.id, &fix.db).unwrap();
        assert!(OriginInvitation::list_by_account(fix.invitee.id, &fix.db).unwrap()
                                                                          .is_empty());
        invite(&fix);
        assert_eq!(OriginInvitation::list_by_account(fix.invitee.id, &fix.db).unwrap()
                                                                             .len(),
                   1);
    }

    #[test]
    #[ignore]
    fn transition_on_missing_invitation_is_not_found() {
        let fix = fixture();
        let err = OriginInvitation::accept(12345, &fix.db).unwrap_err();
        assert_eq!(err, Error::NotFound);
    }
}
