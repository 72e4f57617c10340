// Copyright (c) 2016-2017 Chef Software Inc. and/or applicable contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The invitation workflow: orchestration between the verified session,
//! the membership checks, the invitation store, and account sync. The
//! HTTP resources stay thin and delegate here.

use crate::db::models::{account::{Account,
                                  Session},
                        invitations::{NewOriginInvitation,
                                      OriginInvitation},
                        origin::Origin};

use crate::server::{error::{Error,
                            Result},
                    helpers,
                    services::account_sync::MembershipEvent,
                    AppState};

/// Create (or return the still-pending) invitation for `username` to join
/// `origin_name`. The caller must already hold a membership-checked
/// session for the origin; the invitee additionally must exist and must
/// not already be a member.
pub fn invite_to_origin(state: &AppState,
                        session: &Session,
                        origin_name: &str,
                        username: &str)
                        -> Result<OriginInvitation> {
    let recipient = Account::get(username, &state.db)?;

    if Origin::check_membership(origin_name, recipient.id, &state.db)? {
        debug!("User {} is already a member of {}", username, origin_name);
        return Err(Error::Authorization);
    }

    let new_invitation = NewOriginInvitation { origin:       origin_name,
                                               account_id:   recipient.id,
                                               account_name: &recipient.name,
                                               owner_id:     session.id, };

    helpers::with_retry(|| OriginInvitation::create(&new_invitation, &state.db))
        .map_err(Error::DbError)
}

/// Accept an invitation on behalf of its invitee. Membership is visible
/// locally as soon as this returns; the external account service only
/// converges after the notifier delivers.
pub fn accept_invitation(state: &AppState,
                         session: &Session,
                         origin_name: &str,
                         invite_id: i64)
                         -> Result<OriginInvitation> {
    let invitation = get_for_origin(state, origin_name, invite_id)?;

    if invitation.account_id != session.id {
        return Err(Error::Authorization);
    }

    let accepted =
        helpers::with_retry(|| OriginInvitation::accept(invite_id, &state.db))?;

    state.account_sync
         .notify(MembershipEvent { account_id: accepted.account_id,
                                   origin_id:  accepted.origin_id,
                                   origin:     accepted.origin.clone(), });
    Ok(accepted)
}

/// Invitee declines; terminal, no membership change.
pub fn ignore_invitation(state: &AppState,
                         session: &Session,
                         origin_name: &str,
                         invite_id: i64)
                         -> Result<OriginInvitation> {
    let invitation = get_for_origin(state, origin_name, invite_id)?;

    if invitation.account_id != session.id {
        return Err(Error::Authorization);
    }

    helpers::with_retry(|| OriginInvitation::ignore(invite_id, &state.db)).map_err(Error::DbError)
}

/// The inviter or the origin owner withdraws the invitation; terminal,
/// no membership change.
pub fn rescind_invitation(state: &AppState,
                          session: &Session,
                          origin_name: &str,
                          invite_id: i64)
                          -> Result<OriginInvitation> {
    let invitation = get_for_origin(state, origin_name, invite_id)?;
    let origin = Origin::get(origin_name, &state.db)?;

    if invitation.owner_id != session.id && origin.owner_id != session.id {
        return Err(Error::Authorization);
    }

    helpers::with_retry(|| OriginInvitation::rescind(invite_id, &state.db)).map_err(Error::DbError)
}

// An invitation id from the wrong origin's URL space is treated as absent.
fn get_for_origin(state: &AppState, origin_name: &str, invite_id: i64) -> Result<OriginInvitation> {
    let invitation = OriginInvitation::get(invite_id, &state.db)?;
    if invitation.origin != origin_name {
        return Err(Error::NotFound);
    }
    Ok(invitation)
}
