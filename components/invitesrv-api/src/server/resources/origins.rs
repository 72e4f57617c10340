use crate::{db::models::{invitations::OriginInvitation,
                         origin::OriginMember},
            server::{authorize::authorize_session,
                     error::Error,
                     framework::headers,
                     handlers,
                     AppState}};
use actix_web::{http::{header,
                       StatusCode},
                web::{self,
                      Data,
                      Path,
                      ServiceConfig},
                HttpRequest,
                HttpResponse};

pub struct Origins {}

impl Origins {
    // Route registration
    //
    pub fn register(cfg: &mut ServiceConfig) {
        cfg.route("/depot/origins/{origin}/users",
                  web::get().to(list_origin_members))
           .route("/depot/origins/{origin}/invitations",
                  web::get().to(list_origin_invitations))
           .route("/depot/origins/{origin}/users/{username}/invitations",
                  web::post().to(invite_to_origin))
           .route("/depot/origins/{origin}/invitations/{invitation_id}",
                  web::put().to(accept_invitation))
           .route("/depot/origins/{origin}/invitations/{invitation_id}",
                  web::delete().to(rescind_invitation))
           .route("/depot/origins/{origin}/invitations/{invitation_id}/ignore",
                  web::put().to(ignore_invitation));
    }
}

// Route handlers - these functions can return any Responder trait
//
#[allow(clippy::needless_pass_by_value)]
async fn invite_to_origin(req: HttpRequest,
                          path: Path<(String, String)>,
                          state: Data<AppState>)
                          -> HttpResponse {
    let (origin, user) = path.into_inner();

    let session = match authorize_session(&req, Some(&origin)) {
        Ok(session) => session,
        Err(err) => return err.into(),
    };

    debug!("Creating invitation for user {} origin {}", &user, &origin);

    match handlers::invite_to_origin(&state, &session, &origin, &user) {
        Ok(invitation) => HttpResponse::Created().json(&invitation),
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
async fn accept_invitation(req: HttpRequest,
                           path: Path<(String, String)>,
                           state: Data<AppState>)
                           -> HttpResponse {
    let (origin, invitation) = path.into_inner();

    let session = match authorize_session(&req, None) {
        Ok(session) => session,
        Err(err) => return err.into(),
    };

    let invitation_id = match invitation.parse::<i64>() {
        Ok(invitation_id) => invitation_id,
        Err(_) => return HttpResponse::new(StatusCode::UNPROCESSABLE_ENTITY),
    };

    debug!("Accepting invitation for user {} origin {}",
           session.id, &origin);

    match handlers::accept_invitation(&state, &session, &origin, invitation_id) {
        Ok(invitation) => HttpResponse::Ok().json(&invitation),
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
async fn ignore_invitation(req: HttpRequest,
                           path: Path<(String, String)>,
                           state: Data<AppState>)
                           -> HttpResponse {
    let (origin, invitation) = path.into_inner();

    let session = match authorize_session(&req, None) {
        Ok(session) => session,
        Err(err) => return err.into(),
    };

    let invitation_id = match invitation.parse::<i64>() {
        Ok(invitation_id) => invitation_id,
        Err(_) => return HttpResponse::new(StatusCode::UNPROCESSABLE_ENTITY),
    };

    debug!("Ignoring invitation id {} for user {} origin {}",
           invitation_id, session.id, &origin);

    match handlers::ignore_invitation(&state, &session, &origin, invitation_id) {
        Ok(invitation) => HttpResponse::Ok().json(&invitation),
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
async fn rescind_invitation(req: HttpRequest,
                            path: Path<(String, String)>,
                            state: Data<AppState>)
                            -> HttpResponse {
    let (origin, invitation) = path.into_inner();

    let session = match authorize_session(&req, None) {
        Ok(session) => session,
        Err(err) => return err.into(),
    };

    let invitation_id = match invitation.parse::<i64>() {
        Ok(invitation_id) => invitation_id,
        Err(_) => return HttpResponse::new(StatusCode::UNPROCESSABLE_ENTITY),
    };

    debug!("Rescinding invitation id {} for user {} origin {}",
           invitation_id, session.id, &origin);

    match handlers::rescind_invitation(&state, &session, &origin, invitation_id) {
        Ok(invitation) => HttpResponse::Ok().json(&invitation),
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
async fn list_origin_invitations(req: HttpRequest,
                                 path: Path<String>,
                                 state: Data<AppState>)
                                 -> HttpResponse {
    let origin = path.into_inner();

    if let Err(err) = authorize_session(&req, Some(&origin)) {
        return err.into();
    }

    match OriginInvitation::list_by_origin(&origin, &state.db).map_err(Error::DbError) {
        Ok(list) => {
            let body = json!({
                "origin": &origin,
                "invitations": list
            });
            HttpResponse::Ok().append_header((header::CACHE_CONTROL, headers::NO_CACHE))
                              .json(body)
        }
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
async fn list_origin_members(req: HttpRequest,
                             path: Path<String>,
                             state: Data<AppState>)
                             -> HttpResponse {
    let origin = path.into_inner();

    if let Err(err) = authorize_session(&req, Some(&origin)) {
        return err.into();
    }

    match OriginMember::list(&origin, &state.db).map_err(Error::DbError) {
        Ok(members) => {
            let names: Vec<&str> = members.iter().map(|m| m.account_name.as_str()).collect();
            let body = json!({
                "origin": &origin,
                "members": names
            });
            HttpResponse::Ok().append_header((header::CACHE_CONTROL, headers::NO_CACHE))
                              .json(body)
        }
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}
