use crate::{db::models::invitations::OriginInvitation,
            server::{authorize::authorize_session,
                     error::Error,
                     framework::headers,
                     AppState}};
use actix_web::{http::header,
                web::{self,
                      Data,
                      ServiceConfig},
                HttpRequest,
                HttpResponse};

pub struct User;

impl User {
    // Route registration
    //
    pub fn register(cfg: &mut ServiceConfig) {
        cfg.route("/user/invitations", web::get().to(get_invitations));
    }
}

// Route handlers - these functions can return any Responder trait
//
#[allow(clippy::needless_pass_by_value)]
async fn get_invitations(req: HttpRequest, state: Data<AppState>) -> HttpResponse {
    let session = match authorize_session(&req, None) {
        Ok(session) => session,
        Err(err) => return err.into(),
    };

    match OriginInvitation::list_by_account(session.id, &state.db).map_err(Error::DbError) {
        Ok(list) => {
            let body = json!({ "invitations": list });
            HttpResponse::Ok().append_header((header::CACHE_CONTROL, headers::NO_CACHE))
                              .json(body)
        }
        Err(err) => {
            debug!("{}", err);
            err.into()
        }
    }
}
