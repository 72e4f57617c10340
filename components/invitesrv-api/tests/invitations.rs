//! End to end exercise of the invitation lifecycle over HTTP: invite,
//! list, accept, ignore, rescind, plus the eventual sync of accepted
//! memberships to a stub account service.
//!
//! Every test here needs a reachable Postgres (POSTGRES_* env) and is
//! `#[ignore]`d; run with `cargo test -- --ignored`.

use std::{sync::{Arc,
                 Mutex},
          time::{Duration,
                 Instant}};

use actix_web::{http::StatusCode,
                middleware::from_fn,
                test,
                web::{self,
                      Data},
                App,
                HttpResponse,
                HttpServer};
use serde_json::Value;

use invitesrv_api::{config::Config,
                    server::{self,
                             framework::middleware::authentication_middleware,
                             services::account_sync::AccountSyncClient,
                             AppState}};
use invitesrv_db::{models::{account::{Account,
                                      AccountToken,
                                      NewAccount},
                            origin::{NewOrigin,
                                     Origin}},
                   test as test_db,
                   DataStore};

struct Member {
    id:    i64,
    token: String,
}

struct Cast {
    logan:  Member,
    bobo:   Member,
    wesker: Member,
}

fn member(name: &str, email: &str, db: &DataStore) -> Member {
    let account = Account::find_or_create(&NewAccount { name, email }, db).unwrap();
    let token = AccountToken::generate(account.id, db).unwrap().token;
    Member { id: account.id,
             token }
}

// logan owns the xmen origin; bobo is the invitee; wesker is an outsider.
fn seed(db: &DataStore) -> Cast {
    let logan = member("logan", "logan@example.com", db);
    let bobo = member("bobo", "bobo@example.com", db);
    let wesker = member("wesker", "awesker@umbrella.corp", db);
    Origin::create(&NewOrigin { name:     "xmen",
                                owner_id: logan.id, },
                   db).unwrap();
    Cast { logan,
           bobo,
           wesker }
}

fn offline_config() -> Config {
    let mut config = Config::default();
    config.accountsrv.enabled = false;
    config
}

macro_rules! test_app {
    ($config:expr, $db:expr) => {{
        let account_sync = AccountSyncClient::start(&$config.accountsrv);
        test::init_service(
            App::new().app_data(Data::new(AppState::new(&$config, &$db, &account_sync)))
                      .wrap(from_fn(authentication_middleware))
                      .configure(server::routes),
        ).await
    }};
}

fn authed(req: test::TestRequest, member: &Member) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", member.token)))
}

#[actix_rt::test]
#[ignore]
async fn status_is_open_and_everything_else_requires_a_session() {
    let db = test_db::datastore();
    let config = offline_config();
    let app = test_app!(config, db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/status").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app,
                                  test::TestRequest::get().uri("/user/invitations").to_request())
               .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/user/invitations")
                                      .insert_header(("Authorization", "Bearer bogus"));
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
#[ignore]
async fn only_origin_members_may_invite() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.wesker);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
#[ignore]
async fn inviting_a_user_creates_a_pending_invitation_once() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["origin"], "xmen");
    assert_eq!(body["account_id"], cast.bobo.id.to_string());
    assert_eq!(body["owner_id"], cast.logan.id.to_string());
    assert_eq!(body["status"], "pending");

    // A repeat invite is answered with the same pending invitation.
    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let repeat: Value = test::read_body_json(resp).await;
    assert_eq!(repeat["id"], body["id"]);

    // Both sides can see it.
    let req = authed(test::TestRequest::get().uri("/user/invitations"), &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listing: Value = test::read_body_json(resp).await;
    assert_eq!(listing["invitations"].as_array().unwrap().len(), 1);

    let req = authed(test::TestRequest::get()
                         .uri("/depot/origins/xmen/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listing: Value = test::read_body_json(resp).await;
    assert_eq!(listing["origin"], "xmen");
    assert_eq!(listing["invitations"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
#[ignore]
async fn inviting_an_unknown_user_or_origin_is_not_found() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/magneto/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/brotherhood/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

async fn record_membership(body: web::Json<Value>,
                           state: Data<Arc<Mutex<Vec<Value>>>>)
                           -> HttpResponse {
    state.lock().unwrap().push(body.into_inner());
    HttpResponse::Ok().finish()
}

#[actix_rt::test]
#[ignore]
async fn accepting_grants_membership_and_syncs_the_account_service() {
    let db = test_db::datastore();
    let cast = seed(&db);

    // Stub account service on an ephemeral port, recording every
    // membership it is told about.
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = received.clone();
    let srv = HttpServer::new(move || {
        App::new().app_data(Data::new(recorder.clone()))
                  .route("/v1/accounts/{account_id}/origins",
                         web::post().to(record_membership))
    }).workers(1)
      .bind(("127.0.0.1", 0))
      .unwrap();
    let port = srv.addrs()[0].port();
    actix_rt::spawn(srv.run());

    let mut config = Config::default();
    config.accountsrv.url = format!("http://127.0.0.1:{}/v1", port);
    config.accountsrv.retry_base_delay_ms = 25;
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let invitation: Value = test::read_body_json(resp).await;
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    // Only the invitee may accept.
    let req = authed(test::TestRequest::put()
                         .uri(&format!("/depot/origins/xmen/invitations/{}", invitation_id)),
                     &cast.wesker);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = authed(test::TestRequest::put()
                         .uri(&format!("/depot/origins/xmen/invitations/{}", invitation_id)),
                     &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let accepted: Value = test::read_body_json(resp).await;
    assert_eq!(accepted["status"], "accepted");

    // Membership is visible locally right away.
    let req = authed(test::TestRequest::get().uri("/depot/origins/xmen/users"), &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let members: Value = test::read_body_json(resp).await;
    let names: Vec<&str> = members["members"].as_array()
                                             .unwrap()
                                             .iter()
                                             .map(|v| v.as_str().unwrap())
                                             .collect();
    assert!(names.contains(&"bobo"));

    // The account service converges shortly after.
    let deadline = Instant::now() + Duration::from_secs(5);
    let event = loop {
        if let Some(event) = received.lock().unwrap().first().cloned() {
            break event;
        }
        assert!(Instant::now() < deadline,
                "account service never heard about the membership");
        actix_rt::time::sleep(Duration::from_millis(25)).await;
    };
    assert_eq!(event["account_id"].as_i64().unwrap().to_string(),
               cast.bobo.id.to_string());
    assert_eq!(event["origin"], "xmen");
}

#[actix_rt::test]
#[ignore]
async fn ignored_invitations_are_terminal() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    let invitation: Value = test::read_body_json(resp).await;
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let req = authed(test::TestRequest::put()
                         .uri(&format!("/depot/origins/xmen/invitations/{}/ignore", invitation_id)),
                     &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ignored: Value = test::read_body_json(resp).await;
    assert_eq!(ignored["status"], "ignored");

    // No takebacks: an ignored invitation cannot be accepted.
    let req = authed(test::TestRequest::put()
                         .uri(&format!("/depot/origins/xmen/invitations/{}", invitation_id)),
                     &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_rt::test]
#[ignore]
async fn the_inviter_can_rescind_a_pending_invitation() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::post()
                         .uri("/depot/origins/xmen/users/bobo/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    let invitation: Value = test::read_body_json(resp).await;
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let req = authed(test::TestRequest::delete()
                         .uri(&format!("/depot/origins/xmen/invitations/{}", invitation_id)),
                     &cast.wesker);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = authed(test::TestRequest::delete()
                         .uri(&format!("/depot/origins/xmen/invitations/{}", invitation_id)),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rescinded: Value = test::read_body_json(resp).await;
    assert_eq!(rescinded["status"], "rescinded");

    // The record survives for audit; the invitee just no longer has a
    // pending invitation.
    let req = authed(test::TestRequest::get().uri("/user/invitations"), &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    let listing: Value = test::read_body_json(resp).await;
    assert!(listing["invitations"].as_array().unwrap().is_empty());

    let req = authed(test::TestRequest::get()
                         .uri("/depot/origins/xmen/invitations"),
                     &cast.logan);
    let resp = test::call_service(&app, req.to_request()).await;
    let listing: Value = test::read_body_json(resp).await;
    assert_eq!(listing["invitations"][0]["status"], "rescinded");
}

#[actix_rt::test]
#[ignore]
async fn a_non_numeric_invitation_id_is_unprocessable() {
    let db = test_db::datastore();
    let cast = seed(&db);
    let config = offline_config();
    let app = test_app!(config, db);

    let req = authed(test::TestRequest::put()
                         .uri("/depot/origins/xmen/invitations/not-a-number"),
                     &cast.bobo);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
