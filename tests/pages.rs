mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Query};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use daana_client::outreach::ContactMessage;
use daana_client::pages::{DonationForm, DonationHistoryView, HomeFeed, ProfilePage, ProgramSearch};
use daana_client::programs::DonationRequest;
use daana_client::session::now_epoch_seconds;
use daana_client::types::{DonorProfileUpdate, Gender};
use daana_client::{
    Attachment, Error, MemoryStorage, ProgramId, Session, SessionStore, UserProfile,
};
use serde_json::{Value, json};
use time::macros::date;

use common::Backend;

fn signed_in(backend: &Backend) -> daana_client::AuthFlow<MemoryStorage> {
    let store = SessionStore::new(MemoryStorage::new());
    store
        .save(&Session::issued(
            "acc-7".into(),
            None,
            None,
            Some(600),
            UserProfile::default(),
            now_epoch_seconds(),
        ))
        .unwrap();
    daana_client::AuthFlow::new(backend.gateway(), store)
}

#[tokio::test]
async fn test_home_feed_survives_one_failing_list() {
    let backend = Backend::start(Router::new().route(
        "/api/v1/public/programs/trending",
        get(|| async {
            Json(json!({ "success": true, "body": [{
                "programName": "Clean Water",
                "programTitle": "Wells for Jaffna",
                "targetDonationAmount": 200000.0,
                "raised": 50000.0
            }] }))
        }),
    ))
    .await;

    let feed = HomeFeed::load(&backend.gateway()).await;
    assert!(feed.latest.is_empty());
    assert_eq!(feed.trending.len(), 1);
    assert_eq!(feed.trending[0].title, "Wells for Jaffna");
    assert_eq!(feed.trending[0].progress, 25);
    assert_eq!(feed.trending[0].formatted_target, "LKR 200,000");
}

#[tokio::test]
async fn test_program_search_sends_criteria_and_pages() {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let captured = queries.clone();
    let backend = Backend::start(Router::new().route(
        "/api/v1/public/programs/filter",
        get(move |Query(query): Query<HashMap<String, String>>| {
            let captured = captured.clone();
            async move {
                let page: u32 = query["page"].parse().unwrap();
                captured.lock().unwrap().push(query);
                Json(json!({ "success": true, "body": {
                    "content": [{ "programName": format!("Program {page}") }],
                    "totalPages": 3,
                    "number": page
                } }))
            }
        }),
    ))
    .await;

    let mut search = ProgramSearch::new(backend.gateway());
    search.set_search_text("  water ");
    search.set_category(Some(4));
    assert_eq!(search.search().await.total_pages, 3);

    assert!(search.go_to_page(2).await);
    assert_eq!(search.cards()[0].name.as_deref(), Some("Program 2"));
    assert!(!search.go_to_page(2).await);
    assert!(!search.go_to_page(3).await);

    search.set_sub_category(Some(9));
    assert_eq!(search.filter().page, 0);

    let queries = queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["searchText"], "water");
    assert_eq!(queries[0]["categoryId"], "4");
    assert_eq!(queries[0]["size"], "12");
    assert!(!queries[0].contains_key("subCategoryId"));
    assert_eq!(queries[1]["page"], "2");
}

#[tokio::test]
async fn test_small_donation_is_rejected_locally() {
    let backend = Backend::start(Router::new()).await;
    let mut auth = backend.auth_flow();

    let form = DonationForm::new(DonationRequest::new(ProgramId(5), 50.0, "BANK_TRANSFER"));
    let Err(Error::Validation(errors)) = form.submit(&mut auth).await else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.for_field("amount"), Some("Minimum donation amount is LKR 100"));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_donation_carries_bearer_only_when_signed_in() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = seen.clone();
    let backend = Backend::start(Router::new().route(
        "/api/v1/public/programs/donate",
        post(move |headers: HeaderMap, mut multipart: Multipart| {
            let captured = captured.clone();
            async move {
                let mut fields = HashMap::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    fields.insert(name, field.text().await.unwrap());
                }
                let auth = headers.get("authorization").map(|v| v.to_str().unwrap().to_string());
                captured.lock().unwrap().push((auth, fields));
                Json(json!({ "success": true, "body": { "donationId": 9, "status": "PENDING" } }))
            }
        }),
    ))
    .await;

    let donation = DonationRequest::new(ProgramId(5), 1500.0, "BANK_TRANSFER").with_comments("For books");

    let mut anonymous = backend.auth_flow();
    let receipt = DonationForm::new(donation.clone())
        .submit(&mut anonymous)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receipt.donation_id, Some(9));

    let mut donor = signed_in(&backend);
    DonationForm::new(donation).submit(&mut donor).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, None);
    assert_eq!(seen[0].1["campaignId"], "5");
    assert_eq!(seen[0].1["actualDonationAmount"], "1500");
    assert_eq!(seen[0].1["comments"], "For books");
    assert_eq!(seen[1].0.as_deref(), Some("Bearer acc-7"));
}

#[tokio::test]
async fn test_history_paging_and_date_filter() {
    let backend = Backend::start(Router::new().route(
        "/api/v1/donor/donations",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            let page: u32 = query["page"].parse().unwrap();
            let filtered = query.get("startDate").cloned().unwrap_or_default();
            Json(json!({ "success": true, "body": {
                "content": [
                    { "donationId": page * 10 + 1, "actualDonationAmount": 1000.0, "status": filtered },
                    { "donationId": page * 10 + 2, "actualDonationAmount": 250.5 }
                ],
                "totalPages": 2,
                "number": page
            } }))
        }),
    ))
    .await;
    let mut auth = signed_in(&backend);
    let mut history = DonationHistoryView::with_page_size(2);

    history.load(&mut auth).await.unwrap();
    assert_eq!(history.records()[0].donation_id, 1);
    assert!((history.page_total() - 1250.5).abs() < f64::EPSILON);

    assert!(!history.previous_page(&mut auth).await.unwrap());
    assert!(history.next_page(&mut auth).await.unwrap());
    assert_eq!(history.query().page, 1);
    assert_eq!(history.records()[0].donation_id, 11);
    assert!(!history.next_page(&mut auth).await.unwrap());
    assert_eq!(backend.hits(), 2);

    let err = history
        .apply_dates(&mut auth, Some(date!(2025 - 03 - 01)), Some(date!(2025 - 01 - 01)))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(history.query().page, 1);
    assert_eq!(backend.hits(), 2);

    history
        .apply_dates(&mut auth, Some(date!(2025 - 01 - 01)), None)
        .await
        .unwrap();
    assert_eq!(history.query().page, 0);
    assert_eq!(history.records()[0].status.as_deref(), Some("2025/01/01"));
}

#[tokio::test]
async fn test_history_requires_session() {
    let backend = Backend::start(Router::new()).await;
    let mut auth = backend.auth_flow();
    let mut history = DonationHistoryView::new();

    assert!(matches!(
        history.load(&mut auth).await,
        Err(Error::NotAuthenticated)
    ));
    assert_eq!(backend.hits(), 0);
}

type Calls = Arc<Mutex<Vec<(String, Option<String>)>>>;

fn record(calls: &Calls, name: &str, headers: &HeaderMap) {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    calls.lock().unwrap().push((name.to_string(), bearer));
}

async fn profile_backend(calls: Calls) -> Backend {
    let (profile_calls, update_calls, picture_calls, history_calls) =
        (calls.clone(), calls.clone(), calls.clone(), calls);
    Backend::start(
        Router::new()
            .route(
                "/api/v1/donor/profile",
                get(move |headers: HeaderMap| {
                    let calls = profile_calls.clone();
                    async move {
                        record(&calls, "profile", &headers);
                        Json(json!({ "success": true, "body": {
                            "id": 3,
                            "firstName": "Nimal",
                            "lastName": "Perera",
                            "gender": "MALE"
                        } }))
                    }
                })
                .put(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let calls = update_calls.clone();
                    async move {
                        record(&calls, "update", &headers);
                        Json(json!({ "success": true, "body": {
                            "id": 3,
                            "firstName": body["firstName"],
                            "lastName": body["lastName"],
                            "gender": body["gender"]
                        } }))
                    }
                }),
            )
            .route(
                "/api/v1/donor/profile/picture",
                post(move |headers: HeaderMap, mut multipart: Multipart| {
                    let calls = picture_calls.clone();
                    async move {
                        record(&calls, "picture", &headers);
                        let field = multipart.next_field().await.unwrap().unwrap();
                        assert_eq!(field.name(), Some("profileImage"));
                        let url = format!("https://cdn.daana.lk/{}", field.file_name().unwrap());
                        Json(json!({ "success": true, "body": url }))
                    }
                }),
            )
            .route(
                "/api/v1/donor/donations",
                get(move |headers: HeaderMap| {
                    let calls = history_calls.clone();
                    async move {
                        record(&calls, "donations", &headers);
                        Json(json!({ "success": true, "body": {
                            "content": [{ "donationId": 9, "actualDonationAmount": 500.0 }],
                            "totalPages": 1,
                            "number": 0
                        } }))
                    }
                }),
            ),
    )
    .await
}

#[tokio::test]
async fn test_profile_page_loads_profile_then_history() {
    let calls = Calls::default();
    let backend = profile_backend(calls.clone()).await;
    let mut auth = signed_in(&backend);

    let page = ProfilePage::load(&mut auth).await.unwrap();
    assert_eq!(page.profile.first_name.as_deref(), Some("Nimal"));
    assert_eq!(page.history.records()[0].donation_id, 9);

    let calls = calls.lock().unwrap();
    let names: Vec<&str> = calls.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["profile", "donations"]);
    assert!(calls.iter().all(|(_, bearer)| bearer.as_deref() == Some("Bearer acc-7")));
}

#[tokio::test]
async fn test_profile_update_and_picture() {
    let calls = Calls::default();
    let backend = profile_backend(calls.clone()).await;
    let mut auth = signed_in(&backend);
    let mut page = ProfilePage::load(&mut auth).await.unwrap();
    assert_eq!(backend.hits(), 2);

    let incomplete = DonorProfileUpdate {
        first_name: Some("Kamala".into()),
        last_name: Some("Silva".into()),
        ..DonorProfileUpdate::default()
    };
    let Err(Error::Validation(errors)) = page.update(&mut auth, &incomplete).await else {
        panic!("expected missing gender");
    };
    assert_eq!(errors.for_field("gender"), Some("Please select your gender"));
    assert_eq!(backend.hits(), 2);

    let update = DonorProfileUpdate {
        gender: Some(Gender::Female),
        ..incomplete
    };
    let profile = page.update(&mut auth, &update).await.unwrap();
    assert_eq!(profile.first_name.as_deref(), Some("Kamala"));
    assert_eq!(profile.gender, Some(Gender::Female));

    let err = page
        .upload_picture(&mut auth, Attachment::new("avatar.gif", vec![0x47]))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(backend.hits(), 3);

    let url = page
        .upload_picture(&mut auth, Attachment::new("avatar.png", vec![0x89, b'P']))
        .await
        .unwrap()
        .to_string();
    assert_eq!(url, "https://cdn.daana.lk/avatar.png");
    assert_eq!(page.profile.profile_image_url.as_deref(), Some(url.as_str()));
    assert_eq!(calls.lock().unwrap().last().unwrap().0, "picture");
}

#[tokio::test]
async fn test_contact_is_timestamped_and_newsletter_posts_email() {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let (contact_bodies, newsletter_bodies) = (bodies.clone(), bodies.clone());
    let backend = Backend::start(
        Router::new()
            .route(
                "/api/v1/contact",
                post(move |Json(body): Json<Value>| {
                    let bodies = contact_bodies.clone();
                    async move {
                        bodies.lock().unwrap().push(body);
                        Json(json!({ "success": true, "message": "Thanks for reaching out" }))
                    }
                }),
            )
            .route(
                "/api/v1/newsletter",
                post(move |Json(body): Json<Value>| {
                    let bodies = newsletter_bodies.clone();
                    async move {
                        bodies.lock().unwrap().push(body);
                        Json(json!({ "success": true, "message": "Subscribed" }))
                    }
                }),
            ),
    )
    .await;
    let gateway = backend.gateway();

    let message = ContactMessage {
        name: "Nimal".into(),
        email: "nimal@example.lk".into(),
        subject: None,
        message: "How do I get a receipt?".into(),
    };
    let reply = gateway.submit_contact(&message).await.unwrap();
    assert_eq!(reply.as_deref(), Some("Thanks for reaching out"));

    assert!(gateway.subscribe_newsletter("not-an-email").await.unwrap_err().is_validation());
    let reply = gateway.subscribe_newsletter(" nimal@example.lk ").await.unwrap();
    assert_eq!(reply.as_deref(), Some("Subscribed"));
    assert_eq!(backend.hits(), 2);

    let bodies = bodies.lock().unwrap();
    let contact = &bodies[0];
    assert_eq!(contact["name"], "Nimal");
    assert!(contact.get("subject").is_none());
    let timestamp = contact["timestamp"].as_str().unwrap();
    assert!(
        time::OffsetDateTime::parse(timestamp, &time::format_description::well_known::Rfc3339)
            .is_ok()
    );
    assert_eq!(bodies[1], json!({ "email": "nimal@example.lk" }));
}
