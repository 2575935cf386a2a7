mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Query};
use axum::http::StatusCode;
use axum::routing::post;
use daana_client::types::{DocumentType, ExecutionType, WizardStep};
use daana_client::wizard::{AttachmentField, BankingDetails, CharityProfile, RegistrationWizard};
use daana_client::{Attachment, CharityId, Error};
use serde_json::{Value, json};

use common::Backend;

type Fields = Arc<Mutex<BTreeMap<String, String>>>;

fn profile() -> CharityProfile {
    CharityProfile {
        name: "Hope Lanka".into(),
        email: "info@hope.lk".into(),
        password: "s3cret-pass".into(),
        execution_type: Some(ExecutionType::Organization),
        website: Some("  ".into()),
        description: "Community kitchens".into(),
        mobile_number: "077 123 4567".into(),
        nic_number_or_registration_number: "PV-12345".into(),
        contact_person_name: "Kamal Silva".into(),
        contact_person_mobile: "0711234567".into(),
        contact_person_email: "kamal@hope.lk".into(),
    }
}

fn banking(document_type: DocumentType) -> BankingDetails {
    BankingDetails {
        document_type: Some(document_type),
        bank_name: "Commercial Bank".into(),
        branch_name: "Colombo 03".into(),
        account_holder_name: "Hope Lanka".into(),
        swift_code: "CCEYLKLX".into(),
        account_number: "1000123456".into(),
    }
}

async fn registration_backend(step1_bodies: Arc<Mutex<Vec<Value>>>, step2_fields: Fields) -> Backend {
    Backend::start(
        Router::new()
            .route(
                "/api/v1/public/charity/register/step1",
                post(move |Json(body): Json<Value>| {
                    let bodies = step1_bodies.clone();
                    async move {
                        bodies.lock().unwrap().push(body);
                        Json(json!({ "success": true, "body": { "id": 77 } }))
                    }
                }),
            )
            .route(
                "/api/v1/public/charity/register/step2",
                post(move |mut multipart: Multipart| {
                    let fields = step2_fields.clone();
                    async move {
                        while let Some(field) = multipart.next_field().await.unwrap() {
                            let name = field.name().unwrap_or_default().to_string();
                            let value = match field.file_name() {
                                Some(file_name) => format!("file:{file_name}"),
                                None => field.text().await.unwrap(),
                            };
                            fields.lock().unwrap().insert(name, value);
                        }
                        Json(json!({ "success": true, "message": "Documents received" }))
                    }
                }),
            )
            .route(
                "/api/v1/public/charity/register/step3",
                post(|Json(body): Json<Value>| async move {
                    if body == json!({ "id": 77, "otpCode": "123456" }) {
                        (
                            StatusCode::OK,
                            Json(json!({ "success": true, "message": "Registration submitted" })),
                        )
                    } else {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "success": false, "message": "Invalid OTP" })),
                        )
                    }
                }),
            )
            .route(
                "/api/v1/public/charity/register/resend-otp",
                post(|Query(query): Query<BTreeMap<String, String>>| async move {
                    Json(json!({ "success": true, "message": format!("Sent to {}", query["email"]) }))
                }),
            ),
    )
    .await
}

#[tokio::test]
async fn test_full_registration() {
    let step1 = Arc::new(Mutex::new(Vec::new()));
    let step2 = Fields::default();
    let backend = registration_backend(step1.clone(), step2.clone()).await;
    let mut wizard = RegistrationWizard::new(backend.gateway());

    let id = wizard.submit_profile(profile()).await.unwrap();
    assert_eq!(id, CharityId(77));
    assert_eq!(wizard.current_step(), WizardStep::Documents);
    {
        let bodies = step1.lock().unwrap();
        let body = &bodies[0];
        assert_eq!(body["mobileNumber"], 771_234_567);
        assert_eq!(body["executionType"], "ORGANIZATION");
        assert_eq!(body["website"], Value::Null);
    }

    wizard
        .attach(
            AttachmentField::Document,
            Attachment::new("certificate.pdf", b"%PDF-1.4".to_vec()),
        )
        .unwrap();
    wizard
        .attach(AttachmentField::Logo, Attachment::new("logo.png", vec![0x89, b'P']))
        .unwrap();
    wizard
        .submit_documents(banking(DocumentType::BusinessRegistrationCertificate))
        .await
        .unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Verification);
    {
        let fields = step2.lock().unwrap();
        assert_eq!(fields["id"], "77");
        assert_eq!(fields["documentType"], "BUSINESS_REGISTRATION_CERTIFICATE");
        assert_eq!(fields["swiftCode"], "CCEYLKLX");
        assert_eq!(fields["documentFile"], "file:certificate.pdf");
        assert_eq!(fields["logoFile"], "file:logo.png");
    }

    let resent = wizard.resend_otp().await.unwrap();
    assert_eq!(resent.as_deref(), Some("Sent to info@hope.lk"));
    assert_eq!(wizard.current_step(), WizardStep::Verification);

    let err = wizard.confirm_otp("654321").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid OTP");
    assert!(!wizard.is_complete());

    let message = wizard.confirm_otp("123456").await.unwrap();
    assert_eq!(message.as_deref(), Some("Registration submitted"));
    assert!(wizard.is_complete());
    assert!(matches!(
        wizard.confirm_otp("123456").await,
        Err(Error::WrongStep { .. })
    ));
    assert_eq!(wizard.back(), WizardStep::Verification);
}

#[tokio::test]
async fn test_invalid_steps_send_nothing() {
    let backend = registration_backend(Arc::default(), Fields::default()).await;
    let mut wizard = RegistrationWizard::new(backend.gateway());

    let mut bad = profile();
    bad.email = "not-an-email".into();
    bad.mobile_number = "12".into();
    let Err(Error::Validation(errors)) = wizard.submit_profile(bad).await else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.for_field("email"), Some("Please enter a valid email address"));
    assert_eq!(errors.for_field("mobileNumber"), Some("Please enter a valid phone number"));
    assert_eq!(wizard.current_step(), WizardStep::Profile);

    assert!(matches!(
        wizard.submit_documents(banking(DocumentType::IdCard)).await,
        Err(Error::MissingCharityId)
    ));
    assert_eq!(backend.hits(), 0);

    wizard.submit_profile(profile()).await.unwrap();
    assert_eq!(backend.hits(), 1);

    let Err(Error::Validation(errors)) = wizard.submit_documents(banking(DocumentType::IdCard)).await
    else {
        panic!("expected missing document");
    };
    assert_eq!(errors.for_field("documentFile"), Some("This field is required"));

    wizard
        .attach(AttachmentField::Document, Attachment::new("id.jpg", vec![1, 2, 3]))
        .unwrap();
    let Err(Error::Validation(errors)) = wizard.submit_documents(banking(DocumentType::IdCard)).await
    else {
        panic!("expected document type mismatch");
    };
    assert_eq!(
        errors.for_field("documentType"),
        Some("Organizations must provide a Business Registration Certificate")
    );

    assert!(
        wizard
            .attach(AttachmentField::Logo, Attachment::new("logo.gif", vec![0]))
            .is_err()
    );
    assert_eq!(backend.hits(), 1);
    assert_eq!(wizard.current_step(), WizardStep::Documents);
}

#[tokio::test]
async fn test_going_back_reregisters() {
    let step1 = Arc::new(Mutex::new(Vec::new()));
    let backend = registration_backend(step1.clone(), Fields::default()).await;
    let mut wizard = RegistrationWizard::new(backend.gateway());

    wizard.submit_profile(profile()).await.unwrap();
    assert_eq!(wizard.back(), WizardStep::Profile);
    assert_eq!(wizard.charity_id(), Some(CharityId(77)));
    assert_eq!(wizard.profile().map(|p| p.name.as_str()), Some("Hope Lanka"));

    let mut edited = profile();
    edited.execution_type = Some(ExecutionType::Person);
    wizard.submit_profile(edited).await.unwrap();
    assert_eq!(step1.lock().unwrap().len(), 2);
    assert_eq!(wizard.current_step(), WizardStep::Documents);
}

#[tokio::test]
async fn test_detached_document_is_required_again() {
    let backend = registration_backend(Arc::default(), Fields::default()).await;
    let mut wizard = RegistrationWizard::new(backend.gateway());
    wizard.submit_profile(profile()).await.unwrap();
    assert_eq!(wizard.current_step().number(), 2);

    wizard
        .attach(
            AttachmentField::Document,
            Attachment::new("certificate.pdf", b"%PDF-1.4".to_vec()),
        )
        .unwrap();
    let removed = wizard.detach(AttachmentField::Document).unwrap();
    assert_eq!(removed.file_name, "certificate.pdf");
    assert!(wizard.attachment(AttachmentField::Document).is_none());
    assert!(wizard.detach(AttachmentField::Logo).is_none());

    let Err(Error::Validation(errors)) = wizard
        .submit_documents(banking(DocumentType::BusinessRegistrationCertificate))
        .await
    else {
        panic!("expected missing document");
    };
    assert_eq!(errors.for_field("documentFile"), Some("This field is required"));
    assert_eq!(backend.hits(), 1);
    assert_eq!(wizard.current_step().next(), Some(WizardStep::Verification));
}
