//! Three-step charity registration.
//!
//! ```text
//!   Profile --submit_profile--> Documents --submit_documents--> Verification --confirm_otp--> done
//!      ^                            |                               |
//!      +------------back------------+<-------------back-------------+
//! ```
//!
//! Forward moves only happen through a successful submission; `back`
//! never discards what was already collected. Abandoning the wizard after
//! step 1 leaves the created charity on the server; nothing rolls it back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BaseKind;
use crate::error::{Error, ValidationErrors};
use crate::gateway::{Attachment, Gateway, MultipartPayload, RequestOptions};
use crate::types::{CharityId, DocumentType, ExecutionType, OtpCode, WizardStep};
use crate::validation;

/// Extensions accepted for the proof document.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png"];

/// Extensions accepted for the charity logo.
pub const LOGO_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Step 1 fields: who the charity is and how to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharityProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub execution_type: Option<ExecutionType>,
    pub website: Option<String>,
    pub description: String,
    pub mobile_number: String,
    pub nic_number_or_registration_number: String,
    pub contact_person_name: String,
    pub contact_person_mobile: String,
    pub contact_person_email: String,
}

impl CharityProfile {
    /// Required fields, email and phone formats, and the optional website.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing each failing field.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();

        validation::require(&mut errors, "name", &self.name);
        validation::require(&mut errors, "password", &self.password);
        validation::require(&mut errors, "description", &self.description);
        validation::require(
            &mut errors,
            "nicNumberOrRegistrationNumber",
            &self.nic_number_or_registration_number,
        );
        validation::require(&mut errors, "contactPersonName", &self.contact_person_name);
        errors.check(
            self.execution_type.is_some(),
            "executionType",
            "This field is required",
        );

        for (field, value) in [
            ("email", &self.email),
            ("contactPersonEmail", &self.contact_person_email),
        ] {
            if validation::require(&mut errors, field, value) {
                errors.check(
                    validation::is_valid_email(value.trim()),
                    field,
                    "Please enter a valid email address",
                );
            }
        }
        for (field, value) in [
            ("mobileNumber", &self.mobile_number),
            ("contactPersonMobile", &self.contact_person_mobile),
        ] {
            if validation::require(&mut errors, field, value) {
                errors.check(
                    validation::is_valid_phone(value),
                    field,
                    "Please enter a valid phone number",
                );
            }
        }
        if let Some(website) = self.website() {
            errors.check(
                validation::is_valid_url(website),
                "website",
                "Please enter a valid URL",
            );
        }

        errors.into_result()
    }

    fn website(&self) -> Option<&str> {
        self.website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }

    fn to_request(&self) -> Result<RegisterStep1<'_>, Error> {
        let execution_type = self.execution_type.ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.push("executionType", "This field is required");
            Error::Validation(errors)
        })?;
        Ok(RegisterStep1 {
            name: self.name.trim(),
            email: self.email.trim(),
            password: &self.password,
            execution_type,
            website: self.website(),
            description: self.description.trim(),
            mobile_number: phone_number("mobileNumber", &self.mobile_number)?,
            nic_number_or_registration_number: self.nic_number_or_registration_number.trim(),
            contact_person_name: self.contact_person_name.trim(),
            contact_person_mobile: phone_number("contactPersonMobile", &self.contact_person_mobile)?,
            contact_person_email: self.contact_person_email.trim(),
        })
    }
}

/// Phone numbers travel as integers, so a leading zero is dropped.
fn phone_number(field: &'static str, value: &str) -> Result<i64, Error> {
    validation::digits_only(value).parse().map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.push(field, "Please enter a valid phone number");
        Error::Validation(errors)
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterStep1<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    execution_type: ExecutionType,
    website: Option<&'a str>,
    description: &'a str,
    mobile_number: i64,
    nic_number_or_registration_number: &'a str,
    contact_person_name: &'a str,
    contact_person_mobile: i64,
    contact_person_email: &'a str,
}

#[derive(Deserialize)]
struct RegisterStep1Response {
    id: CharityId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterStep3<'a> {
    id: CharityId,
    otp_code: &'a OtpCode,
}

/// Step 2 fields: proof document kind and bank account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankingDetails {
    pub document_type: Option<DocumentType>,
    pub bank_name: String,
    pub branch_name: String,
    pub account_holder_name: String,
    pub swift_code: String,
    pub account_number: String,
}

impl BankingDetails {
    fn check(&self, errors: &mut ValidationErrors) {
        errors.check(
            self.document_type.is_some(),
            "documentType",
            "This field is required",
        );
        validation::require(errors, "bankName", &self.bank_name);
        validation::require(errors, "branchName", &self.branch_name);
        validation::require(errors, "accountHolderName", &self.account_holder_name);
        validation::require(errors, "swiftCode", &self.swift_code);
        validation::require(errors, "accountNumber", &self.account_number);
    }
}

/// Checks that `document` is the proof accepted for `execution`.
///
/// # Errors
///
/// Returns [`Error::Validation`] on `documentType` when they do not pair up.
pub fn check_document_type(execution: ExecutionType, document: DocumentType) -> Result<(), Error> {
    let mut errors = ValidationErrors::new();
    if execution.required_document() != document {
        let message = match execution {
            ExecutionType::Organization => {
                "Organizations must provide a Business Registration Certificate"
            }
            ExecutionType::Person => "Individual persons must provide an ID Card",
        };
        errors.push("documentType", message);
    }
    errors.into_result()
}

/// Files collected for step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttachmentField {
    /// Business registration certificate or ID card. Required.
    Document,
    /// Charity logo. Optional.
    Logo,
}

impl AttachmentField {
    /// Multipart field name.
    #[must_use]
    pub fn form_name(self) -> &'static str {
        match self {
            Self::Document => "documentFile",
            Self::Logo => "logoFile",
        }
    }

    #[must_use]
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Document => DOCUMENT_EXTENSIONS,
            Self::Logo => LOGO_EXTENSIONS,
        }
    }
}

impl Gateway {
    /// `POST public/charity/register/step1`. Returns the new charity id.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the execution type or a phone number is unusable
    /// - any gateway error; [`Error::Decode`] if the response carries no id
    pub async fn charity_register_step1(&self, profile: &CharityProfile) -> Result<CharityId, Error> {
        let body = profile.to_request()?;
        let response: RegisterStep1Response = self
            .post("charity/register/step1", &body, BaseKind::Public)
            .await?
            .require_body()?;
        Ok(response.id)
    }

    /// `POST public/charity/register/step2` as multipart.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn charity_register_step2(
        &self,
        id: CharityId,
        banking: &BankingDetails,
        document: Attachment,
        logo: Option<Attachment>,
    ) -> Result<Option<String>, Error> {
        let mut payload = MultipartPayload::new().text("id", id.to_string());
        if let Some(document_type) = banking.document_type {
            payload = payload.text("documentType", document_type.as_str());
        }
        payload = payload
            .text("bankName", banking.bank_name.trim())
            .text("branchName", banking.branch_name.trim())
            .text("accountHolderName", banking.account_holder_name.trim())
            .text("swiftCode", banking.swift_code.trim())
            .text("accountNumber", banking.account_number.trim())
            .file(AttachmentField::Document.form_name(), document);
        if let Some(logo) = logo {
            payload = payload.file(AttachmentField::Logo.form_name(), logo);
        }

        let options = RequestOptions::post().multipart(payload);
        let envelope = self
            .request("charity/register/step2", options, BaseKind::Public)
            .await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST public/charity/register/step3`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn charity_register_step3(
        &self,
        id: CharityId,
        code: &OtpCode,
    ) -> Result<Option<String>, Error> {
        let body = RegisterStep3 { id, otp_code: code };
        let envelope = self
            .post("charity/register/step3", &body, BaseKind::Public)
            .await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST public/charity/register/resend-otp?email=…`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn charity_resend_otp(&self, email: &str) -> Result<Option<String>, Error> {
        let options = RequestOptions::post().query("email", email);
        let envelope = self
            .request("charity/register/resend-otp", options, BaseKind::Public)
            .await?;
        Ok(envelope.message().map(str::to_string))
    }
}

/// Charity onboarding state machine.
#[derive(Debug)]
pub struct RegistrationWizard {
    gateway: Gateway,
    step: WizardStep,
    charity_id: Option<CharityId>,
    profile: Option<CharityProfile>,
    banking: Option<BankingDetails>,
    attachments: BTreeMap<AttachmentField, Attachment>,
    completed: bool,
}

impl RegistrationWizard {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            step: WizardStep::Profile,
            charity_id: None,
            profile: None,
            banking: None,
            attachments: BTreeMap::new(),
            completed: false,
        }
    }

    #[must_use]
    pub fn current_step(&self) -> WizardStep {
        self.step
    }

    /// Set once step 1 succeeds.
    #[must_use]
    pub fn charity_id(&self) -> Option<CharityId> {
        self.charity_id
    }

    #[must_use]
    pub fn profile(&self) -> Option<&CharityProfile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn banking(&self) -> Option<&BankingDetails> {
        self.banking.as_ref()
    }

    #[must_use]
    pub fn attachment(&self, field: AttachmentField) -> Option<&Attachment> {
        self.attachments.get(&field)
    }

    /// Whether step 3 succeeded. The charity now awaits manual review.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), Error> {
        if self.completed || self.step != expected {
            return Err(Error::WrongStep {
                expected,
                current: self.step,
            });
        }
        Ok(())
    }

    /// Step 1: validates and registers the charity, then advances to step 2.
    ///
    /// Resubmitting after going back registers again and replaces the id.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongStep`] outside step 1
    /// - [`Error::Validation`] before any request
    /// - any gateway error; the wizard stays on step 1
    pub async fn submit_profile(&mut self, profile: CharityProfile) -> Result<CharityId, Error> {
        self.expect_step(WizardStep::Profile)?;
        profile.validate()?;

        let id = self.gateway.charity_register_step1(&profile).await?;
        self.charity_id = Some(id);
        self.profile = Some(profile);
        self.advance();
        tracing::info!(charity_id = %id, step = self.step.number(), "Charity registration step 1 completed");
        Ok(id)
    }

    /// Stores a file for step 2 after checking its type and size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a disallowed extension or a file
    /// over 5 MiB; the previous attachment, if any, is kept.
    pub fn attach(&mut self, field: AttachmentField, attachment: Attachment) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        validation::check_attachment(
            &mut errors,
            field.form_name(),
            &attachment.file_name,
            attachment.size(),
            field.allowed_extensions(),
        );
        errors.into_result()?;
        self.attachments.insert(field, attachment);
        Ok(())
    }

    pub fn detach(&mut self, field: AttachmentField) -> Option<Attachment> {
        self.attachments.remove(&field)
    }

    /// Step 2: validates documents and banking details, uploads them and
    /// advances to step 3.
    ///
    /// The document type must be the one required by the execution type
    /// chosen in step 1.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCharityId`] when step 1 has not succeeded
    /// - [`Error::WrongStep`] outside step 2
    /// - [`Error::Validation`] before any request
    /// - any gateway error; the wizard stays on step 2
    pub async fn submit_documents(&mut self, banking: BankingDetails) -> Result<(), Error> {
        let Some(id) = self.charity_id else {
            return Err(Error::MissingCharityId);
        };
        self.expect_step(WizardStep::Documents)?;

        let document = self.attachments.get(&AttachmentField::Document).cloned();
        let mut errors = ValidationErrors::new();
        banking.check(&mut errors);
        let Some(document) = document else {
            errors.push(AttachmentField::Document.form_name(), "This field is required");
            return Err(errors.into());
        };
        errors.into_result()?;

        let execution = self
            .profile
            .as_ref()
            .and_then(|p| p.execution_type)
            .ok_or(Error::MissingCharityId)?;
        if let Some(document_type) = banking.document_type {
            check_document_type(execution, document_type)?;
        }

        let logo = self.attachments.get(&AttachmentField::Logo).cloned();

        self.gateway
            .charity_register_step2(id, &banking, document, logo)
            .await?;
        self.banking = Some(banking);
        self.advance();
        tracing::info!(charity_id = %id, step = self.step.number(), "Charity registration step 2 completed");
        Ok(())
    }

    /// Step 3: confirms the emailed code and finishes the wizard.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCharityId`] when step 1 has not succeeded
    /// - [`Error::WrongStep`] outside step 3 or after completion
    /// - [`Error::Validation`] for a code that is not six digits
    /// - any gateway error; the wizard stays on step 3
    pub async fn confirm_otp(&mut self, code: &str) -> Result<Option<String>, Error> {
        let Some(id) = self.charity_id else {
            return Err(Error::MissingCharityId);
        };
        self.expect_step(WizardStep::Verification)?;
        let code: OtpCode = code.trim().parse()?;

        let message = self.gateway.charity_register_step3(id, &code).await?;
        self.completed = true;
        tracing::info!(charity_id = %id, "Charity registration submitted for review");
        Ok(message)
    }

    /// Re-sends the code to the email given in step 1. Step 3 only; the
    /// current step does not change.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongStep`] outside step 3
    /// - [`Error::MissingCharityId`] when no step 1 email is known
    /// - any gateway error
    pub async fn resend_otp(&self) -> Result<Option<String>, Error> {
        self.expect_step(WizardStep::Verification)?;
        let email = self
            .profile
            .as_ref()
            .map(|p| p.email.trim())
            .ok_or(Error::MissingCharityId)?;
        self.gateway.charity_resend_otp(email).await
    }

    fn advance(&mut self) {
        if let Some(next) = self.step.next() {
            self.step = next;
        }
    }

    /// Moves one step back, keeping everything collected so far.
    /// No-op on step 1 and after completion.
    pub fn back(&mut self) -> WizardStep {
        if !self.completed {
            if let Some(previous) = self.step.previous() {
                self.step = previous;
            }
        }
        self.step
    }
}
