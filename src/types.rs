use std::collections::BTreeMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, ValidationErrors};

/// Backend identifier of a charity created by registration step 1.
///
/// Every later registration step is keyed by this id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct CharityId(pub i64);

/// Backend identifier of a donation program (sent as `campaignId`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct ProgramId(pub i64);

/// Validated one-time password: exactly six ASCII digits.
///
/// Use `"123456".parse::<OtpCode>()` or `OtpCode::try_from(string)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OtpCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for OtpCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();
        if s.len() != 6 {
            errors.push("otpCode", "Please enter a valid 6-digit verification code");
        } else if !crate::validation::is_valid_otp(&s) {
            errors.push("otpCode", "Verification code must contain only numbers");
        }
        errors.into_result()?;
        Ok(Self(s))
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

/// Position in the three-step charity registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum WizardStep {
    /// Organization identity and contact details.
    #[display("1 (profile)")]
    Profile,
    /// Proof document, logo and banking details.
    #[display("2 (documents)")]
    Documents,
    /// Email OTP confirmation.
    #[display("3 (verification)")]
    Verification,
}

impl WizardStep {
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Profile => 1,
            Self::Documents => 2,
            Self::Verification => 3,
        }
    }

    #[must_use]
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Profile => None,
            Self::Documents => Some(Self::Profile),
            Self::Verification => Some(Self::Documents),
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Profile => Some(Self::Documents),
            Self::Documents => Some(Self::Verification),
            Self::Verification => None,
        }
    }
}

/// Whether a charity is run by an organization or an individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    Organization,
    Person,
}

impl ExecutionType {
    /// The only proof document accepted for this execution type.
    #[must_use]
    pub fn required_document(self) -> DocumentType {
        match self {
            Self::Organization => DocumentType::BusinessRegistrationCertificate,
            Self::Person => DocumentType::IdCard,
        }
    }
}

/// Proof document kind uploaded in registration step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    BusinessRegistrationCertificate,
    IdCard,
}

impl DocumentType {
    /// Wire name, as sent in multipart form fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BusinessRegistrationCertificate => "BUSINESS_REGISTRATION_CERTIFICATE",
            Self::IdCard => "ID_CARD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Program card data as returned by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Program {
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default, alias = "title")]
    pub program_title: Option<String>,
    #[serde(default, alias = "description")]
    pub program_description: Option<String>,
    #[serde(default)]
    pub sub_category_name: Option<String>,
    #[serde(default, alias = "programLocation")]
    pub location: Option<String>,
    #[serde(default, alias = "programImage")]
    pub program_image_url: Option<String>,
    #[serde(default, alias = "urlName")]
    pub url_slug: Option<String>,
    #[serde(default, alias = "target")]
    pub target_donation_amount: Option<f64>,
    #[serde(default)]
    pub raised: Option<f64>,
    /// Fields the detail endpoint adds on top of the card data.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Program {
    /// Minimal program, mostly useful for tests and fixtures.
    #[must_use]
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_id: None,
            program_name: Some(program_name.into()),
            program_title: None,
            program_description: None,
            sub_category_name: None,
            location: None,
            program_image_url: None,
            url_slug: None,
            target_donation_amount: None,
            raised: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct SubCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

/// Result of a successful donation submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DonationReceipt {
    #[serde(default)]
    pub donation_id: Option<i64>,
    #[serde(default)]
    pub actual_donation_amount: Option<f64>,
    #[serde(default)]
    pub net_donation_amount: Option<f64>,
    #[serde(default)]
    pub service_charge: Option<f64>,
    #[serde(default)]
    pub is_anonymous_donation: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference_number: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<ProgramId>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub campaign_title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry in the donor's donation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DonationRecord {
    pub donation_id: i64,
    #[serde(default)]
    pub actual_donation_amount: Option<f64>,
    #[serde(default)]
    pub net_donation_amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference_number: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<ProgramId>,
    #[serde(default)]
    pub campaign_title: Option<String>,
    #[serde(default)]
    pub campaign_url_slug: Option<String>,
    #[serde(default)]
    pub charity_name: Option<String>,
    #[serde(default)]
    pub donation_date_formatted: Option<String>,
}

/// Donor profile as returned by `GET donor/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DonorProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub billing_address: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Editable subset of the donor profile (`PUT donor/profile`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
}
