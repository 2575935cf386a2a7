#![doc = include_str!("../README.md")]

pub mod config;
pub mod envelope;
pub mod error;
pub mod session;
pub mod types;
pub mod validation;

#[cfg(feature = "client")]
pub mod auth;
#[cfg(feature = "client")]
pub mod donor;
#[cfg(feature = "client")]
pub mod gateway;
#[cfg(feature = "client")]
pub mod outreach;
#[cfg(feature = "client")]
pub mod pages;
#[cfg(feature = "client")]
pub mod programs;
#[cfg(feature = "client")]
pub mod wizard;

#[cfg(feature = "site")]
pub mod site;

// Re-exports for convenient access
pub use config::{ApiBases, BaseKind, ClientConfig, Environment};
pub use envelope::{Envelope, Page};
pub use error::{Error, FieldError, ValidationErrors};
pub use session::{
    FileStorage, MemoryStorage, Session, SessionStore, Storage, StorageKeys, UserProfile,
};
pub use types::{
    Category, CharityId, DocumentType, DonationReceipt, DonationRecord, DonorProfile,
    DonorProfileUpdate, ExecutionType, Gender, OtpCode, Program, ProgramId, SubCategory,
    WizardStep,
};

#[cfg(feature = "client")]
pub use auth::{AuthFlow, AuthState, LoginResponse, SignupForm};
#[cfg(feature = "client")]
pub use donor::DonationHistoryQuery;
#[cfg(feature = "client")]
pub use gateway::{Attachment, Gateway, MultipartPayload, RequestOptions};
#[cfg(feature = "client")]
pub use outreach::ContactMessage;
#[cfg(feature = "client")]
pub use pages::{DonationForm, DonationHistoryView, HomeFeed, ProfilePage, ProgramSearch};
#[cfg(feature = "client")]
pub use programs::{DonationRequest, ProgramCard, ProgramFilter};
#[cfg(feature = "client")]
pub use wizard::{AttachmentField, BankingDetails, CharityProfile, RegistrationWizard};
