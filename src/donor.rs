//! Authenticated donor endpoints: profile and donation history.

use time::Date;
use time::macros::format_description;

use crate::config::BaseKind;
use crate::envelope::Page;
use crate::error::{Error, ValidationErrors};
use crate::gateway::{Attachment, Gateway, MultipartPayload, RequestOptions};
use crate::types::{DonationRecord, DonorProfile, DonorProfileUpdate};
use crate::validation;

/// Extensions accepted for a profile picture.
pub const PROFILE_PICTURE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Default page size of the donation history.
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;

/// Paging and date range for `GET donor/donations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationHistoryQuery {
    /// Zero-based.
    pub page: u32,
    pub size: u32,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl Default for DonationHistoryQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_HISTORY_PAGE_SIZE,
            start_date: None,
            end_date: None,
        }
    }
}

impl DonationHistoryQuery {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the start date is after the end date.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            errors.check(
                start <= end,
                "startDate",
                "Start date cannot be later than end date",
            );
        }
        errors.into_result()
    }

    /// Query parameters, dates as `YYYY/MM/DD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if a date cannot be formatted.
    pub fn to_query(&self) -> Result<Vec<(&'static str, String)>, Error> {
        let mut query = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        for (name, date) in [("startDate", self.start_date), ("endDate", self.end_date)] {
            if let Some(date) = date {
                query.push((name, format_history_date(date)?));
            }
        }
        Ok(query)
    }
}

/// Formats `date` as `YYYY/MM/DD`.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the date cannot be formatted.
pub fn format_history_date(date: Date) -> Result<String, Error> {
    date.format(format_description!("[year]/[month]/[day]"))
        .map_err(|e| Error::Encode(e.to_string()))
}

impl DonorProfileUpdate {
    /// Names are required and at least 2 characters; gender is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing each failing field.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("firstName", &self.first_name), ("lastName", &self.last_name)] {
            let value = value.as_deref().map(str::trim).unwrap_or_default();
            if value.is_empty() {
                errors.push(field, "This field is required");
            } else if value.chars().count() < 2 {
                errors.push(field, "Must be at least 2 characters");
            }
        }
        errors.check(self.gender.is_some(), "gender", "Please select your gender");
        errors.into_result()
    }
}

impl Gateway {
    /// `GET donor/profile`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error; [`Error::Decode`] when the body is missing.
    pub async fn donor_profile(&self, token: &str) -> Result<DonorProfile, Error> {
        let options = RequestOptions::get().bearer(token)?;
        self.request("donor/profile", options, BaseKind::Default)
            .await?
            .require_body()
    }

    /// `PUT donor/profile`. Returns the updated profile.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] before any request
    /// - any gateway error
    pub async fn update_donor_profile(
        &self,
        token: &str,
        update: &DonorProfileUpdate,
    ) -> Result<DonorProfile, Error> {
        update.validate()?;
        let options = RequestOptions::put().json(update)?.bearer(token)?;
        self.request("donor/profile", options, BaseKind::Default)
            .await?
            .require_body()
    }

    /// `POST donor/profile/picture` as multipart. Returns the new image URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a wrong file type or a file over 5 MiB
    /// - any gateway error
    pub async fn upload_profile_picture(
        &self,
        token: &str,
        image: Attachment,
    ) -> Result<String, Error> {
        let mut errors = ValidationErrors::new();
        validation::check_attachment(
            &mut errors,
            "profileImage",
            &image.file_name,
            image.size(),
            PROFILE_PICTURE_EXTENSIONS,
        );
        errors.into_result()?;

        let options = RequestOptions::post()
            .multipart(MultipartPayload::new().file("profileImage", image))
            .bearer(token)?;
        self.request("donor/profile/picture", options, BaseKind::Default)
            .await?
            .require_body()
    }

    /// `GET donor/donations`, paginated and optionally date-filtered.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an inverted date range
    /// - any gateway error
    pub async fn donor_donations(
        &self,
        token: &str,
        query: &DonationHistoryQuery,
    ) -> Result<Page<DonationRecord>, Error> {
        query.validate()?;
        let options = query
            .to_query()?
            .into_iter()
            .fold(RequestOptions::get(), |opts, (k, v)| opts.query(k, v))
            .bearer(token)?;
        Ok(self
            .request("donor/donations", options, BaseKind::Default)
            .await?
            .body()?
            .unwrap_or_default())
    }
}
