//! Program listings, statistics and donations.
//!
//! Listing helpers never fail: any gateway error is logged and degrades
//! to an empty result so a page can still render. [`Gateway::donate`]
//! is the exception and propagates every error.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::config::BaseKind;
use crate::envelope::Page;
use crate::error::{Error, ValidationErrors};
use crate::gateway::{Attachment, Gateway, MultipartPayload, RequestOptions, segment};
use crate::types::{Category, DonationReceipt, Program, ProgramId};
use crate::validation::{self, MIN_DONATION_LKR};

/// Extensions accepted for a bank-transfer payment slip.
pub const PAYMENT_SLIP_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png"];

/// Default page size of the program search.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 12;

/// Criteria for `GET programs/filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFilter {
    pub search_text: Option<String>,
    pub category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    /// Zero-based.
    pub page: u32,
    pub size: u32,
}

impl Default for ProgramFilter {
    fn default() -> Self {
        Self {
            search_text: None,
            category_id: None,
            sub_category_id: None,
            page: 0,
            size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }
}

impl ProgramFilter {
    /// Query parameters; blank search text and unset ids are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(text) = self.search_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query.push(("searchText", text.to_string()));
        }
        if let Some(id) = self.category_id {
            query.push(("categoryId", id.to_string()));
        }
        if let Some(id) = self.sub_category_id {
            query.push(("subCategoryId", id.to_string()));
        }
        query
    }
}

/// A donation to submit through `POST programs/donate`.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationRequest {
    pub program_id: ProgramId,
    /// Amount in LKR.
    pub amount: f64,
    /// e.g. `BANK_TRANSFER`.
    pub payment_method: String,
    pub comments: Option<String>,
    pub payment_slip: Option<Attachment>,
}

impl DonationRequest {
    #[must_use]
    pub fn new(program_id: ProgramId, amount: f64, payment_method: impl Into<String>) -> Self {
        Self {
            program_id,
            amount,
            payment_method: payment_method.into(),
            comments: None,
            payment_slip: None,
        }
    }

    #[must_use]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    #[must_use]
    pub fn with_payment_slip(mut self, slip: Attachment) -> Self {
        self.payment_slip = Some(slip);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the amount is below
    /// [`MIN_DONATION_LKR`], the payment method is blank, or the slip is
    /// not an accepted file.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        errors.check(
            self.amount.is_finite() && self.amount >= MIN_DONATION_LKR,
            "amount",
            "Minimum donation amount is LKR 100",
        );
        validation::require(&mut errors, "paymentMethod", &self.payment_method);
        if let Some(slip) = &self.payment_slip {
            validation::check_attachment(
                &mut errors,
                "paymentSlip",
                &slip.file_name,
                slip.size(),
                PAYMENT_SLIP_EXTENSIONS,
            );
        }
        errors.into_result()
    }

    fn into_payload(self) -> MultipartPayload {
        let payload = MultipartPayload::new()
            .text("campaignId", self.program_id.to_string())
            .text("actualDonationAmount", self.amount.to_string())
            .text("paymentMethod", self.payment_method)
            .text("comments", self.comments.unwrap_or_default());
        match self.payment_slip {
            Some(slip) => payload.file("paymentSlipUrl", slip),
            None => payload,
        }
    }
}

impl Gateway {
    async fn listing<T>(&self, path: &str, query: &[(&str, String)], what: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let result = self
            .get(path, query, BaseKind::Public)
            .await
            .and_then(|envelope| envelope.body::<T>());
        match result {
            Ok(body) => body.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, what, "Listing unavailable, showing nothing");
                T::default()
            }
        }
    }

    /// `GET public/programs/latest`; empty on failure.
    pub async fn latest_programs(&self) -> Vec<Program> {
        self.listing("programs/latest", &[], "latest programs").await
    }

    /// `GET public/programs/trending`; empty on failure.
    pub async fn trending_programs(&self) -> Vec<Program> {
        self.listing("programs/trending", &[], "trending programs").await
    }

    /// Latest and trending programs, fetched concurrently and
    /// de-duplicated by program name (first occurrence wins).
    pub async fn all_programs(&self) -> Vec<Program> {
        let (latest, trending) = tokio::join!(self.latest_programs(), self.trending_programs());
        dedupe_by_name(latest.into_iter().chain(trending))
    }

    /// `GET public/programs/{slug}`; `None` when missing or on failure.
    pub async fn program_by_slug(&self, slug: &str) -> Option<Program> {
        let path = format!("programs/{}", segment(slug));
        self.listing::<Option<Program>>(&path, &[], "program details")
            .await
    }

    /// `GET public/programs/categories`; empty on failure.
    pub async fn categories(&self) -> Vec<Category> {
        self.listing("programs/categories", &[], "categories").await
    }

    /// `GET public/programs/filter`; an empty page on failure.
    pub async fn filter_programs(&self, filter: &ProgramFilter) -> Page<Program> {
        self.listing("programs/filter", &filter.to_query(), "program search")
            .await
    }

    /// `GET public/statistics`; an empty object on failure.
    pub async fn statistics(&self) -> Map<String, JsonValue> {
        self.listing("statistics", &[], "statistics").await
    }

    /// `GET public/statistics/programs[/{slug}]`; an empty object on failure.
    pub async fn program_statistics(&self, slug: Option<&str>) -> Map<String, JsonValue> {
        let path = match slug {
            Some(slug) => format!("statistics/programs/{}", segment(slug)),
            None => "statistics/programs".to_string(),
        };
        self.listing(&path, &[], "program statistics").await
    }

    /// `POST public/programs/donate` as multipart.
    ///
    /// With `bearer` the donation is recorded against the donor's
    /// account; without it the donation is anonymous.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] before any request when the donation is invalid
    /// - any gateway error
    pub async fn donate(
        &self,
        donation: DonationRequest,
        bearer: Option<&str>,
    ) -> Result<Option<DonationReceipt>, Error> {
        donation.validate()?;
        let mut options = RequestOptions::post().multipart(donation.into_payload());
        if let Some(token) = bearer {
            options = options.bearer(token)?;
        }
        self.request("programs/donate", options, BaseKind::Public)
            .await?
            .body()
    }
}

/// Programs without a name are all treated as the same program.
fn dedupe_by_name(programs: impl IntoIterator<Item = Program>) -> Vec<Program> {
    let mut seen = HashSet::new();
    programs
        .into_iter()
        .filter(|p| seen.insert(p.program_name.clone()))
        .collect()
}

/// Percentage of `target` raised, rounded and capped at 100.
#[must_use]
pub fn calculate_progress(raised: f64, target: f64) -> u8 {
    if target <= 0.0 || !target.is_finite() || !raised.is_finite() {
        return 0;
    }
    // Clamped to 0..=100 so the cast is exact.
    ((raised / target) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Formats an amount as whole rupees with grouped thousands: `LKR 1,250,000`.
#[must_use]
pub fn format_lkr(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("LKR {sign}{grouped}")
}

/// Display-ready view of a [`Program`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramCard {
    pub program_id: Option<ProgramId>,
    pub url_slug: Option<String>,
    pub title: String,
    pub name: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub target: f64,
    pub raised: f64,
    pub progress: u8,
    pub formatted_target: String,
    pub formatted_raised: String,
}

impl ProgramCard {
    /// Slug for the details link, falling back to the program id.
    #[must_use]
    pub fn link_key(&self) -> Option<String> {
        self.url_slug
            .clone()
            .or_else(|| self.program_id.map(|id| id.to_string()))
    }

    /// Description cut to at most `max_chars` characters, with `...` when cut.
    #[must_use]
    pub fn summary(&self, max_chars: usize) -> String {
        if self.description.chars().count() <= max_chars {
            return self.description.clone();
        }
        let cut: String = self.description.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

impl From<Program> for ProgramCard {
    fn from(program: Program) -> Self {
        let nested_name = |key: &str| {
            program
                .extra
                .get(key)
                .and_then(|v| v.get("name"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        };
        let category = program
            .sub_category_name
            .clone()
            .or_else(|| nested_name("subCategory"))
            .or_else(|| nested_name("category"));

        let target = program.target_donation_amount.unwrap_or_default();
        let raised = program.raised.unwrap_or_default();
        let title = program
            .program_title
            .clone()
            .or_else(|| program.program_name.clone())
            .unwrap_or_default();

        Self {
            program_id: program.program_id,
            url_slug: program.url_slug,
            title,
            name: program.program_name,
            description: program.program_description.unwrap_or_default(),
            category,
            location: program.location,
            image_url: program.program_image_url,
            target,
            raised,
            progress: calculate_progress(raised, target),
            formatted_target: format_lkr(target),
            formatted_raised: format_lkr(raised),
        }
    }
}
