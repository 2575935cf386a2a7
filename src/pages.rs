//! Render-free page controllers.
//!
//! Each controller fetches what one page needs and keeps it for a UI
//! layer to draw. None of them share state except through the
//! [`SessionStore`](crate::session::SessionStore) behind an [`AuthFlow`].

use time::Date;

use crate::auth::AuthFlow;
use crate::donor::DonationHistoryQuery;
use crate::envelope::Page;
use crate::error::Error;
use crate::gateway::{Attachment, Gateway};
use crate::programs::{DonationRequest, ProgramCard, ProgramFilter};
use crate::session::Storage;
use crate::types::{
    Category, DonationReceipt, DonationRecord, DonorProfile, DonorProfileUpdate, Program, SubCategory,
};

/// Landing page carousels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeFeed {
    pub trending: Vec<ProgramCard>,
    pub latest: Vec<ProgramCard>,
}

impl HomeFeed {
    /// Fetches trending and latest programs concurrently. Either list is
    /// empty when its endpoint fails.
    pub async fn load(gateway: &Gateway) -> Self {
        let (trending, latest) = tokio::join!(gateway.trending_programs(), gateway.latest_programs());
        Self {
            trending: trending.into_iter().map(ProgramCard::from).collect(),
            latest: latest.into_iter().map(ProgramCard::from).collect(),
        }
    }
}

/// Program search with category filters and paging.
#[derive(Debug)]
pub struct ProgramSearch {
    gateway: Gateway,
    filter: ProgramFilter,
    categories: Vec<Category>,
    results: Page<Program>,
}

impl ProgramSearch {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self::with_filter(gateway, ProgramFilter::default())
    }

    /// Starts from criteria taken from elsewhere, e.g. a page's query string.
    #[must_use]
    pub fn with_filter(gateway: Gateway, filter: ProgramFilter) -> Self {
        Self {
            gateway,
            filter,
            categories: Vec::new(),
            results: Page::default(),
        }
    }

    /// Loads the category tree for the filter dropdowns.
    pub async fn load_categories(&mut self) -> &[Category] {
        self.categories = self.gateway.categories().await;
        &self.categories
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Sub-categories of the selected category; empty when none is selected.
    #[must_use]
    pub fn sub_categories(&self) -> &[SubCategory] {
        self.filter
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id))
            .map(|c| c.sub_categories.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn filter(&self) -> &ProgramFilter {
        &self.filter
    }

    #[must_use]
    pub fn results(&self) -> &Page<Program> {
        &self.results
    }

    #[must_use]
    pub fn cards(&self) -> Vec<ProgramCard> {
        self.results
            .content
            .iter()
            .cloned()
            .map(ProgramCard::from)
            .collect()
    }

    /// Each criteria change starts again from the first page.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filter.search_text = Some(text.into());
        self.filter.page = 0;
    }

    /// Changing the category also clears the sub-category.
    pub fn set_category(&mut self, category_id: Option<i64>) {
        self.filter.category_id = category_id;
        self.filter.sub_category_id = None;
        self.filter.page = 0;
    }

    pub fn set_sub_category(&mut self, sub_category_id: Option<i64>) {
        self.filter.sub_category_id = sub_category_id;
        self.filter.page = 0;
    }

    pub fn clear_filters(&mut self) {
        self.filter = ProgramFilter {
            size: self.filter.size,
            ..ProgramFilter::default()
        };
    }

    /// Runs the search with the current criteria. An empty page when the
    /// endpoint fails.
    pub async fn search(&mut self) -> &Page<Program> {
        self.results = self.gateway.filter_programs(&self.filter).await;
        &self.results
    }

    /// Jumps to `page` and searches. Returns `false` without a request when
    /// `page` is out of range or already shown.
    pub async fn go_to_page(&mut self, page: u32) -> bool {
        if page >= self.results.total_pages || page == self.filter.page {
            return false;
        }
        self.filter.page = page;
        self.search().await;
        true
    }
}

/// The donation modal on a program page.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationForm {
    pub donation: DonationRequest,
}

impl DonationForm {
    #[must_use]
    pub fn new(donation: DonationRequest) -> Self {
        Self { donation }
    }

    /// Validates and submits the donation.
    ///
    /// Logged-in donors donate with their bearer token; everyone else
    /// donates anonymously. An expired session is cleared and the donation
    /// goes through anonymously.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] before any request (e.g. below LKR 100)
    /// - any gateway error
    pub async fn submit<S: Storage>(
        self,
        auth: &mut AuthFlow<S>,
    ) -> Result<Option<DonationReceipt>, Error> {
        self.donation.validate()?;
        let bearer = auth.optional_bearer();
        auth.gateway().donate(self.donation, bearer.as_deref()).await
    }
}

/// The donor's paginated, date-filterable donation history.
#[derive(Debug, Clone, Default)]
pub struct DonationHistoryView {
    query: DonationHistoryQuery,
    page: Page<DonationRecord>,
}

impl DonationHistoryView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page_size(size: u32) -> Self {
        Self {
            query: DonationHistoryQuery {
                size,
                ..DonationHistoryQuery::default()
            },
            page: Page::default(),
        }
    }

    #[must_use]
    pub fn query(&self) -> &DonationHistoryQuery {
        &self.query
    }

    #[must_use]
    pub fn page(&self) -> &Page<DonationRecord> {
        &self.page
    }

    #[must_use]
    pub fn records(&self) -> &[DonationRecord] {
        &self.page.content
    }

    /// Sum of the donated amounts on the current page.
    #[must_use]
    pub fn page_total(&self) -> f64 {
        self.page
            .content
            .iter()
            .filter_map(|r| r.actual_donation_amount)
            .sum()
    }

    /// Loads the page described by the current query.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthenticated`] without a valid session
    /// - any gateway error
    pub async fn load<S: Storage>(&mut self, auth: &mut AuthFlow<S>) -> Result<&Page<DonationRecord>, Error> {
        let token = auth.bearer()?;
        self.page = auth.gateway().donor_donations(&token, &self.query).await?;
        Ok(&self.page)
    }

    /// Loads the next page. `Ok(false)` without a request on the last page.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn next_page<S: Storage>(&mut self, auth: &mut AuthFlow<S>) -> Result<bool, Error> {
        if self.query.page + 1 >= self.page.total_pages {
            return Ok(false);
        }
        self.turn_to(auth, self.query.page + 1).await
    }

    /// Loads the previous page. `Ok(false)` without a request on the first page.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn previous_page<S: Storage>(&mut self, auth: &mut AuthFlow<S>) -> Result<bool, Error> {
        if self.query.page == 0 {
            return Ok(false);
        }
        self.turn_to(auth, self.query.page - 1).await
    }

    /// Filters by date range (either bound optional) from the first page.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when `start` is after `end`; the current
    ///   query is left untouched and nothing is sent
    /// - see [`load`](Self::load)
    pub async fn apply_dates<S: Storage>(
        &mut self,
        auth: &mut AuthFlow<S>,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<&Page<DonationRecord>, Error> {
        let query = DonationHistoryQuery {
            page: 0,
            start_date: start,
            end_date: end,
            ..self.query
        };
        query.validate()?;
        self.query = query;
        self.load(auth).await
    }

    /// Drops the date range and reloads from the first page.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn clear_dates<S: Storage>(
        &mut self,
        auth: &mut AuthFlow<S>,
    ) -> Result<&Page<DonationRecord>, Error> {
        self.apply_dates(auth, None, None).await
    }

    /// Stays on the current page if loading `page` fails.
    async fn turn_to<S: Storage>(&mut self, auth: &mut AuthFlow<S>, page: u32) -> Result<bool, Error> {
        let current = self.query.page;
        self.query.page = page;
        if let Err(e) = self.load(auth).await {
            self.query.page = current;
            return Err(e);
        }
        Ok(true)
    }
}

/// The donor profile page: profile card plus recent donations.
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profile: DonorProfile,
    pub history: DonationHistoryView,
}

impl ProfilePage {
    /// Loads the profile, then the first page of donation history.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthenticated`] without a valid session
    /// - any gateway error from either request
    pub async fn load<S: Storage>(auth: &mut AuthFlow<S>) -> Result<Self, Error> {
        let token = auth.bearer()?;
        let profile = auth.gateway().donor_profile(&token).await?;
        let mut history = DonationHistoryView::new();
        history.load(auth).await?;
        Ok(Self { profile, history })
    }

    /// Saves profile edits and keeps the returned profile.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] before any request
    /// - [`Error::NotAuthenticated`] without a valid session
    /// - any gateway error
    pub async fn update<S: Storage>(
        &mut self,
        auth: &mut AuthFlow<S>,
        update: &DonorProfileUpdate,
    ) -> Result<&DonorProfile, Error> {
        update.validate()?;
        let token = auth.bearer()?;
        self.profile = auth.gateway().update_donor_profile(&token, update).await?;
        Ok(&self.profile)
    }

    /// Uploads a new profile picture and records its URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a wrong file type or size
    /// - [`Error::NotAuthenticated`] without a valid session
    /// - any gateway error
    pub async fn upload_picture<S: Storage>(
        &mut self,
        auth: &mut AuthFlow<S>,
        image: Attachment,
    ) -> Result<&str, Error> {
        let token = auth.bearer()?;
        let url = auth.gateway().upload_profile_picture(&token, image).await?;
        Ok(self.profile.profile_image_url.insert(url).as_str())
    }
}
