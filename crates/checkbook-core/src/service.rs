// ── Checkbook service ──
//
// Owns the API client, one Store per resource type and the resources
// bound to them. Constructed once per session and handed to whatever
// needs data; nothing here is global.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use checkbook_api::{ApiClient, Params, TokenPair, UrlTemplate};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::model::{
    CATEGORIES_FOR_MONTH_URL, CATEGORY_URL, Category, CategoryForMonth, ENTRY_URL, Entry,
    MONTH_ENTRIES_URL, MONTH_URL, Month, NewEntry, category_for_month_params, category_params,
    entry_params, entry_store, month_params,
};
use crate::resource::Resource;
use crate::store::{Collection, Element, Store};

/// Data service for one Checkbook server.
///
/// Cheaply cloneable via `Arc<CheckbookInner>`. Reads are served from the
/// stores whenever they already hold the requested record or list.
#[derive(Clone)]
pub struct Checkbook {
    inner: Arc<CheckbookInner>,
}

struct CheckbookInner {
    config: ClientConfig,
    client: Arc<ApiClient>,
    months: Resource,
    categories: Resource,
    categories_for_month: Resource,
    entries: Resource,
    month_entries_url: UrlTemplate,
}

impl Checkbook {
    /// Build the client, stores and resources. Does not touch the network.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let client = Arc::new(ApiClient::new(config.url.clone(), &config.transport())?);

        let months = Resource::new(
            Arc::clone(&client),
            UrlTemplate::new(MONTH_URL),
            month_params(),
        )
        .stored()?
        .read_only();
        let categories = Resource::new(
            Arc::clone(&client),
            UrlTemplate::new(CATEGORY_URL),
            category_params(),
        )
        .stored()?;
        let categories_for_month = Resource::new(
            Arc::clone(&client),
            UrlTemplate::new(CATEGORIES_FOR_MONTH_URL),
            category_for_month_params(),
        )
        .inherit(["monthid"])
        .stored()?
        .read_only();
        let entries = Resource::new(
            Arc::clone(&client),
            UrlTemplate::new(ENTRY_URL),
            entry_params(),
        )
        .with_store(entry_store()?);

        Ok(Self {
            inner: Arc::new(CheckbookInner {
                config,
                client,
                months,
                categories,
                categories_for_month,
                entries,
                month_entries_url: UrlTemplate::new(MONTH_ENTRIES_URL),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Obtain a token pair.
    ///
    /// A persisted refresh token is tried first; credentials are the
    /// fallback when it is missing or rejected.
    pub async fn login(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;

        if let Some(refresh) = &config.refresh_token {
            match self.inner.client.refresh(refresh).await {
                Ok(_) => {
                    debug!("resumed session from refresh token");
                    return Ok(());
                }
                Err(err) if config.credentials.is_some() => {
                    warn!(error = %err, "stored refresh token rejected, using credentials");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let Some(credentials) = config.credentials.clone() else {
            return Err(CoreError::LoginRequired);
        };
        let username = credentials.username.clone();
        self.inner.client.login(&credentials.into()).await?;
        info!(%username, "logged in");
        Ok(())
    }

    /// Current token pair, if logged in.
    pub fn tokens(&self) -> Option<Arc<TokenPair>> {
        self.inner.client.current_tokens()
    }

    /// Current refresh token, for persisting between sessions.
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.tokens().and_then(|pair| pair.refresh.clone())
    }

    // ── Stores ───────────────────────────────────────────────────────

    pub fn month_store(&self) -> Option<&Store> {
        self.inner.months.store()
    }

    pub fn category_store(&self) -> Option<&Store> {
        self.inner.categories.store()
    }

    pub fn category_for_month_store(&self) -> Option<&Store> {
        self.inner.categories_for_month.store()
    }

    pub fn entry_store(&self) -> Option<&Store> {
        self.inner.entries.store()
    }

    // ── Months ───────────────────────────────────────────────────────

    pub async fn months(&self) -> Result<Vec<Month>, CoreError> {
        let list = self.inner.months.query(&Params::new()).await?;
        Ok(wrap(&list))
    }

    pub async fn month(&self, id: i64) -> Result<Month, CoreError> {
        let element = self.inner.months.get(&Params::new().with("id", id)).await?;
        Ok(Month::from(element))
    }

    /// Categories with their totals for one month.
    pub async fn categories_for_month(
        &self,
        monthid: i64,
    ) -> Result<Vec<CategoryForMonth>, CoreError> {
        let list = self
            .inner
            .categories_for_month
            .query(&Params::new().with("monthid", monthid))
            .await?;
        Ok(wrap(&list))
    }

    /// Sum of the loaded categories' totals, or the server's value when the
    /// month's categories are not loaded.
    pub fn month_total(&self, month: &Month) -> f64 {
        let categories = month.id().and_then(|id| {
            self.category_for_month_store()?
                .get_collection(&format!("/months/{id}/categories/"))
        });
        month.total(categories.map(|list| {
            list.members()
                .into_iter()
                .map(|e| self.category_total(&CategoryForMonth::from(e)))
                .collect::<Vec<_>>()
        }))
    }

    /// Sum of the loaded entries' values, or the server's value when the
    /// entries are not loaded.
    pub fn category_total(&self, category: &CategoryForMonth) -> f64 {
        let entries = self.loaded_entries(category);
        category.total(entries.as_ref())
    }

    // ── Categories ───────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<Vec<Category>, CoreError> {
        let list = self.inner.categories.query(&Params::new()).await?;
        Ok(wrap(&list))
    }

    pub async fn category(&self, id: i64) -> Result<Category, CoreError> {
        let element = self
            .inner
            .categories
            .get(&Params::new().with("id", id))
            .await?;
        Ok(Category::from(element))
    }

    pub async fn create_category(&self, caption: &str) -> Result<Category, CoreError> {
        let category = Category::new(caption);
        self.inner.categories.create(category.element()).await?;
        info!(id = ?category.id(), caption, "created category");
        Ok(category)
    }

    pub async fn delete_category(&self, category: &Category) -> Result<(), CoreError> {
        self.inner.categories.delete(category.element()).await?;
        info!(id = ?category.id(), "deleted category");
        Ok(())
    }

    // ── Entries ──────────────────────────────────────────────────────

    pub async fn entries(&self) -> Result<Vec<Entry>, CoreError> {
        let list = self.inner.entries.query(&Params::new()).await?;
        Ok(wrap(&list))
    }

    pub async fn entry(&self, id: i64) -> Result<Entry, CoreError> {
        let element = self
            .inner
            .entries
            .get(&Params::new().with("id", id))
            .await?;
        Ok(Entry::from(element))
    }

    /// Entries of one category in one month.
    pub async fn entries_for(&self, monthid: i64, category: i64) -> Result<Vec<Entry>, CoreError> {
        let list = self.entries_for_list(monthid, category).await?;
        Ok(wrap(&list))
    }

    async fn entries_for_list(&self, monthid: i64, category: i64) -> Result<Collection, CoreError> {
        let params = Params::new()
            .with("monthid", monthid)
            .with("category", category);
        self.inner
            .entries
            .query_at(&self.inner.month_entries_url, &params)
            .await
    }

    pub async fn create_entry(&self, data: &NewEntry) -> Result<Entry, CoreError> {
        let entry = Entry::new(data);
        self.inner.entries.create(entry.element()).await?;
        info!(id = ?entry.id(), caption = %data.caption, "created entry");
        Ok(entry)
    }

    /// Create or update `entry` on the server.
    pub async fn save_entry(&self, entry: &Entry) -> Result<(), CoreError> {
        self.inner.entries.save(entry.element()).await
    }

    pub async fn delete_entry(&self, entry: &Entry) -> Result<(), CoreError> {
        self.inner.entries.delete(entry.element()).await?;
        info!(id = ?entry.id(), "deleted entry");
        Ok(())
    }

    /// Move an entry to another category and/or month, then save it.
    ///
    /// Loaded lists reflect the move as soon as the fields change.
    pub async fn move_entry(
        &self,
        entry: &Entry,
        category: Option<i64>,
        datetime: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        if category.is_none() && datetime.is_none() {
            return Err(CoreError::ValidationFailed {
                message: "nothing to move: give a category or a date".into(),
            });
        }
        if let Some(category) = category {
            entry.set_category(category);
        }
        if let Some(datetime) = datetime {
            entry.set_datetime(datetime);
        }
        self.save_entry(entry).await
    }

    /// The loaded month category whose loaded entries include `entry`.
    pub fn find_category_for_entry(&self, entry: &Entry) -> Option<CategoryForMonth> {
        let months = self.month_store()?.get_collection("/months/")?;

        for month in months.members().into_iter().map(Month::from) {
            let Some(id) = month.id() else { continue };
            let Some(categories) = self
                .category_for_month_store()
                .and_then(|s| s.get_collection(&format!("/months/{id}/categories/")))
            else {
                continue;
            };

            for category in categories.members().into_iter().map(CategoryForMonth::from) {
                let Some(entries) = self.loaded_entries(&category) else {
                    continue;
                };
                let found = entries.members().iter().any(|e| {
                    e.ptr_eq(entry.element())
                        || (entry.id().is_some() && Entry::from(e.clone()).id() == entry.id())
                });
                if found {
                    return Some(category);
                }
            }
        }
        None
    }

    fn loaded_entries(&self, category: &CategoryForMonth) -> Option<Collection> {
        let (monthid, id) = (category.monthid()?, category.id()?);
        self.entry_store()?
            .get_collection(&format!("/months/{monthid}/categories/{id}/entries/"))
    }
}

impl std::fmt::Debug for Checkbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkbook")
            .field("url", &self.inner.config.url.as_str())
            .finish_non_exhaustive()
    }
}

fn wrap<T: From<Element>>(list: &Collection) -> Vec<T> {
    list.members().into_iter().map(T::from).collect()
}
