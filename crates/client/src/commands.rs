//! Typed user commands and their dispatch.
//!
//! Every user action is a [`Command`]. The [`Dispatcher`] routes it to the
//! operation that handles it and turns the result into exactly one
//! [`Notice`] for the user.
//!
//! ```text
//! Command
//!   ↓
//! 1. Search input waits out the debounce period (a newer keystroke wins)
//!   ↓
//! 2. Handler runs (list load, stock-out, CRUD, accounts)
//!   ↓
//! 3. Mutations re-issue the active query of the list they changed
//!   ↓
//! Notice
//! ```
//!
//! List loads that a newer load superseded, and search input that newer
//! input replaced, produce `Notice::Quiet`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use gudang_core::CategoryId;
use gudang_inventory::{Category, Item, StockMovement, StockRecord, Supplier, Warehouse};

use crate::accounts::Accounts;
use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::crud::Catalog;
use crate::debounce::Debouncer;
use crate::error::{ApiError, ClientError};
use crate::gateway::InventoryGateway;
use crate::pagination::validate_page;
use crate::query::ListQuery;
use crate::refresh::{ListView, LoadOutcome};
use crate::resource::Resource;
use crate::session::{CurrentUser, Session};
use crate::stock_out::{StockOut, StockOutRequest, StockOutState};
use crate::wire::{Draft, Registration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    FilterCategory(Option<CategoryId>),
    GoToPage(i64),
    Refresh,
    StockOut(StockOutRequest),
    Save { draft: Draft, id: Option<i64> },
    Delete { resource: Resource, id: i64 },
    Login { username: String, password: String },
    Logout,
    Register(Registration),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Search(_) => "search",
            Command::FilterCategory(_) => "filter_category",
            Command::GoToPage(_) => "go_to_page",
            Command::Refresh => "refresh",
            Command::StockOut(_) => "stock_out",
            Command::Save { .. } => "save",
            Command::Delete { .. } => "delete",
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Register(_) => "register",
        }
    }
}

/// What the user is told after a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Success { message: String },
    Failure { message: String, auth_required: bool },
    /// Nothing to report: the command was overtaken by a newer one.
    Quiet,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice::Success {
            message: message.into(),
        }
    }

    pub fn failure(err: &ClientError) -> Self {
        Notice::Failure {
            message: err.user_message(),
            auth_required: err.is_auth_required(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Notice::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Notice::Success { message } | Notice::Failure { message, .. } => Some(message),
            Notice::Quiet => None,
        }
    }
}

/// One list view per resource.
pub struct ListViews {
    pub stock: ListView<StockRecord>,
    pub movements: ListView<StockMovement>,
    pub categories: ListView<Category>,
    pub suppliers: ListView<Supplier>,
    pub items: ListView<Item>,
    pub warehouses: ListView<Warehouse>,
}

impl ListViews {
    pub fn new(gateway: Arc<dyn InventoryGateway>) -> Self {
        Self {
            stock: ListView::new(gateway.clone(), Resource::Stock),
            movements: ListView::new(gateway.clone(), Resource::Movement),
            categories: ListView::new(gateway.clone(), Resource::Category),
            suppliers: ListView::new(gateway.clone(), Resource::Supplier),
            items: ListView::new(gateway.clone(), Resource::Item),
            warehouses: ListView::new(gateway, Resource::Warehouse),
        }
    }

    pub fn is_loaded(&self, resource: Resource) -> bool {
        match resource {
            Resource::Stock => self.stock.is_loaded(),
            Resource::Movement => self.movements.is_loaded(),
            Resource::Category => self.categories.is_loaded(),
            Resource::Supplier => self.suppliers.is_loaded(),
            Resource::Item => self.items.is_loaded(),
            Resource::Warehouse => self.warehouses.is_loaded(),
        }
    }

    /// Re-issue the active query of `resource`'s view.
    pub async fn refresh(&self, resource: Resource) -> Result<LoadOutcome, ClientError> {
        match resource {
            Resource::Stock => self.stock.refresh().await,
            Resource::Movement => self.movements.refresh().await,
            Resource::Category => self.categories.refresh().await,
            Resource::Supplier => self.suppliers.refresh().await,
            Resource::Item => self.items.refresh().await,
            Resource::Warehouse => self.warehouses.refresh().await,
        }
    }
}

pub struct Dispatcher {
    accounts: Accounts,
    catalog: Catalog,
    stock_out: StockOut,
    views: ListViews,
    debouncer: Debouncer,
}

impl Dispatcher {
    /// `session` must be the one `gateway` reads its token from.
    pub fn new(
        gateway: Arc<dyn InventoryGateway>,
        session: Session,
        search_debounce: Duration,
    ) -> Self {
        Self {
            accounts: Accounts::new(gateway.clone(), session),
            catalog: Catalog::new(gateway.clone()),
            stock_out: StockOut::new(gateway.clone()),
            views: ListViews::new(gateway),
            debouncer: Debouncer::new(search_debounce),
        }
    }

    /// Wire a dispatcher to the HTTP API described by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, ApiError> {
        let session = Session::new();
        let client = ApiClient::new(config, session.clone())?;
        Ok(Self::new(
            Arc::new(client),
            session,
            config.search_debounce,
        ))
    }

    pub fn stock_view(&self) -> &ListView<StockRecord> {
        &self.views.stock
    }

    pub fn views(&self) -> &ListViews {
        &self.views
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn stock_out_state(&self) -> watch::Receiver<StockOutState> {
        self.stock_out.subscribe()
    }

    pub async fn current_user(&self) -> CurrentUser {
        self.accounts.current_user().await
    }

    pub async fn dispatch(&self, command: Command) -> Notice {
        let name = command.name();
        let notice = match self.handle(command).await {
            Ok(notice) => notice,
            Err(err) => {
                tracing::info!(command = name, error = %err, "command failed");
                Notice::failure(&err)
            }
        };
        tracing::debug!(command = name, ?notice, "command handled");
        notice
    }

    async fn handle(&self, command: Command) -> Result<Notice, ClientError> {
        match command {
            Command::Search(term) => match self.debouncer.settle(term).await {
                Some(term) => self.load(self.views.stock.active_query().with_search(term)).await,
                None => Ok(Notice::Quiet),
            },
            Command::FilterCategory(category) => {
                self.load(self.views.stock.active_query().with_category(category))
                    .await
            }
            Command::GoToPage(page) => {
                let page = validate_page(page)?;
                self.load(self.views.stock.active_query().with_page(page)).await
            }
            Command::Refresh => self.load(self.views.stock.active_query()).await,
            Command::StockOut(request) => {
                let outcome = self.stock_out.run(request).await?;
                self.after_mutation(Resource::Stock).await;
                if self.views.movements.is_loaded() {
                    self.after_mutation(Resource::Movement).await;
                }
                let mut message = format!(
                    "Stock-out recorded. {} now has {} {}.",
                    outcome.stock.item_name, outcome.stock.quantity, outcome.stock.item_unit
                );
                for warning in &outcome.warnings {
                    message.push(' ');
                    message.push_str(warning);
                }
                Ok(Notice::success(message.trim_end()))
            }
            Command::Save { draft, id } => {
                let resource = draft.resource();
                self.catalog.save(&draft, id).await?;
                self.after_mutation(resource).await;
                let verb = if id.is_some() { "updated" } else { "created" };
                Ok(Notice::success(format!(
                    "{} {verb}.",
                    capitalize(resource.display_name())
                )))
            }
            Command::Delete { resource, id } => {
                let user = self.accounts.current_user().await;
                self.catalog.delete(&user, resource, id).await?;
                self.after_mutation(resource).await;
                Ok(Notice::success(format!(
                    "{} deleted.",
                    capitalize(resource.display_name())
                )))
            }
            Command::Login { username, password } => {
                self.accounts.login(&username, &password).await?;
                let user = self.accounts.current_user().await;
                Ok(Notice::success(format!("Logged in as {}.", user.role_label())))
            }
            Command::Logout => {
                self.accounts.logout();
                Ok(Notice::success("Logged out."))
            }
            Command::Register(registration) => {
                self.accounts.register(registration).await?;
                Ok(Notice::success("Registration successful. Please log in."))
            }
        }
    }

    async fn load(&self, query: ListQuery) -> Result<Notice, ClientError> {
        match self.views.stock.load(query).await? {
            LoadOutcome::Superseded => Ok(Notice::Quiet),
            LoadOutcome::Applied => {
                let state = self.views.stock.snapshot();
                let mut message = format!("{} stock records found.", state.pagination.total_count);
                if state.fell_back {
                    message.push_str(&format!(" Showing page {}.", state.query.page()));
                }
                Ok(Notice::success(message))
            }
        }
    }

    /// The mutation already succeeded; a failed reload must not turn that into a failure.
    async fn after_mutation(&self, resource: Resource) {
        if let Err(err) = self.views.refresh(resource).await {
            tracing::warn!(
                resource = resource.display_name(),
                error = %err,
                "list refresh after mutation failed"
            );
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
