//! Create, update and delete for the editable resources, plus the option
//! lists that feed their forms.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use gudang_core::Entity;

use crate::error::ClientError;
use crate::gateway::InventoryGateway;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::session::CurrentUser;
use crate::wire::{Draft, FromWire};

/// One `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn of<E: Entity>(entity: &E) -> Self {
        Self {
            value: entity.id().to_string(),
            label: entity.label(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::validation(format!("{field} is required.")));
    }
    Ok(())
}

/// Client-side checks that mirror the server's required fields.
pub fn validate_draft(draft: &Draft) -> Result<(), ClientError> {
    match draft {
        Draft::Category { nama, .. }
        | Draft::Supplier { nama, .. }
        | Draft::Warehouse { nama, .. } => require("Name", nama),
        Draft::Item { sku, nama, satuan, .. } => {
            require("SKU", sku)?;
            require("Name", nama)?;
            require("Unit", satuan)
        }
        Draft::Stock { .. } => Ok(()),
    }
}

pub struct Catalog {
    gateway: Arc<dyn InventoryGateway>,
}

impl Catalog {
    pub fn new(gateway: Arc<dyn InventoryGateway>) -> Self {
        Self { gateway }
    }

    /// Update record `id`, or create a new one when `id` is `None`.
    pub async fn save(&self, draft: &Draft, id: Option<i64>) -> Result<JsonValue, ClientError> {
        validate_draft(draft)?;
        let resource = draft.resource();
        let saved = self.gateway.save(resource, id, &draft.to_json()).await?;
        tracing::info!(
            resource = resource.display_name(),
            id = ?id,
            created = id.is_none(),
            "record saved"
        );
        Ok(saved)
    }

    /// Only staff may delete; the check runs before any request is sent.
    pub async fn delete(
        &self,
        user: &CurrentUser,
        resource: Resource,
        id: i64,
    ) -> Result<(), ClientError> {
        if !user.is_admin() {
            return Err(ClientError::Forbidden(
                "Only admins can delete records.".to_string(),
            ));
        }
        self.gateway.delete(resource, id).await?;
        tracing::info!(resource = resource.display_name(), id, "record deleted");
        Ok(())
    }

    /// Load one record for an edit form.
    pub async fn fetch<T: FromWire>(&self, resource: Resource, id: i64) -> Result<T, ClientError> {
        let value = self.gateway.fetch_one(resource, id).await?;
        Ok(T::from_wire(value)?)
    }

    /// Options for a select box: the first page (or the bare array) of `resource`.
    pub async fn options<T: FromWire + Entity>(
        &self,
        resource: Resource,
    ) -> Result<Vec<Choice>, ClientError> {
        let page = self
            .gateway
            .list_page(resource, &ListQuery::first_page())
            .await?
            .decode::<T>()?;
        Ok(page.items.iter().map(Choice::of).collect())
    }
}
