//! Superadmin endpoints.
//!
//! Each method is a parameterized call through the [`RefreshCoordinator`];
//! results are returned as untyped JSON for the presentation layer.

use serde_json::{json, Value};

use super::refresh::RefreshCoordinator;
use super::request::RequestDescriptor;
use super::ApiError;
use crate::models::admin::DEFAULT_LOG_LIMIT;
use crate::models::{ActivityFilters, PageParams};

/// Build `path?k=v&...`, skipping absent values and percent-encoding the rest.
fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Superadmin operations over an authenticated coordinator.
/// Clone is cheap - the coordinator shares its collaborators.
#[derive(Clone)]
pub struct AdminApi {
    coordinator: RefreshCoordinator,
}

impl AdminApi {
    pub fn new(coordinator: RefreshCoordinator) -> Self {
        Self { coordinator }
    }

    /// Issue an arbitrary call; `None` for 204 responses.
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<Option<Value>, ApiError> {
        self.coordinator.execute(descriptor).await
    }

    async fn get(&self, path: String) -> Result<Option<Value>, ApiError> {
        self.request(&RequestDescriptor::get(path)).await
    }

    // ===== Users =====

    pub async fn list_users(&self, page: &PageParams) -> Result<Option<Value>, ApiError> {
        self.get(with_query("/superadmin/users", &page.query_pairs()))
            .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<Value>, ApiError> {
        self.get(format!("/superadmin/users/{}", segment(user_id)))
            .await
    }

    pub async fn update_user(&self, user_id: &str, updates: Value) -> Result<Option<Value>, ApiError> {
        let descriptor =
            RequestDescriptor::put(format!("/superadmin/users/{}", segment(user_id))).with_json(updates);
        self.request(&descriptor).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<Option<Value>, ApiError> {
        let descriptor = RequestDescriptor::delete(format!("/superadmin/users/{}", segment(user_id)));
        self.request(&descriptor).await
    }

    pub async fn impersonate_user(&self, user_id: &str) -> Result<Option<Value>, ApiError> {
        let descriptor =
            RequestDescriptor::post(format!("/superadmin/users/{}/impersonate", segment(user_id)));
        self.request(&descriptor).await
    }

    // ===== Tenants =====

    pub async fn list_tenants(&self, page: &PageParams) -> Result<Option<Value>, ApiError> {
        self.get(with_query("/superadmin/tenants", &page.query_pairs()))
            .await
    }

    pub async fn get_tenant(&self, tenant_id: &str) -> Result<Option<Value>, ApiError> {
        self.get(format!("/superadmin/tenants/{}", segment(tenant_id)))
            .await
    }

    pub async fn update_tenant(
        &self,
        tenant_id: &str,
        updates: Value,
    ) -> Result<Option<Value>, ApiError> {
        let descriptor = RequestDescriptor::put(format!("/superadmin/tenants/{}", segment(tenant_id)))
            .with_json(updates);
        self.request(&descriptor).await
    }

    pub async fn delete_tenant(&self, tenant_id: &str) -> Result<Option<Value>, ApiError> {
        let descriptor =
            RequestDescriptor::delete(format!("/superadmin/tenants/{}", segment(tenant_id)));
        self.request(&descriptor).await
    }

    pub async fn tenant_stats(&self, tenant_id: &str) -> Result<Option<Value>, ApiError> {
        self.get(format!("/superadmin/tenants/{}/stats", segment(tenant_id)))
            .await
    }

    // ===== System =====

    pub async fn system_stats(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/stats".to_string()).await
    }

    pub async fn system_health(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/health".to_string()).await
    }

    pub async fn database_stats(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/database/stats".to_string()).await
    }

    pub async fn run_database_maintenance(&self, operation: &str) -> Result<Option<Value>, ApiError> {
        let descriptor = RequestDescriptor::post("/superadmin/database/maintenance")
            .with_json(json!({ "operation": operation }));
        self.request(&descriptor).await
    }

    // ===== Billing =====

    pub async fn billing_overview(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/billing".to_string()).await
    }

    pub async fn revenue_metrics(&self, period: &str) -> Result<Option<Value>, ApiError> {
        self.get(with_query(
            "/superadmin/billing/revenue",
            &[("period", Some(period.to_string()))],
        ))
        .await
    }

    pub async fn subscription_metrics(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/billing/subscriptions".to_string())
            .await
    }

    // ===== Feature flags =====

    pub async fn feature_flags(&self) -> Result<Option<Value>, ApiError> {
        self.get("/superadmin/feature-flags".to_string()).await
    }

    pub async fn update_feature_flag(
        &self,
        flag_name: &str,
        enabled: bool,
        tenant_ids: Option<Vec<String>>,
    ) -> Result<Option<Value>, ApiError> {
        let descriptor =
            RequestDescriptor::put(format!("/superadmin/feature-flags/{}", segment(flag_name)))
                .with_json(json!({ "enabled": enabled, "tenant_ids": tenant_ids }));
        self.request(&descriptor).await
    }

    // ===== Logs =====

    pub async fn activity_logs(
        &self,
        limit: u32,
        offset: u32,
        filters: &ActivityFilters,
    ) -> Result<Option<Value>, ApiError> {
        let mut params = vec![
            ("limit", Some(limit.to_string())),
            ("offset", Some(offset.to_string())),
        ];
        params.extend(filters.query_pairs());
        self.get(with_query("/superadmin/activity", &params)).await
    }

    pub async fn error_logs(
        &self,
        limit: Option<u32>,
        since: Option<&str>,
    ) -> Result<Option<Value>, ApiError> {
        let params = [
            ("limit", Some(limit.unwrap_or(DEFAULT_LOG_LIMIT).to_string())),
            ("since", since.map(str::to_owned)),
        ];
        self.get(with_query("/superadmin/errors", &params)).await
    }
}
