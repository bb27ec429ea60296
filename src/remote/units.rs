use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::content::{Chapter, Id, Scene, UnitOrder, UnitPatch, WorkUnit};

use super::client::{RemoteClient, RemoteError};

/// Calls the editor controller makes against the content service for one
/// kind of unit. Implemented over HTTP by [`RestUnits`]; tests substitute an
/// in-memory store.
#[async_trait]
pub trait UnitService: Send + Sync + 'static {
    type Unit: WorkUnit;

    async fn list(&self, work_id: &Id) -> Result<Vec<Self::Unit>, RemoteError>;

    async fn get(&self, work_id: &Id, unit_id: &Id) -> Result<Self::Unit, RemoteError>;

    async fn create(&self, work_id: &Id, title: &str, ordinal: u32) -> Result<Self::Unit, RemoteError>;

    async fn update(&self, work_id: &Id, unit_id: &Id, patch: &UnitPatch) -> Result<Self::Unit, RemoteError>;

    async fn delete(&self, work_id: &Id, unit_id: &Id) -> Result<(), RemoteError>;

    async fn reorder(&self, work_id: &Id, orders: &[UnitOrder]) -> Result<(), RemoteError>;

    /// Fire-and-forget content push; nothing comes back
    async fn autosave(&self, work_id: &Id, unit_id: &Id, content: &str) -> Result<(), RemoteError>;
}

/// REST binding for any unit type, routed by `U::RESOURCE`
pub struct RestUnits<U> {
    client: RemoteClient,
    _unit: PhantomData<fn() -> U>,
}

pub type RestChapters = RestUnits<Chapter>;
pub type RestScenes = RestUnits<Scene>;

impl<U: WorkUnit> RestUnits<U> {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client,
            _unit: PhantomData,
        }
    }

    fn collection_path(work_id: &Id) -> String {
        format!("works/{}/{}", work_id, U::RESOURCE)
    }

    fn unit_path(work_id: &Id, unit_id: &Id) -> String {
        format!("works/{}/{}/{}", work_id, U::RESOURCE, unit_id)
    }

    fn reorder_body(orders: &[UnitOrder]) -> serde_json::Value {
        let orders: Vec<serde_json::Value> = orders
            .iter()
            .map(|o| {
                let mut entry = serde_json::Map::new();
                entry.insert(U::ORDER_KEY.to_string(), json!(o.unit_id));
                entry.insert("order".to_string(), json!(o.ordinal));
                serde_json::Value::Object(entry)
            })
            .collect();
        json!({ "orders": orders })
    }
}

#[async_trait]
impl<U: WorkUnit> UnitService for RestUnits<U> {
    type Unit = U;

    async fn list(&self, work_id: &Id) -> Result<Vec<U>, RemoteError> {
        self.client.get(&Self::collection_path(work_id)).await
    }

    async fn get(&self, work_id: &Id, unit_id: &Id) -> Result<U, RemoteError> {
        self.client.get(&Self::unit_path(work_id, unit_id)).await
    }

    async fn create(&self, work_id: &Id, title: &str, ordinal: u32) -> Result<U, RemoteError> {
        let draft = U::draft(title, ordinal);
        self.client
            .send_json(Method::POST, &Self::collection_path(work_id), &draft)
            .await
    }

    async fn update(&self, work_id: &Id, unit_id: &Id, patch: &UnitPatch) -> Result<U, RemoteError> {
        let body = U::patch_body(patch);
        self.client
            .send_json(Method::PUT, &Self::unit_path(work_id, unit_id), &body)
            .await
    }

    async fn delete(&self, work_id: &Id, unit_id: &Id) -> Result<(), RemoteError> {
        self.client.delete(&Self::unit_path(work_id, unit_id)).await
    }

    async fn reorder(&self, work_id: &Id, orders: &[UnitOrder]) -> Result<(), RemoteError> {
        let path = format!("{}/reorder", Self::collection_path(work_id));
        self.client
            .send_json_unit(Method::PUT, &path, &Self::reorder_body(orders))
            .await
    }

    async fn autosave(&self, work_id: &Id, unit_id: &Id, content: &str) -> Result<(), RemoteError> {
        let path = format!("{}/autosave", Self::unit_path(work_id, unit_id));
        self.client
            .send_json_unit(Method::POST, &path, &json!({ "content": content }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_resource() {
        let work = Id::from(4);
        let unit = Id::from(12);
        assert_eq!(RestChapters::collection_path(&work), "works/4/chapters");
        assert_eq!(RestScenes::unit_path(&work, &unit), "works/4/scenes/12");
    }

    #[test]
    fn test_reorder_body_uses_resource_key() {
        let orders = vec![
            UnitOrder { unit_id: Id::from(2), ordinal: 1 },
            UnitOrder { unit_id: Id::from(1), ordinal: 2 },
        ];
        assert_eq!(
            RestChapters::reorder_body(&orders),
            json!({ "orders": [ { "chapterId": 2, "order": 1 }, { "chapterId": 1, "order": 2 } ] })
        );
        assert_eq!(
            RestScenes::reorder_body(&orders)["orders"][0]["sceneId"],
            json!(2)
        );
    }
}
