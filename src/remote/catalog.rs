//! Works and screenplay characters.

use reqwest::Method;

use crate::content::{Character, CharacterInput, Id, Work, WorkList, WorkQuery};

use super::client::{RemoteClient, RemoteError};

impl RemoteClient {
    pub async fn list_works(&self, query: &WorkQuery) -> Result<WorkList, RemoteError> {
        self.get_with_query("works", query).await
    }

    pub async fn get_work(&self, work_id: &Id) -> Result<Work, RemoteError> {
        self.get(&format!("works/{}", work_id)).await
    }

    pub async fn list_characters(&self, work_id: &Id) -> Result<Vec<Character>, RemoteError> {
        self.get(&format!("works/{}/characters", work_id)).await
    }

    pub async fn create_character(
        &self,
        work_id: &Id,
        input: &CharacterInput,
    ) -> Result<Character, RemoteError> {
        let name_ok = input.name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if !name_ok {
            return Err(RemoteError::Invalid("character name must not be empty".to_string()));
        }
        self.send_json(Method::POST, &format!("works/{}/characters", work_id), input)
            .await
    }

    pub async fn update_character(
        &self,
        work_id: &Id,
        character_id: &Id,
        input: &CharacterInput,
    ) -> Result<Character, RemoteError> {
        self.send_json(
            Method::PUT,
            &format!("works/{}/characters/{}", work_id, character_id),
            input,
        )
        .await
    }

    pub async fn delete_character(&self, work_id: &Id, character_id: &Id) -> Result<(), RemoteError> {
        self.delete(&format!("works/{}/characters/{}", work_id, character_id))
            .await
    }
}
