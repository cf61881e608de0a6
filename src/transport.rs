//! Transport seam to the webhook messaging backend
//!
//! The cache and pagination layers only ever see this trait; tests mock
//! it, production wires the HTTP implementation.

use crate::config::Config;
use crate::error::Result;
use crate::model::{Contact, Message, MessagePage};
use async_trait::async_trait;
use serde::Serialize;

/// Async boundary to the messaging backend
#[async_trait]
pub trait ConversationTransport: Send + Sync {
    /// Full contact list for an instance
    async fn fetch_contacts(&self, instance_id: &str) -> Result<Vec<Contact>>;

    /// One page of messages, newest page when `cursor` is None, otherwise
    /// the page older than the cursor
    async fn fetch_messages(
        &self,
        instance_id: &str,
        contact_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<MessagePage>;

    /// Send a text message. The returned record carries the authoritative
    /// id and echoes `client_temp_id` for placeholder reconciliation.
    async fn send_message(
        &self,
        instance_id: &str,
        contact_id: &str,
        body: &str,
        client_temp_id: &str,
    ) -> Result<Message>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    body: &'a str,
    client_temp_id: &'a str,
}

/// HTTP transport against the webhook backend
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(self.url(path));
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }
        req
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(self.url(path));
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }
        req
    }
}

#[async_trait]
impl ConversationTransport for HttpTransport {
    async fn fetch_contacts(&self, instance_id: &str) -> Result<Vec<Contact>> {
        let path = format!("/instances/{}/contacts", instance_id);
        let contacts = self
            .get(&path)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Contact>>()
            .await?;
        Ok(contacts)
    }

    async fn fetch_messages(
        &self,
        instance_id: &str,
        contact_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        let path = format!("/instances/{}/messages/{}", instance_id, contact_id);
        let mut req = self.get(&path).query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }

        let page = req
            .send()
            .await?
            .error_for_status()?
            .json::<MessagePage>()
            .await?;
        Ok(page)
    }

    async fn send_message(
        &self,
        instance_id: &str,
        contact_id: &str,
        body: &str,
        client_temp_id: &str,
    ) -> Result<Message> {
        let path = format!("/instances/{}/messages/{}", instance_id, contact_id);
        let message = self
            .post(&path)
            .json(&SendRequest {
                body,
                client_temp_id,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Message>()
            .await?;
        Ok(message)
    }
}
