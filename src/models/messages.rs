
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, base64::Base64};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InitiateMessage {
    /// Identifier of the document to attach to; a missing id leaves the
    /// session unattached and is never an error
    pub document_id: Option<String>,
    /// Caller identity from the external auth layer; None for anonymous viewers
    pub caller_id: Option<String>,
    #[serde(default)]
    pub document_name: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    /// Opaque edit delta, relayed verbatim
    #[serde_as(as = "Base64")]
    pub delta: Vec<u8>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaveMessage {
    /// Full replacement content, last write wins
    #[serde_as(as = "Base64")]
    pub content: Vec<u8>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoadedMessage {
    #[serde_as(as = "Base64")]
    pub content: Vec<u8>,
    pub can_edit: bool,
    pub document_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "initiate")]
    Initiate(InitiateMessage),
    #[serde(rename = "edit")]
    Edit(EditMessage),
    #[serde(rename = "save")]
    Save(SaveMessage),
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "loaded")]
    Loaded(LoadedMessage),
    #[serde(rename = "edit-relayed")]
    EditRelayed(EditMessage),
}
