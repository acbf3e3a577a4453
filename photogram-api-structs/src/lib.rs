#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PhotoPayload {
    pub source: String,
    #[serde(default)]
    pub caption: String,
}
