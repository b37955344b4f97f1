use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub statement: String,
    pub solution: String,
    pub subject: String,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub origin: String,
    pub difficulty: i64,
    pub collections: Option<Vec<CollectionInfo>>,
}
