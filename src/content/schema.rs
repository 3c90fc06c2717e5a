use serde::{Deserialize, Serialize};

/// Who says a line. Stored as `app`/`user`; `partner`/`learner` are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "app", alias = "partner")]
    Partner,
    #[serde(rename = "user", alias = "learner")]
    Learner,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "speaker", alias = "role")]
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Turn {
    pub fn partner(text: &str) -> Self {
        Self {
            role: Role::Partner,
            text: text.to_string(),
            keywords: Vec::new(),
        }
    }

    pub fn learner(text: &str, keywords: &[&str]) -> Self {
        Self {
            role: Role::Learner,
            text: text.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn is_partner(&self) -> bool {
        self.role == Role::Partner
    }

    pub fn is_learner(&self) -> bool {
        self.role == Role::Learner
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "isPremium", alias = "is_premium")]
    pub is_premium: bool,
    #[serde(default)]
    pub dialogs: Vec<Dialog>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub levels: Vec<Level>,
}
