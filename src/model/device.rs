use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    AndroidPhone,
    AndroidTablet,
    Website,
    ChromeExtension,
}

impl ClientType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AndroidPhone => "android_phone",
            Self::AndroidTablet => "android_tablet",
            Self::Website => "website",
            Self::ChromeExtension => "chrome_extension",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android_phone" => Ok(Self::AndroidPhone),
            "android_tablet" => Ok(Self::AndroidTablet),
            "website" => Ok(Self::Website),
            "chrome_extension" => Ok(Self::ChromeExtension),
            other => Err(ValidationError::InvalidClientType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub client_type: ClientType,
    pub push_token: Option<String>,
}
