//! エッジの公開範囲

use crate::error::{Result, StackError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 一般公開時の送信元範囲
pub const ANY_IPV4: &str = "0.0.0.0/0";

static IPV4_CIDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$").expect("valid cidr regex")
});

/// HTTP/HTTPS リスナーに到達できる送信元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Exposure {
    /// 全体に公開
    Public,
    /// 単一の送信元範囲のみ（通常は管理者の IP）
    Restricted { cidr: String },
}

impl Exposure {
    pub fn restricted(cidr: impl Into<String>) -> Result<Self> {
        let cidr = cidr.into();
        validate_cidr(&cidr)?;
        if cidr == ANY_IPV4 {
            return Err(StackError::InvalidConfig(
                "restricted exposure cannot use 0.0.0.0/0; use exposure \"public\"".to_string(),
            ));
        }
        Ok(Exposure::Restricted { cidr })
    }

    /// HTTP/HTTPS インバウンドルールの送信元範囲
    pub fn source_cidr(&self) -> &str {
        match self {
            Exposure::Public => ANY_IPV4,
            Exposure::Restricted { cidr } => cidr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exposure::Public => "public",
            Exposure::Restricted { .. } => "restricted",
        }
    }
}

impl std::fmt::Display for Exposure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exposure::Public => write!(f, "public ({})", ANY_IPV4),
            Exposure::Restricted { cidr } => write!(f, "restricted ({})", cidr),
        }
    }
}

fn validate_cidr(cidr: &str) -> Result<()> {
    let invalid = || StackError::InvalidConfig(format!("invalid IPv4 CIDR: {}", cidr));
    let caps = IPV4_CIDR.captures(cidr).ok_or_else(invalid)?;
    for i in 1..=4 {
        let octet: u16 = caps[i].parse().map_err(|_| invalid())?;
        if octet > 255 {
            return Err(invalid());
        }
    }
    let prefix: u8 = caps[5].parse().map_err(|_| invalid())?;
    if prefix > 32 {
        return Err(invalid());
    }
    Ok(())
}
