use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 订阅者标识，对应推送通道中的会话 (Chat) ID。
///
/// # Invariants
/// - 在订阅者生命周期内唯一且不可变。
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SubscriberId(pub i64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// # Summary
/// 订阅过滤标签，订阅者可选择只接收某一类疫苗的放号通知。
///
/// # Invariants
/// - 取值集合固定；"不设标签" 由 `Option::None` 表示，语义为匹配全部。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
pub enum FilterTag {
    // 阿斯利康
    AstraZeneca,
    // 强生
    JohnsonAndJohnson,
    // mRNA 疫苗 (诊所与接种中心)
    #[serde(rename = "MRNA")]
    Mrna,
}

impl FilterTag {
    /// 全部可选标签，按菜单展示顺序排列。
    pub const ALL: [FilterTag; 3] = [
        FilterTag::AstraZeneca,
        FilterTag::JohnsonAndJohnson,
        FilterTag::Mrna,
    ];

    /// # Summary
    /// 面向订阅者展示的标签名称。
    pub fn label(&self) -> &'static str {
        match self {
            FilterTag::AstraZeneca => "AstraZeneca",
            FilterTag::JohnsonAndJohnson => "Johnson And Johnson",
            FilterTag::Mrna => "MRNA vaccines",
        }
    }

    /// # Summary
    /// 解析可能为空的标签字符串。
    ///
    /// # Logic
    /// 1. 空串 (去除空白后) 视为 "匹配全部"，返回 `None`。
    /// 2. 其余交由 `FromStr` 解析。
    ///
    /// # Arguments
    /// * `s` - 原始标签文本。
    ///
    /// # Returns
    /// 成功返回 `Option<FilterTag>`，无法识别时返回错误描述。
    pub fn parse_optional(s: &str) -> Result<Option<FilterTag>, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for FilterTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "astrazeneca" | "az" => Ok(FilterTag::AstraZeneca),
            "johnsonandjohnson" | "johnson&johnson" | "jj" | "j&j" => {
                Ok(FilterTag::JohnsonAndJohnson)
            }
            "mrna" => Ok(FilterTag::Mrna),
            _ => Err(format!("Unknown FilterTag: {}", s)),
        }
    }
}

impl std::fmt::Display for FilterTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterTag::AstraZeneca => write!(f, "AstraZeneca"),
            FilterTag::JohnsonAndJohnson => write!(f, "JohnsonAndJohnson"),
            FilterTag::Mrna => write!(f, "MRNA"),
        }
    }
}

/// # Summary
/// 一次放号检测的结果，由外部触发源产生，被单次广播消费。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NotificationResult {
    /// 结果所属的疫苗类别
    pub category: FilterTag,
    /// 推送给订阅者的正文
    #[schema(example = "slot open")]
    pub message: String,
}
