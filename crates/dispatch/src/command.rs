use slotbot_core::common::FilterTag;
use slotbot_core::notify::port::ReplyMarkup;

pub const START_BUTTON: &str = "Start";
pub const STOP_BUTTON: &str = "Stop";
pub const FILTER_BUTTON: &str = "Add filters (multiple choices available)";
pub const AZ_BUTTON: &str = "Look for AstraZeneca";
pub const JJ_BUTTON: &str = "Look for Johnson & Johnson";
pub const MRNA_BUTTON: &str = "Look for MRNA vaccine (clinics and vaccination centers)";
pub const EVERYTHING_BUTTON: &str = "Look for everything";
pub const CONTRIBUTE_BUTTON: &str = "Contribute and support";
pub const INFO_FILTER_BUTTON: &str = "Info about filters";
pub const BACK_BUTTON: &str = "Back";

// 纯文本触发词
const OPEN_TEXT: &str = "open";
const CLOSE_TEXT: &str = "close";

/// # Summary
/// 订阅者可以触发的指令。
///
/// # Invariants
/// - 按钮文本与斜杠别名解析到同一个变体，执行效果完全一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 订阅 (新建或重新启用)
    Subscribe,
    /// 退订 (软删除)
    Unsubscribe,
    /// 设置过滤；`None` 表示接收全部类别
    SetFilter(Option<FilterTag>),
    /// 展示主键盘
    ShowMenu,
    /// 展示过滤键盘
    ShowFilterMenu,
    /// 移除键盘
    HideMenu,
    /// 查询当前过滤
    QueryFilters,
    /// 展示支持信息
    Contribute,
}

impl Command {
    /// # Summary
    /// 将入站文本解析为指令。
    ///
    /// # Logic
    /// 1. 先按按钮文本精确匹配。
    /// 2. 再按斜杠指令匹配，支持 `/start@botname` 与尾随参数。
    /// 3. 均未命中返回 `None` (静默忽略)。
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        Self::from_button(text).or_else(|| Self::from_slash(text))
    }

    fn from_button(text: &str) -> Option<Command> {
        let command = match text {
            START_BUTTON => Command::Subscribe,
            STOP_BUTTON => Command::Unsubscribe,
            FILTER_BUTTON => Command::ShowFilterMenu,
            AZ_BUTTON => Command::SetFilter(Some(FilterTag::AstraZeneca)),
            JJ_BUTTON => Command::SetFilter(Some(FilterTag::JohnsonAndJohnson)),
            MRNA_BUTTON => Command::SetFilter(Some(FilterTag::Mrna)),
            EVERYTHING_BUTTON => Command::SetFilter(None),
            CONTRIBUTE_BUTTON => Command::Contribute,
            INFO_FILTER_BUTTON => Command::QueryFilters,
            BACK_BUTTON | OPEN_TEXT => Command::ShowMenu,
            CLOSE_TEXT => Command::HideMenu,
            _ => return None,
        };
        Some(command)
    }

    fn from_slash(text: &str) -> Option<Command> {
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        // 群组中的指令形如 /start@slot_bot
        let name = word.split('@').next()?;
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Subscribe),
            "stop" => Some(Command::Unsubscribe),
            "open" => Some(Command::ShowFilterMenu),
            "contribute" => Some(Command::Contribute),
            _ => None,
        }
    }

    /// 该指令是否读写订阅者存储。
    pub fn touches_store(&self) -> bool {
        matches!(
            self,
            Command::Subscribe
                | Command::Unsubscribe
                | Command::SetFilter(_)
                | Command::QueryFilters
        )
    }
}

fn row(buttons: &[&str]) -> Vec<String> {
    buttons.iter().map(|b| b.to_string()).collect()
}

/// 主键盘。
pub fn main_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(vec![
        row(&[START_BUTTON, STOP_BUTTON]),
        row(&[FILTER_BUTTON]),
        row(&[CONTRIBUTE_BUTTON]),
    ])
}

/// 过滤选择键盘。
pub fn filter_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(vec![
        row(&[AZ_BUTTON, JJ_BUTTON]),
        row(&[MRNA_BUTTON]),
        row(&[EVERYTHING_BUTTON]),
        row(&[INFO_FILTER_BUTTON, BACK_BUTTON]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_and_aliases_converge() {
        assert_eq!(Command::parse(START_BUTTON), Command::parse("/start"));
        assert_eq!(Command::parse(STOP_BUTTON), Command::parse("/stop"));
        assert_eq!(Command::parse(FILTER_BUTTON), Command::parse("/open"));
        assert_eq!(Command::parse(CONTRIBUTE_BUTTON), Command::parse("/contribute"));
        assert_eq!(Command::parse("/start"), Some(Command::Subscribe));
    }

    #[test]
    fn test_slash_command_variants() {
        assert_eq!(Command::parse("/start@slot_bot"), Some(Command::Subscribe));
        assert_eq!(Command::parse("/STOP now"), Some(Command::Unsubscribe));
        assert_eq!(Command::parse("  /start  "), Some(Command::Subscribe));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("/"), None);
    }

    #[test]
    fn test_filter_buttons() {
        assert_eq!(
            Command::parse(AZ_BUTTON),
            Some(Command::SetFilter(Some(FilterTag::AstraZeneca)))
        );
        assert_eq!(
            Command::parse(JJ_BUTTON),
            Some(Command::SetFilter(Some(FilterTag::JohnsonAndJohnson)))
        );
        assert_eq!(
            Command::parse(MRNA_BUTTON),
            Some(Command::SetFilter(Some(FilterTag::Mrna)))
        );
        assert_eq!(Command::parse(EVERYTHING_BUTTON), Some(Command::SetFilter(None)));
    }

    #[test]
    fn test_menu_texts() {
        assert_eq!(Command::parse("open"), Some(Command::ShowMenu));
        assert_eq!(Command::parse(BACK_BUTTON), Some(Command::ShowMenu));
        assert_eq!(Command::parse("close"), Some(Command::HideMenu));
        assert!(!Command::ShowMenu.touches_store());
        assert!(Command::QueryFilters.touches_store());
    }

    #[test]
    fn test_unrecognized_text_is_ignored() {
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("start"), None);
    }

    #[test]
    fn test_keyboards_only_contain_parseable_buttons() {
        for markup in [main_keyboard(), filter_keyboard()] {
            let ReplyMarkup::Keyboard(rows) = markup else {
                panic!("expected a keyboard");
            };
            for button in rows.iter().flatten() {
                assert!(Command::parse(button).is_some(), "{} is not routable", button);
            }
        }
    }
}
