//! # `slotbot-notify` - Telegram Bot API 适配器
//!
//! - [`telegram::TelegramChannel`]: 实现 `DeliveryChannel`，负责 `sendMessage` 与错误分类。
//! - [`updates::TelegramUpdates`]: 实现 `CommandSource`，基于 `getUpdates` 长轮询。

pub mod telegram;
pub mod updates;
