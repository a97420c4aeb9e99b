//! Transient operator-facing notifications.
//!
//! Every error that reaches a screen boundary is turned into a [`Notice`]:
//! the server's `detail` text when it sent one, otherwise a localized
//! fallback chosen by the operation that failed.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Uz,
    En,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uz" | "uz-uz" | "uzbek" => Some(Locale::Uz),
            "en" | "en-us" | "english" => Some(Locale::En),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    /// Error code when the notice came from a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// The operation a notice is about; selects the fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    LoadData,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    CreateUnit,
    CreateDelivery,
    CreateMeal,
    UpdateMeal,
    DeleteMeal,
    ServeMeal,
    RecalculatePortions,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateRole,
    MarkNotificationRead,
    MarkAllNotificationsRead,
    GenerateReport,
}

impl Operation {
    fn failure_text(self, locale: Locale) -> &'static str {
        use Operation::*;
        match locale {
            Locale::Uz => match self {
                Login => "Kirishda xatolik yuz berdi",
                LoadData => "Ma'lumotlarni yuklashda xatolik yuz berdi",
                CreateProduct => "Mahsulot yaratishda xatolik yuz berdi",
                UpdateProduct => "Mahsulotni yangilashda xatolik yuz berdi",
                DeleteProduct => "Mahsulotni o'chirishda xatolik yuz berdi",
                CreateUnit => "O'lchov birligini yaratishda xatolik yuz berdi",
                CreateDelivery => "Yetkazib berish qo'shishda xatolik yuz berdi",
                CreateMeal => "Ovqat yaratishda xatolik yuz berdi",
                UpdateMeal => "Ovqatni yangilashda xatolik yuz berdi",
                DeleteMeal => "Ovqatni o'chirishda xatolik yuz berdi",
                ServeMeal => "Ovqat berishda xatolik yuz berdi",
                RecalculatePortions => "Qayta hisoblashda xatolik yuz berdi",
                CreateUser => "Foydalanuvchi yaratishda xatolik yuz berdi",
                UpdateUser => "Foydalanuvchini yangilashda xatolik yuz berdi",
                DeleteUser => "Foydalanuvchini o'chirishda xatolik yuz berdi",
                CreateRole => "Rol yaratishda xatolik yuz berdi",
                MarkNotificationRead => "Bildirishnomani belgilashda xatolik",
                MarkAllNotificationsRead => "Bildirishnomalarni belgilashda xatolik",
                GenerateReport => "Hisobot yaratishda xatolik yuz berdi",
            },
            Locale::En => match self {
                Login => "Sign-in failed",
                LoadData => "Failed to load data",
                CreateProduct => "Failed to create product",
                UpdateProduct => "Failed to update product",
                DeleteProduct => "Failed to delete product",
                CreateUnit => "Failed to create unit",
                CreateDelivery => "Failed to record delivery",
                CreateMeal => "Failed to create meal",
                UpdateMeal => "Failed to update meal",
                DeleteMeal => "Failed to delete meal",
                ServeMeal => "Failed to serve meal",
                RecalculatePortions => "Failed to recalculate portions",
                CreateUser => "Failed to create user",
                UpdateUser => "Failed to update user",
                DeleteUser => "Failed to delete user",
                CreateRole => "Failed to create role",
                MarkNotificationRead => "Failed to mark notification as read",
                MarkAllNotificationsRead => "Failed to mark notifications as read",
                GenerateReport => "Failed to generate report",
            },
        }
    }
}

fn error_title(locale: Locale) -> &'static str {
    match locale {
        Locale::Uz => "Xatolik",
        Locale::En => "Error",
    }
}

fn success_title(locale: Locale) -> &'static str {
    match locale {
        Locale::Uz => "Muvaffaqiyat",
        Locale::En => "Success",
    }
}

fn connectivity_hint(locale: Locale) -> &'static str {
    match locale {
        Locale::Uz => "Server bilan aloqa yo'q. Internet ulanishini tekshiring",
        Locale::En => "Cannot reach the server. Check your network connection",
    }
}

fn session_expired(locale: Locale) -> &'static str {
    match locale {
        Locale::Uz => "Sessiya tugadi. Iltimos, qaytadan kiring",
        Locale::En => "Your session has ended. Please sign in again",
    }
}

impl Notice {
    pub fn success(locale: Locale, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: success_title(locale).to_string(),
            description: description.into(),
            code: None,
        }
    }

    /// Convert a failure into a notice.
    ///
    /// Server detail wins when present. Otherwise network failures get a
    /// connectivity hint, expired sessions a sign-in prompt, and everything
    /// else the operation's generic text.
    pub fn from_error(locale: Locale, operation: Operation, err: &ClientError) -> Self {
        let description = match err.server_detail() {
            Some(detail) => detail.to_string(),
            None if err.is_network() => connectivity_hint(locale).to_string(),
            None if err.is_auth() && operation != Operation::Login => session_expired(locale).to_string(),
            None => operation.failure_text(locale).to_string(),
        };
        Self {
            level: NoticeLevel::Error,
            title: error_title(locale).to_string(),
            description,
            code: Some(err.error_code().to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

impl std::error::Error for Notice {}
