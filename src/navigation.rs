//! Which screens and actions each role may reach

use serde::{Deserialize, Serialize};

use crate::models::RoleTag;
use crate::notice::Locale;

use RoleTag::{Admin, Cook, Manager};

const EVERYONE: &[RoleTag] = &[Admin, Manager, Cook];
const STAFF: &[RoleTag] = &[Admin, Manager];
const ADMIN_ONLY: &[RoleTag] = &[Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Dashboard,
    Products,
    Meals,
    Servings,
    Users,
    Reports,
    Notifications,
}

impl Screen {
    /// Navigation order
    pub const ALL: [Screen; 7] = [
        Screen::Dashboard,
        Screen::Products,
        Screen::Meals,
        Screen::Servings,
        Screen::Users,
        Screen::Reports,
        Screen::Notifications,
    ];

    pub fn allowed_roles(&self) -> &'static [RoleTag] {
        match self {
            Screen::Dashboard | Screen::Servings | Screen::Notifications => EVERYONE,
            Screen::Products | Screen::Meals | Screen::Reports => STAFF,
            Screen::Users => ADMIN_ONLY,
        }
    }

    pub fn is_accessible_by(&self, role: RoleTag) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn title(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Uz, Screen::Dashboard) => "Dashboard",
            (Locale::Uz, Screen::Products) => "Mahsulotlar",
            (Locale::Uz, Screen::Meals) => "Ovqatlar",
            (Locale::Uz, Screen::Servings) => "Ovqat Berish",
            (Locale::Uz, Screen::Users) => "Foydalanuvchilar",
            (Locale::Uz, Screen::Reports) => "Hisobotlar",
            (Locale::Uz, Screen::Notifications) => "Bildirishnomalar",
            (Locale::En, Screen::Dashboard) => "Dashboard",
            (Locale::En, Screen::Products) => "Products",
            (Locale::En, Screen::Meals) => "Meals",
            (Locale::En, Screen::Servings) => "Servings",
            (Locale::En, Screen::Users) => "Users",
            (Locale::En, Screen::Reports) => "Reports",
            (Locale::En, Screen::Notifications) => "Notifications",
        }
    }
}

/// Screens shown in navigation for a role, in order
pub fn screens_for(role: RoleTag) -> Vec<Screen> {
    Screen::ALL.into_iter().filter(|s| s.is_accessible_by(role)).collect()
}

/// Finer-grained permissions inside screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Stock totals and charts on the dashboard
    ViewStockOverview,
    ViewServingHistory,
    RecalculatePortions,
    GenerateReports,
    ViewAuditLogs,
}

impl Capability {
    pub fn allowed_roles(&self) -> &'static [RoleTag] {
        match self {
            Capability::ViewStockOverview | Capability::ViewServingHistory | Capability::RecalculatePortions => STAFF,
            Capability::GenerateReports | Capability::ViewAuditLogs => ADMIN_ONLY,
        }
    }
}

pub fn can(role: RoleTag, capability: Capability) -> bool {
    capability.allowed_roles().contains(&role)
}
