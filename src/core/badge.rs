use serde::{Deserialize, Serialize};

/// Highest unread count rendered literally; anything above shows as "99+".
pub const UNREAD_BADGE_CAP: u32 = 99;

/// Which counter a badge renders
///
/// The pulse badge and the unread-notification badge sit next to different
/// anchors and follow different rendering rules, so they never share a type
/// constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeKind {
    Pulse,
    UnreadNotifications,
}

impl BadgeKind {
    /// DOM anchor the badge is rendered next to
    pub fn anchor(&self) -> &'static str {
        match self {
            BadgeKind::Pulse => "#pulse-anchor",
            BadgeKind::UnreadNotifications => "#notifications-anchor",
        }
    }

    fn css_class(&self) -> &'static str {
        match self {
            BadgeKind::Pulse => "pulse-badge",
            BadgeKind::UnreadNotifications => "notification-badge",
        }
    }
}

/// A rendered counter badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub kind: BadgeKind,
    pub count: u32,
    pub text: String,
    pub anchor: String,
}

impl Badge {
    /// Pulse badge: hidden at zero, literal count otherwise (never capped)
    pub fn pulse(count: u32) -> Option<Self> {
        if count == 0 {
            return None;
        }
        Some(Self::build(BadgeKind::Pulse, count, count.to_string()))
    }

    /// Unread-notification badge: hidden at zero, capped at "99+"
    pub fn unread(count: u32) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let text = if count > UNREAD_BADGE_CAP {
            format!("{}+", UNREAD_BADGE_CAP)
        } else {
            count.to_string()
        };
        Some(Self::build(BadgeKind::UnreadNotifications, count, text))
    }

    fn build(kind: BadgeKind, count: u32, text: String) -> Self {
        Self {
            kind,
            count,
            text,
            anchor: kind.anchor().to_string(),
        }
    }

    /// HTML fragment spliced next to the badge anchor
    pub fn to_html(&self) -> String {
        format!(
            r#"<span class="{}" data-count="{}">{}</span>"#,
            self.kind.css_class(),
            self.count,
            self.text
        )
    }
}

/// The badges currently on screen
///
/// Each redraw replaces the previous badge of the same kind, so calling it
/// repeatedly with the same count leaves exactly one badge behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BadgeBoard {
    pulse: Option<Badge>,
    unread: Option<Badge>,
}

impl BadgeBoard {
    pub fn redraw_pulse(&mut self, count: u32) -> Option<&Badge> {
        self.pulse = Badge::pulse(count);
        self.pulse.as_ref()
    }

    pub fn redraw_unread(&mut self, count: u32) -> Option<&Badge> {
        self.unread = Badge::unread(count);
        self.unread.as_ref()
    }

    pub fn pulse(&self) -> Option<&Badge> {
        self.pulse.as_ref()
    }

    pub fn unread(&self) -> Option<&Badge> {
        self.unread.as_ref()
    }
}
