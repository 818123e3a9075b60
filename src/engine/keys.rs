//! Page-turn key catalog and injection plans

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::SlotId;

/// Keys the page turner can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    PageUp,
    PageDown,
    Space,
    Shift,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::Right => "Right",
            Key::Left => "Left",
            Key::Up => "Up",
            Key::Down => "Down",
            Key::PageUp => "PageUp",
            Key::PageDown => "PageDown",
            Key::Space => "Space",
            Key::Shift => "Shift",
        };
        f.write_str(name)
    }
}

/// Selectable key combination
///
/// The same preset resolves to complementary combos for the two slots, so
/// `Page` means PageDown on the primary trigger and PageUp on the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPreset {
    /// Right / Left
    #[default]
    Horizontal,
    /// Down / Up
    Vertical,
    /// PageDown / PageUp
    Page,
    /// Space / Shift+Space
    Space,
}

const PRIMARY_COMBOS: [&[Key]; 4] = [&[Key::Right], &[Key::Down], &[Key::PageDown], &[Key::Space]];

const SECONDARY_COMBOS: [&[Key]; 4] =
    [&[Key::Left], &[Key::Up], &[Key::PageUp], &[Key::Shift, Key::Space]];

impl KeyPreset {
    pub const ALL: [KeyPreset; 4] = [
        KeyPreset::Horizontal,
        KeyPreset::Vertical,
        KeyPreset::Page,
        KeyPreset::Space,
    ];

    fn catalog_index(self) -> usize {
        match self {
            KeyPreset::Horizontal => 0,
            KeyPreset::Vertical => 1,
            KeyPreset::Page => 2,
            KeyPreset::Space => 3,
        }
    }

    /// Resolve the combination for a slot
    pub fn combo(self, slot: SlotId) -> &'static [Key] {
        match slot {
            SlotId::Primary => PRIMARY_COMBOS[self.catalog_index()],
            SlotId::Secondary => SECONDARY_COMBOS[self.catalog_index()],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyPreset::Horizontal => "horizontal",
            KeyPreset::Vertical => "vertical",
            KeyPreset::Page => "page",
            KeyPreset::Space => "space",
        }
    }
}

impl FromStr for KeyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" | "arrows" | "right" | "left" => Ok(KeyPreset::Horizontal),
            "vertical" | "down" | "up" => Ok(KeyPreset::Vertical),
            "page" | "pagedown" | "pageup" => Ok(KeyPreset::Page),
            "space" => Ok(KeyPreset::Space),
            other => Err(format!(
                "unknown key preset '{}' (expected horizontal, vertical, page or space)",
                other
            )),
        }
    }
}

impl fmt::Display for KeyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a combo as "Shift+Space"
pub fn combo_label(combo: &[Key]) -> String {
    combo
        .iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

/// Single synthetic key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(Key),
    Release(Key),
}

impl KeyEvent {
    pub fn key(&self) -> Key {
        match self {
            KeyEvent::Press(k) | KeyEvent::Release(k) => *k,
        }
    }
}

/// Ordered key transitions for one page turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPlan {
    events: Vec<KeyEvent>,
}

impl InjectionPlan {
    /// Press every key in order, then release them in reverse order
    pub fn for_combo(combo: &[Key]) -> Self {
        let events = combo
            .iter()
            .copied()
            .map(KeyEvent::Press)
            .chain(combo.iter().rev().copied().map(KeyEvent::Release))
            .collect();
        Self { events }
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_complementary() {
        assert_eq!(KeyPreset::Horizontal.combo(SlotId::Primary), &[Key::Right]);
        assert_eq!(KeyPreset::Horizontal.combo(SlotId::Secondary), &[Key::Left]);
        assert_eq!(KeyPreset::Vertical.combo(SlotId::Primary), &[Key::Down]);
        assert_eq!(KeyPreset::Vertical.combo(SlotId::Secondary), &[Key::Up]);
        assert_eq!(KeyPreset::Page.combo(SlotId::Primary), &[Key::PageDown]);
        assert_eq!(KeyPreset::Page.combo(SlotId::Secondary), &[Key::PageUp]);
        assert_eq!(KeyPreset::Space.combo(SlotId::Primary), &[Key::Space]);
        assert_eq!(KeyPreset::Space.combo(SlotId::Secondary), &[Key::Shift, Key::Space]);
    }

    #[test]
    fn test_plan_releases_in_reverse() {
        let plan = InjectionPlan::for_combo(&[Key::Shift, Key::Space]);
        assert_eq!(
            plan.events(),
            &[
                KeyEvent::Press(Key::Shift),
                KeyEvent::Press(Key::Space),
                KeyEvent::Release(Key::Space),
                KeyEvent::Release(Key::Shift),
            ]
        );
    }

    #[test]
    fn test_single_key_plan() {
        let plan = InjectionPlan::for_combo(&[Key::PageDown]);
        assert_eq!(
            plan.events(),
            &[KeyEvent::Press(Key::PageDown), KeyEvent::Release(Key::PageDown)]
        );
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("page".parse::<KeyPreset>().unwrap(), KeyPreset::Page);
        assert_eq!("SPACE".parse::<KeyPreset>().unwrap(), KeyPreset::Space);
        assert!("tab".parse::<KeyPreset>().is_err());
    }

    #[test]
    fn test_combo_label() {
        assert_eq!(combo_label(KeyPreset::Space.combo(SlotId::Secondary)), "Shift+Space");
        assert_eq!(combo_label(KeyPreset::Page.combo(SlotId::Primary)), "PageDown");
    }
}
