use serde::{Deserialize, Serialize};

use crate::models::StudentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorPreference {
    White,
    Black,
    NoPreference,
}

impl ColorPreference {
    pub fn color(self) -> Option<Color> {
        match self {
            ColorPreference::White => Some(Color::White),
            ColorPreference::Black => Some(Color::Black),
            ColorPreference::NoPreference => None,
        }
    }
}

/// Games as White minus games as Black. Byes never touch either counter.
pub fn color_balance(record: &StudentRecord) -> i64 {
    i64::from(record.white_games_played) - i64::from(record.black_games_played)
}

/// The color this student has played less often, if any.
pub fn preferred_color(record: &StudentRecord) -> ColorPreference {
    match color_balance(record) {
        diff if diff > 0 => ColorPreference::Black,
        diff if diff < 0 => ColorPreference::White,
        _ => ColorPreference::NoPreference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(white: u32, black: u32, byes: u32) -> StudentRecord {
        StudentRecord {
            white_games_played: white,
            black_games_played: black,
            byes,
            ..StudentRecord::new("Kiara Patel")
        }
    }

    #[test]
    fn prefers_the_color_played_less() {
        assert_eq!(preferred_color(&played(3, 1, 0)), ColorPreference::Black);
        assert_eq!(preferred_color(&played(0, 2, 0)), ColorPreference::White);
    }

    #[test]
    fn balanced_history_has_no_preference() {
        assert_eq!(preferred_color(&played(0, 0, 0)), ColorPreference::NoPreference);
        assert_eq!(preferred_color(&played(4, 4, 0)), ColorPreference::NoPreference);
    }

    #[test]
    fn byes_do_not_shift_the_balance() {
        assert_eq!(preferred_color(&played(2, 2, 3)), ColorPreference::NoPreference);
        assert_eq!(color_balance(&played(1, 2, 5)), -1);
    }
}
