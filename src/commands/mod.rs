use tracing::debug;

use crate::db::Settings;
use crate::error::{AppError, AppResult};
use crate::services::history::HistoryController;
use crate::services::session::{Feedback, HistorySession, Movement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Sounds(bool),
    MaxElements(i64),
    AnnounceIndex(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Movement),
    Copy,
    View,
    Delete,
    Paste,
    Find(String),
    FindNext,
    Favorite,
    Jump(String),
    AnnounceIndex,
    Count,
    SwitchList,
    ShowSettings,
    ChangeSetting(SettingChange),
    Clear { include_favorites: bool },
    Help,
    Close,
    /// Anything unbound; closes the session.
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let (key, arg) = match line.split_once(char::is_whitespace) {
        Some((key, arg)) => (key, arg.trim()),
        None => (line, ""),
    };

    match key.to_ascii_lowercase().as_str() {
        "down" | "j" => Command::Move(Movement::Next),
        "up" | "k" => Command::Move(Movement::Previous),
        "home" => Command::Move(Movement::First),
        "end" => Command::Move(Movement::Last),
        "right" => Command::Copy,
        "left" => Command::View,
        "backspace" | "del" => Command::Delete,
        "v" => Command::Paste,
        "b" => Command::Find(arg.to_string()),
        "f3" | "n" => Command::FindNext,
        "f" => Command::Favorite,
        "g" => Command::Jump(arg.to_string()),
        "e" => Command::AnnounceIndex,
        "c" => Command::Count,
        "tab" => Command::SwitchList,
        "s" if arg.is_empty() => Command::ShowSettings,
        "s" => match parse_setting(arg) {
            Some(change) => Command::ChangeSetting(change),
            None => Command::Unknown(line.to_string()),
        },
        "z" => Command::Clear {
            include_favorites: arg.eq_ignore_ascii_case("all"),
        },
        "f1" | "?" => Command::Help,
        "escape" | "esc" | "q" => Command::Close,
        _ => Command::Unknown(line.to_string()),
    }
}

fn parse_setting(arg: &str) -> Option<SettingChange> {
    let (name, value) = arg.split_once(char::is_whitespace)?;
    let value = value.trim();
    match name.to_ascii_lowercase().as_str() {
        "sounds" => parse_switch(value).map(SettingChange::Sounds),
        "number" => parse_switch(value).map(SettingChange::AnnounceIndex),
        "max" => value.parse().ok().map(SettingChange::MaxElements),
        _ => None,
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

pub fn execute(
    controller: &HistoryController,
    session: &mut HistorySession,
    command: Command,
) -> AppResult<Feedback> {
    let result = match command {
        Command::Move(movement) => session.move_cursor(movement),
        Command::Copy => session.copy(),
        Command::View => session.view(),
        Command::Delete => session.delete(),
        Command::Paste => session.paste(),
        Command::Find(query) => session.find(&query),
        Command::FindNext => session.find_next(),
        Command::Favorite => session.favorite(),
        Command::Jump(input) => session.jump_to(&input),
        Command::AnnounceIndex => session.announce_index(),
        Command::Count => session.count(),
        Command::SwitchList => Ok(session.switch_list()),
        Command::ShowSettings => Ok(settings_feedback(session.settings())),
        Command::ChangeSetting(change) => {
            let settings = apply_change(*session.settings(), change);
            let settings = controller.update_settings(settings)?;
            session.apply_settings(settings);
            session.reload()?;
            Ok(settings_feedback(&settings))
        }
        Command::Clear { include_favorites } => {
            let deleted = controller.clear(include_favorites)?;
            session.reload()?;
            Ok(Feedback {
                message: format!("{deleted} entries deleted"),
                sound: None,
            })
        }
        Command::Help => Ok(session.help()),
        Command::Close => Ok(session.close()),
        Command::Unknown(input) => {
            debug!("unbound input {input:?} closes the history");
            Ok(session.close())
        }
    };

    match result {
        Err(AppError::EmptyList) => Ok(Feedback {
            message: "Empty list".to_string(),
            sound: None,
        }),
        other => other,
    }
}

fn apply_change(mut settings: Settings, change: SettingChange) -> Settings {
    match change {
        SettingChange::Sounds(enabled) => settings.sounds_enabled = enabled,
        SettingChange::MaxElements(max) => settings.max_elements = max,
        SettingChange::AnnounceIndex(enabled) => settings.announce_index_number = enabled,
    }
    settings
}

fn settings_feedback(settings: &Settings) -> Feedback {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    let limit = match settings.max_elements {
        0 => "unlimited".to_string(),
        max => max.to_string(),
    };
    Feedback {
        message: format!(
            "sounds {}, maximum entries {limit}, index numbers {}",
            on_off(settings.sounds_enabled),
            on_off(settings.announce_index_number)
        ),
        sound: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clipboard::testing::MemoryClipboard;
    use crate::clipboard::default_paster;
    use crate::db::Database;
    use crate::listener::ManualWatcher;

    fn controller() -> HistoryController {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        HistoryController::new(
            db,
            Arc::new(MemoryClipboard::default()),
            default_paster(),
            Arc::new(ManualWatcher::new()),
        )
        .expect("controller")
    }

    #[test]
    fn parses_gesture_keys() {
        assert_eq!(parse("down"), Command::Move(Movement::Next));
        assert_eq!(parse("  HOME "), Command::Move(Movement::First));
        assert_eq!(parse("right"), Command::Copy);
        assert_eq!(parse("backspace"), Command::Delete);
        assert_eq!(parse("b Hello World"), Command::Find("Hello World".to_string()));
        assert_eq!(parse("g 12"), Command::Jump("12".to_string()));
        assert_eq!(parse("tab"), Command::SwitchList);
        assert_eq!(parse("escape"), Command::Close);
    }

    #[test]
    fn parses_settings_and_clear() {
        assert_eq!(parse("s"), Command::ShowSettings);
        assert_eq!(
            parse("s sounds off"),
            Command::ChangeSetting(SettingChange::Sounds(false))
        );
        assert_eq!(
            parse("s max 25"),
            Command::ChangeSetting(SettingChange::MaxElements(25))
        );
        assert_eq!(
            parse("s number on"),
            Command::ChangeSetting(SettingChange::AnnounceIndex(true))
        );
        assert!(matches!(parse("s volume 3"), Command::Unknown(_)));
        assert_eq!(parse("z"), Command::Clear { include_favorites: false });
        assert_eq!(parse("z all"), Command::Clear { include_favorites: true });
    }

    #[test]
    fn unknown_key_closes_session() {
        let controller = controller();
        let mut session = controller.open_session().expect("session");
        let feedback = execute(&controller, &mut session, parse("x")).expect("execute");
        assert_eq!(feedback.message, "History closed");
        assert!(!session.is_open());
    }

    #[test]
    fn empty_list_becomes_feedback() {
        let controller = controller();
        let mut session = controller.open_session().expect("session");
        let feedback = execute(&controller, &mut session, parse("down")).expect("execute");
        assert_eq!(feedback.message, "Empty list");
        assert!(session.is_open());
    }

    #[test]
    fn settings_change_reaches_store_and_session() {
        let controller = controller();
        let mut session = controller.open_session().expect("session");
        let feedback =
            execute(&controller, &mut session, parse("s number on")).expect("execute");
        assert_eq!(
            feedback.message,
            "sounds on, maximum entries 100, index numbers on"
        );
        assert!(session.settings().announce_index_number);
        assert!(
            controller
                .db()
                .get_settings()
                .expect("settings")
                .announce_index_number
        );
    }

    #[test]
    fn clear_refreshes_session() {
        let controller = controller();
        controller.db().insert("a", false).expect("insert");
        controller.db().insert("b", true).expect("insert");
        let mut session = controller.open_session().expect("session");

        let feedback = execute(&controller, &mut session, parse("z")).expect("execute");
        assert_eq!(feedback.message, "1 entries deleted");
        assert!(session.current().is_none());
        session.switch_list();
        assert_eq!(session.current().map(|entry| entry.text.as_str()), Some("b"));
    }
}
