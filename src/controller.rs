use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, ViewerConfig, ViewerError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ViewerError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('['), _) => Some(Message::PreviousSheet),
            (KeyCode::Char(']'), _) => Some(Message::NextSheet),
            (KeyCode::Char('e'), _) => Some(Message::NextEventFilter),
            (KeyCode::Char('E'), _) => Some(Message::PreviousEventFilter),
            (KeyCode::Char('p'), _) => Some(Message::ToggleOnlyPositive),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('c'), _) => Some(Message::CopyCell),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
