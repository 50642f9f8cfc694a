use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rankview::controller::Controller;
use rankview::domain::{Message, ViewerConfig};
use rankview::model::{Model, Status};
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

mod common;

struct Viewer {
    model: Model,
    rx: Receiver<Message>,
    controller: Controller,
}

impl Viewer {
    fn start(cfg: ViewerConfig) -> Self {
        let (tx, rx) = channel();
        let model = Model::init(&cfg, tx, 120, 30).unwrap();
        let mut viewer = Viewer {
            model,
            rx,
            controller: Controller::new(&cfg),
        };
        viewer.settle();
        viewer
    }

    // Apply loader messages until nothing is loading anymore.
    fn settle(&mut self) {
        while self.model.status == Status::LOADING {
            let msg = self.rx.recv_timeout(Duration::from_secs(5)).unwrap();
            self.model.update(Some(msg)).unwrap();
        }
    }

    fn press(&mut self, c: char) {
        let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        let message = if self.model.raw_keyevents() {
            Some(Message::RawKey(key))
        } else {
            self.controller.handle_key(key)
        };
        self.model.update(message).unwrap();
        self.settle();
    }

    fn press_code(&mut self, code: KeyCode) {
        self.model
            .update(Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))))
            .unwrap();
    }

    fn status(&self) -> &str {
        &self.model.get_uidata().status_message
    }
}

#[test]
fn browsing_with_event_filter_across_sheets() {
    let dir = common::data_dir();
    let cfg = ViewerConfig::default().with_data_dir(dir.path().to_path_buf());
    let mut viewer = Viewer::start(cfg);

    assert_eq!(viewer.model.status, Status::READY);
    assert_eq!(viewer.status(), "Loaded: U12 (3 rows)");
    assert_eq!(
        viewer.model.event_options(),
        vec![None, Some("100m".to_string()), Some("Long Jump".to_string())]
    );

    viewer.press('e');
    assert_eq!(viewer.model.filter().event_column(), Some("100m"));
    assert_eq!(viewer.model.visible_rows(), &[0, 1, 2]);

    viewer.press('p');
    assert_eq!(viewer.model.visible_rows(), &[0]);
    assert_eq!(viewer.status(), "Showing 1 of 3 rows");

    // U14 has a 100m column as well, the selection survives.
    viewer.press(']');
    assert_eq!(viewer.status(), "Loaded: U14 (2 rows)");
    assert_eq!(viewer.model.filter().event_column(), Some("100m"));
    assert!(viewer.model.filter().only_positive);
    assert_eq!(viewer.model.visible_rows(), &[0]);

    viewer.press('e');
    assert_eq!(viewer.model.filter().event_column(), Some("Shot Put"));
    assert_eq!(viewer.model.visible_rows(), &[0, 1]);

    // U12 has no Shot Put, so the event filter is dropped.
    viewer.press('[');
    assert_eq!(viewer.model.get_uidata().name, "U12");
    assert_eq!(viewer.model.filter().event_column(), None);
    assert_eq!(viewer.model.visible_rows(), &[0, 1, 2]);
}

#[test]
fn live_search_then_clear() {
    let dir = common::data_dir();
    let cfg = ViewerConfig::default().with_data_dir(dir.path().to_path_buf());
    let mut viewer = Viewer::start(cfg);

    viewer.press('/');
    assert!(viewer.model.raw_keyevents());
    for c in "tsv".chars() {
        viewer.press(c);
    }
    assert_eq!(viewer.model.visible_rows(), &[0, 2]);
    assert_eq!(viewer.status(), "Showing 2 of 3 rows");

    viewer.press_code(KeyCode::Enter);
    assert!(!viewer.model.raw_keyevents());
    assert_eq!(viewer.model.filter().search, "tsv");

    // Esc in the table drops the search.
    viewer.model.update(Some(Message::Exit)).unwrap();
    assert!(viewer.model.filter().search.is_empty());
    assert_eq!(viewer.model.visible_rows(), &[0, 1, 2]);
}

#[test]
fn initial_sheet_and_missing_manifest() {
    let dir = common::data_dir();
    let viewer = Viewer::start(
        ViewerConfig::default()
            .with_data_dir(dir.path().to_path_buf())
            .with_initial_sheet(Some("U14".to_string())),
    );
    assert_eq!(viewer.status(), "Loaded: U14 (2 rows)");

    let empty = tempfile::TempDir::new().unwrap();
    let cfg = ViewerConfig::default().with_data_dir(empty.path().to_path_buf());
    let viewer = Viewer::start(cfg);
    assert_eq!(viewer.model.status, Status::EMPTY);
    assert!(viewer.status().starts_with("Error: file not found"));
    assert!(viewer.model.dataset().is_empty());
}
